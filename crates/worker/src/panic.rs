use std::any::Any;

/// Extracts the message from a caught panic payload.
///
/// Returns `None` for payloads that are neither `&str` nor `String`.
pub fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
	if let Some(s) = payload.downcast_ref::<&str>() {
		Some((*s).to_string())
	} else {
		payload.downcast_ref::<String>().cloned()
	}
}
