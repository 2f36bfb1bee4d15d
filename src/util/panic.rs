//! Helpers for reporting caught panics.

use std::any::Any;

/// Extract a readable message from a panic payload.
///
/// `panic!` with a literal yields a `&'static str`, with format arguments a
/// `String`. Anything else is reported generically.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic;

    #[test]
    fn test_static_str_payload() {
        let payload = panic::catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static message");
    }

    #[test]
    fn test_formatted_payload() {
        let id = 42;
        let payload = panic::catch_unwind(|| panic!("job {id} exploded")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "job 42 exploded");
    }

    #[test]
    fn test_other_payload() {
        let payload = panic::catch_unwind(|| panic::panic_any(17_u8)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
