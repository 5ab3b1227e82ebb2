//! Helpers for turning caught panics into loggable text.

use std::any::Any;

/// Best-effort message extracted from a `catch_unwind` payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_str_and_string_payloads() {
        let a = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(a.as_ref()), "boom");

        let b = std::panic::catch_unwind(|| panic!("{} {}", "formatted", 7)).unwrap_err();
        assert_eq!(panic_message(b.as_ref()), "formatted 7");
    }
}
