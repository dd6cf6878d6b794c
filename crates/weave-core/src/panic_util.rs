use std::any::Any;

const NON_STRING_PANIC_PAYLOAD: &str = "<non-string panic payload>";

/// Best-effort stringification of a caught panic payload, for log lines.
/// Most panics carry a `&str` or `String` message; anything else (a custom
/// payload type passed to `panic_any`) is reported generically rather than
/// causing a second panic while logging the first.
pub fn panic_payload_to_string(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        NON_STRING_PANIC_PAYLOAD.to_string()
    }
}
