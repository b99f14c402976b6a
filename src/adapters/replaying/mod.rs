//! Replaying adapters that serve recorded interactions.

pub mod clock;
pub mod row_store;

use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cassette::replayer::CassetteReplayer;
use crate::error::StoreError;

pub use clock::ReplayingClock;
pub use row_store::ReplayingRowStore;

/// Output of the next recorded call to `port::method`.
///
/// Mirror of `recording::record_interaction`.
pub(crate) fn next_output(replayer: &Mutex<CassetteReplayer>, port: &str, method: &str) -> Value {
    replayer.lock().unwrap_or_else(PoisonError::into_inner).next_interaction(port, method).output
}

/// Decodes an `{"Ok": v}` / `{"Err": e}` output.
///
/// Mirror of `recording::record_result`. Errors recorded as bare strings
/// are accepted too.
pub(crate) fn replay_result<T: DeserializeOwned>(output: Value) -> Result<T, StoreError> {
    let Value::Object(mut map) = output else {
        return Err(StoreError::new(format!("Malformed cassette output: {output}")));
    };
    if let Some(ok) = map.remove("Ok") {
        return serde_json::from_value(ok)
            .map_err(|e| StoreError::new(format!("Cassette output does not decode: {e}")));
    }
    match map.remove("Err") {
        Some(Value::String(message)) => Err(StoreError::new(message)),
        Some(err) => Err(serde_json::from_value(err)
            .unwrap_or_else(|e| StoreError::new(format!("Cassette error does not decode: {e}")))),
        None => Err(StoreError::new("Cassette output has neither Ok nor Err")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_output_decodes() {
        let value: Vec<u32> = replay_result(json!({"Ok": [1, 2]})).unwrap();
        assert_eq!(value, [1, 2]);
    }

    #[test]
    fn structured_error_keeps_status() {
        let err = replay_result::<()>(json!({"Err": {"message": "JWT expired", "status": 401}}))
            .unwrap_err();
        assert_eq!(err, StoreError::new("JWT expired").with_status(401));
    }

    #[test]
    fn string_error_is_accepted() {
        let err = replay_result::<()>(json!({"Err": "offline"})).unwrap_err();
        assert_eq!(err.message, "offline");
    }

    #[test]
    fn malformed_output_is_an_error() {
        assert!(replay_result::<()>(json!("nope")).is_err());
        assert!(replay_result::<()>(json!({})).is_err());
    }
}
