//! Recording adapters that capture interactions to cassettes.

pub mod clock;
pub mod row_store;

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_json::{json, Value};

use crate::cassette::recorder::CassetteRecorder;
use crate::error::StoreError;

pub use clock::RecordingClock;
pub use row_store::RecordingRowStore;

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Record an interaction with a plain (infallible) return value.
///
/// Mirror of `replaying::next_output`.
pub(crate) fn record_interaction<I, O>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    output: &O,
) where
    I: Serialize,
    O: Serialize,
{
    let mut guard = recorder.lock().unwrap_or_else(PoisonError::into_inner);
    guard.record(port, method, to_value(input), to_value(output));
}

/// Record a fallible interaction.
///
/// Mirror of `replaying::replay_result`. `Ok(v)` is stored as `{"Ok": v}`
/// and `Err(e)` as `{"Err": e}` with the error's message, code and status.
pub(crate) fn record_result<T, I>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, StoreError>,
) where
    T: Serialize,
    I: Serialize,
{
    let output = match result {
        Ok(v) => json!({ "Ok": to_value(v) }),
        Err(e) => json!({ "Err": to_value(e) }),
    };
    let mut guard = recorder.lock().unwrap_or_else(PoisonError::into_inner);
    guard.record(port, method, to_value(input), output);
}
