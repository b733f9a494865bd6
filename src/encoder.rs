/// Result encoding
///
/// Flattens rich backend results onto the only values the channel allows:
/// a boolean, a list of strings, or the not-implemented signal.
/// Failure causes are logged here and then dropped.

use serde_json::Value;
use tracing::{debug, warn};

use crate::channel::Reply;
use crate::error::{BackendResult, BridgeError, FailureKind};

/// Encode a boolean outcome. Any failure becomes `false`.
pub fn encode_flag(method: &str, result: BackendResult<bool>) -> Reply {
    match result {
        Ok(value) => {
            debug!(method, value, "command succeeded");
            Reply::Success(Value::Bool(value))
        }
        Err(err) => coalesce(method, err, Value::Bool(false)),
    }
}

/// Encode a list outcome. Any failure becomes an empty list.
pub fn encode_names(method: &str, result: BackendResult<Vec<String>>) -> Reply {
    match result {
        Ok(names) => {
            debug!(method, count = names.len(), "command succeeded");
            Reply::Success(Value::Array(names.into_iter().map(Value::String).collect()))
        }
        Err(err) => coalesce(method, err, Value::Array(Vec::new())),
    }
}

fn coalesce(method: &str, err: BridgeError, fallback: Value) -> Reply {
    match err.kind() {
        FailureKind::Unimplemented => {
            debug!(method, error = %err, "command not implemented by backend");
            Reply::NotImplemented
        }
        FailureKind::TransactionFailed | FailureKind::PartialFailure => {
            warn!(method, kind = ?err.kind(), error = %err, "command failed");
            Reply::Success(fallback)
        }
        kind => {
            debug!(method, ?kind, error = %err, "command failed");
            Reply::Success(fallback)
        }
    }
}
