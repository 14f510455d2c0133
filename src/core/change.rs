//! Structural change detection between a cached payload and a fresh one.

use crate::core::error::RefreshError;
use serde::Serialize;
use serde_json::Value;

/// Returns `true` when `next` should replace `previous`.
///
/// A missing previous value always counts as a change. Comparison failures
/// (content that cannot be serialized) also count as a change so that an
/// update is never dropped.
pub fn has_changed<T: Serialize>(previous: Option<&T>, next: &T) -> bool {
    let Some(previous) = previous else {
        return true;
    };

    match compare(previous, next) {
        Ok(changed) => changed,
        Err(e) => {
            tracing::warn!(error = %e, "Change detection failed, treating payload as changed");
            true
        }
    }
}

/// Structural comparison of two payloads over their serialized content.
///
/// Sequences of different length short-circuit to "changed"; otherwise
/// sequences compare element by element in order and mappings compare by
/// key set and values.
pub fn compare<T: Serialize>(previous: &T, next: &T) -> Result<bool, RefreshError> {
    let previous = to_value(previous)?;
    let next = to_value(next)?;

    if let (Value::Array(prev_items), Value::Array(next_items)) = (&previous, &next) {
        if prev_items.len() != next_items.len() {
            return Ok(true);
        }
    }

    Ok(previous != next)
}

fn to_value<T: Serialize>(payload: &T) -> Result<Value, RefreshError> {
    serde_json::to_value(payload).map_err(|e| RefreshError::Comparison {
        message: e.to_string(),
    })
}
