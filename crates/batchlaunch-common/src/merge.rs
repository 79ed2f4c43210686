//! Structural deep merge of configuration mappings
//!
//! Used to layer a job's own options over the batch-wide defaults. The merge is
//! not schema-aware: unknown keys pass through untouched and are only rejected
//! later, when the merged mapping is turned into a typed job definition.

use serde_json::{Map, Value};

/// Merge `overrides` on top of `defaults`, returning a new mapping.
///
/// For each key in `overrides`:
/// - both sides are mappings: merged recursively
/// - otherwise the override value replaces the default wholesale (sequences are
///   never concatenated)
///
/// Keys only present in `defaults` are kept as-is. Neither input is modified.
pub fn merge(
    defaults: &Map<String, Value>,
    overrides: &Map<String, Value>,
) -> Map<String, Value> {
    let mut merged = defaults.clone();
    for (key, value) in overrides {
        let next = match (merged.get(key), value) {
            (Some(Value::Object(base)), Value::Object(layer)) => {
                Value::Object(merge(base, layer))
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), next);
    }
    merged
}
