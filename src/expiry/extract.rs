//! Expiry-list extraction from contract-info JSON.
//!
//! The contract-info payload has changed shape over time, so the list is
//! located by an ordered set of named strategies. The first strategy that
//! finds an array wins; the "first array-valued key" fallback runs last and
//! relies on the payload's key order being preserved.

use serde_json::{Map, Value};

type Object = Map<String, Value>;

/// A named way of locating the expiry array inside the payload.
#[derive(Clone, Copy)]
pub struct ExtractionStrategy {
    pub name: &'static str,
    locate: fn(&Object) -> Option<&Vec<Value>>,
}

impl std::fmt::Debug for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionStrategy").field("name", &self.name).finish()
    }
}

impl ExtractionStrategy {
    /// Up to `limit` slots of the located array; non-string slots are skipped.
    pub fn extract(&self, root: &Object, limit: usize) -> Option<Vec<String>> {
        let values = (self.locate)(root)?;
        Some(
            values
                .iter()
                .take(limit)
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect(),
        )
    }
}

fn top_level_expiry_dates(root: &Object) -> Option<&Vec<Value>> {
    root.get("expiryDates")?.as_array()
}

fn top_level_expiries(root: &Object) -> Option<&Vec<Value>> {
    root.get("expiries")?.as_array()
}

fn nested_data_expiry_dates(root: &Object) -> Option<&Vec<Value>> {
    root.get("data")?.as_object()?.get("expiryDates")?.as_array()
}

fn first_array(root: &Object) -> Option<&Vec<Value>> {
    root.values().find_map(Value::as_array)
}

/// Strategies in priority order.
pub const STRATEGIES: [ExtractionStrategy; 4] = [
    ExtractionStrategy { name: "expiryDates", locate: top_level_expiry_dates },
    ExtractionStrategy { name: "expiries", locate: top_level_expiries },
    ExtractionStrategy { name: "data.expiryDates", locate: nested_data_expiry_dates },
    ExtractionStrategy { name: "first-array", locate: first_array },
];

/// Up to `limit` expiry strings from a contract-info payload, in array order.
///
/// Empty, malformed or non-object JSON yields an empty list.
pub fn extract_expiries(json: &str, limit: usize) -> Vec<String> {
    let trimmed = json.trim();
    if trimmed.is_empty() || trimmed == "{}" {
        tracing::warn!("no expiry JSON available");
        return Vec::new();
    }

    let root = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            tracing::warn!("expiry JSON is not an object");
            return Vec::new();
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to parse expiry JSON");
            return Vec::new();
        }
    };

    for strategy in &STRATEGIES {
        if let Some(expiries) = strategy.extract(&root, limit) {
            tracing::info!(strategy = strategy.name, count = expiries.len(), ?expiries, "expiry dates extracted");
            return expiries;
        }
    }

    tracing::warn!("no expiry array found in contract info");
    Vec::new()
}
