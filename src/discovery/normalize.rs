//! Field extraction over heterogeneous feed payloads.
//!
//! Feeds disagree on shape, so lookups take a prioritized list of dotted
//! accessor paths and return the first present, non-null value.

use serde_json::Value;

/// Resolve the first path that yields a present, non-null value.
pub fn pick_path<'a>(value: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    for path in paths {
        let mut cur = value;
        let mut ok = true;
        for key in path.split('.') {
            match cur.get(key) {
                Some(next) => cur = next,
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if ok && !cur.is_null() {
            return Some(cur);
        }
    }
    None
}

/// Coerce a JSON value to a finite number; numeric strings are accepted.
pub fn to_num(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Coerce a JSON value to a non-empty string.
pub fn to_str(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
