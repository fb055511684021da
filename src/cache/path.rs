//! Dot-separated path addressing into a stored wizard document.

use serde_json::{Map, Value};

/// A stored wizard document: step slugs mapping to arbitrary JSON plus the
/// reserved `_last_index` field.
pub type Document = Map<String, Value>;

/// Resolve `key` (`"step.field"`) inside `document`.
///
/// Returns `None` as soon as a segment is missing or an intermediate value
/// is not an object.
pub fn get<'a>(document: &'a Document, key: &str) -> Option<&'a Value> {
    let mut segments = key.split('.');
    let first = segments.next()?;
    let mut current = document.get(first)?;

    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Write `value` at `key`, creating intermediate objects as needed.
///
/// Intermediate values that are not objects are replaced by an empty object,
/// and the value at the final segment is overwritten, never merged.
pub fn set(document: &mut Document, key: &str, value: Value) {
    let (parents, last) = match key.rsplit_once('.') {
        Some((parents, last)) => (Some(parents), last),
        None => (None, key),
    };

    let mut current = document;
    for segment in parents.into_iter().flat_map(|p| p.split('.')) {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Some(map) = entry.as_object_mut() else {
            return;
        };
        current = map;
    }

    current.insert(last.to_string(), value);
}

/// Join a step slug and an optional field key into a cache path.
pub fn step_key(slug: &str, key: Option<&str>) -> String {
    match key {
        Some(key) if !key.is_empty() => format!("{}.{}", slug, key),
        _ => slug.to_string(),
    }
}
