//! Dot-path navigation over ordered mappings.

use super::{Map, Value};

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '.';

/// Split a path into its first segment and the remaining path, if any.
pub fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once(PATH_SEPARATOR) {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

/// Read the value stored at `path` inside `map`.
pub fn lookup<'a>(map: &'a Map, path: &str) -> Option<&'a Value> {
    let (head, rest) = split_path(path);
    let value = map.get(head)?;
    match rest {
        Some(rest) => value.get_path(rest),
        None => Some(value),
    }
}

/// Write `value` at `path` inside `map`.
///
/// Missing intermediate segments are created as mappings. An intermediate
/// segment holding anything other than a mapping or a nested content node is
/// replaced by an empty mapping, discarding the old value.
pub fn insert(map: &mut Map, path: &str, value: Value) {
    let (head, rest) = split_path(path);
    match rest {
        None => {
            map.insert(head.to_string(), value);
        }
        Some(rest) => insert_below(map.entry(head.to_string()).or_default(), rest, value),
    }
}

/// Write `value` at `path` below `slot`, turning `slot` into a mapping first
/// unless it already is one (or a nested content node).
pub fn insert_below(slot: &mut Value, path: &str, value: Value) {
    if !matches!(slot, Value::Object(_) | Value::Content(_)) {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(inner) => insert(inner, path, value),
        Value::Content(content) => {
            content.set_property(path, value);
        }
        _ => {}
    }
}

/// Remove and return the value stored at `path`, leaving parents in place.
pub fn remove(map: &mut Map, path: &str) -> Option<Value> {
    let (head, rest) = split_path(path);
    match rest {
        None => map.remove(head),
        Some(rest) => match map.get_mut(head)? {
            Value::Object(inner) => remove(inner, rest),
            Value::Content(content) => content.remove_property(rest),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("a.b.c"), ("a", Some("b.c")));
        assert_eq!(split_path("a"), ("a", None));
    }

    #[test]
    fn test_insert_materializes_mappings() {
        let mut map = Map::new();
        insert(&mut map, "a.b.c", Value::from(5));

        assert_eq!(lookup(&map, "a.b.c"), Some(&Value::from(5)));
        assert!(lookup(&map, "a.b").and_then(Value::as_object).is_some());
    }

    #[test]
    fn test_insert_overwrites_scalar_parent() {
        let mut map = Map::new();
        insert(&mut map, "foo", Value::from("scalar"));
        insert(&mut map, "foo.bar", Value::from(1));

        assert_eq!(lookup(&map, "foo.bar"), Some(&Value::from(1)));
        assert!(lookup(&map, "foo").and_then(Value::as_str).is_none());
    }

    #[test]
    fn test_insert_keeps_siblings() {
        let mut map = Map::new();
        insert(&mut map, "foo.bar", Value::from(1));
        insert(&mut map, "foo.baz", Value::from(2));

        assert_eq!(lookup(&map, "foo.bar"), Some(&Value::from(1)));
        assert_eq!(lookup(&map, "foo.baz"), Some(&Value::from(2)));
    }

    #[test]
    fn test_remove() {
        let mut map = Map::new();
        insert(&mut map, "foo.bar", Value::from(1));

        assert_eq!(remove(&mut map, "foo.bar"), Some(Value::from(1)));
        assert!(lookup(&map, "foo.bar").is_none());
        assert!(lookup(&map, "foo").is_some());
        assert!(remove(&mut map, "missing.path").is_none());
    }
}
