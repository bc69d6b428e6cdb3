//! Configuration tree and dotted-path lookup.
//!
//! The tree is built once, by deep-merging the supplied configuration over
//! the defaults, and never changes afterwards. Lookups hand out owned
//! copies so no caller can reach into the live tree.
//!
//! # Examples
//! ```
//! use hearth_core::config::Configuration;
//! use serde_json::json;
//!
//! let config = Configuration::merged(
//!     json!({"vfs": {"root": "/", "mounts": ["home"]}}),
//!     json!({"vfs": {"mounts": ["shared"]}}),
//! );
//!
//! assert_eq!(config.get("vfs.root"), Some(json!("/")));
//! assert_eq!(config.get("vfs.mounts.1"), Some(json!("shared")));
//! assert_eq!(config.get_or("vfs.readonly", false), json!(false));
//! ```

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

/// Immutable configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    tree: Value,
}

impl Configuration {
    /// Wraps an already merged tree.
    pub fn new(tree: Value) -> Self {
        Self { tree }
    }

    /// Builds the tree by deep-merging `overrides` over `defaults`.
    pub fn merged(defaults: Value, overrides: Value) -> Self {
        Self::new(merge(defaults, overrides))
    }

    /// Looks up a dotted key.
    ///
    /// An empty key returns a copy of the whole tree. A missing segment, or
    /// a segment that descends into a scalar, yields `None`. A stored `null`
    /// is a present value.
    pub fn get(&self, key: &str) -> Option<Value> {
        if key.is_empty() {
            return Some(self.tree.clone());
        }
        resolve(&self.tree, key).cloned()
    }

    /// Looks up a dotted key, falling back to `default` when it is absent.
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Looks up a dotted key and deserializes it.
    ///
    /// Values that do not fit `T` are treated as absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = if key.is_empty() {
            &self.tree
        } else {
            resolve(&self.tree, key)?
        };

        match T::deserialize(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                trace!(key, error = %e, "Config value has unexpected shape");
                None
            }
        }
    }

    /// Borrow of the whole tree.
    pub fn tree(&self) -> &Value {
        &self.tree
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new(Value::Object(Default::default()))
    }
}

/// Walks `tree` along the `.`-separated segments of `key`.
///
/// Objects are indexed by name and arrays by decimal position.
pub fn resolve<'a>(tree: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(tree, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Deep-merges `overrides` into `defaults`.
///
/// Objects merge key by key, arrays concatenate (defaults first), and any
/// other override value replaces the default outright.
pub fn merge(defaults: Value, overrides: Value) -> Value {
    match (defaults, overrides) {
        (Value::Object(mut base), Value::Object(over)) => {
            for (key, value) in over {
                let merged = match base.remove(&key) {
                    Some(existing) => merge(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (Value::Array(mut base), Value::Array(over)) => {
            base.extend(over);
            Value::Array(base)
        }
        (_, over) => over,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Configuration {
        Configuration::new(json!({
            "a": {"b": {"c": 42}},
            "flag": null,
            "list": [{"id": 1}, {"id": 2}],
            "name": "desktop",
        }))
    }

    #[test]
    fn resolves_nested_leaf() {
        assert_eq!(sample().get("a.b.c"), Some(json!(42)));
    }

    #[test]
    fn missing_leaf_uses_default() {
        assert_eq!(sample().get_or("a.b.x", "fallback"), json!("fallback"));
    }

    #[test]
    fn descending_into_scalar_uses_default() {
        let config = sample();
        assert_eq!(config.get_or("a.b.c.d", 0), json!(0));
        assert_eq!(config.get_or("name.length", 0), json!(0));
        assert_eq!(config.get_or("flag.inner", "x"), json!("x"));
    }

    #[test]
    fn null_is_a_present_value() {
        assert_eq!(sample().get_or("flag", true), Value::Null);
    }

    #[test]
    fn arrays_index_by_position() {
        let config = sample();
        assert_eq!(config.get("list.1.id"), Some(json!(2)));
        assert_eq!(config.get("list.7"), None);
        assert_eq!(config.get("list.first"), None);
    }

    #[test]
    fn empty_key_returns_whole_tree() {
        let config = sample();
        assert_eq!(config.get(""), Some(config.tree().clone()));
    }

    #[test]
    fn empty_segment_is_missing() {
        assert_eq!(sample().get("a..b"), None);
    }

    #[test]
    fn typed_lookup() {
        let config = sample();
        assert_eq!(config.get_as::<u32>("a.b.c"), Some(42));
        assert_eq!(config.get_as::<String>("a.b.c"), None);
        assert_eq!(config.get_as::<String>("name").as_deref(), Some("desktop"));
    }

    #[test]
    fn returned_values_are_detached() {
        let config = sample();
        let mut copy = config.get("a").unwrap();
        copy["b"]["c"] = json!(0);
        assert_eq!(config.get("a.b.c"), Some(json!(42)));
    }

    #[test]
    fn merge_objects_recursively() {
        let merged = merge(
            json!({"http": {"port": 8000, "host": "localhost"}}),
            json!({"http": {"port": 9000}, "debug": true}),
        );
        assert_eq!(
            merged,
            json!({"http": {"port": 9000, "host": "localhost"}, "debug": true})
        );
    }

    #[test]
    fn merge_concatenates_arrays() {
        let merged = merge(json!({"mounts": ["a"]}), json!({"mounts": ["b", "c"]}));
        assert_eq!(merged, json!({"mounts": ["a", "b", "c"]}));
    }

    #[test]
    fn merge_override_replaces_mismatched_shapes() {
        assert_eq!(merge(json!({"x": {"y": 1}}), json!({"x": 5})), json!({"x": 5}));
        assert_eq!(merge(json!({"x": 1}), json!({"x": null})), json!({"x": null}));
        assert_eq!(merge(json!([1]), json!({"k": 1})), json!({"k": 1}));
    }

    #[test]
    fn merged_constructor() {
        let config = Configuration::merged(json!({"a": 1}), json!({"b": 2}));
        assert_eq!(config.get(""), Some(json!({"a": 1, "b": 2})));
    }
}
