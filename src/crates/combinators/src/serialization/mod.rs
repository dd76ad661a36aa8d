//! Argument keys
//!
//! `Memoize` and `Dedupe` identify calls by a string key. The default key is
//! the stable JSON serialization of the argument value: object keys are
//! sorted at every level, so two argument values share a key exactly when
//! their stable serializations are byte-identical.
//!
//! Closures, cyclic data and other values without a `Serialize` impl need a
//! custom resolver (see [`resolver`]).

use crate::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Computes the cache key for one call's arguments
pub type KeyFn<A> = Arc<dyn Fn(&A) -> Result<String> + Send + Sync>;

/// Key function that serializes the arguments to stable JSON
///
/// # Example
///
/// ```rust
/// use combinators::serialization::default_key;
///
/// let key = default_key::<(u32, String)>();
/// assert_eq!(key(&(1, "a".to_string())).unwrap(), r#"[1,"a"]"#);
/// ```
pub fn default_key<A: Serialize + 'static>() -> KeyFn<A> {
    Arc::new(|args: &A| to_stable_json(args))
}

/// Lift an infallible resolver into a [`KeyFn`]
///
/// # Example
///
/// ```rust
/// use combinators::serialization::resolver;
///
/// let key = resolver(|id: &u64| format!("user:{id}"));
/// assert_eq!(key(&7).unwrap(), "user:7");
/// ```
pub fn resolver<A, R>(resolve: R) -> KeyFn<A>
where
    A: 'static,
    R: Fn(&A) -> String + Send + Sync + 'static,
{
    Arc::new(move |args: &A| Ok(resolve(args)))
}

/// Serialize a JSON value with object keys sorted at every level
///
/// ```rust
/// use combinators::serialization::stable_json_string;
/// use serde_json::json;
///
/// let stable = stable_json_string(&json!({"b": 2, "a": 1})).unwrap();
/// assert_eq!(stable, r#"{"a":1,"b":2}"#);
/// ```
pub fn stable_json_string(value: &Value) -> Result<String> {
    let normalized = normalize_json(value.clone());
    Ok(serde_json::to_string(&normalized)?)
}

/// Serialize any value to stable JSON
pub fn to_stable_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json_value = serde_json::to_value(value)?;
    stable_json_string(&json_value)
}

// serde_json keeps insertion order when built with `preserve_order`, which
// any crate in the dependency graph may switch on.
fn normalize_json(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, normalize_json(v)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(normalize_json).collect()),
        other => other,
    }
}

/// Shorten a key for log output, respecting UTF-8 boundaries
pub fn truncate_key(key: &str, max_length: usize) -> String {
    if key.len() <= max_length {
        return key.to_string();
    }

    let max_length = max_length.max(10);
    let mut truncate_at = max_length - 3;
    while truncate_at > 0 && !key.is_char_boundary(truncate_at) {
        truncate_at -= 1;
    }

    format!("{}...", &key[..truncate_at])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_stable_json_nested() {
        let val = json!({
            "outer": {"z": 26, "a": 1},
            "array": [3, 2, 1]
        });
        let stable = stable_json_string(&val).unwrap();
        assert_eq!(stable, r#"{"array":[3,2,1],"outer":{"a":1,"z":26}}"#);
    }

    #[test]
    fn test_to_stable_json_struct_fields_sorted() {
        #[derive(Serialize)]
        struct Query {
            page: u32,
            filter: String,
        }

        let key = to_stable_json(&Query {
            page: 2,
            filter: "open".into(),
        })
        .unwrap();
        assert_eq!(key, r#"{"filter":"open","page":2}"#);
    }

    #[test]
    fn test_default_key_distinguishes_types() {
        let key = default_key::<Value>();
        assert_ne!(key(&json!(1)).unwrap(), key(&json!("1")).unwrap());
        assert_ne!(key(&json!([1, 2])).unwrap(), key(&json!([2, 1])).unwrap());
    }

    #[test]
    fn test_non_string_map_keys_fail() {
        let mut args: HashMap<(u8, u8), u8> = HashMap::new();
        args.insert((1, 2), 3);
        let result = to_stable_json(&args);
        assert!(matches!(result, Err(crate::CombinatorError::Key(_))));
    }

    #[test]
    fn test_resolver() {
        let key = resolver(|args: &(String, u32)| args.0.clone());
        assert_eq!(key(&("same".into(), 1)).unwrap(), key(&("same".into(), 2)).unwrap());
    }

    #[test]
    fn test_truncate_key() {
        assert_eq!(truncate_key("short", 64), "short");

        let truncated = truncate_key(&"x".repeat(100), 20);
        assert_eq!(truncated.len(), 20);
        assert!(truncated.ends_with("..."));

        let emoji = truncate_key("🎉🎊🎈🎉🎊🎈", 12);
        assert!(emoji.ends_with("..."));
    }

    proptest! {
        #[test]
        fn prop_key_ignores_insertion_order(entries in proptest::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..12)) {
            let forward: serde_json::Map<String, Value> =
                entries.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
            let reversed: serde_json::Map<String, Value> =
                entries.iter().rev().map(|(k, v)| (k.clone(), json!(v))).collect();

            prop_assert_eq!(
                stable_json_string(&Value::Object(forward)).unwrap(),
                stable_json_string(&Value::Object(reversed)).unwrap()
            );
        }
    }
}
