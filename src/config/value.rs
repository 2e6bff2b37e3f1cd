//! Tagged configuration and argument values.
//!
//! # Responsibilities
//! - Represent request args and config trees as one recursive type
//! - Deep-merge trees layer by layer
//! - Address nested nodes with dotted paths ("roles.dev.options")
//! - Expand dotted keys into nested mappings
//!
//! # Merge Rules
//! ```text
//! scalar  ← scalar   : later value replaces earlier
//! mapping ← mapping  : merged key by key, recursively
//! scalar  ← mapping  : mapping replaces the scalar
//! mapping ← scalar   : mapping is kept
//! ```
//! Sequences are treated as scalars (replaced, never concatenated).

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ordered mapping of string keys to values.
pub type Map = IndexMap<String, Value>;

/// A configuration tree: a mapping whose leaves are scalars or nested trees.
pub type ConfigNode = Map;

/// A recursive string/number/bool/sequence/mapping value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Seq(Vec<Value>),
    Map(Map),
}

/// Error raised by typed accessors on a mismatched value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("expected {expected} at '{key}', found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("missing value at '{0}'")]
    Missing(String),
}

impl Value {
    /// Name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "mapping",
        }
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// String accessor that reports a mismatch instead of coercing.
    pub fn try_str(&self, key: &str) -> Result<&str, ValueError> {
        self.as_str().ok_or_else(|| self.mismatch(key, "string"))
    }

    /// Mapping accessor that reports a mismatch instead of coercing.
    pub fn try_map(&self, key: &str) -> Result<&Map, ValueError> {
        self.as_map().ok_or_else(|| self.mismatch(key, "mapping"))
    }

    /// Integer accessor; accepts `Int` and decimal strings (form input is textual).
    pub fn try_i64(&self, key: &str) -> Result<i64, ValueError> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::String(s) => s.trim().parse().map_err(|_| self.mismatch(key, "int")),
            _ => Err(self.mismatch(key, "int")),
        }
    }

    /// Interprets an on/off request flag: only `1` and `"1"` are on.
    ///
    /// `Bool` is accepted as stored. Returns `None` for other non-numeric values.
    pub fn parse_flag(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(n) => Some(*n == 1),
            Value::String(s) => match s.trim() {
                "1" => Some(true),
                "" => Some(false),
                other => other.parse::<i64>().ok().map(|_| false),
            },
            _ => None,
        }
    }

    /// True for empty strings, empty sequences and empty mappings.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::String(s) => s.is_empty(),
            Value::Seq(items) => items.is_empty(),
            Value::Map(m) => m.is_empty(),
            _ => false,
        }
    }

    /// Look up a dotted path inside this value.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        self.as_map().and_then(|m| get_path(m, path))
    }

    fn mismatch(&self, key: &str, expected: &'static str) -> ValueError {
        ValueError::TypeMismatch {
            key: key.to_string(),
            expected,
            found: self.kind(),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Map(Map::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => f.write_str(s),
            other => match serde_json::to_string(other) {
                Ok(json) => f.write_str(&json),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::Map(m)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Seq(items)
    }
}

/// Deep-merge `layer` onto `target`.
pub fn deep_merge(target: &mut Map, layer: &Map) {
    for (key, incoming) in layer {
        match target.get_mut(key) {
            Some(existing) => merge_value(existing, incoming),
            None => {
                target.insert(key.clone(), incoming.clone());
            }
        }
    }
}

fn merge_value(existing: &mut Value, incoming: &Value) {
    match (existing, incoming) {
        (Value::Map(current), Value::Map(next)) => deep_merge(current, next),
        // A scalar cannot be merged into a mapping; the mapping stays.
        (Value::Map(_), _) => {}
        (slot, incoming) => *slot = incoming.clone(),
    }
}

/// Look up a dotted path. Empty segments never match.
pub fn get_path<'a>(root: &'a Map, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = current.as_map()?.get(segment)?;
    }
    Some(current)
}

/// Mutable variant of [`get_path`].
pub fn get_path_mut<'a>(root: &'a mut Map, path: &str) -> Option<&'a mut Value> {
    let mut segments = path.split('.');
    let mut current = root.get_mut(segments.next()?)?;
    for segment in segments {
        current = current.as_map_mut()?.get_mut(segment)?;
    }
    Some(current)
}

/// Set a value at a dotted path, creating intermediate mappings.
///
/// Scalars found along the way are replaced by mappings.
pub fn set_path(root: &mut Map, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            root.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = root
                .entry(head.to_string())
                .or_insert_with(|| Value::Map(Map::new()));
            if !slot.is_map() {
                *slot = Value::Map(Map::new());
            }
            if let Value::Map(child) = slot {
                set_path(child, rest, value);
            }
        }
    }
}

/// Remove and return the value at a dotted path.
pub fn remove_path(root: &mut Map, path: &str) -> Option<Value> {
    match path.rsplit_once('.') {
        None => root.shift_remove(path),
        Some((parent, leaf)) => get_path_mut(root, parent)?
            .as_map_mut()?
            .shift_remove(leaf),
    }
}

/// Expand dotted keys into nested mappings, recursively.
///
/// `{"theme.color": "dark", "a": {"b.c": 1}}` becomes
/// `{"theme": {"color": "dark"}, "a": {"b": {"c": 1}}}`. Keys that collide
/// after expansion are deep-merged in input order.
pub fn expand_dotted(flat: &Map) -> Map {
    let mut out = Map::new();
    for (key, value) in flat {
        let value = match value {
            Value::Map(child) => Value::Map(expand_dotted(child)),
            other => other.clone(),
        };
        let mut nested = Map::new();
        set_path(&mut nested, key, value);
        deep_merge(&mut out, &nested);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tree(src: &str) -> Map {
        toml::from_str(src).unwrap()
    }

    #[test]
    fn test_scalar_later_layer_wins() {
        let mut base = tree("theme = \"light\"\nsize = 3");
        deep_merge(&mut base, &tree("theme = \"dark\""));
        assert_eq!(base["theme"], Value::from("dark"));
        assert_eq!(base["size"], Value::Int(3));
    }

    #[test]
    fn test_mapping_absorbs_new_keys() {
        let mut base = tree("[p]\na = 1");
        deep_merge(&mut base, &tree("[p]\nb = 2"));
        assert_eq!(base["p"], Value::Map(tree("a = 1\nb = 2")));
    }

    #[test]
    fn test_mapping_beats_scalar_in_both_orders() {
        let mut scalar_first = tree("p = 1");
        deep_merge(&mut scalar_first, &tree("[p]\na = 1"));
        assert_eq!(scalar_first["p"], Value::Map(tree("a = 1")));

        let mut mapping_first = tree("[p]\na = 1");
        deep_merge(&mut mapping_first, &tree("p = 7"));
        assert_eq!(mapping_first["p"], Value::Map(tree("a = 1")));
    }

    #[test]
    fn test_sequences_are_replaced() {
        let mut base = tree("list = [1, 2]");
        deep_merge(&mut base, &tree("list = [3]"));
        assert_eq!(base["list"], Value::Seq(vec![Value::Int(3)]));
    }

    #[test]
    fn test_dotted_paths() {
        let mut root = tree("[roles.dev.options]\ntheme = \"system\"");
        assert_eq!(
            get_path(&root, "roles.dev.options.theme"),
            Some(&Value::from("system"))
        );
        assert!(get_path(&root, "roles.live.options").is_none());
        assert!(get_path(&root, "").is_none());

        set_path(&mut root, "roles.dev.options.font", Value::from("serif"));
        assert_eq!(
            get_path(&root, "roles.dev.options.font"),
            Some(&Value::from("serif"))
        );

        let removed = remove_path(&mut root, "roles.dev.options.theme");
        assert_eq!(removed, Some(Value::from("system")));
        assert!(get_path(&root, "roles.dev.options.theme").is_none());
    }

    #[test]
    fn test_set_path_replaces_scalar_parent() {
        let mut root = tree("a = 1");
        set_path(&mut root, "a.b", Value::Int(2));
        assert_eq!(get_path(&root, "a.b"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_expand_dotted_keys() {
        let mut flat = Map::new();
        flat.insert("theme.color".into(), Value::from("dark"));
        flat.insert("theme.font".into(), Value::from("mono"));
        let mut inner = Map::new();
        inner.insert("b.c".into(), Value::Int(1));
        flat.insert("a".into(), Value::Map(inner));

        let expanded = expand_dotted(&flat);
        assert_eq!(expanded, tree("[theme]\ncolor = \"dark\"\nfont = \"mono\"\n[a.b]\nc = 1"));
    }

    #[test]
    fn test_typed_accessors_do_not_coerce() {
        let v = Value::Int(5);
        assert!(matches!(
            v.try_str("cobrand"),
            Err(ValueError::TypeMismatch { expected: "string", found: "int", .. })
        ));
        assert_eq!(Value::from("42").try_i64("n"), Ok(42));
        assert!(Value::from("x").try_i64("n").is_err());
        assert_eq!(Value::from("1").parse_flag(), Some(true));
        assert_eq!(Value::Int(0).parse_flag(), Some(false));
        assert_eq!(Value::from("maybe").parse_flag(), None);
        assert_eq!(Value::from("true").parse_flag(), None);
        assert_eq!(Value::from("2").parse_flag(), Some(false));
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            "[a-z]{0,6}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..3).prop_map(Value::Seq),
                prop::collection::vec(("[a-d]", inner), 0..4)
                    .prop_map(|pairs| Value::Map(pairs.into_iter().collect())),
            ]
        })
    }

    fn arb_tree() -> impl Strategy<Value = Map> {
        prop::collection::vec(("[a-d]", arb_value()), 0..5)
            .prop_map(|pairs| pairs.into_iter().collect())
    }

    proptest! {
        #[test]
        fn prop_merge_onto_self_is_identity(t in arb_tree()) {
            let mut merged = t.clone();
            deep_merge(&mut merged, &t);
            prop_assert_eq!(merged, t);
        }

        #[test]
        fn prop_later_scalar_wins(a in arb_tree(), b in arb_tree(), x in any::<i64>(), y in any::<i64>()) {
            let mut l1 = a;
            set_path(&mut l1, "p.q", Value::Int(x));
            let mut l2 = b;
            set_path(&mut l2, "p.q", Value::Int(y));
            let mut acc = Map::new();
            deep_merge(&mut acc, &l1);
            deep_merge(&mut acc, &l2);
            prop_assert_eq!(get_path(&acc, "p.q"), Some(&Value::Int(y)));
        }
    }
}
