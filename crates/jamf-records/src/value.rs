//! The structured value every record body is made of.
//!
//! Jamf's Classic API speaks XML, which the connection layer decodes into a
//! loose tree of maps, lists and scalars. [`Value`] is that tree. Maps keep
//! their key order because the server is picky about element order when a
//! document is sent back.
//!
//! Besides the usual accessors this module has the *plain path* helpers
//! ([`Value::lookup`], [`Value::insert_at`], [`Value::remove_at`]). These take
//! slash separated keys only (`general/name`) and are what the registry uses
//! for defaults and save rules. Full query expressions with filters live in
//! [`crate::path`].

use crate::error::{JamfError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Ordered map used for every object node.
pub type Map = IndexMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Value>),
    Map(Map),
}

impl Value {
    /// An empty map node.
    pub fn map() -> Self {
        Value::Map(Map::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null, an empty string, or an empty container.
    ///
    /// The XML decoder produces all of these for an empty element.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            _ => false,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of the value, accepting numeric strings.
    ///
    /// XML has no number type, so ids and counters routinely arrive as text.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Scalar text form used for comparisons.
    ///
    /// Booleans become `true`/`false` and null becomes the empty string.
    /// Containers have no text form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::List(_) | Value::Map(_) => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.as_map_mut().and_then(|map| map.get_mut(key))
    }

    /// Follow a plain `a/b/c` path through nested maps.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        path.split('/')
            .filter(|part| !part.is_empty())
            .try_fold(self, |node, key| node.get(key))
    }

    pub fn lookup_mut(&mut self, path: &str) -> Option<&mut Value> {
        path.split('/')
            .filter(|part| !part.is_empty())
            .try_fold(self, |node, key| node.get_mut(key))
    }

    /// Write `value` at a plain path, creating intermediate maps.
    ///
    /// Null intermediates are replaced by maps; any other non-map node in
    /// the way is an error.
    pub fn insert_at(&mut self, path: &str, value: Value) -> Result<()> {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let Some((leaf, parents)) = parts.split_last() else {
            return Err(JamfError::InvalidData(format!("empty path `{path}`")));
        };

        let mut node = self;
        for part in parents {
            if node.is_null() {
                *node = Value::map();
            }
            let map = node.as_map_mut().ok_or_else(|| {
                JamfError::InvalidData(format!("`{part}` in `{path}` is not inside a map"))
            })?;
            node = map.entry(part.to_string()).or_insert(Value::Null);
        }

        if node.is_null() {
            *node = Value::map();
        }
        let map = node.as_map_mut().ok_or_else(|| {
            JamfError::InvalidData(format!("parent of `{leaf}` in `{path}` is not a map"))
        })?;
        map.insert(leaf.to_string(), value);
        Ok(())
    }

    /// Remove the value at a plain path, keeping sibling order.
    pub fn remove_at(&mut self, path: &str) -> Option<Value> {
        let (parent, leaf) = match path.rsplit_once('/') {
            Some((parent, leaf)) => (self.lookup_mut(parent)?, leaf),
            None => (self, path),
        };
        parent.as_map_mut()?.shift_remove(leaf)
    }

    /// Visit every string leaf mutably, depth first.
    pub fn for_each_string_mut(&mut self, f: &mut dyn FnMut(&mut String)) {
        match self {
            Value::String(s) => f(s),
            Value::List(items) => items.iter_mut().for_each(|v| v.for_each_string_mut(f)),
            Value::Map(map) => map.values_mut().for_each(|v| v.for_each_string_mut(f)),
            _ => {}
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Value::Number(n),
            Value::String(s) => serde_json::Value::String(s),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Map(map) => {
                serde_json::Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
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

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        Value::from(json!({
            "general": {"name": "lab-01", "id": "7"},
            "location": {"building": "BIOL"},
            "flags": [true, false]
        }))
    }

    #[test]
    fn test_as_text_scalars() {
        assert_eq!(Value::Null.as_text().unwrap(), "");
        assert_eq!(Value::Bool(true).as_text().unwrap(), "true");
        assert_eq!(Value::from(42_i64).as_text().unwrap(), "42");
        assert_eq!(Value::from("x").as_text().unwrap(), "x");
        assert!(Value::map().as_text().is_none());
        assert!(Value::List(vec![]).as_text().is_none());
    }

    #[test]
    fn test_as_i64_accepts_numeric_strings() {
        assert_eq!(Value::from("12").as_i64(), Some(12));
        assert_eq!(Value::from(-1_i64).as_i64(), Some(-1));
        assert_eq!(Value::from("twelve").as_i64(), None);
    }

    #[test]
    fn test_lookup_plain_path() {
        let v = sample();
        assert_eq!(v.lookup("general/name"), Some(&Value::from("lab-01")));
        assert_eq!(v.lookup("general/name/"), Some(&Value::from("lab-01")));
        assert!(v.lookup("general/missing").is_none());
        assert!(v.lookup("flags/0").is_none());
    }

    #[test]
    fn test_insert_at_creates_intermediate_maps() {
        let mut v = Value::map();
        v.insert_at("general/name", "abc".into()).unwrap();
        assert_eq!(v.lookup("general/name"), Some(&Value::from("abc")));

        let mut null_parent = Value::from(json!({"general": null}));
        null_parent.insert_at("general/name", "x".into()).unwrap();
        assert_eq!(null_parent.lookup("general/name"), Some(&Value::from("x")));
    }

    #[test]
    fn test_insert_at_rejects_scalar_parent() {
        let mut v = Value::from(json!({"general": "flat"}));
        let err = v.insert_at("general/name", "x".into()).unwrap_err();
        assert!(matches!(err, JamfError::InvalidData(_)));
    }

    #[test]
    fn test_remove_at_keeps_sibling_order() {
        let mut v = Value::from(json!({"a": {"x": 1, "y": 2, "z": 3}}));
        assert_eq!(v.remove_at("a/y"), Some(Value::from(2_i64)));
        let keys: Vec<&String> = v.get("a").unwrap().as_map().unwrap().keys().collect();
        assert_eq!(keys, vec!["x", "z"]);
        assert!(v.remove_at("a/missing").is_none());
    }

    #[test]
    fn test_clone_is_deep() {
        let original = sample();
        let mut copy = original.clone();
        copy.insert_at("general/name", "changed".into()).unwrap();
        assert_eq!(original.lookup("general/name"), Some(&Value::from("lab-01")));
    }

    #[test]
    fn test_for_each_string_mut_visits_nested_strings() {
        let mut v = Value::from(json!({"a": ["x", {"b": "y"}], "c": 1}));
        let mut seen = Vec::new();
        v.for_each_string_mut(&mut |s: &mut String| {
            seen.push(s.clone());
            s.push('!');
        });
        assert_eq!(seen.len(), 2);
        assert_eq!(v.lookup("a").unwrap().as_list().unwrap()[0], Value::from("x!"));
    }

    #[test]
    fn test_json_roundtrip_preserves_shape() {
        let json = json!({"list": [1, "two", null], "nested": {"ok": true}});
        let value = Value::from(json.clone());
        assert_eq!(serde_json::Value::from(value.clone()), json);
        let reparsed: Value = serde_json::from_str(&serde_json::to_string(&value).unwrap()).unwrap();
        assert_eq!(reparsed, value);
    }
}
