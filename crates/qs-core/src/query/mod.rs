//! Typed query-string state
//!
//! A [`QueryState`] is the typed view of a URL's query component. Values are
//! strings, numbers, booleans or ordered string sequences. A [`QueryPatch`]
//! describes a change to that state, where `None` removes a key.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

mod codec;

pub use codec::{parse, serialize, CodecConfig, QueryCodec, SerializeOptions};

/// A single value held in the query string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<String>),
}

impl QueryValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            QueryValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Integral numbers only; `2.5` yields `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            QueryValue::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            QueryValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            QueryValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Loose truthiness used for mode flags (`add`, `edit`, `view`).
    ///
    /// `false`, `0`, `NaN` and the empty string are falsy. Sequences are
    /// always truthy, even when empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            QueryValue::Bool(b) => *b,
            QueryValue::Number(n) => *n != 0.0 && !n.is_nan(),
            QueryValue::String(s) => !s.is_empty(),
            QueryValue::List(_) => true,
        }
    }

    /// Text form of a scalar value as it appears in the URL.
    ///
    /// Sequences have no single text form and return `None`.
    pub fn to_scalar_text(&self) -> Option<String> {
        match self {
            QueryValue::Bool(b) => Some(b.to_string()),
            QueryValue::Number(n) => Some(n.to_string()),
            QueryValue::String(s) => Some(s.clone()),
            QueryValue::List(_) => None,
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::String(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::String(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Number(value)
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for QueryValue {
                fn from(value: $t) -> Self {
                    QueryValue::Number(value as f64)
                }
            }
        )*
    }
}

impl_from_integer!(i32, i64, u32, u64, usize);

impl From<Vec<String>> for QueryValue {
    fn from(value: Vec<String>) -> Self {
        QueryValue::List(value)
    }
}

impl From<Vec<&str>> for QueryValue {
    fn from(value: Vec<&str>) -> Self {
        QueryValue::List(value.into_iter().map(String::from).collect())
    }
}

/// Typed mapping derived from a URL's query component
///
/// Lookup is order-insensitive and so is equality. Iteration follows
/// insertion order; the codec sorts keys when serializing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryState(IndexMap<String, QueryValue>);

impl QueryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Option<QueryValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<QueryValue> {
        self.0.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &QueryValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Whether `key` is present with a truthy value.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).map(QueryValue::is_truthy).unwrap_or(false)
    }

    /// Overlay `patch` on a copy of this state.
    ///
    /// Keys set in the patch win on collision; keys patched to `None` are
    /// removed. Existing keys keep their position, new keys are appended.
    pub fn merged(&self, patch: &QueryPatch) -> QueryState {
        let mut next = self.clone();
        for (key, value) in patch.iter() {
            match value {
                Some(value) => {
                    next.0.insert(key.clone(), value.clone());
                }
                None => {
                    next.0.shift_remove(key);
                }
            }
        }
        next
    }

    /// The state a patch describes on its own, with removals dropped.
    pub fn from_patch(patch: &QueryPatch) -> QueryState {
        QueryState::new().merged(patch)
    }

    /// Copy restricted to the given keys.
    pub fn restricted_to(&self, keys: &[&str]) -> QueryState {
        self.0
            .iter()
            .filter(|(k, _)| keys.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl FromIterator<(String, QueryValue)> for QueryState {
    fn from_iter<I: IntoIterator<Item = (String, QueryValue)>>(iter: I) -> Self {
        QueryState(iter.into_iter().collect())
    }
}

impl IntoIterator for QueryState {
    type Item = (String, QueryValue);
    type IntoIter = indexmap::map::IntoIter<String, QueryValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Partial change to a [`QueryState`]
///
/// `None` stands for an explicitly unset key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPatch(IndexMap<String, Option<QueryValue>>);

impl QueryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.0.insert(key.into(), Some(value.into()));
        self
    }

    /// Mark `key` for removal.
    pub fn unset(mut self, key: impl Into<String>) -> Self {
        self.0.insert(key.into(), None);
        self
    }

    /// Set `key` when `value` is present, otherwise mark it for removal.
    pub fn set_opt<V: Into<QueryValue>>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.0.insert(key.into(), value.map(Into::into));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Option<QueryValue>> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Option<QueryValue>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<QueryState> for QueryPatch {
    fn from(state: QueryState) -> Self {
        QueryPatch(state.into_iter().map(|(k, v)| (k, Some(v))).collect())
    }
}

impl From<&QueryState> for QueryPatch {
    fn from(state: &QueryState) -> Self {
        QueryPatch::from(state.clone())
    }
}
