//! Fact values and the fact map shared by every engine component.
//!
//! Facts are loosely typed on purpose: the configuration document decides
//! which keys exist and whether they hold text, numbers, lists or nested maps.
//! Lookups by configuration (zones, vault keys, decision trees, template
//! branches) compare values through their canonical key form, so `12`,
//! `12.0` and `"12"` all select the same branch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single fact value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<FactValue>),
    Map(BTreeMap<String, FactValue>),
}

impl FactValue {
    /// Returns true for the empty string, which never overwrites a fact.
    pub fn is_blank(&self) -> bool {
        matches!(self, FactValue::Text(s) if s.is_empty())
    }

    /// Canonical string used when matching a value against configured keys.
    ///
    /// Whole numbers drop their fractional part (`12.0` -> `"12"`).
    pub fn as_key(&self) -> String {
        match self {
            FactValue::Bool(b) => b.to_string(),
            FactValue::Number(n) => format_number(*n),
            FactValue::Text(s) => s.clone(),
            FactValue::List(items) => items
                .iter()
                .map(FactValue::as_key)
                .collect::<Vec<_>>()
                .join(","),
            FactValue::Map(_) => self.to_string(),
        }
    }

    /// Numeric view of the value, parsing text when possible.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FactValue::Number(n) => Some(*n),
            FactValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FactValue::Text(s) => s.trim().parse::<f64>().ok(),
            FactValue::List(_) | FactValue::Map(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FactValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, FactValue>> {
        match self {
            FactValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Items of a list, or the value itself as a one-element slice.
    pub fn items(&self) -> Vec<&FactValue> {
        match self {
            FactValue::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    /// Renders the value as reply text, joining list items with `separator`.
    pub fn render(&self, separator: &str) -> String {
        match self {
            FactValue::List(items) => items
                .iter()
                .map(|item| item.render(separator))
                .collect::<Vec<_>>()
                .join(separator),
            other => other.as_key(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactValue::Map(map) => {
                let parts: Vec<String> = map.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            other => write!(f, "{}", other.render(", ")),
        }
    }
}

impl From<&str> for FactValue {
    fn from(s: &str) -> Self {
        FactValue::Text(s.to_string())
    }
}

impl From<String> for FactValue {
    fn from(s: String) -> Self {
        FactValue::Text(s)
    }
}

impl From<f64> for FactValue {
    fn from(n: f64) -> Self {
        FactValue::Number(n)
    }
}

impl From<i64> for FactValue {
    fn from(n: i64) -> Self {
        FactValue::Number(n as f64)
    }
}

impl From<u32> for FactValue {
    fn from(n: u32) -> Self {
        FactValue::Number(f64::from(n))
    }
}

impl From<bool> for FactValue {
    fn from(b: bool) -> Self {
        FactValue::Bool(b)
    }
}

impl From<Vec<String>> for FactValue {
    fn from(items: Vec<String>) -> Self {
        FactValue::List(items.into_iter().map(FactValue::Text).collect())
    }
}

/// Ordered key -> value map of everything known about a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Facts(BTreeMap<String, FactValue>);

impl Facts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FactValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FactValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<FactValue> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FactValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Copies every entry of `other` over this map.
    pub fn extend(&mut self, other: Facts) {
        self.0.extend(other.0);
    }

    /// Mutable access to a nested map, creating it (or replacing a non-map
    /// value) on first use.
    pub fn sub_map_mut(&mut self, key: &str) -> &mut BTreeMap<String, FactValue> {
        let entry = self
            .0
            .entry(key.to_string())
            .or_insert_with(|| FactValue::Map(BTreeMap::new()));
        if !matches!(entry, FactValue::Map(_)) {
            *entry = FactValue::Map(BTreeMap::new());
        }
        match entry {
            FactValue::Map(map) => map,
            _ => unreachable!("entry was just normalized to a map"),
        }
    }

    /// Resolves a path such as `calc_ext.total` or `calc_ext[total]`.
    pub fn lookup(&self, path: &str) -> Option<&FactValue> {
        let mut segments = split_path(path).into_iter();
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }
}

impl FromIterator<(String, FactValue)> for Facts {
    fn from_iter<I: IntoIterator<Item = (String, FactValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Facts {
    type Item = (String, FactValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, FactValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split(|c| c == '.' || c == '[' || c == ']')
        .filter(|s| !s.is_empty())
        .collect()
}

/// Builds a [`Facts`] map from `key => value` pairs.
#[macro_export]
macro_rules! facts {
    () => { $crate::domain::foundation::Facts::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut facts = $crate::domain::foundation::Facts::new();
        $( facts.insert($key, $value); )+
        facts
    }};
}
