//! Attribute maps exchanged with a bean: the snapshot returned by a get and
//! the parameters accepted by a set.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::descriptor::Attribute;
use crate::value::Value;

/// Values read from one bean in a single critical section, keyed by
/// attribute descriptor, plus one nested snapshot per embedded child.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSnapshot {
    values: Vec<(Arc<Attribute>, Value)>,
    embedded: IndexMap<String, AttributeSnapshot>,
}

impl AttributeSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, attribute: Arc<Attribute>, value: Value) {
        self.values.push((attribute, value));
    }

    pub fn insert_embedded(&mut self, name: &str, snapshot: AttributeSnapshot) {
        self.embedded.insert(name.to_string(), snapshot);
    }

    /// Value of the last attribute named `name`. When a name is declared at
    /// several layers the most specific declaration wins.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .rev()
            .find(|(attribute, _)| attribute.name() == name)
            .map(|(_, value)| value)
    }

    pub fn attribute(&self, name: &str) -> Option<&Arc<Attribute>> {
        self.values
            .iter()
            .rev()
            .find(|(attribute, _)| attribute.name() == name)
            .map(|(attribute, _)| attribute)
    }

    pub fn embedded(&self, name: &str) -> Option<&AttributeSnapshot> {
        self.embedded.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<Attribute>, &Value)> {
        self.values.iter().map(|(attribute, value)| (attribute, value))
    }

    pub fn embedded_iter(&self) -> impl Iterator<Item = (&str, &AttributeSnapshot)> {
        self.embedded
            .iter()
            .map(|(name, snapshot)| (name.as_str(), snapshot))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.embedded.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for AttributeSnapshot {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // 同名の属性は後勝ち
        let mut flattened: IndexMap<&str, &Value> = IndexMap::new();
        for (attribute, value) in &self.values {
            flattened.insert(attribute.name(), value);
        }
        let mut map = serializer.serialize_map(Some(flattened.len() + self.embedded.len()))?;
        for (name, value) in flattened {
            map.serialize_entry(name, value)?;
        }
        for (name, snapshot) in self.embedded_iter() {
            map.serialize_entry(name, snapshot)?;
        }
        map.end()
    }
}

/// Key of a set parameter. `Ident` is the attribute identifier as declared
/// in code, `Name` is its textual form as it arrives from a front-end.
/// When both are present for one attribute the identifier wins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamKey {
    Ident(String),
    Name(String),
}

impl From<&str> for ParamKey {
    fn from(name: &str) -> Self {
        ParamKey::Name(name.to_string())
    }
}

impl From<String> for ParamKey {
    fn from(name: String) -> Self {
        ParamKey::Name(name)
    }
}

/// Values for a compound set. Embedded children receive the sub-map stored
/// under their name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeParams {
    values: HashMap<ParamKey, Value>,
    embedded: HashMap<String, AttributeParams>,
}

impl AttributeParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<ParamKey>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_ident(mut self, ident: &str, value: impl Into<Value>) -> Self {
        self.insert(ParamKey::Ident(ident.to_string()), value);
        self
    }

    pub fn with_embedded(mut self, name: &str, params: AttributeParams) -> Self {
        self.embedded.insert(name.to_string(), params);
        self
    }

    pub fn insert(&mut self, key: impl Into<ParamKey>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Value supplied for attribute `name`, identifier key first.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.values
            .get(&ParamKey::Ident(name.to_string()))
            .or_else(|| self.values.get(&ParamKey::Name(name.to_string())))
    }

    /// Parameters for the embedded child `name`. Either set explicitly or
    /// given as a nested map value.
    pub fn embedded(&self, name: &str) -> Option<AttributeParams> {
        if let Some(params) = self.embedded.get(name) {
            return Some(params.clone());
        }
        self.lookup(name)
            .and_then(Value::as_map)
            .map(|map| AttributeParams::from(map.clone()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.embedded.is_empty()
    }
}

impl From<IndexMap<String, Value>> for AttributeParams {
    fn from(map: IndexMap<String, Value>) -> Self {
        let mut params = AttributeParams::new();
        for (key, value) in map {
            params.insert(ParamKey::Name(key), value);
        }
        params
    }
}

/// Builds parameters from a JSON object. Anything other than an object gives
/// empty parameters.
impl From<serde_json::Value> for AttributeParams {
    fn from(json: serde_json::Value) -> Self {
        match Value::from(json) {
            Value::Map(map) => AttributeParams::from(map),
            _ => AttributeParams::new(),
        }
    }
}

impl<K: Into<ParamKey>, V: Into<Value>> FromIterator<(K, V)> for AttributeParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = AttributeParams::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}
