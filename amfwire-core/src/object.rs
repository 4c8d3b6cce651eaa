//! Dynamic objects and associative arrays.

use crate::definition::ClassDefinition;
use crate::error::CoreError;
use crate::reflect::{MemberInfo, Reflect};
use crate::value::Value;
use std::any::Any;
use std::sync::Arc;

/// Insertion-ordered string-keyed map. Member order is wire-significant, so
/// re-inserting an existing key keeps its original position.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    entries: Vec<(String, Value)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Inserts or replaces a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Properties::new();
        for (k, v) in iter {
            properties.insert(k, v);
        }
        properties
    }
}

impl IntoIterator for Properties {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A dynamic ActionScript object: an optional class name plus an open set of
/// properties.
///
/// Objects decoded from the wire keep the class definition they arrived
/// with, so encoding them again reproduces the same member layout.
#[derive(Debug, Clone, Default)]
pub struct AsObject {
    type_name: String,
    properties: Properties,
    definition: Option<Arc<ClassDefinition>>,
}

impl AsObject {
    /// Creates an anonymous object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an object tagged with a remote class name.
    pub fn typed(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    pub fn with_definition(definition: Arc<ClassDefinition>) -> Self {
        Self {
            type_name: definition.class_name().to_string(),
            properties: Properties::with_capacity(definition.member_count()),
            definition: Some(definition),
        }
    }

    pub fn from_properties(properties: Properties) -> Self {
        Self {
            properties,
            ..Self::default()
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn set_type_name(&mut self, type_name: impl Into<String>) {
        self.type_name = type_name.into();
        self.definition = None;
    }

    pub fn is_typed(&self) -> bool {
        !self.type_name.is_empty()
    }

    pub fn definition(&self) -> Option<&Arc<ClassDefinition>> {
        self.definition.as_ref()
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.properties.insert(key, value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.properties.remove(key)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl Reflect for AsObject {
    fn class_name(&self) -> &str {
        &self.type_name
    }

    fn members(&self) -> Vec<MemberInfo> {
        self.properties.keys().map(MemberInfo::new).collect()
    }

    fn get_member(&self, name: &str) -> Option<Value> {
        self.properties.get(name).cloned()
    }

    fn set_member(&mut self, name: &str, value: Value) -> Result<(), CoreError> {
        self.properties.insert(name, value);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
