//! Per-body reference tables.
//!
//! AMF0 keeps one object table. AMF3 keeps separate object, string and
//! class-definition tables. Handles are zero-based positions in order of
//! first appearance; all tables are cleared together at body boundaries.

use crate::error::ProtocolError;
use amfwire_core::{ClassDefinition, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Largest handle an AMF0 reference can carry.
pub const MAX_AMF0_REFERENCES: usize = u16::MAX as usize;

/// Largest handle an AMF3 reference can carry (28 bits after the flag bit).
pub const MAX_AMF3_REFERENCES: usize = (1 << 28) - 1;

/// Largest class-definition handle (27 bits after the two flag bits).
pub const MAX_CLASS_DEFINITION_REFERENCES: usize = (1 << 27) - 1;

fn lookup<T: Clone>(table: &[T], name: &'static str, index: usize) -> Result<T, ProtocolError> {
    table
        .get(index)
        .cloned()
        .ok_or(ProtocolError::InvalidReference {
            table: name,
            index,
            len: table.len(),
        })
}

/// Tables filled while decoding.
#[derive(Debug, Default)]
pub struct ReadReferences {
    amf0_objects: Vec<Value>,
    objects: Vec<Value>,
    strings: Vec<Arc<str>>,
    class_definitions: Vec<Arc<ClassDefinition>>,
}

impl ReadReferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.amf0_objects.clear();
        self.objects.clear();
        self.strings.clear();
        self.class_definitions.clear();
    }

    pub fn add_amf0_object(&mut self, value: Value) -> usize {
        self.amf0_objects.push(value);
        self.amf0_objects.len() - 1
    }

    pub fn amf0_object(&self, index: usize) -> Result<Value, ProtocolError> {
        lookup(&self.amf0_objects, "AMF0 object", index)
    }

    pub fn add_object(&mut self, value: Value) -> usize {
        self.objects.push(value);
        self.objects.len() - 1
    }

    pub fn object(&self, index: usize) -> Result<Value, ProtocolError> {
        lookup(&self.objects, "object", index)
    }

    /// Registers a non-empty string. Empty strings are never referenced.
    pub fn add_string(&mut self, value: Arc<str>) {
        if !value.is_empty() {
            self.strings.push(value);
        }
    }

    pub fn string(&self, index: usize) -> Result<Arc<str>, ProtocolError> {
        lookup(&self.strings, "string", index)
    }

    pub fn add_class_definition(&mut self, definition: Arc<ClassDefinition>) -> usize {
        self.class_definitions.push(definition);
        self.class_definitions.len() - 1
    }

    pub fn class_definition(&self, index: usize) -> Result<Arc<ClassDefinition>, ProtocolError> {
        lookup(&self.class_definitions, "class definition", index)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }
}

/// Identity table keyed by node address. Registered values are kept alive
/// until the table is reset so an address cannot be reused mid-body.
#[derive(Debug, Default)]
struct IdentityTable {
    handles: HashMap<usize, usize>,
    pinned: Vec<Value>,
}

impl IdentityTable {
    fn get(&self, value: &Value) -> Option<usize> {
        value.identity().and_then(|id| self.handles.get(&id).copied())
    }

    fn add(&mut self, value: &Value, max: usize, what: &'static str) -> Result<usize, ProtocolError> {
        let index = self.pinned.len();
        if index > max {
            return Err(ProtocolError::CountOverflow {
                what,
                count: index + 1,
                max,
            });
        }
        if let Some(id) = value.identity() {
            self.handles.entry(id).or_insert(index);
        }
        self.pinned.push(value.clone());
        Ok(index)
    }

    fn clear(&mut self) {
        self.handles.clear();
        self.pinned.clear();
    }
}

/// Tables filled while encoding.
#[derive(Debug, Default)]
pub struct WriteReferences {
    amf0_objects: IdentityTable,
    objects: IdentityTable,
    strings: HashMap<Arc<str>, usize>,
    class_definitions: HashMap<Arc<ClassDefinition>, usize>,
}

impl WriteReferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.amf0_objects.clear();
        self.objects.clear();
        self.strings.clear();
        self.class_definitions.clear();
    }

    pub fn amf0_object(&self, value: &Value) -> Option<usize> {
        self.amf0_objects.get(value)
    }

    /// Registers an AMF0 object. Returns false once the 16-bit handle space
    /// is exhausted; later objects are then written inline.
    pub fn add_amf0_object(&mut self, value: &Value) -> bool {
        self.amf0_objects
            .add(value, MAX_AMF0_REFERENCES, "AMF0 object references")
            .is_ok()
    }

    pub fn object(&self, value: &Value) -> Option<usize> {
        self.objects.get(value)
    }

    pub fn add_object(&mut self, value: &Value) -> Result<usize, ProtocolError> {
        self.objects.add(value, MAX_AMF3_REFERENCES, "object references")
    }

    /// Takes an object handle for a value that is never referenced back,
    /// keeping later handles aligned with the reader's table.
    pub fn reserve_object(&mut self) -> Result<usize, ProtocolError> {
        self.objects
            .add(&Value::Null, MAX_AMF3_REFERENCES, "object references")
    }

    pub fn string(&self, value: &str) -> Option<usize> {
        self.strings.get(value).copied()
    }

    pub fn add_string(&mut self, value: Arc<str>) -> Result<(), ProtocolError> {
        if value.is_empty() || self.strings.contains_key(&value) {
            return Ok(());
        }
        let index = self.strings.len();
        if index > MAX_AMF3_REFERENCES {
            return Err(ProtocolError::CountOverflow {
                what: "string references",
                count: index + 1,
                max: MAX_AMF3_REFERENCES,
            });
        }
        self.strings.insert(value, index);
        Ok(())
    }

    pub fn class_definition(&self, definition: &ClassDefinition) -> Option<usize> {
        self.class_definitions.get(definition).copied()
    }

    pub fn add_class_definition(&mut self, definition: Arc<ClassDefinition>) -> Result<(), ProtocolError> {
        let index = self.class_definitions.len();
        if index > MAX_CLASS_DEFINITION_REFERENCES {
            return Err(ProtocolError::CountOverflow {
                what: "class definition references",
                count: index + 1,
                max: MAX_CLASS_DEFINITION_REFERENCES,
            });
        }
        self.class_definitions.entry(definition).or_insert(index);
        Ok(())
    }
}
