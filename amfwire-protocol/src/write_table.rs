//! Writer strategy tables.
//!
//! A value's strategy is found by its kind; typed objects are looked up by
//! concrete Rust type, then class name, then the names of their ancestors.
//! Types with no registration get the generic object strategy, cached per
//! type on first use.

use crate::error::ProtocolError;
use crate::message::ObjectEncoding;
use crate::writer::AmfWriter;
use amfwire_core::{CowMap, Reflect, Value, ValueKind};
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Encodes one value, marker included.
pub trait ValueWriter: Send + Sync {
    /// Primitive strategies keep their AMF0 form inside AMF3 messages.
    fn is_primitive(&self) -> bool;

    fn write(&self, writer: &mut AmfWriter, value: &Value) -> Result<(), ProtocolError>;
}

pub type WriteFn = fn(&mut AmfWriter, &Value) -> Result<(), ProtocolError>;

/// Strategy backed by a plain function.
#[derive(Clone, Copy)]
pub struct FnWriter {
    primitive: bool,
    write: WriteFn,
}

impl FnWriter {
    pub fn primitive(write: WriteFn) -> Self {
        Self {
            primitive: true,
            write,
        }
    }

    pub fn complex(write: WriteFn) -> Self {
        Self {
            primitive: false,
            write,
        }
    }
}

impl ValueWriter for FnWriter {
    fn is_primitive(&self) -> bool {
        self.primitive
    }

    fn write(&self, writer: &mut AmfWriter, value: &Value) -> Result<(), ProtocolError> {
        (self.write)(writer, value)
    }
}

/// Registration key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Kind(ValueKind),
    /// Concrete type of a [`Value::Typed`] node.
    Type(TypeId),
    /// Class name or ancestor name of a [`Value::Typed`] node.
    Named(String),
}

/// Strategy table for one encoding.
pub struct WriterTable {
    encoding: ObjectEncoding,
    registered: CowMap<TypeKey, Arc<dyn ValueWriter>>,
    fallbacks: CowMap<TypeId, Arc<dyn ValueWriter>>,
}

impl fmt::Debug for WriterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterTable")
            .field("encoding", &self.encoding)
            .field("registered", &self.registered.len())
            .field("fallbacks", &self.fallbacks.len())
            .finish()
    }
}

impl WriterTable {
    pub fn empty(encoding: ObjectEncoding) -> Self {
        Self {
            encoding,
            registered: CowMap::new(),
            fallbacks: CowMap::new(),
        }
    }

    /// AMF0 strategies. Values AMF0 cannot express switch to AMF3.
    pub fn amf0() -> Self {
        let table = Self::empty(ObjectEncoding::Amf0);
        let entries: [(ValueKind, FnWriter); 17] = [
            (ValueKind::Null, FnWriter::primitive(AmfWriter::write_amf0_null)),
            (ValueKind::Boolean, FnWriter::primitive(AmfWriter::write_amf0_boolean)),
            (ValueKind::Integer, FnWriter::primitive(AmfWriter::write_amf0_number)),
            (ValueKind::Number, FnWriter::primitive(AmfWriter::write_amf0_number)),
            (ValueKind::String, FnWriter::primitive(AmfWriter::write_amf0_string)),
            (ValueKind::Date, FnWriter::primitive(AmfWriter::write_amf0_date)),
            (ValueKind::Unsupported, FnWriter::primitive(AmfWriter::write_amf0_unsupported)),
            (ValueKind::Xml, FnWriter::complex(AmfWriter::write_amf0_xml)),
            (ValueKind::Array, FnWriter::complex(AmfWriter::write_amf0_strict_array)),
            (ValueKind::Map, FnWriter::complex(AmfWriter::write_amf0_ecma_array)),
            (ValueKind::Object, FnWriter::complex(AmfWriter::write_amf0_object)),
            (ValueKind::Typed, FnWriter::complex(AmfWriter::write_amf0_object)),
            (ValueKind::ByteArray, FnWriter::complex(AmfWriter::write_avmplus)),
            (ValueKind::IntVector, FnWriter::complex(AmfWriter::write_avmplus)),
            (ValueKind::UIntVector, FnWriter::complex(AmfWriter::write_avmplus)),
            (ValueKind::DoubleVector, FnWriter::complex(AmfWriter::write_avmplus)),
            (ValueKind::ObjectVector, FnWriter::complex(AmfWriter::write_avmplus)),
        ];
        for (kind, writer) in entries {
            table.register_kind(kind, writer);
        }
        table
    }

    /// AMF3 strategies.
    pub fn amf3() -> Self {
        let table = Self::empty(ObjectEncoding::Amf3);
        let entries: [(ValueKind, FnWriter); 17] = [
            (ValueKind::Null, FnWriter::primitive(AmfWriter::write_amf3_null)),
            (ValueKind::Boolean, FnWriter::primitive(AmfWriter::write_amf3_boolean)),
            (ValueKind::Integer, FnWriter::primitive(AmfWriter::write_amf3_integer)),
            (ValueKind::Number, FnWriter::primitive(AmfWriter::write_amf3_double)),
            (ValueKind::String, FnWriter::primitive(AmfWriter::write_amf3_string)),
            (ValueKind::Date, FnWriter::primitive(AmfWriter::write_amf3_date)),
            (ValueKind::Unsupported, FnWriter::primitive(AmfWriter::write_amf3_undefined)),
            (ValueKind::Xml, FnWriter::complex(AmfWriter::write_amf3_xml)),
            (ValueKind::Array, FnWriter::complex(AmfWriter::write_amf3_array)),
            (ValueKind::Map, FnWriter::complex(AmfWriter::write_amf3_map)),
            (ValueKind::Object, FnWriter::complex(AmfWriter::write_amf3_object)),
            (ValueKind::Typed, FnWriter::complex(AmfWriter::write_amf3_object)),
            (ValueKind::ByteArray, FnWriter::complex(AmfWriter::write_amf3_byte_array)),
            (ValueKind::IntVector, FnWriter::complex(AmfWriter::write_amf3_int_vector)),
            (ValueKind::UIntVector, FnWriter::complex(AmfWriter::write_amf3_uint_vector)),
            (ValueKind::DoubleVector, FnWriter::complex(AmfWriter::write_amf3_double_vector)),
            (ValueKind::ObjectVector, FnWriter::complex(AmfWriter::write_amf3_object_vector)),
        ];
        for (kind, writer) in entries {
            table.register_kind(kind, writer);
        }
        table
    }

    pub fn encoding(&self) -> ObjectEncoding {
        self.encoding
    }

    pub fn register_kind(&self, kind: ValueKind, writer: impl ValueWriter + 'static) {
        self.registered.insert(TypeKey::Kind(kind), Arc::new(writer));
    }

    /// Registers a strategy for the Rust type `T` carried in typed nodes.
    pub fn register_type<T: Reflect>(&self, writer: impl ValueWriter + 'static) {
        self.registered
            .insert(TypeKey::Type(TypeId::of::<T>()), Arc::new(writer));
        self.fallbacks.clear();
    }

    /// Registers a strategy for typed nodes whose class name or one of
    /// whose ancestors is `class_name`.
    pub fn register_named(&self, class_name: impl Into<String>, writer: impl ValueWriter + 'static) {
        self.registered
            .insert(TypeKey::Named(class_name.into()), Arc::new(writer));
        self.fallbacks.clear();
    }

    /// Finds the strategy for `value`.
    pub fn resolve(&self, value: &Value) -> Result<Arc<dyn ValueWriter>, ProtocolError> {
        let Value::Typed(node) = value else {
            return self.by_kind(value.kind(), || value.kind().name().to_string());
        };

        let instance = node.read_recursive();
        let type_id = instance.as_any().type_id();
        if let Some(writer) = self.fallbacks.get(&type_id) {
            return Ok(writer);
        }
        if let Some(writer) = self.registered.get(&TypeKey::Type(type_id)) {
            return Ok(writer);
        }
        let names = std::iter::once(instance.class_name()).chain(instance.ancestors().iter().copied());
        for name in names {
            if let Some(writer) = self.registered.get(&TypeKey::Named(name.to_string())) {
                return Ok(writer);
            }
        }

        let class_name = instance.class_name().to_string();
        self.fallbacks.get_or_try_insert_with(type_id, || {
            let writer = self.by_kind(ValueKind::Typed, || class_name.clone())?;
            debug!(
                "registered default {} object writer for {}",
                self.encoding, class_name
            );
            Ok(writer)
        })
    }

    fn by_kind(
        &self,
        kind: ValueKind,
        type_name: impl FnOnce() -> String,
    ) -> Result<Arc<dyn ValueWriter>, ProtocolError> {
        self.registered
            .get(&TypeKey::Kind(kind))
            .ok_or_else(|| ProtocolError::NoWriter {
                encoding: self.encoding,
                type_name: type_name(),
            })
    }

    /// Number of lazily registered strategies.
    pub fn fallback_count(&self) -> usize {
        self.fallbacks.len()
    }

    /// Drops lazily registered strategies; explicit registrations survive.
    pub fn clear_fallbacks(&self) {
        self.fallbacks.clear();
    }
}
