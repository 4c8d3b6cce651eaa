//! AMF0/AMF3 value writer.
//!
//! [`AmfWriter`] serializes a value graph into a growable buffer. Strategies
//! are resolved through the context's
//! [`WriterTable`](crate::write_table::WriterTable)s. Composite values are
//! registered in the reference tables before their children are written, so
//! a node reached twice is written once and referenced afterwards.

use crate::config::{CodecConfig, TimezoneCompensation};
use crate::context::CodecContext;
use crate::error::ProtocolError;
use crate::markers::{amf0, amf3};
use crate::message::ObjectEncoding;
use crate::references::{WriteReferences, MAX_AMF3_REFERENCES};
use crate::varint;
use amfwire_core::{ClassDefinition, CoreError, DataOutput, Date, ObjectProxy, Reflect, Value};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Largest member count an inline traits handle can carry.
const MAX_TRAIT_MEMBERS: usize = (1 << 25) - 1;

fn mismatch(writer: &'static str, value: &Value) -> ProtocolError {
    ProtocolError::WriterMismatch {
        writer,
        found: value.kind().name(),
    }
}

pub struct AmfWriter {
    out: BytesMut,
    context: Arc<CodecContext>,
    settings: Arc<CodecConfig>,
    refs: WriteReferences,
}

impl fmt::Debug for AmfWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmfWriter")
            .field("len", &self.out.len())
            .finish()
    }
}

impl Default for AmfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl AmfWriter {
    /// Creates a writer using the global context.
    pub fn new() -> Self {
        Self::with_context(CodecContext::global())
    }

    pub fn with_context(context: Arc<CodecContext>) -> Self {
        let settings = context.settings();
        Self {
            out: BytesMut::with_capacity(256),
            context,
            settings,
            refs: WriteReferences::new(),
        }
    }

    pub fn context(&self) -> &Arc<CodecContext> {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.out
    }

    pub fn into_bytes(self) -> Bytes {
        self.out.freeze()
    }

    /// Discards everything written after `len`.
    pub fn truncate(&mut self, len: usize) {
        self.out.truncate(len);
    }

    /// Clears all reference tables.
    pub fn reset(&mut self) {
        self.refs.reset();
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.out.put_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.out.put_u8(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.out.put_u16(value);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.out.put_i16(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.out.put_u32(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.out.put_i32(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.out.put_f32(value);
    }

    pub fn write_f64(&mut self, value: f64) {
        self.out.put_f64(value);
    }

    /// Writes a 29-bit integer. Bits above the 29th are dropped.
    pub fn write_u29(&mut self, value: i32) {
        varint::encode(&mut self.out, value);
    }

    /// Writes a string prefixed with a 16-bit length.
    pub fn write_utf(&mut self, value: &str) -> Result<(), ProtocolError> {
        let len = value.len();
        if len > u16::MAX as usize {
            return Err(ProtocolError::StringTooLong {
                len,
                max: u16::MAX as usize,
            });
        }
        self.write_u16(len as u16);
        self.write_raw(value.as_bytes());
        Ok(())
    }

    /// Writes a string prefixed with a 32-bit length.
    pub fn write_long_utf(&mut self, value: &str) -> Result<(), ProtocolError> {
        let len = value.len();
        if len > u32::MAX as usize {
            return Err(ProtocolError::StringTooLong {
                len,
                max: u32::MAX as usize,
            });
        }
        self.write_u32(len as u32);
        self.write_raw(value.as_bytes());
        Ok(())
    }

    /// Writes an inline handle (`len << 1 | 1`).
    fn write_inline_handle(&mut self, len: usize) -> Result<(), ProtocolError> {
        if len > MAX_AMF3_REFERENCES {
            return Err(ProtocolError::CountOverflow {
                what: "inline length",
                count: len,
                max: MAX_AMF3_REFERENCES,
            });
        }
        self.write_u29(((len << 1) | 1) as i32);
        Ok(())
    }

    fn write_reference(&mut self, index: usize) {
        self.write_u29((index << 1) as i32);
    }

    /// Writes an AMF3 string body (no marker), using the string table.
    pub fn write_amf3_string_data(&mut self, value: &str) -> Result<(), ProtocolError> {
        if value.is_empty() {
            self.write_u29(1);
            return Ok(());
        }
        if let Some(index) = self.refs.string(value) {
            self.write_reference(index);
            return Ok(());
        }
        if value.len() > MAX_AMF3_REFERENCES {
            return Err(ProtocolError::StringTooLong {
                len: value.len(),
                max: MAX_AMF3_REFERENCES,
            });
        }
        self.write_inline_handle(value.len())?;
        self.write_raw(value.as_bytes());
        self.refs.add_string(Arc::from(value))
    }

    fn is_null(&self, value: &Value) -> bool {
        value.is_null() || self.settings.nullable.matches(value)
    }

    /// Writes a top-level value of a message in `encoding`.
    ///
    /// Values always start in AMF0 marker space. In AMF3 messages primitives
    /// keep their AMF0 form and everything else switches to AMF3.
    pub fn write_value(&mut self, encoding: ObjectEncoding, value: &Value) -> Result<(), ProtocolError> {
        if self.is_null(value) {
            self.write_u8(amf0::NULL);
            return Ok(());
        }
        if let Some(index) = self.refs.amf0_object(value) {
            self.write_u8(amf0::REFERENCE);
            self.write_u16(index as u16);
            return Ok(());
        }
        let context = self.context.clone();
        let strategy = context.writers(ObjectEncoding::Amf0).resolve(value)?;
        if encoding == ObjectEncoding::Amf0 || strategy.is_primitive() {
            return strategy.write(self, value);
        }
        self.write_u8(amf0::AVMPLUS);
        self.write_amf3_value(value)
    }

    pub fn write_amf0_value(&mut self, value: &Value) -> Result<(), ProtocolError> {
        self.write_value(ObjectEncoding::Amf0, value)
    }

    pub fn write_amf3_value(&mut self, value: &Value) -> Result<(), ProtocolError> {
        if self.is_null(value) {
            self.write_u8(amf3::NULL);
            return Ok(());
        }
        let context = self.context.clone();
        let strategy = context.writers(ObjectEncoding::Amf3).resolve(value)?;
        strategy.write(self, value)
    }

    fn date_millis(&self, date: &Date) -> f64 {
        match self.settings.dates.timezone_compensation {
            TimezoneCompensation::IgnoreUtcKind => date.naive().and_utc().timestamp_millis() as f64,
            _ => date.timestamp_millis() as f64,
        }
    }

    /// Resolves an instance's class definition through its proxy.
    fn definition_of(
        &self,
        instance: &dyn Reflect,
    ) -> Result<(Arc<dyn ObjectProxy>, Arc<ClassDefinition>), ProtocolError> {
        let registry = self.context.registry();
        let proxy = registry.proxies().proxy_for(instance);
        let definition = registry.class_definition_with(instance, proxy.as_ref())?;
        Ok((proxy, definition))
    }

    /// Sealed member values in definition order. Members the instance does
    /// not carry are written as null.
    fn sealed_values(
        proxy: &dyn ObjectProxy,
        instance: &dyn Reflect,
        definition: &ClassDefinition,
    ) -> Result<Vec<Value>, ProtocolError> {
        let mut values = Vec::with_capacity(definition.member_count());
        for member in definition.members() {
            match proxy.get_value(instance, member) {
                Ok(value) => values.push(value),
                Err(err) if err.is_member_not_found() => values.push(Value::Null),
                Err(err) => return Err(err.into()),
            }
        }
        Ok(values)
    }

    // AMF0 strategies

    pub(crate) fn write_amf0_null(&mut self, _: &Value) -> Result<(), ProtocolError> {
        self.write_u8(amf0::NULL);
        Ok(())
    }

    pub(crate) fn write_amf0_unsupported(&mut self, _: &Value) -> Result<(), ProtocolError> {
        self.write_u8(amf0::UNSUPPORTED);
        Ok(())
    }

    pub(crate) fn write_amf0_boolean(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let Value::Boolean(b) = value else {
            return Err(mismatch("AMF0 boolean", value));
        };
        self.write_u8(amf0::BOOLEAN);
        self.write_u8(*b as u8);
        Ok(())
    }

    pub(crate) fn write_amf0_number(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let number = match value {
            Value::Integer(i) => *i as f64,
            Value::Number(n) => *n,
            other => return Err(mismatch("AMF0 number", other)),
        };
        self.write_u8(amf0::NUMBER);
        self.write_f64(number);
        Ok(())
    }

    pub(crate) fn write_amf0_string(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let Value::String(s) = value else {
            return Err(mismatch("AMF0 string", value));
        };
        if s.len() <= u16::MAX as usize {
            self.write_u8(amf0::STRING);
            self.write_utf(s)
        } else {
            self.write_u8(amf0::LONG_STRING);
            self.write_long_utf(s)
        }
    }

    pub(crate) fn write_amf0_date(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let Value::Date(date) = value else {
            return Err(mismatch("AMF0 date", value));
        };
        let offset = match self.settings.dates.timezone_compensation {
            TimezoneCompensation::None => 0,
            _ => date.local_offset_minutes() as i16,
        };
        self.write_u8(amf0::DATE);
        self.write_f64(self.date_millis(date));
        self.write_i16(offset);
        Ok(())
    }

    pub(crate) fn write_amf0_xml(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let Value::Xml(xml) = value else {
            return Err(mismatch("AMF0 XML", value));
        };
        self.write_u8(amf0::XML_DOCUMENT);
        self.write_long_utf(xml)
    }

    pub(crate) fn write_amf0_strict_array(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let Value::Array(node) = value else {
            return Err(mismatch("AMF0 strict array", value));
        };
        self.refs.add_amf0_object(value);
        let items = node.read_recursive().clone();
        self.write_u8(amf0::STRICT_ARRAY);
        self.write_u32(items.len() as u32);
        for item in &items {
            self.write_amf0_value(item)?;
        }
        Ok(())
    }

    pub(crate) fn write_amf0_ecma_array(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let Value::Map(node) = value else {
            return Err(mismatch("AMF0 ECMA array", value));
        };
        self.refs.add_amf0_object(value);
        let properties = node.read_recursive().clone();
        self.write_u8(amf0::ECMA_ARRAY);
        self.write_u32(properties.len() as u32);
        for (key, item) in properties.iter() {
            self.write_utf(key)?;
            self.write_amf0_value(item)?;
        }
        self.write_raw(&amf0::OBJECT_TERMINATOR);
        Ok(())
    }

    /// Anonymous and typed objects, dynamic or reflected.
    pub(crate) fn write_amf0_object(&mut self, value: &Value) -> Result<(), ProtocolError> {
        self.refs.add_amf0_object(value);
        match value {
            Value::Object(node) => {
                let instance = node.read_recursive();
                self.write_amf0_instance(&*instance)
            }
            Value::Typed(node) => {
                let instance = node.read_recursive();
                self.write_amf0_instance(&*instance)
            }
            other => Err(mismatch("AMF0 object", other)),
        }
    }

    fn write_amf0_instance(&mut self, instance: &dyn Reflect) -> Result<(), ProtocolError> {
        let (proxy, definition) = self.definition_of(instance)?;
        if definition.is_externalizable() {
            return Err(ProtocolError::ExternalizableInAmf0 {
                class: definition.class_name().to_string(),
            });
        }
        let sealed = Self::sealed_values(proxy.as_ref(), instance, &definition)?;
        let dynamic = if definition.is_dynamic() {
            proxy.dynamic_members(instance, &definition)
        } else {
            Vec::new()
        };

        if definition.is_typed() {
            self.write_u8(amf0::TYPED_OBJECT);
            self.write_utf(definition.class_name())?;
        } else {
            self.write_u8(amf0::OBJECT);
        }
        for (member, item) in definition.members().iter().zip(&sealed) {
            self.write_utf(member.name())?;
            self.write_amf0_value(item)?;
        }
        for (key, item) in &dynamic {
            self.write_utf(key)?;
            self.write_amf0_value(item)?;
        }
        self.write_raw(&amf0::OBJECT_TERMINATOR);
        Ok(())
    }

    /// Values AMF0 cannot express: switch to AMF3.
    pub(crate) fn write_avmplus(&mut self, value: &Value) -> Result<(), ProtocolError> {
        self.write_u8(amf0::AVMPLUS);
        self.write_amf3_value(value)
    }

    // AMF3 strategies

    pub(crate) fn write_amf3_null(&mut self, _: &Value) -> Result<(), ProtocolError> {
        self.write_u8(amf3::NULL);
        Ok(())
    }

    pub(crate) fn write_amf3_undefined(&mut self, _: &Value) -> Result<(), ProtocolError> {
        self.write_u8(amf3::UNDEFINED);
        Ok(())
    }

    pub(crate) fn write_amf3_boolean(&mut self, value: &Value) -> Result<(), ProtocolError> {
        match value {
            Value::Boolean(true) => self.write_u8(amf3::TRUE),
            Value::Boolean(false) => self.write_u8(amf3::FALSE),
            other => return Err(mismatch("AMF3 boolean", other)),
        }
        Ok(())
    }

    /// Integers outside the 29-bit range are written as doubles.
    pub(crate) fn write_amf3_integer(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let Value::Integer(i) = value else {
            return Err(mismatch("AMF3 integer", value));
        };
        if varint::fits(*i as i64) {
            self.write_u8(amf3::INTEGER);
            self.write_u29(*i);
        } else {
            self.write_u8(amf3::DOUBLE);
            self.write_f64(*i as f64);
        }
        Ok(())
    }

    pub(crate) fn write_amf3_double(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let number = match value {
            Value::Number(n) => *n,
            Value::Integer(i) => *i as f64,
            other => return Err(mismatch("AMF3 double", other)),
        };
        self.write_u8(amf3::DOUBLE);
        self.write_f64(number);
        Ok(())
    }

    pub(crate) fn write_amf3_string(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let Value::String(s) = value else {
            return Err(mismatch("AMF3 string", value));
        };
        self.write_u8(amf3::STRING);
        self.write_amf3_string_data(s)
    }

    /// Dates are always written inline; their slot in the object table is
    /// still taken so later handles line up with the reader.
    pub(crate) fn write_amf3_date(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let Value::Date(date) = value else {
            return Err(mismatch("AMF3 date", value));
        };
        self.write_u8(amf3::DATE);
        self.refs.reserve_object()?;
        self.write_u29(1);
        self.write_f64(self.date_millis(date));
        Ok(())
    }

    /// Writes `marker`, then a back-reference if `value` was already written.
    /// Returns true when the caller must write the value inline.
    fn begin_amf3_complex(&mut self, marker: u8, value: &Value) -> Result<bool, ProtocolError> {
        self.write_u8(marker);
        if let Some(index) = self.refs.object(value) {
            self.write_reference(index);
            return Ok(false);
        }
        self.refs.add_object(value)?;
        Ok(true)
    }

    pub(crate) fn write_amf3_xml(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let Value::Xml(xml) = value else {
            return Err(mismatch("AMF3 XML", value));
        };
        if self.begin_amf3_complex(amf3::XML, value)? {
            self.write_inline_handle(xml.len())?;
            self.write_raw(xml.as_bytes());
        }
        Ok(())
    }

    pub(crate) fn write_amf3_byte_array(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let Value::ByteArray(bytes) = value else {
            return Err(mismatch("AMF3 byte array", value));
        };
        if self.begin_amf3_complex(amf3::BYTE_ARRAY, value)? {
            self.write_inline_handle(bytes.len())?;
            self.write_raw(bytes.as_slice());
        }
        Ok(())
    }

    pub(crate) fn write_amf3_array(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let Value::Array(node) = value else {
            return Err(mismatch("AMF3 array", value));
        };
        if !self.begin_amf3_complex(amf3::ARRAY, value)? {
            return Ok(());
        }
        let items = node.read_recursive().clone();
        self.write_inline_handle(items.len())?;
        self.write_amf3_string_data("")?;
        for item in &items {
            self.write_amf3_value(item)?;
        }
        Ok(())
    }

    /// Maps are written as arrays with an empty dense part.
    pub(crate) fn write_amf3_map(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let Value::Map(node) = value else {
            return Err(mismatch("AMF3 map", value));
        };
        if !self.begin_amf3_complex(amf3::ARRAY, value)? {
            return Ok(());
        }
        let properties = node.read_recursive().clone();
        self.write_inline_handle(0)?;
        for (key, item) in properties.iter() {
            if key.is_empty() {
                warn!("skipping map entry with an empty key");
                continue;
            }
            self.write_amf3_string_data(key)?;
            self.write_amf3_value(item)?;
        }
        self.write_amf3_string_data("")
    }

    pub(crate) fn write_amf3_object(&mut self, value: &Value) -> Result<(), ProtocolError> {
        if !matches!(value, Value::Object(_) | Value::Typed(_)) {
            return Err(mismatch("AMF3 object", value));
        }
        if !self.begin_amf3_complex(amf3::OBJECT, value)? {
            return Ok(());
        }
        match value {
            Value::Object(node) => {
                let instance = node.read_recursive();
                self.write_amf3_instance(&*instance)
            }
            Value::Typed(node) => {
                let instance = node.read_recursive();
                self.write_amf3_instance(&*instance)
            }
            other => Err(mismatch("AMF3 object", other)),
        }
    }

    fn write_amf3_instance(&mut self, instance: &dyn Reflect) -> Result<(), ProtocolError> {
        let (proxy, definition) = self.definition_of(instance)?;
        self.write_traits(&definition)?;

        if definition.is_externalizable() {
            let Some(external) = instance.as_externalizable() else {
                return Err(CoreError::NotExternalizable {
                    class: definition.class_name().to_string(),
                }
                .into());
            };
            external.write_external(&mut AmfDataOutput { writer: self })?;
            return Ok(());
        }

        let sealed = Self::sealed_values(proxy.as_ref(), instance, &definition)?;
        for item in &sealed {
            self.write_amf3_value(item)?;
        }
        if definition.is_dynamic() {
            for (key, item) in proxy.dynamic_members(instance, &definition) {
                if key.is_empty() {
                    warn!(
                        "skipping dynamic member with an empty name on {:?}",
                        definition.class_name()
                    );
                    continue;
                }
                self.write_amf3_string_data(&key)?;
                self.write_amf3_value(&item)?;
            }
            self.write_amf3_string_data("")?;
        }
        Ok(())
    }

    /// Writes a class definition inline, or as a reference when an equal
    /// definition was already written in this body.
    fn write_traits(&mut self, definition: &Arc<ClassDefinition>) -> Result<(), ProtocolError> {
        if let Some(index) = self.refs.class_definition(definition) {
            self.write_u29(((index << 2) | 1) as i32);
            return Ok(());
        }
        let count = definition.member_count();
        if count > MAX_TRAIT_MEMBERS {
            return Err(ProtocolError::CountOverflow {
                what: "class members",
                count,
                max: MAX_TRAIT_MEMBERS,
            });
        }
        self.refs.add_class_definition(definition.clone())?;

        let handle = (count << 4)
            | ((definition.is_dynamic() as usize) << 3)
            | ((definition.is_externalizable() as usize) << 2)
            | 3;
        self.write_u29(handle as i32);
        self.write_amf3_string_data(definition.class_name())?;
        for member in definition.members() {
            self.write_amf3_string_data(member.name())?;
        }
        debug!(
            "wrote class definition {:?} ({} members)",
            definition.class_name(),
            count
        );
        Ok(())
    }

    fn write_vector<T: Copy>(
        &mut self,
        marker: u8,
        value: &Value,
        vector: &amfwire_core::VectorRef<T>,
        write: fn(&mut Self, T),
    ) -> Result<(), ProtocolError> {
        if !self.begin_amf3_complex(marker, value)? {
            return Ok(());
        }
        let vector = vector.read_recursive();
        self.write_inline_handle(vector.items.len())?;
        self.write_u29(vector.fixed as i32);
        for item in &vector.items {
            write(self, *item);
        }
        Ok(())
    }

    pub(crate) fn write_amf3_int_vector(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let Value::IntVector(vector) = value else {
            return Err(mismatch("AMF3 int vector", value));
        };
        self.write_vector(amf3::VECTOR_INT, value, vector, Self::write_i32)
    }

    pub(crate) fn write_amf3_uint_vector(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let Value::UIntVector(vector) = value else {
            return Err(mismatch("AMF3 uint vector", value));
        };
        self.write_vector(amf3::VECTOR_UINT, value, vector, Self::write_u32)
    }

    pub(crate) fn write_amf3_double_vector(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let Value::DoubleVector(vector) = value else {
            return Err(mismatch("AMF3 double vector", value));
        };
        self.write_vector(amf3::VECTOR_DOUBLE, value, vector, Self::write_f64)
    }

    pub(crate) fn write_amf3_object_vector(&mut self, value: &Value) -> Result<(), ProtocolError> {
        let Value::ObjectVector(node) = value else {
            return Err(mismatch("AMF3 object vector", value));
        };
        if !self.begin_amf3_complex(amf3::VECTOR_OBJECT, value)? {
            return Ok(());
        }
        let vector = node.read_recursive().clone();
        self.write_inline_handle(vector.items.len())?;
        self.write_u29(vector.fixed as i32);
        self.write_amf3_string_data(&vector.type_name)?;
        for item in &vector.items {
            self.write_amf3_value(item)?;
        }
        Ok(())
    }
}

/// [`DataOutput`] over the writer, handed to externalizable types.
struct AmfDataOutput<'a> {
    writer: &'a mut AmfWriter,
}

impl DataOutput for AmfDataOutput<'_> {
    fn write_boolean(&mut self, value: bool) -> Result<(), CoreError> {
        self.writer.write_u8(value as u8);
        Ok(())
    }

    fn write_byte(&mut self, value: u8) -> Result<(), CoreError> {
        self.writer.write_u8(value);
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CoreError> {
        self.writer.write_raw(bytes);
        Ok(())
    }

    fn write_short(&mut self, value: i16) -> Result<(), CoreError> {
        self.writer.write_i16(value);
        Ok(())
    }

    fn write_unsigned_short(&mut self, value: u16) -> Result<(), CoreError> {
        self.writer.write_u16(value);
        Ok(())
    }

    fn write_int(&mut self, value: i32) -> Result<(), CoreError> {
        self.writer.write_i32(value);
        Ok(())
    }

    fn write_unsigned_int(&mut self, value: u32) -> Result<(), CoreError> {
        self.writer.write_u32(value);
        Ok(())
    }

    fn write_float(&mut self, value: f32) -> Result<(), CoreError> {
        self.writer.write_f32(value);
        Ok(())
    }

    fn write_double(&mut self, value: f64) -> Result<(), CoreError> {
        self.writer.write_f64(value);
        Ok(())
    }

    fn write_utf(&mut self, value: &str) -> Result<(), CoreError> {
        Ok(self.writer.write_utf(value)?)
    }

    fn write_utf_bytes(&mut self, value: &str) -> Result<(), CoreError> {
        self.writer.write_raw(value.as_bytes());
        Ok(())
    }

    fn write_object(&mut self, value: &Value) -> Result<(), CoreError> {
        Ok(self.writer.write_amf3_value(value)?)
    }
}
