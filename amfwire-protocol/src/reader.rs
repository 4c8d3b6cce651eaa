//! AMF0/AMF3 value reader.
//!
//! [`AmfReader`] walks a byte buffer and rebuilds the object graph. Every
//! value starts with a type marker that is dispatched through the
//! context's [`ReaderTable`](crate::read_table::ReaderTable). Composite
//! values are registered in the reference tables before their children are
//! read, so back-references (including cycles) resolve to the same node.

use crate::config::{CodecConfig, TimezoneCompensation};
use crate::context::CodecContext;
use crate::error::ProtocolError;
use crate::markers::amf0;
use crate::message::ObjectEncoding;
use crate::references::ReadReferences;
use crate::varint;
use amfwire_core::{
    ArrayRef, AsObject, ClassDefinition, ClassMember, CoreError, DataInput, Date, MapRef,
    ObjectVector, Properties, Value, Vector,
};
use bytes::{Buf, Bytes};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct AmfReader {
    data: Bytes,
    buf: Bytes,
    context: Arc<CodecContext>,
    settings: Arc<CodecConfig>,
    refs: ReadReferences,
    fault_tolerant: bool,
    last_error: Option<ProtocolError>,
    depth: usize,
}

impl fmt::Debug for AmfReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmfReader")
            .field("position", &self.position())
            .field("remaining", &self.remaining())
            .field("fault_tolerant", &self.fault_tolerant)
            .finish()
    }
}

impl AmfReader {
    /// Creates a reader over `data` using the global context.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self::with_context(data, CodecContext::global())
    }

    pub fn with_context(data: impl Into<Bytes>, context: Arc<CodecContext>) -> Self {
        let data = data.into();
        let settings = context.settings();
        Self {
            buf: data.clone(),
            data,
            context,
            settings,
            refs: ReadReferences::new(),
            fault_tolerant: false,
            last_error: None,
            depth: 0,
        }
    }

    pub fn context(&self) -> &Arc<CodecContext> {
        &self.context
    }

    pub fn position(&self) -> usize {
        self.data.len() - self.buf.len()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Moves to an absolute offset.
    pub fn seek(&mut self, position: usize) -> Result<(), ProtocolError> {
        if position > self.data.len() {
            return Err(ProtocolError::UnexpectedEof {
                needed: position,
                remaining: self.data.len(),
            });
        }
        self.buf = self.data.slice(position..);
        Ok(())
    }

    /// Clears all reference tables.
    pub fn reset(&mut self) {
        self.refs.reset();
    }

    /// In fault-tolerant mode member assignment failures are recorded
    /// instead of aborting the read.
    pub fn set_fault_tolerant(&mut self, enabled: bool) {
        self.fault_tolerant = enabled;
    }

    pub fn fault_tolerant(&self) -> bool {
        self.fault_tolerant
    }

    pub fn last_error(&self) -> Option<&ProtocolError> {
        self.last_error.as_ref()
    }

    pub fn take_last_error(&mut self) -> Option<ProtocolError> {
        self.last_error.take()
    }

    fn ensure(&self, needed: usize) -> Result<(), ProtocolError> {
        if self.buf.len() < needed {
            return Err(ProtocolError::UnexpectedEof {
                needed,
                remaining: self.buf.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        self.ensure(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn read_i16(&mut self) -> Result<i16, ProtocolError> {
        self.ensure(2)?;
        Ok(self.buf.get_i16())
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_i32())
    }

    pub fn read_f32(&mut self) -> Result<f32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_f32())
    }

    pub fn read_f64(&mut self) -> Result<f64, ProtocolError> {
        self.ensure(8)?;
        Ok(self.buf.get_f64())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes, ProtocolError> {
        self.ensure(len)?;
        Ok(self.buf.split_to(len))
    }

    /// Reads `len` bytes of UTF-8.
    pub fn read_utf8(&mut self, len: usize) -> Result<Arc<str>, ProtocolError> {
        let bytes = self.read_bytes(len)?;
        let text = std::str::from_utf8(&bytes).map_err(|_| ProtocolError::InvalidUtf8)?;
        Ok(Arc::from(text))
    }

    /// Reads a string prefixed with a 16-bit length.
    pub fn read_utf(&mut self) -> Result<String, ProtocolError> {
        let len = self.read_u16()? as usize;
        Ok(self.read_utf8(len)?.to_string())
    }

    /// Reads a string prefixed with a 32-bit length.
    pub fn read_long_utf(&mut self) -> Result<Arc<str>, ProtocolError> {
        let len = self.read_u32()? as usize;
        self.read_utf8(len)
    }

    /// Reads a sign-extended 29-bit integer.
    pub fn read_u29(&mut self) -> Result<i32, ProtocolError> {
        let (value, len) = varint::decode(&self.buf)?;
        self.buf.advance(len);
        Ok(value)
    }

    /// Reads a 29-bit handle, keeping its flag bits unsigned.
    fn read_handle(&mut self) -> Result<u32, ProtocolError> {
        Ok(self.read_u29()? as u32 & 0x1fff_ffff)
    }

    /// Reads an AMF3 string body (no marker), resolving string references.
    pub fn read_amf3_string_data(&mut self) -> Result<Arc<str>, ProtocolError> {
        let handle = self.read_handle()?;
        if handle & 1 == 0 {
            return self.refs.string((handle >> 1) as usize);
        }
        let value = self.read_utf8((handle >> 1) as usize)?;
        self.refs.add_string(value.clone());
        Ok(value)
    }

    pub fn read_value(&mut self, encoding: ObjectEncoding) -> Result<Value, ProtocolError> {
        match encoding {
            ObjectEncoding::Amf0 => self.read_amf0_value(),
            ObjectEncoding::Amf3 => self.read_amf3_value(),
        }
    }

    pub fn read_amf0_value(&mut self) -> Result<Value, ProtocolError> {
        let marker = self.read_u8()?;
        self.dispatch(ObjectEncoding::Amf0, marker)
    }

    pub fn read_amf3_value(&mut self) -> Result<Value, ProtocolError> {
        let marker = self.read_u8()?;
        self.dispatch(ObjectEncoding::Amf3, marker)
    }

    fn dispatch(&mut self, encoding: ObjectEncoding, marker: u8) -> Result<Value, ProtocolError> {
        let Some(strategy) = self.context.readers(encoding).get(marker) else {
            return Err(ProtocolError::UnknownMarker { encoding, marker });
        };

        let max_depth = self.settings.deserialization.max_depth;
        if self.depth >= max_depth {
            return Err(ProtocolError::DepthExceeded(max_depth));
        }
        self.depth += 1;
        let result = strategy.read(self);
        self.depth -= 1;
        result
    }

    /// Bounds a collection's initial capacity by what the input can hold.
    fn capacity_hint(&self, count: usize) -> usize {
        count.min(self.remaining())
    }

    fn date_from_millis(millis: f64) -> Result<Date, ProtocolError> {
        if !millis.is_finite() {
            return Err(ProtocolError::InvalidDate(millis));
        }
        Date::from_timestamp_millis(millis as i64).ok_or(ProtocolError::InvalidDate(millis))
    }

    /// Looks up the registered type for `class_name`.
    fn instantiate(&self, class_name: &str) -> Option<Value> {
        if class_name.is_empty() {
            return None;
        }
        match self.context.registry().types().create(class_name) {
            Some(node) => Some(Value::Typed(node)),
            None => {
                warn!(
                    "remote class {} is not registered, decoding as a dynamic object",
                    class_name
                );
                None
            }
        }
    }

    /// Assigns a member on a freshly decoded object.
    fn assign(&mut self, target: &Value, name: &str, value: Value) -> Result<(), ProtocolError> {
        let result = match target {
            Value::Object(node) => {
                node.write().insert(name, value);
                Ok(())
            }
            Value::Typed(node) => {
                let mut instance = node.write();
                let proxy = self.context.registry().proxies().proxy_for(&*instance);
                proxy.set_value(&mut *instance, name, value)
            }
            _ => Ok(()),
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) => self.member_failed(err),
        }
    }

    fn member_failed(&mut self, err: CoreError) -> Result<(), ProtocolError> {
        if err.is_member_not_found() {
            warn!("{}, value ignored", err);
            return Ok(());
        }
        if !self.fault_tolerant {
            return Err(err.into());
        }
        warn!("{}", err);
        if self.last_error.is_none() {
            self.last_error = Some(err.into());
        }
        Ok(())
    }

    pub(crate) fn null(&mut self) -> Result<Value, ProtocolError> {
        Ok(Value::Null)
    }

    pub(crate) fn unsupported(&mut self) -> Result<Value, ProtocolError> {
        Ok(Value::Unsupported)
    }

    pub(crate) fn amf0_number(&mut self) -> Result<Value, ProtocolError> {
        Ok(Value::Number(self.read_f64()?))
    }

    pub(crate) fn amf0_boolean(&mut self) -> Result<Value, ProtocolError> {
        Ok(Value::Boolean(self.read_u8()? != 0))
    }

    pub(crate) fn amf0_string(&mut self) -> Result<Value, ProtocolError> {
        let len = self.read_u16()? as usize;
        Ok(Value::String(self.read_utf8(len)?))
    }

    pub(crate) fn amf0_long_string(&mut self) -> Result<Value, ProtocolError> {
        Ok(Value::String(self.read_long_utf()?))
    }

    pub(crate) fn amf0_xml(&mut self) -> Result<Value, ProtocolError> {
        Ok(Value::Xml(self.read_long_utf()?))
    }

    pub(crate) fn amf0_reference(&mut self) -> Result<Value, ProtocolError> {
        let index = self.read_u16()? as usize;
        self.refs.amf0_object(index)
    }

    /// Reads `name, value` pairs up to the object-end marker.
    fn read_amf0_properties(
        &mut self,
        mut assign: impl FnMut(&mut Self, String, Value) -> Result<(), ProtocolError>,
    ) -> Result<(), ProtocolError> {
        loop {
            let key = self.read_utf()?;
            let marker = self.read_u8()?;
            if marker == amf0::OBJECT_END {
                return Ok(());
            }
            let value = self.dispatch(ObjectEncoding::Amf0, marker)?;
            assign(self, key, value)?;
        }
    }

    pub(crate) fn amf0_object(&mut self) -> Result<Value, ProtocolError> {
        let value = Value::object(AsObject::new());
        self.refs.add_amf0_object(value.clone());
        self.read_amf0_properties(|reader, key, member| reader.assign(&value, &key, member))?;
        Ok(value)
    }

    pub(crate) fn amf0_typed_object(&mut self) -> Result<Value, ProtocolError> {
        let class_name = self.read_utf()?;
        let value = self
            .instantiate(&class_name)
            .unwrap_or_else(|| Value::object(AsObject::typed(class_name)));
        self.refs.add_amf0_object(value.clone());
        self.read_amf0_properties(|reader, key, member| reader.assign(&value, &key, member))?;
        Ok(value)
    }

    pub(crate) fn amf0_ecma_array(&mut self) -> Result<Value, ProtocolError> {
        // The count is only a hint; the pairs run to the object-end marker.
        let _count = self.read_u32()?;
        let node: MapRef = Arc::new(RwLock::new(Properties::new()));
        let value = Value::Map(node.clone());
        self.refs.add_amf0_object(value.clone());
        self.read_amf0_properties(|_, key, member| {
            node.write().insert(key, member);
            Ok(())
        })?;
        Ok(value)
    }

    pub(crate) fn amf0_strict_array(&mut self) -> Result<Value, ProtocolError> {
        let count = self.read_u32()? as usize;
        let node: ArrayRef = Arc::new(RwLock::new(Vec::with_capacity(self.capacity_hint(count))));
        let value = Value::Array(node.clone());
        self.refs.add_amf0_object(value.clone());
        for _ in 0..count {
            let item = self.read_amf0_value()?;
            node.write().push(item);
        }
        Ok(value)
    }

    pub(crate) fn amf0_date(&mut self) -> Result<Value, ProtocolError> {
        let millis = self.read_f64()?;
        // Offsets above 12 hours encode negative values as 65536 - n.
        let raw = self.read_u16()? as i32;
        let offset = if raw > 720 { raw - 65536 } else { raw };
        let date = Self::date_from_millis(millis)?;
        let date = match self.settings.dates.timezone_compensation {
            TimezoneCompensation::Auto => date.shift_minutes(offset as i64),
            TimezoneCompensation::Server => date.to_local(),
            TimezoneCompensation::None | TimezoneCompensation::IgnoreUtcKind => date,
        };
        Ok(Value::Date(date))
    }

    pub(crate) fn amf3_false(&mut self) -> Result<Value, ProtocolError> {
        Ok(Value::Boolean(false))
    }

    pub(crate) fn amf3_true(&mut self) -> Result<Value, ProtocolError> {
        Ok(Value::Boolean(true))
    }

    pub(crate) fn amf3_integer(&mut self) -> Result<Value, ProtocolError> {
        Ok(Value::Integer(self.read_u29()?))
    }

    pub(crate) fn amf3_string(&mut self) -> Result<Value, ProtocolError> {
        Ok(Value::String(self.read_amf3_string_data()?))
    }

    pub(crate) fn amf3_xml(&mut self) -> Result<Value, ProtocolError> {
        let handle = self.read_handle()?;
        if handle & 1 == 0 {
            return self.refs.object((handle >> 1) as usize);
        }
        let value = Value::Xml(self.read_utf8((handle >> 1) as usize)?);
        self.refs.add_object(value.clone());
        Ok(value)
    }

    pub(crate) fn amf3_date(&mut self) -> Result<Value, ProtocolError> {
        let handle = self.read_handle()?;
        if handle & 1 == 0 {
            return self.refs.object((handle >> 1) as usize);
        }
        let date = Self::date_from_millis(self.read_f64()?)?;
        let date = match self.settings.dates.timezone_compensation {
            TimezoneCompensation::Server => date.to_local(),
            _ => date,
        };
        let value = Value::Date(date);
        self.refs.add_object(value.clone());
        Ok(value)
    }

    pub(crate) fn amf3_array(&mut self) -> Result<Value, ProtocolError> {
        let handle = self.read_handle()?;
        if handle & 1 == 0 {
            return self.refs.object((handle >> 1) as usize);
        }
        let dense = (handle >> 1) as usize;

        let mut key = self.read_amf3_string_data()?;
        if key.is_empty() {
            let node: ArrayRef = Arc::new(RwLock::new(Vec::with_capacity(self.capacity_hint(dense))));
            let value = Value::Array(node.clone());
            self.refs.add_object(value.clone());
            for _ in 0..dense {
                let item = self.read_amf3_value()?;
                node.write().push(item);
            }
            return Ok(value);
        }

        // Associative part present: the whole array becomes a map, dense
        // entries keyed by their index.
        let node: MapRef = Arc::new(RwLock::new(Properties::new()));
        let value = Value::Map(node.clone());
        self.refs.add_object(value.clone());
        while !key.is_empty() {
            let item = self.read_amf3_value()?;
            node.write().insert(&*key, item);
            key = self.read_amf3_string_data()?;
        }
        for index in 0..dense {
            let item = self.read_amf3_value()?;
            node.write().insert(index.to_string(), item);
        }
        Ok(value)
    }

    fn read_traits(&mut self, handle: u32) -> Result<Arc<ClassDefinition>, ProtocolError> {
        if handle & 2 == 0 {
            return self.refs.class_definition((handle >> 2) as usize);
        }
        let externalizable = handle & 4 != 0;
        let dynamic = handle & 8 != 0;
        let count = (handle >> 4) as usize;

        let class_name = self.read_amf3_string_data()?;
        let mut members = Vec::with_capacity(self.capacity_hint(count));
        for _ in 0..count {
            members.push(ClassMember::new(&*self.read_amf3_string_data()?));
        }
        let definition = Arc::new(ClassDefinition::new(
            &*class_name,
            members,
            externalizable,
            dynamic,
        ));
        debug!(
            "read class definition {:?} ({} members, externalizable={}, dynamic={})",
            definition.class_name(),
            definition.member_count(),
            externalizable,
            dynamic
        );
        self.refs.add_class_definition(definition.clone());
        Ok(definition)
    }

    pub(crate) fn amf3_object(&mut self) -> Result<Value, ProtocolError> {
        let handle = self.read_handle()?;
        if handle & 1 == 0 {
            return self.refs.object((handle >> 1) as usize);
        }
        let definition = self.read_traits(handle)?;
        let value = self
            .instantiate(definition.class_name())
            .unwrap_or_else(|| Value::object(AsObject::with_definition(definition.clone())));
        self.refs.add_object(value.clone());

        if definition.is_externalizable() {
            self.read_external(&value, &definition)?;
            return Ok(value);
        }

        for member in definition.members() {
            let item = self.read_amf3_value()?;
            self.assign(&value, member.name(), item)?;
        }
        if definition.is_dynamic() {
            loop {
                let key = self.read_amf3_string_data()?;
                if key.is_empty() {
                    break;
                }
                let item = self.read_amf3_value()?;
                self.assign(&value, &key, item)?;
            }
        }
        Ok(value)
    }

    fn read_external(&mut self, value: &Value, definition: &ClassDefinition) -> Result<(), ProtocolError> {
        let not_externalizable = || -> ProtocolError {
            CoreError::NotExternalizable {
                class: definition.class_name().to_string(),
            }
            .into()
        };
        let Value::Typed(node) = value else {
            return Err(not_externalizable());
        };
        let node = node.clone();
        let mut instance = node.write();
        let Some(external) = instance.as_externalizable_mut() else {
            return Err(not_externalizable());
        };
        external.read_external(&mut AmfDataInput { reader: self })?;
        Ok(())
    }

    pub(crate) fn amf3_byte_array(&mut self) -> Result<Value, ProtocolError> {
        let handle = self.read_handle()?;
        if handle & 1 == 0 {
            return self.refs.object((handle >> 1) as usize);
        }
        let bytes = self.read_bytes((handle >> 1) as usize)?;
        let value = Value::byte_array(bytes);
        self.refs.add_object(value.clone());
        Ok(value)
    }

    fn read_vector<T>(
        &mut self,
        width: usize,
        read: fn(&mut Self) -> Result<T, ProtocolError>,
        wrap: fn(Vector<T>) -> Value,
    ) -> Result<Value, ProtocolError> {
        let handle = self.read_handle()?;
        if handle & 1 == 0 {
            return self.refs.object((handle >> 1) as usize);
        }
        let len = (handle >> 1) as usize;
        let fixed = self.read_u29()? == 1;
        self.ensure(len * width)?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(read(self)?);
        }
        let value = wrap(Vector { fixed, items });
        self.refs.add_object(value.clone());
        Ok(value)
    }

    pub(crate) fn amf3_int_vector(&mut self) -> Result<Value, ProtocolError> {
        self.read_vector(4, Self::read_i32, Value::int_vector)
    }

    pub(crate) fn amf3_uint_vector(&mut self) -> Result<Value, ProtocolError> {
        self.read_vector(4, Self::read_u32, Value::uint_vector)
    }

    pub(crate) fn amf3_double_vector(&mut self) -> Result<Value, ProtocolError> {
        self.read_vector(8, Self::read_f64, Value::double_vector)
    }

    pub(crate) fn amf3_object_vector(&mut self) -> Result<Value, ProtocolError> {
        let handle = self.read_handle()?;
        if handle & 1 == 0 {
            return self.refs.object((handle >> 1) as usize);
        }
        let len = (handle >> 1) as usize;
        let fixed = self.read_u29()? == 1;
        let type_name = self.read_amf3_string_data()?.to_string();
        let node = Arc::new(RwLock::new(ObjectVector {
            type_name,
            fixed,
            items: Vec::with_capacity(self.capacity_hint(len)),
        }));
        let value = Value::ObjectVector(node.clone());
        self.refs.add_object(value.clone());
        for _ in 0..len {
            let item = self.read_amf3_value()?;
            node.write().items.push(item);
        }
        Ok(value)
    }
}

/// [`DataInput`] over the reader, handed to externalizable types.
struct AmfDataInput<'a> {
    reader: &'a mut AmfReader,
}

impl DataInput for AmfDataInput<'_> {
    fn read_boolean(&mut self) -> Result<bool, CoreError> {
        Ok(self.reader.read_u8()? != 0)
    }

    fn read_byte(&mut self) -> Result<u8, CoreError> {
        Ok(self.reader.read_u8()?)
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, CoreError> {
        Ok(self.reader.read_bytes(len)?.to_vec())
    }

    fn read_short(&mut self) -> Result<i16, CoreError> {
        Ok(self.reader.read_i16()?)
    }

    fn read_unsigned_short(&mut self) -> Result<u16, CoreError> {
        Ok(self.reader.read_u16()?)
    }

    fn read_int(&mut self) -> Result<i32, CoreError> {
        Ok(self.reader.read_i32()?)
    }

    fn read_unsigned_int(&mut self) -> Result<u32, CoreError> {
        Ok(self.reader.read_u32()?)
    }

    fn read_float(&mut self) -> Result<f32, CoreError> {
        Ok(self.reader.read_f32()?)
    }

    fn read_double(&mut self) -> Result<f64, CoreError> {
        Ok(self.reader.read_f64()?)
    }

    fn read_utf(&mut self) -> Result<String, CoreError> {
        Ok(self.reader.read_utf()?)
    }

    fn read_utf_bytes(&mut self, len: usize) -> Result<String, CoreError> {
        Ok(self.reader.read_utf8(len)?.to_string())
    }

    fn read_object(&mut self) -> Result<Value, CoreError> {
        Ok(self.reader.read_amf3_value()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amfwire_core::{reflect_type, ArrayCollection, DateKind, Registry};

    fn reader(bytes: &[u8]) -> AmfReader {
        AmfReader::new(Bytes::copy_from_slice(bytes))
    }

    fn reader_with(bytes: &[u8], config: CodecConfig) -> AmfReader {
        AmfReader::with_context(
            Bytes::copy_from_slice(bytes),
            Arc::new(CodecContext::new(config)),
        )
    }

    fn amf3_utf(text: &str) -> Vec<u8> {
        let mut out = vec![((text.len() << 1) | 1) as u8];
        out.extend_from_slice(text.as_bytes());
        out
    }

    #[derive(Debug, Default)]
    struct Point {
        x: i32,
        y: i32,
    }

    reflect_type!(Point, "geo.Point", [x: i32, y: i32]);

    #[test]
    fn test_amf3_string_references() {
        let mut r = reader(&[0x06, 0x05, b'h', b'i', 0x06, 0x00]);
        let first = r.read_amf3_value().unwrap();
        let second = r.read_amf3_value().unwrap();
        assert_eq!(first, Value::string("hi"));
        match (&first, &second) {
            (Value::String(a), Value::String(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("expected strings"),
        }
        assert!(r.is_empty());
    }

    #[test]
    fn test_empty_string_is_not_registered() {
        // "", "a", then a reference to handle 0 must resolve to "a".
        let mut r = reader(&[0x06, 0x01, 0x06, 0x03, b'a', 0x06, 0x00]);
        assert_eq!(r.read_amf3_value().unwrap(), Value::string(""));
        assert_eq!(r.read_amf3_value().unwrap(), Value::string("a"));
        assert_eq!(r.read_amf3_value().unwrap(), Value::string("a"));
    }

    #[test]
    fn test_amf0_scalars() {
        let mut bytes = vec![0x00];
        bytes.extend_from_slice(&1.5f64.to_be_bytes());
        bytes.extend_from_slice(&[0x01, 0x01, 0x02, 0x00, 0x02, b'o', b'k', 0x05, 0x06]);
        let mut r = reader(&bytes);
        assert_eq!(r.read_amf0_value().unwrap(), Value::Number(1.5));
        assert_eq!(r.read_amf0_value().unwrap(), Value::Boolean(true));
        assert_eq!(r.read_amf0_value().unwrap(), Value::string("ok"));
        assert_eq!(r.read_amf0_value().unwrap(), Value::Null);
        assert_eq!(r.read_amf0_value().unwrap(), Value::Null);
    }

    #[test]
    fn test_amf0_unsupported_markers() {
        for marker in [0x04u8, 0x09, 0x0d, 0x0e] {
            let mut r = reader(&[marker]);
            assert_eq!(r.read_amf0_value().unwrap(), Value::Unsupported);
        }
    }

    #[test]
    fn test_unknown_marker() {
        let err = reader(&[0x20]).read_amf0_value().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnknownMarker {
                encoding: ObjectEncoding::Amf0,
                marker: 0x20
            }
        ));
        let err = reader(&[0x11]).read_amf3_value().unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownMarker { marker: 0x11, .. }));
    }

    #[test]
    fn test_truncated_input() {
        let err = reader(&[0x00, 0x3f, 0xf0]).read_amf0_value().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnexpectedEof {
                needed: 8,
                remaining: 2
            }
        ));
        assert!(reader(&[0x06, 0x09, b'a']).read_amf3_value().is_err());
        assert!(reader(&[]).read_amf0_value().unwrap_err().is_eof());
    }

    #[test]
    fn test_amf0_anonymous_object() {
        let mut bytes = vec![0x03, 0x00, 0x01, b'a', 0x00];
        bytes.extend_from_slice(&2.0f64.to_be_bytes());
        bytes.extend_from_slice(&[0x00, 0x00, 0x09]);
        let value = reader(&bytes).read_amf0_value().unwrap();
        assert_eq!(value.class_name(), Some(String::new()));
        assert_eq!(value.get("a"), Some(Value::Number(2.0)));
    }

    #[test]
    fn test_amf0_self_reference() {
        // Strict array of one element that points back at the array.
        let bytes = [0x0a, 0x00, 0x00, 0x00, 0x01, 0x07, 0x00, 0x00];
        let value = reader(&bytes).read_amf0_value().unwrap();
        let items = value.as_array().unwrap().read().clone();
        assert_eq!(items.len(), 1);
        assert!(items[0].same_instance(&value));
        value.as_array().unwrap().write().clear();
    }

    #[test]
    fn test_amf0_invalid_reference() {
        let err = reader(&[0x07, 0x00, 0x03]).read_amf0_value().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidReference { index: 3, .. }));
    }

    #[test]
    fn test_amf0_typed_object_unregistered() {
        let mut bytes = vec![0x10, 0x00, 0x05];
        bytes.extend_from_slice(b"a.Foo");
        bytes.extend_from_slice(&[0x00, 0x01, b'n', 0x02, 0x00, 0x01, b'x', 0x00, 0x00, 0x09]);
        let value = reader(&bytes).read_amf0_value().unwrap();
        assert_eq!(value.class_name(), Some("a.Foo".to_string()));
        assert_eq!(value.get("n"), Some(Value::string("x")));
    }

    #[test]
    fn test_amf0_ecma_array() {
        let mut bytes = vec![0x08, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, b'k', 0x01, 0x00];
        bytes.extend_from_slice(&[0x00, 0x00, 0x09]);
        let value = reader(&bytes).read_amf0_value().unwrap();
        let map = value.as_map().unwrap().read().clone();
        assert_eq!(map.get("k"), Some(&Value::Boolean(false)));
    }

    #[test]
    fn test_amf0_long_string_and_xml() {
        let mut bytes = vec![0x0c, 0x00, 0x00, 0x00, 0x02, b'h', b'i'];
        bytes.extend_from_slice(&[0x0f, 0x00, 0x00, 0x00, 0x04]);
        bytes.extend_from_slice(b"<a/>");
        let mut r = reader(&bytes);
        assert_eq!(r.read_amf0_value().unwrap(), Value::string("hi"));
        assert_eq!(r.read_amf0_value().unwrap(), Value::xml("<a/>"));
    }

    #[test]
    fn test_amf0_avmplus_switch() {
        let mut r = reader(&[0x11, 0x04, 0x7f]);
        assert_eq!(r.read_amf0_value().unwrap(), Value::Integer(127));
    }

    fn amf0_date_bytes(millis: f64, offset: u16) -> Vec<u8> {
        let mut bytes = vec![0x0b];
        bytes.extend_from_slice(&millis.to_be_bytes());
        bytes.extend_from_slice(&offset.to_be_bytes());
        bytes
    }

    #[test]
    fn test_amf0_date_default_policy() {
        let value = reader(&amf0_date_bytes(86_400_000.0, 60)).read_amf0_value().unwrap();
        let date = value.as_date().unwrap();
        assert_eq!(date.kind(), DateKind::Utc);
        assert_eq!(date.timestamp_millis(), 86_400_000);
    }

    #[test]
    fn test_amf0_date_auto_compensation() {
        let mut config = CodecConfig::default();
        config.dates.timezone_compensation = TimezoneCompensation::Auto;

        let value = reader_with(&amf0_date_bytes(0.0, 60), config.clone())
            .read_amf0_value()
            .unwrap();
        let date = value.as_date().unwrap();
        assert_eq!(date.kind(), DateKind::Unspecified);
        assert_eq!(date.naive().and_utc().timestamp(), 3600);

        // 65236 is -300 minutes.
        let value = reader_with(&amf0_date_bytes(0.0, 65236), config)
            .read_amf0_value()
            .unwrap();
        assert_eq!(value.as_date().unwrap().naive().and_utc().timestamp(), -5 * 3600);
    }

    #[test]
    fn test_invalid_date() {
        let err = reader(&amf0_date_bytes(f64::NAN, 0)).read_amf0_value().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidDate(_)));
    }

    #[test]
    fn test_amf3_scalars() {
        let mut bytes = vec![0x00, 0x01, 0x02, 0x03, 0x04, 0xff, 0xff, 0xff, 0xff, 0x05];
        bytes.extend_from_slice(&0.25f64.to_be_bytes());
        let mut r = reader(&bytes);
        assert_eq!(r.read_amf3_value().unwrap(), Value::Null);
        assert_eq!(r.read_amf3_value().unwrap(), Value::Null);
        assert_eq!(r.read_amf3_value().unwrap(), Value::Boolean(false));
        assert_eq!(r.read_amf3_value().unwrap(), Value::Boolean(true));
        assert_eq!(r.read_amf3_value().unwrap(), Value::Integer(-1));
        assert_eq!(r.read_amf3_value().unwrap(), Value::Number(0.25));
    }

    #[test]
    fn test_amf3_dynamic_anonymous_object() {
        let bytes = [0x0a, 0x0b, 0x01, 0x03, b'a', 0x04, 0x05, 0x01];
        let mut r = reader(&bytes);
        let value = r.read_amf3_value().unwrap();
        assert_eq!(value.get("a"), Some(Value::Integer(5)));
        assert!(r.is_empty());
    }

    #[test]
    fn test_amf3_object_and_traits_references() {
        // [{x:1}, {x:2}, <ref 1>] with the second object reusing the traits.
        let mut bytes = vec![0x09, 0x07, 0x01];
        bytes.extend_from_slice(&[0x0a, 0x13, 0x01, 0x03, b'x', 0x04, 0x01]);
        bytes.extend_from_slice(&[0x0a, 0x01, 0x04, 0x02]);
        bytes.extend_from_slice(&[0x0a, 0x02]);
        let value = reader(&bytes).read_amf3_value().unwrap();
        let items = value.as_array().unwrap().read().clone();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].get("x"), Some(Value::Integer(1)));
        assert_eq!(items[1].get("x"), Some(Value::Integer(2)));
        assert!(items[2].same_instance(&items[0]));

        let first = items[0].as_object().unwrap().read().clone();
        let second = items[1].as_object().unwrap().read().clone();
        assert!(Arc::ptr_eq(
            first.definition().unwrap(),
            second.definition().unwrap()
        ));
    }

    #[test]
    fn test_amf3_registered_type() {
        let registry = Registry::new();
        registry.types().register::<Point>("geo.Point");
        let context = Arc::new(CodecContext::with_registry(
            CodecConfig::default(),
            Arc::new(registry),
        ));

        let mut bytes = vec![0x0a, 0x23];
        bytes.extend(amf3_utf("geo.Point"));
        bytes.extend(amf3_utf("x"));
        bytes.extend(amf3_utf("y"));
        bytes.extend_from_slice(&[0x04, 0x03, 0x04, 0x04]);

        let value = AmfReader::with_context(bytes, context).read_amf3_value().unwrap();
        let node = value.as_typed().unwrap().read();
        let point = node.as_any().downcast_ref::<Point>().unwrap();
        assert_eq!((point.x, point.y), (3, 4));
    }

    #[test]
    fn test_unknown_member_is_ignored() {
        let registry = Registry::new();
        registry.types().register::<Point>("geo.Point");
        let context = Arc::new(CodecContext::with_registry(
            CodecConfig::default(),
            Arc::new(registry),
        ));

        let mut bytes = vec![0x0a, 0x13];
        bytes.extend(amf3_utf("geo.Point"));
        bytes.extend(amf3_utf("z"));
        bytes.extend_from_slice(&[0x04, 0x09]);

        let mut r = AmfReader::with_context(bytes, context);
        let value = r.read_amf3_value().unwrap();
        assert_eq!(value.get("x"), Some(Value::Integer(0)));
        assert!(r.last_error().is_none());
    }

    #[test]
    fn test_member_type_error_is_recorded_when_fault_tolerant() {
        let registry = Registry::new();
        registry.types().register::<Point>("geo.Point");
        let context = Arc::new(CodecContext::with_registry(
            CodecConfig::default(),
            Arc::new(registry),
        ));

        let mut bytes = vec![0x0a, 0x13];
        bytes.extend(amf3_utf("geo.Point"));
        bytes.extend(amf3_utf("x"));
        bytes.extend(vec![0x06]);
        bytes.extend(amf3_utf("oops"));

        let mut strict = AmfReader::with_context(bytes.clone(), context.clone());
        let err = strict.read_amf3_value().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Core(CoreError::InvalidMemberValue { .. })
        ));

        let mut tolerant = AmfReader::with_context(bytes, context);
        tolerant.set_fault_tolerant(true);
        assert!(tolerant.read_amf3_value().is_ok());
        assert!(tolerant.take_last_error().is_some());
        assert!(tolerant.last_error().is_none());
    }

    #[test]
    fn test_amf3_mixed_array_becomes_map() {
        let bytes = [0x09, 0x03, 0x03, b'k', 0x04, 0x01, 0x01, 0x04, 0x02];
        let value = reader(&bytes).read_amf3_value().unwrap();
        let map = value.as_map().unwrap().read().clone();
        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["k", "0"]);
        assert_eq!(map.get("0"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_amf3_externalizable_collection() {
        let mut bytes = vec![0x0a, 0x07];
        bytes.extend(amf3_utf(ArrayCollection::CLASS_NAME));
        bytes.extend_from_slice(&[0x09, 0x05, 0x01, 0x04, 0x01, 0x04, 0x02]);
        let value = reader(&bytes).read_amf3_value().unwrap();
        let node = value.as_typed().unwrap().read();
        let collection = node.as_any().downcast_ref::<ArrayCollection>().unwrap();
        assert_eq!(collection.items(), &[Value::Integer(1), Value::Integer(2)]);
    }

    #[test]
    fn test_unregistered_externalizable_fails() {
        let mut bytes = vec![0x0a, 0x07];
        bytes.extend(amf3_utf("x.Opaque"));
        bytes.push(0x01);
        let err = reader(&bytes).read_amf3_value().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Core(CoreError::NotExternalizable { .. })
        ));
    }

    #[test]
    fn test_amf3_byte_array_and_vectors() {
        let mut bytes = vec![0x0c, 0x05, 0xaa, 0xbb];
        bytes.extend_from_slice(&[0x0d, 0x05, 0x01]);
        bytes.extend_from_slice(&7i32.to_be_bytes());
        bytes.extend_from_slice(&(-7i32).to_be_bytes());
        bytes.extend_from_slice(&[0x10, 0x03, 0x00]);
        bytes.extend(amf3_utf("geo.Point"));
        bytes.push(0x01);
        // A second reference to the byte array.
        bytes.extend_from_slice(&[0x0c, 0x00]);

        let mut r = reader(&bytes);
        let blob = r.read_amf3_value().unwrap();
        assert_eq!(blob.as_byte_array().unwrap().as_slice(), &[0xaa, 0xbb]);

        let ints = r.read_amf3_value().unwrap();
        match &ints {
            Value::IntVector(v) => {
                let v = v.read();
                assert!(v.fixed);
                assert_eq!(v.items, vec![7, -7]);
            }
            other => panic!("unexpected {:?}", other),
        }

        match r.read_amf3_value().unwrap() {
            Value::ObjectVector(v) => {
                let v = v.read();
                assert_eq!(v.type_name, "geo.Point");
                assert_eq!(v.items, vec![Value::Null]);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(r.read_amf3_value().unwrap().same_instance(&blob));
    }

    #[test]
    fn test_vector_fixed_flag_is_a_varint() {
        // Flag 128 spans two bytes and does not mark the vector fixed.
        let mut bytes = vec![0x0d, 0x03, 0x81, 0x00];
        bytes.extend_from_slice(&5i32.to_be_bytes());
        bytes.extend_from_slice(&[0x10, 0x01, 0x81, 0x00, 0x01]);
        bytes.extend_from_slice(&[0x0f, 0x01, 0x02]);

        let mut r = reader(&bytes);
        match r.read_amf3_value().unwrap() {
            Value::IntVector(v) => {
                let v = v.read();
                assert!(!v.fixed);
                assert_eq!(v.items, vec![5]);
            }
            other => panic!("unexpected {:?}", other),
        }
        match r.read_amf3_value().unwrap() {
            Value::ObjectVector(v) => {
                let v = v.read();
                assert!(!v.fixed);
                assert_eq!(v.type_name, "");
                assert!(v.items.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
        // Any flag other than 1 leaves the vector resizable.
        match r.read_amf3_value().unwrap() {
            Value::DoubleVector(v) => assert!(!v.read().fixed),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_vector_length_is_checked() {
        let err = reader(&[0x0f, 0x09, 0x00, 0x00]).read_amf3_value().unwrap_err();
        assert!(err.is_eof());
    }

    #[test]
    fn test_amf3_date_reference() {
        let mut bytes = vec![0x08, 0x01];
        bytes.extend_from_slice(&1_000.0f64.to_be_bytes());
        bytes.extend_from_slice(&[0x08, 0x00]);
        let mut r = reader(&bytes);
        let first = r.read_amf3_value().unwrap();
        assert_eq!(first.as_date().unwrap().timestamp_millis(), 1_000);
        assert_eq!(r.read_amf3_value().unwrap(), first);
    }

    #[test]
    fn test_depth_limit() {
        let mut config = CodecConfig::default();
        config.deserialization.max_depth = 3;
        let nested = [0x09, 0x03, 0x01, 0x09, 0x03, 0x01, 0x09, 0x03, 0x01, 0x01];
        let err = reader_with(&nested, config.clone()).read_amf3_value().unwrap_err();
        assert!(matches!(err, ProtocolError::DepthExceeded(3)));

        let shallow = [0x09, 0x03, 0x01, 0x09, 0x03, 0x01, 0x01];
        assert!(reader_with(&shallow, config).read_amf3_value().is_ok());
    }

    #[test]
    fn test_seek_and_reset() {
        let mut r = reader(&[0x06, 0x03, b'a', 0x06, 0x00]);
        r.read_amf3_value().unwrap();
        r.seek(0).unwrap();
        assert_eq!(r.position(), 0);
        r.reset();
        r.seek(3).unwrap();
        assert!(matches!(
            r.read_amf3_value().unwrap_err(),
            ProtocolError::InvalidReference { .. }
        ));
        assert!(r.seek(99).is_err());
    }
}
