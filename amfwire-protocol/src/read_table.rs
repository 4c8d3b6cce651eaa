//! Marker dispatch tables for the reader.
//!
//! Each generation has a 256-entry sparse table indexed by type marker.
//! Supporting a new marker is a matter of registering one [`MarkerReader`].

use crate::error::ProtocolError;
use crate::markers::{amf0, amf3};
use crate::reader::AmfReader;
use amfwire_core::Value;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Decodes the payload that follows a type marker.
pub trait MarkerReader: Send + Sync {
    fn read(&self, reader: &mut AmfReader) -> Result<Value, ProtocolError>;
}

impl<F> MarkerReader for F
where
    F: Fn(&mut AmfReader) -> Result<Value, ProtocolError> + Send + Sync,
{
    fn read(&self, reader: &mut AmfReader) -> Result<Value, ProtocolError> {
        self(reader)
    }
}

type Slots = Vec<Option<Arc<dyn MarkerReader>>>;

/// Copy-on-write marker table. Lookups never block; registration swaps in
/// a new table.
pub struct ReaderTable {
    slots: ArcSwap<Slots>,
    write_lock: Mutex<()>,
}

impl fmt::Debug for ReaderTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let markers: Vec<u8> = self
            .slots
            .load()
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(marker, _)| marker as u8)
            .collect();
        f.debug_struct("ReaderTable").field("markers", &markers).finish()
    }
}

impl Default for ReaderTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl ReaderTable {
    pub fn empty() -> Self {
        Self {
            slots: ArcSwap::from_pointee(vec![None; 256]),
            write_lock: Mutex::new(()),
        }
    }

    /// Table with every AMF0 marker.
    pub fn amf0() -> Self {
        let table = Self::empty();
        table.register(amf0::NUMBER, AmfReader::amf0_number);
        table.register(amf0::BOOLEAN, AmfReader::amf0_boolean);
        table.register(amf0::STRING, AmfReader::amf0_string);
        table.register(amf0::OBJECT, AmfReader::amf0_object);
        table.register(amf0::MOVIECLIP, AmfReader::unsupported);
        table.register(amf0::NULL, AmfReader::null);
        table.register(amf0::UNDEFINED, AmfReader::null);
        table.register(amf0::REFERENCE, AmfReader::amf0_reference);
        table.register(amf0::ECMA_ARRAY, AmfReader::amf0_ecma_array);
        table.register(amf0::OBJECT_END, AmfReader::unsupported);
        table.register(amf0::STRICT_ARRAY, AmfReader::amf0_strict_array);
        table.register(amf0::DATE, AmfReader::amf0_date);
        table.register(amf0::LONG_STRING, AmfReader::amf0_long_string);
        table.register(amf0::UNSUPPORTED, AmfReader::unsupported);
        table.register(amf0::RECORDSET, AmfReader::unsupported);
        table.register(amf0::XML_DOCUMENT, AmfReader::amf0_xml);
        table.register(amf0::TYPED_OBJECT, AmfReader::amf0_typed_object);
        table.register(amf0::AVMPLUS, AmfReader::read_amf3_value);
        table
    }

    /// Table with every AMF3 marker.
    pub fn amf3() -> Self {
        let table = Self::empty();
        table.register(amf3::UNDEFINED, AmfReader::null);
        table.register(amf3::NULL, AmfReader::null);
        table.register(amf3::FALSE, AmfReader::amf3_false);
        table.register(amf3::TRUE, AmfReader::amf3_true);
        table.register(amf3::INTEGER, AmfReader::amf3_integer);
        table.register(amf3::DOUBLE, AmfReader::amf0_number);
        table.register(amf3::STRING, AmfReader::amf3_string);
        table.register(amf3::XML_DOCUMENT, AmfReader::amf3_xml);
        table.register(amf3::DATE, AmfReader::amf3_date);
        table.register(amf3::ARRAY, AmfReader::amf3_array);
        table.register(amf3::OBJECT, AmfReader::amf3_object);
        table.register(amf3::XML, AmfReader::amf3_xml);
        table.register(amf3::BYTE_ARRAY, AmfReader::amf3_byte_array);
        table.register(amf3::VECTOR_INT, AmfReader::amf3_int_vector);
        table.register(amf3::VECTOR_UINT, AmfReader::amf3_uint_vector);
        table.register(amf3::VECTOR_DOUBLE, AmfReader::amf3_double_vector);
        table.register(amf3::VECTOR_OBJECT, AmfReader::amf3_object_vector);
        table
    }

    /// Installs `reader` for `marker`, replacing any previous entry.
    pub fn register(&self, marker: u8, reader: impl MarkerReader + 'static) {
        let _guard = self.write_lock.lock();
        let mut next: Slots = (**self.slots.load()).clone();
        next[marker as usize] = Some(Arc::new(reader));
        self.slots.store(Arc::new(next));
    }

    pub fn unregister(&self, marker: u8) {
        let _guard = self.write_lock.lock();
        let mut next: Slots = (**self.slots.load()).clone();
        next[marker as usize] = None;
        self.slots.store(Arc::new(next));
    }

    pub fn get(&self, marker: u8) -> Option<Arc<dyn MarkerReader>> {
        self.slots.load()[marker as usize].clone()
    }

    pub fn contains(&self, marker: u8) -> bool {
        self.slots.load()[marker as usize].is_some()
    }
}
