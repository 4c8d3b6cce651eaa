//! Member discovery for typed objects.
//!
//! Rust has no runtime reflection, so typed objects describe themselves
//! through [`Reflect`]. Most types implement it with the
//! [`reflect_type!`](crate::reflect_type) macro; hand-written impls can mark
//! members [`MemberInfo::transient`] to keep them off the wire.

use crate::error::CoreError;
use crate::value::Value;
use std::any::Any;

/// A member exposed by a [`Reflect`] type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub name: String,
    /// Transient members are skipped when building class definitions.
    pub transient: bool,
}

impl MemberInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transient: false,
        }
    }

    pub fn transient(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transient: true,
        }
    }
}

/// Runtime description of a typed object.
pub trait Reflect: Any + Send + Sync {
    /// Remote class name written on the wire.
    fn class_name(&self) -> &str;

    /// Names of base classes, nearest first. Used for proxy and writer
    /// lookups when the exact type has no registration.
    fn ancestors(&self) -> &'static [&'static str] {
        &[]
    }

    /// Members in declaration order.
    fn members(&self) -> Vec<MemberInfo>;

    fn get_member(&self, name: &str) -> Option<Value>;

    /// Assigns a member. Unknown names return
    /// [`CoreError::MemberNotFound`].
    fn set_member(&mut self, name: &str, value: Value) -> Result<(), CoreError>;

    fn as_externalizable(&self) -> Option<&dyn Externalizable> {
        None
    }

    fn as_externalizable_mut(&mut self) -> Option<&mut dyn Externalizable> {
        None
    }

    /// Error-shaped types expose themselves here to be serialized as faults.
    fn as_error(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Types that control their own byte layout.
pub trait Externalizable {
    fn read_external(&mut self, input: &mut dyn DataInput) -> Result<(), CoreError>;

    fn write_external(&self, output: &mut dyn DataOutput) -> Result<(), CoreError>;
}

/// Byte-level input handed to [`Externalizable::read_external`]. All
/// multi-byte values are big-endian.
pub trait DataInput {
    fn read_boolean(&mut self) -> Result<bool, CoreError>;
    fn read_byte(&mut self) -> Result<u8, CoreError>;
    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, CoreError>;
    fn read_short(&mut self) -> Result<i16, CoreError>;
    fn read_unsigned_short(&mut self) -> Result<u16, CoreError>;
    fn read_int(&mut self) -> Result<i32, CoreError>;
    fn read_unsigned_int(&mut self) -> Result<u32, CoreError>;
    fn read_float(&mut self) -> Result<f32, CoreError>;
    fn read_double(&mut self) -> Result<f64, CoreError>;
    /// Reads a string prefixed with its 16-bit byte length.
    fn read_utf(&mut self) -> Result<String, CoreError>;
    fn read_utf_bytes(&mut self, len: usize) -> Result<String, CoreError>;
    /// Reads one nested value in the stream's object encoding.
    fn read_object(&mut self) -> Result<Value, CoreError>;
}

/// Byte-level output handed to [`Externalizable::write_external`].
pub trait DataOutput {
    fn write_boolean(&mut self, value: bool) -> Result<(), CoreError>;
    fn write_byte(&mut self, value: u8) -> Result<(), CoreError>;
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CoreError>;
    fn write_short(&mut self, value: i16) -> Result<(), CoreError>;
    fn write_unsigned_short(&mut self, value: u16) -> Result<(), CoreError>;
    fn write_int(&mut self, value: i32) -> Result<(), CoreError>;
    fn write_unsigned_int(&mut self, value: u32) -> Result<(), CoreError>;
    fn write_float(&mut self, value: f32) -> Result<(), CoreError>;
    fn write_double(&mut self, value: f64) -> Result<(), CoreError>;
    fn write_utf(&mut self, value: &str) -> Result<(), CoreError>;
    fn write_utf_bytes(&mut self, value: &str) -> Result<(), CoreError>;
    fn write_object(&mut self, value: &Value) -> Result<(), CoreError>;
}
