//! Object graph values.
//!
//! Scalars are held inline. Every reference-eligible value (arrays, maps,
//! objects, byte arrays, vectors, XML) lives behind an `Arc`, so cloning a
//! [`Value`] shares the node and the codec can detect repeated and circular
//! references by pointer identity.

use crate::date::Date;
use crate::error::CoreError;
use crate::object::{AsObject, Properties};
use crate::reflect::Reflect;
use bytes::Bytes;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

pub type ArrayRef = Arc<RwLock<Vec<Value>>>;
pub type MapRef = Arc<RwLock<Properties>>;
pub type ObjectRef = Arc<RwLock<AsObject>>;
pub type TypedRef = Arc<RwLock<dyn Reflect>>;
pub type VectorRef<T> = Arc<RwLock<Vector<T>>>;
pub type ObjectVectorRef = Arc<RwLock<ObjectVector>>;

/// Typed numeric vector (`Vector.<int>`, `Vector.<uint>`, `Vector.<Number>`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vector<T> {
    /// Fixed-length vectors cannot grow on the client side.
    pub fixed: bool,
    pub items: Vec<T>,
}

impl<T> Vector<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            fixed: false,
            items,
        }
    }

    pub fn fixed(items: Vec<T>) -> Self {
        Self { fixed: true, items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// `Vector.<T>` of arbitrary values, tagged with the element type name.
#[derive(Debug, Clone, Default)]
pub struct ObjectVector {
    pub type_name: String,
    pub fixed: bool,
    pub items: Vec<Value>,
}

impl ObjectVector {
    pub fn new(type_name: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            type_name: type_name.into(),
            fixed: false,
            items,
        }
    }
}

/// Raw byte buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteArray(Bytes);

impl ByteArray {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

/// Discriminant of a [`Value`], used as a dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Date,
    Xml,
    ByteArray,
    Array,
    Map,
    Object,
    Typed,
    IntVector,
    UIntVector,
    DoubleVector,
    ObjectVector,
    Unsupported,
}

impl ValueKind {
    pub const ALL: [ValueKind; 17] = [
        ValueKind::Null,
        ValueKind::Boolean,
        ValueKind::Integer,
        ValueKind::Number,
        ValueKind::String,
        ValueKind::Date,
        ValueKind::Xml,
        ValueKind::ByteArray,
        ValueKind::Array,
        ValueKind::Map,
        ValueKind::Object,
        ValueKind::Typed,
        ValueKind::IntVector,
        ValueKind::UIntVector,
        ValueKind::DoubleVector,
        ValueKind::ObjectVector,
        ValueKind::Unsupported,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Date => "date",
            ValueKind::Xml => "xml",
            ValueKind::ByteArray => "byte array",
            ValueKind::Array => "array",
            ValueKind::Map => "associative array",
            ValueKind::Object => "object",
            ValueKind::Typed => "typed object",
            ValueKind::IntVector => "int vector",
            ValueKind::UIntVector => "uint vector",
            ValueKind::DoubleVector => "double vector",
            ValueKind::ObjectVector => "object vector",
            ValueKind::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node in an AMF object graph.
///
/// Equality compares scalars, XML text and byte arrays by value and every
/// other node by identity.
#[derive(Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i32),
    Number(f64),
    String(Arc<str>),
    Date(Date),
    Xml(Arc<str>),
    ByteArray(Arc<ByteArray>),
    Array(ArrayRef),
    Map(MapRef),
    Object(ObjectRef),
    Typed(TypedRef),
    IntVector(VectorRef<i32>),
    UIntVector(VectorRef<u32>),
    DoubleVector(VectorRef<f64>),
    ObjectVector(ObjectVectorRef),
    /// Produced for markers that carry no decodable payload.
    Unsupported,
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Arc::from(s.as_ref()))
    }

    pub fn xml(s: impl AsRef<str>) -> Self {
        Value::Xml(Arc::from(s.as_ref()))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(RwLock::new(items)))
    }

    pub fn map(properties: Properties) -> Self {
        Value::Map(Arc::new(RwLock::new(properties)))
    }

    pub fn object(object: AsObject) -> Self {
        Value::Object(Arc::new(RwLock::new(object)))
    }

    pub fn typed<T: Reflect>(object: T) -> Self {
        let node: TypedRef = Arc::new(RwLock::new(object));
        Value::Typed(node)
    }

    pub fn byte_array(data: impl Into<Bytes>) -> Self {
        Value::ByteArray(Arc::new(ByteArray::new(data)))
    }

    pub fn int_vector(vector: Vector<i32>) -> Self {
        Value::IntVector(Arc::new(RwLock::new(vector)))
    }

    pub fn uint_vector(vector: Vector<u32>) -> Self {
        Value::UIntVector(Arc::new(RwLock::new(vector)))
    }

    pub fn double_vector(vector: Vector<f64>) -> Self {
        Value::DoubleVector(Arc::new(RwLock::new(vector)))
    }

    pub fn object_vector(vector: ObjectVector) -> Self {
        Value::ObjectVector(Arc::new(RwLock::new(vector)))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Integer(_) => ValueKind::Integer,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Date(_) => ValueKind::Date,
            Value::Xml(_) => ValueKind::Xml,
            Value::ByteArray(_) => ValueKind::ByteArray,
            Value::Array(_) => ValueKind::Array,
            Value::Map(_) => ValueKind::Map,
            Value::Object(_) => ValueKind::Object,
            Value::Typed(_) => ValueKind::Typed,
            Value::IntVector(_) => ValueKind::IntVector,
            Value::UIntVector(_) => ValueKind::UIntVector,
            Value::DoubleVector(_) => ValueKind::DoubleVector,
            Value::ObjectVector(_) => ValueKind::ObjectVector,
            Value::Unsupported => ValueKind::Unsupported,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Address of the shared node, for values tracked by identity in the
    /// object reference tables. Strings are tracked by value and return
    /// `None`.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Xml(s) => Some(Arc::as_ptr(s) as *const u8 as usize),
            Value::ByteArray(b) => Some(Arc::as_ptr(b) as usize),
            Value::Array(a) => Some(Arc::as_ptr(a) as usize),
            Value::Map(m) => Some(Arc::as_ptr(m) as usize),
            Value::Object(o) => Some(Arc::as_ptr(o) as usize),
            Value::Typed(t) => Some(Arc::as_ptr(t) as *const () as usize),
            Value::IntVector(v) => Some(Arc::as_ptr(v) as usize),
            Value::UIntVector(v) => Some(Arc::as_ptr(v) as usize),
            Value::DoubleVector(v) => Some(Arc::as_ptr(v) as usize),
            Value::ObjectVector(v) => Some(Arc::as_ptr(v) as usize),
            _ => None,
        }
    }

    /// Returns true when both values share the same node.
    pub fn same_instance(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Number(n) if n.fract() == 0.0 && *n >= i32::MIN as f64 && *n <= i32::MAX as f64 => {
                Some(*n as i32)
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Xml(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&Date> {
        match self {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_byte_array(&self) -> Option<&Arc<ByteArray>> {
        match self {
            Value::ByteArray(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapRef> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_typed(&self) -> Option<&TypedRef> {
        match self {
            Value::Typed(t) => Some(t),
            _ => None,
        }
    }

    /// Class name of an object node; empty for anonymous objects and `None`
    /// for non-objects.
    pub fn class_name(&self) -> Option<String> {
        match self {
            Value::Object(o) => Some(o.read().type_name().to_string()),
            Value::Typed(t) => Some(t.read().class_name().to_string()),
            _ => None,
        }
    }

    /// Reads a member from an object or associative array node.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self {
            Value::Object(o) => o.read().get(name).cloned(),
            Value::Map(m) => m.read().get(name).cloned(),
            Value::Typed(t) => t.read().get_member(name),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Unsupported, Value::Unsupported) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Xml(a), Value::Xml(b)) => a == b,
            (Value::ByteArray(a), Value::ByteArray(b)) => a == b,
            _ => self.same_instance(other),
        }
    }
}

// Graph nodes are printed by address only; the graph may be cyclic and a
// node may be locked by the caller.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Boolean(b) => write!(f, "Boolean({})", b),
            Value::Integer(i) => write!(f, "Integer({})", i),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Date(d) => write!(f, "Date({:?})", d),
            Value::Xml(s) => write!(f, "Xml({:?})", s),
            Value::ByteArray(b) => write!(f, "ByteArray(len={})", b.len()),
            Value::Array(a) => write!(f, "Array(@{:p})", Arc::as_ptr(a)),
            Value::Map(m) => write!(f, "Map(@{:p})", Arc::as_ptr(m)),
            Value::Object(o) => write!(f, "Object(@{:p})", Arc::as_ptr(o)),
            Value::Typed(t) => write!(f, "Typed(@{:p})", Arc::as_ptr(t)),
            Value::IntVector(v) => write!(f, "IntVector(@{:p})", Arc::as_ptr(v)),
            Value::UIntVector(v) => write!(f, "UIntVector(@{:p})", Arc::as_ptr(v)),
            Value::DoubleVector(v) => write!(f, "DoubleVector(@{:p})", Arc::as_ptr(v)),
            Value::ObjectVector(v) => write!(f, "ObjectVector(@{:p})", Arc::as_ptr(v)),
            Value::Unsupported => f.write_str("Unsupported"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i)
    }
}

impl From<i16> for Value {
    fn from(i: i16) -> Self {
        Value::Integer(i as i32)
    }
}

impl From<u16> for Value {
    fn from(i: u16) -> Self {
        Value::Integer(i as i32)
    }
}

impl From<u8> for Value {
    fn from(i: u8) -> Self {
        Value::Integer(i as i32)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        match i32::try_from(i) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Number(i as f64),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        match i32::try_from(i) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Number(i as f64),
        }
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<Arc<str>> for Value {
    fn from(s: Arc<str>) -> Self {
        Value::String(s)
    }
}

impl From<Date> for Value {
    fn from(d: Date) -> Self {
        Value::Date(d)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for Value {
    fn from(d: chrono::DateTime<chrono::Utc>) -> Self {
        Value::Date(Date::from_utc(d))
    }
}

impl From<ByteArray> for Value {
    fn from(b: ByteArray) -> Self {
        Value::ByteArray(Arc::new(b))
    }
}

impl From<AsObject> for Value {
    fn from(o: AsObject) -> Self {
        Value::object(o)
    }
}

impl From<Properties> for Value {
    fn from(p: Properties) -> Self {
        Value::map(p)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// Conversion out of a [`Value`], used when assigning decoded members to
/// typed fields.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, CoreError>;
}

fn unexpected(expected: &'static str, found: &Value) -> CoreError {
    CoreError::UnexpectedValue {
        expected,
        found: found.kind().name(),
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, CoreError> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, CoreError> {
        value.as_bool().ok_or_else(|| unexpected("boolean", &value))
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self, CoreError> {
        value.as_i32().ok_or_else(|| unexpected("integer", &value))
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::Integer(i) => Ok(i as i64),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 => {
                Ok(n as i64)
            }
            other => Err(unexpected("integer", &other)),
        }
    }
}

impl FromValue for u32 {
    fn from_value(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::Integer(i) if i >= 0 => Ok(i as u32),
            Value::Number(n) if n.fract() == 0.0 && n >= 0.0 && n <= u32::MAX as f64 => {
                Ok(n as u32)
            }
            other => Err(unexpected("unsigned integer", &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, CoreError> {
        value.as_f64().ok_or_else(|| unexpected("number", &value))
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, CoreError> {
        value
            .as_f64()
            .map(|n| n as f32)
            .ok_or_else(|| unexpected("number", &value))
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, CoreError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| unexpected("string", &value))
    }
}

impl FromValue for Arc<str> {
    fn from_value(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::String(s) | Value::Xml(s) => Ok(s),
            other => Err(unexpected("string", &other)),
        }
    }
}

impl FromValue for Date {
    fn from_value(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::Date(d) => Ok(d),
            Value::Number(n) if n.is_finite() => Date::from_timestamp_millis(n as i64)
                .ok_or_else(|| unexpected("date", &Value::Number(n))),
            other => Err(unexpected("date", &other)),
        }
    }
}

impl FromValue for chrono::DateTime<chrono::Utc> {
    fn from_value(value: Value) -> Result<Self, CoreError> {
        Date::from_value(value).map(|d| d.to_utc())
    }
}

impl FromValue for ByteArray {
    fn from_value(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::ByteArray(b) => Ok(ByteArray::clone(&b)),
            other => Err(unexpected("byte array", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::Array(items) => {
                let items = items.read().clone();
                items.into_iter().map(T::from_value).collect()
            }
            other => Err(unexpected("array", &other)),
        }
    }
}
