//! # amfwire-core
//!
//! Object model for the amfwire AMF codec.
//!
//! This crate provides:
//! - The [`Value`] graph exchanged through AMF0/AMF3 (shared nodes,
//!   circular references)
//! - Class definitions and the [`Reflect`] description of typed objects
//! - Pluggable [`ObjectProxy`] strategies and the registries that select them
//! - The externalizable contract and built-in Flex collection types
//! - A JSON view of decoded graphs

pub mod collections;
pub mod cow;
pub mod date;
pub mod definition;
pub mod error;
pub mod json;
mod macros;
pub mod object;
pub mod proxy;
pub mod reflect;
pub mod registry;
pub mod value;

pub use collections::ArrayCollection;
pub use cow::CowMap;
pub use date::{Date, DateKind};
pub use definition::{ClassDefinition, ClassMember};
pub use error::CoreError;
pub use object::{AsObject, Properties};
pub use proxy::{
    AsObjectProxy, ExceptionProxy, ExternalizableProxy, ObjectProxy, ReflectProxy,
    ERROR_BASE_CLASS,
};
pub use reflect::{DataInput, DataOutput, Externalizable, MemberInfo, Reflect};
pub use registry::{ProxyRegistry, Registry, TypeRegistry};
pub use value::{
    ArrayRef, ByteArray, FromValue, MapRef, ObjectRef, ObjectVector, ObjectVectorRef, TypedRef,
    Value, ValueKind, Vector, VectorRef,
};
