//! # amfwire-protocol
//!
//! AMF0/AMF3 wire codec for amfwire.
//!
//! This crate provides:
//! - 29-bit variable-length integers and the AMF0/AMF3 marker sets
//! - [`AmfReader`] and [`AmfWriter`] with per-body reference tables
//! - Pluggable marker readers and type-keyed writer strategies
//! - Message envelopes ([`Message`], [`Header`], [`Body`]) and their codec
//! - Error response bodies and the codec configuration

pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod fault;
pub mod markers;
pub mod message;
pub mod read_table;
pub mod reader;
pub mod references;
pub mod varint;
pub mod write_table;
pub mod writer;

pub use codec::{DecodeFailure, Decoder, Encoder};
pub use config::{CodecConfig, ConfigError, TimezoneCompensation};
pub use context::CodecContext;
pub use error::ProtocolError;
pub use fault::{fault_content, request_fault, response_fault, FAULT_CODE};
pub use message::{Body, Header, Message, ObjectEncoding, ON_DEBUG_EVENTS, ON_RESULT, ON_STATUS};
pub use read_table::{MarkerReader, ReaderTable};
pub use reader::AmfReader;
pub use write_table::{FnWriter, TypeKey, ValueWriter, WriterTable};
pub use writer::AmfWriter;
