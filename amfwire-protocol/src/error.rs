//! Protocol error types.

use crate::message::ObjectEncoding;
use amfwire_core::CoreError;
use thiserror::Error;

/// Errors raised while reading or writing AMF data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unexpected end of input: need {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("invalid UTF-8 in string data")]
    InvalidUtf8,

    #[error("unknown {encoding} type marker: {marker:#04x}")]
    UnknownMarker {
        encoding: ObjectEncoding,
        marker: u8,
    },

    #[error("invalid {table} reference {index} (table holds {len})")]
    InvalidReference {
        table: &'static str,
        index: usize,
        len: usize,
    },

    #[error("{table} reference {index} points to {found}, expected {expected}")]
    ReferenceMismatch {
        table: &'static str,
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid length or handle: {0}")]
    InvalidLength(i64),

    #[error("invalid date value: {0}")]
    InvalidDate(f64),

    #[error("unsupported message version: {0}")]
    UnsupportedVersion(u16),

    #[error("nesting deeper than {0} levels")]
    DepthExceeded(usize),

    #[error("string too long: {len} bytes (max {max})")]
    StringTooLong { len: usize, max: usize },

    #[error("too many {what}: {count} (max {max})")]
    CountOverflow {
        what: &'static str,
        count: usize,
        max: usize,
    },

    #[error("no {encoding} writer registered for {type_name}")]
    NoWriter {
        encoding: ObjectEncoding,
        type_name: String,
    },

    #[error("{writer} writer cannot encode a {found} value")]
    WriterMismatch {
        writer: &'static str,
        found: &'static str,
    },

    #[error("externalizable class '{class}' cannot be written as AMF0")]
    ExternalizableInAmf0 { class: String },

    #[error("{0}")]
    Core(CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Short name of the error variant, used as the `type` of fault bodies.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ProtocolError::UnexpectedEof { .. } => "UnexpectedEof",
            ProtocolError::InvalidUtf8 => "InvalidUtf8",
            ProtocolError::UnknownMarker { .. } => "UnknownMarker",
            ProtocolError::InvalidReference { .. } => "InvalidReference",
            ProtocolError::ReferenceMismatch { .. } => "ReferenceMismatch",
            ProtocolError::InvalidLength(_) => "InvalidLength",
            ProtocolError::InvalidDate(_) => "InvalidDate",
            ProtocolError::UnsupportedVersion(_) => "UnsupportedVersion",
            ProtocolError::DepthExceeded(_) => "DepthExceeded",
            ProtocolError::StringTooLong { .. } => "StringTooLong",
            ProtocolError::CountOverflow { .. } => "CountOverflow",
            ProtocolError::NoWriter { .. } => "NoWriter",
            ProtocolError::WriterMismatch { .. } => "WriterMismatch",
            ProtocolError::ExternalizableInAmf0 { .. } => "ExternalizableInAmf0",
            ProtocolError::Core(_) => "CoreError",
            ProtocolError::Io(_) => "IoError",
        }
    }

    /// Returns whether the input ended before a complete value was read.
    pub fn is_eof(&self) -> bool {
        matches!(self, ProtocolError::UnexpectedEof { .. })
    }
}

// Errors raised inside externalizable hooks travel through `CoreError::Codec`;
// unwrap them so callers see the original protocol error.
impl From<CoreError> for ProtocolError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Codec(inner) => match inner.downcast::<ProtocolError>() {
                Ok(protocol) => *protocol,
                Err(other) => ProtocolError::Core(CoreError::Codec(other)),
            },
            other => ProtocolError::Core(other),
        }
    }
}

impl From<ProtocolError> for CoreError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Core(core) => core,
            other => CoreError::Codec(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::UnexpectedEof {
            needed: 8,
            remaining: 3,
        };
        assert!(err.to_string().contains("need 8 bytes"));
        assert!(err.is_eof());

        let err = ProtocolError::UnknownMarker {
            encoding: ObjectEncoding::Amf3,
            marker: 0x20,
        };
        assert_eq!(err.to_string(), "unknown AMF3 type marker: 0x20");

        let err = ProtocolError::UnsupportedVersion(2);
        assert!(err.to_string().contains('2'));
        assert_eq!(err.kind_name(), "UnsupportedVersion");
    }

    #[test]
    fn test_core_error_roundtrip_unwraps_protocol_error() {
        let original = ProtocolError::InvalidUtf8;
        let core: CoreError = original.into();
        assert!(matches!(core, CoreError::Codec(_)));

        let back: ProtocolError = core.into();
        assert!(matches!(back, ProtocolError::InvalidUtf8));
    }

    #[test]
    fn test_core_error_is_wrapped() {
        let err: ProtocolError = CoreError::NotExternalizable {
            class: "a.B".to_string(),
        }
        .into();
        assert!(matches!(err, ProtocolError::Core(CoreError::NotExternalizable { .. })));
        assert_eq!(err.to_string(), "class 'a.B' is not externalizable");
    }
}
