//! Encoder and decoder for AMF messages.
//!
//! Envelope layout (all numbers big-endian):
//!
//! ```text
//! u16 version
//! u16 header count, then per header: UTF name, u8 must-understand, i32 length, value
//! u16 body count,   then per body:   UTF target, UTF response, i32 length, value
//! ```
//!
//! Reference tables are cleared before every header and body.

use crate::config::FaultsConfig;
use crate::context::CodecContext;
use crate::error::ProtocolError;
use crate::fault::{request_fault, response_fault};
use crate::message::{Body, Header, Message, ObjectEncoding};
use crate::reader::AmfReader;
use crate::writer::AmfWriter;
use amfwire_core::Value;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error};

/// Length written for headers and bodies; readers must not rely on it.
const UNKNOWN_LENGTH: i32 = -1;

/// A body that failed to decode.
#[derive(Debug)]
pub struct DecodeFailure {
    /// Position of the body in the message.
    pub index: usize,
    pub target: String,
    pub response: String,
    pub error: ProtocolError,
}

/// Decodes messages.
#[derive(Debug)]
pub struct Decoder {
    context: Arc<CodecContext>,
    failed_bodies: Vec<DecodeFailure>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self::with_context(CodecContext::global())
    }

    pub fn with_context(context: Arc<CodecContext>) -> Self {
        Self {
            context,
            failed_bodies: Vec::new(),
        }
    }

    /// Bodies that failed during the last [`decode`](Self::decode).
    pub fn failed_bodies(&self) -> &[DecodeFailure] {
        &self.failed_bodies
    }

    pub fn take_failed_bodies(&mut self) -> Vec<DecodeFailure> {
        std::mem::take(&mut self.failed_bodies)
    }

    /// Decodes a complete message.
    ///
    /// Header failures abort the message. With fault tolerance enabled, a
    /// body that fails is replaced by an error body and recorded in
    /// [`failed_bodies`](Self::failed_bodies); decoding continues after it
    /// when the body declared its length.
    pub fn decode(&mut self, data: impl Into<Bytes>) -> Result<Message, ProtocolError> {
        self.failed_bodies.clear();
        let settings = self.context.settings();
        let mut reader = AmfReader::with_context(data, self.context.clone());

        let version = reader.read_u16()?;
        ObjectEncoding::from_version(version)?;
        let mut message = Message {
            version,
            ..Message::default()
        };

        let header_count = reader.read_u16()?;
        for _ in 0..header_count {
            reader.reset();
            let name = reader.read_utf()?;
            let must_understand = reader.read_u8()? != 0;
            let _length = reader.read_i32()?;
            let content = reader.read_amf0_value()?;
            message.add_header(Header::new(name, must_understand, content));
        }

        let fault_tolerant = settings.deserialization.fault_tolerant;
        reader.set_fault_tolerant(fault_tolerant);

        let body_count = reader.read_u16()?;
        for index in 0..body_count as usize {
            reader.reset();
            let target = reader.read_utf()?;
            let response = reader.read_utf()?;
            let length = reader.read_i32()?;
            let start = reader.position();

            match reader.read_amf0_value() {
                Ok(content) => match reader.take_last_error() {
                    None => message.add_body(Body::new(target, response, content)),
                    Some(err) => {
                        error!("body {} ({}) decoded with errors: {}", index, target, err);
                        self.fail_body(&mut message, index, target, response, err, &settings.faults);
                    }
                },
                Err(err) if fault_tolerant => {
                    error!("failed to decode body {} ({}): {}", index, target, err);
                    self.fail_body(&mut message, index, target, response, err, &settings.faults);
                    if length < 0 || reader.seek(start + length as usize).is_err() {
                        break;
                    }
                }
                Err(err) => return Err(err),
            }
        }

        debug!(
            "decoded message v{} ({} headers, {} bodies, {} failed)",
            version,
            message.header_count(),
            message.body_count(),
            self.failed_bodies.len()
        );
        Ok(message)
    }

    fn fail_body(
        &mut self,
        message: &mut Message,
        index: usize,
        target: String,
        response: String,
        error: ProtocolError,
        faults: &FaultsConfig,
    ) {
        let request = Body::new(target, response, Value::Null);
        message.add_body(request_fault(&request, &error, faults));
        self.failed_bodies.push(DecodeFailure {
            index,
            target: request.target,
            response: request.response,
            error,
        });
    }

    /// Decodes a single value. AMF0 input may switch to AMF3 through the
    /// AVM+ marker.
    pub fn decode_value(
        &self,
        encoding: ObjectEncoding,
        data: impl Into<Bytes>,
    ) -> Result<Value, ProtocolError> {
        let mut reader = AmfReader::with_context(data, self.context.clone());
        reader.read_value(encoding)
    }
}

/// Encodes messages.
#[derive(Debug)]
pub struct Encoder {
    context: Arc<CodecContext>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Self::with_context(CodecContext::global())
    }

    pub fn with_context(context: Arc<CodecContext>) -> Self {
        Self { context }
    }

    /// Encodes a complete message.
    ///
    /// With body fault isolation enabled, a body that fails to encode is
    /// rewound and replaced by an error body; otherwise the error aborts
    /// the message.
    pub fn encode(&self, message: &Message) -> Result<Bytes, ProtocolError> {
        let encoding = message.object_encoding()?;
        let settings = self.context.settings();
        let mut writer = AmfWriter::with_context(self.context.clone());

        writer.write_u16(message.version);
        writer.write_u16(count("headers", message.headers.len())?);
        for header in &message.headers {
            writer.reset();
            writer.write_utf(&header.name)?;
            writer.write_u8(header.must_understand as u8);
            writer.write_i32(UNKNOWN_LENGTH);
            writer.write_value(encoding, &header.content)?;
        }

        writer.write_u16(count("bodies", message.bodies.len())?);
        for (index, body) in message.bodies.iter().enumerate() {
            let start = writer.len();
            match Self::write_body(&mut writer, encoding, body) {
                Ok(()) => {}
                Err(err) if settings.serialization.isolate_body_faults => {
                    error!("failed to encode body {} ({}): {}", index, body.target, err);
                    writer.truncate(start);
                    let fault = response_fault(body, &err, &settings.faults);
                    Self::write_body(&mut writer, encoding, &fault)?;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(writer.into_bytes())
    }

    fn write_body(writer: &mut AmfWriter, encoding: ObjectEncoding, body: &Body) -> Result<(), ProtocolError> {
        writer.reset();
        writer.write_utf(&body.target)?;
        writer.write_utf(&body.response)?;
        writer.write_i32(UNKNOWN_LENGTH);
        writer.write_value(encoding, &body.content)
    }

    /// Encodes a single value.
    pub fn encode_value(&self, encoding: ObjectEncoding, value: &Value) -> Result<Bytes, ProtocolError> {
        let mut writer = AmfWriter::with_context(self.context.clone());
        match encoding {
            ObjectEncoding::Amf0 => writer.write_amf0_value(value)?,
            ObjectEncoding::Amf3 => writer.write_amf3_value(value)?,
        }
        Ok(writer.into_bytes())
    }
}

fn count(what: &'static str, len: usize) -> Result<u16, ProtocolError> {
    u16::try_from(len).map_err(|_| ProtocolError::CountOverflow {
        what,
        count: len,
        max: u16::MAX as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecConfig;
    use crate::message::headers;
    use amfwire_core::{ArrayCollection, AsObject};
    use proptest::prelude::*;

    fn context(config: CodecConfig) -> Arc<CodecContext> {
        Arc::new(CodecContext::new(config))
    }

    #[test]
    fn test_message_round_trip() {
        let mut message = Message::new(ObjectEncoding::Amf3);
        message.add_header(Header::new(headers::DS_ID, false, "nil"));
        let mut args = AsObject::new();
        args.insert("q", "rust");
        message.add_body(Body::new(
            "Search.find",
            "/1",
            Value::array(vec![Value::object(args), Value::Integer(10)]),
        ));

        let bytes = Encoder::new().encode(&message).unwrap();
        assert_eq!(&bytes[..4], &[0x00, 0x03, 0x00, 0x01]);

        let decoded = Decoder::new().decode(bytes).unwrap();
        assert_eq!(decoded.version, 3);
        assert_eq!(
            decoded.header(headers::DS_ID).unwrap().content,
            Value::string("nil")
        );
        let body = &decoded.bodies[0];
        assert_eq!(body.call(), "Search.find");
        assert_eq!(body.response, "/1");
        let params = body.parameters();
        assert_eq!(params[0].get("q"), Some(Value::string("rust")));
        assert_eq!(params[1], Value::Integer(10));
    }

    #[test]
    fn test_unsupported_version() {
        let err = Decoder::new().decode(vec![0x00, 0x02, 0x00, 0x00]).unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedVersion(2)));

        let mut message = Message::new(ObjectEncoding::Amf0);
        message.version = 7;
        assert!(Encoder::new().encode(&message).is_err());
    }

    #[test]
    fn test_encoder_isolates_failed_body() {
        let mut message = Message::new(ObjectEncoding::Amf0);
        message.add_body(Body::new("/1/onResult", "null", "first"));
        message.add_body(Body::new(
            "/2/onResult",
            "null",
            Value::typed(ArrayCollection::new(Vec::new())),
        ));
        message.add_body(Body::new("/3/onResult", "null", "third"));

        let bytes = Encoder::new().encode(&message).unwrap();
        let decoded = Decoder::new().decode(bytes).unwrap();
        assert_eq!(decoded.body_count(), 3);
        assert_eq!(decoded.bodies[0], message.bodies[0]);
        assert_eq!(decoded.bodies[2], message.bodies[2]);

        let fault = &decoded.bodies[1];
        assert_eq!(fault.target, "/2/onStatus");
        assert!(fault.is_fault());
        assert_eq!(
            fault.content.get("type"),
            Some(Value::string("ExternalizableInAmf0"))
        );
        assert_eq!(
            fault.content.get("code"),
            Some(Value::string("Server.Processing"))
        );
    }

    #[test]
    fn test_encoder_propagates_without_isolation() {
        let mut config = CodecConfig::default();
        config.serialization.isolate_body_faults = false;
        let mut message = Message::new(ObjectEncoding::Amf0);
        message.add_body(Body::new(
            "/1/onResult",
            "null",
            Value::typed(ArrayCollection::new(Vec::new())),
        ));
        let err = Encoder::with_context(context(config)).encode(&message).unwrap_err();
        assert!(matches!(err, ProtocolError::ExternalizableInAmf0 { .. }));
    }

    fn two_body_message(first_length: i32) -> Vec<u8> {
        let mut bytes = vec![0x00, 0x03, 0x00, 0x00, 0x00, 0x02];
        bytes.extend_from_slice(&[0x00, 0x03, b'A', b'.', b'b', 0x00, 0x02, b'/', b'1']);
        bytes.extend_from_slice(&first_length.to_be_bytes());
        bytes.extend_from_slice(&[0x20, 0x00, 0x00]);
        bytes.extend_from_slice(&[0x00, 0x03, b'A', b'.', b'c', 0x00, 0x02, b'/', b'2']);
        bytes.extend_from_slice(&(-1i32).to_be_bytes());
        bytes.extend_from_slice(&[0x02, 0x00, 0x02, b'o', b'k']);
        bytes
    }

    #[test]
    fn test_decoder_resyncs_after_failed_body() {
        let mut decoder = Decoder::new();
        let message = decoder.decode(two_body_message(3)).unwrap();
        assert_eq!(message.body_count(), 2);
        assert_eq!(message.bodies[0].target, "/1/onStatus");
        assert_eq!(
            message.bodies[0].content.get("type"),
            Some(Value::string("UnknownMarker"))
        );
        assert_eq!(message.bodies[1].target, "A.c");
        assert_eq!(message.bodies[1].content, Value::string("ok"));

        let failed = decoder.take_failed_bodies();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].index, 0);
        assert_eq!(failed[0].target, "A.b");
        assert!(decoder.failed_bodies().is_empty());
    }

    #[test]
    fn test_decoder_stops_without_body_length() {
        let mut decoder = Decoder::new();
        let message = decoder.decode(two_body_message(-1)).unwrap();
        assert_eq!(message.body_count(), 1);
        assert!(message.bodies[0].is_fault());
        assert_eq!(decoder.failed_bodies().len(), 1);
    }

    #[test]
    fn test_decoder_keeps_bodies_when_length_overruns() {
        let mut bytes = vec![0x00, 0x03, 0x00, 0x00, 0x00, 0x02];
        bytes.extend_from_slice(&[0x00, 0x03, b'A', b'.', b'c', 0x00, 0x02, b'/', b'2']);
        bytes.extend_from_slice(&(-1i32).to_be_bytes());
        bytes.extend_from_slice(&[0x02, 0x00, 0x02, b'o', b'k']);
        bytes.extend_from_slice(&[0x00, 0x03, b'A', b'.', b'b', 0x00, 0x02, b'/', b'1']);
        bytes.extend_from_slice(&1000i32.to_be_bytes());
        bytes.push(0x20);

        let mut decoder = Decoder::new();
        let message = decoder.decode(bytes).unwrap();
        assert_eq!(message.body_count(), 2);
        assert_eq!(message.bodies[0].content, Value::string("ok"));
        assert_eq!(message.bodies[1].target, "/1/onStatus");
        assert_eq!(decoder.failed_bodies().len(), 1);
    }

    #[test]
    fn test_decoder_strict_mode_propagates() {
        let mut config = CodecConfig::default();
        config.deserialization.fault_tolerant = false;
        let err = Decoder::with_context(context(config))
            .decode(two_body_message(3))
            .unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownMarker { marker: 0x20, .. }));
    }

    #[test]
    fn test_header_failure_aborts() {
        let bytes = vec![0x00, 0x00, 0x00, 0x01, 0x00, 0x01, b'h', 0x00, 0xff, 0xff, 0xff, 0xff, 0x20];
        assert!(Decoder::new().decode(bytes).is_err());
    }

    #[test]
    fn test_single_value_helpers() {
        let encoder = Encoder::new();
        let bytes = encoder
            .encode_value(ObjectEncoding::Amf3, &Value::string("hi"))
            .unwrap();
        assert_eq!(&bytes[..], &[0x06, 0x05, b'h', b'i']);
        let value = Decoder::new().decode_value(ObjectEncoding::Amf3, bytes).unwrap();
        assert_eq!(value, Value::string("hi"));
    }

    proptest! {
        #[test]
        fn prop_amf3_scalar_roundtrip(i in -268435456i32..=268435455, d in -1e300f64..1e300, s in "\\PC*") {
            let encoder = Encoder::new();
            let decoder = Decoder::new();
            for value in [Value::Integer(i), Value::Number(d), Value::string(s.as_str()), Value::Boolean(i % 2 == 0)] {
                let bytes = encoder.encode_value(ObjectEncoding::Amf3, &value).unwrap();
                prop_assert_eq!(decoder.decode_value(ObjectEncoding::Amf3, bytes).unwrap(), value);
            }
        }
    }
}
