//! AMF message envelope: version, headers and bodies.

use crate::error::ProtocolError;
use amfwire_core::Value;
use std::fmt;

/// Suffix of response targets carrying a successful result.
pub const ON_RESULT: &str = "/onResult";

/// Suffix of response targets carrying an error.
pub const ON_STATUS: &str = "/onStatus";

/// Suffix of response targets carrying debug events.
pub const ON_DEBUG_EVENTS: &str = "/onDebugEvents";

/// Well-known header names.
pub mod headers {
    pub const CREDENTIALS: &str = "Credentials";
    pub const DS_ID: &str = "DSId";
    pub const SERVER_DEBUG: &str = "amf_server_debug";
    pub const DESCRIBE_SERVICE: &str = "DescribeService";
    pub const CLEARED_CREDENTIALS: &str = "ClearedCredentials";
    pub const CREDENTIALS_ID: &str = "CredentialsId";
    pub const REQUEST_PERSISTENT_HEADER: &str = "RequestPersistentHeader";
    pub const APPEND_TO_GATEWAY_URL: &str = "AppendToGatewayUrl";
}

/// Object encoding generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u16)]
pub enum ObjectEncoding {
    #[default]
    Amf0 = 0,
    Amf3 = 3,
}

impl ObjectEncoding {
    /// Maps an envelope version to the encoding of its values.
    pub fn from_version(version: u16) -> Result<Self, ProtocolError> {
        match version {
            0 | 1 => Ok(ObjectEncoding::Amf0),
            3 => Ok(ObjectEncoding::Amf3),
            other => Err(ProtocolError::UnsupportedVersion(other)),
        }
    }

    pub fn version(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for ObjectEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectEncoding::Amf0 => f.write_str("AMF0"),
            ObjectEncoding::Amf3 => f.write_str("AMF3"),
        }
    }
}

/// Envelope header.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub name: String,
    pub must_understand: bool,
    pub content: Value,
}

impl Header {
    pub fn new(name: impl Into<String>, must_understand: bool, content: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            must_understand,
            content: content.into(),
        }
    }
}

/// Envelope body: one call or one response.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Service and method for requests, `<id>/onResult` or `<id>/onStatus`
    /// for responses.
    pub target: String,
    /// Response URI of requests; "null" on responses.
    pub response: String,
    pub content: Value,
    /// Set when the client expects no result.
    pub ignore_results: bool,
    pub is_authentication_action: bool,
    pub is_debug: bool,
    pub is_describe_service: bool,
}

impl Body {
    pub fn new(target: impl Into<String>, response: impl Into<String>, content: impl Into<Value>) -> Self {
        Self {
            target: target.into(),
            response: response.into(),
            content: content.into(),
            ignore_results: false,
            is_authentication_action: false,
            is_debug: false,
            is_describe_service: false,
        }
    }

    /// Creates the success response for `request`.
    pub fn result_for(request: &Body, content: impl Into<Value>) -> Self {
        Self::new(format!("{}{}", request.response, ON_RESULT), "null", content)
    }

    /// Returns whether the target names no service.
    pub fn is_empty_target(&self) -> bool {
        self.target.is_empty() || self.target == "null"
    }

    /// Service part of the target (text before the last '.').
    pub fn type_name(&self) -> &str {
        match self.target.rfind('.') {
            Some(dot) => &self.target[..dot],
            None => "",
        }
    }

    /// Method part of the target (text after the last '.').
    pub fn method(&self) -> &str {
        match self.target.rfind('.') {
            Some(dot) => &self.target[dot + 1..],
            None => &self.target,
        }
    }

    /// `Service.method`, or the bare method when no service is named.
    pub fn call(&self) -> String {
        match self.type_name() {
            "" => self.method().to_string(),
            type_name => format!("{}.{}", type_name, self.method()),
        }
    }

    /// Call arguments: the items of an array content, or the content itself.
    pub fn parameters(&self) -> Vec<Value> {
        match &self.content {
            Value::Array(items) => items.read().clone(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        }
    }

    /// Returns whether this body is an error response.
    pub fn is_fault(&self) -> bool {
        self.target.ends_with(ON_STATUS)
    }
}

/// A complete AMF message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub version: u16,
    pub headers: Vec<Header>,
    pub bodies: Vec<Body>,
}

impl Message {
    pub fn new(encoding: ObjectEncoding) -> Self {
        Self {
            version: encoding.version(),
            ..Self::default()
        }
    }

    pub fn object_encoding(&self) -> Result<ObjectEncoding, ProtocolError> {
        ObjectEncoding::from_version(self.version)
    }

    pub fn add_header(&mut self, header: Header) {
        self.headers.push(header);
    }

    pub fn add_body(&mut self, body: Body) {
        self.bodies.push(body);
    }

    pub fn header(&self, name: &str) -> Option<&Header> {
        self.headers.iter().find(|h| h.name == name)
    }

    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}
