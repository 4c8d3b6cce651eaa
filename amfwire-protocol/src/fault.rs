//! Error response bodies.
//!
//! A failed call is answered with an `/onStatus` body whose content is an
//! anonymous object describing the error.

use crate::config::FaultsConfig;
use crate::error::ProtocolError;
use crate::message::{Body, ON_RESULT, ON_STATUS};
use amfwire_core::{AsObject, Value};
use std::error::Error;

/// Fault code of every error raised while processing a message.
pub const FAULT_CODE: &str = "Server.Processing";

/// Severity carried by fault objects.
pub const FAULT_LEVEL: &str = "error";

fn root_cause(err: &(dyn Error + 'static)) -> Value {
    let mut cause = AsObject::new();
    cause.insert("description", err.to_string());
    if let Some(source) = err.source() {
        cause.insert("rootcause", root_cause(source));
    }
    Value::object(cause)
}

/// Builds the content object of an error body.
pub fn fault_content(err: &ProtocolError, config: &FaultsConfig) -> Value {
    let mut content = AsObject::new();
    content.insert("code", FAULT_CODE);
    content.insert("level", FAULT_LEVEL);
    content.insert("description", err.to_string());
    if config.include_details {
        content.insert("details", format!("{:?}", err));
    }
    content.insert("type", err.kind_name());
    let source = match err {
        ProtocolError::Core(core) => core.source(),
        other => other.source(),
    };
    if let Some(source) = source {
        content.insert("rootcause", root_cause(source));
    }
    Value::object(content)
}

/// Error body answering `request`.
pub fn request_fault(request: &Body, err: &ProtocolError, config: &FaultsConfig) -> Body {
    Body::new(
        format!("{}{}", request.response, ON_STATUS),
        "null",
        fault_content(err, config),
    )
}

/// Error body replacing a response that could not be encoded.
pub fn response_fault(response: &Body, err: &ProtocolError, config: &FaultsConfig) -> Body {
    let target = if response.is_fault() {
        response.target.clone()
    } else {
        match response.target.strip_suffix(ON_RESULT) {
            Some(id) => format!("{}{}", id, ON_STATUS),
            None => format!("{}{}", response.target, ON_STATUS),
        }
    };
    Body::new(target, "null", fault_content(err, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use amfwire_core::CoreError;

    #[test]
    fn test_fault_content_fields() {
        let err = ProtocolError::DepthExceeded(4);
        let content = fault_content(&err, &FaultsConfig::default());
        assert_eq!(content.get("code"), Some(Value::string(FAULT_CODE)));
        assert_eq!(content.get("level"), Some(Value::string("error")));
        assert_eq!(content.get("type"), Some(Value::string("DepthExceeded")));
        assert_eq!(
            content.get("description"),
            Some(Value::string("nesting deeper than 4 levels"))
        );
        assert_eq!(content.get("details"), None);
        assert_eq!(content.get("rootcause"), None);
    }

    #[test]
    fn test_details_are_optional() {
        let config = FaultsConfig {
            include_details: true,
        };
        let content = fault_content(&ProtocolError::InvalidUtf8, &config);
        assert_eq!(content.get("details"), Some(Value::string("InvalidUtf8")));
    }

    #[test]
    fn test_root_cause_chain() {
        let inner = ProtocolError::InvalidUtf8;
        let err = ProtocolError::Core(CoreError::codec(std::io::Error::new(
            std::io::ErrorKind::Other,
            inner.to_string(),
        )));
        let content = fault_content(&err, &FaultsConfig::default());
        let cause = content.get("rootcause").unwrap();
        assert_eq!(
            cause.get("description"),
            Some(Value::string("invalid UTF-8 in string data"))
        );
    }

    #[test]
    fn test_request_fault_target() {
        let request = Body::new("Echo.ping", "/3", Value::Null);
        let fault = request_fault(&request, &ProtocolError::InvalidUtf8, &FaultsConfig::default());
        assert_eq!(fault.target, "/3/onStatus");
        assert_eq!(fault.response, "null");
        assert!(fault.is_fault());
    }

    #[test]
    fn test_response_fault_target() {
        let config = FaultsConfig::default();
        let err = ProtocolError::InvalidUtf8;
        let ok = Body::new("/1/onResult", "null", Value::Null);
        assert_eq!(response_fault(&ok, &err, &config).target, "/1/onStatus");

        let bare = Body::new("/2", "null", Value::Null);
        assert_eq!(response_fault(&bare, &err, &config).target, "/2/onStatus");

        let failed = Body::new("/4/onStatus", "null", Value::Null);
        assert_eq!(response_fault(&failed, &err, &config).target, "/4/onStatus");
    }
}
