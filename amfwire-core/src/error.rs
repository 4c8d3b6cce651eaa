//! Core error types.

use thiserror::Error;

/// Errors raised by the object model: member access, conversions and
/// externalizable hooks.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("member not found: {class}.{member}")]
    MemberNotFound { class: String, member: String },

    #[error("invalid value for {class}.{member}: {reason}")]
    InvalidMemberValue {
        class: String,
        member: String,
        reason: String,
    },

    #[error("unexpected value: expected {expected}, found {found}")]
    UnexpectedValue {
        expected: &'static str,
        found: &'static str,
    },

    #[error("class '{class}' is not externalizable")]
    NotExternalizable { class: String },

    #[error("invalid JSON value: {0}")]
    InvalidJson(String),

    #[error("codec error: {0}")]
    Codec(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CoreError {
    /// Wraps an arbitrary error raised while an externalizable type was
    /// reading or writing its own payload.
    pub fn codec(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        CoreError::Codec(Box::new(err))
    }

    /// Returns whether this error only reports a member the target type
    /// does not declare.
    pub fn is_member_not_found(&self) -> bool {
        matches!(self, CoreError::MemberNotFound { .. })
    }
}
