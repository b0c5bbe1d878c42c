use thiserror::Error;

/// Errors raised by key management, codec registration and the token engine.
///
/// The `Display` text of the verification variants is exactly what
/// [`VerifyResult::error`](crate::verify::VerifyResult) carries in non-strict
/// mode, so callers can match on either form.
#[derive(Debug, Error)]
pub enum HwtError {
    #[error("invalid key id {0:?}: must be non-empty and contain no '.'")]
    InvalidKeyId(String),

    #[error("weak secret for key {id:?}: expected at least {expected} bytes, got {actual}")]
    WeakSecret {
        id: String,
        expected: usize,
        actual: usize,
    },

    #[error("no valid keys: {0}")]
    NoValidKeys(String),

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("format {0:?} is already registered")]
    DuplicateFormat(String),

    #[error("invalid codec for format {0:?}: both encode and decode are required")]
    InvalidCodec(String),

    #[error("invalid format name {0:?}")]
    InvalidName(String),

    #[error("hwt unknown encoding \"{0}\"")]
    UnknownEncoding(String),

    #[error("hwt invalid")]
    TokenStructurallyInvalid(String),

    #[error("hwt expired")]
    TokenExpired { expires: u64, now: u64 },

    #[error("hwt unknown key")]
    UnknownKey(String),

    #[error("hwt invalid signature")]
    SignatureMismatch,

    #[error("hwt data decoding failed")]
    PayloadDecodeFailed { format: String, reason: String },

    #[error("hwt token too large: {size} bytes (max {max})")]
    TokenTooLarge { size: usize, max: usize },

    #[error("hwt encode failed [{format}]: {reason}")]
    EncodingFailed { format: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Failure reported by a [`Codec`](crate::codec::Codec) implementation.
///
/// The engine wraps it into [`HwtError::EncodingFailed`] or
/// [`HwtError::PayloadDecodeFailed`] together with the format name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CodecError(pub String);

impl CodecError {
    pub fn new(msg: impl Into<String>) -> Self {
        CodecError(msg.into())
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        CodecError(e.to_string())
    }
}
