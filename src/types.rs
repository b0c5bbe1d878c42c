use serde::{Deserialize, Serialize};

/// HMAC hash function used for token signatures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[default]
    #[serde(rename = "SHA-256", alias = "sha256", alias = "SHA256")]
    Sha256,
    #[serde(rename = "SHA-384", alias = "sha384", alias = "SHA384")]
    Sha384,
    #[serde(rename = "SHA-512", alias = "sha512", alias = "SHA512")]
    Sha512,
}

impl HashAlgorithm {
    pub fn from_name(name: &str) -> Option<HashAlgorithm> {
        match name {
            "SHA-256" | "SHA256" | "sha256" => Some(HashAlgorithm::Sha256),
            "SHA-384" | "SHA384" | "sha384" => Some(HashAlgorithm::Sha384),
            "SHA-512" | "SHA512" | "sha512" => Some(HashAlgorithm::Sha512),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha384 => "SHA-384",
            HashAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Returns the MAC length in bytes.
    pub fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Length of the untruncated base64url signature.
    pub fn full_signature_chars(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 43,
            HashAlgorithm::Sha384 => 64,
            HashAlgorithm::Sha512 => 86,
        }
    }

    /// Shortest truncation still considered collision-safe.
    pub fn min_signature_chars(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 22,
            HashAlgorithm::Sha384 => 32,
            HashAlgorithm::Sha512 => 43,
        }
    }
}

/// Literal first field of every token.
pub const TOKEN_PREFIX: &str = "hwt";

/// Separator between token fields and between signing-input elements.
pub const FIELD_SEPARATOR: char = '.';

/// Number of `.`-separated fields in a token.
pub const TOKEN_FIELDS: usize = 6;

/// Built-in JSON codec name.
pub const DEFAULT_FORMAT: &str = "j";

/// Built-in extended JSON codec name.
pub const EXTENDED_FORMAT: &str = "jx";

/// Minimum secret length accepted by the key manager.
pub const MIN_SECRET_LEN: usize = 32;

/// Default token lifetime.
pub const DEFAULT_EXPIRES_IN_SECONDS: u64 = 60;

/// Longest accepted token lifetime (one Julian year).
pub const MAX_EXPIRES_IN_SECONDS: u64 = 31_557_600;

/// Default grace period after expiry.
pub const DEFAULT_LEEWAY_SECONDS: u64 = 1;

/// Longest accepted grace period after expiry.
pub const MAX_LEEWAY_SECONDS: u64 = 30;

/// Default maximum token size.
pub const DEFAULT_MAX_TOKEN_SIZE: usize = 2048;

/// Smallest configurable maximum token size.
pub const MIN_MAX_TOKEN_SIZE: usize = 512;

/// Largest configurable maximum token size.
pub const MAX_MAX_TOKEN_SIZE: usize = 5120;
