//! Engine configuration.
//!
//! [`Options`] is what callers write (or load from JSON); every field has a
//! default. [`Settings`] is the clamped form the engine holds for its whole
//! lifetime.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::HwtError;
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    pub hash: HashAlgorithm,
    /// Codec used for new tokens and for tokens with an empty format field.
    pub format: String,
    /// Signature length in base64url characters; 0 keeps the full MAC.
    #[serde(deserialize_with = "clamped_usize")]
    pub signature_size: usize,
    #[serde(deserialize_with = "clamped_u64")]
    pub expires_in_seconds: u64,
    #[serde(deserialize_with = "clamped_u64")]
    pub leeway_seconds: u64,
    /// Shorthand for the three verification flags below.
    pub errors: bool,
    pub error_on_invalid: bool,
    pub error_on_expired: bool,
    pub error_on_encoding: bool,
    pub error_on_generate: bool,
    #[serde(deserialize_with = "clamped_usize")]
    pub max_token_size_bytes: usize,
}

/// Any JSON number: negatives read as 0, fractions are truncated and
/// oversized values saturate. [`Settings`] then applies the real bounds.
fn clamped_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let n = f64::deserialize(deserializer)?;
    if n.is_nan() || n <= 0.0 {
        return Ok(0);
    }
    Ok(n as u64)
}

fn clamped_usize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    clamped_u64(deserializer).map(|n| usize::try_from(n).unwrap_or(usize::MAX))
}

impl Default for Options {
    fn default() -> Self {
        Options {
            hash: HashAlgorithm::Sha256,
            format: DEFAULT_FORMAT.to_owned(),
            signature_size: 0,
            expires_in_seconds: DEFAULT_EXPIRES_IN_SECONDS,
            leeway_seconds: DEFAULT_LEEWAY_SECONDS,
            errors: false,
            error_on_invalid: false,
            error_on_expired: false,
            error_on_encoding: false,
            error_on_generate: false,
            max_token_size_bytes: DEFAULT_MAX_TOKEN_SIZE,
        }
    }
}

impl Options {
    /// Options with every strict flag set.
    pub fn strict() -> Self {
        Options {
            errors: true,
            error_on_generate: true,
            ..Default::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self, HwtError> {
        serde_json::from_str(text).map_err(|e| HwtError::Config(e.to_string()))
    }
}

/// Resolved engine settings. Every numeric field is within its bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub hash: HashAlgorithm,
    pub format: String,
    /// Emitted signature length in characters, already resolved against
    /// the hash's bounds.
    pub signature_size: usize,
    pub expires_in_seconds: u64,
    pub leeway_seconds: u64,
    pub error_on_invalid: bool,
    pub error_on_expired: bool,
    pub error_on_encoding: bool,
    pub error_on_generate: bool,
    pub max_token_size_bytes: usize,
}

impl From<&Options> for Settings {
    fn from(o: &Options) -> Self {
        let full = o.hash.full_signature_chars();
        let signature_size = match o.signature_size {
            0 => full,
            n => n.clamp(o.hash.min_signature_chars(), full),
        };
        Settings {
            hash: o.hash,
            format: o.format.clone(),
            signature_size,
            expires_in_seconds: match o.expires_in_seconds {
                0 => DEFAULT_EXPIRES_IN_SECONDS,
                n => n.min(MAX_EXPIRES_IN_SECONDS),
            },
            leeway_seconds: o.leeway_seconds.min(MAX_LEEWAY_SECONDS),
            error_on_invalid: o.errors || o.error_on_invalid,
            error_on_expired: o.errors || o.error_on_expired,
            error_on_encoding: o.errors || o.error_on_encoding,
            error_on_generate: o.error_on_generate,
            max_token_size_bytes: o
                .max_token_size_bytes
                .clamp(MIN_MAX_TOKEN_SIZE, MAX_MAX_TOKEN_SIZE),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::from(&Options::default())
    }
}

impl Settings {
    /// Lifetime for a token requested with `ttl_seconds`. Non-positive input
    /// is invalid and falls back to the configured default; larger input is
    /// capped at one year.
    pub fn ttl(&self, ttl_seconds: i64) -> u64 {
        match u64::try_from(ttl_seconds) {
            Ok(0) | Err(_) => self.expires_in_seconds,
            Ok(ttl) => ttl.min(MAX_EXPIRES_IN_SECONDS),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.hash, HashAlgorithm::Sha256);
        assert_eq!(s.format, "j");
        assert_eq!(s.signature_size, 43);
        assert_eq!(s.expires_in_seconds, 60);
        assert_eq!(s.leeway_seconds, 1);
        assert_eq!(s.max_token_size_bytes, 2048);
        assert!(!s.error_on_invalid && !s.error_on_expired && !s.error_on_encoding);
        assert!(!s.error_on_generate);
    }

    #[test]
    fn test_clamping() {
        let o = Options {
            hash: HashAlgorithm::Sha512,
            signature_size: 5,
            expires_in_seconds: u64::MAX,
            leeway_seconds: 100,
            max_token_size_bytes: 10,
            ..Default::default()
        };
        let s = Settings::from(&o);
        assert_eq!(s.signature_size, 43);
        assert_eq!(s.expires_in_seconds, MAX_EXPIRES_IN_SECONDS);
        assert_eq!(s.leeway_seconds, 30);
        assert_eq!(s.max_token_size_bytes, 512);

        let s = Settings::from(&Options {
            signature_size: 1000,
            max_token_size_bytes: 1 << 20,
            ..Default::default()
        });
        assert_eq!(s.signature_size, 43);
        assert_eq!(s.max_token_size_bytes, 5120);

        let s = Settings::from(&Options {
            expires_in_seconds: 0,
            ..Default::default()
        });
        assert_eq!(s.expires_in_seconds, DEFAULT_EXPIRES_IN_SECONDS);
    }

    #[test]
    fn test_errors_shorthand() {
        let s = Settings::from(&Options {
            errors: true,
            ..Default::default()
        });
        assert!(s.error_on_invalid && s.error_on_expired && s.error_on_encoding);
        assert!(!s.error_on_generate);
    }

    #[test]
    fn test_ttl() {
        let s = Settings::default();
        assert_eq!(s.ttl(10), 10);
        assert_eq!(s.ttl(0), 60);
        assert_eq!(s.ttl(-5), 60);
        assert_eq!(s.ttl(i64::MAX), MAX_EXPIRES_IN_SECONDS);
    }

    #[test]
    fn test_from_json() {
        let o = Options::from_json(
            r#"{"hash":"SHA-384","format":"jx","signatureSize":40,"leewaySeconds":5,"errors":true}"#,
        )
        .unwrap();
        assert_eq!(o.hash, HashAlgorithm::Sha384);
        assert_eq!(o.format, "jx");
        assert_eq!(o.expires_in_seconds, 60);
        let s = Settings::from(&o);
        assert_eq!(s.signature_size, 40);
        assert_eq!(s.leeway_seconds, 5);
        assert!(s.error_on_expired);

        assert!(matches!(
            Options::from_json(r#"{"hash":"MD5"}"#),
            Err(HwtError::Config(_))
        ));
        assert!(matches!(
            Options::from_json(r#"{"leewaySeconds":"5"}"#),
            Err(HwtError::Config(_))
        ));
    }

    #[test]
    fn test_from_json_out_of_range_numbers_clamp() {
        let o = Options::from_json(
            r#"{"leewaySeconds":-5,"expiresInSeconds":-1,"maxTokenSizeBytes":-1,"signatureSize":-3}"#,
        )
        .unwrap();
        assert_eq!(o.leeway_seconds, 0);
        assert_eq!(o.expires_in_seconds, 0);
        assert_eq!(o.max_token_size_bytes, 0);
        let s = Settings::from(&o);
        assert_eq!(s.leeway_seconds, 0);
        assert_eq!(s.expires_in_seconds, DEFAULT_EXPIRES_IN_SECONDS);
        assert_eq!(s.max_token_size_bytes, MIN_MAX_TOKEN_SIZE);
        assert_eq!(s.signature_size, 43);

        let o = Options::from_json(
            r#"{"leewaySeconds":2.9,"expiresInSeconds":1e12,"signatureSize":30.5,"maxTokenSizeBytes":1e30}"#,
        )
        .unwrap();
        let s = Settings::from(&o);
        assert_eq!(s.leeway_seconds, 2);
        assert_eq!(s.expires_in_seconds, MAX_EXPIRES_IN_SECONDS);
        assert_eq!(s.signature_size, 30);
        assert_eq!(s.max_token_size_bytes, MAX_MAX_TOKEN_SIZE);
    }
}
