//! The token engine: configuration, keyring and codec bound together.
//!
//! Token creation lives here; verification and unverified decoding are in
//! [`verify`](crate::verify).

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::codec::{Codec, CodecRegistry};
use crate::config::{Options, Settings};
use crate::error::HwtError;
use crate::keys::{KeyManager, KeyringSpec};
use crate::primitives::b64url_encode;
use crate::sign::signing_input;
use crate::types::{FIELD_SEPARATOR, TOKEN_PREFIX};
use crate::value::Value;

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// Issues and verifies tokens.
///
/// All state is fixed at construction. Methods take `&self` and allocate
/// their own buffers, so one engine can serve concurrent callers without
/// locking.
#[derive(Clone)]
pub struct Hwt {
    pub(crate) settings: Settings,
    pub(crate) keys: KeyManager,
    pub(crate) registry: Arc<CodecRegistry>,
    pub(crate) codec: Arc<dyn Codec>,
}

impl Hwt {
    /// Engine using the built-in codecs.
    pub fn new(options: &Options, keyring: &KeyringSpec) -> Result<Self, HwtError> {
        Self::with_registry(options, keyring, Arc::new(CodecRegistry::new()))
    }

    /// Engine resolving formats through `registry`. Register third-party
    /// codecs before wrapping the registry in the `Arc`.
    pub fn with_registry(
        options: &Options,
        keyring: &KeyringSpec,
        registry: Arc<CodecRegistry>,
    ) -> Result<Self, HwtError> {
        let settings = Settings::from(options);
        let codec = registry
            .lookup(&settings.format)
            .ok_or_else(|| HwtError::UnknownEncoding(settings.format.clone()))?;
        let keys = KeyManager::import_keys(keyring, settings.hash)?;
        tracing::debug!(
            hash = settings.hash.name(),
            format = %settings.format,
            current = keys.current_id(),
            "engine ready"
        );
        Ok(Hwt {
            settings,
            keys,
            registry,
            codec,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    pub fn keys(&self) -> &KeyManager {
        &self.keys
    }

    /// Id of the key signing new tokens.
    pub fn current_key_id(&self) -> &str {
        self.keys.current_id()
    }

    pub fn key_ids(&self) -> Vec<&str> {
        self.keys.ids()
    }

    /// Create a token with the configured default lifetime.
    pub fn create(&self, visible: &Value, hidden: Option<&Value>) -> Result<String, HwtError> {
        self.issue(unix_now(), self.settings.expires_in_seconds, visible, hidden)
    }

    /// Create a token living `ttl_seconds` (at most one year; non-positive
    /// values mean the configured default).
    pub fn create_with(
        &self,
        ttl_seconds: i64,
        visible: &Value,
        hidden: Option<&Value>,
    ) -> Result<String, HwtError> {
        self.issue(unix_now(), self.settings.ttl(ttl_seconds), visible, hidden)
    }

    /// [`create_with`](Self::create_with) against an explicit clock.
    pub fn create_at(
        &self,
        now: u64,
        ttl_seconds: i64,
        visible: &Value,
        hidden: Option<&Value>,
    ) -> Result<String, HwtError> {
        self.issue(now, self.settings.ttl(ttl_seconds), visible, hidden)
    }

    fn issue(
        &self,
        now: u64,
        ttl: u64,
        visible: &Value,
        hidden: Option<&Value>,
    ) -> Result<String, HwtError> {
        let exp = now.saturating_add(ttl);
        let format = self.settings.format.as_str();

        let encoded = encode_b64(&*self.codec, format, visible).and_then(|payload| {
            let hidden = hidden
                .map(|h| encode_b64(&*self.codec, format, h))
                .transpose()?;
            Ok((payload, hidden))
        });
        let (payload, hidden) = match encoded {
            Ok(parts) => parts,
            Err(err) if self.settings.error_on_generate => return Err(err),
            Err(err) => {
                tracing::warn!(error = %err, "token creation failed");
                return Ok(String::new());
            }
        };

        let key = self.keys.current()?;
        let exp_text = exp.to_string();
        let input = signing_input(&exp_text, format, &payload, hidden.as_deref());
        let signature = key.handle().signature(&input, self.settings.signature_size);

        let sep = FIELD_SEPARATOR.to_string();
        let mut token = [
            TOKEN_PREFIX,
            signature.as_str(),
            key.id(),
            exp_text.as_str(),
            format,
            payload.as_str(),
        ]
        .join(&sep);

        let max = self.settings.max_token_size_bytes;
        if token.len() > max {
            if self.settings.error_on_generate {
                return Err(HwtError::TokenTooLarge {
                    size: token.len(),
                    max,
                });
            }
            // The cut token no longer verifies.
            tracing::warn!(size = token.len(), max, "token exceeds maximum size, truncating");
            let cut = (0..=max)
                .rev()
                .find(|i| token.is_char_boundary(*i))
                .unwrap_or(0);
            token.truncate(cut);
        }
        Ok(token)
    }
}

impl std::fmt::Debug for Hwt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hwt")
            .field("settings", &self.settings)
            .field("keys", &self.keys.ids())
            .field("current", &self.keys.current_id())
            .field("registry", &self.registry)
            .finish()
    }
}

/// Encode `value` with `codec` and base64url the bytes.
pub(crate) fn encode_b64(codec: &dyn Codec, format: &str, value: &Value) -> Result<String, HwtError> {
    codec
        .encode(value)
        .map(|bytes| b64url_encode(&bytes))
        .map_err(|e| HwtError::EncodingFailed {
            format: format.to_owned(),
            reason: e.0,
        })
}
