//! Key management: importing secrets into signing handles and tracking the
//! keyring used for rotation.
//!
//! Keyring JSON shape (as read by the CLI):
//!
//! ```json
//! { "current": "k2",
//!   "keys": [ { "id": "k1", "secret": "...32+ bytes...", "created": "2024-01-01T00:00:00Z" },
//!             { "id": "k2", "secret": [1, 2, 3, ...] } ] }
//! ```
//!
//! A string secret contributes its UTF-8 bytes; an array contributes raw
//! bytes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::HwtError;
use crate::primitives::{b64url_encode, SecretBuffer};
use crate::sign::SigningHandle;
use crate::types::{HashAlgorithm, FIELD_SEPARATOR, MIN_SECRET_LEN};

/// Secret material as supplied by configuration. Zeroed when dropped.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(untagged)]
pub enum Secret {
    Text(String),
    Bytes(Vec<u8>),
}

impl Secret {
    fn to_buffer(&self) -> SecretBuffer {
        match self {
            Secret::Text(s) => SecretBuffer::new(s.as_bytes().to_vec()),
            Secret::Bytes(b) => SecretBuffer::new(b.clone()),
        }
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

/// One entry of a keyring specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpec {
    pub id: String,
    pub secret: Secret,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

/// Keys to import plus the id that should sign new tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyringSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    #[serde(default)]
    pub keys: Vec<KeySpec>,
}

impl KeyringSpec {
    pub fn from_json(text: &str) -> Result<Self, HwtError> {
        serde_json::from_str(text).map_err(|e| HwtError::Config(e.to_string()))
    }
}

/// An imported key: id, creation time and HMAC handle. Immutable.
#[derive(Debug, Clone)]
pub struct Key {
    id: String,
    created: DateTime<Utc>,
    handle: SigningHandle,
}

impl Key {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn handle(&self) -> &SigningHandle {
        &self.handle
    }
}

fn validate_key_id(id: &str) -> Result<(), HwtError> {
    if id.is_empty() || id.contains(FIELD_SEPARATOR) {
        return Err(HwtError::InvalidKeyId(id.to_owned()));
    }
    Ok(())
}

/// Import one key.
///
/// The raw secret is copied into a [`SecretBuffer`], which scrubs it when this
/// function returns, whichever path it returns by.
pub fn import_key(spec: &KeySpec, hash: HashAlgorithm) -> Result<Key, HwtError> {
    validate_key_id(&spec.id)?;
    let raw = spec.secret.to_buffer();
    if raw.len() < MIN_SECRET_LEN {
        return Err(HwtError::WeakSecret {
            id: spec.id.clone(),
            expected: MIN_SECRET_LEN,
            actual: raw.len(),
        });
    }
    let handle = SigningHandle::new(hash, &raw)?;
    Ok(Key {
        id: spec.id.clone(),
        created: spec.created.unwrap_or_else(Utc::now),
        handle,
    })
}

/// Produce a key spec with `id` and a fresh random secret unless one is
/// given. For bootstrapping and tests; not a storage format for secrets.
pub fn generate_key(id: &str, secret: Option<Secret>) -> Result<KeySpec, HwtError> {
    validate_key_id(id)?;
    let secret = match secret {
        Some(secret) => secret,
        None => {
            let raw = SecretBuffer::random(MIN_SECRET_LEN)
                .map_err(|e| HwtError::KeyGeneration(e.to_string()))?;
            Secret::Text(b64url_encode(&raw))
        }
    };
    Ok(KeySpec {
        id: id.to_owned(),
        secret,
        created: Some(Utc::now()),
    })
}

/// Random key id: 8 base64url characters.
fn random_key_id() -> Result<String, HwtError> {
    let raw = SecretBuffer::random(6).map_err(|e| HwtError::KeyGeneration(e.to_string()))?;
    Ok(b64url_encode(&raw))
}

/// Produce `count` fresh keys with random ids; the last one is `current`.
pub fn generate_keys(count: usize) -> Result<KeyringSpec, HwtError> {
    let keys = (0..count)
        .map(|_| generate_key(&random_key_id()?, None))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(KeyringSpec {
        current: keys.last().map(|k| k.id.clone()),
        keys,
    })
}

/// Imported keys plus the id of the key that signs new tokens.
///
/// Every key present verifies; `current` only selects the signer. Keys are
/// never dropped automatically, operators remove them from the keyring spec
/// once no live token references them.
#[derive(Debug, Clone)]
pub struct KeyManager {
    hash: HashAlgorithm,
    current: String,
    keys: HashMap<String, Key>,
}

impl KeyManager {
    /// Import every key of `spec` independently.
    ///
    /// Rejected entries are logged and skipped. `current` is the requested id
    /// when it imported, else the first imported key, else a freshly
    /// synthesized one. Fails only when nothing imported and synthesis failed.
    pub fn import_keys(spec: &KeyringSpec, hash: HashAlgorithm) -> Result<Self, HwtError> {
        let mut keys: HashMap<String, Key> = HashMap::new();
        let mut first: Option<String> = None;

        for key_spec in &spec.keys {
            match import_key(key_spec, hash) {
                Ok(key) => {
                    if keys.contains_key(key.id()) {
                        tracing::warn!(key_id = key.id(), "duplicate key id, keeping the first");
                        continue;
                    }
                    first.get_or_insert_with(|| key.id.clone());
                    keys.insert(key.id.clone(), key);
                }
                Err(err) => tracing::warn!(key_id = %key_spec.id, error = %err, "key import rejected"),
            }
        }

        let requested = spec.current.as_deref().filter(|id| keys.contains_key(*id));
        if let (Some(wanted), None) = (spec.current.as_deref(), requested) {
            tracing::warn!(key_id = wanted, "requested current key not available");
        }

        let current = match (requested, first) {
            (Some(id), _) => id.to_owned(),
            (None, Some(id)) => id,
            (None, None) => {
                let generated = random_key_id()
                    .and_then(|id| generate_key(&id, None))
                    .and_then(|generated| import_key(&generated, hash))
                    .map_err(|e| HwtError::NoValidKeys(e.to_string()))?;
                tracing::warn!(
                    key_id = generated.id(),
                    "no usable keys supplied, signing with a generated key"
                );
                let id = generated.id.clone();
                keys.insert(id.clone(), generated);
                id
            }
        };

        tracing::debug!(keys = keys.len(), current = %current, "keyring imported");
        Ok(KeyManager {
            hash,
            current,
            keys,
        })
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    pub fn current_id(&self) -> &str {
        &self.current
    }

    /// The key that signs new tokens.
    pub fn current(&self) -> Result<&Key, HwtError> {
        self.keys
            .get(&self.current)
            .ok_or_else(|| HwtError::UnknownKey(self.current.clone()))
    }

    pub fn get(&self, id: &str) -> Option<&Key> {
        self.keys.get(id)
    }

    /// All key ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
