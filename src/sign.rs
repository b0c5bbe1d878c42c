//! HMAC signing: keyed handles, signing-input assembly and signature
//! truncation.

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};

use crate::error::HwtError;
use crate::primitives::b64url_encode;
use crate::types::{HashAlgorithm, FIELD_SEPARATOR};

/// HMAC instance keyed once at import time.
///
/// Holds the derived HMAC state only; the raw secret it was built from is not
/// retained and cannot be read back.
#[derive(Clone)]
pub enum SigningHandle {
    Sha256(Hmac<Sha256>),
    Sha384(Hmac<Sha384>),
    Sha512(Hmac<Sha512>),
}

impl SigningHandle {
    pub fn new(hash: HashAlgorithm, secret: &[u8]) -> Result<Self, HwtError> {
        let invalid = |e: hmac::digest::InvalidLength| HwtError::Config(format!("invalid HMAC key: {e}"));
        Ok(match hash {
            HashAlgorithm::Sha256 => {
                SigningHandle::Sha256(Hmac::<Sha256>::new_from_slice(secret).map_err(invalid)?)
            }
            HashAlgorithm::Sha384 => {
                SigningHandle::Sha384(Hmac::<Sha384>::new_from_slice(secret).map_err(invalid)?)
            }
            HashAlgorithm::Sha512 => {
                SigningHandle::Sha512(Hmac::<Sha512>::new_from_slice(secret).map_err(invalid)?)
            }
        })
    }

    pub fn hash(&self) -> HashAlgorithm {
        match self {
            SigningHandle::Sha256(_) => HashAlgorithm::Sha256,
            SigningHandle::Sha384(_) => HashAlgorithm::Sha384,
            SigningHandle::Sha512(_) => HashAlgorithm::Sha512,
        }
    }

    /// Raw MAC over `input`.
    #[must_use]
    pub fn mac(&self, input: &[u8]) -> Vec<u8> {
        match self {
            SigningHandle::Sha256(mac) => {
                let mut mac = mac.clone();
                mac.update(input);
                mac.finalize().into_bytes().to_vec()
            }
            SigningHandle::Sha384(mac) => {
                let mut mac = mac.clone();
                mac.update(input);
                mac.finalize().into_bytes().to_vec()
            }
            SigningHandle::Sha512(mac) => {
                let mut mac = mac.clone();
                mac.update(input);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }

    /// Base64url MAC over `input`, cut to `size` characters.
    ///
    /// `size` is expected to be resolved against the hash's bounds already
    /// (see [`Settings`](crate::config::Settings)); at or above the full
    /// length the signature is returned whole.
    #[must_use]
    pub fn signature(&self, input: &str, size: usize) -> String {
        let mut sig = b64url_encode(&self.mac(input.as_bytes()));
        sig.truncate(size);
        sig
    }
}

impl std::fmt::Debug for SigningHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningHandle({})", self.hash().name())
    }
}

/// Join the signed elements: `exp.format.payload`, plus the hidden element
/// when present. The hidden element is never part of the emitted token.
///
/// Every element is the exact text carried by the token, so any re-encoding
/// of a field changes the input.
#[must_use]
pub fn signing_input(exp: &str, format: &str, payload: &str, hidden: Option<&str>) -> String {
    let mut input = format!("{exp}{FIELD_SEPARATOR}{format}{FIELD_SEPARATOR}{payload}");
    if let Some(hidden) = hidden {
        input.push(FIELD_SEPARATOR);
        input.push_str(hidden);
    }
    input
}
