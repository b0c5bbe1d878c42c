//! Crypto primitives: constant-time equality, base64url transcoding and
//! secure erasure of secret-bearing buffers.

use std::ops::Deref;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use rand::RngCore;
use zeroize::Zeroize;

/// URL-safe alphabet, no padding on encode, padding optional on decode.
const B64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes as unpadded base64url text.
#[must_use]
pub fn b64url_encode(bytes: &[u8]) -> String {
    B64URL.encode(bytes)
}

/// Decode base64url text, with or without `=` padding.
///
/// Malformed input yields an empty buffer instead of an error.
#[must_use]
pub fn b64url_decode(text: &str) -> Vec<u8> {
    B64URL.decode(text).unwrap_or_default()
}

/// Compare two byte strings in time proportional to the longer operand.
///
/// Every byte pair is XOR-folded into one accumulator; there is no early exit
/// on mismatch. A length difference is folded in as well, and the shorter
/// operand is padded with zeros for the scan.
#[must_use]
pub fn constant_time_eq(a: impl AsRef<[u8]>, b: impl AsRef<[u8]>) -> bool {
    let a = a.as_ref();
    let b = b.as_ref();
    let len = a.len().max(b.len());

    let mut acc = (a.len() ^ b.len()) as u64;
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        acc |= u64::from(x ^ y);
    }
    std::hint::black_box(acc) == 0
}

/// Overwrite a buffer with fresh random bytes, then zero it.
pub fn scrub(buf: &mut [u8]) {
    rand::thread_rng().fill_bytes(buf);
    buf.zeroize();
}

/// Owned secret bytes that are scrubbed when dropped.
///
/// Dropping covers every exit path of the code holding it: success, early
/// `?` return and unwinding.
#[derive(Default)]
pub struct SecretBuffer(Vec<u8>);

impl SecretBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        SecretBuffer(bytes)
    }

    /// Allocate `len` bytes from the OS random source.
    pub fn random(len: usize) -> Result<Self, rand::Error> {
        let mut buf = SecretBuffer(vec![0u8; len]);
        rand::rngs::OsRng.try_fill_bytes(&mut buf.0)?;
        Ok(buf)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for SecretBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl Drop for SecretBuffer {
    fn drop(&mut self) {
        scrub(&mut self.0);
    }
}

impl std::fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBuffer([REDACTED; {}])", self.0.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(!constant_time_eq(b"", b"a"));
        assert!(constant_time_eq(b"", b""));
        assert!(constant_time_eq("signature", "signature"));
    }

    #[test]
    fn test_constant_time_eq_zero_padding_is_not_equality() {
        // "ab" padded with zeros must not match "ab\0".
        assert!(!constant_time_eq(b"ab", b"ab\0"));
    }

    #[test]
    fn test_b64url_alphabet_and_padding() {
        // 0xfb 0xff encodes to "+/8=" in the standard alphabet.
        assert_eq!(b64url_encode(&[0xfb, 0xff]), "-_8");
        assert_eq!(b64url_decode("-_8"), vec![0xfb, 0xff]);
        assert_eq!(b64url_decode("-_8="), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_b64url_malformed_is_empty() {
        assert!(b64url_decode("***").is_empty());
        assert!(b64url_decode("a").is_empty());
        assert!(b64url_decode("+/8").is_empty());
    }

    #[test]
    fn test_b64url_roundtrip() {
        let data: Vec<u8> = (0u8..=255).collect();
        assert_eq!(b64url_decode(&b64url_encode(&data)), data);
    }

    #[test]
    fn test_scrub_zeroes() {
        let mut buf = vec![0xAAu8; 64];
        scrub(&mut buf);
        assert!(buf.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_secret_buffer_random() {
        let a = SecretBuffer::random(32).unwrap();
        let b = SecretBuffer::random(32).unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(&a[..], &b[..]);
        assert_eq!(format!("{a:?}"), "SecretBuffer([REDACTED; 32])");
    }
}
