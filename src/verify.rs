//! Token verification and unverified decoding.

use std::sync::Arc;

use crate::codec::Codec;
use crate::engine::{encode_b64, unix_now, Hwt};
use crate::error::HwtError;
use crate::primitives::{b64url_decode, constant_time_eq};
use crate::sign::signing_input;
use crate::types::{FIELD_SEPARATOR, TOKEN_PREFIX};
use crate::value::Value;

/// Outcome of [`Hwt::verify`].
///
/// `ok` is set only when the signature matches, the time check passes and
/// the payload decodes. The time fields are filled in as soon as the expiry
/// field parses, so they are meaningful on some failures too.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerifyResult {
    pub ok: bool,
    pub data: Option<Value>,
    pub expired: bool,
    pub valid_time: bool,
    pub within_leeway: bool,
    /// Expiry in Unix seconds; 0 when the token did not parse.
    pub expires: u64,
    pub error: Option<String>,
}

/// Token fields read without checking the signature.
#[derive(Debug, Clone, PartialEq)]
pub struct UnverifiedToken {
    pub key_id: String,
    pub expires: u64,
    /// Format the payload was decoded with (the default when the field is
    /// empty).
    pub format: String,
    pub signature: String,
    pub data: Value,
}

struct Fields<'a> {
    signature: &'a str,
    key_id: &'a str,
    exp: &'a str,
    expires: u64,
    format: &'a str,
    payload: &'a str,
}

fn invalid(reason: &str) -> HwtError {
    HwtError::TokenStructurallyInvalid(reason.to_owned())
}

/// Split a token into its fields. Anything past the sixth field is ignored.
fn parse_fields(token: &str, max_size: usize) -> Result<Fields<'_>, HwtError> {
    if token.len() > max_size {
        return Err(invalid("token exceeds maximum size"));
    }
    let mut parts = token.split(FIELD_SEPARATOR);
    if parts.next() != Some(TOKEN_PREFIX) {
        return Err(invalid("missing prefix"));
    }
    let (Some(signature), Some(key_id), Some(exp), Some(format), Some(payload)) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(invalid("too few fields"));
    };
    if exp.is_empty() || !exp.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("expiry is not a decimal integer"));
    }
    let expires = exp
        .parse::<u64>()
        .map_err(|_| invalid("expiry out of range"))?;
    Ok(Fields {
        signature,
        key_id,
        exp,
        expires,
        format,
        payload,
    })
}

impl Hwt {
    /// Verify `token` against the current clock.
    pub fn verify(&self, token: &str, hidden: Option<&Value>) -> Result<VerifyResult, HwtError> {
        self.verify_at(unix_now(), token, hidden)
    }

    /// Verify `token` as of `now` (Unix seconds).
    ///
    /// Failures are reported through [`VerifyResult::error`] unless the
    /// matching strict flag is set, in which case they are returned as `Err`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn verify_at(
        &self,
        now: u64,
        token: &str,
        hidden: Option<&Value>,
    ) -> Result<VerifyResult, HwtError> {
        let mut result = VerifyResult::default();
        match self.check(now, token, hidden, &mut result) {
            Ok(data) => {
                result.ok = true;
                result.data = Some(data);
                Ok(result)
            }
            Err(err) => {
                tracing::debug!(error = %err, "token rejected");
                if self.raises(&err) {
                    return Err(err);
                }
                result.error = Some(err.to_string());
                Ok(result)
            }
        }
    }

    /// Decode the payload without checking signature or expiry. The result
    /// is untrusted.
    pub fn decode(&self, token: &str) -> Result<UnverifiedToken, HwtError> {
        let fields = parse_fields(token, self.settings.max_token_size_bytes)?;
        let (format, codec) = self.resolve_codec(fields.format)?;
        let data = decode_payload(&*codec, &format, fields.payload)?;
        Ok(UnverifiedToken {
            key_id: fields.key_id.to_owned(),
            expires: fields.expires,
            format,
            signature: fields.signature.to_owned(),
            data,
        })
    }

    fn check(
        &self,
        now: u64,
        token: &str,
        hidden: Option<&Value>,
        result: &mut VerifyResult,
    ) -> Result<Value, HwtError> {
        let fields = parse_fields(token, self.settings.max_token_size_bytes)?;

        result.expires = fields.expires;
        result.expired = fields.expires <= now;
        result.within_leeway =
            result.expired && now - fields.expires <= self.settings.leeway_seconds;
        result.valid_time = !result.expired || result.within_leeway;
        if !result.valid_time {
            return Err(HwtError::TokenExpired {
                expires: fields.expires,
                now,
            });
        }

        let (format, codec) = self.resolve_codec(fields.format)?;
        let hidden = hidden
            .map(|h| encode_b64(&*codec, &format, h))
            .transpose()?;

        let key = self
            .keys
            .get(fields.key_id)
            .ok_or_else(|| HwtError::UnknownKey(fields.key_id.to_owned()))?;
        let input = signing_input(fields.exp, fields.format, fields.payload, hidden.as_deref());
        let expected = key.handle().signature(&input, self.settings.signature_size);
        if !constant_time_eq(fields.signature, &expected) {
            return Err(HwtError::SignatureMismatch);
        }

        decode_payload(&*codec, &format, fields.payload)
    }

    /// Codec for a token's format field; empty means the configured default.
    fn resolve_codec(&self, field: &str) -> Result<(String, Arc<dyn Codec>), HwtError> {
        if field.is_empty() {
            return Ok((self.settings.format.clone(), Arc::clone(&self.codec)));
        }
        self.registry
            .lookup(field)
            .map(|codec| (field.to_owned(), codec))
            .ok_or_else(|| HwtError::UnknownEncoding(field.to_owned()))
    }

    fn raises(&self, err: &HwtError) -> bool {
        match err {
            HwtError::TokenExpired { .. } => self.settings.error_on_expired,
            HwtError::UnknownEncoding(_) | HwtError::EncodingFailed { .. } => {
                self.settings.error_on_encoding
            }
            _ => self.settings.error_on_invalid,
        }
    }
}

fn decode_payload(codec: &dyn Codec, format: &str, payload: &str) -> Result<Value, HwtError> {
    codec
        .decode(&b64url_decode(payload))
        .map_err(|e| HwtError::PayloadDecodeFailed {
            format: format.to_owned(),
            reason: e.0,
        })
}
