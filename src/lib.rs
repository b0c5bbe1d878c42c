//! HWT: compact HMAC-signed web tokens.
//!
//! Tokens look like `hwt.<sig>.<keyId>.<exp>.<format>.<payload>`. Payloads go
//! through a pluggable codec (`j` JSON or `jx` extended JSON by default),
//! several keys can be live at once for rotation, and an optional hidden
//! value can be bound into the signature without appearing in the token.

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod jx;
pub mod keys;
pub mod primitives;
pub mod sign;
pub mod types;
pub mod value;
pub mod verify;

pub use codec::{Codec, CodecRegistry, FnCodec, JsonCodec};
pub use config::{Options, Settings};
pub use engine::Hwt;
pub use error::{CodecError, HwtError};
pub use jx::ExtendedJsonCodec;
pub use keys::{generate_keys, KeySpec, KeyringSpec, Secret};
pub use types::HashAlgorithm;
pub use value::{ElementType, TypedArray, Value};
pub use verify::{UnverifiedToken, VerifyResult};
