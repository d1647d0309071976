//! Credential Vault Engine
//!
//! Key derivation from gestures, authenticated encryption of generated
//! secrets, and the immutable records that carry them.

pub mod crypto;
pub mod records;
pub mod secret;
pub mod types;

pub use crypto::{decrypt, derive_key, encrypt};
pub use records::{create_pattern_record, verify_and_retrieve};
pub use secret::generate_secret;
pub use types::{site_origin, EncryptedBlob, PatternRecord};
