//! Pattern record creation and verification

use crate::error::Result;
use crate::gesture::PatternType;
use crate::vault::crypto::{decrypt, encrypt};
use crate::vault::secret::generate_secret;
use crate::vault::types::{site_origin, PatternRecord};
use secrecy::SecretString;
use tracing::{debug, info};

/// Generate a secret, encrypt it under the gesture and build the record
///
/// The plaintext comes back once so the caller can autofill it right
/// away. It must never reach the store.
pub fn create_pattern_record(
    owner_id: &str,
    pattern_type: PatternType,
    username: &str,
    website: &str,
    gesture_key: &SecretString,
) -> Result<(PatternRecord, SecretString)> {
    let secret = generate_secret()?;
    let blob = encrypt(&secret, gesture_key)?;

    let record = PatternRecord::new(owner_id, pattern_type, site_origin(website), username, blob);
    info!(
        "Created {} pattern record {} for {}",
        pattern_type,
        record.id(),
        record.website()
    );

    Ok((record, secret))
}

/// Replay a gesture against a record
pub fn verify_and_retrieve(record: &PatternRecord, gesture_key: &SecretString) -> Result<SecretString> {
    decrypt(record.encrypted_secret(), gesture_key).inspect_err(|_| {
        debug!("Gesture did not unlock record {}", record.id());
    })
}
