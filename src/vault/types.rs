//! Gesture Vault Data Types

use crate::gesture::PatternType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `base64(nonce || ciphertext || tag)` as stored; never plaintext
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedBlob(String);

impl EncryptedBlob {
    pub fn from_encoded(encoded: String) -> Self {
        Self(encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes and is long enough to hold a nonce and a tag
    pub fn is_well_formed(&self) -> bool {
        crate::vault::crypto::split_blob(self).is_some()
    }
}

/// A saved pattern: metadata plus the encrypted secret
///
/// Records are immutable once created; there are no setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    id: Uuid,
    owner_id: String,
    pattern_type: PatternType,
    website: String,
    username: String,
    encrypted_secret: EncryptedBlob,
    created_at: DateTime<Utc>,
}

impl PatternRecord {
    pub(crate) fn new(
        owner_id: &str,
        pattern_type: PatternType,
        website: String,
        username: &str,
        encrypted_secret: EncryptedBlob,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            pattern_type,
            website,
            username: username.to_string(),
            encrypted_secret,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn pattern_type(&self) -> PatternType {
        self.pattern_type
    }

    /// Site origin, e.g. `https://example.com`
    pub fn website(&self) -> &str {
        &self.website
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn encrypted_secret(&self) -> &EncryptedBlob {
        &self.encrypted_secret
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Reduce a page URL to `scheme://host[:port]`, lowercased, with default
/// ports dropped. A bare host is treated as https.
pub fn site_origin(url: &str) -> String {
    let trimmed = url.trim();
    let (scheme, rest) = match trimmed.split_once("://") {
        Some((scheme, rest)) => (scheme.to_lowercase(), rest),
        None => ("https".to_string(), trimmed),
    };

    let authority = rest
        .split(|c: char| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    let host = authority
        .rsplit('@')
        .next()
        .unwrap_or_default()
        .to_lowercase();

    let default_port = match scheme.as_str() {
        "https" => Some("443"),
        "http" => Some("80"),
        _ => None,
    };
    let host = match host.rsplit_once(':') {
        Some((h, port)) if Some(port) == default_port => h.to_string(),
        _ => host.clone(),
    };

    format!("{}://{}", scheme, host)
}
