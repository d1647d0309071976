//! Error Types for Gesture Vault
//!
//! One error enum for the whole crate. Boundary code (the session
//! controller) converts these into user-facing outcomes; nothing here is
//! allowed to escape into the host page.

use crate::complexity::DifficultyTier;
use crate::page::ElementId;
use thiserror::Error;

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, GestureVaultError>;

/// Main error type for the vault and autofill engine
#[derive(Error, Debug)]
pub enum GestureVaultError {
    // ===== Vault Errors =====
    /// Wrong gesture or corrupted blob. Deliberately carries no detail.
    #[error("Decryption failed")]
    DecryptionError,

    /// Secure randomness was unavailable
    #[error("Secret generation failed: {0}")]
    GenerationError(String),

    /// Cipher setup or encryption failed
    #[error("Crypto error: {0}")]
    CryptoError(String),

    /// Gesture text could not be parsed
    #[error("Invalid gesture: {0}")]
    InvalidGesture(String),

    /// Gesture is below the configured minimum difficulty
    #[error("Pattern too weak ({0:?})")]
    WeakPattern(DifficultyTier),

    // ===== Session Errors =====
    /// Third consecutive failed verification; the session is over
    #[error("Too many failed attempts - start gesture entry again")]
    TooManyAttempts,

    /// Session already unlocked or otherwise finished
    #[error("Verification session is closed")]
    SessionClosed,

    // ===== Page Errors =====
    /// Element was removed or replaced by page scripts
    #[error("Element {0} is no longer attached")]
    ElementDetached(ElementId),

    /// The page went away (navigation or tab close)
    #[error("Page unloaded")]
    PageUnloaded,

    // ===== Messaging Errors =====
    /// Remote page context did not answer in time
    #[error("Page did not respond to '{0}' in time")]
    InjectionTimeout(String),

    /// Remote handler did not recognise the request
    #[error("No response for '{0}'")]
    NoResponse(String),

    /// Malformed request or response payload
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    // ===== Storage / Config Errors =====
    /// Pattern store failure
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Configuration could not be read or written
    #[error("Config error: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl GestureVaultError {
    /// Check if this error permanently ends the verification session
    pub fn ends_session(&self) -> bool {
        matches!(self, GestureVaultError::TooManyAttempts)
    }

    /// Check if the user can simply try again
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GestureVaultError::DecryptionError
                | GestureVaultError::WeakPattern(_)
                | GestureVaultError::InvalidGesture(_)
                | GestureVaultError::InjectionTimeout(_)
                | GestureVaultError::ElementDetached(_)
        )
    }

    /// Text shown to the user at the orchestration boundary
    pub fn user_message(&self) -> String {
        match self {
            GestureVaultError::DecryptionError => "Pattern did not match".to_string(),
            GestureVaultError::GenerationError(_) => {
                "Could not generate a secure password".to_string()
            }
            GestureVaultError::WeakPattern(tier) => {
                format!("Pattern is too easy ({:?}) - make it more complex", tier)
            }
            GestureVaultError::TooManyAttempts => {
                "Too many failed attempts - please start again".to_string()
            }
            GestureVaultError::InjectionTimeout(_)
            | GestureVaultError::NoResponse(_)
            | GestureVaultError::PageUnloaded
            | GestureVaultError::ElementDetached(_) => {
                "The page is not responding - reload it and try again".to_string()
            }
            GestureVaultError::StorageError(_) | GestureVaultError::IoError(_) => {
                "Could not access saved patterns".to_string()
            }
            other => other.to_string(),
        }
    }
}
