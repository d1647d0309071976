//! Gesture Vault
//!
//! A password vault whose secrets are unlocked by a drawn gesture instead
//! of a master password, plus heuristic login-form autofill.
//!
//! ## Features
//! - Four gesture widgets: dot grid, piano keys, chess placements, pixel art
//! - Generated passwords encrypted with AES-256-GCM under a gesture-derived key
//! - Per-type complexity scoring with an Easy/Normal/Hard tier gate
//! - Password and username field detection that follows late-rendered forms
//!
//! ## Architecture
//! - `gesture` - gesture models and their canonical key strings
//! - `complexity` - gesture complexity scoring
//! - `vault` - key derivation, encryption, secret generation, records
//! - `record_store` - pattern record storage
//! - `page` - the host page model the autofill code works against
//! - `field_detection` / `field_watcher` - field classification and re-detection
//! - `input_injector` - value injection and highlight plans
//! - `messaging` - request/response channel into page contexts
//! - `detection_state` - per-tab detection results
//! - `session` - verification sessions and the user-facing controller

pub mod complexity;
pub mod config;
pub mod detection_state;
pub mod error;
pub mod field_detection;
pub mod field_watcher;
pub mod gesture;
pub mod input_injector;
pub mod messaging;
pub mod page;
pub mod record_store;
pub mod session;
pub mod vault;

pub use error::{GestureVaultError, Result};
