//! Pattern sessions
//!
//! `VerificationSession` enforces the attempt limit for one gesture-entry
//! session. `PatternSessionController` is the orchestration boundary: it
//! ties the vault, the record store and a page connection together and
//! turns every error into an `ActionOutcome` with a user-facing message.

use crate::complexity::{assess, ComplexityReport, DifficultyTier};
use crate::config::AppConfig;
use crate::detection_state::{DetectionState, TabDetectionStore, TabId};
use crate::error::{GestureVaultError, Result};
use crate::gesture::Gesture;
use crate::input_injector::UsernameLookup;
use crate::messaging::{PageConnection, PageEvent};
use crate::record_store::PatternStore;
use crate::vault::{create_pattern_record, verify_and_retrieve, PatternRecord};
use secrecy::SecretString;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Consecutive failures before a session locks
pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Unlocked,
    /// Terminal; a new session is needed
    Locked,
}

/// One gesture-entry session against a single record
#[derive(Debug)]
pub struct VerificationSession {
    record: PatternRecord,
    failures: u32,
    state: SessionState,
}

impl VerificationSession {
    pub fn new(record: PatternRecord) -> Self {
        Self {
            record,
            failures: 0,
            state: SessionState::Active,
        }
    }

    pub fn record(&self) -> &PatternRecord {
        &self.record
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn remaining_attempts(&self) -> u32 {
        match self.state {
            SessionState::Active => MAX_ATTEMPTS - self.failures,
            _ => 0,
        }
    }

    /// Replay a gesture. The third consecutive failure locks the session
    /// and is itself reported as `TooManyAttempts`.
    pub fn attempt(&mut self, gesture: &Gesture) -> Result<SecretString> {
        match self.state {
            SessionState::Locked => return Err(GestureVaultError::TooManyAttempts),
            SessionState::Unlocked => return Err(GestureVaultError::SessionClosed),
            SessionState::Active => {}
        }

        match verify_and_retrieve(&self.record, &gesture.canonical_key()) {
            Ok(secret) => {
                self.state = SessionState::Unlocked;
                Ok(secret)
            }
            Err(GestureVaultError::DecryptionError) => {
                self.failures += 1;
                if self.failures >= MAX_ATTEMPTS {
                    warn!(
                        "Verification session for record {} locked after {} failures",
                        self.record.id(),
                        self.failures
                    );
                    self.state = SessionState::Locked;
                    Err(GestureVaultError::TooManyAttempts)
                } else {
                    Err(GestureVaultError::DecryptionError)
                }
            }
            Err(e) => Err(e),
        }
    }
}

/// Score a gesture and refuse it below `minimum`
pub fn check_strength(gesture: &Gesture, minimum: DifficultyTier) -> Result<ComplexityReport> {
    if gesture.is_empty() {
        return Err(GestureVaultError::InvalidGesture("pattern is empty".to_string()));
    }
    let report = assess(gesture);
    if report.tier < minimum {
        debug!("Rejected pattern scoring {} ({:?})", report.score, report.tier);
        return Err(GestureVaultError::WeakPattern(report.tier));
    }
    Ok(report)
}

/// Result of a user action, safe to show as-is
#[derive(Debug, Serialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
    pub filled: usize,
    /// Trying the same action again may succeed
    pub can_retry: bool,
    /// Only set by `view_pattern`
    #[serde(skip)]
    pub revealed: Option<SecretString>,
}

impl ActionOutcome {
    fn ok(message: impl Into<String>, filled: usize) -> Self {
        Self {
            success: true,
            message: message.into(),
            filled,
            can_retry: false,
            revealed: None,
        }
    }

    fn from_error(error: &GestureVaultError) -> Self {
        Self {
            success: false,
            message: error.user_message(),
            filled: 0,
            can_retry: error.is_recoverable(),
            revealed: None,
        }
    }
}

pub struct PatternSessionController<S> {
    store: S,
    owner_id: String,
    minimum_tier: DifficultyTier,
    tabs: TabDetectionStore,
}

impl<S: PatternStore> PatternSessionController<S> {
    pub fn new(store: S, owner_id: &str, config: &AppConfig) -> Self {
        Self {
            store,
            owner_id: owner_id.to_string(),
            minimum_tier: config.minimum_tier,
            tabs: TabDetectionStore::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Saved records for a site, newest first. Storage failures read as
    /// "nothing saved".
    pub fn records_for_site(&self, site: &str) -> Vec<PatternRecord> {
        self.store
            .query_by_owner_site(&self.owner_id, site)
            .unwrap_or_else(|e| {
                warn!("Could not query records for {}: {}", site, e);
                Vec::new()
            })
    }

    pub fn begin_verification(&self, record: PatternRecord) -> VerificationSession {
        VerificationSession::new(record)
    }

    /// Save a new pattern for `site` and fill the generated password
    pub async fn create_pattern(
        &mut self,
        page: &mut PageConnection,
        site: &str,
        gesture: &Gesture,
        username: Option<&str>,
    ) -> ActionOutcome {
        match self.try_create(page, site, gesture, username).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Pattern creation for {} failed: {}", site, e);
                ActionOutcome::from_error(&e)
            }
        }
    }

    async fn try_create(
        &mut self,
        page: &mut PageConnection,
        site: &str,
        gesture: &Gesture,
        username: Option<&str>,
    ) -> Result<ActionOutcome> {
        let report = check_strength(gesture, self.minimum_tier)?;

        let username = match username {
            Some(name) => name.to_string(),
            None => match page.get_username().await {
                Ok(UsernameLookup::Found(name)) => name,
                Ok(_) => String::new(),
                Err(e) => {
                    debug!("Username lookup failed, saving without one: {}", e);
                    String::new()
                }
            },
        };

        let (record, secret) = create_pattern_record(
            &self.owner_id,
            gesture.pattern_type(),
            &username,
            site,
            &gesture.canonical_key(),
        )?;
        self.store.insert(record)?;

        // The record is saved; a page failure from here on only costs the fill
        match page.fill_password(&secret).await {
            Ok(fill) if fill.success => Ok(ActionOutcome::ok(
                format!("Pattern saved ({:?}), password filled", report.tier),
                fill.filled,
            )),
            Ok(fill) => Ok(ActionOutcome::ok(
                format!(
                    "Pattern saved, but the password could not be filled: {}",
                    fill.reason.unwrap_or_default()
                ),
                0,
            )),
            Err(e) => Ok(ActionOutcome::ok(
                format!("Pattern saved, but {}", e.user_message().to_lowercase()),
                0,
            )),
        }
    }

    /// Unlock with a gesture and fill username and password
    pub async fn fill_with_pattern(
        &mut self,
        page: &mut PageConnection,
        session: &mut VerificationSession,
        gesture: &Gesture,
    ) -> ActionOutcome {
        let secret = match session.attempt(gesture) {
            Ok(secret) => secret,
            Err(e) => return Self::attempt_failed(session, &e),
        };

        let username = session.record().username().to_string();
        if !username.is_empty() {
            match page.fill_username(&username).await {
                Ok(fill) if !fill.success => {
                    debug!("Username not filled: {:?}", fill.reason);
                }
                Ok(_) => {}
                Err(e) => debug!("Username fill request failed: {}", e),
            }
        }

        match page.fill_password(&secret).await {
            Ok(fill) if fill.success => {
                info!("Filled {} password fields", fill.filled);
                ActionOutcome::ok("Password filled", fill.filled)
            }
            Ok(fill) => ActionOutcome {
                success: false,
                message: fill
                    .reason
                    .unwrap_or_else(|| "No password fields found".to_string()),
                filled: 0,
                can_retry: false,
                revealed: None,
            },
            Err(e) => ActionOutcome::from_error(&e),
        }
    }

    /// Unlock with a gesture and hand the secret back for display
    pub fn view_pattern(
        &self,
        session: &mut VerificationSession,
        gesture: &Gesture,
    ) -> ActionOutcome {
        match session.attempt(gesture) {
            Ok(secret) => ActionOutcome {
                success: true,
                message: "Password unlocked".to_string(),
                filled: 0,
                can_retry: false,
                revealed: Some(secret),
            },
            Err(e) => Self::attempt_failed(session, &e),
        }
    }

    fn attempt_failed(session: &VerificationSession, error: &GestureVaultError) -> ActionOutcome {
        let mut outcome = ActionOutcome::from_error(error);
        if matches!(error, GestureVaultError::DecryptionError) {
            outcome.message = format!(
                "{} ({} attempts left)",
                outcome.message,
                session.remaining_attempts()
            );
        }
        outcome
    }

    /// Feed a page notice into the per-tab state
    pub fn observe(&mut self, tab: TabId, event: &PageEvent) {
        match event {
            PageEvent::FieldsChanged { counts } => {
                self.tabs.record(tab, *counts);
            }
        }
    }

    pub fn navigation_started(&mut self, tab: TabId) {
        self.tabs.navigation_started(tab);
    }

    pub fn tab_closed(&mut self, tab: TabId) {
        self.tabs.tab_closed(tab);
    }

    pub fn detection_state(&self, tab: TabId) -> Option<&DetectionState> {
        self.tabs.get(tab)
    }
}
