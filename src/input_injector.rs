//! Input Injection Module
//!
//! Writes values into classified page inputs. Every write looks the
//! element up again by id, clears it, focuses it, sets the value and then
//! synthesizes the events that both native form serialization and
//! framework listeners watch for. Nothing is typed through the clipboard.

use crate::config::HighlightConfig;
use crate::field_detection::FieldCandidate;
use crate::error::{GestureVaultError, Result};
use crate::page::{DomEvent, ElementId, PageDom};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Events fired after a value is set
const VALUE_EVENTS: [DomEvent; 3] = [DomEvent::Input, DomEvent::Change, DomEvent::KeyUp];

/// Result of a fill request. Fill operations report instead of raising.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillOutcome {
    pub success: bool,
    pub filled: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FillOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            filled: 0,
            reason: Some(reason.into()),
        }
    }
}

/// What the active username field currently holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "camelCase")]
pub enum UsernameLookup {
    Found(String),
    Empty,
    NotFound,
}

/// One element to flash after a fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightStep {
    pub element: ElementId,
    /// Offset from the fill at which the highlight is applied
    pub delay: Duration,
}

/// Staggered visual confirmation. The executor applies each step's style
/// at its delay and restores the element's previous style `duration`
/// later.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HighlightPlan {
    pub steps: Vec<HighlightStep>,
    pub duration: Duration,
    pub style: String,
}

impl HighlightPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Fills page inputs
pub struct InputInjector {
    highlight: HighlightConfig,
}

impl InputInjector {
    pub fn new() -> Self {
        Self {
            highlight: HighlightConfig::default(),
        }
    }

    pub fn with_highlight(highlight: HighlightConfig) -> Self {
        Self { highlight }
    }

    /// Write `value` into one element
    fn write_value<P: PageDom + ?Sized>(
        page: &mut P,
        element: ElementId,
        value: &str,
        blur: bool,
    ) -> Result<()> {
        if page.input(element).is_none() {
            return Err(GestureVaultError::ElementDetached(element));
        }

        page.set_value(element, "")?;
        page.focus(element)?;
        page.set_value(element, value)?;
        for event in VALUE_EVENTS {
            page.dispatch(element, event)?;
        }
        if blur {
            page.dispatch(element, DomEvent::Blur)?;
        }
        Ok(())
    }

    /// Fill the secret into every password field. Fields detached since
    /// classification are skipped and reported in `reason`.
    pub fn fill_password<P: PageDom + ?Sized>(
        &self,
        page: &mut P,
        fields: &[FieldCandidate],
        secret: &SecretString,
    ) -> (FillOutcome, HighlightPlan) {
        if fields.is_empty() {
            debug!("No password fields to fill");
            return (FillOutcome::failed("No password fields found"), HighlightPlan::default());
        }

        let mut filled = Vec::new();
        let mut failures = Vec::new();
        for field in fields {
            match Self::write_value(page, field.element, secret.expose_secret(), false) {
                Ok(()) => filled.push(field.element),
                Err(e) => {
                    warn!("Could not fill password field {}: {}", field.element, e);
                    failures.push(e.to_string());
                }
            }
        }

        debug!("Filled {} of {} password fields", filled.len(), fields.len());
        let outcome = FillOutcome {
            success: !filled.is_empty(),
            filled: filled.len(),
            reason: if failures.is_empty() {
                None
            } else {
                Some(failures.join("; "))
            },
        };
        (outcome, self.highlight_plan(&filled))
    }

    /// Fill the active username field and blur it, which lets sites that
    /// validate on blur reveal their password step
    pub fn fill_username<P: PageDom + ?Sized>(
        &self,
        page: &mut P,
        field: Option<&FieldCandidate>,
        username: &str,
    ) -> (FillOutcome, HighlightPlan) {
        let Some(field) = field else {
            return (FillOutcome::failed("No username field found"), HighlightPlan::default());
        };

        match Self::write_value(page, field.element, username, true) {
            Ok(()) => (
                FillOutcome {
                    success: true,
                    filled: 1,
                    reason: None,
                },
                self.highlight_plan(&[field.element]),
            ),
            Err(e) => {
                warn!("Could not fill username field {}: {}", field.element, e);
                (FillOutcome::failed(e.to_string()), HighlightPlan::default())
            }
        }
    }

    /// Read the active username field's current value
    pub fn read_username<P: PageDom + ?Sized>(
        page: &P,
        field: Option<&FieldCandidate>,
    ) -> UsernameLookup {
        let snapshot = field.and_then(|f| page.input(f.element));
        match snapshot {
            None => UsernameLookup::NotFound,
            Some(input) => {
                let value = input.value.trim();
                if value.is_empty() {
                    UsernameLookup::Empty
                } else {
                    UsernameLookup::Found(value.to_string())
                }
            }
        }
    }

    fn highlight_plan(&self, elements: &[ElementId]) -> HighlightPlan {
        let stagger = Duration::from_millis(self.highlight.stagger_ms);
        HighlightPlan {
            steps: elements
                .iter()
                .enumerate()
                .map(|(i, element)| HighlightStep {
                    element: *element,
                    delay: stagger * i as u32,
                })
                .collect(),
            duration: Duration::from_millis(self.highlight.duration_ms),
            style: self.highlight.style.clone(),
        }
    }
}

impl Default for InputInjector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_detection::{classify_password_fields, classify_username_fields};
    use crate::page::{InputKind, InputSpec, MemoryPage};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fills_native_and_disguised_password_fields() {
        let mut page = MemoryPage::new();
        let (a, _) = page.add_input(InputSpec::new(InputKind::Password).name("password"));
        let (b, _) = page.add_input(InputSpec::new(InputKind::Password).name("confirm"));
        let (c, _) = page.add_input(InputSpec::new(InputKind::Text).name("pwd_visible"));

        let fields = classify_password_fields(&page);
        let secret = SecretString::from("Ab");
        let (outcome, plan) = InputInjector::new().fill_password(&mut page, &fields, &secret);

        assert_eq!(
            outcome,
            FillOutcome {
                success: true,
                filled: 3,
                reason: None
            }
        );
        for id in [a, b, c] {
            assert_eq!(page.value(id).as_deref(), Some("Ab"));
            assert_eq!(
                page.events_for(id),
                vec![DomEvent::Focus, DomEvent::Input, DomEvent::Change, DomEvent::KeyUp]
            );
        }

        let delays: Vec<u64> = plan.steps.iter().map(|s| s.delay.as_millis() as u64).collect();
        assert_eq!(delays, vec![0, 200, 400]);
        assert_eq!(plan.duration, Duration::from_millis(1000));
    }

    #[test]
    fn test_existing_value_is_replaced() {
        let mut page = MemoryPage::new();
        let (a, _) = page.add_input(InputSpec::new(InputKind::Password).value("old"));
        let fields = classify_password_fields(&page);
        InputInjector::new().fill_password(&mut page, &fields, &SecretString::from("new"));
        assert_eq!(page.value(a).as_deref(), Some("new"));
    }

    #[test]
    fn test_detached_field_is_skipped_not_fatal() {
        let mut page = MemoryPage::new();
        let (a, _) = page.add_input(InputSpec::new(InputKind::Password));
        let (b, _) = page.add_input(InputSpec::new(InputKind::Password));
        let fields = classify_password_fields(&page);

        page.remove(a);
        let (outcome, plan) =
            InputInjector::new().fill_password(&mut page, &fields, &SecretString::from("x"));
        assert!(outcome.success);
        assert_eq!(outcome.filled, 1);
        assert!(outcome.reason.unwrap().contains("no longer attached"));
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].element, b);
    }

    #[test]
    fn test_no_fields_reports_failure() {
        let mut page = MemoryPage::new();
        let (outcome, plan) =
            InputInjector::new().fill_password(&mut page, &[], &SecretString::from("x"));
        assert!(!outcome.success);
        assert_eq!(outcome.filled, 0);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_username_fill_blurs_the_field() {
        let mut page = MemoryPage::new();
        let (user, _) = page.add_input(InputSpec::new(InputKind::Email).name("email"));
        let candidates = classify_username_fields(&page);

        let (outcome, _) =
            InputInjector::new().fill_username(&mut page, candidates.first(), "alice@example.com");
        assert!(outcome.success);
        assert_eq!(page.value(user).as_deref(), Some("alice@example.com"));
        assert_eq!(page.events_for(user).last(), Some(&DomEvent::Blur));
        assert_eq!(page.focused(), None);

        let (missing, _) = InputInjector::new().fill_username(&mut page, None, "x");
        assert!(!missing.success);
    }

    #[test]
    fn test_read_username_states() {
        let mut page = MemoryPage::new();
        let (_, _) = page.add_input(InputSpec::new(InputKind::Text).name("username").value("  "));
        let candidates = classify_username_fields(&page);
        assert_eq!(
            InputInjector::read_username(&page, candidates.first()),
            UsernameLookup::Empty
        );

        let id = candidates[0].element;
        page.set_value(id, "bob").unwrap();
        assert_eq!(
            InputInjector::read_username(&page, candidates.first()),
            UsernameLookup::Found("bob".to_string())
        );

        page.remove(id);
        assert_eq!(
            InputInjector::read_username(&page, candidates.first()),
            UsernameLookup::NotFound
        );
        assert_eq!(InputInjector::read_username(&page, None), UsernameLookup::NotFound);
    }

    #[test]
    fn test_username_lookup_wire_shape() {
        let json = serde_json::to_value(UsernameLookup::Found("bob".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({"status": "found", "value": "bob"}));
        let json = serde_json::to_value(UsernameLookup::NotFound).unwrap();
        assert_eq!(json, serde_json::json!({"status": "notFound"}));
    }
}
