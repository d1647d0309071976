//! Field Detection Module
//!
//! Heuristic classification of page inputs into password and username
//! candidates. Classification is recomputed from scratch on demand or
//! after DOM mutations; nothing survives a page load. Finding no fields
//! is a normal, empty result.

use crate::page::{ElementId, FormId, InputKind, InputSnapshot, PageDom, Rect};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::HashSet;
use tracing::debug;

/// Text that betrays a password field dressed up as a plain text input
pub const PASSWORD_KEYWORDS: &[&str] = &[
    "password",
    "passphrase",
    "passwd",
    "passcode",
    "pass",
    "pwd",
    "secret",
    "pin",
    "passwort",   // German
    "kennwort",   // German
    "motdepasse", // French
    "contraseña", // Spanish
    "geslo",      // Slovenian
];

/// Strong username hints, including a few localized forms
pub const HIGH_PRIORITY_KEYWORDS: &[&str] = &[
    "username",
    "user",
    "login",
    "handle",
    "nickname",
    "screenname",
    "userid",
    "benutzer",     // German
    "benutzername", // German
    "utilisateur",  // French
    "usuario",      // Spanish
    "uporabnik",    // Slovenian
    "uporabniško",  // Slovenian
];

pub const MEDIUM_PRIORITY_KEYWORDS: &[&str] = &["email", "mail"];

pub const LOW_PRIORITY_KEYWORDS: &[&str] = &["account", "identifier", "member", "customer"];

const HIGH_PRIORITY_POINTS: i32 = 100;
const MEDIUM_PRIORITY_POINTS: i32 = 50;
const LOW_PRIORITY_POINTS: i32 = 25;
const EMAIL_TYPE_POINTS: i32 = 30;
const FIRST_IN_LOGIN_FORM_POINTS: i32 = 20;

const NATIVE_PASSWORD_PRIORITY: i32 = 100;
const DISGUISED_PASSWORD_PRIORITY: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Username,
    Password,
}

/// A classified input, referenced by id rather than by live handle
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCandidate {
    pub element: ElementId,
    pub kind: FieldKind,
    pub rect: Rect,
    pub priority: i32,
    pub username_keyword: bool,
    pub email_keyword: bool,
}

/// How many fields of each kind were found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldCounts {
    pub password_fields: usize,
    pub username_fields: usize,
}

impl FieldCounts {
    pub fn is_empty(&self) -> bool {
        self.password_fields == 0 && self.username_fields == 0
    }
}

// Longest run of words joined to match a keyword ("mot de passe")
const MAX_JOINED_WORDS: usize = 3;

/// A keyword equals one descriptor word or a short run of adjacent words,
/// so "user_name" hits "username" while "compass" never hits "pass"
fn has_keyword(words: &[String], keywords: &[&str]) -> bool {
    (0..words.len()).any(|start| {
        let mut joined = String::new();
        words[start..].iter().take(MAX_JOINED_WORDS).any(|word| {
            joined.push_str(word);
            keywords.contains(&joined.as_str())
        })
    })
}

fn password_candidates(inputs: &[InputSnapshot]) -> Vec<FieldCandidate> {
    inputs
        .iter()
        .filter(|input| input.is_fillable())
        .filter_map(|input| {
            let priority = if input.kind == InputKind::Password {
                NATIVE_PASSWORD_PRIORITY
            } else if input.kind.is_text_like()
                && has_keyword(&input.descriptor_tokens(), PASSWORD_KEYWORDS)
            {
                debug!("Treating text input {} as a disguised password field", input.id);
                DISGUISED_PASSWORD_PRIORITY
            } else {
                return None;
            };

            Some(FieldCandidate {
                element: input.id,
                kind: FieldKind::Password,
                rect: input.rect,
                priority,
                username_keyword: false,
                email_keyword: false,
            })
        })
        .collect()
}

fn username_candidates(inputs: &[InputSnapshot], passwords: &[FieldCandidate]) -> Vec<FieldCandidate> {
    let password_ids: HashSet<ElementId> = passwords.iter().map(|p| p.element).collect();
    let login_forms: HashSet<FormId> = inputs
        .iter()
        .filter(|input| password_ids.contains(&input.id))
        .filter_map(|input| input.form)
        .collect();

    let mut seen_forms: HashSet<FormId> = HashSet::new();
    let mut scored: Vec<(usize, FieldCandidate)> = Vec::new();

    for (order, input) in inputs.iter().enumerate() {
        if password_ids.contains(&input.id) || !input.kind.is_username_like() {
            continue;
        }

        // Only text/email inputs compete for "first in the login form"
        let first_in_login_form = matches!(input.kind, InputKind::Text | InputKind::Email)
            && input
                .form
                .map(|form| login_forms.contains(&form) && seen_forms.insert(form))
                .unwrap_or(false);

        if !input.is_fillable() {
            continue;
        }

        let words = input.descriptor_tokens();
        let username_keyword = has_keyword(&words, HIGH_PRIORITY_KEYWORDS);
        let email_keyword = has_keyword(&words, MEDIUM_PRIORITY_KEYWORDS);

        let mut score = 0;
        if username_keyword {
            score += HIGH_PRIORITY_POINTS;
        }
        if email_keyword {
            score += MEDIUM_PRIORITY_POINTS;
        }
        if has_keyword(&words, LOW_PRIORITY_KEYWORDS) {
            score += LOW_PRIORITY_POINTS;
        }
        if input.kind == InputKind::Email {
            score += EMAIL_TYPE_POINTS;
        }
        if first_in_login_form {
            score += FIRST_IN_LOGIN_FORM_POINTS;
        }

        if score == 0 {
            continue;
        }

        scored.push((
            order,
            FieldCandidate {
                element: input.id,
                kind: FieldKind::Username,
                rect: input.rect,
                priority: score,
                username_keyword,
                email_keyword,
            },
        ));
    }

    scored.sort_by(|(order_a, a), (order_b, b)| rank(a, b).then(order_a.cmp(order_b)));
    scored.into_iter().map(|(_, candidate)| candidate).collect()
}

/// Higher score first; ties go to a username keyword, then an email
/// keyword
fn rank(a: &FieldCandidate, b: &FieldCandidate) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then(b.username_keyword.cmp(&a.username_keyword))
        .then(b.email_keyword.cmp(&a.email_keyword))
}

/// Every password-like input: native password inputs plus text inputs
/// whose name, id, placeholder or class mention a password keyword
pub fn classify_password_fields<P: PageDom + ?Sized>(page: &P) -> Vec<FieldCandidate> {
    password_candidates(&page.inputs())
}

/// Username candidates, best first
pub fn classify_username_fields<P: PageDom + ?Sized>(page: &P) -> Vec<FieldCandidate> {
    let inputs = page.inputs();
    let passwords = password_candidates(&inputs);
    username_candidates(&inputs, &passwords)
}

/// Latest classification of one page, with one active candidate per kind
#[derive(Debug, Default)]
pub struct FieldDetector {
    password_fields: Vec<FieldCandidate>,
    username_fields: Vec<FieldCandidate>,
    active_username: Option<FieldCandidate>,
    active_password: Option<FieldCandidate>,
    // Username field the user picked by focusing it
    pinned_username: Option<ElementId>,
}

impl FieldDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reclassify the page and pick the active candidates
    pub fn refresh<P: PageDom + ?Sized>(&mut self, page: &P) -> FieldCounts {
        let inputs = page.inputs();
        self.password_fields = password_candidates(&inputs);
        self.username_fields = username_candidates(&inputs, &self.password_fields);

        self.active_password = self
            .password_fields
            .iter()
            .min_by_key(|c| Reverse(c.priority))
            .cloned();

        let pinned = self
            .pinned_username
            .and_then(|id| self.username_fields.iter().find(|c| c.element == id));
        if pinned.is_none() {
            self.pinned_username = None;
        }
        self.active_username = pinned.or(self.username_fields.first()).cloned();

        let counts = self.counts();
        debug!(
            "Field detection: {} password, {} username candidates",
            counts.password_fields, counts.username_fields
        );
        counts
    }

    /// A focused username candidate becomes the active one
    pub fn note_focus(&mut self, id: ElementId) -> bool {
        match self.username_fields.iter().find(|c| c.element == id) {
            Some(candidate) => {
                self.pinned_username = Some(id);
                self.active_username = Some(candidate.clone());
                true
            }
            None => false,
        }
    }

    pub fn counts(&self) -> FieldCounts {
        FieldCounts {
            password_fields: self.password_fields.len(),
            username_fields: self.username_fields.len(),
        }
    }

    pub fn password_fields(&self) -> &[FieldCandidate] {
        &self.password_fields
    }

    pub fn username_fields(&self) -> &[FieldCandidate] {
        &self.username_fields
    }

    pub fn active_username(&self) -> Option<&FieldCandidate> {
        self.active_username.as_ref()
    }

    pub fn active_password(&self) -> Option<&FieldCandidate> {
        self.active_password.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{InputSpec, MemoryPage};

    #[test]
    fn test_no_fields_is_empty_not_error() {
        let page = MemoryPage::new();
        assert!(classify_password_fields(&page).is_empty());
        assert!(classify_username_fields(&page).is_empty());

        let mut detector = FieldDetector::new();
        assert!(detector.refresh(&page).is_empty());
        assert!(detector.active_username().is_none());
        assert!(detector.active_password().is_none());
    }

    #[test]
    fn test_disguised_password_fields_are_found() {
        let mut page = MemoryPage::new();
        let (native, _) = page.add_input(InputSpec::new(InputKind::Password).name("pw"));
        let (pin, _) = page.add_input(InputSpec::new(InputKind::Text).name("card_pin"));
        let (plain, _) = page.add_input(InputSpec::new(InputKind::Text).name("city"));
        let (_, _) = page.add_input(InputSpec::new(InputKind::Checkbox).name("remember_password"));

        let ids: Vec<ElementId> = classify_password_fields(&page).iter().map(|c| c.element).collect();
        assert_eq!(ids, vec![native, pin]);
        assert!(!ids.contains(&plain));
    }

    #[test]
    fn test_keywords_match_whole_words() {
        let mut page = MemoryPage::new();
        page.add_input(InputSpec::new(InputKind::Text).name("shipping_address"));
        page.add_input(InputSpec::new(InputKind::Text).name("compass"));
        page.add_input(InputSpec::new(InputKind::Text).class_name("spinner"));
        assert!(classify_password_fields(&page).is_empty());

        let (numbered, _) = page.add_input(InputSpec::new(InputKind::Text).name("password1"));
        let (french, _) = page.add_input(InputSpec::new(InputKind::Text).placeholder("Mot de passe"));
        let ids: Vec<ElementId> = classify_password_fields(&page).iter().map(|c| c.element).collect();
        assert_eq!(ids, vec![numbered, french]);
    }

    #[test]
    fn test_camel_case_names_hit_both_username_and_email() {
        let mut page = MemoryPage::new();
        let (field, _) = page.add_input(InputSpec::new(InputKind::Text).name("userEmail"));
        page.add_input(InputSpec::new(InputKind::Text).name("domain"));

        let ranked = classify_username_fields(&page);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].element, field);
        assert!(ranked[0].username_keyword);
        assert!(ranked[0].email_keyword);
        assert_eq!(ranked[0].priority, 100 + 50);
    }

    #[test]
    fn test_hidden_and_disabled_inputs_are_ignored() {
        let mut page = MemoryPage::new();
        page.add_input(InputSpec::new(InputKind::Password).hidden());
        page.add_input(InputSpec::new(InputKind::Text).name("username").disabled());
        assert!(classify_password_fields(&page).is_empty());
        assert!(classify_username_fields(&page).is_empty());
    }

    #[test]
    fn test_login_keyword_outranks_email() {
        let mut page = MemoryPage::new();
        let form = page.add_form();
        let (email, _) = page.add_input(InputSpec::new(InputKind::Text).name("email").in_form(form));
        let (login, _) = page.add_input(InputSpec::new(InputKind::Text).name("login_id").in_form(form));
        page.add_input(InputSpec::new(InputKind::Password).name("password").in_form(form));

        let ranked = classify_username_fields(&page);
        assert_eq!(ranked[0].element, login);
        assert_eq!(ranked[0].priority, 100);
        assert_eq!(ranked[1].element, email);
        assert_eq!(ranked[1].priority, 50 + 20);
    }

    #[test]
    fn test_tie_prefers_username_keyword() {
        let mut page = MemoryPage::new();
        let form = page.add_form();
        // 50 (email keyword) + 30 (email type) + 20 (first in login form)
        let (email, _) = page.add_input(InputSpec::new(InputKind::Email).name("email").in_form(form));
        let (login, _) = page.add_input(InputSpec::new(InputKind::Text).name("login_id").in_form(form));
        page.add_input(InputSpec::new(InputKind::Password).in_form(form));

        let ranked = classify_username_fields(&page);
        assert_eq!(ranked[0].priority, ranked[1].priority);
        assert_eq!(ranked[0].element, login);
        assert_eq!(ranked[1].element, email);
    }

    #[test]
    fn test_first_field_bonus_needs_a_password_in_the_form() {
        let mut page = MemoryPage::new();
        let search_form = page.add_form();
        page.add_input(InputSpec::new(InputKind::Text).name("q").in_form(search_form));
        assert!(classify_username_fields(&page).is_empty());

        let login_form = page.add_form();
        let (first, _) = page.add_input(InputSpec::new(InputKind::Text).name("q2").in_form(login_form));
        page.add_input(InputSpec::new(InputKind::Text).name("q3").in_form(login_form));
        page.add_input(InputSpec::new(InputKind::Password).in_form(login_form));

        let ranked = classify_username_fields(&page);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].element, first);
        assert_eq!(ranked[0].priority, 20);
    }

    #[test]
    fn test_equal_candidates_keep_document_order() {
        let mut page = MemoryPage::new();
        let (a, _) = page.add_input(InputSpec::new(InputKind::Text).placeholder("Your username"));
        let (b, _) = page.add_input(InputSpec::new(InputKind::Text).class_name("user-field"));
        let ranked = classify_username_fields(&page);
        assert_eq!(
            ranked.iter().map(|c| c.element).collect::<Vec<_>>(),
            vec![a, b]
        );
    }

    #[test]
    fn test_detector_keeps_one_active_candidate_and_honours_focus() {
        let mut page = MemoryPage::new();
        let (user, _) = page.add_input(InputSpec::new(InputKind::Text).name("username"));
        let (mail, _) = page.add_input(InputSpec::new(InputKind::Email).name("email"));
        let (pw, _) = page.add_input(InputSpec::new(InputKind::Password));

        let mut detector = FieldDetector::new();
        let counts = detector.refresh(&page);
        assert_eq!(counts, FieldCounts { password_fields: 1, username_fields: 2 });
        assert_eq!(detector.active_username().unwrap().element, user);
        assert_eq!(detector.active_password().unwrap().element, pw);

        assert!(detector.note_focus(mail));
        assert_eq!(detector.active_username().unwrap().element, mail);
        assert!(!detector.note_focus(pw));

        // Pin survives reclassification while the field exists
        detector.refresh(&page);
        assert_eq!(detector.active_username().unwrap().element, mail);

        page.remove(mail);
        detector.refresh(&page);
        assert_eq!(detector.active_username().unwrap().element, user);
    }
}
