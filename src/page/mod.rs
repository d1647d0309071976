//! Host Page Model
//!
//! The classifier and the autofill code never hold on to live elements.
//! They see `InputSnapshot`s and address elements through a synthetic
//! `ElementId`; every write looks the element up again and fails with
//! `ElementDetached` when page scripts have removed or replaced it.

pub mod memory;

pub use memory::{InputSpec, MemoryPage};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable synthetic identifier of an input element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "el-{}", self.0)
    }
}

/// Identifier of a `<form>` element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormId(pub u64);

/// The semantic `type` of an input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Email,
    Search,
    Tel,
    Url,
    Number,
    Password,
    Hidden,
    Checkbox,
    Radio,
    Submit,
    Other,
}

impl InputKind {
    /// Map an HTML `type` attribute; a missing or unknown type is text,
    /// as browsers treat it
    pub fn from_type_attr(attr: &str) -> Self {
        match attr.trim().to_lowercase().as_str() {
            "email" => InputKind::Email,
            "search" => InputKind::Search,
            "tel" => InputKind::Tel,
            "url" => InputKind::Url,
            "number" => InputKind::Number,
            "password" => InputKind::Password,
            "hidden" => InputKind::Hidden,
            "checkbox" => InputKind::Checkbox,
            "radio" => InputKind::Radio,
            "submit" | "button" | "reset" | "image" => InputKind::Submit,
            "file" | "color" | "range" | "date" | "datetime-local" | "month" | "time"
            | "week" => InputKind::Other,
            _ => InputKind::Text,
        }
    }

    /// Accepts free-form typed text
    pub fn is_text_like(&self) -> bool {
        matches!(
            self,
            InputKind::Text | InputKind::Email | InputKind::Search | InputKind::Tel | InputKind::Url
        )
    }

    /// Could plausibly hold a username
    pub fn is_username_like(&self) -> bool {
        matches!(self, InputKind::Text | InputKind::Email | InputKind::Search)
    }
}

/// Element geometry in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Read-only view of an input element at one moment
#[derive(Debug, Clone, PartialEq)]
pub struct InputSnapshot {
    pub id: ElementId,
    pub kind: InputKind,
    pub name: String,
    pub html_id: String,
    pub placeholder: String,
    pub class_name: String,
    pub value: String,
    pub form: Option<FormId>,
    pub rect: Rect,
    pub visible: bool,
    pub disabled: bool,
}

impl InputSnapshot {
    /// Lowercased words of the name, id, placeholder and class, split on
    /// punctuation, camelCase humps and letter/digit changes
    pub fn descriptor_tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        for text in [
            self.name.as_str(),
            self.html_id.as_str(),
            self.placeholder.as_str(),
            self.class_name.as_str(),
        ] {
            split_words(text, &mut tokens);
        }
        tokens
    }

    /// Can receive a value from autofill
    pub fn is_fillable(&self) -> bool {
        self.visible && !self.disabled
    }
}

fn split_words(text: &str, tokens: &mut Vec<String>) {
    let mut current = String::new();
    let mut prev: Option<char> = None;

    for c in text.chars() {
        if !c.is_alphanumeric() {
            flush_word(&mut current, tokens);
            prev = None;
            continue;
        }
        if let Some(p) = prev {
            let hump = p.is_lowercase() && c.is_uppercase();
            let digit_edge = p.is_numeric() != c.is_numeric();
            if hump || digit_edge {
                flush_word(&mut current, tokens);
            }
        }
        current.extend(c.to_lowercase());
        prev = Some(c);
    }
    flush_word(&mut current, tokens);
}

fn flush_word(current: &mut String, tokens: &mut Vec<String>) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

/// Events synthesized so both form serialization and framework
/// listeners notice a programmatic value change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomEvent {
    Focus,
    Input,
    Change,
    KeyUp,
    Blur,
}

impl DomEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomEvent::Focus => "focus",
            DomEvent::Input => "input",
            DomEvent::Change => "change",
            DomEvent::KeyUp => "keyup",
            DomEvent::Blur => "blur",
        }
    }
}

/// DOM mutation notice, as delivered by the page's mutation observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Nodes were inserted; lists the kinds of inputs among them
    Added(Vec<InputKind>),
    /// A number of nodes were removed
    Removed(usize),
}

impl Mutation {
    /// Adds an input the classifier could care about
    pub fn adds_candidate_input(&self) -> bool {
        match self {
            Mutation::Added(kinds) => kinds
                .iter()
                .any(|k| *k == InputKind::Password || k.is_text_like()),
            Mutation::Removed(_) => false,
        }
    }
}

/// Access to the host page's inputs
///
/// Reads never fail: a torn-down page simply has no inputs. Writes
/// re-validate their target first.
pub trait PageDom {
    /// All inputs in document order
    fn inputs(&self) -> Vec<InputSnapshot>;

    /// Look an element up again by id
    fn input(&self, id: ElementId) -> Option<InputSnapshot>;

    fn set_value(&mut self, id: ElementId, value: &str) -> Result<()>;

    fn focus(&mut self, id: ElementId) -> Result<()>;

    fn dispatch(&mut self, id: ElementId, event: DomEvent) -> Result<()>;

    /// Inline style attribute
    fn style(&self, id: ElementId) -> Option<String>;

    fn set_style(&mut self, id: ElementId, style: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_attr_mapping() {
        assert_eq!(InputKind::from_type_attr("PASSWORD"), InputKind::Password);
        assert_eq!(InputKind::from_type_attr(""), InputKind::Text);
        assert_eq!(InputKind::from_type_attr("made-up"), InputKind::Text);
        assert_eq!(InputKind::from_type_attr("button"), InputKind::Submit);
        assert!(InputKind::Tel.is_text_like());
        assert!(!InputKind::Tel.is_username_like());
        assert!(!InputKind::Password.is_text_like());
    }

    fn words(text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        split_words(text, &mut tokens);
        tokens
    }

    #[test]
    fn test_descriptor_words() {
        assert_eq!(words("userEmail"), vec!["user", "email"]);
        assert_eq!(words("card_pin"), vec!["card", "pin"]);
        assert_eq!(words("password1"), vec!["password", "1"]);
        assert_eq!(words("  Your username "), vec!["your", "username"]);
        assert_eq!(words("LOGIN-ID"), vec!["login", "id"]);
        assert_eq!(words("compass"), vec!["compass"]);
        assert!(words("--").is_empty());
    }

    #[test]
    fn test_mutation_qualifies_only_for_inputs_of_interest() {
        assert!(Mutation::Added(vec![InputKind::Checkbox, InputKind::Password]).adds_candidate_input());
        assert!(!Mutation::Added(vec![InputKind::Hidden]).adds_candidate_input());
        assert!(!Mutation::Added(vec![]).adds_candidate_input());
        assert!(!Mutation::Removed(3).adds_candidate_input());
    }
}
