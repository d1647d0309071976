//! In-memory page document
//!
//! Backs the demo command and the tests. Page scripts are simulated by
//! adding, replacing and removing inputs; each call returns the
//! `Mutation` a real mutation observer would report.

use super::{DomEvent, ElementId, FormId, InputKind, InputSnapshot, Mutation, PageDom, Rect};
use crate::error::{GestureVaultError, Result};

/// Builder for an input element
#[derive(Debug, Clone)]
pub struct InputSpec {
    kind: InputKind,
    name: String,
    html_id: String,
    placeholder: String,
    class_name: String,
    value: String,
    form: Option<FormId>,
    rect: Rect,
    visible: bool,
    disabled: bool,
}

impl InputSpec {
    pub fn new(kind: InputKind) -> Self {
        Self {
            kind,
            name: String::new(),
            html_id: String::new(),
            placeholder: String::new(),
            class_name: String::new(),
            value: String::new(),
            form: None,
            rect: Rect::new(0.0, 0.0, 200.0, 32.0),
            visible: true,
            disabled: false,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn html_id(mut self, id: &str) -> Self {
        self.html_id = id.to_string();
        self
    }

    pub fn placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = placeholder.to_string();
        self
    }

    pub fn class_name(mut self, class_name: &str) -> Self {
        self.class_name = class_name.to_string();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn in_form(mut self, form: FormId) -> Self {
        self.form = Some(form);
        self
    }

    pub fn at(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

#[derive(Debug)]
struct PageElement {
    snapshot: InputSnapshot,
    style: String,
}

#[derive(Debug, Default)]
pub struct MemoryPage {
    next_id: u64,
    next_form: u64,
    elements: Vec<PageElement>,
    events: Vec<(ElementId, DomEvent)>,
    focused: Option<ElementId>,
    unloaded: bool,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_form(&mut self) -> FormId {
        self.next_form += 1;
        FormId(self.next_form)
    }

    /// Append an input at the end of the document
    pub fn add_input(&mut self, spec: InputSpec) -> (ElementId, Mutation) {
        let kind = spec.kind;
        let id = self.insert_at(self.elements.len(), spec);
        (id, Mutation::Added(vec![kind]))
    }

    /// Append several inputs in one batch, as a framework render would
    pub fn add_inputs(&mut self, specs: Vec<InputSpec>) -> (Vec<ElementId>, Mutation) {
        let kinds = specs.iter().map(|s| s.kind).collect();
        let ids = specs
            .into_iter()
            .map(|spec| self.insert_at(self.elements.len(), spec))
            .collect();
        (ids, Mutation::Added(kinds))
    }

    /// Swap an element for a fresh one in the same position
    pub fn replace(&mut self, id: ElementId, spec: InputSpec) -> Option<(ElementId, Mutation)> {
        let index = self.index_of(id)?;
        let kind = spec.kind;
        self.elements.remove(index);
        if self.focused == Some(id) {
            self.focused = None;
        }
        let new_id = self.insert_at(index, spec);
        Some((new_id, Mutation::Added(vec![kind])))
    }

    pub fn remove(&mut self, id: ElementId) -> Mutation {
        let before = self.elements.len();
        self.elements.retain(|e| e.snapshot.id != id);
        if self.focused == Some(id) {
            self.focused = None;
        }
        Mutation::Removed(before - self.elements.len())
    }

    /// Simulate navigation: everything goes away
    pub fn unload(&mut self) {
        self.unloaded = true;
        self.elements.clear();
        self.focused = None;
    }

    pub fn value(&self, id: ElementId) -> Option<String> {
        self.find(id).map(|e| e.snapshot.value.clone())
    }

    pub fn focused(&self) -> Option<ElementId> {
        self.focused
    }

    /// Events dispatched to one element, in order
    pub fn events_for(&self, id: ElementId) -> Vec<DomEvent> {
        self.events
            .iter()
            .filter(|(target, _)| *target == id)
            .map(|(_, event)| *event)
            .collect()
    }

    fn insert_at(&mut self, index: usize, spec: InputSpec) -> ElementId {
        self.next_id += 1;
        let id = ElementId(self.next_id);
        let snapshot = InputSnapshot {
            id,
            kind: spec.kind,
            name: spec.name,
            html_id: spec.html_id,
            placeholder: spec.placeholder,
            class_name: spec.class_name,
            value: spec.value,
            form: spec.form,
            rect: spec.rect,
            visible: spec.visible,
            disabled: spec.disabled,
        };
        self.elements.insert(
            index,
            PageElement {
                snapshot,
                style: String::new(),
            },
        );
        id
    }

    fn index_of(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.snapshot.id == id)
    }

    fn find(&self, id: ElementId) -> Option<&PageElement> {
        self.elements.iter().find(|e| e.snapshot.id == id)
    }

    fn find_mut(&mut self, id: ElementId) -> Result<&mut PageElement> {
        if self.unloaded {
            return Err(GestureVaultError::PageUnloaded);
        }
        self.elements
            .iter_mut()
            .find(|e| e.snapshot.id == id)
            .ok_or(GestureVaultError::ElementDetached(id))
    }
}

impl PageDom for MemoryPage {
    fn inputs(&self) -> Vec<InputSnapshot> {
        self.elements.iter().map(|e| e.snapshot.clone()).collect()
    }

    fn input(&self, id: ElementId) -> Option<InputSnapshot> {
        self.find(id).map(|e| e.snapshot.clone())
    }

    fn set_value(&mut self, id: ElementId, value: &str) -> Result<()> {
        self.find_mut(id)?.snapshot.value = value.to_string();
        Ok(())
    }

    fn focus(&mut self, id: ElementId) -> Result<()> {
        self.find_mut(id)?;
        self.focused = Some(id);
        self.events.push((id, DomEvent::Focus));
        Ok(())
    }

    fn dispatch(&mut self, id: ElementId, event: DomEvent) -> Result<()> {
        self.find_mut(id)?;
        if event == DomEvent::Blur && self.focused == Some(id) {
            self.focused = None;
        }
        self.events.push((id, event));
        Ok(())
    }

    fn style(&self, id: ElementId) -> Option<String> {
        self.find(id).map(|e| e.style.clone())
    }

    fn set_style(&mut self, id: ElementId, style: &str) -> Result<()> {
        self.find_mut(id)?.style = style.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_keeps_position_and_detaches_old_id() {
        let mut page = MemoryPage::new();
        let (a, _) = page.add_input(InputSpec::new(InputKind::Text).name("a"));
        let (b, _) = page.add_input(InputSpec::new(InputKind::Text).name("b"));

        let (a2, mutation) = page
            .replace(a, InputSpec::new(InputKind::Email).name("a2"))
            .unwrap();
        assert_eq!(mutation, Mutation::Added(vec![InputKind::Email]));

        let order: Vec<ElementId> = page.inputs().iter().map(|s| s.id).collect();
        assert_eq!(order, vec![a2, b]);
        assert!(matches!(
            page.set_value(a, "x"),
            Err(GestureVaultError::ElementDetached(id)) if id == a
        ));
    }

    #[test]
    fn test_unloaded_page_refuses_writes() {
        let mut page = MemoryPage::new();
        let (a, _) = page.add_input(InputSpec::new(InputKind::Password));
        page.unload();
        assert!(page.inputs().is_empty());
        assert!(matches!(page.focus(a), Err(GestureVaultError::PageUnloaded)));
    }

    #[test]
    fn test_events_are_recorded_per_element() {
        let mut page = MemoryPage::new();
        let (a, _) = page.add_input(InputSpec::new(InputKind::Text));
        page.focus(a).unwrap();
        page.dispatch(a, DomEvent::Blur).unwrap();
        assert_eq!(page.events_for(a), vec![DomEvent::Focus, DomEvent::Blur]);
        assert_eq!(page.focused(), None);
    }
}
