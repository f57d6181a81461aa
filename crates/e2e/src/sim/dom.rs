//! Minimal element tree: elements addressed by id

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{E2eError, E2eResult};
use crate::page::ElementState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    TextInput,
    /// `<input type="number">`: only numeric text can be typed
    NumberInput,
    Select { options: Vec<String> },
    Button,
    Region,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub kind: ElementKind,
    pub visible: bool,
    pub text: String,
    pub value: String,
    pub classes: BTreeSet<String>,
    pub disabled: bool,
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            visible: true,
            text: String::new(),
            value: String::new(),
            classes: BTreeSet::new(),
            disabled: false,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.insert(class.to_string());
        self
    }

    pub fn show(&mut self, text: String) {
        self.visible = true;
        self.text = text;
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.text.clear();
    }

    pub fn set_class(&mut self, class: &str, on: bool) {
        if on {
            self.classes.insert(class.to_string());
        } else {
            self.classes.remove(class);
        }
    }

    pub fn state(&self) -> ElementState {
        ElementState {
            visible: self.visible,
            text: self.text.clone(),
            value: self.value.clone(),
            classes: self.classes.iter().cloned().collect(),
            disabled: self.disabled,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    elements: BTreeMap<String, Element>,
}

impl Document {
    pub fn insert(&mut self, id: &str, element: Element) {
        self.elements.insert(id.to_string(), element);
    }

    pub fn get(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    /// Look up by `#id` selector; `Ok(None)` when the id is absent
    pub fn query(&self, selector: &str) -> E2eResult<Option<&Element>> {
        Ok(self.elements.get(element_id(selector)?))
    }
}

/// The id part of a `#id` selector
pub fn element_id(selector: &str) -> E2eResult<&str> {
    match selector.strip_prefix('#') {
        Some(id) if !id.is_empty() && !id.contains([' ', '.', '[', '>', ':']) => Ok(id),
        _ => Err(E2eError::action(
            selector,
            "the simulated page only resolves #id selectors",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_id() {
        assert_eq!(element_id("#plot-name").unwrap(), "plot-name");
        assert!(element_id("plot-name").is_err());
        assert!(element_id("#form .input").is_err());
        assert!(element_id("#").is_err());
    }

    #[test]
    fn test_state_snapshot() {
        let mut element = Element::new(ElementKind::NumberInput).with_class("form-input");
        element.set_class("error", true);
        element.value = "0".to_string();

        let state = element.state();
        assert_eq!(state.classes, vec!["error", "form-input"]);
        assert_eq!(state.value, "0");

        element.set_class("error", false);
        assert_eq!(element.state().class_attribute(), "form-input");
    }
}
