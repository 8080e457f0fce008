//! Serializable copies of an element subtree.
//!
//! A snapshot is what `query` prints, and what [`crate::MemoryElement`]
//! replays, so a tree captured on one machine can drive the extraction
//! pipeline anywhere.

use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementValue, Role};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ElementValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementSnapshot>,
}

impl ElementSnapshot {
    pub fn new(role: Role) -> Self {
        Self {
            role: Some(role),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn value(mut self, value: impl Into<ElementValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn child(mut self, child: ElementSnapshot) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = ElementSnapshot>) -> Self {
        self.children.extend(children);
        self
    }

    /// Copy `element` and its descendants down to `max_depth` levels below it.
    pub fn capture<E: Element>(element: &E, max_depth: usize) -> Self {
        let children = if max_depth == 0 {
            Vec::new()
        } else {
            element
                .children()
                .iter()
                .map(|child| Self::capture(child, max_depth - 1))
                .collect()
        };

        Self {
            role: element.role(),
            title: element.title(),
            description: element.description(),
            value: element.value(),
            children,
        }
    }
}

impl From<&str> for ElementValue {
    fn from(value: &str) -> Self {
        ElementValue::Text(value.to_string())
    }
}

impl From<String> for ElementValue {
    fn from(value: String) -> Self {
        ElementValue::Text(value)
    }
}

impl From<f64> for ElementValue {
    fn from(value: f64) -> Self {
        ElementValue::Number(value)
    }
}

impl From<bool> for ElementValue {
    fn from(value: bool) -> Self {
        ElementValue::Bool(value)
    }
}
