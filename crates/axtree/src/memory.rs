//! In-memory element tree built from a snapshot.

use std::cell::RefCell;
use std::rc::Rc;

use crate::element::{Element, ElementValue, Role, WriteValue};
use crate::error::AxError;
use crate::snapshot::ElementSnapshot;

/// An [`Element`] backed by plain data. Values written through it are kept,
/// so a test (or a replay) can observe the effect of a mutation.
#[derive(Debug, Clone)]
pub struct MemoryElement(Rc<Node>);

#[derive(Debug)]
struct Node {
    role: Option<Role>,
    title: Option<String>,
    description: Option<String>,
    value: RefCell<Option<ElementValue>>,
    children: Vec<MemoryElement>,
}

impl MemoryElement {
    /// Current state of this subtree, including any values written since it was built.
    pub fn snapshot(&self, max_depth: usize) -> ElementSnapshot {
        ElementSnapshot::capture(self, max_depth)
    }
}

impl From<ElementSnapshot> for MemoryElement {
    fn from(snapshot: ElementSnapshot) -> Self {
        MemoryElement(Rc::new(Node {
            role: snapshot.role,
            title: snapshot.title,
            description: snapshot.description,
            value: RefCell::new(snapshot.value),
            children: snapshot.children.into_iter().map(MemoryElement::from).collect(),
        }))
    }
}

impl Element for MemoryElement {
    fn role(&self) -> Option<Role> {
        self.0.role.clone()
    }

    fn title(&self) -> Option<String> {
        self.0.title.clone()
    }

    fn description(&self) -> Option<String> {
        self.0.description.clone()
    }

    fn value(&self) -> Option<ElementValue> {
        self.0.value.borrow().clone()
    }

    fn children(&self) -> Vec<Self> {
        self.0.children.clone()
    }

    fn write_value(&self, value: &WriteValue) -> Result<(), AxError> {
        match &self.0.role {
            Some(role) if role.is_writable() => {
                *self.0.value.borrow_mut() = Some(value.clone().into());
                Ok(())
            }
            other => Err(AxError::ControlNotWritable {
                role: other
                    .as_ref()
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            }),
        }
    }
}
