//! The Element Model: an opaque UI node exposing fallible reads and a single
//! mutation primitive.
//!
//! Handles are only valid for one query. Nothing in this crate caches an
//! element across calls; every extraction starts again from a fresh root.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AxError;

/// Coarse capability tag of a UI element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Application,
    Window,
    Group,
    ScrollArea,
    LayoutArea,
    LayoutItem,
    StaticText,
    Button,
    MenuButton,
    CheckBox,
    Slider,
    TextField,
    PopUpButton,
    Other(String),
}

impl Role {
    /// Map an accessibility role string (`AXSlider`, ...) to a role.
    pub fn from_ax(role: &str) -> Self {
        match role {
            "AXApplication" => Role::Application,
            "AXWindow" => Role::Window,
            "AXGroup" => Role::Group,
            "AXScrollArea" => Role::ScrollArea,
            "AXLayoutArea" => Role::LayoutArea,
            "AXLayoutItem" => Role::LayoutItem,
            "AXStaticText" => Role::StaticText,
            "AXButton" => Role::Button,
            "AXMenuButton" => Role::MenuButton,
            "AXCheckBox" => Role::CheckBox,
            "AXSlider" => Role::Slider,
            "AXTextField" => Role::TextField,
            "AXPopUpButton" => Role::PopUpButton,
            other => Role::Other(other.to_string()),
        }
    }

    pub fn as_ax(&self) -> &str {
        match self {
            Role::Application => "AXApplication",
            Role::Window => "AXWindow",
            Role::Group => "AXGroup",
            Role::ScrollArea => "AXScrollArea",
            Role::LayoutArea => "AXLayoutArea",
            Role::LayoutItem => "AXLayoutItem",
            Role::StaticText => "AXStaticText",
            Role::Button => "AXButton",
            Role::MenuButton => "AXMenuButton",
            Role::CheckBox => "AXCheckBox",
            Role::Slider => "AXSlider",
            Role::TextField => "AXTextField",
            Role::PopUpButton => "AXPopUpButton",
            Role::Other(other) => other,
        }
    }

    /// Roles whose value can be assigned through [`Element::set_value`].
    pub fn is_writable(&self) -> bool {
        matches!(self, Role::Slider | Role::TextField)
    }
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        Role::from_ax(&role)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_ax().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ax())
    }
}

/// Loosely typed element value. Interpretation depends on the element's role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ElementValue {
    /// Text form used in extracted records. Booleans render as `1`/`0` and
    /// integral numbers without a fractional part.
    pub fn as_text(&self) -> String {
        match self {
            ElementValue::Bool(b) => String::from(if *b { "1" } else { "0" }),
            ElementValue::Number(n) => format_number(*n),
            ElementValue::Text(s) => s.clone(),
        }
    }

    /// Checkbox interpretation: non-zero numbers and `1`/`true`/`on` are set.
    pub fn is_truthy(&self) -> bool {
        match self {
            ElementValue::Bool(b) => *b,
            ElementValue::Number(n) => n.is_finite() && *n != 0.0,
            ElementValue::Text(s) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("true")
                    || s.eq_ignore_ascii_case("on")
                    || s
                        .parse::<f64>()
                        .map(|n| n.is_finite() && n != 0.0)
                        .unwrap_or(false)
            }
        }
    }

    /// Slider interpretation, rounded to the nearest integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ElementValue::Bool(b) => Some(i64::from(*b)),
            ElementValue::Number(n) if n.is_finite() => Some(n.round() as i64),
            ElementValue::Number(_) => None,
            ElementValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(|n| n.round() as i64),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A value already converted to the representation a role expects.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteValue {
    Number(f64),
    Text(String),
}

impl WriteValue {
    /// Convert caller text to the representation `role` expects: numeric for
    /// sliders, text for text fields. Every other role rejects assignment.
    pub fn coerce(role: &Role, raw: &str) -> Result<Self, AxError> {
        match role {
            Role::Slider => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(WriteValue::Number)
                .ok_or_else(|| AxError::TypeMismatch {
                    role: role.to_string(),
                    value: raw.to_string(),
                }),
            Role::TextField => Ok(WriteValue::Text(raw.to_string())),
            other => Err(AxError::ControlNotWritable {
                role: other.to_string(),
            }),
        }
    }
}

impl From<WriteValue> for ElementValue {
    fn from(value: WriteValue) -> Self {
        match value {
            WriteValue::Number(n) => ElementValue::Number(n),
            WriteValue::Text(s) => ElementValue::Text(s),
        }
    }
}

impl fmt::Display for WriteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteValue::Number(n) => f.write_str(&format_number(*n)),
            WriteValue::Text(s) => f.write_str(s),
        }
    }
}

/// A transient read handle on one node of the host's UI hierarchy.
///
/// All reads are fallible and return `None` when the attribute is absent or
/// the host refuses to answer. Child order is significant: it mirrors the
/// host's layout and therefore track order.
pub trait Element: Clone {
    fn role(&self) -> Option<Role>;
    fn title(&self) -> Option<String>;
    fn description(&self) -> Option<String>;
    fn value(&self) -> Option<ElementValue>;
    fn children(&self) -> Vec<Self>;

    /// Store a value that [`WriteValue::coerce`] already accepted for this role.
    fn write_value(&self, value: &WriteValue) -> Result<(), AxError>;

    /// Top-level windows below an application root.
    fn windows(&self) -> Vec<Self> {
        self.children()
            .into_iter()
            .filter(|child| child.role() == Some(Role::Window))
            .collect()
    }

    /// Semantic name: a non-empty description, else a non-empty title.
    fn label(&self) -> Option<String> {
        self.description()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| self.title().filter(|t| !t.trim().is_empty()))
    }

    /// Assign `raw` to this element's value, converted for its role.
    fn set_value(&self, raw: &str) -> Result<WriteValue, AxError> {
        let role = self
            .role()
            .ok_or_else(|| AxError::ControlNotWritable {
                role: "unknown".to_string(),
            })?;
        let value = WriteValue::coerce(&role, raw)?;
        self.write_value(&value)?;
        Ok(value)
    }
}
