//! Core data types for page interactions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Anchor descriptor for element targeting
///
/// Represents different strategies for locating elements:
/// - CSS selector
/// - ARIA role + accessible name (case-insensitive, partial)
/// - Text content matching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorDescriptor {
    /// CSS selector
    Css(String),

    /// ARIA role and accessible name
    Aria { role: String, name: String },

    /// Text content (exact or partial match)
    Text { content: String, exact: bool },
}

impl AnchorDescriptor {
    pub fn css(selector: impl Into<String>) -> Self {
        AnchorDescriptor::Css(selector.into())
    }

    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        AnchorDescriptor::Aria {
            role: role.into(),
            name: name.into(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        AnchorDescriptor::Text {
            content: content.into(),
            exact: false,
        }
    }

    /// Whether a visible label satisfies this anchor's text part.
    ///
    /// CSS anchors carry no text and never match here.
    pub fn matches_label(&self, label: &str) -> bool {
        let label = normalize(label);
        match self {
            AnchorDescriptor::Css(_) => false,
            AnchorDescriptor::Aria { name, .. } => label.contains(&normalize(name)),
            AnchorDescriptor::Text { content, exact } => {
                if *exact {
                    label == normalize(content)
                } else {
                    label.contains(&normalize(content))
                }
            }
        }
    }
}

impl fmt::Display for AnchorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorDescriptor::Css(s) => write!(f, "css:{s}"),
            AnchorDescriptor::Aria { role, name } => write!(f, "aria:{role}[name~='{name}']"),
            AnchorDescriptor::Text { content, exact } => {
                if *exact {
                    write!(f, "text:exact:'{content}'")
                } else {
                    write!(f, "text:partial:'{content}'")
                }
            }
        }
    }
}

/// Lowercased, whitespace-collapsed form used for all label comparisons.
pub fn normalize(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A located element, addressable by a selector that stays valid until the
/// next navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub selector: String,
    pub anchor: AnchorDescriptor,
}

impl ElementRef {
    pub fn new(selector: impl Into<String>, anchor: AnchorDescriptor) -> Self {
        Self {
            selector: selector.into(),
            anchor,
        }
    }
}

/// One input/select/textarea on the current document, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    /// Position in document order
    pub index: usize,

    /// Lowercase tag name (`input`, `select`, `textarea`)
    pub tag: String,

    pub name: String,
    pub id: String,
    pub placeholder: String,
    pub aria_label: String,

    /// Text of the associated `<label>`, if any
    pub label: String,

    /// Selector that addresses exactly this field
    pub selector: String,
}

impl FormField {
    /// Text the field matcher searches for category keys.
    pub fn haystack(&self) -> String {
        normalize(&format!(
            "{} {} {} {} {}",
            self.name, self.id, self.placeholder, self.aria_label, self.label
        ))
    }

    pub fn is_select(&self) -> bool {
        self.tag.eq_ignore_ascii_case("select")
    }

    pub fn element(&self) -> ElementRef {
        ElementRef::new(
            self.selector.clone(),
            AnchorDescriptor::Css(self.selector.clone()),
        )
    }
}
