//! Locator variants
//!
//! A [`LocatorSet`] is an ordered list of alternative anchors for one logical
//! control. Role lookups come first, text fallbacks second, so synonyms such
//! as "Log in" / "Sign in" are just more entries in the list.

use serde::{Deserialize, Serialize};

use crate::types::AnchorDescriptor;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocatorSet {
    variants: Vec<AnchorDescriptor>,
}

impl LocatorSet {
    pub fn new(variants: Vec<AnchorDescriptor>) -> Self {
        Self { variants }
    }

    /// Role-based anchors for every label, followed by text anchors for every
    /// label. Blank labels are dropped.
    pub fn labeled<S: AsRef<str>>(role: &str, labels: &[S]) -> Self {
        let labels: Vec<&str> = labels
            .iter()
            .map(|l| l.as_ref().trim())
            .filter(|l| !l.is_empty())
            .collect();
        let roles = labels.iter().map(|l| AnchorDescriptor::role(role, *l));
        let texts = labels.iter().map(|l| AnchorDescriptor::text(*l));
        Self {
            variants: roles.chain(texts).collect(),
        }
    }

    /// Role-based anchors only, for controls that must never resolve to
    /// stray page text such as consent dialog buttons.
    pub fn roles<S: AsRef<str>>(role: &str, labels: &[S]) -> Self {
        Self {
            variants: labels
                .iter()
                .map(|l| l.as_ref().trim())
                .filter(|l| !l.is_empty())
                .map(|l| AnchorDescriptor::role(role, l))
                .collect(),
        }
    }

    /// Text-only anchors, for non-interactive content such as confirmations.
    pub fn text<S: AsRef<str>>(labels: &[S]) -> Self {
        Self {
            variants: labels
                .iter()
                .map(|l| l.as_ref().trim())
                .filter(|l| !l.is_empty())
                .map(AnchorDescriptor::text)
                .collect(),
        }
    }

    pub fn css<S: AsRef<str>>(selectors: &[S]) -> Self {
        Self {
            variants: selectors
                .iter()
                .map(|s| AnchorDescriptor::css(s.as_ref()))
                .collect(),
        }
    }

    /// Append `other`'s variants after this set's own.
    pub fn or(mut self, other: LocatorSet) -> Self {
        self.variants.extend(other.variants);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnchorDescriptor> {
        self.variants.iter()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Compact description for log lines.
    pub fn describe(&self) -> String {
        self.variants
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
