//! Site profile
//!
//! Everything site-specific the flow needs: where to start, how to recognise
//! each control, which texts to look for and how long to wait. Loaded from YAML
//! with every missing key falling back to the built-in profile.

use action_primitives::{dialogs::millis, DialogProfile, FieldCategory, LocatorSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_START_URL: &str = "https://www.goethe.de/ins/ke/en/spr/prf/gzb2.cfm";
pub const CONFIRMATION_TEXT: &str = "You will receive email confirmation of your booking.";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Failed to read profile: {0}")]
    Io(String),

    #[error("Invalid profile: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowTimings {
    /// How long one poll cycle watches for the gate
    #[serde(with = "millis")]
    pub observe_window: Duration,

    /// Sub-poll interval inside the observation window, and the post-navigation settle
    #[serde(with = "millis")]
    pub step_wait: Duration,

    /// Upper bound of the pre-reload jitter
    #[serde(with = "millis")]
    pub max_jitter: Duration,

    #[serde(with = "millis")]
    pub lookup_timeout: Duration,

    #[serde(with = "millis")]
    pub confirmation_timeout: Duration,
}

impl Default for FlowTimings {
    fn default() -> Self {
        Self {
            observe_window: Duration::from_millis(5_000),
            step_wait: Duration::from_millis(200),
            max_jitter: Duration::from_millis(800),
            lookup_timeout: Duration::from_millis(5_000),
            confirmation_timeout: Duration::from_millis(30_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    pub start_url: String,

    /// Any visible variant means booking has opened
    pub gate: LocatorSet,

    pub continue_button: LocatorSet,
    pub book_for_myself: LocatorSet,
    pub email_inputs: LocatorSet,
    pub password_inputs: LocatorSet,
    pub login_submit: LocatorSet,
    pub order_button: LocatorSet,
    pub confirmation: LocatorSet,

    /// Per-category key overrides for the personal-details matcher
    pub field_keys: BTreeMap<FieldCategory, Vec<String>>,

    pub dialogs: DialogProfile,
    pub timings: FlowTimings,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            start_url: DEFAULT_START_URL.to_string(),
            gate: LocatorSet::labeled("button", &["select modules"])
                .or(LocatorSet::css(&[".pr-buttons button:not([disabled])"])),
            continue_button: LocatorSet::labeled("button", &["continue"]),
            book_for_myself: LocatorSet::labeled("button", &["book for myself"]),
            email_inputs: LocatorSet::css(&["input[type=email]", "#email", "input[name=email]"]),
            password_inputs: LocatorSet::css(&[
                "input[type=password]",
                "#password",
                "input[name=password]",
            ]),
            login_submit: LocatorSet::labeled("button", &["log in", "login", "sign in", "log-in"]),
            order_button: LocatorSet::labeled("button", &["order, subject to change"]),
            confirmation: LocatorSet::text(&[CONFIRMATION_TEXT]),
            field_keys: BTreeMap::new(),
            dialogs: DialogProfile::default(),
            timings: FlowTimings::default(),
        }
    }
}

impl SiteProfile {
    pub fn from_yaml_str(content: &str) -> Result<Self, ProfileError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|err| ProfileError::Invalid(format!("{}", err)))
    }

    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let content = fs::read_to_string(path)
            .map_err(|err| ProfileError::Io(format!("{}: {}", path.display(), err)))?;
        Self::from_yaml_str(&content)
    }

    /// Keys for `category`: the override when present, else the defaults.
    pub fn keys_for(&self, category: FieldCategory) -> Vec<String> {
        match self.field_keys.get(&category) {
            Some(keys) if !keys.is_empty() => keys.clone(),
            _ => category
                .default_keys()
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::AnchorDescriptor;

    #[test]
    fn empty_yaml_is_the_builtin_profile() {
        assert_eq!(SiteProfile::from_yaml_str("").unwrap(), SiteProfile::default());
        assert_eq!(SiteProfile::from_yaml_str("{}").unwrap(), SiteProfile::default());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = r#"
start_url: "https://example.test/exam"
continue_button:
  - aria: { role: button, name: weiter }
  - text: { content: weiter, exact: false }
field_keys:
  postal_code: [plz]
timings:
  max_jitter: 400
"#;
        let profile = SiteProfile::from_yaml_str(yaml).unwrap();
        assert_eq!(profile.start_url, "https://example.test/exam");
        assert_eq!(
            profile.continue_button.iter().next(),
            Some(&AnchorDescriptor::role("button", "weiter"))
        );
        assert_eq!(profile.timings.max_jitter, Duration::from_millis(400));
        assert_eq!(profile.timings.observe_window, Duration::from_millis(5_000));
        assert_eq!(profile.gate, SiteProfile::default().gate);
        assert_eq!(profile.keys_for(FieldCategory::PostalCode), vec!["plz"]);
        assert_eq!(profile.keys_for(FieldCategory::Phone), vec!["phone", "mobile", "tel"]);
    }

    #[test]
    fn malformed_yaml_is_invalid() {
        let err = SiteProfile::from_yaml_str("timings: [1, 2").unwrap_err();
        assert!(matches!(err, ProfileError::Invalid(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SiteProfile::load(Path::new("/nonexistent/slotwatch.yaml")).unwrap_err();
        assert!(matches!(err, ProfileError::Io(_)));
    }
}
