//! Transient-dialog handler
//!
//! Consent banners and interstitials may reappear after every navigation. The
//! handler tries the primary action, then the secondary, then the tertiary;
//! when none is present it does nothing. It never fails.

use serde::{Deserialize, Serialize};
use slotwatch_core_types::StepOutcome;
use std::time::Duration;
use tokio::time::sleep;

use crate::{
    events::EventLog,
    executor::{attempt_step, StepAct},
    locator::LocatorSet,
    page::Page,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogProfile {
    pub primary: LocatorSet,
    pub secondary: LocatorSet,
    pub tertiary: LocatorSet,

    /// Lookup timeout per variant; kept short since absence is the common case
    #[serde(with = "millis")]
    pub timeout: Duration,

    /// Pause after a dismissal
    #[serde(with = "millis")]
    pub settle: Duration,
}

impl Default for DialogProfile {
    fn default() -> Self {
        Self {
            primary: LocatorSet::roles("button", &["accept all", "accept"]),
            secondary: LocatorSet::roles("button", &["deny"]),
            tertiary: LocatorSet::roles("button", &["settings"]),
            timeout: Duration::from_millis(1_000),
            settle: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOutcome {
    Accepted,
    Denied,
    SettingsOpened,
    Absent,
}

pub async fn dismiss_transient_dialogs(
    page: &dyn Page,
    dialogs: &DialogProfile,
    log: &EventLog,
) -> DialogOutcome {
    let tiers = [
        (&dialogs.primary, DialogOutcome::Accepted, "privacy accepted"),
        (&dialogs.secondary, DialogOutcome::Denied, "privacy denied fallback"),
        (&dialogs.tertiary, DialogOutcome::SettingsOpened, "privacy settings clicked"),
    ];

    for (variants, outcome, message) in tiers {
        if variants.is_empty() {
            continue;
        }
        match attempt_step(page, variants, StepAct::Click, dialogs.timeout).await {
            StepOutcome::Success => {
                log.pass(message);
                if !dialogs.settle.is_zero() {
                    sleep(dialogs.settle).await;
                }
                return outcome;
            }
            StepOutcome::NotFound => {}
            StepOutcome::InteractionError(detail) => {
                log.error(format!("dialog handling error {detail}"));
            }
        }
    }

    DialogOutcome::Absent
}

/// `Duration` as integer milliseconds in profile files.
pub mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
