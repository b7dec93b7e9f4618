//! Shared records and state enums for the booking sequencer.
//!
//! Everything here is plain data: the participant record the flow fills in,
//! the positions of the per-participant state machine, and the outcomes the
//! executor and poller report back.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Error raised when a record cannot be built from its source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("participant record is missing an email address")]
    MissingEmail,
}

/// Identity and form-fill data for one person being booked.
///
/// Immutable once constructed for a run. Missing fields are empty strings,
/// which the form filler skips.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(default))]
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Participant {
    pub email: String,
    pub password: String,
    pub phone: String,
    pub first_name: String,
    pub surname: String,
    pub county: String,
    pub dob: String,
    pub place_of_birth: String,
    pub zip_code: String,
}

impl Participant {
    /// Identifier used in every log line for this participant.
    pub fn label(&self) -> &str {
        &self.email
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        if self.email.trim().is_empty() {
            return Err(RecordError::MissingEmail);
        }
        Ok(())
    }
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("phone", &self.phone)
            .field("first_name", &self.first_name)
            .field("surname", &self.surname)
            .field("county", &self.county)
            .field("dob", &self.dob)
            .field("place_of_birth", &self.place_of_birth)
            .field("zip_code", &self.zip_code)
            .finish()
    }
}

/// Unique identifier for one participant run (one isolated browser context).
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

/// Position of the per-participant sequencer.
///
/// Each state names the last milestone reached; the sequencer runs the steps
/// that lead to [`FlowState::successor`].
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowState {
    Start,
    AwaitingOpen,
    ModulesSelected,
    PurposeSelected,
    LoggedIn,
    DetailsSubmitted,
    Reviewed,
    Ordered,
    Confirmed,
    Failed(String),
}

impl FlowState {
    /// Next state on success. `Failed` always routes back to `Start`;
    /// `Confirmed` has no successor.
    pub fn successor(&self) -> Option<FlowState> {
        let next = match self {
            FlowState::Start => FlowState::AwaitingOpen,
            FlowState::AwaitingOpen => FlowState::ModulesSelected,
            FlowState::ModulesSelected => FlowState::PurposeSelected,
            FlowState::PurposeSelected => FlowState::LoggedIn,
            FlowState::LoggedIn => FlowState::DetailsSubmitted,
            FlowState::DetailsSubmitted => FlowState::Reviewed,
            FlowState::Reviewed => FlowState::Ordered,
            FlowState::Ordered => FlowState::Confirmed,
            FlowState::Failed(_) => FlowState::Start,
            FlowState::Confirmed => return None,
        };
        Some(next)
    }

    /// Ordinal along the forward path; `Failed` has none.
    pub fn rank(&self) -> Option<u8> {
        let rank = match self {
            FlowState::Start => 0,
            FlowState::AwaitingOpen => 1,
            FlowState::ModulesSelected => 2,
            FlowState::PurposeSelected => 3,
            FlowState::LoggedIn => 4,
            FlowState::DetailsSubmitted => 5,
            FlowState::Reviewed => 6,
            FlowState::Ordered => 7,
            FlowState::Confirmed => 8,
            FlowState::Failed(_) => return None,
        };
        Some(rank)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Confirmed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FlowState::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            FlowState::Start => "start",
            FlowState::AwaitingOpen => "awaiting-open",
            FlowState::ModulesSelected => "modules-selected",
            FlowState::PurposeSelected => "purpose-selected",
            FlowState::LoggedIn => "logged-in",
            FlowState::DetailsSubmitted => "details-submitted",
            FlowState::Reviewed => "reviewed",
            FlowState::Ordered => "ordered",
            FlowState::Confirmed => "confirmed",
            FlowState::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Failed(reason) => write!(f, "failed({reason})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Result of one step attempt.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    NotFound,
    InteractionError(String),
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success)
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Success => f.write_str("success"),
            StepOutcome::NotFound => f.write_str("not found"),
            StepOutcome::InteractionError(detail) => write!(f, "interaction error: {detail}"),
        }
    }
}

/// Result of one reload/poll cycle.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollResult {
    TargetFound,
    ReloadOk,
    ReloadFailed(String),
}

/// Severity tag carried by every log line.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogTag {
    Info,
    Pass,
    Fail,
    Error,
    ReloadOk,
    ReloadErr,
}

impl LogTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::Info => "INFO",
            LogTag::Pass => "PASS",
            LogTag::Fail => "FAIL",
            LogTag::Error => "ERROR",
            LogTag::ReloadOk => "RELOAD_OK",
            LogTag::ReloadErr => "RELOAD_ERR",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "INFO" => Some(LogTag::Info),
            "PASS" => Some(LogTag::Pass),
            "FAIL" => Some(LogTag::Fail),
            "ERROR" => Some(LogTag::Error),
            "RELOAD_OK" => Some(LogTag::ReloadOk),
            "RELOAD_ERR" => Some(LogTag::ReloadErr),
            _ => None,
        }
    }
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
