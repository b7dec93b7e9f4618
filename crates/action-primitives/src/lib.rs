//! Action primitives for the booking flow
//!
//! This crate provides the building blocks the flow sequencer is written in:
//! - [`Page`]: the interaction handle over one isolated browser context
//! - [`LocatorSet`]: ordered alternative descriptions of one element
//! - [`StepExecutor`]: attempts one logical step and reports a [`StepOutcome`]
//! - [`dismiss_transient_dialogs`]: idempotent consent/interstitial handling
//! - [`EventLog`]: tagged per-participant events routed through `tracing`
//!
//! [`StepOutcome`]: slotwatch_core_types::StepOutcome

pub mod dialogs;
pub mod errors;
pub mod events;
pub mod executor;
pub mod fields;
mod locator;
pub mod page;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use dialogs::{dismiss_transient_dialogs, DialogOutcome, DialogProfile};
pub use errors::*;
pub use events::{EventJournal, EventLog, LogRecord};
pub use executor::{attempt_step, FillTarget, Step, StepAct, StepAction, StepExecutor, StepTimings};
pub use fields::{match_fields, FieldCategory, FieldEntry};
pub use locator::*;
pub use page::Page;
pub use types::*;
