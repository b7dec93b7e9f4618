//! Booking flow orchestration
//!
//! This crate drives the exam-slot booking flow on top of the action
//! primitives: a jittered poller waits for booking to open, the sequencer
//! walks the form and restarts from the top on any failure, and once a booking
//! is confirmed the alarm rings until someone double-clicks the page.

pub mod alarm;
pub mod errors;
pub mod orchestrator;
pub mod plan;
pub mod poller;
pub mod profile;
pub mod restart;
pub mod sequencer;

pub use alarm::{
    install_double_click_bridge, AlarmBridge, AlarmConfig, AlarmController, AlarmPhase,
    AlarmReport, SignalSink, StopReason, TerminalBell, STOP_BINDING,
};
pub use errors::FlowError;
pub use orchestrator::{ContextFactory, IsolatedContext, SessionOrchestrator, SessionOutcome};
pub use plan::{FlowPlan, Stage};
pub use poller::{sample_jitter, JitteredPoller, PollReport, PollerConfig};
pub use profile::{FlowTimings, ProfileError, SiteProfile};
pub use restart::RestartPolicy;
pub use sequencer::{FlowReport, FlowSequencer, SequencerConfig, TRACE_TAIL};
