//! Jittered poller
//!
//! Watches for the gate for one observation window, and when it does not show
//! sleeps a uniformly sampled delay in `[0, max_jitter]` before reloading. A
//! failed reload is logged and the loop goes on. There is no overall deadline;
//! the loop ends when the gate shows, the token is cancelled, or an injected
//! cycle bound runs out.

use action_primitives::{
    attempt_step, dismiss_transient_dialogs, DialogProfile, EventLog, LocatorSet, Page, StepAct,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use slotwatch_core_types::{PollResult, StepOutcome};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::FlowError;
use crate::profile::FlowTimings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    pub observe_window: Duration,
    pub step_wait: Duration,
    pub max_jitter: Duration,

    /// Give up after this many cycles; `None` polls until cancelled
    pub max_cycles: Option<u32>,

    /// Fixed RNG seed for reproducible delays
    pub seed: Option<u64>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        FlowTimings::default().into()
    }
}

impl From<FlowTimings> for PollerConfig {
    fn from(timings: FlowTimings) -> Self {
        Self {
            observe_window: timings.observe_window,
            step_wait: timings.step_wait,
            max_jitter: timings.max_jitter,
            max_cycles: None,
            seed: None,
        }
    }
}

/// Counters for one `poll_until_ready` call, or several folded together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    pub cycles: u32,
    pub reloads_ok: u32,
    pub reloads_failed: u32,

    /// Sum of the jitter delays slept before reloads
    pub total_delay: Duration,
    pub longest_delay: Duration,
}

impl PollReport {
    pub fn reloads(&self) -> u32 {
        self.reloads_ok + self.reloads_failed
    }

    fn record_delay(&mut self, delay: Duration) {
        self.total_delay += delay;
        self.longest_delay = self.longest_delay.max(delay);
    }

    /// Fold another call's counters into this one.
    pub fn absorb(&mut self, other: &PollReport) {
        self.cycles += other.cycles;
        self.reloads_ok += other.reloads_ok;
        self.reloads_failed += other.reloads_failed;
        self.total_delay += other.total_delay;
        self.longest_delay = self.longest_delay.max(other.longest_delay);
    }
}

/// Uniform delay in `[0, max]` at millisecond resolution.
pub fn sample_jitter<R: Rng + ?Sized>(rng: &mut R, max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    Duration::from_millis(rng.gen_range(0..=max_ms))
}

/// Drive `work` unless `cancel` fires first; unfinished work is dropped.
pub(crate) async fn until_cancelled<F: Future>(
    work: F,
    cancel: &CancellationToken,
) -> Result<F::Output, FlowError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FlowError::Cancelled),
        output = work => Ok(output),
    }
}

/// Sleep for `duration` unless `cancel` fires first.
pub(crate) async fn cancellable_sleep(
    duration: Duration,
    cancel: &CancellationToken,
) -> Result<(), FlowError> {
    until_cancelled(sleep(duration), cancel).await
}

pub struct JitteredPoller {
    config: PollerConfig,
    dialogs: DialogProfile,
    rng: Mutex<StdRng>,
}

impl JitteredPoller {
    pub fn new(config: PollerConfig, dialogs: DialogProfile) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            dialogs,
            rng: Mutex::new(rng),
        }
    }

    fn next_delay(&self) -> Duration {
        sample_jitter(&mut *self.rng.lock(), self.config.max_jitter)
    }

    /// Watch for the gate for one observation window.
    async fn observe(
        &self,
        page: &dyn Page,
        gate: &LocatorSet,
        cancel: &CancellationToken,
    ) -> Result<bool, FlowError> {
        let deadline = Instant::now() + self.config.observe_window;
        loop {
            if cancel.is_cancelled() {
                return Err(FlowError::Cancelled);
            }
            let outcome =
                until_cancelled(attempt_step(page, gate, StepAct::Observe, Duration::ZERO), cancel)
                    .await?;
            match outcome {
                StepOutcome::Success => return Ok(true),
                StepOutcome::NotFound => {}
                StepOutcome::InteractionError(detail) => {
                    debug!(%detail, "gate lookup failed");
                }
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            cancellable_sleep(self.config.step_wait, cancel).await?;
        }
    }

    /// One cycle: observe, then jitter and reload when the gate stayed hidden.
    pub async fn poll_once(
        &self,
        page: &dyn Page,
        gate: &LocatorSet,
        log: &EventLog,
        cancel: &CancellationToken,
    ) -> Result<PollResult, FlowError> {
        self.cycle(page, gate, log, cancel, &mut PollReport::default())
            .await
    }

    async fn cycle(
        &self,
        page: &dyn Page,
        gate: &LocatorSet,
        log: &EventLog,
        cancel: &CancellationToken,
        report: &mut PollReport,
    ) -> Result<PollResult, FlowError> {
        report.cycles += 1;
        if self.observe(page, gate, cancel).await? {
            return Ok(PollResult::TargetFound);
        }

        let delay = self.next_delay();
        report.record_delay(delay);
        log.info(format!(
            "select modules not visible; reloading after {}ms",
            delay.as_millis()
        ));
        cancellable_sleep(delay, cancel).await?;

        match until_cancelled(page.reload(), cancel).await? {
            Ok(()) => {
                report.reloads_ok += 1;
                log.reload_ok("page reloaded");
                cancellable_sleep(self.config.step_wait, cancel).await?;
                until_cancelled(dismiss_transient_dialogs(page, &self.dialogs, log), cancel)
                    .await?;
                Ok(PollResult::ReloadOk)
            }
            Err(err) => {
                report.reloads_failed += 1;
                log.reload_err(format!("reload error {err}"));
                Ok(PollResult::ReloadFailed(err.to_string()))
            }
        }
    }

    /// Repeat cycles until the gate shows.
    pub async fn poll_until_ready(
        &self,
        page: &dyn Page,
        gate: &LocatorSet,
        log: &EventLog,
        cancel: &CancellationToken,
    ) -> Result<PollReport, FlowError> {
        log.info("polling for select modules");
        let mut report = PollReport::default();
        loop {
            if let Some(limit) = self.config.max_cycles {
                if report.cycles >= limit {
                    return Err(FlowError::BoundExhausted {
                        what: "poll cycle",
                        limit,
                    });
                }
            }
            match self.cycle(page, gate, log, cancel, &mut report).await? {
                PollResult::TargetFound => return Ok(report),
                PollResult::ReloadOk | PollResult::ReloadFailed(_) => continue,
            }
        }
    }
}
