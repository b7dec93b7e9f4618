//! Flow sequencer
//!
//! Drives one participant from `Start` to `Confirmed`. Every step failure is a
//! `Failed` transition back to `Start`, whose restart preamble is the one
//! restart for that failure; there is no partial resume. Retries are unbounded
//! unless a harness sets [`SequencerConfig::max_restarts`].

use action_primitives::{EventJournal, EventLog, Page, Step, StepExecutor, StepTimings};
use slotwatch_core_types::{FlowState, Participant, RunId, StepOutcome};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::alarm::{
    install_double_click_bridge, AlarmConfig, AlarmController, AlarmReport, SignalSink,
};
use crate::errors::FlowError;
use crate::plan::FlowPlan;
use crate::poller::{until_cancelled, JitteredPoller, PollReport, PollerConfig};
use crate::profile::SiteProfile;
use crate::restart::RestartPolicy;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequencerConfig {
    /// Restarts allowed after failures; `None` retries forever
    pub max_restarts: Option<u32>,

    pub max_poll_cycles: Option<u32>,
    pub jitter_seed: Option<u64>,
    pub alarm: AlarmConfig,
}

/// States kept in [`FlowReport::trace`]; older ones are dropped.
pub const TRACE_TAIL: usize = 64;

/// What happened during one participant run. Retries are unbounded, so only
/// counters and a tail of the trace are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowReport {
    pub run_id: RunId,
    pub participant: String,

    /// The last [`TRACE_TAIL`] states entered, oldest first
    pub trace: Vec<FlowState>,

    /// Restart preambles run, the initial one included
    pub restarts: u32,

    pub failures: u32,
    pub last_failure: Option<String>,

    /// Every `AwaitingOpen` visit folded together
    pub polls: PollReport,
    pub alarm: Option<AlarmReport>,
}

impl FlowReport {
    fn new(participant: &Participant) -> Self {
        Self {
            run_id: RunId::new(),
            participant: participant.label().to_string(),
            trace: Vec::new(),
            restarts: 0,
            failures: 0,
            last_failure: None,
            polls: PollReport::default(),
            alarm: None,
        }
    }

    fn enter(&mut self, state: &FlowState) {
        if self.trace.len() >= TRACE_TAIL {
            let excess = self.trace.len() + 1 - TRACE_TAIL;
            self.trace.drain(..excess);
        }
        self.trace.push(state.clone());
    }

    pub fn confirmed(&self) -> bool {
        self.trace.last().is_some_and(FlowState::is_terminal)
    }
}

pub struct FlowSequencer {
    profile: SiteProfile,
    config: SequencerConfig,
    executor: StepExecutor,
    poller: JitteredPoller,
    restart: RestartPolicy,
    sink: Arc<dyn SignalSink>,
    journal: Option<EventJournal>,
}

impl FlowSequencer {
    pub fn new(profile: SiteProfile, config: SequencerConfig, sink: Arc<dyn SignalSink>) -> Self {
        let timings = profile.timings;
        let poller = JitteredPoller::new(
            PollerConfig {
                max_cycles: config.max_poll_cycles,
                seed: config.jitter_seed,
                ..PollerConfig::from(timings)
            },
            profile.dialogs.clone(),
        );
        Self {
            executor: StepExecutor::new(StepTimings {
                lookup_timeout: timings.lookup_timeout,
                settle: timings.step_wait,
            }),
            restart: RestartPolicy::from_profile(&profile),
            poller,
            profile,
            config,
            sink,
            journal: None,
        }
    }

    /// Also capture every flow event into `journal`.
    pub fn with_journal(mut self, journal: EventJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn event_log(&self, participant: &Participant) -> EventLog {
        let log = EventLog::new(participant.label());
        match &self.journal {
            Some(journal) => log.with_journal(journal.clone()),
            None => log,
        }
    }

    pub async fn run(
        &self,
        page: &dyn Page,
        participant: &Participant,
        cancel: &CancellationToken,
    ) -> Result<FlowReport, FlowError> {
        let log = self.event_log(participant);
        let plan = FlowPlan::build(&self.profile, participant);
        let mut report = FlowReport::new(participant);
        let mut state = FlowState::Start;

        loop {
            if cancel.is_cancelled() {
                log.info(format!("cancelled in {state}"));
                return Err(FlowError::Cancelled);
            }
            log.info(format!("state {state}"));
            report.enter(&state);

            state = match state {
                FlowState::Start => {
                    self.restart.restart(page, &log, cancel).await?;
                    report.restarts += 1;
                    FlowState::AwaitingOpen
                }
                FlowState::AwaitingOpen => {
                    let poll = self
                        .poller
                        .poll_until_ready(page, plan.gate_variants(), &log, cancel)
                        .await?;
                    report.polls.absorb(&poll);
                    let gate = std::slice::from_ref(plan.gate());
                    self.advance(page, &log, gate, FlowState::ModulesSelected, cancel)
                        .await?
                }
                FlowState::Confirmed => {
                    log.pass("confirmation text visible");
                    report.alarm = Some(self.sound_alarm(page, &log, cancel).await);
                    return Ok(report);
                }
                FlowState::Failed(reason) => {
                    report.failures += 1;
                    report.last_failure = Some(reason.clone());
                    if let Some(limit) = self.config.max_restarts {
                        if report.failures > limit {
                            log.error(format!("{reason}; restart bound reached"));
                            return Err(FlowError::BoundExhausted {
                                what: "restart",
                                limit,
                            });
                        }
                    }
                    log.fail(format!("{reason}, restart"));
                    FlowState::Start
                }
                forward => match (plan.stage(&forward), forward.successor()) {
                    (Some(stage), Some(next)) => {
                        self.advance(page, &log, &stage.steps, next, cancel).await?
                    }
                    _ => FlowState::Failed(format!("no steps planned from {forward}")),
                },
            };
        }
    }

    /// Run `steps` in order; all must succeed to reach `next`. A step in
    /// flight is abandoned as soon as `cancel` fires.
    async fn advance(
        &self,
        page: &dyn Page,
        log: &EventLog,
        steps: &[Step],
        next: FlowState,
        cancel: &CancellationToken,
    ) -> Result<FlowState, FlowError> {
        for step in steps {
            match until_cancelled(self.executor.attempt(page, step, log), cancel).await? {
                StepOutcome::Success => log.pass(format!("{} done", step.id)),
                outcome @ (StepOutcome::NotFound | StepOutcome::InteractionError(_)) => {
                    return Ok(FlowState::Failed(format!("step {} {}", step.id, outcome)));
                }
            }
        }
        Ok(next)
    }

    async fn sound_alarm(
        &self,
        page: &dyn Page,
        log: &EventLog,
        cancel: &CancellationToken,
    ) -> AlarmReport {
        let controller = AlarmController::new(self.config.alarm, Arc::clone(&self.sink));
        let forward = match install_double_click_bridge(page, controller.bridge()).await {
            Ok(handle) => Some(handle),
            Err(err) => {
                log.error(format!("double-click bridge error {err}"));
                None
            }
        };

        log.info("alarm started waiting for double-click");
        let report = controller.run(log, cancel).await;
        if let Some(handle) = forward {
            handle.abort();
        }
        log.pass(format!("alarm stopped after {} signal(s)", report.signals));
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{StopReason, STOP_BINDING};
    use crate::profile::CONFIRMATION_TEXT;
    use action_primitives::testing::{Control, ScriptedPage};
    use action_primitives::FormField;
    use async_trait::async_trait;
    use std::time::Duration;
    use slotwatch_core_types::LogTag;
    use tokio::time::{sleep, Instant};

    struct SilentSink;

    #[async_trait]
    impl SignalSink for SilentSink {
        async fn emit(&self, duration: Duration) -> Result<(), FlowError> {
            sleep(duration).await;
            Ok(())
        }
    }

    fn participant() -> Participant {
        Participant {
            email: "a@example.com".into(),
            password: "pw".into(),
            phone: "0700000000".into(),
            first_name: "Amani".into(),
            ..Default::default()
        }
    }

    fn sequencer(config: SequencerConfig) -> FlowSequencer {
        FlowSequencer::new(
            SiteProfile::default(),
            SequencerConfig {
                jitter_seed: Some(3),
                ..config
            },
            Arc::new(SilentSink),
        )
    }

    fn field(index: usize, name: &str) -> FormField {
        FormField {
            index,
            tag: "input".into(),
            name: name.into(),
            selector: format!("#{name}"),
            ..Default::default()
        }
    }

    fn booking_page(book_after_gotos: u32) -> ScriptedPage {
        ScriptedPage::new("p")
            .with_control(Control::button("Select Modules").after_reloads(2))
            .with_control(Control::button("Continue"))
            .with_control(Control::button("Book for myself").after_gotos(book_after_gotos))
            .with_control(Control::input("input[type=email]"))
            .with_control(Control::input("input[type=password]"))
            .with_control(Control::button("Sign in"))
            .with_control(Control::button("Order, subject to change"))
            .with_control(Control::text(CONFIRMATION_TEXT))
            .with_fields(vec![field(0, "phone"), field(1, "firstName")])
    }

    async fn acknowledge_later(page: &ScriptedPage) -> bool {
        sleep(Duration::from_secs(300)).await;
        page.trigger_binding(STOP_BINDING, "dblclick")
    }

    /// Double-click once the alarm has installed its binding.
    async fn acknowledge_when_ringing(page: &ScriptedPage) {
        loop {
            sleep(Duration::from_secs(30)).await;
            if page.trigger_binding(STOP_BINDING, "dblclick") {
                return;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn happy_path_reaches_confirmed_and_waits_for_acknowledgement() {
        let page = booking_page(0);
        let journal = EventJournal::default();
        let sequencer = sequencer(SequencerConfig::default()).with_journal(journal.clone());
        let cancel = CancellationToken::new();
        let participant = participant();

        let (report, acknowledged) = tokio::join!(
            sequencer.run(&page, &participant, &cancel),
            acknowledge_later(&page)
        );
        let report = report.unwrap();

        assert!(acknowledged);
        assert!(report.confirmed());
        assert_eq!(
            report.trace,
            vec![
                FlowState::Start,
                FlowState::AwaitingOpen,
                FlowState::ModulesSelected,
                FlowState::PurposeSelected,
                FlowState::LoggedIn,
                FlowState::DetailsSubmitted,
                FlowState::Reviewed,
                FlowState::Ordered,
                FlowState::Confirmed,
            ]
        );
        assert_eq!(report.restarts, 1);
        assert_eq!(report.polls.reloads_ok, 2);
        assert_eq!(page.reloads(), 2);
        let alarm = report.alarm.clone().unwrap();
        assert_eq!(
            alarm.stopped_by,
            StopReason::Acknowledged("dblclick".into())
        );

        // Every alarm signal is a tagged line for this participant.
        let records = journal.lock().clone();
        let started = records
            .iter()
            .position(|r| r.message.starts_with("alarm started"))
            .unwrap();
        let stopped = records
            .iter()
            .position(|r| r.message.starts_with("alarm stopped"))
            .unwrap();
        let during = &records[started + 1..stopped];
        assert!(alarm.signals > 0);
        assert_eq!(during.len() as u32, alarm.signals);
        assert!(during
            .iter()
            .all(|r| r.tag == LogTag::Info && r.participant == "a@example.com"));
        let fills = page.fills();
        assert!(fills.contains(&("input[type=email]".into(), "a@example.com".into())));
        assert!(fills.contains(&("#phone".into(), "0700000000".into())));
        assert!(fills.contains(&("#firstName".into(), "Amani".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn each_failure_is_followed_by_exactly_one_restart() {
        // "Book for myself" is missing until the second visit to the start page.
        let page = booking_page(2);
        let sequencer = sequencer(SequencerConfig::default());
        let cancel = CancellationToken::new();
        let participant = participant();

        let (report, _) = tokio::join!(
            sequencer.run(&page, &participant, &cancel),
            acknowledge_later(&page)
        );
        let report = report.unwrap();

        assert_eq!(report.failures, 1);
        assert!(report
            .last_failure
            .as_deref()
            .is_some_and(|reason| reason.contains("book-for-myself")));
        assert_eq!(report.restarts, 2);
        assert_eq!(page.gotos(), 2);

        let failed_at = report
            .trace
            .iter()
            .position(FlowState::is_failed)
            .unwrap();
        assert_eq!(report.trace[failed_at - 1], FlowState::PurposeSelected);
        assert_eq!(report.trace[failed_at + 1], FlowState::Start);
        assert_eq!(report.trace[failed_at + 2], FlowState::AwaitingOpen);

        // Nothing was clicked between the failure and the second navigation.
        let journal = page.journal();
        let second_goto = journal
            .iter()
            .enumerate()
            .filter(|(_, line)| line.starts_with("p goto"))
            .nth(1)
            .map(|(idx, _)| idx)
            .unwrap();
        assert_eq!(journal[second_goto - 1], "p click Continue");
    }

    #[tokio::test(start_paused = true)]
    async fn never_moves_past_awaiting_open_without_the_gate() {
        let page = ScriptedPage::new("p")
            .with_control(Control::button("Continue"))
            .with_control(Control::button("Book for myself"));
        let sequencer = sequencer(SequencerConfig {
            max_poll_cycles: Some(4),
            ..Default::default()
        });

        let err = sequencer
            .run(&page, &participant(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::BoundExhausted { what: "poll cycle", .. }));
        assert_eq!(page.clicks("continue"), 0);
        assert_eq!(page.clicks("book"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_bound_ends_the_run() {
        let page = ScriptedPage::new("p").with_control(Control::button("Select Modules"));
        let journal = EventJournal::default();
        let sequencer = sequencer(SequencerConfig {
            max_restarts: Some(2),
            ..Default::default()
        })
        .with_journal(journal.clone());

        let err = sequencer
            .run(&page, &participant(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            FlowError::BoundExhausted {
                what: "restart",
                limit: 2
            }
        );
        assert_eq!(page.gotos(), 3);
        assert_eq!(page.clicks("select modules"), 3);
        let fails = journal
            .lock()
            .iter()
            .filter(|r| r.tag == LogTag::Fail)
            .count();
        assert_eq!(fails, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_gate_click_routes_back_to_start() {
        let page = ScriptedPage::new("p")
            .with_control(Control::button("Select Modules").failing_click("node is detached"));
        let sequencer = sequencer(SequencerConfig {
            max_restarts: Some(1),
            ..Default::default()
        });

        let err = sequencer
            .run(&page, &participant(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::BoundExhausted { what: "restart", .. }));
        assert_eq!(page.gotos(), 2);
        assert_eq!(page.clicks("continue"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_ends_the_run() {
        let page = ScriptedPage::new("p");
        let sequencer = sequencer(SequencerConfig::default());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(30)).await;
            trigger.cancel();
        });

        let err = sequencer
            .run(&page, &participant(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, FlowError::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn long_retry_runs_keep_a_bounded_report() {
        // "Book for myself" only shows on the 40th visit to the start page.
        let page = booking_page(40);
        let sequencer = sequencer(SequencerConfig::default());
        let cancel = CancellationToken::new();
        let participant = participant();

        let (report, ()) = tokio::join!(
            sequencer.run(&page, &participant, &cancel),
            acknowledge_when_ringing(&page)
        );
        let report = report.unwrap();

        assert!(report.confirmed());
        assert_eq!(report.failures, 39);
        assert_eq!(report.restarts, 40);
        assert_eq!(report.trace.len(), TRACE_TAIL);
        assert!(report
            .last_failure
            .as_deref()
            .is_some_and(|reason| reason.contains("book-for-myself")));
        assert_eq!(report.polls.reloads_ok, 2);
        assert_eq!(report.polls.cycles, 42);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_does_not_wait_out_a_step_lookup() {
        // Only the gate exists, so every later step waits out its lookups.
        let page = ScriptedPage::new("p")
            .with_control(Control::button("Select Modules"))
            .waiting_out_lookups();
        let sequencer = sequencer(SequencerConfig::default());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = sequencer
            .run(&page, &participant(), &cancel)
            .await
            .unwrap_err();

        assert_eq!(err, FlowError::Cancelled);
        assert!(page.gotos() > 1);
        assert!(started.elapsed() < Duration::from_millis(100_500));
    }
}
