//! Session orchestrator
//!
//! Runs the sequencer once per participant in input order, each inside its
//! own isolated browser context, one at a time. A participant's run, alarm
//! wait included, finishes before the next context is opened.

use action_primitives::Page;
use async_trait::async_trait;
use slotwatch_core_types::Participant;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::errors::FlowError;
use crate::sequencer::{FlowReport, FlowSequencer};

/// One isolated context (cookies and storage not shared) with its page.
#[async_trait]
pub trait IsolatedContext: Send + Sync {
    fn page(&self) -> Arc<dyn Page>;

    async fn close(self: Box<Self>) -> Result<(), FlowError>;
}

#[async_trait]
pub trait ContextFactory: Send + Sync {
    async fn open(&self, participant: &Participant) -> Result<Box<dyn IsolatedContext>, FlowError>;
}

#[derive(Debug)]
pub struct SessionOutcome {
    pub participant: String,
    pub result: Result<FlowReport, FlowError>,
}

impl SessionOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(&self.result, Ok(report) if report.confirmed())
    }
}

pub struct SessionOrchestrator {
    sequencer: FlowSequencer,
    contexts: Arc<dyn ContextFactory>,
}

impl SessionOrchestrator {
    pub fn new(sequencer: FlowSequencer, contexts: Arc<dyn ContextFactory>) -> Self {
        Self {
            sequencer,
            contexts,
        }
    }

    pub async fn run_all(
        &self,
        participants: &[Participant],
        cancel: &CancellationToken,
    ) -> Vec<SessionOutcome> {
        let mut outcomes = Vec::with_capacity(participants.len());
        for participant in participants {
            let result = if cancel.is_cancelled() {
                Err(FlowError::Cancelled)
            } else {
                self.run_one(participant, cancel).await
            };
            outcomes.push(SessionOutcome {
                participant: participant.label().to_string(),
                result,
            });
        }
        outcomes
    }

    async fn run_one(
        &self,
        participant: &Participant,
        cancel: &CancellationToken,
    ) -> Result<FlowReport, FlowError> {
        let log = self.sequencer.event_log(participant);
        log.info("new context");
        let context = match self.contexts.open(participant).await {
            Ok(context) => context,
            Err(err) => {
                log.error(format!("context open error {err}"));
                return Err(err);
            }
        };

        let page = context.page();
        let result = self.sequencer.run(page.as_ref(), participant, cancel).await;
        drop(page);

        match context.close().await {
            Ok(()) => log.info("context closed"),
            Err(err) => log.error(format!("context close error {err}")),
        }
        if let Err(err) = &result {
            log.fail(format!("run ended: {err}"));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::SignalSink;
    use crate::profile::SiteProfile;
    use crate::sequencer::SequencerConfig;
    use action_primitives::testing::{Control, ScriptedPage, SharedJournal};
    use action_primitives::EventJournal;
    use parking_lot::Mutex;
    use std::time::Duration;

    struct SilentSink;

    #[async_trait]
    impl SignalSink for SilentSink {
        async fn emit(&self, _duration: Duration) -> Result<(), FlowError> {
            Ok(())
        }
    }

    struct ScriptedContext {
        page: Arc<ScriptedPage>,
        journal: SharedJournal,
        name: String,
    }

    #[async_trait]
    impl IsolatedContext for ScriptedContext {
        fn page(&self) -> Arc<dyn Page> {
            self.page.clone()
        }

        async fn close(self: Box<Self>) -> Result<(), FlowError> {
            self.journal.lock().push(format!("{} close", self.name));
            Ok(())
        }
    }

    /// Each participant gets a page where "Continue" never shows, so every run
    /// ends on the restart bound.
    #[derive(Default)]
    struct ScriptedContexts {
        journal: SharedJournal,
        opened: Mutex<Vec<String>>,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl ContextFactory for ScriptedContexts {
        async fn open(
            &self,
            participant: &Participant,
        ) -> Result<Box<dyn IsolatedContext>, FlowError> {
            let name = participant.label().to_string();
            if self.fail_for.as_deref() == Some(name.as_str()) {
                return Err(FlowError::Context("browser went away".into()));
            }
            self.opened.lock().push(name.clone());
            self.journal.lock().push(format!("{name} open"));
            let page = ScriptedPage::new(&name)
                .with_journal(self.journal.clone())
                .with_control(Control::button("Select Modules"));
            Ok(Box::new(ScriptedContext {
                page: Arc::new(page),
                journal: self.journal.clone(),
                name,
            }))
        }
    }

    fn people(names: &[&str]) -> Vec<Participant> {
        names
            .iter()
            .map(|email| Participant {
                email: email.to_string(),
                ..Default::default()
            })
            .collect()
    }

    fn orchestrator(contexts: Arc<ScriptedContexts>, events: EventJournal) -> SessionOrchestrator {
        let sequencer = FlowSequencer::new(
            SiteProfile::default(),
            SequencerConfig {
                max_restarts: Some(1),
                jitter_seed: Some(11),
                ..Default::default()
            },
            Arc::new(SilentSink),
        )
        .with_journal(events);
        SessionOrchestrator::new(sequencer, contexts)
    }

    #[tokio::test(start_paused = true)]
    async fn runs_in_input_order_without_interleaving() {
        let contexts = Arc::new(ScriptedContexts::default());
        let events = EventJournal::default();
        let participants = people(&["one@example.com", "two@example.com", "three@example.com"]);

        let outcomes = orchestrator(contexts.clone(), events.clone())
            .run_all(&participants, &CancellationToken::new())
            .await;

        let order: Vec<&str> = outcomes.iter().map(|o| o.participant.as_str()).collect();
        assert_eq!(order, vec!["one@example.com", "two@example.com", "three@example.com"]);
        assert!(outcomes.iter().all(|o| !o.succeeded()));
        assert!(outcomes
            .iter()
            .all(|o| matches!(o.result, Err(FlowError::BoundExhausted { .. }))));
        assert_eq!(*contexts.opened.lock(), order);

        // Page activity: each context is opened, used and closed before the next.
        let journal = contexts.journal.lock().clone();
        let owner = |line: &String| line.split(' ').next().unwrap_or_default().to_string();
        let mut blocks: Vec<String> = Vec::new();
        for line in &journal {
            if blocks.last() != Some(&owner(line)) {
                blocks.push(owner(line));
            }
        }
        assert_eq!(blocks, order);
        assert!(journal.last().unwrap().ends_with("close"));

        // Flow events: once participant N+1 appears, N never does again.
        let mut seen: Vec<String> = Vec::new();
        for record in events.lock().iter() {
            if seen.last() != Some(&record.participant) {
                assert!(!seen.contains(&record.participant), "interleaved log lines");
                seen.push(record.participant.clone());
            }
        }
        assert_eq!(seen, order);
    }

    #[tokio::test(start_paused = true)]
    async fn context_failure_does_not_stop_later_participants() {
        let contexts = Arc::new(ScriptedContexts {
            fail_for: Some("two@example.com".into()),
            ..Default::default()
        });
        let participants = people(&["one@example.com", "two@example.com", "three@example.com"]);

        let outcomes = orchestrator(contexts.clone(), EventJournal::default())
            .run_all(&participants, &CancellationToken::new())
            .await;

        assert!(matches!(outcomes[1].result, Err(FlowError::Context(_))));
        assert_eq!(
            *contexts.opened.lock(),
            vec!["one@example.com".to_string(), "three@example.com".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_aborts_remaining_runs() {
        let contexts = Arc::new(ScriptedContexts::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcomes = orchestrator(contexts.clone(), EventJournal::default())
            .run_all(&people(&["one@example.com", "two@example.com"]), &cancel)
            .await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.result == Err(FlowError::Cancelled)));
        assert!(contexts.opened.lock().is_empty());
    }
}
