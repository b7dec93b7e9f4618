//! Restart policy
//!
//! The only recovery path: go back to the start page, let it settle, clear
//! any consent dialog. Navigation errors are logged and swallowed; the
//! poller's reload loop takes over from whatever state the page is in.

use action_primitives::{dismiss_transient_dialogs, DialogProfile, EventLog, Page};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::errors::FlowError;
use crate::poller::{cancellable_sleep, until_cancelled};
use crate::profile::SiteProfile;

#[derive(Debug, Clone)]
pub struct RestartPolicy {
    start_url: String,
    settle: Duration,
    dialogs: DialogProfile,
}

impl RestartPolicy {
    pub fn new(start_url: impl Into<String>, settle: Duration, dialogs: DialogProfile) -> Self {
        Self {
            start_url: start_url.into(),
            settle,
            dialogs,
        }
    }

    pub fn from_profile(profile: &SiteProfile) -> Self {
        Self::new(
            profile.start_url.clone(),
            profile.timings.step_wait,
            profile.dialogs.clone(),
        )
    }

    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    /// Only cancellation is an error; every wait in here observes `cancel`.
    pub async fn restart(
        &self,
        page: &dyn Page,
        log: &EventLog,
        cancel: &CancellationToken,
    ) -> Result<(), FlowError> {
        log.info(format!("navigating start {}", self.start_url));
        if let Err(err) = until_cancelled(page.goto(&self.start_url), cancel).await? {
            log.error(format!("navigation error {err}"));
        }
        if !self.settle.is_zero() {
            cancellable_sleep(self.settle, cancel).await?;
        }
        until_cancelled(dismiss_transient_dialogs(page, &self.dialogs, log), cancel).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::testing::{Control, ScriptedPage};
    use tokio::time::{sleep, Instant};

    #[tokio::test(start_paused = true)]
    async fn navigates_then_clears_dialog() {
        let page = ScriptedPage::new("p")
            .with_control(Control::button("Accept All").after_gotos(1).hide_on_click());
        let policy = RestartPolicy::from_profile(&SiteProfile::default());

        policy
            .restart(&page, &EventLog::new("x"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(page.gotos(), 1);
        assert_eq!(page.clicks("accept all"), 1);
        assert_eq!(
            page.journal(),
            vec![
                format!("p goto {}", policy.start_url()),
                "p click Accept All".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_settle_pause() {
        let page = ScriptedPage::new("p");
        let policy = RestartPolicy::new(
            "https://example.test/start",
            Duration::from_secs(600),
            DialogProfile::default(),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = policy
            .restart(&page, &EventLog::new("x"), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(page.gotos(), 1);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
