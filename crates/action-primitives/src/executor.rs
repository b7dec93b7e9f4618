//! Step executor
//!
//! Attempts one logical step against a [`Page`] and reports a [`StepOutcome`].
//! Variants are tried in order; the first one that resolves is acted upon.

use slotwatch_core_types::StepOutcome;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::{
    events::EventLog,
    fields::{match_fields, FieldEntry},
    locator::LocatorSet,
    page::Page,
    types::ElementRef,
};

/// What to do with the element once a variant resolves.
#[derive(Debug, Clone, Copy)]
pub enum StepAct<'a> {
    Click,
    Fill(&'a str),
    Select(&'a str),
    /// Presence alone is success
    Observe,
}

impl StepAct<'_> {
    async fn apply(&self, page: &dyn Page, element: &ElementRef) -> Result<(), String> {
        let result = match self {
            StepAct::Click => page.click(element).await,
            StepAct::Fill(value) => page.fill(element, value).await,
            StepAct::Select(label) => page.select_option(element, label).await,
            StepAct::Observe => Ok(()),
        };
        result.map_err(|err| err.to_string())
    }
}

/// Try each variant in order.
///
/// `Success` on the first match-and-act, `NotFound` when nothing matched within
/// `timeout` per variant, `InteractionError` when acting failed or a lookup
/// raised and no other variant matched.
pub async fn attempt_step(
    page: &dyn Page,
    variants: &LocatorSet,
    act: StepAct<'_>,
    timeout: Duration,
) -> StepOutcome {
    let mut lookup_error: Option<String> = None;

    for anchor in variants.iter() {
        match page.locate(anchor, timeout).await {
            Ok(Some(element)) => {
                debug!(anchor = %anchor, selector = %element.selector, "variant resolved");
                return match act.apply(page, &element).await {
                    Ok(()) => StepOutcome::Success,
                    Err(detail) => StepOutcome::InteractionError(detail),
                };
            }
            Ok(None) => continue,
            Err(err) if err.is_absence() => continue,
            Err(err) => {
                debug!(anchor = %anchor, error = %err, "variant lookup failed");
                lookup_error.get_or_insert_with(|| err.to_string());
            }
        }
    }

    match lookup_error {
        Some(detail) => StepOutcome::InteractionError(detail),
        None => StepOutcome::NotFound,
    }
}

/// One credential-style input: where it is and what goes in it.
#[derive(Debug, Clone)]
pub struct FillTarget {
    pub label: String,
    pub variants: LocatorSet,
    pub value: String,
}

#[derive(Debug, Clone)]
pub enum StepAction {
    /// Click a labeled control
    Click(LocatorSet),

    /// Fill every target in order, then click `submit`
    Fill {
        targets: Vec<FillTarget>,
        submit: LocatorSet,
    },

    /// Fill matched personal-detail fields, then click `submit`
    FillForm {
        entries: Vec<FieldEntry>,
        submit: LocatorSet,
    },

    /// Wait up to `timeout` for content to appear
    AwaitVisible { target: LocatorSet, timeout: Duration },
}

#[derive(Debug, Clone)]
pub struct Step {
    pub id: String,
    pub action: StepAction,
}

impl Step {
    pub fn click(id: impl Into<String>, target: LocatorSet) -> Self {
        Self {
            id: id.into(),
            action: StepAction::Click(target),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTimings {
    /// Per-variant lookup timeout
    pub lookup_timeout: Duration,

    /// Pause after a successful act
    pub settle: Duration,
}

impl Default for StepTimings {
    fn default() -> Self {
        Self {
            lookup_timeout: Duration::from_millis(5_000),
            settle: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StepExecutor {
    timings: StepTimings,
}

impl StepExecutor {
    pub fn new(timings: StepTimings) -> Self {
        Self { timings }
    }

    pub async fn attempt(&self, page: &dyn Page, step: &Step, log: &EventLog) -> StepOutcome {
        log.info(format!("attempting step {}", step.id));
        match &step.action {
            StepAction::Click(target) => self.click(page, target).await,
            StepAction::Fill { targets, submit } => {
                for target in targets {
                    let outcome = attempt_step(
                        page,
                        &target.variants,
                        StepAct::Fill(&target.value),
                        self.timings.lookup_timeout,
                    )
                    .await;
                    if !outcome.is_success() {
                        log.error(format!("could not fill {}: {}", target.label, outcome));
                        return outcome;
                    }
                    log.info(format!("filled {}", target.label));
                }
                self.click(page, submit).await
            }
            StepAction::FillForm { entries, submit } => {
                self.fill_form(page, entries, log).await;
                self.click(page, submit).await
            }
            StepAction::AwaitVisible { target, timeout } => {
                attempt_step(page, target, StepAct::Observe, *timeout).await
            }
        }
    }

    async fn click(&self, page: &dyn Page, target: &LocatorSet) -> StepOutcome {
        let outcome =
            attempt_step(page, target, StepAct::Click, self.timings.lookup_timeout).await;
        if outcome.is_success() && !self.timings.settle.is_zero() {
            sleep(self.timings.settle).await;
        }
        outcome
    }

    /// Fill errors are logged, never fatal; the submit click decides the step.
    async fn fill_form(&self, page: &dyn Page, entries: &[FieldEntry], log: &EventLog) {
        let fields = match page.form_fields().await {
            Ok(fields) => fields,
            Err(err) => {
                log.error(format!("form field scan error {err}"));
                return;
            }
        };

        for (field, entry) in match_fields(&fields, entries) {
            let element = field.element();
            let result = if field.is_select() {
                page.select_option(&element, &entry.value).await
            } else {
                page.fill(&element, &entry.value).await
            };
            match result {
                Ok(()) => log.info(format!("filled field {}", entry.category.name())),
                Err(err) => log.error(format!(
                    "field fill error {} ({}): {err}",
                    entry.category.name(),
                    field.selector
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Control, ScriptedPage};
    use crate::types::FormField;
    use slotwatch_core_types::Participant;

    fn login_step() -> Step {
        Step {
            id: "login".into(),
            action: StepAction::Fill {
                targets: vec![
                    FillTarget {
                        label: "email".into(),
                        variants: LocatorSet::css(&["input[type='email']", "input[name='email']"]),
                        value: "a@example.com".into(),
                    },
                    FillTarget {
                        label: "password".into(),
                        variants: LocatorSet::css(&["input[type='password']"]),
                        value: "secret".into(),
                    },
                ],
                submit: LocatorSet::labeled("button", &["log in", "login", "sign in"]),
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn synonym_variant_succeeds() {
        let page = ScriptedPage::new("p")
            .with_control(Control::input("input[name='email']"))
            .with_control(Control::input("input[type='password']"))
            .with_control(Control::button("Sign in"));
        let outcome = StepExecutor::default()
            .attempt(&page, &login_step(), &EventLog::new("a@example.com"))
            .await;

        assert_eq!(outcome, StepOutcome::Success);
        assert_eq!(page.clicks("sign in"), 1);
        assert_eq!(
            page.fills(),
            vec![
                ("input[name='email']".to_string(), "a@example.com".to_string()),
                ("input[type='password']".to_string(), "secret".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_password_stops_before_submit() {
        let page = ScriptedPage::new("p")
            .with_control(Control::input("input[type='email']"))
            .with_control(Control::button("Log in"));
        let outcome = StepExecutor::default()
            .attempt(&page, &login_step(), &EventLog::new("a@example.com"))
            .await;

        assert_eq!(outcome, StepOutcome::NotFound);
        assert_eq!(page.clicks("log in"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_matches_is_not_found() {
        let page = ScriptedPage::new("p").with_control(Control::button("Back"));
        let step = Step::click("continue", LocatorSet::labeled("button", &["continue"]));
        let outcome = StepExecutor::default()
            .attempt(&page, &step, &EventLog::new("x"))
            .await;
        assert_eq!(outcome, StepOutcome::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_click_is_interaction_error() {
        let page = ScriptedPage::new("p")
            .with_control(Control::button("Continue").failing_click("element detached"));
        let step = Step::click("continue", LocatorSet::labeled("button", &["continue"]));
        let outcome = StepExecutor::default()
            .attempt(&page, &step, &EventLog::new("x"))
            .await;
        assert!(matches!(outcome, StepOutcome::InteractionError(ref d) if d.contains("detached")));
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_error_is_masked_by_later_match() {
        let page = ScriptedPage::new("p")
            .with_control(Control::input("#broken").failing_lookup("protocol error"))
            .with_control(Control::button("Continue"));
        let variants = LocatorSet::css(&["#broken"]).or(LocatorSet::labeled("button", &["continue"]));

        let outcome = attempt_step(&page, &variants, StepAct::Click, Duration::from_millis(10)).await;
        assert_eq!(outcome, StepOutcome::Success);

        let only_broken = LocatorSet::css(&["#broken"]);
        let outcome =
            attempt_step(&page, &only_broken, StepAct::Click, Duration::from_millis(10)).await;
        assert!(matches!(outcome, StepOutcome::InteractionError(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn form_fill_uses_selects_and_submits() {
        let participant = Participant {
            email: "a@example.com".into(),
            phone: "0700".into(),
            county: "Nairobi".into(),
            ..Default::default()
        };
        let field = |index: usize, tag: &str, name: &str| FormField {
            index,
            tag: tag.into(),
            name: name.into(),
            selector: format!("#{name}"),
            ..Default::default()
        };
        let page = ScriptedPage::new("p")
            .with_fields(vec![field(0, "input", "mobile"), field(1, "select", "county")])
            .with_control(Control::button("Continue"));
        let step = Step {
            id: "details".into(),
            action: StepAction::FillForm {
                entries: FieldEntry::for_participant(&participant),
                submit: LocatorSet::labeled("button", &["continue"]),
            },
        };

        let outcome = StepExecutor::default()
            .attempt(&page, &step, &EventLog::new("a@example.com"))
            .await;

        assert_eq!(outcome, StepOutcome::Success);
        assert_eq!(page.fills(), vec![("#mobile".to_string(), "0700".to_string())]);
        assert_eq!(page.selects(), vec![("#county".to_string(), "Nairobi".to_string())]);
    }
}
