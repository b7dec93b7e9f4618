//! Flow plan
//!
//! The ordered steps for one participant, built from a [`SiteProfile`]. Each
//! stage is keyed by the state it leaves; all of its steps must succeed for
//! the flow to move to that state's successor.

use action_primitives::{FieldEntry, FillTarget, LocatorSet, Step, StepAction};
use slotwatch_core_types::{FlowState, Participant};

use crate::profile::SiteProfile;

#[derive(Debug, Clone)]
pub struct Stage {
    pub from: FlowState,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone)]
pub struct FlowPlan {
    gate_variants: LocatorSet,
    gate: Step,
    stages: Vec<Stage>,
}

impl FlowPlan {
    pub fn build(profile: &SiteProfile, participant: &Participant) -> Self {
        let login = Step {
            id: "login".into(),
            action: StepAction::Fill {
                targets: vec![
                    FillTarget {
                        label: "email".into(),
                        variants: profile.email_inputs.clone(),
                        value: participant.email.clone(),
                    },
                    FillTarget {
                        label: "password".into(),
                        variants: profile.password_inputs.clone(),
                        value: participant.password.clone(),
                    },
                ],
                submit: profile.login_submit.clone(),
            },
        };

        let details = Step {
            id: "personal-details".into(),
            action: StepAction::FillForm {
                entries: FieldEntry::with_keys(participant, |category| profile.keys_for(category)),
                submit: profile.continue_button.clone(),
            },
        };

        let confirmation = Step {
            id: "confirmation".into(),
            action: StepAction::AwaitVisible {
                target: profile.confirmation.clone(),
                timeout: profile.timings.confirmation_timeout,
            },
        };

        let stages = vec![
            Stage {
                from: FlowState::ModulesSelected,
                steps: vec![Step::click("continue", profile.continue_button.clone())],
            },
            Stage {
                from: FlowState::PurposeSelected,
                steps: vec![
                    Step::click("book-for-myself", profile.book_for_myself.clone()),
                    login,
                ],
            },
            Stage {
                from: FlowState::LoggedIn,
                steps: vec![details],
            },
            Stage {
                from: FlowState::DetailsSubmitted,
                steps: vec![Step::click("review-continue", profile.continue_button.clone())],
            },
            Stage {
                from: FlowState::Reviewed,
                steps: vec![Step::click("order", profile.order_button.clone())],
            },
            Stage {
                from: FlowState::Ordered,
                steps: vec![confirmation],
            },
        ];

        Self {
            gate_variants: profile.gate.clone(),
            gate: Step::click("select-modules", profile.gate.clone()),
            stages,
        }
    }

    /// What the poller watches for.
    pub fn gate_variants(&self) -> &LocatorSet {
        &self.gate_variants
    }

    /// The click that leaves `AwaitingOpen`, over the same variants.
    pub fn gate(&self) -> &Step {
        &self.gate
    }

    pub fn stage(&self, state: &FlowState) -> Option<&Stage> {
        self.stages.iter().find(|stage| &stage.from == state)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}
