//! Scripted in-memory page for tests.
//!
//! Controls become visible after a number of reloads or navigations, can hide
//! themselves when clicked, and can be told to fail lookups or clicks. Every
//! call is appended to a journal so tests can assert on ordering.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::{
    errors::ActionError,
    page::Page,
    types::{AnchorDescriptor, ElementRef, FormField},
};

/// Journal shared by several pages.
pub type SharedJournal = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone, Default)]
pub struct Control {
    pub role: String,
    pub label: String,
    pub css: Option<String>,
    pub visible_after_reloads: u32,
    pub visible_after_gotos: u32,
    pub hide_on_click: bool,
    pub group: Option<String>,
    pub hide_group_on_click: bool,
    pub fail_click: Option<String>,
    pub fail_lookup: Option<String>,
}

impl Control {
    pub fn button(label: &str) -> Self {
        Self {
            role: "button".into(),
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn link(label: &str) -> Self {
        Self {
            role: "link".into(),
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn text(label: &str) -> Self {
        Self {
            role: "text".into(),
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn input(css: &str) -> Self {
        Self {
            role: "textbox".into(),
            label: css.into(),
            css: Some(css.into()),
            ..Default::default()
        }
    }

    pub fn with_css(mut self, css: &str) -> Self {
        self.css = Some(css.into());
        self
    }

    pub fn after_reloads(mut self, reloads: u32) -> Self {
        self.visible_after_reloads = reloads;
        self
    }

    pub fn after_gotos(mut self, gotos: u32) -> Self {
        self.visible_after_gotos = gotos;
        self
    }

    pub fn hide_on_click(mut self) -> Self {
        self.hide_on_click = true;
        self
    }

    pub fn in_group(mut self, group: &str) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Clicking hides every control of the same group, like a banner closing.
    pub fn dismisses_group(mut self) -> Self {
        self.hide_group_on_click = true;
        self
    }

    pub fn failing_click(mut self, detail: &str) -> Self {
        self.fail_click = Some(detail.into());
        self
    }

    pub fn failing_lookup(mut self, detail: &str) -> Self {
        self.fail_lookup = Some(detail.into());
        self
    }

    fn matches(&self, anchor: &AnchorDescriptor) -> bool {
        match anchor {
            AnchorDescriptor::Css(selector) => self.css.as_deref() == Some(selector.as_str()),
            AnchorDescriptor::Aria { role, .. } => {
                self.role.eq_ignore_ascii_case(role) && anchor.matches_label(&self.label)
            }
            AnchorDescriptor::Text { .. } => anchor.matches_label(&self.label),
        }
    }
}

#[derive(Debug, Default)]
struct ControlState {
    control: Control,
    hidden: bool,
    clicks: u32,
}

#[derive(Debug, Default)]
struct PageState {
    controls: Vec<ControlState>,
    fields: Vec<FormField>,
    gotos: u32,
    reloads: u32,
    reload_attempts: u32,
    failing_reloads: u32,
    fills: Vec<(String, String)>,
    selects: Vec<(String, String)>,
    evaluated: Vec<String>,
    init_scripts: Vec<String>,
    bindings: HashMap<String, mpsc::UnboundedSender<String>>,
    wait_out_lookups: bool,
}

pub struct ScriptedPage {
    name: String,
    state: Mutex<PageState>,
    journal: SharedJournal,
}

impl ScriptedPage {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(PageState::default()),
            journal: SharedJournal::default(),
        }
    }

    /// Record calls into `journal` instead of a private one.
    pub fn with_journal(mut self, journal: SharedJournal) -> Self {
        self.journal = journal;
        self
    }

    pub fn with_control(self, control: Control) -> Self {
        self.state.lock().controls.push(ControlState {
            control,
            ..Default::default()
        });
        self
    }

    pub fn with_fields(self, fields: Vec<FormField>) -> Self {
        self.state.lock().fields = fields;
        self
    }

    /// A lookup that finds nothing waits out its timeout first, like a real
    /// browser does.
    pub fn waiting_out_lookups(self) -> Self {
        self.state.lock().wait_out_lookups = true;
        self
    }

    /// The next `count` reloads fail.
    pub fn with_failing_reloads(self, count: u32) -> Self {
        self.state.lock().failing_reloads = count;
        self
    }

    pub fn gotos(&self) -> u32 {
        self.state.lock().gotos
    }

    pub fn reloads(&self) -> u32 {
        self.state.lock().reloads
    }

    pub fn reload_attempts(&self) -> u32 {
        self.state.lock().reload_attempts
    }

    /// Total clicks on controls whose label contains `label`.
    pub fn clicks(&self, label: &str) -> u32 {
        let needle = label.to_lowercase();
        self.state
            .lock()
            .controls
            .iter()
            .filter(|c| c.control.label.to_lowercase().contains(&needle))
            .map(|c| c.clicks)
            .sum()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.state.lock().fills.clone()
    }

    pub fn selects(&self) -> Vec<(String, String)> {
        self.state.lock().selects.clone()
    }

    pub fn evaluated(&self) -> Vec<String> {
        self.state.lock().evaluated.clone()
    }

    pub fn init_scripts(&self) -> Vec<String> {
        self.state.lock().init_scripts.clone()
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }

    /// Simulate the page calling an exposed binding. Returns false when no
    /// such binding exists or its receiver is gone.
    pub fn trigger_binding(&self, name: &str, payload: &str) -> bool {
        match self.state.lock().bindings.get(name) {
            Some(tx) => tx.send(payload.to_string()).is_ok(),
            None => false,
        }
    }

    fn record(&self, event: String) {
        self.journal.lock().push(format!("{} {}", self.name, event));
    }

    fn control_index(selector: &str) -> Option<usize> {
        selector.strip_prefix("scripted:")?.parse().ok()
    }

    /// Label of a located control, or the raw selector for form fields.
    fn target_name(&self, element: &ElementRef) -> String {
        let state = self.state.lock();
        Self::control_index(&element.selector)
            .and_then(|idx| state.controls.get(idx))
            .map(|c| c.control.label.clone())
            .unwrap_or_else(|| element.selector.clone())
    }
}

#[async_trait]
impl Page for ScriptedPage {
    async fn goto(&self, url: &str) -> Result<(), ActionError> {
        self.state.lock().gotos += 1;
        self.record(format!("goto {url}"));
        Ok(())
    }

    async fn reload(&self) -> Result<(), ActionError> {
        let failed = {
            let mut state = self.state.lock();
            state.reload_attempts += 1;
            if state.failing_reloads > 0 {
                state.failing_reloads -= 1;
                true
            } else {
                state.reloads += 1;
                false
            }
        };
        if failed {
            self.record("reload failed".into());
            return Err(ActionError::NavTimeout("scripted reload failure".into()));
        }
        self.record("reload".into());
        Ok(())
    }

    async fn locate(
        &self,
        anchor: &AnchorDescriptor,
        timeout: Duration,
    ) -> Result<Option<ElementRef>, ActionError> {
        let wait_out = {
            let state = self.state.lock();
            for (idx, entry) in state.controls.iter().enumerate() {
                if !entry.control.matches(anchor) {
                    continue;
                }
                if let Some(detail) = &entry.control.fail_lookup {
                    return Err(ActionError::CdpIo(detail.clone()));
                }
                let visible = !entry.hidden
                    && state.reloads >= entry.control.visible_after_reloads
                    && state.gotos >= entry.control.visible_after_gotos;
                if visible {
                    return Ok(Some(ElementRef::new(format!("scripted:{idx}"), anchor.clone())));
                }
            }
            state.wait_out_lookups
        };
        if wait_out && !timeout.is_zero() {
            tokio::time::sleep(timeout).await;
        }
        Ok(None)
    }

    async fn click(&self, element: &ElementRef) -> Result<(), ActionError> {
        let label = self.target_name(element);
        let failure = {
            let mut state = self.state.lock();
            let idx = Self::control_index(&element.selector)
                .ok_or_else(|| ActionError::AnchorNotFound(element.selector.clone()))?;
            let entry = state
                .controls
                .get_mut(idx)
                .ok_or_else(|| ActionError::AnchorNotFound(element.selector.clone()))?;
            match &entry.control.fail_click {
                Some(detail) => Some(detail.clone()),
                None => {
                    entry.clicks += 1;
                    if entry.control.hide_on_click {
                        entry.hidden = true;
                    }
                    let closed = entry
                        .control
                        .group
                        .clone()
                        .filter(|_| entry.control.hide_group_on_click);
                    if let Some(group) = closed {
                        for other in state.controls.iter_mut() {
                            if other.control.group.as_deref() == Some(group.as_str()) {
                                other.hidden = true;
                            }
                        }
                    }
                    None
                }
            }
        };
        if let Some(detail) = failure {
            self.record(format!("click failed {label}"));
            return Err(ActionError::CdpIo(detail));
        }
        self.record(format!("click {label}"));
        Ok(())
    }

    async fn fill(&self, element: &ElementRef, value: &str) -> Result<(), ActionError> {
        let target = self.target_name(element);
        self.state.lock().fills.push((target.clone(), value.to_string()));
        self.record(format!("fill {target}"));
        Ok(())
    }

    async fn select_option(&self, element: &ElementRef, label: &str) -> Result<(), ActionError> {
        let target = self.target_name(element);
        self.state
            .lock()
            .selects
            .push((target.clone(), label.to_string()));
        self.record(format!("select {target}"));
        Ok(())
    }

    async fn form_fields(&self) -> Result<Vec<FormField>, ActionError> {
        Ok(self.state.lock().fields.clone())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, ActionError> {
        self.state.lock().evaluated.push(script.to_string());
        Ok(Value::Null)
    }

    async fn expose_binding(
        &self,
        name: &str,
    ) -> Result<mpsc::UnboundedReceiver<String>, ActionError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().bindings.insert(name.to_string(), tx);
        self.record(format!("binding {name}"));
        Ok(rx)
    }

    async fn add_init_script(&self, source: &str) -> Result<(), ActionError> {
        self.state.lock().init_scripts.push(source.to_string());
        Ok(())
    }
}
