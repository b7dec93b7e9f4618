//! [`Page`] over a chromiumoxide page.

use action_primitives::{ActionError, AnchorDescriptor, ElementRef, FormField, Page};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::js_protocol::runtime::{AddBindingParams, EventBindingCalled};
use futures::StreamExt;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::CdpConfig;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::scripts::{self, ScriptStatus};

pub struct ChromiumPage {
    inner: chromiumoxide::Page,
    nav_timeout: Duration,
    poll_interval: Duration,
}

impl ChromiumPage {
    pub(crate) fn new(inner: chromiumoxide::Page, config: &CdpConfig) -> Self {
        Self {
            inner,
            nav_timeout: Duration::from_millis(config.nav_timeout_ms),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    pub(crate) fn into_inner(self) -> chromiumoxide::Page {
        self.inner
    }

    async fn eval_value(&self, expression: String) -> Result<Value, AdapterError> {
        let result = self.inner.evaluate(expression).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn bounded_navigation<F, T>(&self, what: &str, navigation: F) -> Result<(), AdapterError>
    where
        F: std::future::Future<Output = Result<T, chromiumoxide::error::CdpError>>,
    {
        match timeout(self.nav_timeout, navigation).await {
            Ok(result) => result.map(|_| ()).map_err(AdapterError::from),
            Err(_) => Err(AdapterError::new(AdapterErrorKind::NavTimeout)
                .with_hint(format!("{what} exceeded {}ms", self.nav_timeout.as_millis()))),
        }
    }

    /// Run a fill/select script and map its status.
    async fn apply(&self, expression: String, element: &ElementRef) -> Result<(), AdapterError> {
        let value = self.eval_value(expression).await?;
        match scripts::parse_status(&value) {
            ScriptStatus::Done | ScriptStatus::Found(_) => Ok(()),
            ScriptStatus::NotFound => Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(element.selector.clone())),
            ScriptStatus::OptionMissing => Err(AdapterError::new(
                AdapterErrorKind::OptionNotFound,
            )
            .with_hint(element.selector.clone())),
            ScriptStatus::Invalid(detail) => {
                Err(AdapterError::new(AdapterErrorKind::Internal).with_hint(detail))
            }
        }
    }
}

#[async_trait]
impl Page for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<(), ActionError> {
        debug!(url, "navigate");
        self.bounded_navigation("navigation", self.inner.goto(url))
            .await
            .map_err(ActionError::from)
    }

    async fn reload(&self) -> Result<(), ActionError> {
        self.bounded_navigation("reload", self.inner.reload())
            .await
            .map_err(ActionError::from)
    }

    async fn locate(
        &self,
        anchor: &AnchorDescriptor,
        timeout: Duration,
    ) -> Result<Option<ElementRef>, ActionError> {
        let token = Uuid::new_v4().simple().to_string();
        let expression = scripts::locate(anchor, &token);
        let deadline = Instant::now() + timeout;

        loop {
            let value = self
                .eval_value(expression.clone())
                .await
                .map_err(ActionError::from)?;
            match scripts::parse_status(&value) {
                ScriptStatus::Found(selector) => {
                    return Ok(Some(ElementRef::new(selector, anchor.clone())))
                }
                ScriptStatus::NotFound | ScriptStatus::Done | ScriptStatus::OptionMissing => {}
                ScriptStatus::Invalid(detail) => {
                    return Err(ActionError::Internal(format!("{anchor}: {detail}")))
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn click(&self, element: &ElementRef) -> Result<(), ActionError> {
        let target = self
            .inner
            .find_element(element.selector.as_str())
            .await
            .map_err(|err| {
                ActionError::from(
                    AdapterError::new(AdapterErrorKind::TargetNotFound)
                        .with_hint(format!("{}: {err}", element.selector)),
                )
            })?;
        target
            .click()
            .await
            .map_err(|err| ActionError::from(AdapterError::from(err)))?;
        Ok(())
    }

    async fn fill(&self, element: &ElementRef, value: &str) -> Result<(), ActionError> {
        self.apply(scripts::fill(&element.selector, value), element)
            .await
            .map_err(ActionError::from)
    }

    async fn select_option(&self, element: &ElementRef, label: &str) -> Result<(), ActionError> {
        self.apply(scripts::select(&element.selector, label), element)
            .await
            .map_err(ActionError::from)
    }

    async fn form_fields(&self) -> Result<Vec<FormField>, ActionError> {
        let value = self
            .eval_value(scripts::form_fields())
            .await
            .map_err(ActionError::from)?;
        serde_json::from_value(value)
            .map_err(|err| ActionError::Internal(format!("form field scan: {err}")))
    }

    async fn evaluate(&self, script: &str) -> Result<Value, ActionError> {
        self.eval_value(script.to_string())
            .await
            .map_err(ActionError::from)
    }

    async fn expose_binding(
        &self,
        name: &str,
    ) -> Result<mpsc::UnboundedReceiver<String>, ActionError> {
        let mut calls = self
            .inner
            .event_listener::<EventBindingCalled>()
            .await
            .map_err(|err| ActionError::from(AdapterError::from(err)))?;
        self.inner
            .execute(AddBindingParams::new(name))
            .await
            .map_err(|err| ActionError::from(AdapterError::from(err)))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let binding = name.to_string();
        tokio::spawn(async move {
            while let Some(call) = calls.next().await {
                if call.name != binding {
                    continue;
                }
                if tx.send(call.payload.clone()).is_err() {
                    break;
                }
            }
            debug!(binding = %binding, "binding stream closed");
        });
        Ok(rx)
    }

    async fn add_init_script(&self, source: &str) -> Result<(), ActionError> {
        self.inner
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(source))
            .await
            .map_err(|err| {
                warn!(error = %err, "init script rejected");
                ActionError::from(AdapterError::from(err))
            })?;
        Ok(())
    }
}
