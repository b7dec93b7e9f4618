//! Alarm controller and the double-click bridge
//!
//! Once a booking is confirmed the controller signals every `repeat_interval`
//! until someone acknowledges it from the page (a double-click posts into the
//! controller's channel) or the run is cancelled. There is no timeout.

use action_primitives::{dialogs::millis, ActionError, EventLog, Page};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::errors::FlowError;

/// Page-side function name the double-click handler calls.
pub const STOP_BINDING: &str = "__slotwatchStopAlarm";

const DOUBLE_CLICK_SCRIPT: &str = r#"(() => {
  if (window.__slotwatchDblclickInstalled) { return; }
  window.__slotwatchDblclickInstalled = true;
  document.addEventListener('dblclick', () => {
    if (window.__slotwatchStopAlarm) { window.__slotwatchStopAlarm('dblclick'); }
  }, { once: true });
})();"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    #[serde(with = "millis")]
    pub repeat_interval: Duration,

    #[serde(with = "millis")]
    pub signal_duration: Duration,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            repeat_interval: Duration::from_secs(60),
            signal_duration: Duration::from_secs(2),
        }
    }
}

/// Something audible or visible.
#[async_trait]
pub trait SignalSink: Send + Sync {
    /// Emit one signal lasting `duration`; returns when it is over.
    async fn emit(&self, duration: Duration) -> Result<(), FlowError>;
}

/// Rings the terminal bell and holds for the signal duration.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

#[async_trait]
impl SignalSink for TerminalBell {
    async fn emit(&self, duration: Duration) -> Result<(), FlowError> {
        let mut out = std::io::stdout();
        out.write_all(b"\x07")
            .and_then(|_| out.flush())
            .map_err(|err| FlowError::Alarm(err.to_string()))?;
        sleep(duration).await;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmPhase {
    Idle,
    Signaling,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Acknowledged from `source`, e.g. "dblclick"
    Acknowledged(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmReport {
    pub signals: u32,
    pub stopped_by: StopReason,
}

/// Sending half handed to whatever can acknowledge the alarm.
#[derive(Debug, Clone)]
pub struct AlarmBridge {
    tx: mpsc::UnboundedSender<String>,
}

impl AlarmBridge {
    /// Returns false once the controller is gone.
    pub fn acknowledge(&self, source: impl Into<String>) -> bool {
        self.tx.send(source.into()).is_ok()
    }
}

pub struct AlarmController {
    config: AlarmConfig,
    sink: Arc<dyn SignalSink>,
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
    phase: watch::Sender<AlarmPhase>,
}

impl AlarmController {
    pub fn new(config: AlarmConfig, sink: Arc<dyn SignalSink>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (phase, _) = watch::channel(AlarmPhase::Idle);
        Self {
            config,
            sink,
            tx,
            rx,
            phase,
        }
    }

    pub fn bridge(&self) -> AlarmBridge {
        AlarmBridge {
            tx: self.tx.clone(),
        }
    }

    pub fn phase(&self) -> AlarmPhase {
        *self.phase.borrow()
    }

    /// Phase updates that outlive the controller; `run` consumes it.
    pub fn watch_phase(&self) -> watch::Receiver<AlarmPhase> {
        self.phase.subscribe()
    }

    /// Signal until acknowledged or cancelled. Consumes the controller, so
    /// nothing can be emitted once it has stopped. Every signal is logged
    /// against `log`'s participant.
    pub async fn run(mut self, log: &EventLog, cancel: &CancellationToken) -> AlarmReport {
        self.phase.send_replace(AlarmPhase::Signaling);
        let mut signals = 0u32;

        let stopped_by = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if let Ok(source) = self.rx.try_recv() {
                break StopReason::Acknowledged(source);
            }

            signals += 1;
            log.info(format!("alarm signal {signals}"));
            let sink = Arc::clone(&self.sink);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break StopReason::Cancelled,
                source = self.rx.recv() => break Self::stop_reason(source),
                result = sink.emit(self.config.signal_duration) => {
                    if let Err(err) = result {
                        log.error(format!("alarm signal {signals} error {err}"));
                    }
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break StopReason::Cancelled,
                source = self.rx.recv() => break Self::stop_reason(source),
                _ = sleep(self.config.repeat_interval) => {}
            }
        };

        self.phase.send_replace(AlarmPhase::Stopped);
        AlarmReport {
            signals,
            stopped_by,
        }
    }

    fn stop_reason(source: Option<String>) -> StopReason {
        match source {
            Some(source) => StopReason::Acknowledged(source),
            None => StopReason::Cancelled,
        }
    }
}

/// Expose the stop binding and install a one-shot `dblclick` handler on the
/// current document and every future one. Payloads are forwarded to `bridge`
/// until the page or the controller goes away.
pub async fn install_double_click_bridge(
    page: &dyn Page,
    bridge: AlarmBridge,
) -> Result<JoinHandle<()>, ActionError> {
    let mut calls = page.expose_binding(STOP_BINDING).await?;
    page.add_init_script(DOUBLE_CLICK_SCRIPT).await?;
    page.evaluate(DOUBLE_CLICK_SCRIPT).await?;

    Ok(tokio::spawn(async move {
        while let Some(payload) = calls.recv().await {
            let source = if payload.is_empty() {
                "page".to_string()
            } else {
                payload
            };
            if !bridge.acknowledge(source) {
                break;
            }
        }
    }))
}
