//! Tagged flow events
//!
//! Every step, poll cycle and alarm event goes through [`EventLog`], which
//! emits one `tracing` event carrying `tag` and `participant` fields. The CLI
//! formatter turns those into `ts [TAG] participant message` lines.

use parking_lot::Mutex;
use slotwatch_core_types::LogTag;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Captured copy of an emitted event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    pub tag: LogTag,
    pub participant: String,
    pub message: String,
}

/// Shared in-memory capture, attached by tests and the orchestrator's callers.
pub type EventJournal = Arc<Mutex<Vec<LogRecord>>>;

#[derive(Clone, Debug)]
pub struct EventLog {
    participant: Arc<str>,
    journal: Option<EventJournal>,
}

impl EventLog {
    pub fn new(participant: impl Into<String>) -> Self {
        let participant: String = participant.into();
        Self {
            participant: Arc::from(participant),
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: EventJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn emit(&self, tag: LogTag, message: impl Display) {
        let message = message.to_string();
        let participant = &*self.participant;
        match tag {
            LogTag::Fail | LogTag::ReloadErr => {
                warn!(tag = tag.as_str(), participant, "{message}")
            }
            LogTag::Error => error!(tag = tag.as_str(), participant, "{message}"),
            LogTag::Info | LogTag::Pass | LogTag::ReloadOk => {
                info!(tag = tag.as_str(), participant, "{message}")
            }
        }
        if let Some(journal) = &self.journal {
            journal.lock().push(LogRecord {
                tag,
                participant: participant.to_string(),
                message,
            });
        }
    }

    pub fn info(&self, message: impl Display) {
        self.emit(LogTag::Info, message);
    }

    pub fn pass(&self, message: impl Display) {
        self.emit(LogTag::Pass, message);
    }

    pub fn fail(&self, message: impl Display) {
        self.emit(LogTag::Fail, message);
    }

    pub fn error(&self, message: impl Display) {
        self.emit(LogTag::Error, message);
    }

    pub fn reload_ok(&self, message: impl Display) {
        self.emit(LogTag::ReloadOk, message);
    }

    pub fn reload_err(&self, message: impl Display) {
        self.emit(LogTag::ReloadErr, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_captures_tag_and_participant() {
        let journal = EventJournal::default();
        let log = EventLog::new("a@example.com").with_journal(journal.clone());
        log.pass("clicked continue");
        log.reload_err("reload error: net::ERR_ABORTED");

        let records = journal.lock();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tag, LogTag::Pass);
        assert_eq!(records[0].participant, "a@example.com");
        assert_eq!(records[1].tag, LogTag::ReloadErr);
        assert!(records[1].message.contains("ERR_ABORTED"));
    }
}
