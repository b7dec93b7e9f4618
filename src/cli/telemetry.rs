//! Tagged log line formatting
//!
//! Flow events carry `tag` and `participant` fields (see
//! [`action_primitives::EventLog`]). This formatter renders every event as
//! `YYYY-MM-DD HH:MM:SS [TAG] participant message`, the same line on stdout
//! and in the log file. Events without a tag get one from their level.

use chrono::Local;
use slotwatch_core_types::LogTag;
use std::fmt::{self, Write as _};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Default, Clone, Copy)]
pub struct TaggedFormat;

impl<S, N> FormatEvent<S, N> for TaggedFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = TaggedFields::default();
        event.record(&mut fields);

        let tag = fields
            .tag
            .unwrap_or_else(|| level_tag(event.metadata().level()).as_str().to_string());
        let timestamp = Local::now().format(TIMESTAMP_FORMAT);
        writeln!(
            writer,
            "{}",
            render_line(&timestamp.to_string(), &tag, &fields.participant, &fields.message)
        )
    }
}

/// Tag used for events emitted outside [`action_primitives::EventLog`].
fn level_tag(level: &Level) -> LogTag {
    if *level <= Level::WARN {
        LogTag::Error
    } else {
        LogTag::Info
    }
}

pub(crate) fn render_line(timestamp: &str, tag: &str, participant: &str, message: &str) -> String {
    if participant.is_empty() {
        format!("{timestamp} [{tag}] {message}")
    } else {
        format!("{timestamp} [{tag}] {participant} {message}")
    }
}

#[derive(Default)]
struct TaggedFields {
    tag: Option<String>,
    participant: String,
    message: String,
}

impl TaggedFields {
    fn set_message(&mut self, message: String) {
        if self.message.is_empty() {
            self.message = message;
        } else {
            self.message.insert_str(0, &format!("{message} "));
        }
    }

    fn push_extra(&mut self, name: &str, value: &dyn fmt::Display) {
        if !self.message.is_empty() {
            self.message.push(' ');
        }
        let _ = write!(self.message, "{name}={value}");
    }
}

impl Visit for TaggedFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "tag" => self.tag = Some(value.to_string()),
            "participant" => self.participant = value.to_string(),
            "message" => self.set_message(value.to_string()),
            name => self.push_extra(name, &value),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        match field.name() {
            "message" => self.set_message(rendered),
            "tag" => self.tag = Some(rendered),
            "participant" => self.participant = rendered,
            name => self.push_extra(name, &rendered),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::EventLog;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    fn capture<F: FnOnce()>(emit: F) -> Vec<String> {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .event_format(TaggedFormat)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, emit);
        capture.lines()
    }

    #[test]
    fn flow_events_render_tag_and_participant() {
        let lines = capture(|| {
            let log = EventLog::new("ada@example.com");
            log.pass("clicked select modules");
            log.reload_err("reload failed: timeout");
        });

        assert_eq!(lines.len(), 2);
        let (timestamp, rest) = lines[0].split_at("2024-01-01 00:00:00".len());
        assert!(chrono::NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).is_ok());
        assert_eq!(rest, " [PASS] ada@example.com clicked select modules");
        assert!(lines[1].ends_with(" [RELOAD_ERR] ada@example.com reload failed: timeout"));
    }

    #[test]
    fn untagged_events_use_their_level() {
        let lines = capture(|| {
            tracing::info!(count = 3, "participants loaded");
            tracing::warn!("interrupt received");
        });

        assert!(lines[0].ends_with(" [INFO] participants loaded count=3"));
        assert!(lines[1].ends_with(" [ERROR] interrupt received"));
    }

    #[test]
    fn line_without_participant_has_single_spacing() {
        assert_eq!(
            render_line("2024-05-01 09:00:00", "INFO", "", "starting"),
            "2024-05-01 09:00:00 [INFO] starting"
        );
    }
}
