//! Structured JSONL event writer, one file per component.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ragscope_core::{EventKind, LogEvent};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Appends events for one component to `<dir>/<component>.jsonl`.
///
/// Writes from several processes are serialized with an exclusive lock on a
/// sibling `.lock` file.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    component: String,
    log_file: PathBuf,
    lock_file: PathBuf,
    offset: UtcOffset,
}

impl StructuredLogger {
    pub fn new(dir: &Path, component: &str, offset: UtcOffset) -> Self {
        Self {
            component: component.to_string(),
            log_file: dir.join(format!("{component}.jsonl")),
            lock_file: dir.join(format!(".{component}.lock")),
            offset,
        }
    }

    #[cfg(test)]
    fn path(&self) -> &Path {
        &self.log_file
    }

    /// Stamp and append one event; returns what was written.
    pub fn event(
        &self,
        kind: EventKind,
        session_id: Option<&str>,
        fields: serde_json::Value,
    ) -> anyhow::Result<LogEvent> {
        let mut event = LogEvent::new(kind);
        event.timestamp = timestamp(next_stamp()?.to_offset(self.offset))?;
        event.component = self.component.clone();
        event.session_id = session_id.map(str::to_string);
        if let serde_json::Value::Object(map) = fields {
            event.payload = map;
        }

        let line = serde_json::to_string(&event)?;
        let _lock = crate::lock_file(&self.lock_file)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(event)
    }
}

// Last stamp handed out, in unix milliseconds.
static LAST_STAMP_MS: Mutex<i128> = Mutex::new(0);

/// Current time at millisecond precision, strictly after every earlier stamp
/// from this process. Events from different component files then sort back
/// into emission order.
fn next_stamp() -> anyhow::Result<OffsetDateTime> {
    let now_ms = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let mut last = LAST_STAMP_MS.lock().unwrap_or_else(|e| e.into_inner());
    *last = now_ms.max(*last + 1);
    Ok(OffsetDateTime::from_unix_timestamp_nanos(*last * 1_000_000)?)
}

/// ISO-8601 with millisecond precision and a `+HH:MM` offset.
pub fn timestamp(dt: OffsetDateTime) -> anyhow::Result<String> {
    Ok(dt.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3][offset_hour sign:mandatory]:[offset_minute]"
    ))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn appends_jsonl_lines_readable_by_reader() {
        let tmp = tempfile::tempdir().unwrap();
        let logger = StructuredLogger::new(tmp.path(), "rag_engine", UtcOffset::UTC);
        logger
            .event(
                EventKind::UserQuestionReceived,
                Some("s1"),
                serde_json::json!({"question": "hi"}),
            )
            .unwrap();
        logger
            .event(EventKind::BotWaitingForInput, Some("s1"), serde_json::json!({}))
            .unwrap();

        let content = std::fs::read_to_string(logger.path()).unwrap();
        assert_eq!(content.lines().count(), 2);

        let events = crate::read_all_events(tmp.path()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].component, "rag_engine");
        assert_eq!(events[0].payload_str("question"), Some("hi"));
        assert_eq!(events[1].event, EventKind::BotWaitingForInput);
    }

    #[test]
    fn non_object_fields_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let logger = StructuredLogger::new(tmp.path(), "api", UtcOffset::UTC);
        let e = logger
            .event(EventKind::NewSession, None, serde_json::json!("oops"))
            .unwrap();
        assert!(e.payload.is_empty());
        assert!(e.session_id.is_none());
    }

    #[test]
    fn stamps_are_strictly_increasing() {
        let a = next_stamp().unwrap();
        let b = next_stamp().unwrap();
        assert!(b > a);
        assert!(timestamp(b).unwrap() > timestamp(a).unwrap());
    }

    #[test]
    fn timestamp_has_millis_and_offset() {
        let dt = datetime!(2025-06-01 10:04:05.123_456 +05:30);
        assert_eq!(timestamp(dt).unwrap(), "2025-06-01T10:04:05.123+05:30");
        let dt = datetime!(2025-06-01 10:04:05 -03:30);
        assert_eq!(timestamp(dt).unwrap(), "2025-06-01T10:04:05.000-03:30");
        let dt = datetime!(2025-06-01 00:00:00 UTC);
        assert_eq!(timestamp(dt).unwrap(), "2025-06-01T00:00:00.000+00:00");
    }
}
