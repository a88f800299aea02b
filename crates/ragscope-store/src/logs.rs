//! Reading session logs from a directory of component `*.jsonl` files.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use ragscope_core::{LogEvent, SessionSummary};

use crate::StoreError;

/// Read every event from every `*.jsonl` file in `dir`.
///
/// Malformed lines are skipped. A missing directory yields no events.
/// Events are stable-sorted by timestamp, so lines with equal timestamps
/// keep their file order (files are visited in name order).
pub fn read_all_events(dir: &Path) -> anyhow::Result<Vec<LogEvent>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    if !dir.is_dir() {
        return Err(StoreError::NotADirectory(dir.to_path_buf()).into());
    }

    let mut files: Vec<_> = fs::read_dir(dir)
        .map_err(|source| StoreError::Read {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("jsonl"))
        .collect();
    files.sort();

    let mut events = Vec::new();
    for path in &files {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable log file");
                continue;
            }
        };
        let mut skipped = 0usize;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEvent>(line) {
                Ok(event) => events.push(event),
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::debug!(path = %path.display(), skipped, "skipped malformed log lines");
        }
    }

    events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    Ok(events)
}

/// Group events into per-session summaries, newest activity first.
///
/// Events without a session id (ingestion, vector store setup) are ignored.
pub fn list_sessions(events: &[LogEvent]) -> Vec<SessionSummary> {
    let mut order: Vec<String> = Vec::new();
    let mut by_id: HashMap<String, SessionSummary> = HashMap::new();

    for event in events {
        let Some(sid) = event.session_id.as_deref().filter(|s| !s.is_empty()) else {
            continue;
        };
        match by_id.get_mut(sid) {
            Some(summary) => {
                summary.last_activity = event.timestamp.clone();
                summary.event_count += 1;
            }
            None => {
                order.push(sid.to_string());
                by_id.insert(
                    sid.to_string(),
                    SessionSummary {
                        session_id: sid.to_string(),
                        start_time: event.timestamp.clone(),
                        last_activity: event.timestamp.clone(),
                        event_count: 1,
                    },
                );
            }
        }
    }

    let mut sessions: Vec<SessionSummary> = order
        .into_iter()
        .filter_map(|sid| by_id.remove(&sid))
        .collect();
    sessions.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
    sessions
}

/// The ordered log of one session.
pub fn session_events(events: &[LogEvent], session_id: &str) -> Vec<LogEvent> {
    events
        .iter()
        .filter(|e| e.session_id.as_deref() == Some(session_id))
        .cloned()
        .collect()
}

/// Case-insensitive substring match on the session id.
pub fn filter_sessions<'a>(sessions: &'a [SessionSummary], query: &str) -> Vec<&'a SessionSummary> {
    let query = query.trim().to_lowercase();
    sessions
        .iter()
        .filter(|s| query.is_empty() || s.session_id.to_lowercase().contains(&query))
        .collect()
}
