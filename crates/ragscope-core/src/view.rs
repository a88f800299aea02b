//! The session currently shown to the operator, and the guard that keeps
//! late retrieval results from overwriting a newer selection.

use std::sync::Arc;

use crate::partition::{slice, Block, EventRange, Partition};
use crate::transcript::Transcript;
use crate::types::LogEvent;

// ── Load sequencing ──

/// Identifies one retrieval request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    seq: u64,
    session_id: Option<String>,
}

impl LoadTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Session the request was issued for (`None` for the sessions list).
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

/// Issues monotonically increasing tickets; only the latest is current.
#[derive(Debug, Default)]
pub struct LoadSequencer {
    latest: u64,
}

impl LoadSequencer {
    pub fn issue(&mut self, session_id: Option<&str>) -> LoadTicket {
        self.latest += 1;
        LoadTicket {
            seq: self.latest,
            session_id: session_id.map(str::to_string),
        }
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.seq == self.latest
    }
}

// ── Active view ──

/// A debug slice request, tied to the session it was computed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceRequest {
    pub session_id: String,
    pub range: EventRange,
}

/// Immutable snapshot of one loaded session: its log, partition and
/// transcript. Replaced wholesale on every load.
#[derive(Debug, Clone)]
pub struct ActiveSessionView {
    session_id: String,
    log: Arc<[LogEvent]>,
    partition: Partition,
    transcript: Transcript,
}

impl ActiveSessionView {
    pub fn new(session_id: &str, log: Vec<LogEvent>) -> Self {
        let partition = Partition::compute(&log);
        let transcript = Transcript::build(&log, &partition);
        Self {
            session_id: session_id.to_string(),
            log: log.into(),
            partition,
            transcript,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn log(&self) -> &[LogEvent] {
        &self.log
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Build a slice request for one block of this view.
    pub fn request(&self, block: Block) -> Option<SliceRequest> {
        self.partition.range_of(block).map(|range| SliceRequest {
            session_id: self.session_id.clone(),
            range,
        })
    }

    /// Resolve a slice request. Requests computed for another session are
    /// stale and yield `None`; ranges past the end of the log are clamped.
    pub fn resolve(&self, req: &SliceRequest) -> Option<&[LogEvent]> {
        if req.session_id != self.session_id {
            tracing::debug!(
                requested = %req.session_id,
                active = %self.session_id,
                "ignoring slice request for inactive session"
            );
            return None;
        }
        Some(slice(&self.log, req.range.clamp(self.log.len())))
    }
}

/// Holder for the active view plus the sequencers for both kinds of load.
#[derive(Debug, Default)]
pub struct SessionViewer {
    list_loads: LoadSequencer,
    detail_loads: LoadSequencer,
    active: Option<ActiveSessionView>,
}

impl SessionViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&ActiveSessionView> {
        self.active.as_ref()
    }

    /// Start a sessions-list retrieval.
    pub fn begin_list_load(&mut self) -> LoadTicket {
        self.list_loads.issue(None)
    }

    /// Whether a sessions-list result may still be committed.
    pub fn accepts_list(&self, ticket: &LoadTicket) -> bool {
        self.list_loads.is_current(ticket)
    }

    /// Start a session-detail retrieval.
    pub fn begin_session_load(&mut self, session_id: &str) -> LoadTicket {
        self.detail_loads.issue(Some(session_id))
    }

    /// Whether a session-detail result (or failure) may still be shown.
    pub fn accepts_session(&self, ticket: &LoadTicket) -> bool {
        self.detail_loads.is_current(ticket)
    }

    /// Commit a finished session retrieval. Results for a superseded ticket
    /// are discarded and `false` is returned.
    pub fn commit_session(&mut self, ticket: &LoadTicket, log: Vec<LogEvent>) -> bool {
        let Some(session_id) = ticket.session_id() else {
            return false;
        };
        if !self.detail_loads.is_current(ticket) {
            tracing::debug!(
                session_id,
                seq = ticket.seq(),
                "discarding stale session load"
            );
            return false;
        }
        self.active = Some(ActiveSessionView::new(session_id, log));
        true
    }

    pub fn clear(&mut self) {
        self.active = None;
    }
}
