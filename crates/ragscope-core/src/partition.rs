//! Segmentation of one session's event log into a setup block and one block
//! per user/assistant interaction.
//!
//! The partition is total: every index of the log belongs to exactly one
//! block, blocks are contiguous and listed in log order. Degenerate logs
//! (empty, no readiness marker, duplicate answers) always produce a defined
//! partition so broken sessions stay inspectable.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::types::{EventKind, LogEvent};

// ── Ranges ──

/// Half-open range of log indices `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EventRange {
    pub start: usize,
    pub end: usize,
}

impl EventRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted range [{start}, {end})");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    /// Whether this range addresses a log of `len` events.
    pub fn fits(&self, len: usize) -> bool {
        self.start <= self.end && self.end <= len
    }

    /// Clamp both bounds into `[0, len]`, keeping `start <= end`.
    pub fn clamp(&self, len: usize) -> Self {
        let end = self.end.min(len);
        let start = self.start.min(end);
        Self { start, end }
    }
}

impl fmt::Display for EventRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl From<EventRange> for Range<usize> {
    fn from(r: EventRange) -> Self {
        r.start..r.end
    }
}

// ── Partition ──

/// One user-originated turn and the events emitted while answering it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    /// Index of the `user_question_received` event that opened the turn.
    pub user_event: usize,
    /// Index of the first `answer_generated` event inside the range.
    pub answer_event: Option<usize>,
    /// Index of the readiness marker that closed the turn, if one arrived.
    pub ready_event: Option<usize>,
    pub range: EventRange,
}

impl Interaction {
    fn open(index: usize) -> Self {
        Self {
            user_event: index,
            answer_event: None,
            ready_event: None,
            range: EventRange::new(index, index),
        }
    }

    /// The assistant signalled readiness before the next turn or end of log.
    pub fn is_complete(&self) -> bool {
        self.ready_event.is_some()
    }
}

/// Total segmentation of a session log.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Partition {
    pub setup: EventRange,
    pub interactions: Vec<Interaction>,
}

/// A block of the partition, addressed by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Setup,
    Turn(usize),
}

impl Partition {
    /// Partition `log` in a single forward scan.
    ///
    /// Every user question opens an interaction at its own index, including
    /// questions logged before the first readiness marker. An interaction is
    /// closed by the next readiness marker (inclusive), or clipped at the next
    /// question, or runs to the end of the log. Setup is everything before the
    /// first question. Events between a readiness marker and the next question
    /// stay with the block they follow, so no index is left uncovered.
    pub fn compute(log: &[LogEvent]) -> Self {
        let mut interactions: Vec<Interaction> = Vec::new();

        for (i, event) in log.iter().enumerate() {
            match &event.event {
                EventKind::UserQuestionReceived => interactions.push(Interaction::open(i)),
                kind if kind.is_readiness() => {
                    if let Some(current) = interactions.last_mut() {
                        current.ready_event.get_or_insert(i);
                    }
                }
                EventKind::AnswerGenerated => {
                    // With no open interaction the answer stays in setup.
                    if let Some(current) = interactions.last_mut() {
                        current.answer_event.get_or_insert(i);
                    }
                }
                _ => {}
            }
        }

        let len = log.len();
        let setup_end = interactions.first().map_or(len, |first| first.user_event);
        let starts: Vec<usize> = interactions.iter().map(|it| it.user_event).collect();
        for (n, interaction) in interactions.iter_mut().enumerate() {
            let end = starts.get(n + 1).copied().unwrap_or(len);
            interaction.range = EventRange::new(interaction.user_event, end);
        }

        Self {
            setup: EventRange::new(0, setup_end),
            interactions,
        }
    }

    /// Number of log events covered.
    #[cfg(test)]
    fn event_count(&self) -> usize {
        self.interactions
            .last()
            .map_or(self.setup.end, |last| last.range.end)
    }

    /// The range of a block, if it exists.
    pub fn range_of(&self, block: Block) -> Option<EventRange> {
        match block {
            Block::Setup => Some(self.setup),
            Block::Turn(n) => self.interactions.get(n).map(|it| it.range),
        }
    }

    /// Setup range followed by every interaction range, in log order.
    pub fn ranges(&self) -> impl Iterator<Item = EventRange> + '_ {
        std::iter::once(self.setup).chain(self.interactions.iter().map(|it| it.range))
    }

    /// The block that owns a log index.
    #[cfg(test)]
    fn block_of(&self, index: usize) -> Option<Block> {
        if self.setup.contains(index) {
            return Some(Block::Setup);
        }
        self.interactions
            .iter()
            .position(|it| it.range.contains(index))
            .map(Block::Turn)
    }
}

// ── Operations ──

/// Range of the setup block.
pub fn compute_setup_range(log: &[LogEvent]) -> EventRange {
    Partition::compute(log).setup
}

/// Interactions in log order.
pub fn compute_interactions(log: &[LogEvent]) -> Vec<Interaction> {
    Partition::compute(log).interactions
}

/// The events of `range`.
///
/// Callers must only pass ranges computed for this same log. Debug builds
/// assert on an out-of-bounds range; release builds clamp it to the log.
pub fn slice(log: &[LogEvent], range: EventRange) -> &[LogEvent] {
    debug_assert!(
        range.fits(log.len()),
        "range {range} does not address a log of {} events",
        log.len()
    );
    let r = range.clamp(log.len());
    &log[r.start..r.end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(kind: EventKind) -> LogEvent {
        LogEvent::new(kind)
    }

    fn ready() -> LogEvent {
        ev(EventKind::BotWaitingForInput)
    }

    fn question(text: &str) -> LogEvent {
        ev(EventKind::UserQuestionReceived).with_field("question", text)
    }

    fn answer(text: &str) -> LogEvent {
        ev(EventKind::AnswerGenerated).with_field("full_answer", text)
    }

    fn other(tag: &str) -> LogEvent {
        ev(EventKind::from_tag(tag))
    }

    /// Gap-free, overlap-free, ordered, and reconstructs the log.
    fn assert_total(log: &[LogEvent], p: &Partition) {
        let mut cursor = 0;
        let mut rebuilt = Vec::new();
        for r in p.ranges() {
            assert_eq!(r.start, cursor, "gap or overlap at {r}");
            assert!(r.start <= r.end);
            rebuilt.extend_from_slice(slice(log, r));
            cursor = r.end;
        }
        assert_eq!(cursor, log.len());
        assert_eq!(rebuilt, log);
        assert_eq!(p.event_count(), log.len());
    }

    #[test]
    fn empty_log() {
        let log: Vec<LogEvent> = vec![];
        let p = Partition::compute(&log);
        assert_eq!(p.setup, EventRange::new(0, 0));
        assert!(p.interactions.is_empty());
        assert_total(&log, &p);
    }

    #[test]
    fn readiness_only() {
        let log = vec![ready()];
        assert_eq!(compute_setup_range(&log), EventRange::new(0, 1));
        assert!(compute_interactions(&log).is_empty());
    }

    #[test]
    fn single_turn() {
        let log = vec![ready(), question("hi"), answer("hello"), ready()];
        let p = Partition::compute(&log);
        assert_eq!(p.setup, EventRange::new(0, 1));
        assert_eq!(p.interactions.len(), 1);
        let it = &p.interactions[0];
        assert_eq!(it.range, EventRange::new(1, 4));
        assert_eq!(it.user_event, 1);
        assert_eq!(it.answer_event, Some(2));
        assert_eq!(it.ready_event, Some(3));
        assert!(it.is_complete());
        assert_total(&log, &p);
    }

    #[test]
    fn consecutive_questions_are_clipped() {
        let log = vec![
            ready(),
            question("a"),
            other("rag_search_started"),
            question("b"),
            answer("B"),
            ready(),
        ];
        let p = Partition::compute(&log);
        assert_eq!(p.interactions.len(), 2);
        assert_eq!(p.interactions[0].range, EventRange::new(1, 3));
        assert_eq!(p.interactions[1].range, EventRange::new(3, 6));
        assert_eq!(p.interactions[0].range.end, p.interactions[1].range.start);
        assert!(!p.interactions[0].is_complete());
        assert_eq!(p.interactions[0].answer_event, None);
        assert_eq!(p.interactions[1].answer_event, Some(4));
        assert_total(&log, &p);
    }

    #[test]
    fn no_readiness_marker_leaves_one_open_turn() {
        let log = vec![
            other("new_session"),
            question("hi"),
            other("rag_search_started"),
            answer("hello"),
        ];
        let p = Partition::compute(&log);
        assert_eq!(p.setup, EventRange::new(0, 1));
        assert_eq!(p.interactions.len(), 1);
        assert_eq!(p.interactions[0].range, EventRange::new(1, 4));
        assert_eq!(p.interactions[0].answer_event, Some(3));
        assert!(!p.interactions[0].is_complete());
        assert_total(&log, &p);
    }

    #[test]
    fn no_readiness_marker_and_no_question_is_all_setup() {
        let log = vec![other("new_session"), other("vectordb_initialized")];
        let p = Partition::compute(&log);
        assert_eq!(p.setup, EventRange::new(0, 2));
        assert!(p.interactions.is_empty());
        assert_total(&log, &p);
    }

    #[test]
    fn unanswered_questions_without_markers_each_open_a_turn() {
        let log = vec![
            other("new_session"),
            question("q1"),
            other("no_context_found"),
            question("q2"),
            other("no_context_found"),
        ];
        let p = Partition::compute(&log);
        assert_eq!(p.setup, EventRange::new(0, 1));
        assert_eq!(p.interactions.len(), 2);
        assert_eq!(p.interactions[0].range, EventRange::new(1, 3));
        assert_eq!(p.interactions[1].range, EventRange::new(3, 5));
        assert_total(&log, &p);
    }

    #[test]
    fn first_question_logged_right_after_new_session() {
        let log = vec![
            other("new_session"),
            question("first?"),
            other("rag_search_started"),
            answer("A1"),
            ready(),
            question("second?"),
            answer("A2"),
            ready(),
        ];
        let p = Partition::compute(&log);
        assert_eq!(p.setup, EventRange::new(0, 1));
        assert_eq!(p.interactions.len(), 2);
        let first = &p.interactions[0];
        assert_eq!(first.range, EventRange::new(1, 5));
        assert_eq!(first.answer_event, Some(3));
        assert_eq!(first.ready_event, Some(4));
        assert_eq!(p.interactions[1].range, EventRange::new(5, 8));
        assert_eq!(p.interactions[1].ready_event, Some(7));
        assert_total(&log, &p);
    }

    #[test]
    fn trailing_turn_without_marker_runs_to_end() {
        let log = vec![ready(), question("q"), other("no_context_found")];
        let p = Partition::compute(&log);
        assert_eq!(p.interactions[0].range, EventRange::new(1, 3));
        assert!(!p.interactions[0].is_complete());
        assert_total(&log, &p);
    }

    #[test]
    fn first_answer_wins_on_duplicates() {
        let log = vec![ready(), question("q"), answer("one"), answer("two"), ready()];
        let p = Partition::compute(&log);
        assert_eq!(p.interactions[0].answer_event, Some(2));
        assert_eq!(p.interactions[0].range.len(), 4);
    }

    #[test]
    fn answer_before_any_question_stays_in_setup() {
        let log = vec![answer("stray"), ready(), question("q"), ready()];
        let p = Partition::compute(&log);
        assert_eq!(p.setup, EventRange::new(0, 2));
        assert_eq!(p.interactions.len(), 1);
        assert_eq!(p.interactions[0].answer_event, None);
        assert_eq!(p.block_of(0), Some(Block::Setup));
        assert_total(&log, &p);
    }

    #[test]
    fn events_after_readiness_stay_with_previous_block() {
        let log = vec![
            other("new_session"),
            ready(),
            other("vectordb_initialized"),
            question("q1"),
            answer("a1"),
            ready(),
            other("ingestion_complete"),
            question("q2"),
            ready(),
            other("documents_indexed"),
        ];
        let p = Partition::compute(&log);
        assert_eq!(p.setup, EventRange::new(0, 3));
        assert_eq!(p.interactions[0].range, EventRange::new(3, 7));
        assert_eq!(p.interactions[0].ready_event, Some(5));
        assert_eq!(p.interactions[1].range, EventRange::new(7, 10));
        assert_eq!(p.block_of(6), Some(Block::Turn(0)));
        assert_eq!(p.block_of(9), Some(Block::Turn(1)));
        assert_eq!(p.block_of(10), None);
        assert_total(&log, &p);
    }

    #[test]
    fn questions_before_first_marker_open_turns() {
        let log = vec![question("early"), ready(), question("late"), ready()];
        let p = Partition::compute(&log);
        assert_eq!(p.setup, EventRange::new(0, 0));
        assert_eq!(p.interactions.len(), 2);
        assert_eq!(p.interactions[0].range, EventRange::new(0, 2));
        assert_eq!(p.interactions[0].ready_event, Some(1));
        assert_eq!(p.interactions[1].user_event, 2);
        assert_total(&log, &p);
    }

    #[test]
    fn partition_is_total_for_mixed_logs() {
        let kinds = [
            "bot_waiting_for_input",
            "user_question_received",
            "answer_generated",
            "search_completed",
        ];
        // Every log of length <= 5 over a small alphabet.
        for len in 0..=5u32 {
            for code in 0..kinds.len().pow(len) {
                let mut c = code;
                let log: Vec<LogEvent> = (0..len)
                    .map(|_| {
                        let k = kinds[c % kinds.len()];
                        c /= kinds.len();
                        other(k)
                    })
                    .collect();
                let p = Partition::compute(&log);
                assert_total(&log, &p);
                let questions: Vec<usize> = log
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.event == EventKind::UserQuestionReceived)
                    .map(|(i, _)| i)
                    .collect();
                let starts: Vec<usize> = p.interactions.iter().map(|it| it.user_event).collect();
                assert_eq!(starts, questions, "every question opens a turn");
                if questions.is_empty() {
                    assert_eq!(p.setup, EventRange::new(0, log.len()));
                }
                for it in &p.interactions {
                    assert_eq!(it.range.start, it.user_event);
                    if let Some(ready) = it.ready_event {
                        assert!(it.range.contains(ready));
                        assert_eq!(log[ready].event, EventKind::BotWaitingForInput);
                    }
                }
            }
        }
    }

    #[test]
    fn slice_is_idempotent_and_pure() {
        let log = vec![ready(), question("hi"), answer("hello"), ready()];
        let before = log.clone();
        let r = EventRange::new(1, 4);
        let a = slice(&log, r).to_vec();
        let b = slice(&log, r).to_vec();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert_eq!(log, before);
    }

    #[test]
    fn range_of_and_ranges() {
        let log = vec![ready(), question("hi"), ready()];
        let p = Partition::compute(&log);
        assert_eq!(p.range_of(Block::Setup), Some(EventRange::new(0, 1)));
        assert_eq!(p.range_of(Block::Turn(0)), Some(EventRange::new(1, 3)));
        assert_eq!(p.range_of(Block::Turn(1)), None);
        assert_eq!(p.ranges().count(), 2);
    }

    #[test]
    fn range_clamp_and_fits() {
        let r = EventRange::new(3, 9);
        assert!(!r.fits(5));
        assert_eq!(r.clamp(5), EventRange::new(3, 5));
        assert_eq!(EventRange::new(7, 9).clamp(5), EventRange::new(5, 5));
        assert!(EventRange::new(0, 5).fits(5));
        assert_eq!(EventRange::new(1, 4).to_string(), "[1, 4)");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "does not address")]
    fn stale_range_asserts_in_debug() {
        let log = vec![ready()];
        let _ = slice(&log, EventRange::new(0, 4));
    }
}
