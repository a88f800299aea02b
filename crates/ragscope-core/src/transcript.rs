use serde::{Deserialize, Serialize};

use crate::format::render_markdown;
use crate::partition::{EventRange, Interaction, Partition};
use crate::types::LogEvent;

/// Shown in place of an answer whose event carries no text.
pub const NO_ANSWER_PLACEHOLDER: &str = "No answer text";

/// Question text carried by a `user_question_received` event.
pub fn question_text(event: &LogEvent) -> &str {
    event.payload_str("question").unwrap_or("")
}

/// Answer text carried by an `answer_generated` event.
///
/// Prefers `full_answer`, then `answer_preview`, then the fixed placeholder,
/// so an answer bubble is never blank.
pub fn answer_text(event: &LogEvent) -> &str {
    event
        .payload_str("full_answer")
        .or_else(|| event.payload_str("answer_preview"))
        .unwrap_or(NO_ANSWER_PLACEHOLDER)
}

/// One rendered chat turn plus the range that reproduces its debug slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub index: usize,
    pub range: EventRange,
    pub question: String,
    /// `None` when no answer event was emitted for the turn.
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_html: Option<String>,
    pub complete: bool,
}

impl Turn {
    fn from_interaction(log: &[LogEvent], index: usize, it: &Interaction) -> Self {
        let question = log
            .get(it.user_event)
            .map(question_text)
            .unwrap_or_default()
            .to_string();
        let answer = it
            .answer_event
            .and_then(|i| log.get(i))
            .map(|e| answer_text(e).to_string());
        let answer_html = answer.as_deref().map(render_markdown);
        Self {
            index,
            range: it.range,
            question,
            answer,
            answer_html,
            complete: it.is_complete(),
        }
    }
}

/// Human-readable chat view of a session log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub setup: EventRange,
    pub turns: Vec<Turn>,
    pub event_count: usize,
}

impl Transcript {
    pub fn build(log: &[LogEvent], partition: &Partition) -> Self {
        let turns = partition
            .interactions
            .iter()
            .enumerate()
            .map(|(n, it)| Turn::from_interaction(log, n, it))
            .collect();
        Self {
            setup: partition.setup,
            turns,
            event_count: log.len(),
        }
    }

    /// Nothing was logged for the session.
    pub fn is_empty(&self) -> bool {
        self.event_count == 0
    }
}
