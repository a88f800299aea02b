use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Event tags emitted by the assistant backend.
///
/// Unknown tags are kept verbatim in [`EventKind::Other`] so a log line is
/// never rejected just because a newer backend added a new kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    NewSession,
    UserQuestionReceived,
    RagSearchStarted,
    SearchInitiated,
    SearchCompleted,
    NoContextFound,
    ContextRetrieved,
    LlmInvocationStarted,
    AnswerGenerated,
    BotWaitingForInput,
    VectordbInitialized,
    DocumentsIndexed,
    IngestionComplete,
    DocumentLoadError,
    Other(String),
}

impl EventKind {
    /// Map a wire tag to its kind.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "new_session" => Self::NewSession,
            "user_question_received" => Self::UserQuestionReceived,
            "rag_search_started" => Self::RagSearchStarted,
            "search_initiated" => Self::SearchInitiated,
            "search_completed" => Self::SearchCompleted,
            "no_context_found" => Self::NoContextFound,
            "context_retrieved" => Self::ContextRetrieved,
            "llm_invocation_started" => Self::LlmInvocationStarted,
            "answer_generated" => Self::AnswerGenerated,
            "bot_waiting_for_input" => Self::BotWaitingForInput,
            "vectordb_initialized" => Self::VectordbInitialized,
            "documents_indexed" => Self::DocumentsIndexed,
            "ingestion_complete" => Self::IngestionComplete,
            "document_load_error" => Self::DocumentLoadError,
            other => Self::Other(other.to_string()),
        }
    }

    /// The wire tag for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::NewSession => "new_session",
            Self::UserQuestionReceived => "user_question_received",
            Self::RagSearchStarted => "rag_search_started",
            Self::SearchInitiated => "search_initiated",
            Self::SearchCompleted => "search_completed",
            Self::NoContextFound => "no_context_found",
            Self::ContextRetrieved => "context_retrieved",
            Self::LlmInvocationStarted => "llm_invocation_started",
            Self::AnswerGenerated => "answer_generated",
            Self::BotWaitingForInput => "bot_waiting_for_input",
            Self::VectordbInitialized => "vectordb_initialized",
            Self::DocumentsIndexed => "documents_indexed",
            Self::IngestionComplete => "ingestion_complete",
            Self::DocumentLoadError => "document_load_error",
            Self::Other(tag) => tag,
        }
    }

    /// The readiness marker: the assistant is waiting for the next question.
    pub fn is_readiness(&self) -> bool {
        matches!(self, Self::BotWaitingForInput)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_tag(&tag))
    }
}

/// One structured record from a session log (one JSONL line).
///
/// `timestamp`, `component`, `event` and `session_id` are lifted out; every
/// other field lands in `payload` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub component: String,
    pub event: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl LogEvent {
    /// Bare event of the given kind with empty metadata.
    pub fn new(event: EventKind) -> Self {
        Self {
            timestamp: String::new(),
            component: String::new(),
            event,
            session_id: None,
            payload: serde_json::Map::new(),
        }
    }

    pub fn with_session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    pub fn with_field(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    /// A payload field as a non-empty string.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// Summary row for one session, as listed by the sessions view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub start_time: String,
    pub last_activity: String,
    pub event_count: usize,
}
