//! Chat exchange: session resolution, the greeting shortcut, and the
//! retrieval/answer pipeline, each step recorded as a structured event.

use std::path::Path;

use ragscope_core::format::clean_model_output;
use ragscope_core::EventKind;
use ragscope_store::StructuredLogger;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::UtcOffset;

use crate::ApiError;

pub const GREETING_REPLY: &str = "Hello! How can I help you?";

pub const NO_CONTEXT_REPLY: &str = "I'm sorry, I couldn't find any information regarding that in the provided documents. Feel free to ask something else!";

const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
    "thanks",
    "thank you",
    "ok",
    "okay",
];

pub fn is_greeting(question: &str) -> bool {
    let q = question.trim().to_lowercase();
    GREETINGS.contains(&q.as_str())
}

// ── Sessions ──

/// Hands out session ids and records the start of every new session.
pub struct SessionManager {
    log: StructuredLogger,
}

impl SessionManager {
    pub fn new(logs_dir: &Path, offset: UtcOffset) -> Self {
        Self {
            log: StructuredLogger::new(logs_dir, "session_manager", offset),
        }
    }

    /// Reuse `provided` unless it is blank or `force_new` is set.
    ///
    /// A new session logs `new_session` followed by `bot_waiting_for_input`,
    /// which closes its setup block.
    pub fn resolve(&self, provided: Option<&str>, force_new: bool) -> anyhow::Result<String> {
        if let Some(id) = provided.map(str::trim).filter(|s| !s.is_empty()) {
            if !force_new {
                return Ok(id.to_string());
            }
        }
        let session_id = uuid::Uuid::new_v4().to_string();
        self.log
            .event(EventKind::NewSession, Some(&session_id), json!({}))?;
        self.log
            .event(EventKind::BotWaitingForInput, Some(&session_id), json!({}))?;
        tracing::info!(%session_id, "new session");
        Ok(session_id)
    }
}

// ── Answering ──

/// A retrieved document chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub source: String,
}

/// Retrieval plus generation backend.
pub trait Answerer: Send + Sync {
    /// Chunks relevant to `question`; empty when nothing matched.
    fn retrieve(&self, question: &str) -> anyhow::Result<Vec<Chunk>>;

    /// Raw model output for `question` grounded on `context`.
    fn generate(&self, question: &str, context: &[Chunk]) -> anyhow::Result<String>;
}

/// Backend with no document index: every question misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoContextAnswerer;

impl Answerer for NoContextAnswerer {
    fn retrieve(&self, _question: &str) -> anyhow::Result<Vec<Chunk>> {
        Ok(Vec::new())
    }

    fn generate(&self, _question: &str, _context: &[Chunk]) -> anyhow::Result<String> {
        Ok(NO_CONTEXT_REPLY.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: String,
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

pub struct ChatService {
    sessions: SessionManager,
    engine: StructuredLogger,
    answerer: Box<dyn Answerer>,
}

impl ChatService {
    pub fn new(logs_dir: &Path, offset: UtcOffset, answerer: Box<dyn Answerer>) -> Self {
        Self {
            sessions: SessionManager::new(logs_dir, offset),
            engine: StructuredLogger::new(logs_dir, "rag_engine", offset),
            answerer,
        }
    }

    /// Run one question through the pipeline.
    pub fn exchange(
        &self,
        provided_session: Option<&str>,
        force_new: bool,
        question: &str,
    ) -> Result<ChatReply, ApiError> {
        if question.trim().is_empty() {
            return Err(ApiError::BadRequest("Question cannot be empty".to_string()));
        }
        let session_id = self.sessions.resolve(provided_session, force_new)?;
        let sid = Some(session_id.as_str());

        self.engine.event(
            EventKind::UserQuestionReceived,
            sid,
            json!({ "question": question }),
        )?;

        let (answer, sources) = if is_greeting(question) {
            (GREETING_REPLY.to_string(), Vec::new())
        } else {
            self.answer(sid, question)?
        };

        self.engine.event(
            EventKind::AnswerGenerated,
            sid,
            json!({ "sources": sources, "full_answer": answer }),
        )?;
        self.engine
            .event(EventKind::BotWaitingForInput, sid, json!({}))?;

        Ok(ChatReply {
            session_id,
            answer,
            sources,
        })
    }

    fn answer(&self, sid: Option<&str>, question: &str) -> anyhow::Result<(String, Vec<String>)> {
        self.engine
            .event(EventKind::RagSearchStarted, sid, json!({}))?;
        let chunks = self.answerer.retrieve(question)?;
        if chunks.is_empty() {
            self.engine.event(
                EventKind::NoContextFound,
                sid,
                json!({ "message": "Vector search returned no relevant documents." }),
            )?;
            return Ok((NO_CONTEXT_REPLY.to_string(), Vec::new()));
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        self.engine.event(
            EventKind::ContextRetrieved,
            sid,
            json!({ "chunk_count": chunks.len(), "chunks": texts }),
        )?;
        self.engine
            .event(EventKind::LlmInvocationStarted, sid, json!({}))?;
        let raw = self.answerer.generate(question, &chunks)?;

        let mut sources: Vec<String> = chunks.into_iter().map(|c| c.source).collect();
        sources.sort();
        sources.dedup();
        Ok((clean_model_output(&raw), sources))
    }
}
