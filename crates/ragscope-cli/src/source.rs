//! Where session logs are read from: the local logs directory, or a running
//! `ragscope serve` instance.

use std::path::PathBuf;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use ragscope_core::{LogEvent, SessionSummary};
use ragscope_serve::SessionLogResponse;

const TIMEOUT: Duration = Duration::from_secs(10);

// RFC 3986 unreserved characters pass through; everything else is escaped.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Clone)]
pub enum Source {
    Local { logs_dir: PathBuf },
    Remote { base: String, agent: ureq::Agent },
}

impl Source {
    pub fn local(logs_dir: PathBuf) -> Self {
        Source::Local { logs_dir }
    }

    pub fn remote(server_url: &str) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(TIMEOUT))
            .build()
            .new_agent();
        Source::Remote {
            base: server_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    /// Human-readable origin, for titles and log lines.
    pub fn describe(&self) -> String {
        match self {
            Source::Local { logs_dir } => logs_dir.display().to_string(),
            Source::Remote { base, .. } => base.clone(),
        }
    }

    pub fn sessions(&self) -> anyhow::Result<Vec<SessionSummary>> {
        match self {
            Source::Local { logs_dir } => {
                let events = ragscope_store::read_all_events(logs_dir)?;
                Ok(ragscope_store::list_sessions(&events))
            }
            Source::Remote { base, agent } => {
                let url = format!("{base}/logs/sessions");
                let body = agent.get(&url).call()?.body_mut().read_to_string()?;
                Ok(serde_json::from_str(&body)?)
            }
        }
    }

    /// The ordered log of one session; empty when the session is unknown.
    pub fn session_log(&self, session_id: &str) -> anyhow::Result<Vec<LogEvent>> {
        match self {
            Source::Local { logs_dir } => {
                let events = ragscope_store::read_all_events(logs_dir)?;
                Ok(ragscope_store::session_events(&events, session_id))
            }
            Source::Remote { base, agent } => {
                let url = session_url(base, session_id);
                let body = agent.get(&url).call()?.body_mut().read_to_string()?;
                let resp: SessionLogResponse = serde_json::from_str(&body)?;
                Ok(resp.logs)
            }
        }
    }
}

fn session_url(base: &str, session_id: &str) -> String {
    format!(
        "{base}/logs/sessions/{}",
        utf8_percent_encode(session_id, PATH_SEGMENT)
    )
}
