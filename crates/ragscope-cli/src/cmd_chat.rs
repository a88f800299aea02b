use std::path::Path;
use std::time::Duration;

use ragscope_serve::ChatReply;

const TIMEOUT: Duration = Duration::from_secs(120);

/// Ask one question through `POST /chat/`, continuing the saved session
/// unless `new_session` is set.
pub fn execute(
    server_url: &str,
    state_dir: &Path,
    question: &str,
    new_session: bool,
) -> anyhow::Result<()> {
    let saved = session_to_resume(state_dir, new_session)?;
    let reply = send(server_url, saved.as_deref(), new_session, question)?;
    ragscope_store::client_state::save_session_id(state_dir, &reply.session_id)?;

    println!("{}", reply.answer);
    if !reply.sources.is_empty() {
        println!("\nSources: {}", reply.sources.join(", "));
    }
    eprintln!("(session {})", reply.session_id);
    Ok(())
}

/// The saved session id to continue. `--new` forgets it up front, so a
/// failed request never falls back to the old session.
fn session_to_resume(state_dir: &Path, new_session: bool) -> anyhow::Result<Option<String>> {
    if new_session {
        ragscope_store::client_state::clear_session_id(state_dir)?;
        return Ok(None);
    }
    ragscope_store::client_state::load_session_id(state_dir)
}

fn send(
    server_url: &str,
    session_id: Option<&str>,
    new_session: bool,
    question: &str,
) -> anyhow::Result<ChatReply> {
    let agent = ureq::Agent::config_builder()
        .timeout_global(Some(TIMEOUT))
        .http_status_as_error(false)
        .build()
        .new_agent();
    let url = format!("{}/chat/", server_url.trim_end_matches('/'));
    let mut req = agent
        .post(&url)
        .header("Content-Type", "application/json")
        .header("X-New-Session", if new_session { "true" } else { "false" });
    if let Some(sid) = session_id {
        req = req.header("X-Session-Id", sid);
    }
    let mut resp = req.send(serde_json::json!({ "question": question }).to_string())?;
    let status = resp.status();
    let body = resp.body_mut().read_to_string()?;
    if !status.is_success() {
        anyhow::bail!("{}", error_message(status.as_u16(), &body));
    }
    Ok(serde_json::from_str(&body)?)
}

/// Prefer the server's `{ "error": ... }` message over the raw body.
fn error_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    format!("chat request failed ({status}): {detail}")
}
