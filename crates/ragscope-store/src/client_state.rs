//! The chat client's remembered session id, kept across runs.

use std::path::Path;

const SESSION_FILE: &str = "session_id";

/// Load the saved session id, if any.
pub fn load_session_id(state_dir: &Path) -> anyhow::Result<Option<String>> {
    let path = state_dir.join(SESSION_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)?;
    let id = content.trim();
    Ok((!id.is_empty()).then(|| id.to_string()))
}

pub fn save_session_id(state_dir: &Path, session_id: &str) -> anyhow::Result<()> {
    crate::write_atomic(&state_dir.join(SESSION_FILE), session_id.as_bytes())
}

/// Forget the saved id so the next exchange starts a new session.
pub fn clear_session_id(state_dir: &Path) -> anyhow::Result<()> {
    let path = state_dir.join(SESSION_FILE);
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}
