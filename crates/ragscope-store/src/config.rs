//! Layered settings: built-in defaults, then `<store_root>/config.json`,
//! then `RAGSCOPE_*` environment variables. CLI flags are applied last by
//! the binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::UtcOffset;

pub const CONFIG_FILE: &str = "config.json";

pub const KEYS: &[&str] = &["logs_dir", "bind", "port", "server_url", "utc_offset"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Directory holding the per-component `*.jsonl` files.
    pub logs_dir: PathBuf,
    pub bind: String,
    pub port: u16,
    /// Base URL the CLI talks to when reading remotely.
    pub server_url: String,
    /// Offset stamped on written events, `Z` or `±HH:MM`.
    pub utc_offset: String,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            logs_dir: PathBuf::from("backend/logs"),
            bind: "127.0.0.1".to_string(),
            port: 8000,
            server_url: "http://localhost:8000".to_string(),
            utc_offset: "+05:30".to_string(),
        }
    }
}

impl ScopeConfig {
    /// Defaults overlaid with `config.json` under `root` and the process
    /// environment.
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let mut cfg = Self::from_file(&root.join(CONFIG_FILE))?;
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let map = read_config_map(path)?;
        Ok(serde_json::from_value(serde_json::Value::Object(map))?)
    }

    /// Apply `RAGSCOPE_*` overrides looked up through `get`.
    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(v) = get("RAGSCOPE_LOGS_DIR") {
            self.logs_dir = PathBuf::from(v);
        }
        if let Some(v) = get("RAGSCOPE_BIND") {
            self.bind = v;
        }
        if let Some(v) = get("RAGSCOPE_PORT") {
            self.port = v
                .parse()
                .map_err(|_| anyhow::anyhow!("RAGSCOPE_PORT: invalid port {v:?}"))?;
        }
        if let Some(v) = get("RAGSCOPE_SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = get("RAGSCOPE_UTC_OFFSET") {
            self.utc_offset = v;
        }
        Ok(())
    }

    pub fn offset(&self) -> anyhow::Result<UtcOffset> {
        parse_utc_offset(&self.utc_offset)
    }
}

/// Parse `Z` or `±HH:MM`.
pub fn parse_utc_offset(s: &str) -> anyhow::Result<UtcOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(
        s,
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .map_err(|e| anyhow::anyhow!("invalid UTC offset {s:?}, expected Z or ±HH:MM: {e}"))
}

/// Read the raw config map. Missing file yields an empty map.
pub fn read_config_map(path: &Path) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
    if !path.exists() {
        return Ok(serde_json::Map::new());
    }
    let content = std::fs::read_to_string(path)?;
    let val: serde_json::Value = serde_json::from_str(&content)?;
    match val {
        serde_json::Value::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

pub fn write_config_map(
    path: &Path,
    config: &serde_json::Map<String, serde_json::Value>,
) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    crate::write_atomic(path, json.as_bytes())
}

/// Parse a CLI string into a JSON value (bool/number/string).
pub fn parse_value(s: &str) -> serde_json::Value {
    match s {
        "true" => serde_json::Value::Bool(true),
        "false" => serde_json::Value::Bool(false),
        _ => match s.parse::<i64>() {
            Ok(n) => serde_json::Value::Number(n.into()),
            Err(_) => serde_json::Value::String(s.to_string()),
        },
    }
}
