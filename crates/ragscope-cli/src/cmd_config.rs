use std::path::Path;

use clap::Subcommand;
use ragscope_store::config::{parse_value, read_config_map, write_config_map, CONFIG_FILE, KEYS};
use ragscope_store::ScopeConfig;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key (logs_dir, bind, port, server_url, utc_offset)
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List the effective configuration
    List,
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, store_root: &Path) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Set { key, value } => set(store_root, &key, &value),
        ConfigCmd::Get { key } => get(store_root, &key),
        ConfigCmd::List => list(store_root),
    }
}

// ── Command Implementations ──

fn check_key(key: &str) -> anyhow::Result<()> {
    if !KEYS.contains(&key) {
        anyhow::bail!("unknown config key {key:?} (known: {})", KEYS.join(", "));
    }
    Ok(())
}

/// `ragscope config set <key> <value>`
pub fn set(store_root: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    check_key(key)?;
    let path = store_root.join(CONFIG_FILE);
    let mut config = read_config_map(&path)?;
    config.insert(key.to_string(), parse_value(value));

    // Reject values that would make the file unloadable.
    let parsed: ScopeConfig =
        serde_json::from_value(serde_json::Value::Object(config.clone()))?;
    parsed.offset()?;

    write_config_map(&path, &config)?;
    println!("{key} = {value}");
    Ok(())
}

/// `ragscope config get <key>`
pub fn get(store_root: &Path, key: &str) -> anyhow::Result<()> {
    check_key(key)?;
    let config = read_config_map(&store_root.join(CONFIG_FILE))?;
    match config.get(key) {
        Some(val) => println!("{val}"),
        None => println!("(not set)"),
    }
    Ok(())
}

/// `ragscope config list`
pub fn list(store_root: &Path) -> anyhow::Result<()> {
    let effective = ScopeConfig::load(store_root)?;
    let value = serde_json::to_value(&effective)?;
    if let serde_json::Value::Object(map) = value {
        for (k, v) in &map {
            println!("{k} = {v}");
        }
    }
    Ok(())
}
