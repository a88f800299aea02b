mod cmd_chat;
mod cmd_config;
mod cmd_serve;
mod cmd_sessions;
mod cmd_show;
mod source;
#[cfg(feature = "tui")]
mod tui;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use ragscope_store::ScopeConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use source::Source;

#[derive(Parser)]
#[command(
    name = "ragscope",
    version,
    about = "Inspect RAG assistant sessions: transcripts and debug logs"
)]
struct Cli {
    /// Directory of component *.jsonl logs (overrides config)
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,
    /// Read sessions from a running server instead of the logs directory
    #[arg(long, global = true)]
    remote: bool,
    /// Server base URL for --remote and chat (overrides config)
    #[arg(long, global = true)]
    server_url: Option<String>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the logs and chat HTTP API
    Serve {
        /// Address to bind
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
    /// List sessions, newest activity first
    Sessions {
        /// Case-insensitive substring of the session id
        #[arg(long)]
        filter: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a session transcript, or the debug events of one block
    Show {
        /// Session id
        session: String,
        /// Show the events of turn N (1-based)
        #[arg(long, conflicts_with = "setup")]
        turn: Option<usize>,
        /// Show the events of the setup block
        #[arg(long)]
        setup: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask the assistant a question, continuing the saved session
    Chat {
        /// Question text
        question: String,
        /// Start a new session instead of continuing the saved one
        #[arg(long)]
        new: bool,
    },
    /// Interactive viewer: sessions, transcript, and debug panes
    #[cfg(feature = "tui")]
    View,
    /// Manage ragscope configuration
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let store_root = ragscope_store::store_root();

    #[cfg(feature = "tui")]
    let to_file = matches!(cli.cmd, Command::View);
    #[cfg(not(feature = "tui"))]
    let to_file = false;
    init_tracing(&store_root, to_file)?;

    let Cli {
        logs_dir,
        remote,
        server_url,
        cmd,
    } = cli;
    // Layering: defaults < config.json < RAGSCOPE_* env < flags.
    let load_config = || -> anyhow::Result<ScopeConfig> {
        let mut config = ScopeConfig::load(&store_root)?;
        if let Some(dir) = &logs_dir {
            config.logs_dir = dir.clone();
        }
        if let Some(url) = &server_url {
            config.server_url = url.clone();
        }
        Ok(config)
    };
    let open_source = |config: &ScopeConfig| {
        if remote {
            Source::remote(&config.server_url)
        } else {
            Source::local(config.logs_dir.clone())
        }
    };

    match cmd {
        Command::Config { cmd } => cmd_config::run(cmd, &store_root),
        Command::Serve { bind, port } => {
            let mut config = load_config()?;
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if let Some(port) = port {
                config.port = port;
            }
            cmd_serve::execute(&config)
        }
        Command::Sessions { filter, json } => {
            let source = open_source(&load_config()?);
            cmd_sessions::execute(&source, filter.as_deref(), json)
        }
        Command::Show {
            session,
            turn,
            setup,
            json,
        } => {
            let source = open_source(&load_config()?);
            cmd_show::execute(
                &source,
                &cmd_show::ShowParams {
                    session_id: &session,
                    turn,
                    setup,
                    json,
                },
            )
        }
        Command::Chat { question, new } => {
            let config = load_config()?;
            cmd_chat::execute(
                &config.server_url,
                &ragscope_store::state_dir(&store_root),
                &question,
                new,
            )
        }
        #[cfg(feature = "tui")]
        Command::View => tui::run(open_source(&load_config()?)),
    }
}

/// Diagnostics go to stderr, or to `state/ragscope.log` while the TUI owns
/// the terminal. Filter with `RAGSCOPE_LOG`.
fn init_tracing(store_root: &Path, to_file: bool) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_env("RAGSCOPE_LOG").unwrap_or_else(|_| EnvFilter::new("ragscope=info"));

    if to_file {
        let dir = ragscope_store::state_dir(store_root);
        std::fs::create_dir_all(&dir)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("ragscope.log"))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}
