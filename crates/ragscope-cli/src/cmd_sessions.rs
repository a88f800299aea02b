use ragscope_core::format::display_datetime;
use ragscope_core::SessionSummary;

use crate::source::Source;

pub fn execute(source: &Source, filter: Option<&str>, json: bool) -> anyhow::Result<()> {
    let sessions = match source.sessions() {
        Ok(s) => s,
        Err(e) => anyhow::bail!("Error loading sessions: {e}"),
    };
    let matched = ragscope_store::filter_sessions(&sessions, filter.unwrap_or(""));

    if json {
        println!("{}", serde_json::to_string_pretty(&matched)?);
        return Ok(());
    }
    if matched.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }
    for s in &matched {
        println!("{}", format_row(s));
    }
    println!("\n({} sessions)", matched.len());
    Ok(())
}

fn format_row(s: &SessionSummary) -> String {
    format!(
        "{:<38} {}  {}  {:>5} events",
        s.session_id,
        display_datetime(&s.start_time),
        display_datetime(&s.last_activity),
        s.event_count
    )
}
