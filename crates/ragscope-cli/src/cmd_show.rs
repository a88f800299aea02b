use ragscope_core::format::display_time;
use ragscope_core::view::ActiveSessionView;
use ragscope_core::{Block, LogEvent, Transcript};

use crate::source::Source;

pub struct ShowParams<'a> {
    pub session_id: &'a str,
    /// 1-based turn number, as printed in the transcript.
    pub turn: Option<usize>,
    pub setup: bool,
    pub json: bool,
}

pub fn execute(source: &Source, params: &ShowParams<'_>) -> anyhow::Result<()> {
    let log = match source.session_log(params.session_id) {
        Ok(log) => log,
        Err(e) => anyhow::bail!("Error loading history: {e}"),
    };
    if log.is_empty() {
        println!("No logs found for this session.");
        return Ok(());
    }
    let view = ActiveSessionView::new(params.session_id, log);

    let block = match (params.setup, params.turn) {
        (true, _) => Some(Block::Setup),
        (false, Some(0)) => anyhow::bail!("turns are numbered from 1"),
        (false, Some(n)) => Some(Block::Turn(n - 1)),
        (false, None) => None,
    };

    let Some(block) = block else {
        if params.json {
            println!("{}", serde_json::to_string_pretty(view.transcript())?);
        } else {
            print!("{}", render_transcript(view.transcript()));
        }
        return Ok(());
    };

    let Some(req) = view.request(block) else {
        anyhow::bail!(
            "session has {} turns",
            view.partition().interactions.len()
        );
    };
    let events = view.resolve(&req).unwrap_or_default();
    if params.json {
        println!("{}", serde_json::to_string_pretty(events)?);
        return Ok(());
    }
    if events.is_empty() {
        println!("No log events in this interaction.");
        return Ok(());
    }
    println!("{} {}", block_label(block), req.range);
    for event in events {
        println!("{}", format_event_line(event));
    }
    Ok(())
}

fn block_label(block: Block) -> String {
    match block {
        Block::Setup => "Setup".to_string(),
        Block::Turn(i) => format!("Turn #{}", i + 1),
    }
}

pub fn render_transcript(transcript: &Transcript) -> String {
    let mut out = format!(
        "Setup {}  ({} events)\n",
        transcript.setup,
        transcript.setup.len()
    );
    for turn in &transcript.turns {
        let status = if turn.complete { "" } else { "  (in progress)" };
        out.push_str(&format!("\n#{} {}{status}\n", turn.index + 1, turn.range));
        out.push_str(&format!("  You: {}\n", turn.question));
        if let Some(answer) = &turn.answer {
            let mut lines = answer.lines();
            out.push_str(&format!("  Bot: {}\n", lines.next().unwrap_or("")));
            for line in lines {
                out.push_str(&format!("       {line}\n"));
            }
        }
    }
    out
}

/// `[HH:MM:SS] component  event  {payload}`
pub fn format_event_line(event: &LogEvent) -> String {
    let component = if event.component.is_empty() {
        "-"
    } else {
        &event.component
    };
    let payload = if event.payload.is_empty() {
        String::new()
    } else {
        serde_json::to_string(&event.payload).unwrap_or_default()
    };
    format!(
        "[{}] {:<16} {:<24} {payload}",
        display_time(&event.timestamp),
        component,
        event.event
    )
    .trim_end()
    .to_string()
}
