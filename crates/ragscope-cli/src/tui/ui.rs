use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

use ragscope_core::format::{display_datetime, display_time};
use ragscope_core::{Block as LogBlock, LogEvent};

use super::app::{App, Panel};

/// Render the full TUI frame.
pub fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // main area
            Constraint::Length(1), // status bar
        ])
        .split(f.area());

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25), // sessions
            Constraint::Percentage(40), // transcript
            Constraint::Percentage(35), // debug
        ])
        .split(chunks[0]);

    render_sessions(f, app, main_chunks[0]);
    render_transcript(f, app, main_chunks[1]);
    render_debug(f, app, main_chunks[2]);
    render_status_bar(f, app, chunks[1]);
}

fn panel_style(app: &App, panel: Panel) -> Style {
    if app.active_panel == panel {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn selected_style(app: &App, panel: Panel, selected: bool) -> Style {
    if selected && app.active_panel == panel {
        Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else if selected {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn placeholder(f: &mut Frame, area: Rect, block: Block, text: &str) {
    let msg = Paragraph::new(text.to_string())
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray))
        .block(block);
    f.render_widget(msg, area);
}

fn render_sessions(f: &mut Frame, app: &App, area: Rect) {
    let visible = app.visible_sessions();
    let title = if app.filter.is_empty() {
        format!(" Sessions ({}) ", visible.len())
    } else {
        format!(" Sessions ({}/{}) ", visible.len(), app.sessions.len())
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(panel_style(app, Panel::Sessions));

    if let Some(err) = &app.sessions_error {
        placeholder(f, area, block, err);
        return;
    }
    if visible.is_empty() {
        let text = if app.loading_sessions {
            "Loading sessions..."
        } else {
            "No sessions found."
        };
        placeholder(f, area, block, text);
        return;
    }

    // Two lines per session; keep the selection on screen.
    let per_page = (area.height.saturating_sub(2) as usize / 2).max(1);
    let active_id = app.viewer.active().map(|v| v.session_id());
    let items: Vec<ListItem> = visible
        .iter()
        .enumerate()
        .skip(app.session_scroll.saturating_sub(per_page - 1))
        .map(|(i, s)| {
            let marker = if Some(s.session_id.as_str()) == active_id {
                "●"
            } else {
                " "
            };
            let style = selected_style(app, Panel::Sessions, i == app.session_scroll);
            ListItem::new(vec![
                Line::from(Span::styled(
                    format!("{marker} {}", truncate_str(&s.session_id, 36)),
                    style,
                )),
                Line::from(Span::styled(
                    format!(
                        "  {}  {} events",
                        display_datetime(&s.last_activity),
                        s.event_count
                    ),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

fn render_transcript(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Transcript ")
        .borders(Borders::ALL)
        .border_style(panel_style(app, Panel::Transcript));

    let Some(view) = app.viewer.active() else {
        let text = match (&app.loading_session, &app.detail_error) {
            (Some(id), _) => format!("Loading {}...", truncate_str(id, 24)),
            (None, Some(err)) => err.clone(),
            (None, None) => "Select a session and press Enter.".to_string(),
        };
        placeholder(f, area, block, &text);
        return;
    };
    let transcript = view.transcript();
    if transcript.is_empty() {
        placeholder(f, area, block, "No logs found for this session.");
        return;
    }

    let width = area.width.saturating_sub(4) as usize;
    let mut items: Vec<ListItem> = Vec::with_capacity(transcript.turns.len() + 1);
    items.push(ListItem::new(Line::from(Span::styled(
        format!(
            "Setup {}  {} events",
            transcript.setup,
            transcript.setup.len()
        ),
        selected_style(app, Panel::Transcript, app.transcript_scroll == 0)
            .fg(Color::DarkGray),
    ))));

    for turn in &transcript.turns {
        let row = turn.index + 1;
        let head_style = selected_style(app, Panel::Transcript, app.transcript_scroll == row);
        let status = if turn.complete { "" } else { " …" };
        let mut lines = vec![Line::from(vec![
            Span::styled(format!("#{} ", row), head_style.fg(Color::Yellow)),
            Span::styled(
                format!("{}{status}", turn.range),
                head_style.fg(Color::DarkGray),
            ),
        ])];
        lines.push(Line::from(vec![
            Span::styled("You  ", Style::default().fg(Color::Cyan)),
            Span::raw(truncate_str(&turn.question, width.saturating_sub(5))),
        ]));
        if let Some(answer) = &turn.answer {
            for (n, text) in answer.lines().filter(|l| !l.trim().is_empty()).enumerate() {
                let label = if n == 0 { "Bot  " } else { "     " };
                lines.push(Line::from(vec![
                    Span::styled(label, Style::default().fg(Color::Green)),
                    Span::raw(truncate_str(text, width.saturating_sub(5))),
                ]));
            }
        }
        items.push(ListItem::new(lines));
    }

    let shown: Vec<ListItem> = items
        .into_iter()
        .skip(app.transcript_scroll.saturating_sub(1))
        .collect();
    f.render_widget(List::new(shown).block(block), area);
}

fn render_debug(f: &mut Frame, app: &App, area: Rect) {
    let scope = match (&app.debug_focus, app.viewer.active()) {
        (Some((block, req)), Some(view)) if req.session_id == view.session_id() => {
            let label = match block {
                LogBlock::Setup => "setup".to_string(),
                LogBlock::Turn(i) => format!("turn #{}", i + 1),
            };
            format!(" Debug: {label} {} ", req.range)
        }
        _ => " Debug: all events ".to_string(),
    };
    let block = Block::default()
        .title(scope)
        .borders(Borders::ALL)
        .border_style(panel_style(app, Panel::Debug));

    let events = match app.debug_events() {
        Ok(events) => events,
        Err(msg) => {
            placeholder(f, area, block, &msg);
            return;
        }
    };

    let width = area.width.saturating_sub(2) as usize;
    let items: Vec<ListItem> = events
        .iter()
        .enumerate()
        .skip(app.debug_scroll)
        .map(|(i, e)| {
            let style = selected_style(app, Panel::Debug, i == app.debug_scroll);
            ListItem::new(Line::from(Span::styled(
                truncate_str(&event_summary(e), width),
                style,
            )))
        })
        .collect();
    f.render_widget(List::new(items).block(block), area);
}

/// One-line debug view of an event: time, tag, and the most telling field.
pub fn event_summary(e: &LogEvent) -> String {
    let detail = ["question", "full_answer", "answer_preview", "message", "chunk_count"]
        .iter()
        .find_map(|k| e.payload.get(*k))
        .map(|v| match v.as_str() {
            Some(s) => s.replace('\n', " "),
            None => v.to_string(),
        })
        .unwrap_or_default();
    let line = format!("{} {} {}", display_time(&e.timestamp), e.event, detail);
    line.trim_end().to_string()
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let panel_name = match app.active_panel {
        Panel::Sessions => "Sessions",
        Panel::Transcript => "Transcript",
        Panel::Debug => "Debug",
    };
    let (text, style) = if app.editing_filter {
        (
            format!(" filter: {}_   Enter:done  Esc:done", app.filter),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )
    } else {
        let filter = if app.filter.is_empty() {
            String::new()
        } else {
            format!(" [filter:{}]", app.filter)
        };
        (
            format!(
                " ragscope {} | {panel_name}{filter} | Tab:switch  j/k:move  Enter:open  a:all  /:filter  r:reload  q:quit",
                app.source_label
            ),
            Style::default().fg(Color::White).bg(Color::DarkGray),
        )
    };
    let bar = Paragraph::new(Line::from(Span::styled(text, style)));
    f.render_widget(bar, area);
}

// ── Public helpers ──

pub fn truncate_str(s: &str, max_chars: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}
