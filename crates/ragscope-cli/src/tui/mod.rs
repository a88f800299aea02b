pub mod app;
pub mod ui;

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};

use crate::source::Source;
use app::{App, LoadRequest, Loaded};

/// Run the interactive viewer until the user quits.
pub fn run(source: Source) -> anyhow::Result<()> {
    let (requests, results) = spawn_worker(source.clone());
    let mut app = App::new(source.describe());
    app.request_sessions();

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut app, &requests, &results);
    ratatui::restore();
    result
}

fn event_loop(
    terminal: &mut ratatui::DefaultTerminal,
    app: &mut App,
    requests: &Sender<LoadRequest>,
    results: &Receiver<Loaded>,
) -> anyhow::Result<()> {
    loop {
        for req in app.take_requests() {
            requests
                .send(req)
                .map_err(|_| anyhow::anyhow!("retrieval worker stopped"))?;
        }
        while let Ok(loaded) = results.try_recv() {
            app.apply(loaded);
        }

        terminal.draw(|f| ui::render(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key);
                }
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Retrieval runs off the UI thread; results come back tagged with the
/// ticket they were requested under.
fn spawn_worker(source: Source) -> (Sender<LoadRequest>, Receiver<Loaded>) {
    let (req_tx, req_rx) = mpsc::channel::<LoadRequest>();
    let (res_tx, res_rx) = mpsc::channel::<Loaded>();
    thread::spawn(move || {
        for req in req_rx {
            let loaded = load(&source, req);
            if res_tx.send(loaded).is_err() {
                break;
            }
        }
    });
    (req_tx, res_rx)
}

fn load(source: &Source, req: LoadRequest) -> Loaded {
    match req {
        LoadRequest::Sessions(ticket) => {
            let result = source.sessions().map_err(|e| format!("{e:#}"));
            Loaded::Sessions(ticket, result)
        }
        LoadRequest::Session(ticket) => {
            let id = ticket.session_id().unwrap_or_default().to_string();
            let result = source.session_log(&id).map_err(|e| format!("{e:#}"));
            tracing::debug!(session_id = %id, ok = result.is_ok(), "session load finished");
            Loaded::Session(ticket, result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_answers_requests_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("rag_engine.jsonl"),
            concat!(
                r#"{"timestamp":"t1","event":"new_session","session_id":"s1"}"#,
                "\n"
            ),
        )
        .unwrap();
        let (tx, rx) = spawn_worker(Source::local(tmp.path().to_path_buf()));
        let mut app = App::new("test".into());
        app.request_sessions();
        for req in app.take_requests() {
            tx.send(req).unwrap();
        }
        let loaded = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        app.apply(loaded);
        assert_eq!(app.sessions.len(), 1);
        assert_eq!(app.sessions[0].session_id, "s1");
    }
}
