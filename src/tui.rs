use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossterm::ExecutableCommand;
use crossterm::cursor::{Hide, Show};
use miette::IntoDiagnostic;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratatui::{Terminal, TerminalOptions, Viewport};

use crate::app::{ProgressEvent, ProgressSink, ProgressSinkKind};
use crate::error::M4dbError;

const VIEWPORT_HEIGHT: u16 = 4;
const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Resolve,
    Store,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Resolve => "Resolve",
            Phase::Store => "Store",
        }
    }
}

#[derive(Debug)]
struct ProgressState {
    phase: Phase,
    status: String,
    completed: usize,
    total: usize,
    started: Instant,
}

impl ProgressState {
    fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total as f64).clamp(0.0, 1.0)
        }
    }
}

struct TuiProgress {
    state: Arc<Mutex<ProgressState>>,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        if let Ok(mut state) = self.state.lock() {
            let message = event.message.trim();
            match parse_phase(message) {
                Some((phase, payload)) => {
                    state.phase = phase;
                    state.status = payload.to_string();
                }
                None => state.status = message.to_string(),
            }
            if let Some((completed, total)) = event.position {
                state.completed = completed;
                state.total = total;
            }
        }
    }
}

/// Inline progress gauge drawn below the cursor while a pipeline runs on a
/// worker thread.
pub struct Tui {
    kind: ProgressSinkKind,
    state: Arc<Mutex<ProgressState>>,
}

impl Tui {
    pub fn new(kind: ProgressSinkKind) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(ProgressState {
                phase: Phase::Resolve,
                status: "querying catalog".to_string(),
                completed: 0,
                total: 0,
                started: Instant::now(),
            })),
        }
    }

    pub fn run<F, R>(&mut self, f: F) -> miette::Result<R>
    where
        F: FnOnce(&dyn ProgressSink) -> Result<R, M4dbError> + Send + 'static,
        R: Send + 'static,
    {
        let cursor = HiddenCursor::hide()?;
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::with_options(
            backend,
            TerminalOptions {
                viewport: Viewport::Inline(VIEWPORT_HEIGHT),
            },
        )
        .into_diagnostic()?;

        let (handle, rx) = self.spawn_worker(f);
        let outcome = self.drive(&mut terminal, &rx);
        handle.join().ok();
        drop(cursor);

        let result = outcome?;
        println!();
        result.map_err(miette::Report::new)
    }

    fn spawn_worker<F, R>(&self, f: F) -> (JoinHandle<()>, Receiver<Result<R, M4dbError>>)
    where
        F: FnOnce(&dyn ProgressSink) -> Result<R, M4dbError> + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let sink = TuiProgress {
            state: self.state.clone(),
        };
        let handle = thread::spawn(move || {
            tx.send(f(&sink)).ok();
        });
        (handle, rx)
    }

    /// Redraws until the worker reports, then draws the final state once more.
    fn drive<B, R>(
        &self,
        terminal: &mut Terminal<B>,
        rx: &Receiver<Result<R, M4dbError>>,
    ) -> miette::Result<Result<R, M4dbError>>
    where
        B: Backend,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        loop {
            self.draw(terminal)?;
            match rx.recv_timeout(TICK) {
                Ok(result) => {
                    self.draw(terminal)?;
                    return Ok(result);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(miette::Report::msg("progress worker exited unexpectedly"));
                }
            }
        }
    }

    fn draw<B>(&self, terminal: &mut Terminal<B>) -> miette::Result<()>
    where
        B: Backend,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        if let Ok(state) = self.state.lock() {
            terminal
                .draw(|frame| draw_progress(frame, self.kind, &state))
                .into_diagnostic()?;
        }
        Ok(())
    }
}

/// Hides the terminal cursor until dropped.
struct HiddenCursor;

impl HiddenCursor {
    fn hide() -> miette::Result<Self> {
        io::stdout().execute(Hide).into_diagnostic()?;
        Ok(Self)
    }
}

impl Drop for HiddenCursor {
    fn drop(&mut self) {
        io::stdout().execute(Show).ok();
    }
}

fn draw_progress(frame: &mut ratatui::Frame, kind: ProgressSinkKind, state: &ProgressState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(1)])
        .split(frame.area());

    let title = match kind {
        ProgressSinkKind::Retrieve => " retrieve-models ",
        ProgressSinkKind::Export => " model-stats ",
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .gauge_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .ratio(state.ratio())
        .label(format!("{}/{}", state.completed, state.total));
    frame.render_widget(gauge, chunks[0]);

    let elapsed = state.started.elapsed().as_secs();
    let status = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("{:<8}", state.phase.label()),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(format!("{} ", state.status)),
        Span::styled(
            format!("[{:02}:{:02}]", elapsed / 60, elapsed % 60),
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    frame.render_widget(status, chunks[1]);
}

fn parse_phase(message: &str) -> Option<(Phase, &str)> {
    if let Some(rest) = message.strip_prefix("phase=Resolve;") {
        return Some((Phase::Resolve, rest.trim()));
    }
    if let Some(rest) = message.strip_prefix("phase=Store;") {
        return Some((Phase::Store, rest.trim()));
    }
    None
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use ratatui::backend::TestBackend;

    use super::*;

    #[test]
    fn parses_phase_prefix() {
        assert_eq!(
            parse_phase("phase=Store; 0f86b938"),
            Some((Phase::Store, "0f86b938"))
        );
        assert_eq!(parse_phase("plain message"), None);
    }

    #[test]
    fn drive_returns_the_worker_result() {
        let tui = Tui::new(ProgressSinkKind::Export);
        let mut terminal = Terminal::new(TestBackend::new(40, VIEWPORT_HEIGHT)).unwrap();

        let (handle, rx) = tui.spawn_worker(|sink| {
            sink.event(ProgressEvent {
                message: "phase=Store; writing stats.csv".to_string(),
                position: Some((3, 3)),
            });
            Ok(3usize)
        });
        let outcome = tui.drive(&mut terminal, &rx).unwrap();
        handle.join().unwrap();

        assert_matches!(outcome, Ok(3));
        assert_eq!(tui.state.lock().unwrap().completed, 3);
    }

    #[test]
    fn drive_reports_a_worker_that_died() {
        let tui = Tui::new(ProgressSinkKind::Retrieve);
        let mut terminal = Terminal::new(TestBackend::new(40, VIEWPORT_HEIGHT)).unwrap();

        let (handle, rx) = tui.spawn_worker(|_sink| -> Result<(), M4dbError> {
            panic!("worker failed");
        });
        let outcome = tui.drive(&mut terminal, &rx);

        assert!(outcome.is_err());
        assert!(handle.join().is_err());
    }

    #[test]
    fn sink_tracks_position() {
        let tui = Tui::new(ProgressSinkKind::Retrieve);
        let sink = TuiProgress {
            state: tui.state.clone(),
        };
        sink.event(ProgressEvent {
            message: "phase=Store; abc".to_string(),
            position: Some((2, 4)),
        });
        let state = tui.state.lock().unwrap();
        assert_eq!(state.phase, Phase::Store);
        assert_eq!(state.status, "abc");
        assert!((state.ratio() - 0.5).abs() < f64::EPSILON);
    }
}
