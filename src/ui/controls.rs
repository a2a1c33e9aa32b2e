//! Foreground loop for background operations
//!
//! Renders [`WorkerEvent`]s as they arrive (log lines above a progress bar)
//! and, on an interactive terminal, reads single key presses:
//!
//! - `p` toggles pause/resume
//! - `q` or `Esc` aborts
//! - `Ctrl+C` aborts (raw mode swallows the signal, so it arrives as a key)

use crate::core::events::WorkerEvent;
use crate::ui::progress::{clear_line, show_progress_bar};
use colored::Colorize;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKey {
    TogglePause,
    Abort,
}

/// Map a key press to a control action
pub fn control_for(code: KeyCode, modifiers: KeyModifiers) -> Option<ControlKey> {
    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(ControlKey::Abort),
        KeyCode::Char('p') | KeyCode::Char('P') => Some(ControlKey::TogglePause),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(ControlKey::Abort),
        _ => None,
    }
}

/// Lines that only restate a percentage are shown by the bar instead
fn is_bare_percentage(line: &str) -> bool {
    line.trim()
        .strip_suffix('%')
        .map(|n| n.trim().parse::<f64>().is_ok())
        .unwrap_or(false)
}

/// Disables raw mode when dropped
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Option<Self> {
        match terminal::enable_raw_mode() {
            Ok(()) => Some(RawModeGuard),
            Err(err) => {
                log::warn!("interactive controls unavailable: {}", err);
                None
            }
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Drives the display of one running operation
pub struct EventMonitor<'a> {
    prefix: &'a str,
    interactive: bool,
    abort_requested: Option<&'a AtomicBool>,
    percent: u8,
    speed: Option<String>,
}

impl<'a> EventMonitor<'a> {
    pub fn new(prefix: &'a str) -> Self {
        Self {
            prefix,
            interactive: io::stdin().is_terminal() && io::stdout().is_terminal(),
            abort_requested: None,
            percent: 0,
            speed: None,
        }
    }

    /// Flag raised outside the loop (Ctrl+C handler) that should abort
    pub fn with_abort_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.abort_requested = Some(flag);
        self
    }

    /// Disable key handling even on a terminal
    pub fn non_interactive(mut self) -> Self {
        self.interactive = false;
        self
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Run until the worker reports `Finished` or its channel closes.
    ///
    /// Returns the reported success, or `None` if the worker vanished.
    pub fn run<F>(&mut self, events: &Receiver<WorkerEvent>, mut on_key: F) -> Option<bool>
    where
        F: FnMut(ControlKey),
    {
        let raw_guard = if self.interactive {
            RawModeGuard::enable()
        } else {
            None
        };
        let keys_enabled = raw_guard.is_some();
        let mut abort_forwarded = false;

        loop {
            if !abort_forwarded {
                if let Some(flag) = self.abort_requested {
                    if flag.load(Ordering::Relaxed) {
                        abort_forwarded = true;
                        on_key(ControlKey::Abort);
                    }
                }
            }

            if keys_enabled {
                while let Some(key) = poll_key() {
                    if key == ControlKey::Abort {
                        abort_forwarded = true;
                    }
                    on_key(key);
                }
            }

            match events.recv_timeout(POLL_INTERVAL) {
                Ok(WorkerEvent::Finished { success }) => {
                    self.render_bar();
                    print!("\r\n");
                    io::stdout().flush().ok();
                    return Some(success);
                }
                Ok(event) => self.render(event),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    print!("\r\n");
                    return None;
                }
            }
        }
    }

    fn render(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Progress(p) => self.percent = p,
            WorkerEvent::Speed(s) => self.speed = Some(s),
            WorkerEvent::Log(line) => {
                if is_bare_percentage(&line) {
                    return;
                }
                clear_line();
                let styled = if line.starts_with("---") {
                    line.yellow().bold().to_string()
                } else if line.contains("ERROR") {
                    line.red().to_string()
                } else {
                    line
                };
                // Raw mode needs an explicit carriage return.
                print!("{}\r\n", styled);
            }
            WorkerEvent::Finished { .. } => {}
        }
        self.render_bar();
    }

    fn render_bar(&self) {
        show_progress_bar(self.percent, self.prefix, self.speed.as_deref());
    }
}

fn poll_key() -> Option<ControlKey> {
    match event::poll(Duration::from_millis(0)) {
        Ok(true) => match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                control_for(key.code, key.modifiers)
            }
            _ => None,
        },
        _ => None,
    }
}

/// Short help line shown before an interactive run
pub fn controls_hint(can_pause: bool) -> String {
    if can_pause {
        "Press 'p' to pause/resume, 'q' or Esc to abort".to_string()
    } else {
        "Press 'q' or Esc to abort".to_string()
    }
}
