//! Dedicated drawing thread.
//!
//! Owns the terminal for the lifetime of the TUI and draws the latest
//! [`AppState`] snapshot it is handed, so slow terminals never stall the
//! event loop that is waiting on fetches and AI responses.

use std::io::{self, Stdout};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};

use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use super::state::AppState;

enum RenderCommand {
    Render(Box<AppState>),
    Shutdown,
}

/// Raw mode and alternate screen, undone on drop
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            disable_raw_mode().ok();
            return Err(e);
        }
        match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => Ok(Self { terminal }),
            Err(e) => {
                execute!(io::stdout(), LeaveAlternateScreen).ok();
                disable_raw_mode().ok();
                Err(e)
            }
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        disable_raw_mode().ok();
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen).ok();
        self.terminal.show_cursor().ok();
    }
}

pub struct RenderThread {
    cmd_tx: SyncSender<RenderCommand>,
    handle: Option<JoinHandle<()>>,
}

impl RenderThread {
    /// Enter the alternate screen and start drawing.
    ///
    /// Terminal setup happens before this returns, so a terminal that cannot
    /// be put into raw mode is reported here rather than logged later.
    pub fn spawn() -> io::Result<Self> {
        let guard = TerminalGuard::enter()?;

        // Capacity 1: only the newest snapshot matters
        let (cmd_tx, cmd_rx) = mpsc::sync_channel::<RenderCommand>(1);
        let handle = thread::Builder::new()
            .name("mailmate-render".to_string())
            .spawn(move || render_loop(guard, cmd_rx))?;

        Ok(Self {
            cmd_tx,
            handle: Some(handle),
        })
    }

    /// Queue a snapshot without blocking. Dropped if a frame is still pending.
    pub fn render(&self, state: AppState) {
        match self.cmd_tx.try_send(RenderCommand::Render(Box::new(state))) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::trace!("Render thread busy, skipping frame");
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::error!("Render thread disconnected");
            }
        }
    }

    /// Stop drawing and give the terminal back.
    pub fn shutdown(mut self) {
        let _ = self.cmd_tx.send(RenderCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

fn render_loop(mut guard: TerminalGuard, cmd_rx: Receiver<RenderCommand>) {
    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            RenderCommand::Render(state) => {
                if let Err(e) = guard.terminal.draw(|f| crate::ui::render(f, &state)) {
                    tracing::error!("Render error: {}", e);
                }
            }
            RenderCommand::Shutdown => break,
        }
    }
}
