//! Main event loop: input, fetch results and AI events

use anyhow::Result;
use crossterm::event;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;

use crate::input::{InputResult, handle_input};

use super::App;
use super::render_thread::RenderThread;

impl App {
    pub(crate) async fn event_loop(&mut self, render_thread: &RenderThread) -> Result<()> {
        loop {
            if self.process_fetch_results() {
                self.dirty = true;
            }

            // Process AI events from the actor (non-blocking)
            if self.process_ai_events() {
                self.dirty = true;
            }

            if self.state.clear_error_if_expired() {
                self.dirty = true;
            }

            // Keep the spinner moving
            if self.state.is_busy() {
                self.dirty = true;
            }

            // Render only when dirty (non-blocking - sends to render thread)
            if self.dirty {
                render_thread.render(self.state.clone());
                self.dirty = false;
            }

            // Poll faster while something is in flight
            let poll_timeout = if self.state.is_busy() { 50 } else { 150 };
            if event::poll(Duration::from_millis(poll_timeout))? {
                let evt = event::read()?;
                // Any input event (including resize) requires re-render
                self.dirty = true;
                match handle_input(evt, &self.bindings) {
                    InputResult::Quit => break,
                    InputResult::Action(action) => self.handle_action(action).await,
                    InputResult::Continue => {}
                }
            }
        }

        Ok(())
    }

    /// Apply a finished fetch, if any. Returns true if state changed.
    pub(crate) fn process_fetch_results(&mut self) -> bool {
        match self.fetch_rx.try_recv() {
            Ok(outcome) => {
                self.state.apply_fetch(outcome);
                true
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
        }
    }

    /// Drain AI events. Stale results are dropped by the selection.
    pub(crate) fn process_ai_events(&mut self) -> bool {
        let Some(ref mut actor) = self.ai_actor else {
            return false;
        };

        let mut changed = false;
        while let Ok(event) = actor.event_rx.try_recv() {
            changed |= self.state.apply_ai_event(event);
        }
        changed
    }
}
