//! Action handlers for user input

use std::sync::Arc;

use crate::ai::{ActionKind, AiCommand};
use crate::error::{AssistantError, DispatchError, TransportError};
use crate::input::Action;
use crate::session::SessionGate;

use super::App;

impl App {
    pub(crate) async fn handle_action(&mut self, action: Action) {
        match action {
            Action::Up => self.state.move_up(),
            Action::Down => self.state.move_down(),
            Action::Open => {
                if self.state.select_highlighted() {
                    self.state.clear_error();
                }
            }
            Action::Back => self.state.selection.clear(),
            Action::Fetch => self.start_fetch(),
            Action::Summarize => self.run_ai_action(ActionKind::Summarize).await,
            Action::Reply => self.run_ai_action(ActionKind::Reply).await,
            Action::Draft => self.run_ai_action(ActionKind::Draft).await,
            Action::AdjustTone => {
                let tone = self.state.tone.clone();
                self.run_ai_action(ActionKind::AdjustTone(tone)).await
            }
            Action::CycleTone => {
                self.state.cycle_tone();
                self.state.set_status(format!("Tone: {}", self.state.tone));
            }
            Action::Quit => {} // Handled in event loop
        }
    }

    /// Fetch the newest batch in the background. Ignored while one is running.
    pub(crate) fn start_fetch(&mut self) {
        if self.state.status.fetching {
            return;
        }
        self.state.status.fetching = true;
        self.state.set_status("Fetching inbox...");

        let gate = Arc::clone(&self.gate);
        let fetcher = Arc::clone(&self.fetcher);
        let limit = self.config.gmail.effective_fetch_limit();
        let tx = self.fetch_tx.clone();

        tokio::spawn(async move {
            let outcome = async {
                let session = gate.session().await?;
                let entries = fetcher.fetch(&session, limit).await?;
                Ok::<_, AssistantError>(entries)
            }
            .await;

            if tx.send(outcome).await.is_err() {
                tracing::warn!("Fetch finished after the app stopped listening");
            }
        });
    }

    async fn run_ai_action(&mut self, kind: ActionKind) {
        let Some(ticket) = self.state.begin_action(kind) else {
            return;
        };
        let Some(ref actor) = self.ai_actor else {
            return;
        };

        if actor
            .cmd_tx
            .send(AiCommand::Dispatch(ticket.clone()))
            .await
            .is_err()
        {
            tracing::error!("AI actor is gone");
            let failure = DispatchError::Transport(TransportError::Request(
                "AI worker stopped".to_string(),
            ));
            self.state.set_failure(&AssistantError::from(failure.clone()));
            self.state.selection.resolve(&ticket, Err(failure));
        }
    }
}
