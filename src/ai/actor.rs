//! AI actor: runs dispatches off the UI task, one at a time
//!
//! A new dispatch aborts the one in flight. Its ticket is already stale, so
//! nothing would be done with the result anyway.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::client::CompletionBackend;
use super::dispatcher::{Dispatcher, Response};
use crate::actor::{RetryConfig, with_retry_if};
use crate::error::DispatchError;
use crate::selection::Ticket;

#[derive(Debug)]
pub enum AiCommand {
    /// Run the ticket's action against the ticket's email snapshot
    Dispatch(Ticket),
    Shutdown,
}

#[derive(Debug)]
pub enum AiEvent {
    Finished {
        ticket: Ticket,
        result: Result<Response, DispatchError>,
    },
}

pub struct AiActorHandle {
    pub cmd_tx: mpsc::Sender<AiCommand>,
    pub event_rx: mpsc::Receiver<AiEvent>,
}

pub fn spawn_ai_actor<B: CompletionBackend>(
    dispatcher: Arc<Dispatcher<B>>,
    retry: RetryConfig,
) -> AiActorHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::channel(16);

    tokio::spawn(ai_actor_loop(dispatcher, retry, cmd_rx, event_tx));

    AiActorHandle { cmd_tx, event_rx }
}

async fn ai_actor_loop<B: CompletionBackend>(
    dispatcher: Arc<Dispatcher<B>>,
    retry: RetryConfig,
    mut cmd_rx: mpsc::Receiver<AiCommand>,
    event_tx: mpsc::Sender<AiEvent>,
) {
    let mut in_flight: Option<JoinHandle<()>> = None;

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            AiCommand::Dispatch(ticket) => {
                if let Some(previous) = in_flight.take()
                    && !previous.is_finished()
                {
                    tracing::debug!("Aborting superseded request");
                    previous.abort();
                }

                tracing::debug!(
                    "Dispatching {} (generation {})",
                    ticket.action,
                    ticket.generation()
                );

                let dispatcher = Arc::clone(&dispatcher);
                let retry = retry.clone();
                let event_tx = event_tx.clone();
                in_flight = Some(tokio::spawn(async move {
                    let result = with_retry_if(&retry, DispatchError::is_transient, || {
                        dispatcher.dispatch(Some(&ticket.email), &ticket.action)
                    })
                    .await;

                    if let Err(ref e) = result {
                        tracing::warn!("{} failed: {}", ticket.action, e);
                    }
                    if event_tx
                        .send(AiEvent::Finished { ticket, result })
                        .await
                        .is_err()
                    {
                        tracing::warn!("AI actor: event receiver dropped");
                    }
                }));
            }
            AiCommand::Shutdown => {
                if let Some(handle) = in_flight.take() {
                    handle.abort();
                }
                tracing::debug!("AI actor shutting down");
                break;
            }
        }
    }
}
