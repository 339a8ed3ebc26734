//! Application core: owns the state and coordinates the fetcher and the AI actor

mod actions;
mod event_loop;
pub mod render_thread;
pub mod state;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use render_thread::RenderThread;

use crate::actor::RetryConfig;
use crate::ai::{AiActorHandle, AiCommand, ChatCompletionClient, Dispatcher, spawn_ai_actor};
use crate::config::Config;
use crate::error::AssistantError;
use crate::input::KeyBindings;
use crate::mail::{GmailClient, InboxEntry, InboxFetcher};
use crate::session::{GoogleSessionGate, SessionGate};
use state::AppState;

pub(crate) type FetchOutcome = Result<Vec<InboxEntry>, AssistantError>;

pub struct App {
    pub(crate) config: Config,
    pub(crate) gate: Arc<GoogleSessionGate>,
    pub(crate) fetcher: Arc<InboxFetcher<GmailClient>>,
    pub(crate) state: AppState,
    pub(crate) bindings: KeyBindings,
    /// AI actor handle (None if no API key is configured)
    pub(crate) ai_actor: Option<AiActorHandle>,
    pub(crate) fetch_tx: mpsc::Sender<FetchOutcome>,
    pub(crate) fetch_rx: mpsc::Receiver<FetchOutcome>,
    /// Dirty flag: when true, UI needs re-render. Skips renders when nothing changed.
    pub(crate) dirty: bool,
}

impl App {
    pub fn new(config: Config, gate: GoogleSessionGate) -> Result<Self> {
        let mailbox = GmailClient::new(&config.gmail.api_base)
            .context("Failed to create Gmail client")?;
        let fetcher = InboxFetcher::new(Arc::new(mailbox));

        let ai_actor = match config.ai.get_api_key() {
            Some(api_key) => {
                let client = ChatCompletionClient::new(
                    config.ai.endpoint.clone(),
                    api_key,
                    Duration::from_secs(config.ai.request_timeout_secs),
                )
                .context("Failed to create completion client")?;
                let dispatcher =
                    Dispatcher::new(Arc::new(client), config.ai.model.clone(), config.ai.max_tokens);
                Some(spawn_ai_actor(
                    Arc::new(dispatcher),
                    RetryConfig::with_max_retries(config.ai.max_retries),
                ))
            }
            None => {
                tracing::info!("No AI API key configured; actions disabled");
                None
            }
        };

        let state = AppState {
            tone: config.ui.default_tone.clone(),
            signed_in: gate.is_authenticated(),
            ai_enabled: ai_actor.is_some(),
            ..Default::default()
        };

        let (fetch_tx, fetch_rx) = mpsc::channel(4);

        Ok(Self {
            config,
            gate: Arc::new(gate),
            fetcher: Arc::new(fetcher),
            state,
            bindings: KeyBindings::new(),
            ai_actor,
            fetch_tx,
            fetch_rx,
            dirty: true, // Start dirty for initial render
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        // Spawn background render thread (owns terminal setup/teardown)
        let render_thread = RenderThread::spawn()?;

        if self.state.signed_in {
            self.start_fetch();
        } else {
            self.state
                .set_status("Not signed in. Quit and run `mailmate login`.");
        }

        let result = self.event_loop(&render_thread).await;

        // Shutdown render thread (handles terminal cleanup)
        render_thread.shutdown();

        if let Some(ref actor) = self.ai_actor {
            actor.cmd_tx.send(AiCommand::Shutdown).await.ok();
        }

        result
    }
}
