mod actor;
mod ai;
mod app;
mod config;
mod constants;
mod credentials;
mod error;
mod input;
mod mail;
mod oauth2;
mod selection;
mod session;
mod ui;

use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::App;
use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::error::{AssistantError, AuthError};
use crate::input::KeyBindings;
use crate::mail::{GmailClient, InboxEntry, InboxFetcher};
use crate::session::{GoogleSessionGate, SessionGate};

fn setup_logging() {
    use std::fs::OpenOptions;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mailmate=debug"));

    // The TUI owns the terminal, so prefer a log file in the config directory
    let log_file = Config::config_dir()
        .ok()
        .and_then(|dir| std::fs::create_dir_all(&dir).ok().map(|_| dir))
        .map(|dir| dir.join("mailmate.log"))
        .and_then(|path| {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)
                .ok()
        });

    if let Some(file) = log_file {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        // Fallback to stderr if file logging fails
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_usage() {
    eprintln!(
        r#"mailmate - Inbox assistant for the terminal

Usage: mailmate [command]

Commands:
    (none)          Start the interactive inbox
    init            Write a default config file
    login           Sign in with your Google account (read-only access)
    logout          Forget the stored sign-in
    fetch [limit]   Print the newest inbox messages
    help            Show this help message

Configuration file: ~/.config/mailmate/config.toml
"#
    );

    eprintln!("Keys:");
    for entry in KeyBindings::new().all_bindings() {
        eprintln!("    {:<12}{}", entry.key, entry.description);
    }
}

fn run_init(config: &Config) -> Result<()> {
    let path = Config::config_path()?;
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    config.save()?;
    println!("Wrote default config to {}", path.display());
    println!("Set gmail.client_id and ai.api_key, then run 'mailmate login'.");
    Ok(())
}

async fn run_login(config: &Config) -> Result<()> {
    let gate = GoogleSessionGate::new(config)?;
    if gate.is_authenticated() {
        println!("Already signed in; signing in again replaces the stored account.");
    }

    let identity = gate.sign_in().await?;
    println!("Signed in as {}. Run 'mailmate' to start.", identity.email);
    Ok(())
}

async fn run_logout(config: &Config) -> Result<()> {
    match GoogleSessionGate::new(config) {
        Ok(gate) => gate.sign_out().await?,
        // Without a client we cannot revoke, but the local token can still go
        Err(AuthError::MissingClientId) => CredentialStore::new().delete_all()?,
        Err(e) => return Err(e.into()),
    }
    println!("Signed out.");
    Ok(())
}

async fn run_fetch(config: &Config, limit: Option<&str>) -> Result<()> {
    let limit = match limit {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("Invalid limit: {}", raw))?,
        None => config.gmail.effective_fetch_limit(),
    };

    let gate = GoogleSessionGate::new(config)?;
    let session = match gate.session().await {
        Ok(session) => session,
        Err(AuthError::NotSignedIn) => {
            eprintln!("Not signed in. Run 'mailmate login' first.\n");
            eprint!("{}", CredentialStore::new().debug_info());
            std::process::exit(1);
        }
        Err(e) => return Err(AssistantError::from(e).into()),
    };

    let mailbox = GmailClient::new(&config.gmail.api_base)?;
    let fetcher = InboxFetcher::new(Arc::new(mailbox));
    let entries = fetcher
        .fetch(&session, limit)
        .await
        .map_err(AssistantError::from)?;

    if entries.is_empty() {
        println!("Inbox is empty.");
    }
    for (i, entry) in entries.iter().enumerate() {
        print_entry(i + 1, entry);
    }
    Ok(())
}

fn print_entry(n: usize, entry: &InboxEntry) {
    let flag = if entry.is_degraded() { " [!]" } else { "" };
    println!("{}.{} {}", n, flag, entry.email.subject());
    println!("   From: {}", entry.email.from());
    if let Some(ref issue) = entry.issue {
        println!("   {} issue: {}", issue.kind().label(), issue.reason());
    }
    let preview: String = entry
        .email
        .body()
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .chars()
        .take(100)
        .collect();
    println!("   {}\n", preview);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(|s| s.as_str());

    if matches!(command, Some("help") | Some("--help") | Some("-h")) {
        print_usage();
        return Ok(());
    }

    setup_logging();
    let config = Config::load()?;
    config.ensure_dirs()?;

    match command {
        Some("init") => run_init(&config),
        Some("login") => run_login(&config).await,
        Some("logout") => run_logout(&config).await,
        Some("fetch") => run_fetch(&config, args.get(2).map(|s| s.as_str())).await,
        Some(cmd) => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            std::process::exit(1);
        }
        None => {
            let gate = GoogleSessionGate::new(&config)?;
            tracing::debug!("{}", CredentialStore::new().debug_info());

            let mut app = App::new(config, gate)?;
            app.run().await
        }
    }
}
