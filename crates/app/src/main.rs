mod commands;
mod state;
mod utils;

use anyhow::{Context, Result};
use assistant::{resolve_unlock, AdminPanel, ChatSession, TurnOutcome};
use clap::Parser;
use providers::GeminiClient;
use state::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "concierge", version, about = "Camping Paradis chat concierge")]
struct Cli {
    /// Entry address; an `admin` query flag unlocks the configuration panel
    #[arg(long)]
    entry: Option<String>,

    /// Shorthand for `--entry ?admin`
    #[arg(long, conflicts_with = "entry")]
    admin: bool,

    /// Override the configured model name
    #[arg(long)]
    model: Option<String>,

    /// Read the persona prompt from a file
    #[arg(long)]
    persona_file: Option<PathBuf>,

    /// Preload a knowledge document (repeatable, .txt only)
    #[arg(long = "doc")]
    docs: Vec<PathBuf>,

    /// Send one message, print the reply and exit
    #[arg(long, short)]
    message: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = utils::load_settings_or_default();
    if let Some(model) = cli.model {
        settings.model.gemini_model = model;
    }

    let client = GeminiClient::from_settings(&settings.model).map_err(|e| {
        if e.is_fatal() {
            let hint = utils::settings_path()
                .map(|path| format!("\nSet it in {} or export GEMINI_API_KEY.", path.display()))
                .unwrap_or_default();
            anyhow::anyhow!("{}{}", e, hint)
        } else {
            anyhow::Error::new(e).context("starting gemini client")
        }
    })?;
    tracing::info!(model = %settings.model.gemini_model, "gemini client ready");

    let mut session_state = utils::load_session_state();
    let entry = entry_address(cli.entry, cli.admin);
    let unlock = resolve_unlock(entry.as_deref(), &mut session_state);
    if unlock.authorized {
        utils::save_session_state(&session_state);
    }
    if unlock.flag_consumed {
        if let Some(visible) = &unlock.visible_entry {
            eprintln!("entry: {}", visible);
        }
    }

    let mut chat = ChatSession::new(Arc::new(client), &settings);
    if let Some(path) = &cli.persona_file {
        let persona = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading persona file {}", path.display()))?;
        chat.set_persona(persona.trim());
    }

    let mut app = AppState::new(chat, AdminPanel::new(unlock.authorized), std::io::stdout());
    if !cli.docs.is_empty() {
        app.upload(&cli.docs).await?;
    }

    if let Some(message) = cli.message {
        if let TurnOutcome::Failed { error, .. } = app.send(&message).await? {
            return Err(anyhow::Error::new(error).context("reply failed"));
        }
        return Ok(());
    }

    run_repl(&mut app).await
}

/// `--admin` stands for an entry address carrying only the admin flag
fn entry_address(entry: Option<String>, admin: bool) -> Option<String> {
    match entry {
        Some(entry) => Some(entry),
        None if admin => Some(format!("?{}", assistant::admin::ADMIN_FLAG)),
        None => None,
    }
}

async fn run_repl(app: &mut AppState<std::io::Stdout>) -> Result<()> {
    app.print_greeting()?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        app.prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if !app.handle_line(&line).await? {
            break;
        }
    }
    Ok(())
}
