use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;

use parley_core::conversation::{ConversationManager, MessageRole};
use parley_infrastructure::{ConfigService, JsonJournalStore, ParleyPaths, SecretService};
use parley_interaction::metrics::estimate_tokens;
use parley_interaction::{LanguageModel, MetricsCollector, model_for};

/// How long one generation call may take before the turn is abandoned.
const GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Command-line options for the parley REPL.
#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Chat REPL with a durable conversation journal and bounded recency cache")]
struct Cli {
    /// Directory holding config.toml, secret.json and the journal
    /// (defaults to the per-user config directory)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Overrides the configured model backend
    #[arg(long)]
    model: Option<String>,
}

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: vec![
                "/new".to_string(),
                "/list".to_string(),
                "/switch".to_string(),
                "/history".to_string(),
                "/cache".to_string(),
                "/metrics".to_string(),
                "/clear".to_string(),
            ],
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// The main entry point for the parley REPL.
///
/// Sets up a rustyline-based REPL that:
/// 1. Initializes the journal store, conversation manager, and model backend
/// 2. Provides command completion for the slash commands
/// 3. Processes one chat turn at a time, start to finish
/// 4. Displays colored output for user, AI, and system messages
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("starting parley session");

    // ===== Backend Initialization =====
    let (config_service, secret_service, journal_path) = match &cli.data_dir {
        Some(dir) => (
            ConfigService::with_file(dir.join("config.toml")),
            SecretService::with_file(dir.join("secret.json")),
            dir.join("journal").join("conversations.json"),
        ),
        None => (
            ConfigService::new()?,
            SecretService::new()?,
            ParleyPaths::journal_file()
                .map_err(|e| anyhow::anyhow!("Failed to resolve journal path: {}", e))?,
        ),
    };

    let mut config = config_service.get_config();
    if let Some(model) = &cli.model {
        config.model.name = model.clone();
    }
    let secrets = secret_service.load_secrets()?;

    let journal_path = config.journal.path.clone().unwrap_or(journal_path);
    let journal = Arc::new(JsonJournalStore::open(&journal_path).await?);
    let mut manager = ConversationManager::new(journal, config.cache.settings());

    let model = model_for(&config.model, &secrets)
        .map_err(|e| anyhow::anyhow!("Failed to initialize model backend: {}", e))?;
    let mut metrics = MetricsCollector::new();

    // ===== REPL Setup =====
    let helper = CliHelper::new();
    let mut rl = Editor::new()?;
    rl.set_helper(Some(helper));

    println!("{}", "=== Parley ===".bright_magenta().bold());
    println!(
        "{}",
        format!("Model backend: {}", model.name()).bright_black()
    );
    println!(
        "{}",
        "Type a message to chat, '/new' for a fresh conversation, '/list' to see stored ones, or 'quit' to exit."
            .bright_black()
    );
    println!();

    // ===== Main REPL Loop =====
    loop {
        let readline = rl.readline(">> ");

        match readline {
            Ok(line) => {
                let trimmed = line.trim();

                if trimmed == "quit" || trimmed == "exit" {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }

                if trimmed.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(&line);

                if trimmed.starts_with('/') {
                    if let Err(e) = handle_command(trimmed, &mut manager, &metrics).await {
                        eprintln!("{}", format!("Error: {}", e).red());
                    }
                    continue;
                }

                if let Err(e) =
                    handle_turn(trimmed, &mut manager, model.as_ref(), &mut metrics).await
                {
                    eprintln!("{}", format!("Error: {}", e).red());
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}

/// Processes one chat turn, start to finish.
///
/// The user message is journaled before the model is called, so a failed
/// or timed-out generation loses nothing: only the assistant reply is
/// missing, and the user is told so.
async fn handle_turn(
    prompt: &str,
    manager: &mut ConversationManager,
    model: &dyn LanguageModel,
    metrics: &mut MetricsCollector,
) -> parley_core::Result<()> {
    manager.record_user_message(prompt).await?;
    println!("{}", format!("> {}", prompt).green());

    let start = Instant::now();
    match timeout(GENERATION_TIMEOUT, model.generate(prompt)).await {
        Ok(Ok(reply)) => {
            let elapsed = start.elapsed();
            let tokens = estimate_tokens(prompt) + estimate_tokens(&reply);
            metrics.record_request(model.name(), elapsed, tokens);

            manager.record_assistant_message(&reply).await?;
            for line in reply.lines() {
                println!("{}", line.bright_blue());
            }
        }
        Ok(Err(err)) => {
            metrics.record_error(model.name());
            eprintln!(
                "{}",
                format!("Generation failed: {} (your message was saved)", err).red()
            );
        }
        Err(_) => {
            metrics.record_error(model.name());
            eprintln!(
                "{}",
                "Generation timed out (your message was saved)".red()
            );
        }
    }

    Ok(())
}

/// Dispatches a slash command.
async fn handle_command(
    line: &str,
    manager: &mut ConversationManager,
    metrics: &MetricsCollector,
) -> parley_core::Result<()> {
    let mut parts = line.splitn(2, ' ');
    let command = parts.next().unwrap_or_default();
    let argument = parts.next().map(str::trim).unwrap_or_default();

    match command {
        "/new" => {
            let id = manager.start_new().await?;
            println!("{}", format!("Started conversation {}", id).bright_green());
        }
        "/list" => {
            let summaries = manager.list_conversations().await?;
            if summaries.is_empty() {
                println!("{}", "No stored conversations".bright_black());
            }
            for summary in summaries {
                println!(
                    "{}  {}  {}",
                    summary.id.bright_cyan(),
                    summary.created_at.format("%Y-%m-%d %H:%M:%S").to_string().bright_black(),
                    format!("{} messages", summary.message_count).bright_black(),
                );
            }
        }
        "/switch" => {
            if argument.is_empty() {
                println!("{}", "Usage: /switch <conversation-id>".yellow());
            } else if manager.switch_to(argument).await? {
                println!(
                    "{}",
                    format!("Switched to conversation {}", argument).bright_green()
                );
            } else {
                eprintln!(
                    "{}",
                    format!("Conversation not found: {}", argument).red()
                );
            }
        }
        "/history" => {
            for message in manager.messages().await? {
                let content = match message.role {
                    MessageRole::User => format!("> {}", message.content).green(),
                    MessageRole::Assistant => message.content.bright_blue(),
                };
                println!("{}", content);
            }
        }
        "/cache" => {
            let now = Utc::now();
            let cache = manager.cache_mut();
            let expiry = cache.settings().expiry;
            println!(
                "{}",
                format!(
                    "Cached interactions: {}, oldest age: {} min",
                    cache.size(now),
                    cache.oldest_age(now).num_minutes()
                )
                .bright_black()
            );
            for (idx, entry) in cache.entries(now).iter().enumerate() {
                let time_left = expiry - (now - entry.inserted_at);
                println!(
                    "{}",
                    format!(
                        "Interaction {} - expires in {} min",
                        idx + 1,
                        time_left.num_minutes()
                    )
                    .bright_magenta()
                );
                println!("{}", format!("> {}", entry.interaction.user.content).green());
                println!("{}", entry.interaction.assistant.content.bright_blue());
            }
        }
        "/metrics" => {
            println!(
                "{}",
                format!(
                    "Requests: {}, errors: {} ({:.0}%), avg response time: {:.2}s",
                    metrics.requests(),
                    metrics.errors(),
                    metrics.error_rate() * 100.0,
                    metrics.average_response_time().as_secs_f64(),
                )
                .bright_black()
            );
            for (model, usage) in metrics.usage() {
                println!(
                    "{}",
                    format!(
                        "  {}: {} requests, {} tokens, ${:.4}",
                        model, usage.requests, usage.tokens, usage.cost
                    )
                    .bright_black()
                );
            }
            println!(
                "{}",
                format!("Total cost: ${:.4}", metrics.total_cost()).bright_black()
            );
        }
        "/clear" => {
            manager.cache_mut().clear();
            println!("{}", "Cache cleared".bright_green());
        }
        _ => {
            println!("{}", "Unknown command".bright_black());
        }
    }

    Ok(())
}
