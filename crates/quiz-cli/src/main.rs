//! Quiz CLI
//!
//! Main entry point for running a quiz session with optional auto-answer mode.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use quiz_engine::{
    bank_from_config, create_router, option_letter, AnswerProvider, AppState, Config,
    CredentialStore, EventBroadcaster, FileCredentialStore, OpenAiProvider, Orchestrator,
    QuestionSource, QuizEvent, QuizStore, Session, SessionSnapshot,
};
use quiz_report::{json::JsonGenerator, AnswerRow, MarkdownGenerator, ScoreCard};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

/// Default port for the HTTP API server.
const DEFAULT_PORT: u16 = 3000;

/// Quiz - multiple-choice quiz with an optional AI auto-answer mode
///
/// Serves the session over HTTP and WebSocket, prints notifications to the
/// terminal and writes a score card when the run ends.
#[derive(Parser, Debug)]
#[command(name = "quiz")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: quiz.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Load questions from a JSON file instead of the sample bank
    #[arg(short, long, value_name = "FILE")]
    questions: Option<String>,

    /// Output directory for score cards
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Port for the HTTP API server
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Start with auto-answer mode enabled
    #[arg(short, long)]
    auto: bool,

    /// Stop once the last question has been answered
    #[arg(long)]
    exit_on_complete: bool,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,

    /// API key to store before starting
    #[arg(long, env = "QUIZ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Quiz starting");
    tracing::debug!(config = ?args.config, "Config file");
    tracing::debug!(questions = ?args.questions, "Question file");

    match run_quiz(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Runs one quiz session until Ctrl+C or completion.
///
/// 1. Load config and apply overrides
/// 2. Build the store and spawn the orchestrator
/// 3. Start the HTTP server
/// 4. Load questions and print notifications
/// 5. Print the summary and write score cards
async fn run_quiz(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(ref questions) = args.questions {
        config.question_bank.source = QuestionSource::File;
        config.question_bank.path = Some(questions.clone());
    }
    if let Some(ref output_dir) = args.output_dir {
        config.output_dir.clone_from(output_dir);
    }
    if args.auto {
        config.auto_answer.start_enabled = true;
    }

    // Re-validate after overrides
    config.validate()?;

    print_config(&config);

    let credentials: Arc<dyn CredentialStore> =
        Arc::new(FileCredentialStore::new(&config.credential_file));
    if let Some(key) = args.api_key.as_deref().map(str::trim) {
        if !key.is_empty() {
            credentials.set(key).await?;
            tracing::info!("Stored API key from environment");
        }
    }

    let store = Arc::new(QuizStore::new(
        Session::with_auto_answer_mode(config.auto_answer.start_enabled),
        EventBroadcaster::default(),
    ));
    let mut events = store.subscribe();

    let provider: Arc<dyn AnswerProvider> = Arc::new(OpenAiProvider::new(config.provider.clone()));
    let orchestrator_handle = Orchestrator::new(
        Arc::clone(&store),
        provider,
        Arc::clone(&credentials),
        config.auto_answer.clone(),
    )
    .spawn();

    // Start HTTP server in background
    let addr: SocketAddr = ([127, 0, 0, 1], args.port).into();
    let bank = bank_from_config(&config.question_bank);
    let router = create_router(AppState::new(
        Arc::clone(&store),
        Arc::clone(&credentials),
        Arc::clone(&bank),
    ));

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "HTTP server error");
        }
    });

    println!();
    println!("HTTP API server running on http://{addr}");
    println!("WebSocket events on ws://{addr}/ws");
    println!("Press Ctrl+C to stop");
    println!();

    let loader = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            println!("Loading questions...");
            if let Err(e) = store.load_questions(bank.as_ref()).await {
                tracing::warn!(error = %e, "Initial question load failed");
            }
        })
    };

    loop {
        tokio::select! {
            Ok(()) = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                break;
            }
            received = events.recv() => match received {
                Ok(event) => {
                    print_toast(&event);
                    if args.exit_on_complete && matches!(event, QuizEvent::QuizComplete(_)) {
                        tracing::info!("Quiz complete, shutting down");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Terminal observer lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    loader.abort();
    orchestrator_handle.abort();
    server_handle.abort();

    let snapshot = store.snapshot().await;
    println!();
    print_summary(&snapshot);

    write_score_cards(&snapshot, Path::new(&config.output_dir))
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Prints the loaded configuration.
fn print_config(config: &Config) {
    println!("Configuration loaded:");
    match (config.question_bank.source, config.question_bank.path.as_deref()) {
        (QuestionSource::File, Some(path)) => println!("  Questions: {path}"),
        _ => println!("  Questions: sample bank"),
    }
    println!("  Output directory: {}", config.output_dir);
    println!("  Model: {}", config.provider.model);
    println!("  Credential file: {}", config.credential_file);
    println!(
        "  Auto-answer: {}",
        if config.auto_answer.start_enabled {
            "on"
        } else {
            "off"
        }
    );
}

/// Prints a one-line notification for an event.
fn print_toast(event: &QuizEvent) {
    match event {
        QuizEvent::QuestionsLoaded(payload) => {
            println!("  Loaded {} questions", payload.total);
        }
        QuizEvent::LoadFailed(payload) => {
            println!("  Failed to load questions: {}", payload.message);
        }
        QuizEvent::AnswerRevealed(payload) => {
            let verdict = if payload.correct {
                "Correct!"
            } else {
                "Incorrect"
            };
            println!(
                "  Q{}: {} ({} chosen, {} correct)",
                payload.question_index + 1,
                verdict,
                option_letter(payload.selected_option_index),
                option_letter(payload.correct_option_index)
            );
        }
        QuizEvent::AutoAnswerToggled(payload) => {
            if payload.enabled {
                println!("  Auto-answer mode enabled");
            } else {
                println!("  Auto-answer mode disabled");
            }
        }
        QuizEvent::QuizComplete(payload) => {
            println!("  Quiz complete: {}/{}", payload.score, payload.total);
        }
        QuizEvent::AiError(payload) => {
            println!("  Auto-answer failed: {}", payload.error.message);
            println!("    {}", payload.error.kind.suggestion());
        }
        QuizEvent::Connected(_) | QuizEvent::SessionUpdated(_) => {
            tracing::trace!(event = event.event_name(), "Session event");
        }
    }
}

/// Prints a summary of the run.
fn print_summary(snapshot: &SessionSnapshot) {
    println!("=== Quiz Summary ===");
    println!("Score: {}/{}", snapshot.score, snapshot.total);
    println!("Answered: {}", snapshot.history.len());
    println!(
        "Status: {}",
        if snapshot.complete {
            "complete"
        } else {
            "stopped early"
        }
    );
}

/// Writes the Markdown and JSON score cards to the output directory.
fn write_score_cards(snapshot: &SessionSnapshot, output_dir: &Path) -> anyhow::Result<()> {
    println!();
    println!("Generating score card...");

    let card = create_score_card(snapshot)?;

    std::fs::create_dir_all(output_dir)?;

    let md_path: PathBuf = output_dir.join("quiz-report.md");
    std::fs::write(&md_path, MarkdownGenerator::new(&card).generate())?;
    println!("  Markdown score card: {}", md_path.display());

    let json_path = output_dir.join("quiz-report.json");
    JsonGenerator::new(&card).write_to_file(&json_path, true)?;
    println!("  JSON score card: {}", json_path.display());

    println!();
    println!("{:.0}% - {}", card.percentage, card.grade);

    Ok(())
}

/// Builds a `ScoreCard` from the final session snapshot.
fn create_score_card(snapshot: &SessionSnapshot) -> anyhow::Result<ScoreCard> {
    let rows = snapshot
        .history
        .iter()
        .filter_map(|record| {
            let question = snapshot.questions.get(record.question_index)?;
            let text = |index: usize| question.options.get(index).cloned().unwrap_or_default();
            Some(AnswerRow {
                number: record.question_index + 1,
                prompt: question.prompt.clone(),
                chosen_letter: option_letter(record.selected_option_index),
                chosen_text: text(record.selected_option_index),
                correct_letter: option_letter(record.correct_option_index),
                correct_text: text(record.correct_option_index),
                correct: record.correct,
                auto_answered: record.auto_answered,
            })
        })
        .collect();

    Ok(ScoreCard::try_new(snapshot.score, snapshot.total, rows)?)
}
