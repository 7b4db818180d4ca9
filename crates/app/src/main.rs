use std::path::{Path, PathBuf};

use clap::Parser;
use quiz_core::model::QuizConfigDraft;
use services::sessions::{
    Navigation, QuizRuntime, SubmitOutcome, TickOutcome, TimerUrgency, format_remaining,
};
use services::Clock;
use storage::{InMemoryQuestionBank, Storage, StorageError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

mod terminal;

use terminal::{HELP, Input, answer_rejected, question_view, report_view};

#[derive(Debug, Parser)]
#[command(name = "quiz", version, about = "Timed multiple-choice quiz in the terminal")]
struct Cli {
    /// JSON question bank
    #[arg(long, env = "QUIZ_BANK_PATH", default_value = "demos/question_bank.json")]
    bank: PathBuf,

    /// Topic to quiz on (defaults to the first topic in the bank)
    #[arg(long)]
    topic: Option<String>,

    /// Number of questions to ask
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    questions: i64,

    /// Time limit in minutes
    #[arg(long, default_value_t = 30, allow_negative_numbers = true)]
    minutes: i64,

    /// SQLite URL for session snapshots; sessions stay in memory when unset
    #[arg(long, env = "QUIZ_DB_URL")]
    db: Option<String>,

    /// Continue the most recent unfinished session
    #[arg(long)]
    resume: bool,

    /// Shuffle questions before starting
    #[arg(long)]
    shuffle: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid --db value: {raw}")]
    InvalidDbUrl { raw: String },
    #[error("question bank {path} not found")]
    BankNotFound { path: PathBuf },
    #[error("question bank {path} has no topics")]
    EmptyBank { path: PathBuf },
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path = Path::new(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let invalid = || CliError::InvalidDbUrl {
        raw: db_url.to_owned(),
    };
    let path = db_url.strip_prefix("sqlite://").ok_or_else(invalid)?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(invalid().into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

fn load_bank(path: &Path) -> Result<InMemoryQuestionBank, Box<dyn std::error::Error>> {
    match InMemoryQuestionBank::from_json_file(path) {
        Ok(bank) => Ok(bank),
        Err(StorageError::NotFound) => Err(CliError::BankNotFound {
            path: path.to_path_buf(),
        }
        .into()),
        Err(err) => Err(err.into()),
    }
}

async fn build_runtime(
    cli: &Cli,
    bank: InMemoryQuestionBank,
) -> Result<QuizRuntime, Box<dyn std::error::Error>> {
    let runtime = match cli.db.as_deref() {
        Some(raw) => {
            let url = normalize_sqlite_url(raw);
            prepare_sqlite_file(&url)?;
            QuizRuntime::sqlite(Clock::system(), &url, bank).await?
        }
        None => QuizRuntime::new(Clock::system(), Storage::in_memory(bank)),
    };
    Ok(runtime.with_shuffle(cli.shuffle))
}

/// Wait for the next countdown update. Never resolves when no countdown runs.
async fn next_tick(updates: &mut Option<watch::Receiver<TickOutcome>>) -> TickOutcome {
    let Some(rx) = updates.as_mut() else {
        return std::future::pending().await;
    };
    if rx.changed().await.is_err() {
        *updates = None;
        return std::future::pending().await;
    }
    *rx.borrow_and_update()
}

fn show_question(runtime: &QuizRuntime) -> Result<(), Box<dyn std::error::Error>> {
    let Some(session) = runtime.session()? else {
        return Ok(());
    };
    if session.is_completed() {
        return show_report(runtime);
    }
    let remaining = runtime.orchestrator().lock().ok().and_then(|o| o.remaining());
    print!("{}", question_view(&session, remaining));
    Ok(())
}

fn show_report(runtime: &QuizRuntime) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(report) = runtime.report()? {
        print!("{}", report_view(&report));
        println!("type 'retake' to try again or 'quit' to leave");
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("services=info".parse()?)
                .add_directive("storage=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    tracing::debug!(bank = %cli.bank.display(), db = ?cli.db, "starting quiz host");
    let bank = load_bank(&cli.bank)?;
    let topic = match cli.topic.clone() {
        Some(topic) => topic,
        None => bank
            .topics()?
            .into_iter()
            .next()
            .ok_or_else(|| CliError::EmptyBank {
                path: cli.bank.clone(),
            })?,
    };
    let mut runtime = build_runtime(&cli, bank).await?;

    let resumed = if cli.resume {
        runtime
            .resume_latest()
            .await?
            .filter(|session| !session.is_completed())
    } else {
        None
    };
    if resumed.is_none() {
        if cli.resume {
            tracing::info!("no unfinished session to resume; starting a new one");
        }
        runtime
            .start(QuizConfigDraft::new(cli.questions, cli.minutes, topic))
            .await?;
    }

    println!("{HELP}");
    show_question(&runtime)?;

    let mut updates = runtime.countdown_updates();
    let mut urgency = TimerUrgency::Calm;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match Input::parse(&line) {
                    Input::Choose(option) => {
                        let index = runtime
                            .session()?
                            .map(|s| s.current_question_index())
                            .unwrap_or_default();
                        if runtime.answer(index, option).await? {
                            show_question(&runtime)?;
                        } else {
                            println!("{}", answer_rejected(runtime.session()?.as_ref()));
                        }
                    }
                    Input::Next => {
                        if runtime.navigate(Navigation::Next).await? {
                            show_question(&runtime)?;
                        }
                    }
                    Input::Previous => {
                        if runtime.navigate(Navigation::Previous).await? {
                            show_question(&runtime)?;
                        }
                    }
                    Input::GoTo(index) => {
                        if runtime.navigate(Navigation::GoTo(index)).await? {
                            show_question(&runtime)?;
                        } else {
                            println!("no such question");
                        }
                    }
                    Input::Submit => match runtime.submit().await? {
                        SubmitOutcome::Submitted(_) => {
                            updates = None;
                            show_report(&runtime)?;
                        }
                        SubmitOutcome::AlreadyCompleted => println!("already submitted"),
                        SubmitOutcome::NoSession => println!("no quiz in progress"),
                    },
                    Input::Retake => {
                        if runtime.retake().await?.is_some() {
                            updates = runtime.countdown_updates();
                            urgency = TimerUrgency::Calm;
                            show_question(&runtime)?;
                        } else {
                            println!("submit the quiz before retaking it");
                        }
                    }
                    Input::Time => {
                        let remaining = runtime.orchestrator().lock().ok().and_then(|o| o.remaining());
                        match remaining {
                            Some(remaining) => println!("{} remaining", format_remaining(remaining)),
                            None => println!("no countdown running"),
                        }
                    }
                    Input::Help => println!("{HELP}"),
                    Input::Quit => break,
                    Input::Discard => {
                        runtime.discard().await?;
                        break;
                    }
                    Input::Empty => {}
                    Input::Unknown(raw) => println!("unknown command: {raw} (type 'help')"),
                }
            }
            outcome = next_tick(&mut updates) => match outcome {
                TickOutcome::Running { remaining } => {
                    let now = TimerUrgency::for_remaining(remaining);
                    if now != urgency {
                        urgency = now;
                        if now != TimerUrgency::Calm {
                            println!("{} remaining", format_remaining(remaining));
                        }
                    }
                }
                TickOutcome::Expired { .. } => {
                    updates = None;
                    println!("time is up");
                    show_report(&runtime)?;
                }
                TickOutcome::Stopped => updates = None,
            },
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
