use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;

use classchat_core::config::{API_KEY_ENV, AppConfig, SetupInfo};
use classchat_core::orchestrator::{ChatEvent, ChatOrchestrator, TurnState};
use classchat_core::persistence::{RetryNotice, RetryingPersistence};
use classchat_core::session::{Session, SessionSegmenter};
use classchat_infrastructure::MemoryWorkbook;
use classchat_interaction::ClaudeApiClient;

mod command;
mod helper;
mod logging;

use command::ReplCommand;
use helper::CliHelper;

type Repl = Editor<CliHelper, DefaultHistory>;

#[derive(Parser, Debug)]
#[command(name = "classchat")]
#[command(about = "ClassChat - a classroom chat bot for the terminal", long_about = None)]
struct Cli {
    /// Local settings file (defaults to ~/.config/classchat/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Class setup file holding `values = [...]`
    #[arg(long)]
    setup: Option<PathBuf>,

    /// JSON workbook snapshot used for logs and summaries
    #[arg(long)]
    workbook: Option<PathBuf>,

    /// Student nickname; asked for interactively when omitted
    #[arg(long)]
    nickname: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.debug);

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => AppConfig::default_path()?,
    };
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    let setup = load_setup(&cli, &config)?;

    println!("{}", "=== ClassChat ===".bright_magenta().bold());
    if !setup.is_service_on() {
        println!(
            "{}",
            "The chat bot is resting right now. Please come back later.".yellow()
        );
        return Ok(());
    }

    let workbook = Arc::new(match cli.workbook.as_ref().or(config.workbook_path.as_ref()) {
        Some(path) => MemoryWorkbook::open(path)
            .await
            .with_context(|| format!("Failed to open workbook {}", path.display()))?,
        None => {
            println!(
                "{}",
                "No workbook file configured; logs are kept in memory only.".bright_black()
            );
            MemoryWorkbook::new()
        }
    });
    let client = Arc::new(ClaudeApiClient::from_setup(&setup).context("Invalid chat setup")?);

    let mut rl: Repl = Editor::new()?;
    rl.set_helper(Some(CliHelper));

    let Some(nickname) = read_nickname(&mut rl, cli.nickname.clone())? else {
        return Ok(());
    };

    let mut orchestrator = match ChatOrchestrator::start(setup, &nickname, client, workbook.clone()).await {
        Ok(orchestrator) => orchestrator
            .with_history_limit(config.history_limit)
            .with_retry(RetryingPersistence::new(config.retry_policy())),
        Err(err) => {
            eprintln!("{}", err.user_message().red());
            return Ok(());
        }
    };
    flush(&workbook).await;

    println!("{}", format!("Hello, {}!", orchestrator.nickname()).bright_green());
    print_help();
    println!();

    let segmenter = SessionSegmenter::new(config.session_gap_minutes);
    let mut sessions: Vec<Session> = Vec::new();

    loop {
        let line = match rl.readline(">> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        };

        let command = ReplCommand::parse(&line);
        if !matches!(command, ReplCommand::Empty) {
            let _ = rl.add_history_entry(line.trim());
        }

        match command {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => {
                println!("{}", "Goodbye!".bright_green());
                break;
            }
            ReplCommand::Help => print_help(),
            ReplCommand::Invalid(message) => println!("{}", message.bright_black()),
            ReplCommand::Chat(text) => {
                match orchestrator.submit(&text, render_event).await {
                    Ok(_) => println!(),
                    Err(err) => {
                        println!();
                        eprintln!("{}", err.user_message().red());
                    }
                }
                flush(&workbook).await;
            }
            ReplCommand::Sessions => match orchestrator.sessions(&segmenter).await {
                Ok(found) => {
                    sessions = found;
                    print_sessions(&sessions);
                }
                Err(err) => eprintln!("{}", err.user_message().red()),
            },
            ReplCommand::Title(number) => {
                if sessions.is_empty() {
                    match orchestrator.sessions(&segmenter).await {
                        Ok(found) => sessions = found,
                        Err(err) => {
                            eprintln!("{}", err.user_message().red());
                            continue;
                        }
                    }
                }
                let Some(session) = sessions.get(number - 1) else {
                    println!(
                        "{}",
                        format!("No session {number}; run /sessions to list them.").bright_black()
                    );
                    continue;
                };
                match orchestrator
                    .title_session(session, config.title_max_chars, print_retry)
                    .await
                {
                    Ok(title) => println!("{}", format!("Session {number}: {title}").green()),
                    Err(err) => eprintln!("{}", err.user_message().red()),
                }
                flush(&workbook).await;
            }
            ReplCommand::End => {
                let result = orchestrator.end_session(render_event).await;
                flush(&workbook).await;
                match result {
                    Ok(summary) => {
                        println!("{}", "Evaluation".bright_magenta().bold());
                        println!("{}", summary.evaluation.bright_blue());
                        println!("{}", "Commentary".bright_magenta().bold());
                        println!("{}", summary.commentary.bright_blue());
                        println!("{}", "Session ended. Goodbye!".bright_green());
                        break;
                    }
                    Err(err) => eprintln!("{}", err.user_message().red()),
                }
            }
        }
    }

    flush(&workbook).await;
    Ok(())
}

fn load_setup(cli: &Cli, config: &AppConfig) -> Result<SetupInfo> {
    let Some(path) = cli.setup.as_ref().or(config.setup_path.as_ref()) else {
        bail!("No class setup file: pass --setup or set setup_path in the config file");
    };
    let setup = SetupInfo::load(path)
        .with_context(|| format!("Failed to load class setup {}", path.display()))?;
    match env::var(API_KEY_ENV).ok().filter(|key| !key.trim().is_empty()) {
        Some(key) => {
            tracing::debug!("using API key from {API_KEY_ENV}");
            Ok(setup.with_api_key(key.trim()))
        }
        None => Ok(setup),
    }
}

fn read_nickname(rl: &mut Repl, given: Option<String>) -> Result<Option<String>> {
    if let Some(nickname) = given.filter(|n| !n.trim().is_empty()) {
        return Ok(Some(nickname.trim().to_string()));
    }
    loop {
        match rl.readline("nickname: ") {
            Ok(line) if line.trim().is_empty() => {
                println!("{}", "Please enter a nickname.".yellow());
            }
            Ok(line) => return Ok(Some(line.trim().to_string())),
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(None),
            Err(err) => return Err(err.into()),
        }
    }
}

fn render_event(event: ChatEvent) {
    match event {
        ChatEvent::StateChanged(TurnState::AwaitingModelResponse) => {
            print!("{} ", "AI:".bright_magenta());
            let _ = io::stdout().flush();
        }
        ChatEvent::StateChanged(_) => {}
        ChatEvent::Delta(text) => {
            print!("{}", text.bright_blue());
            let _ = io::stdout().flush();
        }
        ChatEvent::Warning(message) => eprintln!("{}", message.yellow()),
        ChatEvent::Progress {
            step,
            total,
            finished,
        } => {
            let status = if finished { "saved" } else { "working..." };
            println!("{}", format!("[{step}/{total}] {status}").bright_black());
        }
    }
}

fn print_retry(notice: &RetryNotice) {
    eprintln!("{}", notice.describe().yellow());
}

fn print_sessions(sessions: &[Session]) {
    if sessions.is_empty() {
        println!("{}", "No sessions yet.".bright_black());
        return;
    }
    for (index, session) in sessions.iter().enumerate() {
        println!(
            "{} {} {}",
            format!("{:>2}.", index + 1).bright_cyan(),
            format!(
                "{}-{} ({} messages)",
                session.start_time, session.end_time, session.message_count
            )
            .green(),
            session.first_message
        );
    }
}

fn print_help() {
    println!(
        "{}",
        "Type a message to chat. Commands: /sessions, /title <n>, /end, /help, quit".bright_black()
    );
}

async fn flush(workbook: &MemoryWorkbook) {
    if let Err(err) = workbook.flush().await {
        tracing::warn!(error = %err, "failed to save workbook");
        eprintln!("{}", "Could not save the workbook file.".red());
    }
}
