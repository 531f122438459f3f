mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use client::config::{AiConfig, ClientConfig, ConfigError};
use client::net::ai::{AiError, GeminiClient, GenerateText};
use client::net::run::{self, CodeRunner, ExecuteResponse, ExecutionClient, RunError, RunJob};
use client::net::transport::{ReconnectPolicy, Transport, TransportError};
use client::state::files::Node;
use client::state::editor::SuggestionRequest;
use client::state::session::{JoinForm, SessionStatus, generate_room_id};
use client::store::{Notice, SessionStore, StoreError};
use frames::model::{DrawingData, FileId, RemoteUser, UserStatus};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use commands::Input;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("relay health check failed with HTTP {0}")]
    Unhealthy(u16),
    #[error("no such file or directory: {0}")]
    NotFound(String),
    #[error("could not join the room")]
    JoinRejected,
    #[error("lost connection to the relay")]
    ConnectionFailed,
}

#[derive(Parser, Debug)]
#[command(name = "collab", about = "Collaborative coding session client")]
struct Cli {
    #[arg(long, env = "COLLAB_RELAY_URL")]
    relay_url: Option<String>,

    #[arg(long, env = "COLLAB_EXECUTION_URL")]
    execution_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the relay is up.
    Ping,
    /// List who is in a room without joining it.
    Who {
        #[arg(long)]
        room: String,
    },
    /// Join a room and edit interactively.
    Join {
        #[arg(long)]
        username: String,
        /// Room to join; a fresh one is created when omitted.
        #[arg(long)]
        room: Option<String>,
        /// Disable AI suggestions even when a key is configured.
        #[arg(long, default_value_t = false)]
        no_ai: bool,
    },
    /// List runtimes offered by the execution service.
    Runtimes,
    /// Execute a local file on the execution service.
    Run {
        path: PathBuf,
        #[arg(long, default_value = "")]
        stdin: String,
    },
}

enum Flow {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.relay_url {
        config.relay_url = url;
    }
    if let Some(url) = cli.execution_url {
        config.execution_url = url.trim_end_matches('/').to_owned();
    }

    match cli.command {
        Command::Ping => run_ping(&config).await,
        Command::Who { room } => run_who(&config, &room).await,
        Command::Join { username, room, no_ai } => run_join(&config, username, room, no_ai).await,
        Command::Runtimes => run_runtimes(&config).await,
        Command::Run { path, stdin } => run_file(&config, &path, &stdin).await,
    }
}

async fn run_ping(config: &ClientConfig) -> Result<(), CliError> {
    let url = commands::http_url(&config.relay_url, "/healthz");
    let response = reqwest::Client::new().get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::Unhealthy(status.as_u16()));
    }
    println!("ok");
    Ok(())
}

async fn run_who(config: &ClientConfig, room: &str) -> Result<(), CliError> {
    let url = commands::http_url(&config.relay_url, &format!("/rooms/{room}/users"));
    let response = reqwest::Client::new().get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::Unhealthy(status.as_u16()));
    }
    let users: Vec<RemoteUser> = response.json().await?;
    if users.is_empty() {
        println!("nobody in {room}");
    }
    for user in users {
        let status = match user.status {
            UserStatus::Online => "online",
            UserStatus::Offline => "away",
        };
        println!("{} [{status}]", user.username);
    }
    Ok(())
}

async fn run_runtimes(config: &ClientConfig) -> Result<(), CliError> {
    let runner = ExecutionClient::new(&config.execution_url)?;
    for language in runner.runtimes().await? {
        if language.aliases.is_empty() {
            println!("{} {}", language.language, language.version);
        } else {
            println!("{} {} ({})", language.language, language.version, language.aliases.join(", "));
        }
    }
    Ok(())
}

async fn run_file(config: &ClientConfig, path: &std::path::Path, stdin: &str) -> Result<(), CliError> {
    let code = tokio::fs::read_to_string(path).await?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CliError::NotFound(path.display().to_string()))?;

    let runner = ExecutionClient::new(&config.execution_url)?;
    let job = RunJob { file_name: file_name.to_owned(), code, stdin: stdin.to_owned(), language: None };
    let response = job.run(&runner).await?;
    if response.is_error() {
        eprint!("{}", response.output());
    } else {
        print!("{}", response.output());
    }
    Ok(())
}

// =============================================================================
// JOIN / REPL
// =============================================================================

fn suggestion_client(no_ai: bool) -> Result<Option<Arc<dyn GenerateText>>, CliError> {
    if no_ai {
        return Ok(None);
    }
    match AiConfig::from_env() {
        Ok(config) => {
            let client = GeminiClient::new(&config)?;
            info!(model = client.model(), "AI suggestions enabled");
            Ok(Some(Arc::new(client)))
        }
        Err(e) => {
            info!(error = %e, "AI suggestions disabled");
            Ok(None)
        }
    }
}

/// Work finished off the REPL task.
enum Background {
    Suggestion(FileId, Result<String, AiError>),
    Ran(Result<ExecuteResponse, RunError>),
    Picked(Result<String, RunError>),
}

/// Spawns slow requests so the REPL keeps handling frames and timers.
struct Jobs {
    runner: Arc<ExecutionClient>,
    ai: Option<Arc<dyn GenerateText>>,
    done: mpsc::UnboundedSender<Background>,
}

impl Jobs {
    fn suggest(&self, request: SuggestionRequest) {
        let Some(ai) = self.ai.as_ref().map(Arc::clone) else {
            return;
        };
        let done = self.done.clone();
        tokio::spawn(async move {
            let result = ai.generate(&request.prompt).await;
            let _ = done.send(Background::Suggestion(request.file_id, result));
        });
    }

    fn run(&self, job: RunJob) {
        let runner = Arc::clone(&self.runner);
        let done = self.done.clone();
        tokio::spawn(async move {
            let result = job.run(&*runner).await;
            let _ = done.send(Background::Ran(result));
        });
    }

    fn pick_language(&self, name: String) {
        let runner = Arc::clone(&self.runner);
        let done = self.done.clone();
        tokio::spawn(async move {
            let picked = runner.runtimes().await.and_then(|languages| {
                run::find_language(&languages, &name)
                    .map(run::encode_selection)
                    .ok_or(RunError::NoLanguage { file_name: name })
            });
            let _ = done.send(Background::Picked(picked));
        });
    }
}

fn finish_background(store: &mut SessionStore, done: Background) {
    match done {
        Background::Suggestion(file_id, result) => store.finish_suggestion(&file_id, result),
        Background::Ran(Ok(response)) => {
            if response.is_error() {
                eprintln!("{}", response.output());
            } else {
                println!("{}", response.output());
            }
        }
        Background::Picked(Ok(selection)) => match store.choose_language(Some(selection.as_str())) {
            Ok(Some(language)) => println!("running with {} {}", language.language, language.version),
            Ok(None) => {}
            Err(e) => eprintln!("error: {e}"),
        },
        Background::Ran(Err(e)) | Background::Picked(Err(e)) => eprintln!("error: {e}"),
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn run_join(config: &ClientConfig, username: String, room: Option<String>, no_ai: bool) -> Result<(), CliError> {
    let room_id = room.unwrap_or_else(|| {
        let id = generate_room_id();
        println!("created room {id}");
        id
    });
    let ai = suggestion_client(no_ai)?;
    let runner = Arc::new(ExecutionClient::new(&config.execution_url)?);
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let jobs = Jobs { runner, ai, done: done_tx };

    let mut store = SessionStore::new(jobs.ai.is_some());
    store.submit_join(&JoinForm::new(username, room_id))?;

    let policy = ReconnectPolicy::new(config.reconnect_attempts);
    let (transport, mut events) = Transport::spawn(config.relay_url.clone(), policy);
    store.flush_to(&transport)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let outcome = loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break Ok(()) };
                if let Err(e) = store.handle_transport_event(event) {
                    warn!(error = %e, "inbound event rejected");
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    let _ = store.leave();
                    break Ok(());
                };
                match commands::parse_input(&line) {
                    Ok(input) => match apply_input(&mut store, &jobs, input) {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Quit) => break Ok(()),
                        Err(e) => eprintln!("error: {e}"),
                    },
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            Some(done) = done_rx.recv() => finish_background(&mut store, done),
            () = wait_for(store.next_deadline()) => {
                if let Some(request) = store.poll_timers(Instant::now()) {
                    jobs.suggest(request);
                }
            }
        }

        for notice in store.take_notices() {
            let rejected = matches!(notice, Notice::UsernameTaken | Notice::RelayError { .. });
            if let Some(line) = commands::render_notice(&notice) {
                if rejected { eprintln!("{line}") } else { println!("{line}") }
            }
        }
        match store.status() {
            SessionStatus::Initial => break Err(CliError::JoinRejected),
            SessionStatus::ConnectionFailed => break Err(CliError::ConnectionFailed),
            _ => {}
        }
        store.flush_to(&transport)?;
    };

    let _ = transport.disconnect();
    outcome
}

fn apply_input(store: &mut SessionStore, jobs: &Jobs, input: Input) -> Result<Flow, CliError> {
    match input {
        Input::Empty => {}
        Input::Help => println!("{}", commands::HELP),
        Input::Chat(text) => {
            let message = store.send_chat(&text)?;
            if let Some(line) = commands::render_notice(&Notice::Message(message)) {
                println!("{line}");
            }
        }
        Input::Mkdir(path) => {
            let (parent, name) = commands::split_path(&path);
            let parent = resolve(store, parent)?;
            store.create_directory(&parent, name)?;
        }
        Input::Touch(path) => {
            let (parent, name) = commands::split_path(&path);
            let parent = resolve(store, parent)?;
            let id = store.create_file(&parent, name)?;
            store.open_file(&id);
        }
        Input::Open(path) => {
            let id = resolve(store, &path)?;
            if !store.open_file(&id) {
                return Err(CliError::NotFound(path));
            }
        }
        Input::Close(path) => {
            let id = resolve(store, &path)?;
            store.close_file(&id);
        }
        Input::Write(text) => {
            let cursor = text.chars().count();
            store.type_into_active(&text, cursor, Instant::now())?;
        }
        Input::Move { path, name } => {
            let id = resolve(store, &path)?;
            if store.files().get(&id).is_some_and(Node::is_directory) {
                store.rename_directory(&id, &name)?;
            } else {
                store.rename_file(&id, &name)?;
            }
        }
        Input::Remove(path) => {
            let id = resolve(store, &path)?;
            if store.files().get(&id).is_some_and(Node::is_directory) {
                store.delete_directory(&id)?;
            } else {
                store.delete_file(&id)?;
            }
        }
        Input::Tree => print!("{}", commands::render_tree(store.files())),
        Input::Cat => {
            let node = store.files().active_node().ok_or(StoreError::NoActiveFile)?;
            println!("{}", node.content().unwrap_or_default());
        }
        Input::Users => {
            let me = store.session().current_user().map(|u| u.username.as_str()).unwrap_or_default();
            print!("{}", commands::render_users(store.presence(), me));
        }
        Input::Run { stdin } => jobs.run(store.run_job(&stdin)?),
        Input::Lang(Some(name)) => jobs.pick_language(name),
        Input::Lang(None) => {
            store.choose_language(None)?;
            println!("language follows the file extension");
        }
        Input::Accept => {
            if !store.accept_suggestion()? {
                println!("no suggestion ready");
            }
        }
        Input::Dismiss => store.dismiss_suggestion(),
        Input::Draw(value) => store.update_drawing(DrawingData(value))?,
        Input::Away => store.set_online(false)?,
        Input::Back => store.set_online(true)?,
        Input::Leave => {
            store.leave()?;
            return Ok(Flow::Quit);
        }
    }
    Ok(Flow::Continue)
}

fn resolve(store: &SessionStore, path: &str) -> Result<FileId, CliError> {
    commands::resolve(store.files(), path).ok_or_else(|| CliError::NotFound(path.to_owned()))
}
