mod render;

use std::sync::Arc;

use chat_client::{
    ChatSession, ClientConfig, ClientError, HistorySource, HttpHistory, Identity, SessionDeps, SessionEvent,
    SessionHandle, WsConnector, spawn_session,
};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::render::{TerminalView, format_message};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned HTTP {0}")]
    Status(u16),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("stdin read failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "vapechat-cli", about = "Terminal client for the site's live chat")]
struct Cli {
    #[arg(long, env = "VAPECHAT_BASE_URL", default_value = chat_client::config::DEFAULT_BASE_URL)]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check `/healthz`.
    Ping,
    /// Print the recent message log.
    History,
    /// Join the room and chat from stdin.
    Chat(ChatArgs),
}

#[derive(Args, Debug)]
struct ChatArgs {
    /// Sign in as this site user id; omit to chat as a guest.
    #[arg(long, env = "VAPECHAT_USER_ID")]
    user_id: Option<i64>,

    #[arg(long, env = "VAPECHAT_NICK_NAME")]
    nick_name: Option<String>,

    #[arg(long)]
    display_name: Option<String>,

    /// Start with the panel closed (only unread counts are shown).
    #[arg(long, default_value_t = false)]
    closed: bool,

    /// Accept the chat rules up front.
    #[arg(long, default_value_t = false)]
    agree: bool,
}

/// A parsed stdin line.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Say(String),
    Open,
    Close,
    Agree,
    Latest,
    Retry,
    Login(Identity),
    Logout,
    Quit,
    Unknown(String),
}

const HELP: &str = "commands: /open /close /agree /latest /retry /login <id> [nick] /logout /quit";

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::new(cli.base_url);

    match cli.command {
        Command::Ping => run_ping(&config).await,
        Command::History => run_history(&config).await,
        Command::Chat(args) => run_chat(config, args).await,
    }
}

async fn run_ping(config: &ClientConfig) -> Result<(), CliError> {
    let url = format!("{}/healthz", config.base_url);
    let status = reqwest::get(url).await?.status();
    if !status.is_success() {
        return Err(CliError::Status(status.as_u16()));
    }
    println!("ok");
    Ok(())
}

async fn run_history(config: &ClientConfig) -> Result<(), CliError> {
    let messages = HttpHistory::new(config)?.fetch().await?;
    for message in &messages {
        println!("{}", format_message(message));
    }
    Ok(())
}

async fn run_chat(config: ClientConfig, args: ChatArgs) -> Result<(), CliError> {
    let deps = SessionDeps {
        connector: Arc::new(WsConnector::new(config.clone())),
        history: Arc::new(HttpHistory::new(&config)?),
    };
    let session = match args.user_id {
        Some(user_id) => ChatSession::with_identity(identity(user_id, args.nick_name, args.display_name)),
        None => ChatSession::new(),
    };
    info!(base_url = %config.base_url, user_id = ?args.user_id, "cli: starting chat session");
    let (handle, mut views) = spawn_session(session, deps);

    if !args.closed {
        handle.send(SessionEvent::SetOpen(true)).await;
    }
    if args.agree {
        handle.send(SessionEvent::AgreeToTerms).await;
    }
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut term = TerminalView::new();
    loop {
        tokio::select! {
            command = views.recv() => {
                let Some(command) = command else { break };
                for line in term.apply(&command) {
                    println!("{line}");
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !dispatch(&handle, parse_input(&line)).await {
                    break;
                }
            }
        }
    }

    handle.unmount().await;
    info!("cli: chat session closed");
    Ok(())
}

/// Forward one input to the session. Returns `false` to quit.
async fn dispatch(handle: &SessionHandle, input: Input) -> bool {
    debug!(?input, "cli: input");
    let events = match input {
        Input::Say(text) => vec![SessionEvent::InputChanged(text), SessionEvent::Submit],
        Input::Open => vec![SessionEvent::SetOpen(true)],
        Input::Close => vec![SessionEvent::SetOpen(false)],
        Input::Agree => vec![SessionEvent::AgreeToTerms],
        Input::Latest => vec![SessionEvent::JumpToLatest],
        Input::Retry => vec![SessionEvent::Submit],
        Input::Login(identity) => vec![SessionEvent::IdentityChanged(Some(identity))],
        Input::Logout => vec![SessionEvent::IdentityChanged(None)],
        Input::Quit => return false,
        Input::Unknown(command) => {
            println!("unknown command {command}; {HELP}");
            return true;
        }
    };
    for event in events {
        if !handle.send(event).await {
            return false;
        }
    }
    true
}

fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return Input::Say(line.to_owned());
    };
    let mut parts = command.split_whitespace();
    match parts.next().unwrap_or_default() {
        "open" => Input::Open,
        "close" => Input::Close,
        "agree" => Input::Agree,
        "latest" => Input::Latest,
        "retry" => Input::Retry,
        "logout" => Input::Logout,
        "quit" | "exit" => Input::Quit,
        "login" => match parts.next().and_then(|id| id.parse().ok()) {
            Some(user_id) => Input::Login(identity(user_id, parts.next().map(ToOwned::to_owned), None)),
            None => Input::Unknown(trimmed.to_owned()),
        },
        _ => Input::Unknown(trimmed.to_owned()),
    }
}

fn identity(user_id: i64, nick_name: Option<String>, display_name: Option<String>) -> Identity {
    Identity { user_id, nick_name, display_name }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
