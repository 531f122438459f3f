//! REPL input parsing and plain-text rendering of session state.

#[cfg(test)]
#[path = "commands_test.rs"]
mod commands_test;

use client::state::files::FileTree;
use client::state::presence::Presence;
use client::store::Notice;
use frames::model::{FileId, UserStatus};
use serde_json::Value;

pub const HELP: &str = "\
commands:
  /mkdir <path>         create a directory, e.g. /mkdir src
  /touch <path>         create a file, e.g. /touch src/main.js
  /open <path>          open a file and make it active
  /close <path>         close an open file
  /write <text>         replace the active file (\\n for newlines)
  /mv <path> <name>     rename a file or directory
  /rm <path>            delete a file or directory
  /tree                 show the file tree
  /cat                  show the active file
  /users                show who is in the room
  /run [stdin]          execute the active file
  /lang [name]          run with this language; no name picks by extension
  /accept | /dismiss    accept or drop the AI suggestion
  /draw <json>          replace the shared drawing
  /away | /back         toggle online status
  /leave                leave the room and exit
  anything else         send as chat";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command /{0}; try /help")]
    UnknownCommand(String),

    #[error("/{command} needs {argument}")]
    MissingArgument { command: &'static str, argument: &'static str },

    #[error("drawing is not valid JSON: {0}")]
    InvalidDrawing(String),
}

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Empty,
    Chat(String),
    Mkdir(String),
    Touch(String),
    Open(String),
    Close(String),
    Write(String),
    Move { path: String, name: String },
    Remove(String),
    Tree,
    Cat,
    Users,
    Run { stdin: String },
    Lang(Option<String>),
    Accept,
    Dismiss,
    Draw(Value),
    Away,
    Back,
    Leave,
    Help,
}

/// # Errors
///
/// Returns [`ParseError`] for unknown commands or missing arguments.
pub fn parse_input(line: &str) -> Result<Input, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Empty);
    }
    let Some(command_line) = line.strip_prefix('/') else {
        return Ok(Input::Chat(line.to_owned()));
    };

    let (command, rest) = command_line
        .split_once(char::is_whitespace)
        .map_or((command_line, ""), |(c, r)| (c, r.trim()));

    match command {
        "mkdir" => required(rest, "mkdir", "a path").map(Input::Mkdir),
        "touch" => required(rest, "touch", "a path").map(Input::Touch),
        "open" => required(rest, "open", "a path").map(Input::Open),
        "close" => required(rest, "close", "a path").map(Input::Close),
        "write" => Ok(Input::Write(unescape(rest))),
        "mv" => {
            let (path, name) = rest
                .split_once(char::is_whitespace)
                .map(|(p, n)| (p.trim(), n.trim()))
                .filter(|(p, n)| !p.is_empty() && !n.is_empty())
                .ok_or(ParseError::MissingArgument { command: "mv", argument: "a path and a new name" })?;
            Ok(Input::Move { path: path.to_owned(), name: name.to_owned() })
        }
        "rm" => required(rest, "rm", "a path").map(Input::Remove),
        "tree" => Ok(Input::Tree),
        "cat" => Ok(Input::Cat),
        "users" => Ok(Input::Users),
        "run" => Ok(Input::Run { stdin: unescape(rest) }),
        "lang" => Ok(Input::Lang(Some(rest.to_owned()).filter(|name| !name.is_empty()))),
        "accept" => Ok(Input::Accept),
        "dismiss" => Ok(Input::Dismiss),
        "draw" => {
            let raw = required(rest, "draw", "a JSON value")?;
            serde_json::from_str(&raw)
                .map(Input::Draw)
                .map_err(|e| ParseError::InvalidDrawing(e.to_string()))
        }
        "away" => Ok(Input::Away),
        "back" => Ok(Input::Back),
        "leave" | "quit" => Ok(Input::Leave),
        "help" => Ok(Input::Help),
        other => Err(ParseError::UnknownCommand(other.to_owned())),
    }
}

fn required(rest: &str, command: &'static str, argument: &'static str) -> Result<String, ParseError> {
    if rest.is_empty() {
        Err(ParseError::MissingArgument { command, argument })
    } else {
        Ok(rest.to_owned())
    }
}

fn unescape(raw: &str) -> String {
    raw.replace("\\n", "\n").replace("\\t", "\t")
}

/// HTTP endpoint next to a relay websocket URL:
/// `ws://host:3001/ws` with `/healthz` gives `http://host:3001/healthz`.
#[must_use]
pub fn http_url(relay_url: &str, path: &str) -> String {
    let base = relay_url.trim_end_matches('/');
    let base = base.strip_suffix("/ws").unwrap_or(base);
    let base = if let Some(rest) = base.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if let Some(rest) = base.strip_prefix("ws://") {
        format!("http://{rest}")
    } else {
        base.to_owned()
    };
    format!("{base}{path}")
}

/// Split a root-relative path into its parent path and final name.
/// `src/a.js` gives `("src", "a.js")`; `a.js` gives `("", "a.js")`.
#[must_use]
pub fn split_path(path: &str) -> (&str, &str) {
    let path = path.trim_matches('/');
    path.rsplit_once('/').unwrap_or(("", path))
}

/// Resolve a root-relative path such as `src/a.js`.
#[must_use]
pub fn resolve(tree: &FileTree, path: &str) -> Option<FileId> {
    let root = tree.get(tree.root_id())?;
    let path = path.trim_matches('/');
    if path.is_empty() {
        return Some(tree.root_id().clone());
    }
    tree.resolve_path(&format!("{}/{path}", root.name))
}

/// Indented tree listing, directories first. The active file is starred.
#[must_use]
pub fn render_tree(tree: &FileTree) -> String {
    let mut out = String::new();
    render_children(tree, tree.root_id(), 0, &mut out);
    if out.is_empty() {
        out.push_str("(empty)\n");
    }
    out
}

fn render_children(tree: &FileTree, id: &FileId, depth: usize, out: &mut String) {
    for child in tree.sorted_children(id) {
        let indent = "  ".repeat(depth);
        if child.is_directory() {
            out.push_str(&format!("{indent}{}/\n", child.name));
            render_children(tree, &child.id, depth + 1, out);
        } else {
            let marker = if tree.active_file() == Some(&child.id) { " *" } else { "" };
            out.push_str(&format!("{indent}{}{marker}\n", child.name));
        }
    }
}

/// One line per roster entry.
#[must_use]
pub fn render_users(presence: &Presence, me: &str) -> String {
    presence
        .users()
        .iter()
        .map(|user| {
            let status = match user.status {
                UserStatus::Online => "online",
                UserStatus::Offline => "away",
            };
            let you = if user.username == me { " (you)" } else { "" };
            let typing = if user.typing { ", typing" } else { "" };
            format!("{}{you} [{status}{typing}]\n", user.username)
        })
        .collect()
}

/// Terminal line for a store notice, if it is worth showing.
#[must_use]
pub fn render_notice(notice: &Notice) -> Option<String> {
    let line = match notice {
        Notice::Joined { users } => format!("joined; {users} user(s) in the room"),
        Notice::Rejoined => "reconnected".to_owned(),
        Notice::UsernameTaken => "The username already exists. Please choose another.".to_owned(),
        Notice::ConnectionLost { attempt } => format!("connection lost; reconnecting (attempt {attempt})"),
        Notice::ConnectionFailed { reason } => format!("connection failed: {reason}"),
        Notice::PeerJoined { username } => format!("{username} joined the room"),
        Notice::PeerLeft { username } => format!("{username} left the room"),
        Notice::TreeSynced => "file tree synced".to_owned(),
        Notice::DrawingSynced => return None,
        Notice::Message(message) => format!("[{}] {}: {}", message.timestamp, message.username, message.message),
        Notice::SuggestionReady { .. } => "suggestion ready; /accept to apply".to_owned(),
        Notice::SuggestionFailed { message } => format!("suggestion failed: {message}"),
        Notice::RelayError { code, message } => format!("relay error {code}: {message}"),
    };
    Some(line)
}

