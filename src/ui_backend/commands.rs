//! User Commands
//!
//! Defines the actions a line-oriented front end can request. Positions are
//! 1-based as shown to the user; the front end maps them to ids and indices.

use thiserror::Error;

/// User commands that can be executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // ========== Application Control ==========
    /// Quit the application
    Quit,

    /// Show the command list
    Help,

    // ========== Chat Management ==========
    /// Create a new empty chat and make it active
    NewChat,

    /// List chats, newest first
    ListChats,

    /// Switch to the chat at a list position
    SelectChat(usize),

    /// Rename the chat at a list position
    RenameChat { position: usize, title: String },

    // ========== Messages ==========
    /// Print the active chat's transcript
    ShowChat,

    /// Replace a user message of the active chat and regenerate from it
    EditMessage { position: usize, text: String },

    /// Send a prompt to the active chat
    SendMessage(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command: /{0} (try /help)")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

/// Help text listing every command
pub const HELP_TEXT: &str = "\
Commands:
  /new                 start a new chat
  /list                list chats (newest first)
  /select <n>          switch to chat n
  /rename <n> <title>  rename chat n
  /show                print the active chat
  /edit <i> <text>     replace your message i and regenerate
  /help                show this help
  /quit                exit
Anything else is sent as a prompt.";

/// Parse one input line.
///
/// Returns `Ok(None)` for a blank line.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::SendMessage(line.to_string())));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "quit" | "exit" | "q" => Command::Quit,
        "help" | "?" => Command::Help,
        "new" => Command::NewChat,
        "list" | "ls" => Command::ListChats,
        "show" => Command::ShowChat,
        "select" => {
            let position = parse_position(args).ok_or(CommandError::Usage("/select <n>"))?;
            Command::SelectChat(position)
        }
        "rename" => {
            let (position, title) =
                split_position(args).ok_or(CommandError::Usage("/rename <n> <title>"))?;
            Command::RenameChat {
                position,
                title: title.to_string(),
            }
        }
        "edit" => {
            let (position, text) =
                split_position(args).ok_or(CommandError::Usage("/edit <i> <text>"))?;
            Command::EditMessage {
                position,
                text: text.to_string(),
            }
        }
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(Some(command))
}

fn parse_position(s: &str) -> Option<usize> {
    s.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

/// Split `"<n> <rest>"`; the rest may be blank so the store can reject it
fn split_position(args: &str) -> Option<(usize, &str)> {
    let (n, rest) = match args.split_once(char::is_whitespace) {
        Some((n, rest)) => (n, rest.trim()),
        None => (args, ""),
    };
    Some((parse_position(n)?, rest))
}
