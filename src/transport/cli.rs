//! CLI transport for direct terminal interaction
//!
//! A line-oriented chat front end over [`ChatService`]. Events from the
//! service are rendered as they arrive: status text is redrawn in place and
//! revealed replies are printed as they grow.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::config::ClientConfig;
use crate::core::{GenerationBackend, Message, Role};
use crate::ui_backend::commands::{parse_command, Command, HELP_TEXT};
use crate::ui_backend::{AppEvent, ChatService, PendingGeneration, STATUS_MESSAGES};

use super::client::HttpBackend;

/// Erase the current terminal line and return the cursor to column 0
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Run interactive chat mode against the generation server
pub async fn run_chat(config: ClientConfig, initial_message: Option<String>) -> Result<()> {
    let backend: Arc<dyn GenerationBackend> = Arc::new(HttpBackend::new(&config.backend_url));
    tracing::debug!("Using generation server at {}", config.backend_url);

    println!("promptcode chat");
    println!("Server: {}", config.backend_url);
    println!("Type /help for commands, /quit to exit\n");

    let mut session = ChatSession::new(backend, &config, std::io::stdout());

    if let Some(msg) = initial_message {
        println!("> {}", msg);
        if !session.handle_line(&msg).await? {
            return Ok(());
        }
    }

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut buf = Vec::new();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = read_line_lossy(&mut stdin, &mut buf).await? else {
            println!();
            break;
        };
        if !session.handle_line(&line).await? {
            break;
        }
    }

    println!("Goodbye!");
    Ok(())
}

/// Read one line, replacing invalid UTF-8; `None` at end of input
async fn read_line_lossy<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(&buf[..]);
    if matches!(line, std::borrow::Cow::Owned(_)) {
        tracing::warn!("Input line was not valid UTF-8; invalid bytes replaced");
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// One chat session: the service, its event stream and an output sink
pub struct ChatSession<W: Write> {
    service: ChatService,
    events: mpsc::UnboundedReceiver<AppEvent>,
    renderer: TerminalRenderer,
    out: W,
}

impl<W: Write> ChatSession<W> {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: &ClientConfig, out: W) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let service = ChatService::with_options(backend, tx, config.timing(), config.model.clone());
        Self {
            service,
            events,
            renderer: TerminalRenderer::new(),
            out,
        }
    }

    pub fn service(&self) -> &ChatService {
        &self.service
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Handle one input line; returns `false` when the user asked to quit
    pub async fn handle_line(&mut self, line: &str) -> Result<bool> {
        match parse_command(line) {
            Ok(Some(command)) => self.execute(command).await,
            Ok(None) => Ok(true),
            Err(e) => {
                writeln!(self.out, "{}", e)?;
                Ok(true)
            }
        }
    }

    async fn execute(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Quit => return Ok(false),
            Command::Help => writeln!(self.out, "{}", HELP_TEXT)?,
            Command::NewChat => {
                self.service.create_chat();
                self.flush_events()?;
            }
            Command::ListChats => self.list_chats()?,
            Command::SelectChat(position) => self.select_chat(position)?,
            Command::RenameChat { position, title } => {
                let Some(id) = self.chat_at(position)? else {
                    return Ok(true);
                };
                match self.service.rename_chat(id, &title) {
                    Ok(_) => self.flush_events()?,
                    Err(e) => writeln!(self.out, "Error: {}", e)?,
                }
            }
            Command::ShowChat => self.show_chat()?,
            Command::EditMessage { position, text } => {
                let Some(chat_id) = self.service.state().read(|s| s.active_chat_id()) else {
                    writeln!(self.out, "No active chat")?;
                    return Ok(true);
                };
                let result = self.service.edit_message(chat_id, position - 1, &text);
                self.follow(result).await?;
            }
            Command::SendMessage(text) => {
                let result = self.service.send_prompt(&text);
                self.follow(result).await?;
            }
        }
        Ok(true)
    }

    /// Render events until the generation settles
    async fn follow(
        &mut self,
        result: Result<PendingGeneration, crate::core::ChatError>,
    ) -> Result<()> {
        let pending = match result {
            Ok(pending) => pending,
            Err(e) => {
                self.flush_events()?;
                writeln!(self.out, "Error: {}", e)?;
                return Ok(());
            }
        };

        let wait = pending.wait();
        tokio::pin!(wait);
        loop {
            tokio::select! {
                _ = &mut wait => break,
                Some(event) = self.events.recv() => self.render(&event)?,
            }
        }
        self.flush_events()
    }

    fn select_chat(&mut self, position: usize) -> Result<()> {
        let Some(id) = self.chat_at(position)? else {
            return Ok(());
        };
        match self.service.select_chat(id) {
            Ok(true) => {
                self.flush_events()?;
                self.show_chat()?;
            }
            Ok(false) => writeln!(self.out, "Cannot switch chats while a reply is generating")?,
            Err(e) => writeln!(self.out, "Error: {}", e)?,
        }
        Ok(())
    }

    fn list_chats(&mut self) -> Result<()> {
        let (chats, active) = self
            .service
            .state()
            .read(|s| (s.chats().to_vec(), s.active_chat_id()));
        if chats.is_empty() {
            writeln!(self.out, "No chats yet")?;
            return Ok(());
        }
        for (i, chat) in chats.iter().enumerate() {
            let marker = if Some(chat.id) == active { '*' } else { ' ' };
            writeln!(
                self.out,
                "{} {}. {} ({} messages, {})",
                marker,
                i + 1,
                chat.title,
                chat.messages.len(),
                chat.created_at.format("%Y-%m-%d %H:%M")
            )?;
        }
        Ok(())
    }

    fn show_chat(&mut self) -> Result<()> {
        let Some(chat) = self.service.state().active_chat() else {
            writeln!(self.out, "No active chat")?;
            return Ok(());
        };
        writeln!(self.out, "== {} ==", chat.title)?;
        for (i, message) in chat.messages.iter().enumerate() {
            writeln!(self.out, "[{}] {}", i + 1, format_message(message))?;
        }
        Ok(())
    }

    fn chat_at(&mut self, position: usize) -> Result<Option<crate::core::ChatId>> {
        let id = self
            .service
            .state()
            .read(|s| s.chats().get(position - 1).map(|c| c.id));
        if id.is_none() {
            writeln!(self.out, "No chat at position {}", position)?;
        }
        Ok(id)
    }

    fn flush_events(&mut self) -> Result<()> {
        while let Ok(event) = self.events.try_recv() {
            self.render(&event)?;
        }
        Ok(())
    }

    fn render(&mut self, event: &AppEvent) -> Result<()> {
        if let Some(text) = self.renderer.render(event) {
            write!(self.out, "{}", text)?;
            self.out.flush()?;
        }
        Ok(())
    }
}

fn format_message(message: &Message) -> String {
    let who = match message.role {
        Role::User => "You",
        Role::Bot => "Bot",
    };
    if message.is_typing {
        format!("{}: ...", who)
    } else {
        format!("{}: {}", who, message.content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Idle,
    Status,
    Reveal(String),
}

/// Turns `AppEvent`s into terminal output
#[derive(Debug)]
pub struct TerminalRenderer {
    line: Line,
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self { line: Line::Idle }
    }

    /// Text to write for `event`, if any
    pub fn render(&mut self, event: &AppEvent) -> Option<String> {
        match event {
            AppEvent::ChatCreated { chat_id, title } => {
                Some(format!("Started chat {}: {}\n", chat_id, title))
            }
            AppEvent::ChatRenamed { title, .. } => Some(format!("Chat title: {}\n", title)),
            AppEvent::MessagesTruncated { len, .. } => {
                Some(format!("(conversation cut back to message {})\n", len))
            }
            AppEvent::MessageAdded { message, .. } if message.role == Role::Bot => {
                self.line = Line::Status;
                Some(format!("{}...", CLEAR_LINE))
            }
            AppEvent::MessageUpdated { message, .. } => self.render_update(message),
            AppEvent::GenerationSettled { .. } => {
                self.line = Line::Idle;
                None
            }
            AppEvent::MessageAdded { .. }
            | AppEvent::ActiveChatChanged(_)
            | AppEvent::GenerationStarted { .. } => None,
        }
    }

    fn render_update(&mut self, message: &Message) -> Option<String> {
        if message.role == Role::User {
            return Some(format!("Edited: {}\n", message.content));
        }

        let content = message.content.as_str();
        let previous = std::mem::replace(&mut self.line, Line::Idle);

        if !message.is_typing {
            return Some(match previous {
                Line::Reveal(shown) if content.starts_with(&shown) => {
                    format!("{}\n", &content[shown.len()..])
                }
                _ => format!("{}{}\n", CLEAR_LINE, content),
            });
        }

        if previous == Line::Status && STATUS_MESSAGES.contains(&content) {
            self.line = Line::Status;
            return Some(format!("{}{}", CLEAR_LINE, content));
        }

        let text = match &previous {
            Line::Reveal(shown) if content.starts_with(shown.as_str()) => {
                content[shown.len()..].to_string()
            }
            _ => format!("{}{}", CLEAR_LINE, content),
        };
        self.line = Line::Reveal(content.to_string());
        Some(text)
    }
}
