//! Terminal front-end state: the chat session, the configuration panel and
//! the output the transcript is rendered to.

use crate::commands::{self, Command, HELP, PANEL_HELP};
use anyhow::Result;
use assistant::{AdminPanel, ChatSession, TurnOutcome};
use shared::chat::Role;
use shared::events::TurnEvent;
use std::io::Write;
use std::path::PathBuf;

const BUSY_TEXT: &str = "generating response...";
const CLEAR_LINE: &str = "\r\x1b[2K";

pub struct AppState<W: Write> {
    pub chat: ChatSession,
    pub panel: AdminPanel,
    out: W,
}

impl<W: Write> AppState<W> {
    pub fn new(chat: ChatSession, panel: AdminPanel, out: W) -> Self {
        Self { chat, panel, out }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn print_greeting(&mut self) -> Result<()> {
        if let Some(greeting) = self.chat.conversation().messages().first() {
            writeln!(self.out, "{}: {}\n", greeting.role.display_name(), greeting.text)?;
        }
        if self.panel.is_authorized() {
            writeln!(self.out, "(configuration panel available: /admin)\n")?;
        }
        Ok(())
    }

    pub fn prompt(&mut self) -> Result<()> {
        write!(self.out, "> ")?;
        self.out.flush()?;
        Ok(())
    }

    /// Handle one input line. Returns false when the user wants to quit.
    pub async fn handle_line(&mut self, line: &str) -> Result<bool> {
        let command = commands::parse(line);

        if command.needs_panel() && !self.panel.is_open() {
            if self.panel.is_authorized() {
                writeln!(self.out, "Open the configuration panel first with /admin.")?;
            } else {
                writeln!(self.out, "Unknown command: {}", line.trim())?;
            }
            return Ok(true);
        }

        match command {
            Command::Send(text) => {
                self.send(&text).await?;
            }
            Command::Help => {
                writeln!(self.out, "{}", HELP)?;
                if self.panel.is_authorized() {
                    writeln!(self.out, "{}", PANEL_HELP)?;
                }
            }
            Command::History => self.print_history()?,
            Command::Quit => return Ok(false),
            Command::TogglePanel if self.panel.is_authorized() => {
                let open = self.panel.toggle();
                writeln!(
                    self.out,
                    "Configuration panel {}.",
                    if open { "open" } else { "closed" }
                )?;
            }
            Command::TogglePanel => writeln!(self.out, "Unknown command: {}", line.trim())?,
            Command::ShowPersona => {
                writeln!(self.out, "{}", self.chat.persona().text())?;
            }
            Command::SetPersona(text) => {
                self.chat.set_persona(text);
                writeln!(self.out, "Persona updated.")?;
            }
            Command::ListDocs => self.print_documents()?,
            Command::AddDocs(paths) => self.upload(&paths).await?,
            Command::RemoveDoc(id) => match self.chat.knowledge_mut().remove(&id) {
                Some(doc) => writeln!(self.out, "Removed {}.", doc.name)?,
                None => writeln!(self.out, "No document with id {}.", id)?,
            },
            Command::Unknown(text) => writeln!(self.out, "Unknown command: {}", text)?,
        }
        Ok(true)
    }

    /// Send a chat message and render the reply as it streams in.
    pub async fn send(&mut self, text: &str) -> Result<TurnOutcome> {
        let out = &mut self.out;
        let label = Role::Model.display_name();
        let mut streaming = false;

        let outcome = self
            .chat
            .submit(text, |conversation, event| {
                match event {
                    TurnEvent::Started { .. } => {
                        let _ = write!(out, "{}: {}", label, BUSY_TEXT);
                    }
                    TurnEvent::Increment { delta, .. } => {
                        if !streaming {
                            let _ = write!(out, "{}{}: ", CLEAR_LINE, label);
                            streaming = true;
                        }
                        let _ = write!(out, "{}", delta);
                    }
                    TurnEvent::Completed { .. } => {}
                    TurnEvent::Failed { .. } => {
                        let apology = conversation
                            .get(event.message_id())
                            .map(|m| m.text.as_str())
                            .unwrap_or_default();
                        if streaming {
                            let _ = writeln!(out);
                        } else {
                            let _ = write!(out, "{}", CLEAR_LINE);
                        }
                        let _ = write!(out, "{}: {}", label, apology);
                    }
                }
                if event.is_terminal() {
                    let _ = writeln!(out);
                }
                let _ = out.flush();
            })
            .await;

        if let Some(id) = outcome.message_id() {
            tracing::debug!(message_id = %id, "turn rendered");
            writeln!(self.out)?;
        }
        Ok(outcome)
    }

    /// Upload documents; each rejected file gets its own notice.
    pub async fn upload(&mut self, paths: &[PathBuf]) -> Result<()> {
        let report = self.chat.knowledge_mut().ingest(paths).await;
        for doc in &report.added {
            writeln!(self.out, "Added {} ({}).", doc.name, doc.formatted_size())?;
        }
        for notice in report.notices() {
            writeln!(self.out, "! {}", notice)?;
        }
        Ok(())
    }

    fn print_history(&mut self) -> Result<()> {
        for message in self.chat.conversation().messages() {
            writeln!(
                self.out,
                "[{}] {}: {}",
                message.formatted_time(),
                message.role.display_name(),
                message.text
            )?;
        }
        Ok(())
    }

    fn print_documents(&mut self) -> Result<()> {
        let knowledge = self.chat.knowledge();
        if knowledge.is_empty() {
            writeln!(self.out, "No knowledge documents.")?;
            return Ok(());
        }
        for doc in knowledge.documents() {
            writeln!(self.out, "{}  {}  {}", doc.id, doc.name, doc.formatted_size())?;
        }
        writeln!(
            self.out,
            "{} document(s), {}",
            knowledge.len(),
            shared::knowledge::format_size(knowledge.total_bytes())
        )?;
        Ok(())
    }
}
