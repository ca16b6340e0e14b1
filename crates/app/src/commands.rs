//! Parsing of REPL input lines.
//!
//! Anything not starting with `/` is a chat message. Configuration commands
//! (`/admin`, `/persona`, `/docs`) are only honored once the panel is
//! unlocked; the REPL decides that, the parser does not.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Help,
    History,
    Quit,
    /// `/admin`: open or close the configuration panel
    TogglePanel,
    ShowPersona,
    /// `/persona set <text>`: replace the whole persona
    SetPersona(String),
    ListDocs,
    AddDocs(Vec<PathBuf>),
    RemoveDoc(String),
    Unknown(String),
}

impl Command {
    /// Commands that need the configuration panel
    pub fn needs_panel(&self) -> bool {
        matches!(
            self,
            Command::ShowPersona
                | Command::SetPersona(_)
                | Command::ListDocs
                | Command::AddDocs(_)
                | Command::RemoveDoc(_)
        )
    }
}

pub fn parse(line: &str) -> Command {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Send(line.to_string());
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    match (name, args) {
        ("help", _) => Command::Help,
        ("history", _) => Command::History,
        ("quit" | "exit", _) => Command::Quit,
        ("admin", _) => Command::TogglePanel,
        ("persona", "") => Command::ShowPersona,
        ("persona", args) => match args.split_once(char::is_whitespace) {
            Some(("set", text)) => Command::SetPersona(text.trim().to_string()),
            _ => Command::Unknown(line.to_string()),
        },
        ("docs", "") => Command::ListDocs,
        ("docs", args) => match args.split_once(char::is_whitespace) {
            Some(("add", paths)) => {
                Command::AddDocs(paths.split_whitespace().map(PathBuf::from).collect())
            }
            Some(("rm", id)) => Command::RemoveDoc(id.trim().to_string()),
            _ => Command::Unknown(line.to_string()),
        },
        _ => Command::Unknown(line.to_string()),
    }
}

pub const HELP: &str = "Type a message and press Enter to chat.
  /history          show the conversation so far
  /quit             leave";

pub const PANEL_HELP: &str = "Configuration panel:
  /admin            open or close the panel
  /persona          show the persona prompt
  /persona set TEXT replace the persona prompt
  /docs             list knowledge documents
  /docs add PATH..  upload .txt documents
  /docs rm ID       remove a document";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_sent_trimmed() {
        assert_eq!(parse("  Is there a pool?  "), Command::Send("Is there a pool?".into()));
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("/help"), Command::Help);
        assert_eq!(parse("/exit"), Command::Quit);
        assert_eq!(parse("/admin"), Command::TogglePanel);
        assert_eq!(parse("/docs"), Command::ListDocs);
        assert_eq!(parse("/persona"), Command::ShowPersona);
    }

    #[test]
    fn test_persona_set_keeps_whole_text() {
        assert_eq!(
            parse("/persona set You are Rosa.  Be warm."),
            Command::SetPersona("You are Rosa.  Be warm.".into())
        );
    }

    #[test]
    fn test_docs_subcommands() {
        assert_eq!(
            parse("/docs add rules.txt prices.txt"),
            Command::AddDocs(vec![PathBuf::from("rules.txt"), PathBuf::from("prices.txt")])
        );
        assert_eq!(parse("/docs rm a1b2c3d4e"), Command::RemoveDoc("a1b2c3d4e".into()));
        assert!(matches!(parse("/docs wipe"), Command::Unknown(_)));
    }

    #[test]
    fn test_panel_commands() {
        assert!(parse("/docs").needs_panel());
        assert!(!parse("/admin").needs_panel());
        assert!(!parse("hello").needs_panel());
    }
}
