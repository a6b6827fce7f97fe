use thiserror::Error;

pub const COMMAND_NAMES: &[&str] = &[
    "help", "new", "list", "load", "rename", "title", "delete", "attach", "note", "docs",
    "remove", "key", "online", "offline", "history", "status", "quit",
];

const SUGGESTION_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    New,
    List,
    Load { id: String },
    Rename { id: String, title: String },
    Title { title: String },
    Delete { id: String },
    Attach { path: String },
    Note { name: String, content: String },
    Docs,
    /// 1-based position as shown by `/docs`.
    Remove { position: usize },
    Key { value: String },
    Online,
    Offline,
    History,
    Status,
    Quit,
    Send { content: String },
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum ParseCommandError {
    #[error("Unknown command '/{input}'. {}", unknown_hint(.suggestion))]
    Unknown { input: String, suggestion: Option<&'static str> },
    #[error("/{command} needs an argument. Usage: {usage}")]
    MissingArgument { command: &'static str, usage: &'static str },
    #[error("/{command}: {message}")]
    InvalidArgument { command: &'static str, message: String },
}

fn unknown_hint(suggestion: &Option<&'static str>) -> String {
    match suggestion {
        Some(s) => format!("Did you mean '/{}'?", s),
        None => "Type /help for a list of commands.".to_string(),
    }
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, ParseCommandError> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Send { content: line.to_string() });
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match name.to_lowercase().as_str() {
            "help" => Ok(Command::Help),
            "new" => Ok(Command::New),
            "list" => Ok(Command::List),
            "load" => Ok(Command::Load { id: required(arg, "load", "/load <id>")?.to_string() }),
            "rename" => {
                let arg = required(arg, "rename", "/rename <id> <title>")?;
                match arg.split_once(char::is_whitespace) {
                    Some((id, title)) if !title.trim().is_empty() =>
                        Ok(Command::Rename { id: id.to_string(), title: title.trim().to_string() }),
                    _ =>
                        Err(ParseCommandError::MissingArgument {
                            command: "rename",
                            usage: "/rename <id> <title>",
                        }),
                }
            }
            "title" => Ok(Command::Title { title: arg.to_string() }),
            "delete" => Ok(Command::Delete { id: required(arg, "delete", "/delete <id>")?.to_string() }),
            "attach" => Ok(Command::Attach { path: required(arg, "attach", "/attach <path>")?.to_string() }),
            "note" => {
                let arg = required(arg, "note", "/note <name> <text>")?;
                match arg.split_once(char::is_whitespace) {
                    Some((name, content)) if !content.trim().is_empty() =>
                        Ok(Command::Note { name: name.to_string(), content: content.trim().to_string() }),
                    _ =>
                        Err(ParseCommandError::MissingArgument {
                            command: "note",
                            usage: "/note <name> <text>",
                        }),
                }
            }
            "docs" => Ok(Command::Docs),
            "remove" => {
                let arg = required(arg, "remove", "/remove <number>")?;
                match arg.parse::<usize>() {
                    Ok(position) if position > 0 => Ok(Command::Remove { position }),
                    _ =>
                        Err(ParseCommandError::InvalidArgument {
                            command: "remove",
                            message: format!("'{}' is not a document number", arg),
                        }),
                }
            }
            "key" => Ok(Command::Key { value: required(arg, "key", "/key <api key>")?.to_string() }),
            "online" => Ok(Command::Online),
            "offline" => Ok(Command::Offline),
            "history" => Ok(Command::History),
            "status" => Ok(Command::Status),
            "quit" | "exit" => Ok(Command::Quit),
            other =>
                Err(ParseCommandError::Unknown {
                    input: other.to_string(),
                    suggestion: suggest_command(other),
                }),
        }
    }
}

fn required<'a>(
    arg: &'a str,
    command: &'static str,
    usage: &'static str
) -> Result<&'a str, ParseCommandError> {
    if arg.is_empty() {
        Err(ParseCommandError::MissingArgument { command, usage })
    } else {
        Ok(arg)
    }
}

pub fn suggest_command(input: &str) -> Option<&'static str> {
    let input = input.to_lowercase();
    COMMAND_NAMES.iter()
        .map(|name| (*name, strsim::jaro_winkler(&input, name)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_send() {
        assert_eq!(
            Command::parse("  What is X?  ").unwrap(),
            Command::Send { content: "What is X?".to_string() }
        );
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(Command::parse("/load 42").unwrap(), Command::Load { id: "42".to_string() });
        assert_eq!(
            Command::parse("/rename 42 My notes").unwrap(),
            Command::Rename { id: "42".to_string(), title: "My notes".to_string() }
        );
        assert_eq!(
            Command::parse("/note facts X is Y.").unwrap(),
            Command::Note { name: "facts".to_string(), content: "X is Y.".to_string() }
        );
        assert_eq!(Command::parse("/remove 2").unwrap(), Command::Remove { position: 2 });
        assert_eq!(Command::parse("/EXIT").unwrap(), Command::Quit);
    }

    #[test]
    fn test_missing_and_invalid_arguments() {
        assert!(matches!(
            Command::parse("/load"),
            Err(ParseCommandError::MissingArgument { command: "load", .. })
        ));
        assert!(matches!(
            Command::parse("/rename 42"),
            Err(ParseCommandError::MissingArgument { command: "rename", .. })
        ));
        assert!(matches!(
            Command::parse("/remove 0"),
            Err(ParseCommandError::InvalidArgument { command: "remove", .. })
        ));
    }

    #[test]
    fn test_unknown_command_suggests_closest() {
        let err = Command::parse("/hisotry").unwrap_err();
        assert_eq!(
            err,
            ParseCommandError::Unknown { input: "hisotry".to_string(), suggestion: Some("history") }
        );
        assert_eq!(err.to_string(), "Unknown command '/hisotry'. Did you mean '/history'?");
        assert_eq!(
            Command::parse("/zzzz").unwrap_err().to_string(),
            "Unknown command '/zzzz'. Type /help for a list of commands."
        );
        assert_eq!(
            Command::parse("/load").unwrap_err().to_string(),
            "/load needs an argument. Usage: /load <id>"
        );
    }

    #[test]
    fn test_unknown_command_without_suggestion() {
        let err = Command::parse("/zzzzzz").unwrap_err();
        assert_eq!(
            err,
            ParseCommandError::Unknown { input: "zzzzzz".to_string(), suggestion: None }
        );
    }
}
