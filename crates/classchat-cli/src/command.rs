/// One line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Plain text: a chat turn.
    Chat(String),
    /// `/sessions`: refresh and list the sessions of the student's log.
    Sessions,
    /// `/title <n>`: generate and save a title for session `n` (1-based).
    Title(usize),
    /// `/end`: end-of-session evaluation and commentary.
    End,
    /// `/help`
    Help,
    /// `quit` / `exit`
    Quit,
    /// Blank line.
    Empty,
    /// A slash command that could not be understood.
    Invalid(String),
}

pub const COMMANDS: [&str; 4] = ["/sessions", "/title", "/end", "/help"];

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if trimmed == "quit" || trimmed == "exit" {
            return Self::Quit;
        }
        let Some(command) = trimmed.strip_prefix('/') else {
            return Self::Chat(trimmed.to_string());
        };

        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some("sessions"), None, _) => Self::Sessions,
            (Some("end"), None, _) => Self::End,
            (Some("help"), None, _) => Self::Help,
            (Some("title"), Some(n), None) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Self::Title(n),
                _ => Self::Invalid(format!("'{n}' is not a session number")),
            },
            (Some("title"), None, _) => Self::Invalid("usage: /title <n>".to_string()),
            _ => Self::Invalid(format!("unknown command '{trimmed}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(
            ReplCommand::parse("  what is a prime?  "),
            ReplCommand::Chat("what is a prime?".into())
        );
        assert_eq!(ReplCommand::parse("   "), ReplCommand::Empty);
    }

    #[test]
    fn test_slash_commands() {
        assert_eq!(ReplCommand::parse("/sessions"), ReplCommand::Sessions);
        assert_eq!(ReplCommand::parse("/end"), ReplCommand::End);
        assert_eq!(ReplCommand::parse("/title 2"), ReplCommand::Title(2));
        assert_eq!(ReplCommand::parse("exit"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("quit"), ReplCommand::Quit);
    }

    #[test]
    fn test_bad_title_arguments() {
        assert!(matches!(ReplCommand::parse("/title"), ReplCommand::Invalid(_)));
        assert!(matches!(ReplCommand::parse("/title 0"), ReplCommand::Invalid(_)));
        assert!(matches!(ReplCommand::parse("/title x"), ReplCommand::Invalid(_)));
        assert!(matches!(ReplCommand::parse("/title 1 2"), ReplCommand::Invalid(_)));
        assert!(matches!(ReplCommand::parse("/plan"), ReplCommand::Invalid(_)));
    }
}
