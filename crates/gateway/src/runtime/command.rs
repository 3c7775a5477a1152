//! Parsing of one line of chat input.

/// What a line typed at the prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Blank line.
    Empty,
    /// `quit`, any case.
    Quit,
    /// `!tweet <text>`: post through the `tweet` tool, bypassing the model.
    DirectTweet(String),
    /// `!tool <name> [json]`: call one tool with literal JSON arguments.
    DirectTool { name: String, args: String },
    /// A malformed direct command; the message is shown to the user.
    Invalid(String),
    /// Anything else goes to the model.
    Chat(String),
}

const TWEET_PREFIX: &str = "!tweet";
const TOOL_PREFIX: &str = "!tool";

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        if line.eq_ignore_ascii_case("quit") {
            return Command::Quit;
        }

        if let Some(rest) = line.strip_prefix(TWEET_PREFIX) {
            let text = rest.trim();
            if text.is_empty() {
                return Command::Invalid("Please provide tweet text after !tweet command".into());
            }
            return Command::DirectTweet(text.to_string());
        }

        if let Some(rest) = line.strip_prefix(TOOL_PREFIX) {
            let rest = rest.trim();
            let (name, args) = match rest.split_once(char::is_whitespace) {
                Some((name, args)) => (name, args.trim()),
                None => (rest, ""),
            };
            if name.is_empty() {
                return Command::Invalid("Please provide a tool name after !tool command".into());
            }
            return Command::DirectTool {
                name: name.to_string(),
                args: args.to_string(),
            };
        }

        Command::Chat(line.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_is_case_insensitive() {
        assert_eq!(Command::parse("quit"), Command::Quit);
        assert_eq!(Command::parse("  QuIt \n"), Command::Quit);
        assert_eq!(
            Command::parse("quit now"),
            Command::Chat("quit now".into())
        );
    }

    #[test]
    fn blank_lines_are_empty() {
        assert_eq!(Command::parse(""), Command::Empty);
        assert_eq!(Command::parse("   \t"), Command::Empty);
    }

    #[test]
    fn tweet_command_takes_the_rest_of_the_line() {
        assert_eq!(
            Command::parse("!tweet Hello world!"),
            Command::DirectTweet("Hello world!".into())
        );
    }

    #[test]
    fn tweet_without_text_is_invalid() {
        assert_eq!(
            Command::parse("!tweet   "),
            Command::Invalid("Please provide tweet text after !tweet command".into())
        );
    }

    #[test]
    fn tool_command_splits_name_and_json() {
        assert_eq!(
            Command::parse(r#"!tool multiply {"a": 2, "b": 3}"#),
            Command::DirectTool {
                name: "multiply".into(),
                args: r#"{"a": 2, "b": 3}"#.into(),
            }
        );
        assert_eq!(
            Command::parse("!tool getUserProfile"),
            Command::DirectTool {
                name: "getUserProfile".into(),
                args: String::new(),
            }
        );
    }

    #[test]
    fn tool_without_name_is_invalid() {
        assert!(matches!(Command::parse("!tool"), Command::Invalid(_)));
    }

    #[test]
    fn anything_else_is_chat() {
        assert_eq!(
            Command::parse("What is 2 multiplied by 3?"),
            Command::Chat("What is 2 multiplied by 3?".into())
        );
    }
}
