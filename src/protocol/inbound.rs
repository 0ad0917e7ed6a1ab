//! Inbound control line decoding.
//!
//! The remote end sends plain text lines of the form `command=arg...`. The
//! first `=` separates the command; everything after it is the argument
//! tail, which may itself contain `=`.
//!
//! Decoding is total: every input, including the empty string, maps to one
//! [`ServerMessage`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// Separator between command and arguments.
const DELIMITER: char = '=';

// ============================================================================
// InboundMessage
// ============================================================================

/// A received line split into command and argument fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Text before the first `=` (the whole line if there is none).
    pub command: String,
    /// Fragments after the first `=`, in order.
    pub args: Vec<String>,
}

impl InboundMessage {
    /// Splits a raw frame.
    #[must_use]
    pub fn parse(frame: &str) -> Self {
        match frame.split_once(DELIMITER) {
            Some((command, rest)) => Self {
                command: command.to_string(),
                args: rest.split(DELIMITER).map(str::to_string).collect(),
            },
            None => Self {
                command: frame.to_string(),
                args: Vec::new(),
            },
        }
    }

    /// Arguments rejoined with `=`.
    #[must_use]
    pub fn joined_args(&self) -> String {
        self.args.join("=")
    }

    /// Classifies the message.
    #[must_use]
    pub fn classify(&self) -> ServerMessage {
        match self.command.as_str() {
            "text" => ServerMessage::Text(self.joined_args()),
            "err" => ServerMessage::Error(self.joined_args()),
            _ => ServerMessage::Unknown {
                command: self.command.clone(),
            },
        }
    }
}

// ============================================================================
// ServerMessage
// ============================================================================

/// Decoded meaning of an inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// `text=...`: informational display string.
    Text(String),
    /// `err=...`: server-side error description.
    Error(String),
    /// Any other command; arguments are ignored.
    Unknown {
        /// The unrecognised command token.
        command: String,
    },
}

impl ServerMessage {
    /// Decodes a raw frame.
    #[inline]
    #[must_use]
    pub fn decode(frame: &str) -> Self {
        InboundMessage::parse(frame).classify()
    }

    /// Single line of status text for the UI.
    #[must_use]
    pub fn display_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Error(text) => write!(f, "Error from server: {text}"),
            Self::Unknown { command } => write!(f, "Don't know how to {command}"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_text_command() {
        assert_eq!(
            ServerMessage::decode("text=hello world"),
            ServerMessage::Text("hello world".into())
        );
    }

    #[test]
    fn test_err_command() {
        let message = ServerMessage::decode("err=disk full");
        assert_eq!(message, ServerMessage::Error("disk full".into()));
        assert_eq!(message.display_text(), "Error from server: disk full");
    }

    #[test]
    fn test_unknown_command() {
        let message = ServerMessage::decode("ping");
        assert_eq!(
            message,
            ServerMessage::Unknown {
                command: "ping".into()
            }
        );
        assert_eq!(message.display_text(), "Don't know how to ping");
    }

    #[test]
    fn test_unknown_command_ignores_args() {
        assert_eq!(
            ServerMessage::decode("resize=10=20").display_text(),
            "Don't know how to resize"
        );
    }

    #[test]
    fn test_args_keep_inner_delimiters() {
        let message = InboundMessage::parse("text=a=b=c");
        assert_eq!(message.command, "text");
        assert_eq!(message.args, vec!["a", "b", "c"]);
        assert_eq!(
            ServerMessage::decode("text=a=b=c"),
            ServerMessage::Text("a=b=c".into())
        );
    }

    #[test]
    fn test_empty_input() {
        let message = InboundMessage::parse("");
        assert_eq!(message.command, "");
        assert!(message.args.is_empty());
        assert_eq!(
            ServerMessage::decode("").display_text(),
            "Don't know how to "
        );
    }

    #[test]
    fn test_trailing_delimiter() {
        let message = InboundMessage::parse("text=");
        assert_eq!(message.args, vec![""]);
        assert_eq!(message.classify(), ServerMessage::Text(String::new()));
    }

    #[test]
    fn test_leading_delimiter_is_empty_command() {
        assert_eq!(
            ServerMessage::decode("=oops"),
            ServerMessage::Unknown {
                command: String::new()
            }
        );
    }

    proptest! {
        #[test]
        fn prop_argument_tail_round_trips(cmd in "[^=]*", tail in ".*") {
            let frame = format!("{cmd}={tail}");
            let message = InboundMessage::parse(&frame);
            prop_assert_eq!(&message.command, &cmd);
            prop_assert_eq!(message.joined_args(), tail);
        }

        #[test]
        fn prop_no_delimiter_means_no_args(frame in "[^=]*") {
            let message = InboundMessage::parse(&frame);
            prop_assert_eq!(&message.command, &frame);
            prop_assert!(message.args.is_empty());
        }

        #[test]
        fn prop_decode_is_total(frame in any::<String>()) {
            let _ = ServerMessage::decode(&frame).display_text();
        }
    }
}
