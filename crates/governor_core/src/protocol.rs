//! Request/reply message types shared with the transport layer.
//!
//! # Responsibility
//! - Turn raw verb/noun text into closed enums once, at the boundary.
//! - Encode/decode the colon-separated line form used by the stdio transport.
//!
//! # Invariants
//! - Dispatch logic only ever matches on `Verb`/`Noun`, never on raw strings.
//! - Unknown tokens are preserved verbatim in `Verb::Unknown`/`Noun::Other`.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Separator between protocol fields on a message line.
pub const FIELD_SEPARATOR: char = ':';

/// Top-level command word of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Ping,
    New,
    Stop,
    Get,
    /// Reply verbs; receiving one means the message is itself a reply.
    Ok,
    Err,
    Pong,
    Unknown(String),
}

impl Verb {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "PING" => Self::Ping,
            "NEW" => Self::New,
            "STOP" => Self::Stop,
            "GET" => Self::Get,
            "OK" => Self::Ok,
            "ERR" => Self::Err,
            "PONG" => Self::Pong,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Ping => "PING",
            Self::New => "NEW",
            Self::Stop => "STOP",
            Self::Get => "GET",
            Self::Ok => "OK",
            Self::Err => "ERR",
            Self::Pong => "PONG",
            Self::Unknown(value) => value,
        }
    }
}

/// Second command word selecting the sub-operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Noun {
    Event,
    Events,
    Uptime,
    Schedule,
    Deadlines,
    Pong,
    Other(String),
}

impl Noun {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "EVENT" => Self::Event,
            "EVENTS" => Self::Events,
            "UPTIME" => Self::Uptime,
            "SCHEDULE" => Self::Schedule,
            "DEADLINES" => Self::Deadlines,
            "PONG" => Self::Pong,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Event => "EVENT",
            Self::Events => "EVENTS",
            Self::Uptime => "UPTIME",
            Self::Schedule => "SCHEDULE",
            Self::Deadlines => "DEADLINES",
            Self::Pong => "PONG",
            Self::Other(value) => value,
        }
    }
}

/// Error codes carried as the noun of an `ERR` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Too few arguments.
    Argc,
    Title,
    Time,
    Add,
    /// No such event ("not a calendar entry").
    Nac,
    Period,
    Verb,
    Noun,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Argc => "ARGC",
            Self::Title => "TITLE",
            Self::Time => "TIME",
            Self::Add => "ADD",
            Self::Nac => "NAC",
            Self::Period => "PERIOD",
            Self::Verb => "VERB",
            Self::Noun => "NOUN",
        }
    }
}

/// Inbound request addressed to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub from: String,
    pub to: String,
    pub verb: Verb,
    pub noun: Noun,
    pub args: Vec<String>,
}

impl Request {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        verb: &str,
        noun: &str,
        args: Vec<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            verb: Verb::parse(verb),
            noun: Noun::parse(noun),
            args,
        }
    }

    /// Parses `FROM:TO:VERB:NOUN[:ARG...]`.
    ///
    /// # Errors
    /// - Returns an error when the line has fewer than four fields.
    pub fn parse_line(line: &str) -> Result<Self, MessageParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() < 4 {
            return Err(MessageParseError::TooFewFields {
                found: fields.len(),
            });
        }
        Ok(Self::new(
            fields[0].trim(),
            fields[1].trim(),
            fields[2],
            fields[3],
            fields[4..].iter().map(|arg| arg.to_string()).collect(),
        ))
    }

    /// Returns the `n`-th argument trimmed, if present.
    pub fn arg(&self, n: usize) -> Option<&str> {
        self.args.get(n).map(|value| value.trim())
    }
}

/// Verb of an outbound reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyVerb {
    Ok,
    Err,
    Pong,
}

impl ReplyVerb {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Err => "ERR",
            Self::Pong => "PONG",
        }
    }
}

/// Outbound reply produced by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub verb: ReplyVerb,
    pub noun: String,
    pub args: Vec<String>,
}

impl Reply {
    pub fn ok(noun: &Noun, args: Vec<String>) -> Self {
        Self {
            verb: ReplyVerb::Ok,
            noun: noun.as_str().to_string(),
            args,
        }
    }

    pub fn err(code: ErrorCode) -> Self {
        Self::err_with(code, Vec::new())
    }

    pub fn err_with(code: ErrorCode, args: Vec<String>) -> Self {
        Self {
            verb: ReplyVerb::Err,
            noun: code.as_str().to_string(),
            args,
        }
    }

    pub fn pong() -> Self {
        Self {
            verb: ReplyVerb::Pong,
            noun: Noun::Pong.as_str().to_string(),
            args: Vec::new(),
        }
    }

    /// Renders `FROM:TO:VERB:NOUN[:ARG...]` for a reply from `from` to `to`.
    pub fn to_line(&self, from: &str, to: &str) -> String {
        let mut fields = vec![from, to, self.verb.as_str(), self.noun.as_str()];
        fields.extend(self.args.iter().map(String::as_str));
        let separator = FIELD_SEPARATOR.to_string();
        fields.join(separator.as_str())
    }
}

/// Message line rejection reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageParseError {
    TooFewFields { found: usize },
}

impl Display for MessageParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewFields { found } => {
                write!(f, "message needs at least 4 fields, found {found}")
            }
        }
    }
}

impl Error for MessageParseError {}

/// Reply delivery seam implemented by the transport.
pub trait Responder {
    type Error: Display;

    /// Sends `reply` back to the sender of `request`.
    fn reply(&self, request: &Request, reply: &Reply) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_line_splits_header_and_args() {
        let request =
            Request::parse_line("CLIENT:GOVERNOR:NEW:EVENT:Standup:2025.03.10:09.30\n").unwrap();
        assert_eq!(request.from, "CLIENT");
        assert_eq!(request.to, "GOVERNOR");
        assert_eq!(request.verb, Verb::New);
        assert_eq!(request.noun, Noun::Event);
        assert_eq!(request.args, vec!["Standup", "2025.03.10", "09.30"]);
    }

    #[test]
    fn parse_line_keeps_unknown_tokens() {
        let request = Request::parse_line("A:B:JUMP:HIGH").unwrap();
        assert_eq!(request.verb, Verb::Unknown("JUMP".to_string()));
        assert_eq!(request.noun, Noun::Other("HIGH".to_string()));
        assert!(request.args.is_empty());
    }

    #[test]
    fn parse_line_rejects_short_lines() {
        let err = Request::parse_line("A:B:PING").unwrap_err();
        assert_eq!(err, MessageParseError::TooFewFields { found: 3 });
    }

    #[test]
    fn reply_line_lists_payload_fields() {
        let reply = Reply::ok(&Noun::Event, vec!["ev1".to_string()]);
        assert_eq!(reply.to_line("GOVERNOR", "CLIENT"), "GOVERNOR:CLIENT:OK:EVENT:ev1");
        assert_eq!(Reply::pong().to_line("G", "C"), "G:C:PONG:PONG");
        assert_eq!(Reply::err(ErrorCode::Nac).to_line("G", "C"), "G:C:ERR:NAC");
    }

    #[test]
    fn verbs_are_matched_exactly() {
        assert_eq!(Verb::parse(" PONG "), Verb::Pong);
        assert_eq!(Verb::parse("ping"), Verb::Unknown("ping".to_string()));
        assert_eq!(Verb::Unknown("ping".to_string()).as_str(), "ping");
    }
}
