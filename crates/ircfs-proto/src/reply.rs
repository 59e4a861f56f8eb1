//! Permissive parsing of server lines into structured replies.

use crate::prefix::Prefix;

/// One parsed server line.
///
/// A reply carries either a three-digit numeric [`code`](Self::code) or a
/// [`command`](Self::command) word (or, for a degenerate line, neither).
/// Middle parameters keep their wire order; the trailing ("colon")
/// parameter is captured verbatim and may contain spaces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    /// The whole line as received, terminator already stripped.
    pub raw: String,
    /// Message origin, when the line started with `:`.
    pub prefix: Option<Prefix>,
    /// Numeric reply code, when the command token was exactly three digits.
    pub code: Option<u16>,
    /// Command word, when the command token was not numeric.
    pub command: Option<String>,
    /// Middle parameters, in wire order.
    pub params: Vec<String>,
    /// Trailing parameter, without its leading `:`.
    pub trailing: Option<String>,
}

impl Reply {
    /// Parse one line. This is a total function: missing or malformed
    /// fields are left absent and never abort the parse.
    pub fn parse(line: &str) -> Reply {
        let mut reply = Reply {
            raw: line.to_string(),
            prefix: None,
            code: None,
            command: None,
            params: Vec::new(),
            trailing: None,
        };

        let mut rest = line;

        if let Some(stripped) = rest.strip_prefix(':') {
            match stripped.split_once(' ') {
                Some((prefix, tail)) => {
                    reply.prefix = Some(Prefix::parse(prefix));
                    rest = tail;
                }
                None => {
                    // A prefix with nothing after it; the line carries no command.
                    reply.prefix = Some(Prefix::parse(stripped));
                    return reply;
                }
            }
        }

        let rest = rest.trim_start_matches(' ');
        let (token, mut rest) = match rest.split_once(' ') {
            Some((t, tail)) => (t, tail),
            None => (rest, ""),
        };

        if token.is_empty() {
            return reply;
        }

        // Numeric replies are exactly three ASCII digits; anything else,
        // including a malformed almost-number, is treated as a command word.
        if token.len() == 3 && token.bytes().all(|b| b.is_ascii_digit()) {
            reply.code = token.parse::<u16>().ok();
        } else {
            reply.command = Some(token.to_string());
        }

        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                reply.trailing = Some(trailing.to_string());
                break;
            }
            let (param, tail) = match rest.split_once(' ') {
                Some((p, t)) => (p, t),
                None => (rest, ""),
            };
            reply.params.push(param.to_string());
            rest = tail;
        }

        reply
    }

    /// The nickname of the message origin, when it was a user prefix.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(|p| p.nickname())
    }

    /// First middle parameter, the usual target of a command.
    pub fn target(&self) -> Option<&str> {
        self.params.first().map(String::as_str)
    }
}
