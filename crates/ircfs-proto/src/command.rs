//! Outbound client commands and their wire rendering.

use std::fmt;

/// A client-to-server command.
///
/// The `Display` impl renders the wire line without the `\r\n` terminator;
/// the transport layer appends [`CRLF`](crate::CRLF) when sending.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `PASS <password>` — connection password, sent before registration.
    Pass(String),
    /// `NICK <nickname>`
    Nick(String),
    /// `USER <username> 0 * :<realname>`
    User {
        username: String,
        realname: String,
    },
    /// `JOIN <channel>`
    Join(String),
    /// `PART <channel> [:<message>]`
    Part(String, Option<String>),
    /// `QUIT [:<message>]`
    Quit(Option<String>),
    /// `PRIVMSG <target> :<text>`
    Privmsg(String, String),
    /// `PONG :<token>` — echo of a server PING.
    Pong(String),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Pass(pass) => write!(f, "PASS {pass}"),
            Command::Nick(nick) => write!(f, "NICK {nick}"),
            Command::User { username, realname } => {
                write!(f, "USER {username} 0 * :{realname}")
            }
            Command::Join(chan) => write!(f, "JOIN {chan}"),
            Command::Part(chan, None) => write!(f, "PART {chan}"),
            Command::Part(chan, Some(msg)) => write!(f, "PART {chan} :{msg}"),
            Command::Quit(None) => write!(f, "QUIT"),
            Command::Quit(Some(msg)) => write!(f, "QUIT :{msg}"),
            Command::Privmsg(target, text) => write!(f, "PRIVMSG {target} :{text}"),
            Command::Pong(token) => write!(f, "PONG :{token}"),
        }
    }
}
