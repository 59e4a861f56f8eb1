//! Per-channel user records.

/// One member of a channel.
///
/// The nickname is the key in the channel's membership index; the display
/// string is pre-rendered with the member's mode marker so view rewrites
/// are a plain dump of the index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub nick: String,
    pub is_op: bool,
    pub is_voice: bool,
    /// Display form, e.g. `@nick` for an operator.
    pub formatted: String,
}

impl User {
    pub fn new(nick: impl Into<String>) -> User {
        let mut user = User {
            nick: nick.into(),
            is_op: false,
            is_voice: false,
            formatted: String::new(),
        };
        user.format_nick();
        user
    }

    pub fn with_modes(nick: impl Into<String>, is_op: bool, is_voice: bool) -> User {
        let mut user = User::new(nick);
        user.is_op = is_op;
        user.is_voice = is_voice;
        user.format_nick();
        user
    }

    /// Parse a NAMES-list entry: leading `@`/`+` markers set the member
    /// modes, the remainder is the nickname.
    pub fn from_names_entry(entry: &str) -> User {
        let mut is_op = false;
        let mut is_voice = false;
        let mut rest = entry;
        loop {
            match rest.chars().next() {
                Some('@') => {
                    is_op = true;
                    rest = &rest[1..];
                }
                Some('+') => {
                    is_voice = true;
                    rest = &rest[1..];
                }
                _ => break,
            }
        }
        User::with_modes(rest, is_op, is_voice)
    }

    /// Re-render the display string after a nick or mode change.
    pub fn format_nick(&mut self) {
        self.formatted = if self.is_op {
            format!("@{}", self.nick)
        } else if self.is_voice {
            format!("+{}", self.nick)
        } else {
            self.nick.clone()
        };
    }

    /// Rename, keeping modes and re-rendering the display string.
    pub fn rename(&mut self, new_nick: impl Into<String>) {
        self.nick = new_nick.into();
        self.format_nick();
    }
}
