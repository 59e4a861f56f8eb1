//! IRC message prefix parsing.
//!
//! A prefix identifies the origin of a message: either a server name or a
//! user's `nick!user@host` mask. The parser is lenient; any component may
//! be absent and the raw text is always preserved.

/// The parsed origin of an IRC message.
///
/// All component fields are derived from [`raw`](Self::raw); empty
/// components are represented as `None` rather than empty strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prefix {
    /// The prefix exactly as it appeared on the wire, without the leading `:`.
    pub raw: String,
    /// Nickname, when the prefix is a user mask.
    pub nick: Option<String>,
    /// Username (ident), when present after `!`.
    pub user: Option<String>,
    /// Hostname, or the server name for server-origin messages.
    pub host: Option<String>,
}

impl Prefix {
    /// Parse a prefix string into its components.
    ///
    /// `nick!user@host` fills all three fields; `nick!user` and `nick@host`
    /// fill what they carry; a bare token containing a dot is taken as a
    /// server name, anything else as a bare nickname.
    pub fn parse(s: &str) -> Self {
        let raw = s.to_string();
        let non_empty = |t: &str| {
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        };

        if let Some(at) = s.find('@') {
            let (before, host) = (&s[..at], &s[at + 1..]);
            let (nick, user) = match before.find('!') {
                Some(bang) => (non_empty(&before[..bang]), non_empty(&before[bang + 1..])),
                None => (non_empty(before), None),
            };
            return Prefix {
                raw,
                nick,
                user,
                host: non_empty(host),
            };
        }

        if let Some(bang) = s.find('!') {
            return Prefix {
                nick: non_empty(&s[..bang]),
                user: non_empty(&s[bang + 1..]),
                host: None,
                raw,
            };
        }

        if s.contains('.') {
            // A dot with no ! or @ is a server name.
            return Prefix {
                nick: None,
                user: None,
                host: non_empty(s),
                raw,
            };
        }

        Prefix {
            nick: non_empty(s),
            user: None,
            host: None,
            raw,
        }
    }

    /// True when this prefix names a server rather than a user.
    pub fn is_server(&self) -> bool {
        self.nick.is_none() && self.host.is_some()
    }

    /// The nickname as a borrowed str, when present.
    pub fn nickname(&self) -> Option<&str> {
        self.nick.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_mask() {
        let p = Prefix::parse("nick!user@host");
        assert_eq!(p.nick.as_deref(), Some("nick"));
        assert_eq!(p.user.as_deref(), Some("user"));
        assert_eq!(p.host.as_deref(), Some("host"));
        assert_eq!(p.raw, "nick!user@host");
        assert!(!p.is_server());
    }

    #[test]
    fn server_name() {
        let p = Prefix::parse("irc.example.com");
        assert!(p.is_server());
        assert_eq!(p.host.as_deref(), Some("irc.example.com"));
        assert_eq!(p.nick, None);
    }

    #[test]
    fn bare_nick() {
        let p = Prefix::parse("NickServ");
        assert_eq!(p.nick.as_deref(), Some("NickServ"));
        assert_eq!(p.user, None);
        assert_eq!(p.host, None);
    }

    #[test]
    fn nick_and_host_only() {
        let p = Prefix::parse("nick@host.net");
        assert_eq!(p.nick.as_deref(), Some("nick"));
        assert_eq!(p.user, None);
        assert_eq!(p.host.as_deref(), Some("host.net"));
    }

    #[test]
    fn empty_components_are_none() {
        let p = Prefix::parse("!@");
        assert_eq!(p.nick, None);
        assert_eq!(p.user, None);
        assert_eq!(p.host, None);
        assert_eq!(p.raw, "!@");
    }
}
