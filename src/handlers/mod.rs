//! Reply dispatch.
//!
//! A static ordered table routes every parsed server reply to exactly one
//! handler. The scan walks the table in order and the first entry whose
//! command word or numeric code matches wins; the wildcard entry at the
//! head of the table never matches directly and runs only when nothing
//! else did.

mod membership;
mod messaging;

use ircfs_proto::{Reply, response};

use crate::state::Network;

/// A handler mutates the network (and through it the channels) that the
/// reply arrived on.
pub type Handler = fn(&mut Network, &Reply);

/// What a table entry matches against.
pub enum Match {
    /// Catch-all; used only as the fallback.
    Any,
    /// Command word, exact.
    Command(&'static str),
    /// Three-digit numeric code.
    Code(u16),
}

impl Match {
    fn matches(&self, reply: &Reply) -> bool {
        match self {
            Match::Any => false,
            Match::Command(word) => reply.command.as_deref() == Some(*word),
            Match::Code(code) => reply.code == Some(*code),
        }
    }
}

pub struct Entry {
    pub rule: Match,
    pub handler: Handler,
}

/// The dispatch table. Order is the match priority; the wildcard default
/// must stay first.
pub static HANDLERS: &[Entry] = &[
    Entry { rule: Match::Any, handler: messaging::r_default },
    Entry { rule: Match::Command("PING"), handler: messaging::r_ping },
    Entry { rule: Match::Command("PRIVMSG"), handler: messaging::r_privmsg },
    Entry { rule: Match::Command("TOPIC"), handler: messaging::r_topic },
    Entry { rule: Match::Code(response::RPL_TOPIC), handler: messaging::r_topic },
    Entry { rule: Match::Code(response::RPL_MOTDSTART), handler: messaging::r_motd },
    Entry { rule: Match::Code(response::RPL_MOTD), handler: messaging::r_motd },
    Entry { rule: Match::Code(response::RPL_NAMREPLY), handler: membership::r_names },
    Entry { rule: Match::Command("JOIN"), handler: membership::r_join },
    Entry { rule: Match::Command("PART"), handler: membership::r_part },
    Entry { rule: Match::Command("QUIT"), handler: membership::r_quit },
    Entry { rule: Match::Command("NICK"), handler: membership::r_nick },
];

/// Route one reply to its handler. Exactly one handler runs.
pub fn dispatch(net: &mut Network, reply: &Reply) {
    for entry in HANDLERS {
        if entry.rule.matches(reply) {
            (entry.handler)(net, reply);
            return;
        }
    }
    (HANDLERS[0].handler)(net, reply);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    pub(super) fn test_network(root: &std::path::Path, channels: &str) -> Network {
        let config: Config = toml::from_str(&format!(
            r#"
            root_directory = "{}"

            [[network]]
            name = "testnet"
            server = "127.0.0.1"
            nickname = "me"
            channels = {channels}
            "#,
            root.display()
        ))
        .unwrap();
        let mut net = Network::from_config(&config.networks[0], &config);
        net.setup_files();
        net
    }

    pub(super) fn feed(net: &mut Network, line: &str) {
        dispatch(net, &Reply::parse(line));
    }

    #[tokio::test]
    async fn unmatched_reply_runs_default_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut net = test_network(dir.path(), r##"["#chan"]"##);
        // An unknown command and an unknown numeric both fall through
        // without touching any state.
        feed(&mut net, ":srv WALLOPS :routine maintenance");
        feed(&mut net, ":srv 001 me :Welcome to the network");
        assert_eq!(net.channels()[0].member_count(), 0);
        assert!(!net.pending_close);
    }

    #[tokio::test]
    async fn command_match_beats_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let mut net = test_network(dir.path(), r##"["#chan"]"##);
        feed(&mut net, ":amy!a@host JOIN #chan");
        assert_eq!(net.channels()[0].member_count(), 1);
    }

    #[tokio::test]
    async fn numeric_match_routes_by_code() {
        let dir = tempfile::tempdir().unwrap();
        let mut net = test_network(dir.path(), r##"["#chan"]"##);
        feed(&mut net, ":srv.net 353 me = #chan :@op plain");
        assert_eq!(net.channels()[0].member_count(), 2);
    }
}
