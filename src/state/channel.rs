//! Per-channel state and its filesystem projection.
//!
//! A channel directory holds a command pipe (`in`) plus five rendered
//! views: `out` (human-readable event stream), `msgs` (message log),
//! `online` (sorted member list), `topic`, and `raw` (timestamped trace).
//! Membership mutations rewrite the online view wholesale; channel
//! membership is interactive-scale, so simplicity beats incremental
//! diffing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::bufio::BufferedStream;
use crate::fsview::{self, View};
use crate::state::User;

struct ChannelViews {
    out: View,
    online: View,
    topic: View,
    raw: View,
    msgs: View,
}

/// One joined channel (or query target) on a network.
pub struct Channel {
    name: String,
    topic: Option<String>,
    topic_setter: Option<String>,
    members: BTreeMap<String, User>,
    /// Inbound command pipe (`in`).
    pub pipe: BufferedStream,
    views: ChannelViews,
    dir: PathBuf,
}

impl Channel {
    /// A channel with no filesystem presence yet; `setup_files` projects it.
    pub fn new(name: impl Into<String>, network_dir: &Path) -> Channel {
        let name = name.into();
        let dir = network_dir.join(&name);
        Channel {
            views: ChannelViews {
                out: View::closed(dir.join("out")),
                online: View::closed(dir.join("online")),
                topic: View::closed(dir.join("topic")),
                raw: View::closed(dir.join("raw")),
                msgs: View::closed(dir.join("msgs")),
            },
            name,
            topic: None,
            topic_setter: None,
            members: BTreeMap::new(),
            pipe: BufferedStream::new(),
            dir,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn topic_setter(&self) -> Option<&str> {
        self.topic_setter.as_deref()
    }

    pub fn member(&self, nick: &str) -> Option<&User> {
        self.members.get(nick)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Create the channel directory, the `in` pipe, and the view files.
    /// Best-effort apart from logging: a failed projection leaves the
    /// channel functional in memory.
    pub fn setup_files(&mut self) {
        if let Err(e) = fsview::ensure_dir(&self.dir) {
            warn!(channel = %self.name, error = %e, "channel directory setup failed");
            return;
        }

        match fsview::open_command_fifo(&self.dir.join("in")) {
            Ok(rx) => self.pipe.attach(crate::bufio::Source::Fifo(rx)),
            Err(e) => warn!(channel = %self.name, error = %e, "channel command pipe setup failed"),
        }

        self.views.out = View::open_append(self.dir.join("out"));
        self.views.online = View::open_append(self.dir.join("online"));
        self.views.topic = View::open_append(self.dir.join("topic"));
        self.views.raw = View::open_append(self.dir.join("raw"));
        self.views.msgs = View::open_append(self.dir.join("msgs"));
    }

    /// Close every descriptor; unlink the projection when `remove_files`.
    pub fn teardown(&mut self, remove_files: bool) {
        self.pipe.close();
        if remove_files {
            let _ = std::fs::remove_file(self.dir.join("in"));
            self.views.out.remove();
            self.views.online.remove();
            self.views.topic.remove();
            self.views.raw.remove();
            self.views.msgs.remove();
            if let Err(e) = std::fs::remove_dir(&self.dir) {
                debug!(channel = %self.name, error = %e, "channel directory removal failed");
            }
        }
    }

    /// Insert a member without any announcement (NAMES seeding). A nick
    /// already present is left untouched.
    pub fn user_online(&mut self, user: User) {
        self.members.entry(user.nick.clone()).or_insert(user);
        self.write_online();
    }

    /// Insert a member and announce the join.
    pub fn user_join(&mut self, user: User) {
        let nick = user.nick.clone();
        self.user_online(user);
        self.views.out.append(&format!("join > {nick}\n"));
        self.views.raw.append_timestamped(&format!("JOIN {nick}"));
    }

    /// Remove a member on PART. Unknown nicks are ignored.
    pub fn user_part(&mut self, nick: &str) {
        if self.members.remove(nick).is_none() {
            debug!(channel = %self.name, nick, "part for unknown nick");
            return;
        }
        self.write_online();
        self.views.out.append(&format!("part > {nick}\n"));
        self.views.raw.append_timestamped(&format!("PART {nick}"));
    }

    /// Remove a member on QUIT. Unknown nicks are ignored.
    pub fn user_quit(&mut self, nick: &str) {
        if self.members.remove(nick).is_none() {
            debug!(channel = %self.name, nick, "quit for unknown nick");
            return;
        }
        self.write_online();
        self.views.out.append(&format!("quit < {nick}\n"));
        self.views.raw.append_timestamped(&format!("QUIT {nick}"));
    }

    /// Relocate a member under a new nickname, preserving modes and sort
    /// order. Unknown nicks are ignored.
    pub fn rename_user(&mut self, old: &str, new: &str) {
        let Some(mut user) = self.members.remove(old) else {
            debug!(channel = %self.name, nick = old, "rename for unknown nick");
            return;
        };
        user.rename(new);
        self.members.insert(user.nick.clone(), user);
        self.write_online();
    }

    /// Record an incoming (or echoed outgoing) message.
    pub fn new_message(&mut self, from: &str, text: &str) {
        let line = format!("<{from}> {text}\n");
        self.views.msgs.append(&line);
        self.views.out.append(&line);
        self.views.raw.append_timestamped(&format!("MSG {from}: {text}"));
    }

    /// Replace the topic and re-render its view. `setter` is absent when
    /// the topic arrived from the server rather than a user.
    pub fn new_topic(&mut self, setter: Option<&str>, text: &str) {
        self.topic = Some(text.to_string());
        self.topic_setter = setter.map(str::to_string);

        match setter {
            Some(who) => {
                self.views.topic.rewrite(&format!("{who}: \"{text}\"\n"));
                self.views.out.append(&format!("{who} set the topic to {text}\n"));
                self.views.raw.append_timestamped(&format!("TOPIC {who}: {text}"));
            }
            None => {
                self.views.topic.rewrite(&format!("\"{text}\"\n"));
                self.views.out.append(&format!("Topic is {text}\n"));
                self.views.raw.append_timestamped(&format!("TOPIC: {text}"));
            }
        }
    }

    /// Rewrite the `online` view: one display-formatted member per line,
    /// in index (nickname) order.
    fn write_online(&mut self) {
        let mut contents = String::new();
        for user in self.members.values() {
            contents.push_str(&user.formatted);
            contents.push('\n');
        }
        self.views.online.rewrite(&contents);
    }

    #[cfg(test)]
    pub fn read_view(&self, view: &str) -> String {
        std::fs::read_to_string(self.dir.join(view)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_channel() -> (tempfile::TempDir, Channel) {
        let dir = tempfile::tempdir().unwrap();
        let mut chan = Channel::new("#test", dir.path());
        chan.setup_files();
        (dir, chan)
    }

    #[tokio::test]
    async fn join_then_part_leaves_index_empty() {
        let (_dir, mut chan) = temp_channel();
        chan.user_join(User::new("alice"));
        assert_eq!(chan.member_count(), 1);
        chan.user_part("alice");
        assert_eq!(chan.member_count(), 0);
        // A second part for the same nick is a no-op.
        chan.user_part("alice");
        assert_eq!(chan.member_count(), 0);
        assert_eq!(chan.read_view("online"), "");
    }

    #[tokio::test]
    async fn online_view_is_sorted_and_formatted() {
        let (_dir, mut chan) = temp_channel();
        chan.user_online(User::from_names_entry("zed"));
        chan.user_online(User::from_names_entry("@amy"));
        chan.user_online(User::from_names_entry("+bob"));
        assert_eq!(chan.read_view("online"), "@amy\n+bob\nzed\n");
    }

    #[tokio::test]
    async fn duplicate_online_is_ignored() {
        let (_dir, mut chan) = temp_channel();
        chan.user_online(User::with_modes("amy", true, false));
        chan.user_online(User::new("amy"));
        assert_eq!(chan.member_count(), 1);
        // The original record with its modes survives.
        assert!(chan.member("amy").unwrap().is_op);
    }

    #[tokio::test]
    async fn rename_preserves_modes_and_renders_once() {
        let (_dir, mut chan) = temp_channel();
        chan.user_online(User::with_modes("brian", true, false));
        chan.user_online(User::new("alice"));
        chan.rename_user("brian", "zeta");

        let user = chan.member("zeta").expect("renamed member");
        assert!(user.is_op);
        assert!(chan.member("brian").is_none());
        assert_eq!(chan.member_count(), 2);
        assert_eq!(chan.read_view("online"), "alice\n@zeta\n");
    }

    #[tokio::test]
    async fn rename_unknown_nick_is_ignored() {
        let (_dir, mut chan) = temp_channel();
        chan.user_online(User::new("amy"));
        chan.rename_user("ghost", "spirit");
        assert_eq!(chan.member_count(), 1);
        assert!(chan.member("amy").is_some());
    }

    #[tokio::test]
    async fn messages_land_in_msgs_out_and_raw() {
        let (_dir, mut chan) = temp_channel();
        chan.new_message("amy", "hello world");
        assert_eq!(chan.read_view("msgs"), "<amy> hello world\n");
        assert_eq!(chan.read_view("out"), "<amy> hello world\n");
        assert!(chan.read_view("raw").contains("MSG amy: hello world"));
    }

    #[tokio::test]
    async fn topic_rewrites_not_appends() {
        let (_dir, mut chan) = temp_channel();
        chan.new_topic(Some("amy"), "first");
        assert_eq!(chan.topic_setter(), Some("amy"));
        chan.new_topic(None, "second");
        assert_eq!(chan.read_view("topic"), "\"second\"\n");
        assert_eq!(chan.topic(), Some("second"));
        assert_eq!(chan.topic_setter(), None);
        let out = chan.read_view("out");
        assert!(out.contains("amy set the topic to first"));
        assert!(out.contains("Topic is second"));
    }

    #[tokio::test]
    async fn teardown_removes_projection_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let chan_dir = dir.path().join("#gone");
        let mut chan = Channel::new("#gone", dir.path());
        chan.setup_files();
        assert!(chan_dir.join("in").exists());

        chan.teardown(true);
        assert!(chan.pipe.source().is_none());
        assert!(!chan_dir.exists());
    }

    #[tokio::test]
    async fn teardown_keeps_files_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut chan = Channel::new("#stays", dir.path());
        chan.setup_files();
        chan.teardown(false);
        assert!(chan.pipe.source().is_none());
        assert!(dir.path().join("#stays").join("msgs").exists());
    }
}
