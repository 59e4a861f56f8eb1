//! Per-network connection lifecycle and filesystem projection.
//!
//! A network directory holds a command pipe (`cmd`, placeholder surface),
//! the inbound protocol trace (`raw`), and the `joined`, `motd`,
//! `nickname`, `realname` views, plus one subdirectory per channel.

use std::path::PathBuf;

use ircfs_proto::{CRLF, Command, Reply};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::bufio::{BufferedStream, FillStatus, Source};
use crate::config::{Config, LoginType, NetworkConfig};
use crate::fsview::{self, View};
use crate::state::{Channel, User};

/// Connection lifecycle. Failures never retry: the operator reconfigures
/// and restarts the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnState {
    Disconnected,
    Connecting,
    Registering,
    Active,
    Closing,
    Gone,
}

struct NetworkViews {
    raw: View,
    joined: View,
    motd: View,
    nickname: View,
    realname: View,
}

/// One IRC network connection and the channels it owns.
pub struct Network {
    name: String,
    host: String,
    port: u16,
    nickname: String,
    realname: String,
    password: Option<String>,
    login: LoginType,
    /// Control socket to the server.
    pub sock: BufferedStream,
    /// Network-level command pipe (`cmd`).
    pub pipe: BufferedStream,
    channels: Vec<Channel>,
    views: NetworkViews,
    dir: PathBuf,
    remove_files_on_close: bool,
    /// Tear down after the current dispatch pass completes.
    pub pending_close: bool,
    state: ConnState,
}

impl Network {
    /// Build a live network from its configuration block. Config data is
    /// deep-copied; the configuration stays untouched and reusable.
    pub fn from_config(cfg: &NetworkConfig, global: &Config) -> Network {
        let dir = global.root_directory.join(&cfg.name);
        let mut net = Network {
            name: cfg.name.clone(),
            host: cfg.server.clone(),
            port: cfg.port,
            nickname: cfg.nickname.clone(),
            realname: cfg.realname().to_string(),
            password: cfg.password.clone(),
            login: cfg.login_type,
            sock: BufferedStream::new(),
            pipe: BufferedStream::new(),
            channels: Vec::new(),
            views: NetworkViews {
                raw: View::closed(dir.join("raw")),
                joined: View::closed(dir.join("joined")),
                motd: View::closed(dir.join("motd")),
                nickname: View::closed(dir.join("nickname")),
                realname: View::closed(dir.join("realname")),
            },
            remove_files_on_close: cfg.remove_files_on_close(global),
            pending_close: false,
            state: ConnState::Disconnected,
            dir,
        };
        for chan in &cfg.channels {
            net.add_channel(chan);
        }
        net
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut [Channel] {
        &mut self.channels
    }

    /// Every live readable descriptor: socket, command pipe, channel pipes
    /// in registration order.
    pub fn sources(&self) -> Vec<&Source> {
        let mut sources = Vec::new();
        sources.extend(self.sock.source());
        sources.extend(self.pipe.source());
        for chan in &self.channels {
            sources.extend(chan.pipe.source());
        }
        sources
    }

    /// Project the network directory: command pipe, view files, and all
    /// channel directories. Best-effort apart from logging.
    pub fn setup_files(&mut self) {
        if let Err(e) = fsview::ensure_dir(&self.dir) {
            warn!(network = %self.name, error = %e, "network directory setup failed");
            return;
        }

        match fsview::open_command_fifo(&self.dir.join("cmd")) {
            Ok(rx) => self.pipe.attach(Source::Fifo(rx)),
            Err(e) => warn!(network = %self.name, error = %e, "network command pipe setup failed"),
        }

        self.views.raw = View::open_append(self.dir.join("raw"));
        self.views.joined = View::open_append(self.dir.join("joined"));
        self.views.motd = View::open_append(self.dir.join("motd"));
        self.views.nickname = View::open_append(self.dir.join("nickname"));
        self.views.realname = View::open_append(self.dir.join("realname"));

        for chan in &mut self.channels {
            chan.setup_files();
        }
    }

    /// Resolve and connect the control socket, then fire off registration.
    /// Any failure here is terminal for the network.
    pub async fn connect(&mut self) {
        self.state = ConnState::Connecting;
        info!(network = %self.name, host = %self.host, port = self.port, "connecting");

        match TcpStream::connect((self.host.as_str(), self.port)).await {
            Ok(sock) => {
                self.sock.attach(Source::Tcp(sock));
                self.register();
            }
            Err(e) => {
                warn!(network = %self.name, error = %e, "connection failed");
                self.begin_close();
            }
        }
    }

    /// Send the registration sequence fire-and-forget: replies arrive
    /// through the normal dispatch path.
    fn register(&mut self) {
        self.state = ConnState::Registering;

        if self.login == LoginType::Pass
            && let Some(pass) = self.password.clone()
        {
            self.send(&Command::Pass(pass));
        }
        self.send(&Command::Nick(self.nickname.clone()));
        self.write_nickname();
        self.send(&Command::User {
            username: self.nickname.clone(),
            realname: self.realname.clone(),
        });
        self.write_realname();

        if self.login == LoginType::Nickserv
            && let Some(pass) = self.password.clone()
        {
            self.send(&Command::Privmsg("NickServ".into(), format!("IDENTIFY {pass}")));
        }

        self.state = ConnState::Active;
        info!(network = %self.name, nickname = %self.nickname, "registered, joining channels");

        for idx in 0..self.channels.len() {
            let name = self.channels[idx].name().to_string();
            self.send(&Command::Join(name));
        }
        self.write_joined();
    }

    /// Render a command and write it to the control socket without
    /// blocking.
    pub fn send(&self, cmd: &Command) {
        debug!(network = %self.name, line = %cmd, "send");
        self.sock.try_write_all(format!("{cmd}{CRLF}").as_bytes());
    }

    /// Service this network's share of a readiness pass: socket first,
    /// then the command pipe, then each channel pipe in order.
    pub fn handle_input(&mut self) {
        match self.sock.fill() {
            FillStatus::Closed => {
                info!(network = %self.name, "server closed the connection");
                self.begin_close();
            }
            FillStatus::Failed(kind) => {
                warn!(network = %self.name, error = ?kind, "socket read failed");
                self.begin_close();
            }
            FillStatus::Open => {}
        }
        // Lines buffered before a close still get dispatched.
        while let Some(line) = self.sock.take_line() {
            self.handle_socket_line(&line);
        }

        self.pipe.fill();
        while let Some(line) = self.pipe.take_line() {
            debug!(network = %self.name, line = %line, "network command pipe (reserved)");
        }

        self.handle_channel_input();
    }

    /// Trace one server line and dispatch it to its handler.
    pub fn handle_socket_line(&mut self, line: &str) {
        self.views.raw.append_timestamped(line);
        let reply = Reply::parse(line);
        crate::handlers::dispatch(self, &reply);
    }

    fn handle_channel_input(&mut self) {
        for idx in 0..self.channels.len() {
            let chan = &mut self.channels[idx];
            chan.pipe.fill();
            let mut lines = Vec::new();
            while let Some(line) = chan.pipe.take_line() {
                lines.push(line);
            }

            for line in lines {
                if let Some(rest) = line.strip_prefix('/') {
                    debug!(
                        channel = %self.channels[idx].name(),
                        command = rest,
                        "slash commands are reserved"
                    );
                    continue;
                }
                let target = self.channels[idx].name().to_string();
                self.send(&Command::Privmsg(target, line.clone()));
                let nickname = self.nickname.clone();
                self.channels[idx].new_message(&nickname, &line);
            }
        }
    }

    pub fn find_channel(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.name() == name)
    }

    pub fn channel_mut(&mut self, idx: usize) -> &mut Channel {
        &mut self.channels[idx]
    }

    /// Append a channel without projecting it; used from configuration.
    pub fn add_channel(&mut self, name: &str) -> usize {
        self.channels.push(Channel::new(name, &self.dir));
        self.channels.len() - 1
    }

    /// Find a channel, creating and projecting it on demand (unknown
    /// PRIVMSG targets and fresh joins).
    pub fn find_or_create_channel(&mut self, name: &str) -> usize {
        if let Some(idx) = self.find_channel(name) {
            return idx;
        }
        let idx = self.add_channel(name);
        self.channels[idx].setup_files();
        self.write_joined();
        idx
    }

    /// Destroy a channel: close its descriptors, optionally unlink its
    /// projection, and rewrite the joined view.
    pub fn remove_channel(&mut self, name: &str) {
        let Some(idx) = self.find_channel(name) else {
            debug!(network = %self.name, channel = name, "part for unknown channel");
            return;
        };
        let mut chan = self.channels.remove(idx);
        chan.teardown(self.remove_files_on_close);
        self.write_joined();
    }

    /// Adopt a new own nickname (server-confirmed NICK change).
    pub fn set_nickname(&mut self, nickname: &str) {
        self.nickname = nickname.to_string();
        self.write_nickname();
    }

    pub fn write_motd_start(&mut self) {
        self.views.motd.append("New MOTD:\n");
    }

    pub fn write_motd_line(&mut self, line: &str) {
        self.views.motd.append(&format!("{line}\n"));
    }

    fn write_joined(&mut self) {
        let mut contents = String::new();
        for chan in &self.channels {
            contents.push_str(chan.name());
            contents.push('\n');
        }
        self.views.joined.rewrite(&contents);
    }

    fn write_nickname(&mut self) {
        self.views.nickname.rewrite(&format!("{}\n", self.nickname));
    }

    fn write_realname(&mut self) {
        self.views.realname.rewrite(&format!("{}\n", self.realname));
    }

    /// Mark for teardown at the end of the current dispatch pass. The
    /// reactor may still be iterating our descriptors, so nothing is
    /// closed here.
    pub fn begin_close(&mut self) {
        if self.pending_close {
            return;
        }
        self.pending_close = true;
        self.state = ConnState::Closing;
        info!(network = %self.name, "network marked for close");
    }

    /// Close every descriptor this network owns; unlink the projection
    /// when configured to.
    pub fn teardown(&mut self) {
        self.state = ConnState::Gone;
        for chan in &mut self.channels {
            chan.teardown(self.remove_files_on_close);
        }
        self.sock.close();
        self.pipe.close();

        if self.remove_files_on_close {
            let _ = std::fs::remove_file(self.dir.join("cmd"));
            self.views.raw.remove();
            self.views.joined.remove();
            self.views.motd.remove();
            self.views.nickname.remove();
            self.views.realname.remove();
            if let Err(e) = std::fs::remove_dir(&self.dir) {
                debug!(network = %self.name, error = %e, "network directory removal failed");
            }
        }
    }

    /// Seed membership for one channel from a NAMES batch.
    pub fn seed_names(&mut self, channel: &str, names: &str) {
        let Some(idx) = self.find_channel(channel) else {
            debug!(network = %self.name, channel, "names for unknown channel");
            return;
        };
        for entry in names.split_whitespace() {
            self.channels[idx].user_online(User::from_names_entry(entry));
        }
    }

    #[cfg(test)]
    pub fn read_view(&self, view: &str) -> String {
        std::fs::read_to_string(self.dir.join(view)).unwrap_or_default()
    }
}
