//! Core configuration types and loading.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory the filesystem tree is projected into.
    #[serde(default = "default_root_directory")]
    pub root_directory: PathBuf,
    /// Skip daemonization. Process supervision is external to the engine;
    /// the flag is accepted for compatibility and logged.
    #[serde(default)]
    pub stay_in_foreground: bool,
    /// Default for networks that do not set their own
    /// `remove_files_on_close`.
    #[serde(default)]
    pub remove_files_on_close: bool,
    /// Names of network blocks to bring up at startup. Empty means all
    /// configured networks.
    #[serde(default)]
    pub auto_login: Vec<String>,
    /// Network definitions.
    #[serde(default, rename = "network")]
    pub networks: Vec<NetworkConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// The network blocks selected for startup: those named in
    /// `auto_login`, or every block when the list is empty.
    pub fn startup_networks(&self) -> Vec<&NetworkConfig> {
        if self.auto_login.is_empty() {
            return self.networks.iter().collect();
        }
        self.networks
            .iter()
            .filter(|n| self.auto_login.iter().any(|name| name == &n.name))
            .collect()
    }
}

/// One IRC network definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    /// Directory name for this network under the root.
    pub name: String,
    /// Remote host.
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub nickname: String,
    /// Defaults to the nickname when absent.
    #[serde(default)]
    pub realname: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub login_type: LoginType,
    /// Channels joined after registration.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Per-network override; the global value applies when unset.
    #[serde(default)]
    pub remove_files_on_close: Option<bool>,
}

impl NetworkConfig {
    /// Resolve the close-behavior flag: the network-level override wins,
    /// else the global default applies.
    pub fn remove_files_on_close(&self, global: &Config) -> bool {
        self.remove_files_on_close
            .unwrap_or(global.remove_files_on_close)
    }

    pub fn realname(&self) -> &str {
        self.realname.as_deref().unwrap_or(&self.nickname)
    }
}

/// How credentials are presented during registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginType {
    /// Password (when set) is ignored.
    None,
    /// Send `PASS` before `NICK`/`USER`.
    #[default]
    Pass,
    /// Identify to NickServ after registration.
    Nickserv,
}

fn default_root_directory() -> PathBuf {
    PathBuf::from("/tmp/irc")
}

fn default_port() -> u16 {
    6667
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
        root_directory = "/var/lib/ircfs"
        stay_in_foreground = true
        remove_files_on_close = true
        auto_login = ["libera"]

        [[network]]
        name = "libera"
        server = "irc.libera.chat"
        nickname = "fsbot"
        realname = "Filesystem Bot"
        password = "hunter2"
        login_type = "nickserv"
        channels = ["#rust", "#tokio"]

        [[network]]
        name = "local"
        server = "127.0.0.1"
        port = 6697
        nickname = "fsbot"
        remove_files_on_close = false
    "##;

    #[test]
    fn parses_full_document() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.root_directory, PathBuf::from("/var/lib/ircfs"));
        assert!(config.stay_in_foreground);
        assert_eq!(config.networks.len(), 2);

        let libera = &config.networks[0];
        assert_eq!(libera.port, 6667);
        assert_eq!(libera.login_type, LoginType::Nickserv);
        assert_eq!(libera.channels, ["#rust", "#tokio"]);
        assert_eq!(libera.realname(), "Filesystem Bot");

        let local = &config.networks[1];
        assert_eq!(local.port, 6697);
        assert_eq!(local.login_type, LoginType::Pass);
        assert_eq!(local.realname(), "fsbot");
    }

    #[test]
    fn minimal_network_gets_defaults() {
        let config: Config = toml::from_str(
            r#"
            [[network]]
            name = "n"
            server = "irc.example.com"
            nickname = "me"
            "#,
        )
        .unwrap();
        assert_eq!(config.root_directory, PathBuf::from("/tmp/irc"));
        assert!(!config.remove_files_on_close);
        let net = &config.networks[0];
        assert_eq!(net.port, 6667);
        assert!(net.channels.is_empty());
        assert_eq!(net.login_type, LoginType::Pass);
    }

    #[test]
    fn remove_files_precedence_network_over_global() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        // libera has no override: the global `true` applies.
        assert!(config.networks[0].remove_files_on_close(&config));
        // local overrides to false.
        assert!(!config.networks[1].remove_files_on_close(&config));
    }

    #[test]
    fn auto_login_selects_startup_networks() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let startup = config.startup_networks();
        assert_eq!(startup.len(), 1);
        assert_eq!(startup[0].name, "libera");

        let mut all = config.clone();
        all.auto_login.clear();
        assert_eq!(all.startup_networks().len(), 2);
    }
}
