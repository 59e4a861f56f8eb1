//! The process-wide connection registry.
//!
//! One mutable root owns every network (and through them every channel
//! and buffer). The reactor walks it each iteration; nothing else holds a
//! reference to any of it, so the whole engine mutates without locks.

use std::path::PathBuf;

use anyhow::Context;
use tracing::{debug, info};

use crate::bufio::{BufferedStream, Source};
use crate::config::Config;
use crate::fsview;
use crate::state::Network;

/// All live networks plus the global command pipe.
pub struct Registry {
    root: PathBuf,
    /// Global command pipe (`<root>/cmd`). Placeholder command surface:
    /// lines are drained and logged.
    pub cmd: BufferedStream,
    pub networks: Vec<Network>,
}

impl Registry {
    /// Build the registry from configuration: create the root directory
    /// and global command pipe (the one fatal setup step), deep-copy the
    /// auto-login networks into live state, project their directories,
    /// and start their connections.
    pub async fn bootstrap(config: &Config) -> anyhow::Result<Registry> {
        fsview::ensure_dir(&config.root_directory)
            .with_context(|| format!("cannot create root {}", config.root_directory.display()))?;

        let fifo = fsview::open_command_fifo(&config.root_directory.join("cmd"))
            .context("cannot create the global command pipe")?;
        let mut cmd = BufferedStream::new();
        cmd.attach(Source::Fifo(fifo));

        let mut registry = Registry {
            root: config.root_directory.clone(),
            cmd,
            networks: Vec::new(),
        };

        for net_cfg in config.startup_networks() {
            registry.networks.push(Network::from_config(net_cfg, config));
        }
        info!(networks = registry.networks.len(), root = %registry.root.display(), "registry initialized");

        for net in &mut registry.networks {
            net.setup_files();
            net.connect().await;
        }

        Ok(registry)
    }

    /// Every live readable descriptor, in dispatch order: the global
    /// command pipe first, then each network's descriptors.
    pub fn sources(&self) -> Vec<&Source> {
        let mut sources = Vec::new();
        sources.extend(self.cmd.source());
        for net in &self.networks {
            sources.extend(net.sources());
        }
        sources
    }

    /// One full dispatch pass in deterministic order: the global command
    /// pipe is drained first, then every network services its socket,
    /// command pipe, and channels. Teardown is deferred to
    /// [`reap_closed`](Self::reap_closed).
    pub fn dispatch_pass(&mut self) {
        self.cmd.fill();
        while let Some(line) = self.cmd.take_line() {
            debug!(line = %line, "global command pipe (reserved)");
        }

        for net in &mut self.networks {
            net.handle_input();
        }
    }

    /// Tear down and drop every network whose pending-close flag is set.
    /// Runs only between dispatch passes, never while the loop is
    /// iterating descriptors.
    pub fn reap_closed(&mut self) {
        let mut idx = 0;
        while idx < self.networks.len() {
            if self.networks[idx].pending_close {
                let mut net = self.networks.remove(idx);
                info!(network = %net.name(), "tearing down closed network");
                net.teardown();
            } else {
                idx += 1;
            }
        }
    }

    /// Orderly shutdown: tear down every network and release the global
    /// command pipe.
    pub fn shutdown(&mut self) {
        for net in &mut self.networks {
            net.teardown();
        }
        self.networks.clear();
        self.cmd.close();
        let _ = std::fs::remove_file(self.root.join("cmd"));
        info!("registry cleared");
    }
}
