//! ircfsd - filesystem IRC client gateway.
//!
//! Every network connection and channel is projected as a directory of
//! plain files and named pipes; one single-threaded reactor drives all of
//! them.

mod bufio;
mod config;
mod fsview;
mod handlers;
mod reactor;
mod state;

use crate::config::Config;
use crate::state::Registry;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ircfsd.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "failed to load config");
        e
    })?;

    info!(
        root = %config.root_directory.display(),
        networks = config.networks.len(),
        "starting ircfsd"
    );
    if !config.stay_in_foreground {
        // Daemonization is the supervisor's job; the engine always runs
        // in the foreground.
        debug!("stay_in_foreground unset; process supervision is external");
    }

    let mut registry = Registry::bootstrap(&config).await?;

    reactor::run(&mut registry).await;

    registry.shutdown();
    Ok(())
}
