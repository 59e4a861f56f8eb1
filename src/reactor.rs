//! The readiness-multiplexing event loop.
//!
//! One loop drives every socket and pipe in the process. Each iteration
//! gathers readiness futures for the full descriptor set, blocks until
//! any descriptor is ready (the engine's sole suspension point), then
//! runs a deterministic dispatch pass: every stream gets a non-blocking
//! fill and drains its complete lines, in registry order. Networks marked
//! for close are torn down only after the pass, never while their
//! descriptors may still be under iteration.

use std::future::Future;
use std::pin::Pin;

use futures_util::future::{Either, select, select_all};
use tracing::{debug, info};

use crate::state::Registry;

/// Run the engine until interrupted.
pub async fn run(registry: &mut Registry) {
    info!("entering event loop");
    // Networks that failed during bootstrap are already marked; clear them
    // before the first wait so their descriptors never enter the set.
    registry.reap_closed();
    loop {
        let interrupted = {
            let wait = Box::pin(wait_ready(registry));
            let interrupt = Box::pin(tokio::signal::ctrl_c());
            matches!(select(wait, interrupt).await, Either::Right(_))
        };
        if interrupted {
            info!("interrupt received, shutting down");
            return;
        }

        registry.dispatch_pass();
        registry.reap_closed();
    }
}

/// Block until any live descriptor is readable. A readiness error is
/// treated as readable so the subsequent fill surfaces it on the right
/// stream.
async fn wait_ready(registry: &Registry) {
    let sources = registry.sources();
    if sources.is_empty() {
        // Nothing left to watch; only the interrupt can wake us.
        debug!("no live descriptors");
        std::future::pending::<()>().await;
    }

    let waits: Vec<Pin<Box<dyn Future<Output = std::io::Result<()>> + '_>>> = sources
        .into_iter()
        .map(|source| Box::pin(source.readable()) as _)
        .collect();
    let _ = select_all(waits).await;
}
