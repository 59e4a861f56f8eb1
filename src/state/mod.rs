//! Engine state: users, channels, networks, and the connection registry.
//!
//! Ownership is strictly tree-shaped — the registry owns networks,
//! networks own channels, channels own users — so the single reactor
//! thread mutates everything without locks.

mod channel;
mod network;
mod registry;
mod user;

pub use channel::Channel;
pub use network::{ConnState, Network};
pub use registry::Registry;
pub use user::User;
