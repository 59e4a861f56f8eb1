//! Numeric reply codes consumed by the dispatcher.
//!
//! Only the numerics the gateway actually routes are listed; everything
//! else falls through to the default handler.

/// `RPL_TOPIC` — topic of a channel, sent on join or TOPIC query.
pub const RPL_TOPIC: u16 = 332;

/// `RPL_NAMREPLY` — one batch of the channel name list.
pub const RPL_NAMREPLY: u16 = 353;

/// `RPL_MOTD` — one line of the message of the day.
pub const RPL_MOTD: u16 = 372;

/// `RPL_MOTDSTART` — start of the message of the day.
pub const RPL_MOTDSTART: u16 = 375;
