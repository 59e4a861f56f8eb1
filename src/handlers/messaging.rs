//! Handlers for traffic replies: PING, PRIVMSG, TOPIC, MOTD.

use ircfs_proto::{Command, Reply, response};
use tracing::debug;

use crate::state::Network;

/// Catch-all: anything the table does not route is deliberately ignored.
pub(super) fn r_default(_net: &mut Network, reply: &Reply) {
    debug!(raw = %reply.raw, "unhandled reply");
}

/// PING: echo the token back so the server keeps us alive.
pub(super) fn r_ping(net: &mut Network, reply: &Reply) {
    let token = reply
        .trailing
        .as_deref()
        .or_else(|| reply.target())
        .unwrap_or_default();
    net.send(&Command::Pong(token.to_string()));
}

/// PRIVMSG: route to the target channel, creating it on first contact.
/// A message addressed to our own nickname is a query; its channel is
/// named after the sender.
pub(super) fn r_privmsg(net: &mut Network, reply: &Reply) {
    let Some(sender) = reply.source_nickname().map(str::to_string) else {
        debug!(raw = %reply.raw, "privmsg without a sender");
        return;
    };
    let Some(target) = reply.target().map(str::to_string) else {
        debug!(raw = %reply.raw, "privmsg without a target");
        return;
    };
    let text = reply.trailing.clone().unwrap_or_default();

    let chan_name = if target == net.nickname() {
        sender.clone()
    } else {
        target
    };

    let idx = net.find_or_create_channel(&chan_name);
    net.channel_mut(idx).new_message(&sender, &text);
}

/// TOPIC command and RPL_TOPIC both land here. The channel parameter sits
/// one slot later in the numeric form (after our own nickname).
pub(super) fn r_topic(net: &mut Network, reply: &Reply) {
    let chan_name = if reply.code == Some(response::RPL_TOPIC) {
        reply.params.get(1)
    } else {
        reply.params.first()
    };
    let Some(chan_name) = chan_name else {
        debug!(raw = %reply.raw, "topic without a channel");
        return;
    };
    let Some(idx) = net.find_channel(chan_name) else {
        debug!(channel = %chan_name, "topic for unknown channel");
        return;
    };

    let setter = reply.source_nickname().map(str::to_string);
    let text = reply.trailing.clone().unwrap_or_default();
    net.channel_mut(idx).new_topic(setter.as_deref(), &text);
}

/// RPL_MOTDSTART / RPL_MOTD: append to the network MOTD view.
pub(super) fn r_motd(net: &mut Network, reply: &Reply) {
    if reply.code == Some(response::RPL_MOTDSTART) {
        net.write_motd_start();
    } else if let Some(line) = reply.trailing.as_deref() {
        net.write_motd_line(line);
    }
}
