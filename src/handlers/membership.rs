//! Handlers that mutate channel membership: NAMES, JOIN, PART, QUIT, NICK.

use ircfs_proto::Reply;
use tracing::debug;

use crate::state::{Network, User};

/// RPL_NAMREPLY: bulk-seed the online list. The channel is the last
/// middle parameter (after our nickname and the channel-visibility flag).
pub(super) fn r_names(net: &mut Network, reply: &Reply) {
    let Some(chan_name) = reply.params.last() else {
        debug!(raw = %reply.raw, "names without a channel");
        return;
    };
    let Some(names) = reply.trailing.as_deref() else {
        return;
    };
    net.seed_names(chan_name, names);
}

/// JOIN: our own join activates the channel; anyone else becomes a member.
pub(super) fn r_join(net: &mut Network, reply: &Reply) {
    let Some(nick) = reply.source_nickname().map(str::to_string) else {
        debug!(raw = %reply.raw, "join without a source");
        return;
    };
    let Some(chan_name) = channel_argument(reply) else {
        debug!(raw = %reply.raw, "join without a channel");
        return;
    };

    if nick == net.nickname() {
        net.find_or_create_channel(&chan_name);
        return;
    }

    let Some(idx) = net.find_channel(&chan_name) else {
        debug!(channel = %chan_name, "join for unknown channel");
        return;
    };
    net.channel_mut(idx).user_join(User::new(nick));
}

/// PART: our own part destroys the channel; anyone else just leaves it.
pub(super) fn r_part(net: &mut Network, reply: &Reply) {
    let Some(nick) = reply.source_nickname().map(str::to_string) else {
        debug!(raw = %reply.raw, "part without a source");
        return;
    };
    let Some(chan_name) = channel_argument(reply) else {
        debug!(raw = %reply.raw, "part without a channel");
        return;
    };

    if nick == net.nickname() {
        net.remove_channel(&chan_name);
        return;
    }

    let Some(idx) = net.find_channel(&chan_name) else {
        debug!(channel = %chan_name, "part for unknown channel");
        return;
    };
    net.channel_mut(idx).user_part(&nick);
}

/// QUIT: the nickname disappears from every channel it was in.
pub(super) fn r_quit(net: &mut Network, reply: &Reply) {
    let Some(nick) = reply.source_nickname().map(str::to_string) else {
        debug!(raw = %reply.raw, "quit without a source");
        return;
    };
    for chan in net.channels_mut() {
        chan.user_quit(&nick);
    }
}

/// NICK: rename across every channel; our own rename also updates the
/// nickname view.
pub(super) fn r_nick(net: &mut Network, reply: &Reply) {
    let Some(old) = reply.source_nickname().map(str::to_string) else {
        debug!(raw = %reply.raw, "nick without a source");
        return;
    };
    let new = reply
        .trailing
        .as_deref()
        .or_else(|| reply.target())
        .map(str::to_string);
    let Some(new) = new else {
        debug!(raw = %reply.raw, "nick without a new nickname");
        return;
    };

    for chan in net.channels_mut() {
        chan.rename_user(&old, &new);
    }
    if old == net.nickname() {
        net.set_nickname(&new);
    }
}

/// JOIN and PART carry the channel as either a middle or a trailing
/// parameter depending on the server.
fn channel_argument(reply: &Reply) -> Option<String> {
    reply
        .target()
        .or(reply.trailing.as_deref())
        .map(str::to_string)
}
