//! Message routing: publication fan-out plus edit/delete propagation.

use std::collections::HashSet;

use serde_json::Value;
use uuid::Uuid;

use crate::envelope::{now_rfc3339, Envelope};
use crate::models::{MessageDelete, MessageEdit};
use crate::registry::HubState;

/// Accept a publication: assign the server identity, fan out to every
/// subscriber of the channel and every connection of the private recipients,
/// then store it in channel history.
pub fn pass_message(st: &mut HubState, mut env: Envelope) {
    env.assign_identity();
    st.stats.total_unique_messages += 1;

    let targets = recipients(st, env.channel.as_deref(), &env.pm_users);
    deliver(st, &env, &targets);

    if let Some(name) = env.channel.clone()
        && let Some(channel) = st.channels.get_mut(&name)
    {
        channel.append_history(&env);
        channel.touch();
    }
}

/// Replace a stored message's payload and notify subscribers with a
/// `message:edit` envelope reusing the original uuid. Unknown channels are
/// tolerated silently; an unknown uuid skips the history edit but the
/// notification still goes out.
pub fn edit_message(st: &mut HubState, edit: &MessageEdit) {
    let Some(channel) = st.channels.get_mut(&edit.channel) else {
        return;
    };
    channel.edit_history(edit.uuid, &edit.message);
    pass_message(st, notification(edit.uuid, &edit.channel, edit.user.as_deref(), "message:edit", edit.message.clone()));
}

/// Remove a stored message and notify subscribers with `message:delete`.
pub fn delete_message(st: &mut HubState, del: &MessageDelete) {
    let Some(channel) = st.channels.get_mut(&del.channel) else {
        return;
    };
    channel.delete_history(del.uuid);
    pass_message(st, notification(del.uuid, &del.channel, del.user.as_deref(), "message:delete", Value::Null));
}

/// Deliver an already-built envelope to a channel's subscribers without
/// touching history or the publication counter (presence, state changes).
pub fn broadcast_to_channel(st: &mut HubState, channel: &str, env: &Envelope) {
    let targets = recipients(st, Some(channel), &[]);
    deliver(st, env, &targets);
}

/// Recipient connections, deduplicated by connection id, channel subscribers
/// first then private recipients.
fn recipients(st: &HubState, channel: Option<&str>, pm_users: &[String]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    if let Some(channel) = channel.and_then(|name| st.lookup_channel(name)) {
        for id in channel.conn_ids() {
            if seen.insert(id) {
                out.push(id);
            }
        }
    }
    for username in pm_users {
        if let Some(user) = st.lookup_user(username) {
            for id in user.connections() {
                if seen.insert(*id) {
                    out.push(*id);
                }
            }
        }
    }
    out
}

/// Enqueue the delivered projection on each recipient. A recipient dropped
/// mid-operation never aborts delivery to the rest.
fn deliver(st: &mut HubState, env: &Envelope, targets: &[Uuid]) {
    let delivered = env.delivered();
    for id in targets {
        if let Some(conn) = st.connections.get_mut(id) {
            conn.enqueue(vec![delivered.clone()]);
            st.stats.total_messages += 1;
        }
    }
}

fn notification(uuid: Uuid, channel: &str, user: Option<&str>, kind: &str, message: Value) -> Envelope {
    Envelope {
        uuid: Some(uuid),
        timestamp: Some(now_rfc3339()),
        kind: kind.to_string(),
        user: user.unwrap_or("system").to_string(),
        channel: Some(channel.to_string()),
        pm_users: Vec::new(),
        message,
        no_history: true,
        extra: serde_json::Map::new(),
    }
}
