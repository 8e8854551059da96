//! Control-plane operations. Each takes the locked state, mutates it, and
//! returns plain data; fan-out side effects ride on `fanout` before the lock
//! is released, so two operations serialized through the registry enqueue in
//! that order for every common recipient.

use std::collections::{BTreeSet, HashMap};

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::channel::ChannelConfig;
use crate::connection::Connection;
use crate::envelope::Envelope;
use crate::fanout;
use crate::models::{ConnectBody, InfoConfig, InfoResponse, UserStateEntry};
use crate::registry::HubState;

pub struct StateChangeOutcome {
    pub user_state: Map<String, Value>,
    pub changed_keys: Vec<String>,
    pub public_keys: Vec<String>,
}

/// Create-or-fetch the user, apply its state, create the connection and
/// subscribe it everywhere. Returns (conn id, state, public state).
pub fn connect(
    st: &mut HubState,
    username: &str,
    channels: &[String],
    body: &ConnectBody,
) -> (Uuid, Map<String, Value>, Map<String, Value>) {
    let conn_id = body.conn_id.unwrap_or_else(Uuid::new_v4);
    // A reused conn id is a clean replace, side effects included.
    if st.connections.contains_key(&conn_id) {
        disconnect(st, conn_id);
    }

    let (user, created) = st.get_or_create_user(username);
    if created {
        user.state = body.fresh_user_state.clone();
    }
    if !body.user_state.is_empty() {
        user.change_state(&body.user_state);
    }
    if let Some(keys) = &body.state_public_keys {
        user.state_public_keys = keys.clone();
    }
    user.add_connection(conn_id);
    let state = user.state.clone();
    let public_state = user.public_state();

    let mut conn = Connection::new(conn_id, username);
    let mut joins = Vec::new();
    for name in channels {
        conn.channels.insert(name.clone());
        let channel = st.get_or_create_channel(name, body.channel_configs.get(name));
        let newly_present = channel.add_connection(username, conn_id);
        if newly_present && channel.config.notify_presence {
            joins.push((name.clone(), join_envelope(channel, username)));
        }
    }
    st.connections.insert(conn_id, conn);

    for (name, env) in joins {
        fanout::broadcast_to_channel(st, &name, &env);
    }
    (conn_id, state, public_state)
}

/// Subscribe a connection to more channels, creating them as needed.
/// Idempotent; returns the channels newly subscribed, or None for an unknown
/// connection.
pub fn subscribe(
    st: &mut HubState,
    conn_id: Uuid,
    channels: &[String],
    channel_configs: &HashMap<String, ChannelConfig>,
) -> Option<Vec<String>> {
    let (username, existing) = {
        let conn = st.lookup_connection(conn_id)?;
        (conn.username.clone(), conn.channels.clone())
    };

    let mut subscribed_to = Vec::new();
    let mut joins = Vec::new();
    for name in channels {
        if existing.contains(name) || subscribed_to.contains(name) {
            continue;
        }
        let channel = st.get_or_create_channel(name, channel_configs.get(name));
        let newly_present = channel.add_connection(&username, conn_id);
        if newly_present && channel.config.notify_presence {
            joins.push((name.clone(), join_envelope(channel, &username)));
        }
        subscribed_to.push(name.clone());
    }
    if let Some(conn) = st.connections.get_mut(&conn_id) {
        conn.channels.extend(subscribed_to.iter().cloned());
    }

    for (name, env) in joins {
        fanout::broadcast_to_channel(st, &name, &env);
    }
    Some(subscribed_to)
}

/// Remove a connection from channels. Idempotent; returns the channels
/// actually left, or None for an unknown connection. Channels left empty are
/// dropped unless salvageable.
pub fn unsubscribe(st: &mut HubState, conn_id: Uuid, channels: &[String]) -> Option<Vec<String>> {
    let username = st.lookup_connection(conn_id)?.username.clone();

    let mut unsubscribed_from = Vec::new();
    let mut parts = Vec::new();
    for name in channels {
        let was_member = st
            .connections
            .get_mut(&conn_id)
            .map(|conn| conn.channels.remove(name))
            .unwrap_or(false);
        if !was_member {
            continue;
        }
        unsubscribed_from.push(name.clone());
        remove_from_channel(st, name, &username, conn_id, &mut parts);
    }

    for (name, env) in parts {
        fanout::broadcast_to_channel(st, &name, &env);
    }
    Some(unsubscribed_from)
}

/// Tear a connection down completely: detach from its user, leave every
/// channel (with part presence where configured), drop empty non-salvageable
/// channels. The user itself is remembered. Returns false when the id is
/// unknown.
pub fn disconnect(st: &mut HubState, conn_id: Uuid) -> bool {
    let Some(conn) = st.connections.remove(&conn_id) else {
        return false;
    };
    if let Some(user) = st.users.get_mut(&conn.username) {
        user.remove_connection(conn_id);
    }

    let mut parts = Vec::new();
    for name in &conn.channels {
        remove_from_channel(st, name, &conn.username, conn_id, &mut parts);
    }
    for (name, env) in parts {
        fanout::broadcast_to_channel(st, &name, &env);
    }
    true
}

/// Merge a state patch into a user and broadcast the diff to every
/// subscribed channel with `notify_state`. Returns None for an unknown user
/// (tolerated, the route echoes the payload).
pub fn change_user_state(
    st: &mut HubState,
    username: &str,
    patch: &Map<String, Value>,
    state_public_keys: Option<&Vec<String>>,
) -> Option<StateChangeOutcome> {
    let (changed, public_state, outcome) = {
        let user = st.users.get_mut(username)?;
        if let Some(keys) = state_public_keys {
            user.state_public_keys = keys.clone();
        }
        let changed = user.change_state(patch);
        let outcome = StateChangeOutcome {
            user_state: user.state.clone(),
            changed_keys: changed.keys().cloned().collect(),
            public_keys: user.state_public_keys.clone(),
        };
        (changed, user.public_state(), outcome)
    };

    if !changed.is_empty() {
        let subscribed: BTreeSet<String> = st
            .connections
            .values()
            .filter(|conn| conn.username == username)
            .flat_map(|conn| conn.channels.iter().cloned())
            .collect();
        let env = Envelope::user_state_change(username, public_state, changed);
        for name in subscribed {
            let notify = st
                .lookup_channel(&name)
                .map(|channel| channel.config.notify_state)
                .unwrap_or(false);
            if !notify {
                continue;
            }
            let mut env = env.clone();
            env.channel = Some(name.clone());
            fanout::broadcast_to_channel(st, &name, &env);
        }
    }
    Some(outcome)
}

/// Apply configuration to the named channels, creating missing ones.
/// Returns the touched names, sorted.
pub fn set_channel_config(
    st: &mut HubState,
    configs: &HashMap<String, ChannelConfig>,
) -> Vec<String> {
    let mut names: Vec<String> = configs.keys().cloned().collect();
    names.sort();
    for name in &names {
        let config = &configs[name];
        let channel = st.get_or_create_channel(name, Some(config));
        channel.apply_config(config.clone());
    }
    names
}

/// Aggregate channel/user view. `req_channels` of None (or empty) means all
/// channels.
pub fn channels_info(
    st: &HubState,
    req_channels: Option<&[String]>,
    opts: &InfoConfig,
) -> InfoResponse {
    let selected: Vec<&crate::channel::Channel> = match req_channels.filter(|names| !names.is_empty()) {
        None => st.channels.values().collect(),
        Some(names) => names.iter().filter_map(|name| st.lookup_channel(name)).collect(),
    };

    let mut channels = std::collections::BTreeMap::new();
    let mut users_to_list = BTreeSet::new();
    for channel in selected {
        if opts.exclude_channels.contains(&channel.name) {
            continue;
        }
        if opts.include_users {
            users_to_list.extend(channel.user_names());
        }
        channels.insert(
            channel.name.clone(),
            channel.get_info(opts.include_history, opts.include_users),
        );
    }

    let users = users_to_list
        .iter()
        .filter_map(|name| st.lookup_user(name))
        .map(|user| UserStateEntry {
            user: user.username.clone(),
            state: if opts.return_public_state {
                user.public_state()
            } else {
                user.state.clone()
            },
            connections: opts.include_connections.then(|| user.connections().to_vec()),
        })
        .collect();

    InfoResponse { channels, users }
}

/// Shared removal path for unsubscribe/disconnect: drop the connection from
/// the channel, queue part presence when the user fully left, delete the
/// channel when empty and not salvageable.
fn remove_from_channel(
    st: &mut HubState,
    name: &str,
    username: &str,
    conn_id: Uuid,
    parts: &mut Vec<(String, Envelope)>,
) {
    let mut drop_channel = false;
    if let Some(channel) = st.channels.get_mut(name) {
        let (user_left, now_empty) = channel.remove_connection(username, conn_id);
        if user_left && channel.config.notify_presence {
            let users = channel
                .config
                .broadcast_presence_with_user_lists
                .then(|| channel.user_names());
            parts.push((name.to_string(), Envelope::presence(username, name, "parted", users)));
        }
        drop_channel = now_empty && !channel.config.salvageable;
    }
    if drop_channel {
        st.channels.remove(name);
    }
}

fn join_envelope(channel: &crate::channel::Channel, username: &str) -> Envelope {
    let users = channel
        .config
        .broadcast_presence_with_user_lists
        .then(|| channel.user_names());
    Envelope::presence(username, &channel.name, "joined", users)
}
