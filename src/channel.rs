use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::envelope::{now_rfc3339, Envelope};
use crate::models::ChannelInfo;

fn default_history_size() -> usize {
    10
}

/// Per-channel behavior switches. Applied when a channel is first created
/// (connect/subscribe may pass configs, used only on creation) or explicitly
/// through `/channel_config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub notify_presence: bool,
    #[serde(default)]
    pub notify_state: bool,
    #[serde(default)]
    pub broadcast_presence_with_user_lists: bool,
    #[serde(default)]
    pub store_history: bool,
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    #[serde(default)]
    pub salvageable: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            notify_presence: false,
            notify_state: false,
            broadcast_presence_with_user_lists: false,
            store_history: false,
            history_size: default_history_size(),
            salvageable: false,
        }
    }
}

/// A named fan-out group: who is subscribed (per user, with their connection
/// ids) plus a bounded message history.
#[derive(Debug)]
pub struct Channel {
    pub name: String,
    pub config: ChannelConfig,
    connections: BTreeMap<String, Vec<Uuid>>,
    history: VecDeque<Envelope>,
    pub created: String,
    pub last_active: String,
}

impl Channel {
    pub fn new(name: &str, config: Option<ChannelConfig>) -> Self {
        let now = now_rfc3339();
        Channel {
            name: name.to_string(),
            config: config.unwrap_or_default(),
            connections: BTreeMap::new(),
            history: VecDeque::new(),
            created: now.clone(),
            last_active: now,
        }
    }

    /// Subscribe a connection. Returns true when this made the user present
    /// on the channel (their first connection here).
    pub fn add_connection(&mut self, username: &str, conn_id: Uuid) -> bool {
        let conns = self.connections.entry(username.to_string()).or_default();
        let newly_present = conns.is_empty();
        if !conns.contains(&conn_id) {
            conns.push(conn_id);
        }
        newly_present
    }

    /// Drop a connection. Returns (user fully left, channel now empty).
    pub fn remove_connection(&mut self, username: &str, conn_id: Uuid) -> (bool, bool) {
        let mut user_left = false;
        if let Some(conns) = self.connections.get_mut(username) {
            conns.retain(|id| *id != conn_id);
            if conns.is_empty() {
                self.connections.remove(username);
                user_left = true;
            }
        }
        (user_left, self.connections.is_empty())
    }

    /// Every subscribed connection id, grouped by user.
    pub fn conn_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.connections.values().flatten().copied()
    }

    /// Users currently present, sorted.
    pub fn user_names(&self) -> Vec<String> {
        self.connections.keys().cloned().collect()
    }

    pub fn total_connections(&self) -> usize {
        self.connections.values().map(Vec::len).sum()
    }

    pub fn total_users(&self) -> usize {
        self.connections.len()
    }

    pub fn touch(&mut self) {
        self.last_active = now_rfc3339();
    }

    /// Store an envelope, evicting from the front to stay within
    /// `history_size`. No-op for transient envelopes or channels that keep
    /// no history.
    pub fn append_history(&mut self, env: &Envelope) {
        if !self.config.store_history || env.no_history {
            return;
        }
        self.history.push_back(env.delivered());
        self.trim_history();
    }

    /// Replace the payload of the stored envelope with this uuid, in place.
    pub fn edit_history(&mut self, uuid: Uuid, message: &Value) -> bool {
        for env in self.history.iter_mut() {
            if env.uuid == Some(uuid) {
                env.message = message.clone();
                return true;
            }
        }
        false
    }

    pub fn delete_history(&mut self, uuid: Uuid) -> bool {
        let before = self.history.len();
        self.history.retain(|env| env.uuid != Some(uuid));
        before != self.history.len()
    }

    /// Reconfigure in place. A shrunken `history_size` takes effect
    /// immediately.
    pub fn apply_config(&mut self, config: ChannelConfig) {
        self.config = config;
        self.trim_history();
    }

    fn trim_history(&mut self) {
        while self.history.len() > self.config.history_size {
            self.history.pop_front();
        }
    }

    pub fn get_info(&self, include_history: bool, include_users: bool) -> ChannelInfo {
        ChannelInfo {
            name: self.name.clone(),
            settings: self.config.clone(),
            history: include_history.then(|| self.history.iter().cloned().collect()),
            users: include_users.then(|| self.user_names()),
            created: self.created.clone(),
            last_active: self.last_active.clone(),
            total_connections: self.total_connections(),
            total_users: self.total_users(),
        }
    }
}
