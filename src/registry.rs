use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::channel::{Channel, ChannelConfig};
use crate::connection::Connection;
use crate::user::User;

/// Process-wide counters.
#[derive(Debug)]
pub struct Stats {
    pub started_on: DateTime<Utc>,
    /// Fan-out deliveries (one per recipient connection).
    pub total_messages: u64,
    /// Accepted publications.
    pub total_unique_messages: u64,
}

/// Everything the server knows, guarded by one coarse lock: the channel,
/// user and connection tables plus counters. Mutators take `&mut HubState`;
/// the lock is never held across an await.
#[derive(Debug)]
pub struct HubState {
    pub channels: HashMap<String, Channel>,
    pub users: HashMap<String, User>,
    pub connections: HashMap<Uuid, Connection>,
    pub stats: Stats,
}

impl HubState {
    fn new() -> Self {
        HubState {
            channels: HashMap::new(),
            users: HashMap::new(),
            connections: HashMap::new(),
            stats: Stats {
                started_on: Utc::now(),
                total_messages: 0,
                total_unique_messages: 0,
            },
        }
    }

    /// Pure lookups — never create.
    pub fn lookup_channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    pub fn lookup_user(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    pub fn lookup_connection(&self, id: Uuid) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Fetch a channel, creating it (with `config`, when given) on first use.
    pub fn get_or_create_channel(
        &mut self,
        name: &str,
        config: Option<&ChannelConfig>,
    ) -> &mut Channel {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| Channel::new(name, config.cloned()))
    }

    /// Fetch a user, creating a blank one on first sight. Returns whether it
    /// was newly created.
    pub fn get_or_create_user(&mut self, username: &str) -> (&mut User, bool) {
        match self.users.entry(username.to_string()) {
            Entry::Occupied(entry) => (entry.into_mut(), false),
            Entry::Vacant(entry) => (entry.insert(User::new(username)), true),
        }
    }
}

/// Handle to the shared state. Cheap to clone; handed to Rocket as managed
/// state and to the GC task. Tests construct an isolated registry each.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Mutex<HubState>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            inner: Arc::new(Mutex::new(HubState::new())),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, HubState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
