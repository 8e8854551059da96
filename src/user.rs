use serde_json::{Map, Value};
use uuid::Uuid;

use crate::envelope::now_rfc3339;
use crate::models::UserInfo;

/// A logical identity, potentially holding several live connections at once.
/// Users stay in the registry ("remembered") after their last connection
/// drops; only their channel memberships go away.
#[derive(Debug)]
pub struct User {
    pub username: String,
    pub state: Map<String, Value>,
    pub state_public_keys: Vec<String>,
    connections: Vec<Uuid>,
    pub last_active: String,
}

impl User {
    pub fn new(username: &str) -> Self {
        User {
            username: username.to_string(),
            state: Map::new(),
            state_public_keys: Vec::new(),
            connections: Vec::new(),
            last_active: now_rfc3339(),
        }
    }

    /// Merge a JSON object into the state, key by key; `null` removes a key.
    /// Returns the keys whose value actually changed, with their new value
    /// (`null` = removed).
    pub fn change_state(&mut self, patch: &Map<String, Value>) -> Map<String, Value> {
        let mut changed = Map::new();
        for (key, value) in patch {
            if value.is_null() {
                if self.state.remove(key).is_some() {
                    changed.insert(key.clone(), Value::Null);
                }
            } else if self.state.get(key) != Some(value) {
                self.state.insert(key.clone(), value.clone());
                changed.insert(key.clone(), value.clone());
            }
        }
        if !changed.is_empty() {
            self.last_active = now_rfc3339();
        }
        changed
    }

    /// The slice of state exposed to other users.
    pub fn public_state(&self) -> Map<String, Value> {
        self.state_public_keys
            .iter()
            .filter_map(|key| self.state.get(key).map(|value| (key.clone(), value.clone())))
            .collect()
    }

    pub fn add_connection(&mut self, conn_id: Uuid) {
        if !self.connections.contains(&conn_id) {
            self.connections.push(conn_id);
        }
        self.last_active = now_rfc3339();
    }

    pub fn remove_connection(&mut self, conn_id: Uuid) {
        self.connections.retain(|id| *id != conn_id);
    }

    pub fn connections(&self) -> &[Uuid] {
        &self.connections
    }

    pub fn has_connections(&self) -> bool {
        !self.connections.is_empty()
    }

    pub fn get_info(&self, include_connections: bool) -> UserInfo {
        UserInfo {
            user: self.username.clone(),
            state: self.state.clone(),
            public_state: self.public_state(),
            last_active: self.last_active.clone(),
            connections: include_connections.then(|| self.connections.clone()),
        }
    }
}
