use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// UTC timestamp in the wire format used everywhere (RFC 3339).
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn default_kind() -> String {
    "message".to_string()
}

fn default_user() -> String {
    "system".to_string()
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A single routed message record. Publishers may supply `uuid` and
/// `timestamp`; the server assigns them on acceptance. Keys beyond the typed
/// fields round-trip through `extra` untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pm_users: Vec<String>,
    #[serde(default)]
    pub message: Value,
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_history: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    /// True when the envelope names at least one routing target.
    pub fn routable(&self) -> bool {
        self.channel.is_some() || !self.pm_users.is_empty()
    }

    /// Fill in the server-assigned identity fields the publisher left out.
    pub fn assign_identity(&mut self) {
        if self.uuid.is_none() {
            self.uuid = Some(Uuid::new_v4());
        }
        if self.timestamp.is_none() {
            self.timestamp = Some(now_rfc3339());
        }
    }

    /// The copy handed to recipients: routing-private fields stripped,
    /// everything else identical.
    pub fn delivered(&self) -> Envelope {
        let mut env = self.clone();
        env.pm_users = Vec::new();
        env.no_history = false;
        env
    }

    /// Join/part notification for a channel. Carries the user list when the
    /// channel is configured to broadcast it.
    pub fn presence(user: &str, channel: &str, action: &str, users: Option<Vec<String>>) -> Envelope {
        let mut extra = Map::new();
        extra.insert("action".to_string(), json!(action));
        if let Some(users) = users {
            extra.insert("users".to_string(), json!(users));
        }
        Envelope {
            uuid: Some(Uuid::new_v4()),
            timestamp: Some(now_rfc3339()),
            kind: "presence".to_string(),
            user: user.to_string(),
            channel: Some(channel.to_string()),
            pm_users: Vec::new(),
            message: json!({ "action": action }),
            no_history: true,
            extra,
        }
    }

    /// Notification that a user's state changed. `channel` is filled in per
    /// target channel at broadcast time.
    pub fn user_state_change(
        user: &str,
        public_state: Map<String, Value>,
        changed: Map<String, Value>,
    ) -> Envelope {
        Envelope {
            uuid: Some(Uuid::new_v4()),
            timestamp: Some(now_rfc3339()),
            kind: "user_state_change".to_string(),
            user: user.to_string(),
            channel: None,
            pm_users: Vec::new(),
            message: json!({ "state": public_state, "changed": changed }),
            no_history: true,
            extra: Map::new(),
        }
    }
}
