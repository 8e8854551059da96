use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::channel::ChannelConfig;
use crate::envelope::Envelope;

fn default_true() -> bool {
    true
}

/// Options controlling how much detail channel-info responses include.
#[derive(Debug, Clone, Deserialize)]
pub struct InfoConfig {
    #[serde(default)]
    pub channels: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub include_history: bool,
    #[serde(default = "default_true")]
    pub include_users: bool,
    #[serde(default)]
    pub include_connections: bool,
    #[serde(default)]
    pub exclude_channels: Vec<String>,
    #[serde(default)]
    pub return_public_state: bool,
}

impl Default for InfoConfig {
    fn default() -> Self {
        InfoConfig {
            channels: None,
            include_history: true,
            include_users: true,
            include_connections: false,
            exclude_channels: Vec::new(),
            return_public_state: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConnectBody {
    pub username: String,
    #[serde(default)]
    pub conn_id: Option<Uuid>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub channel_configs: HashMap<String, ChannelConfig>,
    /// Initial state, applied only when the user is newly created.
    #[serde(default)]
    pub fresh_user_state: Map<String, Value>,
    /// Patch merged into the state of an existing user.
    #[serde(default)]
    pub user_state: Map<String, Value>,
    /// When present (an empty list is a valid value), replaces the public
    /// projection keys.
    #[serde(default)]
    pub state_public_keys: Option<Vec<String>>,
    #[serde(default)]
    pub info: InfoConfig,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub conn_id: Uuid,
    pub state: Map<String, Value>,
    pub public_state: Map<String, Value>,
    pub username: String,
    pub channels: Vec<String>,
    pub channels_info: InfoResponse,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
    pub conn_id: Uuid,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub channel_configs: HashMap<String, ChannelConfig>,
    #[serde(default)]
    pub info: InfoConfig,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub channels: Vec<String>,
    pub channels_info: InfoResponse,
    pub subscribed_to: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeBody {
    pub conn_id: Uuid,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub info: InfoConfig,
}

#[derive(Debug, Serialize)]
pub struct UnsubscribeResponse {
    pub channels: Vec<String>,
    pub channels_info: InfoResponse,
    pub unsubscribed_from: Vec<String>,
}

/// One entry of a PATCH `/message` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEdit {
    pub uuid: Uuid,
    pub channel: String,
    pub message: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// One entry of a DELETE `/message` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDelete {
    pub uuid: Uuid,
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserStateBody {
    pub user: String,
    #[serde(default)]
    pub user_state: Map<String, Value>,
    #[serde(default)]
    pub state_public_keys: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct UserStateResponse {
    pub user_state: Map<String, Value>,
    pub changed_state: Vec<String>,
    pub public_keys: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InfoBody {
    #[serde(default)]
    pub info: InfoConfig,
}

/// Kept as a raw string so garbage ids turn into 401, not 422.
#[derive(Debug, Deserialize)]
pub struct DisconnectBody {
    #[serde(default)]
    pub conn_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChannelInfo {
    pub name: String,
    pub settings: ChannelConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Envelope>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<String>>,
    pub created: String,
    pub last_active: String,
    pub total_connections: usize,
    pub total_users: usize,
}

/// A user's row in an info response. `state` is the public projection when
/// the request asked for it.
#[derive(Debug, Serialize)]
pub struct UserStateEntry {
    pub user: String,
    pub state: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub channels: BTreeMap<String, ChannelInfo>,
    pub users: Vec<UserStateEntry>,
}

/// Per-user view used by `/admin/json`.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub user: String,
    pub state: Map<String, Value>,
    pub public_state: Map<String, Value>,
    pub last_active: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<Uuid>>,
}
