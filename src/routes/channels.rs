use std::collections::HashMap;

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{post, State};

use crate::channel::ChannelConfig;
use crate::models::{InfoBody, InfoConfig, InfoResponse};
use crate::ops;
use crate::registry::Registry;

use super::{validation_error, Secret};

/// Apply configuration to the named channels, creating missing ones.
/// Returns their info without history or user lists.
#[post("/channel_config", format = "json", data = "<body>")]
pub fn channel_config(
    registry: &State<Registry>,
    _secret: Secret,
    body: Json<HashMap<String, ChannelConfig>>,
) -> Result<Json<InfoResponse>, (Status, Json<serde_json::Value>)> {
    let configs = body.into_inner();
    if configs.keys().any(|name| name.trim().is_empty()) {
        return Err(validation_error("channels", "channel names must not be empty"));
    }

    let mut st = registry.lock();
    let names = ops::set_channel_config(&mut st, &configs);
    let opts = InfoConfig {
        include_history: false,
        include_users: false,
        ..InfoConfig::default()
    };
    Ok(Json(ops::channels_info(&st, Some(&names), &opts)))
}

/// Aggregate read endpoint. An empty or missing body returns every channel
/// with full detail.
#[post("/info", data = "<body>")]
pub fn info(
    registry: &State<Registry>,
    _secret: Secret,
    body: Option<Json<InfoBody>>,
) -> Json<InfoResponse> {
    let opts = body.map(|b| b.into_inner().info).unwrap_or_default();
    let st = registry.lock();
    Json(ops::channels_info(&st, opts.channels.as_deref(), &opts))
}
