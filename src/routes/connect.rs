use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{post, State};

use crate::models::{ConnectBody, ConnectResponse};
use crate::ops;
use crate::registry::Registry;

use super::{validation_error, Secret};

/// Register a connection for a user and subscribe it to channels, creating
/// both user and channels on first sight.
#[post("/connect", format = "json", data = "<body>")]
pub fn connect(
    registry: &State<Registry>,
    _secret: Secret,
    body: Json<ConnectBody>,
) -> Result<Json<ConnectResponse>, (Status, Json<serde_json::Value>)> {
    let body = body.into_inner();
    let username = body.username.trim().to_string();
    if username.is_empty() {
        return Err(validation_error("username", "must not be empty"));
    }
    if body.channels.iter().any(|name| name.trim().is_empty()) {
        return Err(validation_error("channels", "channel names must not be empty"));
    }
    let mut channels = body.channels.clone();
    channels.sort();
    channels.dedup();

    let mut st = registry.lock();
    let (conn_id, state, public_state) = ops::connect(&mut st, &username, &channels, &body);
    let channels_info = ops::channels_info(&st, Some(&channels), &body.info);

    Ok(Json(ConnectResponse {
        conn_id,
        state,
        public_state,
        username,
        channels,
        channels_info,
    }))
}
