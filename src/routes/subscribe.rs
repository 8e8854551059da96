use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{post, State};

use crate::models::{SubscribeBody, SubscribeResponse, UnsubscribeBody, UnsubscribeResponse};
use crate::ops;
use crate::registry::Registry;

use super::{validation_error, Secret};

#[post("/subscribe", format = "json", data = "<body>")]
pub fn subscribe(
    registry: &State<Registry>,
    _secret: Secret,
    body: Json<SubscribeBody>,
) -> Result<Json<SubscribeResponse>, (Status, Json<serde_json::Value>)> {
    let body = body.into_inner();
    if body.channels.is_empty() {
        return Err(validation_error("channels", "must not be empty"));
    }
    if body.channels.iter().any(|name| name.trim().is_empty()) {
        return Err(validation_error("channels", "channel names must not be empty"));
    }

    let mut st = registry.lock();
    let Some(mut subscribed_to) =
        ops::subscribe(&mut st, body.conn_id, &body.channels, &body.channel_configs)
    else {
        return Err(validation_error("conn_id", "unknown connection"));
    };
    subscribed_to.sort();

    let channels = current_channels(&st, body.conn_id);
    let channels_info = ops::channels_info(&st, Some(&channels), &body.info);
    Ok(Json(SubscribeResponse {
        channels,
        channels_info,
        subscribed_to,
    }))
}

#[post("/unsubscribe", format = "json", data = "<body>")]
pub fn unsubscribe(
    registry: &State<Registry>,
    _secret: Secret,
    body: Json<UnsubscribeBody>,
) -> Result<Json<UnsubscribeResponse>, (Status, Json<serde_json::Value>)> {
    let body = body.into_inner();

    let mut st = registry.lock();
    let Some(mut unsubscribed_from) = ops::unsubscribe(&mut st, body.conn_id, &body.channels)
    else {
        return Err(validation_error("conn_id", "unknown connection"));
    };
    unsubscribed_from.sort();

    let channels = current_channels(&st, body.conn_id);
    let channels_info = ops::channels_info(&st, Some(&channels), &body.info);
    Ok(Json(UnsubscribeResponse {
        channels,
        channels_info,
        unsubscribed_from,
    }))
}

fn current_channels(st: &crate::registry::HubState, conn_id: uuid::Uuid) -> Vec<String> {
    st.lookup_connection(conn_id)
        .map(|conn| conn.channels.iter().cloned().collect())
        .unwrap_or_default()
}
