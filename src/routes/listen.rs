use rocket::http::{ContentType, Status};
use rocket::serde::json::Json;
use rocket::{get, post, State};
use tokio::time::timeout;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::envelope::Envelope;
use crate::models::DisconnectBody;
use crate::ops;
use crate::registry::Registry;

/// Long-poll delivery endpoint. Attaches a fresh queue (flushing catch-up),
/// blocks up to the primary wait for the first batch, then keeps pulling
/// with a short tail timeout so bursts coalesce into one response.
///
/// Unknown connection ids are a 401: the session is gone, not forbidden.
#[get("/listen?<conn_id>&<callback>")]
pub async fn listen(
    registry: &State<Registry>,
    config: &State<ServerConfig>,
    conn_id: &str,
    callback: Option<&str>,
) -> Result<(ContentType, String), Status> {
    let conn_id = Uuid::parse_str(conn_id).map_err(|_| Status::Unauthorized)?;
    let mut rx = {
        let mut st = registry.lock();
        let conn = st
            .connections
            .get_mut(&conn_id)
            .ok_or(Status::Unauthorized)?;
        conn.attach_queue()
    };

    let mut messages: Vec<Envelope> = Vec::new();
    // Primary wait: first batch or wake-up timeout. A closed queue (the
    // connection was reaped mid-wait) just ends the poll.
    if let Ok(Some(batch)) = timeout(config.wake_timeout(), rx.recv()).await {
        messages.extend(batch);
    }
    // Drain window: stop on the first empty pull.
    while let Ok(Some(batch)) = timeout(config.drain_timeout(), rx.recv()).await {
        messages.extend(batch);
    }

    {
        let mut st = registry.lock();
        if let Some(conn) = st.connections.get_mut(&conn_id) {
            conn.mark_activity();
        }
    }

    let body = serde_json::to_string(&messages).map_err(|_| Status::InternalServerError)?;
    Ok(match callback {
        Some(cb) => (ContentType::JavaScript, format!("{cb}({body})")),
        None => (ContentType::JSON, body),
    })
}

/// Client-initiated teardown, no permission required.
#[get("/disconnect?<conn_id>")]
pub fn disconnect_get(registry: &State<Registry>, conn_id: &str) -> Result<Json<bool>, Status> {
    drop_connection(registry, Some(conn_id))
}

#[post("/disconnect", format = "json", data = "<body>")]
pub fn disconnect_post(
    registry: &State<Registry>,
    body: Json<DisconnectBody>,
) -> Result<Json<bool>, Status> {
    drop_connection(registry, body.conn_id.as_deref())
}

fn drop_connection(registry: &Registry, conn_id: Option<&str>) -> Result<Json<bool>, Status> {
    let conn_id = conn_id
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or(Status::Unauthorized)?;
    let mut st = registry.lock();
    if ops::disconnect(&mut st, conn_id) {
        Ok(Json(true))
    } else {
        Err(Status::Unauthorized)
    }
}
