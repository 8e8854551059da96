use rocket::serde::json::Json;
use rocket::{catch, get, State};

use crate::models::InfoConfig;
use crate::ops;
use crate::registry::Registry;

use super::Secret;

#[get("/health")]
pub fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Server snapshot for admin tooling: counters plus full channel and user
/// detail, connections included.
#[get("/admin/json")]
pub fn admin_json(registry: &State<Registry>, _secret: Secret) -> Json<serde_json::Value> {
    let st = registry.lock();

    let uptime_secs = (chrono::Utc::now() - st.stats.started_on).num_seconds().max(0);
    let uptime = format!(
        "{}:{:02}:{:02}",
        uptime_secs / 3600,
        (uptime_secs % 3600) / 60,
        uptime_secs % 60
    );

    let active_users: Vec<&crate::user::User> =
        st.users.values().filter(|user| user.has_connections()).collect();
    let total_connections: usize = active_users.iter().map(|user| user.connections().len()).sum();

    let opts = InfoConfig {
        include_connections: true,
        ..InfoConfig::default()
    };
    let channels_info = ops::channels_info(&st, None, &opts);

    Json(serde_json::json!({
        "remembered_user_count": st.users.len(),
        "unique_user_count": active_users.len(),
        "total_connections": total_connections,
        "total_channels": st.channels.len(),
        "total_messages": st.stats.total_messages,
        "total_unique_messages": st.stats.total_unique_messages,
        "channels": channels_info.channels,
        "users": active_users.iter().map(|user| user.get_info(true)).collect::<Vec<_>>(),
        "uptime": uptime,
    }))
}

// --- Catchers ---

#[catch(401)]
pub fn unauthorized() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": "Unknown connection"}))
}

#[catch(403)]
pub fn forbidden() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": "Access denied"}))
}

#[catch(404)]
pub fn not_found() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": "Not found"}))
}

#[catch(422)]
pub fn unprocessable() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": "Malformed request body"}))
}
