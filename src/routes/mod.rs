// Route module decomposition — each endpoint family in its own file.
// Shared request guards live here; route functions in submodules.

mod channels;
#[path = "connect.rs"]
mod connect_impl;
#[path = "listen.rs"]
mod listen_impl;
mod messages;
#[path = "subscribe.rs"]
mod subscribe_impl;
mod system;
#[path = "user_state.rs"]
mod user_state_impl;

// --- Re-exports (all route functions and catchers used by lib.rs mount) ---

pub use channels::{channel_config, info};
pub use connect_impl::connect;
pub use listen_impl::{disconnect_get, disconnect_post, listen};
pub use messages::{message_delete, message_patch, message_post};
pub use subscribe_impl::{subscribe, unsubscribe};
pub use system::{admin_json, forbidden, health, not_found, unauthorized, unprocessable};
pub use user_state_impl::user_state;

use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::serde::json::Json;

use crate::config::ServerConfig;

/// Shared-secret guard for the privileged control plane. Checks the
/// `X-Channelstream-Secret` header against the configured secret; when no
/// secret is configured every request passes (open/dev mode).
pub struct Secret;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Secret {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let expected = req
            .rocket()
            .state::<ServerConfig>()
            .and_then(|config| config.secret.as_deref());
        match expected {
            None => Outcome::Success(Secret),
            Some(expected) => match req.headers().get_one("X-Channelstream-Secret") {
                Some(got) if got == expected => Outcome::Success(Secret),
                _ => Outcome::Error((Status::Forbidden, ())),
            },
        }
    }
}

/// Field-level validation failure, shared by the control-plane routes.
pub(crate) fn validation_error(
    field: &str,
    message: &str,
) -> (Status, Json<serde_json::Value>) {
    (
        Status::BadRequest,
        Json(serde_json::json!({ "errors": { field: message } })),
    )
}
