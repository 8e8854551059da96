use rocket::serde::json::Json;
use rocket::{post, State};

use crate::models::{UserStateBody, UserStateResponse};
use crate::ops;
use crate::registry::Registry;

use super::Secret;

/// Mutate a user's state (and optionally its public-key projection). Changed
/// keys are broadcast to subscribed channels with `notify_state`. Unknown
/// users are tolerated: the payload is echoed back and nothing happens.
#[post("/user_state", format = "json", data = "<body>")]
pub fn user_state(
    registry: &State<Registry>,
    _secret: Secret,
    body: Json<UserStateBody>,
) -> Json<UserStateResponse> {
    let body = body.into_inner();
    let mut st = registry.lock();
    match ops::change_user_state(
        &mut st,
        &body.user,
        &body.user_state,
        body.state_public_keys.as_ref(),
    ) {
        Some(outcome) => Json(UserStateResponse {
            user_state: outcome.user_state,
            changed_state: outcome.changed_keys,
            public_keys: outcome.public_keys,
        }),
        None => Json(UserStateResponse {
            user_state: body.user_state,
            changed_state: Vec::new(),
            public_keys: body.state_public_keys.unwrap_or_default(),
        }),
    }
}
