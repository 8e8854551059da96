use rocket::serde::json::Json;
use rocket::{delete, patch, post, State};

use crate::envelope::Envelope;
use crate::fanout;
use crate::models::{MessageDelete, MessageEdit};
use crate::registry::Registry;

use super::Secret;

/// Accept a batch of publications. Entries routable to nothing are dropped;
/// the rest get their server identity here, so the echoed payload carries
/// it, and fan out in the background.
#[post("/message", format = "json", data = "<body>")]
pub fn message_post(
    registry: &State<Registry>,
    _secret: Secret,
    body: Json<Vec<Envelope>>,
) -> Json<Vec<Envelope>> {
    let mut accepted: Vec<Envelope> = body
        .into_inner()
        .into_iter()
        .filter(|env| env.routable())
        .collect();
    for env in &mut accepted {
        env.assign_identity();
    }

    let registry = registry.inner().clone();
    let batch = accepted.clone();
    rocket::tokio::spawn(async move {
        let mut st = registry.lock();
        for env in batch {
            fanout::pass_message(&mut st, env);
        }
    });

    Json(accepted)
}

/// Edit stored messages in place and notify their channels.
#[patch("/message", format = "json", data = "<body>")]
pub fn message_patch(
    registry: &State<Registry>,
    _secret: Secret,
    body: Json<Vec<MessageEdit>>,
) -> Json<Vec<MessageEdit>> {
    let edits = body.into_inner();

    let registry = registry.inner().clone();
    let batch = edits.clone();
    rocket::tokio::spawn(async move {
        let mut st = registry.lock();
        for edit in &batch {
            fanout::edit_message(&mut st, edit);
        }
    });

    Json(edits)
}

/// Remove stored messages and notify their channels.
#[delete("/message", format = "json", data = "<body>")]
pub fn message_delete(
    registry: &State<Registry>,
    _secret: Secret,
    body: Json<Vec<MessageDelete>>,
) -> Json<Vec<MessageDelete>> {
    let deletes = body.into_inner();

    let registry = registry.inner().clone();
    let batch = deletes.clone();
    rocket::tokio::spawn(async move {
        let mut st = registry.lock();
        for del in &batch {
            fanout::delete_message(&mut st, del);
        }
    });

    Json(deletes)
}
