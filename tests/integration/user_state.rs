use rocket::http::{ContentType, Status};
use serde_json::json;

use crate::common::{connect_with, listen, test_client};

fn set_state(client: &rocket::local::blocking::Client, body: serde_json::Value) -> serde_json::Value {
    let res = client
        .post("/user_state")
        .header(ContentType::JSON)
        .body(body.to_string())
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    res.into_json().unwrap()
}

#[test]
fn test_state_merge_reports_changed_keys() {
    let client = test_client();
    connect_with(&client, json!({ "username": "alice" }));

    let body = set_state(
        &client,
        json!({ "user": "alice", "user_state": { "color": "red", "mood": "calm" } }),
    );
    assert_eq!(body["user_state"], json!({ "color": "red", "mood": "calm" }));
    let mut changed: Vec<&str> = body["changed_state"]
        .as_array()
        .unwrap()
        .iter()
        .map(|k| k.as_str().unwrap())
        .collect();
    changed.sort();
    assert_eq!(changed, vec!["color", "mood"]);

    // Setting the same values again changes nothing.
    let body = set_state(
        &client,
        json!({ "user": "alice", "user_state": { "color": "red" } }),
    );
    assert!(body["changed_state"].as_array().unwrap().is_empty());
}

#[test]
fn test_null_removes_a_key() {
    let client = test_client();
    connect_with(
        &client,
        json!({ "username": "alice", "fresh_user_state": { "color": "red" } }),
    );

    let body = set_state(
        &client,
        json!({ "user": "alice", "user_state": { "color": null } }),
    );
    assert_eq!(body["user_state"], json!({}));
    assert_eq!(body["changed_state"], json!(["color"]));
}

#[test]
fn test_public_projection_tracks_state_and_keys() {
    let client = test_client();
    connect_with(
        &client,
        json!({
            "username": "alice",
            "fresh_user_state": { "color": "red", "secret": "x" },
            "state_public_keys": ["color", "missing"],
        }),
    );

    // Projection only lists keys that exist in the state.
    let body = connect_with(&client, json!({ "username": "alice" }));
    assert_eq!(body["public_state"], json!({ "color": "red" }));

    // Swapping the key list through /user_state re-projects.
    let body = set_state(
        &client,
        json!({ "user": "alice", "user_state": {}, "state_public_keys": ["secret"] }),
    );
    assert_eq!(body["public_keys"], json!(["secret"]));
    let body = connect_with(&client, json!({ "username": "alice" }));
    assert_eq!(body["public_state"], json!({ "secret": "x" }));
}

#[test]
fn test_state_change_broadcast_to_notify_state_channels() {
    let client = test_client();
    let bob = connect_with(
        &client,
        json!({
            "username": "bob",
            "channels": ["c"],
            "channel_configs": { "c": { "notify_state": true } },
        }),
    )["conn_id"]
        .as_str()
        .unwrap()
        .to_string();
    connect_with(
        &client,
        json!({
            "username": "alice",
            "channels": ["c"],
            "state_public_keys": ["color"],
        }),
    );
    listen(&client, &bob);

    set_state(
        &client,
        json!({ "user": "alice", "user_state": { "color": "red", "secret": "x" } }),
    );

    let got = listen(&client, &bob);
    assert_eq!(got.len(), 1);
    assert_eq!(got[0]["type"], "user_state_change");
    assert_eq!(got[0]["user"], "alice");
    assert_eq!(got[0]["channel"], "c");
    // The broadcast carries the public projection plus the diff.
    assert_eq!(got[0]["message"]["state"], json!({ "color": "red" }));
    assert_eq!(got[0]["message"]["changed"]["secret"], "x");
}

#[test]
fn test_no_broadcast_without_changes() {
    let client = test_client();
    let bob = connect_with(
        &client,
        json!({
            "username": "bob",
            "channels": ["c"],
            "channel_configs": { "c": { "notify_state": true } },
        }),
    )["conn_id"]
        .as_str()
        .unwrap()
        .to_string();
    connect_with(
        &client,
        json!({ "username": "alice", "channels": ["c"], "fresh_user_state": { "a": 1 } }),
    );
    listen(&client, &bob);

    set_state(&client, json!({ "user": "alice", "user_state": { "a": 1 } }));
    assert!(listen(&client, &bob).is_empty());
}

#[test]
fn test_unknown_user_is_tolerated() {
    let client = test_client();
    let body = set_state(
        &client,
        json!({ "user": "ghost", "user_state": { "a": 1 } }),
    );
    assert_eq!(body["user_state"], json!({ "a": 1 }));
    assert!(body["changed_state"].as_array().unwrap().is_empty());
}
