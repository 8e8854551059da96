use rocket::http::{ContentType, Status};
use serde_json::json;

use crate::common::{channel_info, connect, connect_with, listen, publish, test_client};

#[test]
fn test_info_defaults_include_history_and_users() {
    let client = test_client();
    let a = connect_with(
        &client,
        json!({
            "username": "alice",
            "channels": ["c"],
            "channel_configs": { "c": { "store_history": true } },
        }),
    )["conn_id"]
        .as_str()
        .unwrap()
        .to_string();
    publish(&client, json!([{ "channel": "c", "user": "alice", "message": { "text": "hi" } }]));
    assert_eq!(listen(&client, &a).len(), 1);

    // Empty body: every channel, full detail.
    let res = client.post("/info").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let info: serde_json::Value = res.into_json().unwrap();
    let chan = &info["channels"]["c"];
    assert_eq!(chan["history"].as_array().unwrap().len(), 1);
    assert_eq!(chan["users"], json!(["alice"]));
    assert_eq!(chan["total_users"], 1);
    assert_eq!(chan["total_connections"], 1);
    assert_eq!(info["users"][0]["user"], "alice");
}

#[test]
fn test_info_channel_filter_and_exclusion() {
    let client = test_client();
    connect(&client, "alice", &["c1", "c2", "c3"]);

    let info = channel_info(&client, &["c1", "c2"]);
    assert_eq!(info["channels"].as_object().unwrap().len(), 2);

    let res = client
        .post("/info")
        .header(ContentType::JSON)
        .body(json!({ "info": { "exclude_channels": ["c1"] } }).to_string())
        .dispatch();
    let info: serde_json::Value = res.into_json().unwrap();
    let channels = info["channels"].as_object().unwrap();
    assert!(!channels.contains_key("c1"));
    assert!(channels.contains_key("c2"));
    assert!(channels.contains_key("c3"));
}

#[test]
fn test_info_public_state_and_connections_options() {
    let client = test_client();
    connect_with(
        &client,
        json!({
            "username": "alice",
            "channels": ["c"],
            "fresh_user_state": { "color": "red", "secret": "x" },
            "state_public_keys": ["color"],
        }),
    );

    let res = client
        .post("/info")
        .header(ContentType::JSON)
        .body(json!({ "info": { "return_public_state": true, "include_connections": true } }).to_string())
        .dispatch();
    let info: serde_json::Value = res.into_json().unwrap();
    assert_eq!(info["users"][0]["state"], json!({ "color": "red" }));
    assert_eq!(info["users"][0]["connections"].as_array().unwrap().len(), 1);

    // Default: full state, no connection list.
    let info = channel_info(&client, &["c"]);
    assert_eq!(info["users"][0]["state"], json!({ "color": "red", "secret": "x" }));
    assert!(info["users"][0].get("connections").is_none());
}

#[test]
fn test_channel_config_creates_and_reconfigures() {
    let client = test_client();

    // Creates a missing channel.
    let res = client
        .post("/channel_config")
        .header(ContentType::JSON)
        .body(json!({ "c": { "store_history": true, "history_size": 5, "salvageable": true } }).to_string())
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let info: serde_json::Value = res.into_json().unwrap();
    let chan = &info["channels"]["c"];
    assert_eq!(chan["settings"]["history_size"], 5);
    // Config responses skip history and user lists.
    assert!(chan.get("history").is_none());
    assert!(chan.get("users").is_none());

    // Fill some history, then shrink the bound: trimmed immediately.
    let a = connect(&client, "alice", &["c"]);
    let batch: Vec<_> = (1..=5)
        .map(|n| json!({ "channel": "c", "user": "alice", "message": { "n": n } }))
        .collect();
    publish(&client, json!(batch));
    assert_eq!(listen(&client, &a).len(), 5);

    let res = client
        .post("/channel_config")
        .header(ContentType::JSON)
        .body(json!({ "c": { "store_history": true, "history_size": 2, "salvageable": true } }).to_string())
        .dispatch();
    assert_eq!(res.status(), Status::Ok);

    let info = channel_info(&client, &["c"]);
    let history = info["channels"]["c"]["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["message"]["n"], 4);
    assert_eq!(history[1]["message"]["n"], 5);
}

#[test]
fn test_admin_json_snapshot() {
    let client = test_client();
    let a = connect(&client, "alice", &["c"]);
    connect(&client, "alice", &["c"]);
    connect(&client, "bob", &["c"]);
    client.get(format!("/disconnect?conn_id={a}")).dispatch();

    let res = client.get("/admin/json").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["remembered_user_count"], 2);
    assert_eq!(body["unique_user_count"], 2);
    assert_eq!(body["total_connections"], 2);
    assert_eq!(body["total_channels"], 1);
    assert!(body["uptime"].as_str().is_some());
    assert_eq!(body["users"].as_array().unwrap().len(), 2);
}

#[test]
fn test_health() {
    let client = test_client();
    let res = client.get("/health").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["status"], "ok");
}
