use collabedit_server::config::ServerConfig;
use serde_json::json;

use crate::common;

#[test]
fn health_reports_zero_rooms_on_a_fresh_server() {
    let client = common::blocking_client();
    let response = client.get("/health").dispatch();
    assert_eq!(response.status(), rocket::http::Status::Ok);

    let body: serde_json::Value = response.into_json().expect("json body");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["server"]["rooms"], 0);
    assert!(body["rooms"].as_array().unwrap().is_empty());
}

#[test]
fn unknown_room_reports_not_found() {
    let client = common::blocking_client();
    let response = client.get("/room/ZZZZZZ").dispatch();
    assert_eq!(response.status(), rocket::http::Status::NotFound);
}

#[test]
fn unknown_path_reports_not_found_body() {
    let client = common::blocking_client();
    let response = client.get("/nope").dispatch();
    assert_eq!(response.status(), rocket::http::Status::NotFound);
    let body: serde_json::Value = response.into_json().expect("json body");
    assert_eq!(body, json!({"error": "Not found"}));
}

#[tokio::test]
async fn room_introspection_reflects_live_membership_and_history() {
    let port = common::next_port();
    common::spawn_server(ServerConfig {
        port,
        ..ServerConfig::default()
    })
    .await;

    let mut ws = common::connect(port).await;
    common::send(&mut ws, "m1", "create-room", json!({"userName": "Alice"})).await;
    let created = common::recv_event(&mut ws, "create-room-ack").await;
    let room_id = created["payload"]["roomId"].as_str().unwrap().to_string();

    common::send(
        &mut ws,
        "m2",
        "document-operation",
        json!({"type": "insert", "position": 0, "content": "X", "id": "op1"}),
    )
    .await;
    common::recv_event(&mut ws, "operation-ack").await;

    let (status, body) = common::http_get(port, &format!("/room/{room_id}")).await;
    assert_eq!(status, 200);
    assert_eq!(body["id"], room_id);
    assert_eq!(body["userCount"], 1);
    assert_eq!(body["users"].as_array().unwrap().len(), 1);
    assert_eq!(body["recentOperations"].as_array().unwrap().len(), 1);

    let (health_status, health_body) = common::http_get(port, "/health").await;
    assert_eq!(health_status, 200);
    assert_eq!(health_body["server"]["rooms"], 1);
}
