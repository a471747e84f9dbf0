use collabedit_server::config::ServerConfig;
use serde_json::json;

use crate::common;

#[tokio::test]
async fn created_room_seeds_welcome_document_for_both_members() {
    let port = common::next_port();
    common::spawn_server(ServerConfig {
        port,
        ..ServerConfig::default()
    })
    .await;

    let mut creator = common::connect(port).await;
    common::send(&mut creator, "m1", "create-room", json!({"userName": "Alice"})).await;
    let created = common::recv_event(&mut creator, "create-room-ack").await;
    let room_id = created["payload"]["roomId"].as_str().unwrap().to_string();
    let seed = created["payload"]["document"].as_str().unwrap().to_string();
    assert!(seed.starts_with("// Welcome"));

    let mut joiner = common::connect(port).await;
    common::send(&mut joiner, "m2", "join-room", json!({"roomId": room_id, "userName": "Bob"})).await;
    let joined = common::recv_event(&mut joiner, "join-room-ack").await;
    assert_eq!(joined["payload"]["document"], seed);
    assert_eq!(joined["payload"]["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn insert_from_one_client_propagates_to_the_other() {
    let port = common::next_port();
    common::spawn_server(ServerConfig {
        port,
        ..ServerConfig::default()
    })
    .await;

    let mut a = common::connect(port).await;
    common::send(&mut a, "m1", "create-room", json!({"userName": "Alice"})).await;
    let created = common::recv_event(&mut a, "create-room-ack").await;
    let room_id = created["payload"]["roomId"].as_str().unwrap().to_string();

    let mut b = common::connect(port).await;
    common::send(&mut b, "m2", "join-room", json!({"roomId": room_id})).await;
    common::recv_event(&mut b, "join-room-ack").await;
    // drain the user-joined broadcast `a` receives for `b`'s arrival.
    common::recv_event(&mut a, "user-joined").await;

    common::send(
        &mut a,
        "",
        "document-operation",
        json!({"type": "insert", "position": 0, "content": "X", "id": "op1"}),
    )
    .await;
    let ack = common::recv_event(&mut a, "operation-ack").await;
    assert_eq!(ack["payload"]["operationId"], "op1");

    let update = common::recv_event(&mut b, "document-update").await;
    assert_eq!(update["payload"]["position"], 0);
    assert_eq!(update["payload"]["content"], "X");
}

#[tokio::test]
async fn delete_past_document_end_is_rejected_without_mutation() {
    let port = common::next_port();
    common::spawn_server(ServerConfig {
        port,
        ..ServerConfig::default()
    })
    .await;

    let mut a = common::connect(port).await;
    common::send(&mut a, "m1", "create-room", json!({"userName": "Alice"})).await;
    let created = common::recv_event(&mut a, "create-room-ack").await;
    let room_id = created["payload"]["roomId"].as_str().unwrap().to_string();
    let doc_len = created["payload"]["document"].as_str().unwrap().chars().count();

    common::send(
        &mut a,
        "",
        "document-operation",
        json!({"type": "delete", "position": doc_len, "length": 1, "id": "op1"}),
    )
    .await;
    let error = common::recv_event(&mut a, "operation-error").await;
    assert_eq!(error["payload"]["error"], "Invalid operation");

    let (status, body) = common::http_get(port, &format!("/room/{room_id}")).await;
    assert_eq!(status, 200);
    assert_eq!(body["operationCount"], 0);
}

#[tokio::test]
async fn cursor_position_broadcasts_without_an_ack() {
    let port = common::next_port();
    common::spawn_server(ServerConfig {
        port,
        ..ServerConfig::default()
    })
    .await;

    let mut a = common::connect(port).await;
    common::send(&mut a, "m1", "create-room", json!({"userName": "Alice"})).await;
    let created = common::recv_event(&mut a, "create-room-ack").await;
    let room_id = created["payload"]["roomId"].as_str().unwrap().to_string();

    let mut b = common::connect(port).await;
    common::send(&mut b, "m2", "join-room", json!({"roomId": room_id})).await;
    common::recv_event(&mut b, "join-room-ack").await;
    common::recv_event(&mut a, "user-joined").await;

    common::send(&mut a, "", "cursor-position", json!({"line": 2, "column": 5})).await;
    let update = common::recv_event(&mut b, "cursor-update").await;
    assert_eq!(update["payload"]["position"]["line"], 2);
    assert_eq!(update["payload"]["position"]["column"], 5);
    assert!(update["id"].as_str().unwrap_or_default().is_empty());
}

#[tokio::test]
async fn language_change_broadcasts_without_an_ack() {
    let port = common::next_port();
    common::spawn_server(ServerConfig {
        port,
        ..ServerConfig::default()
    })
    .await;

    let mut a = common::connect(port).await;
    common::send(&mut a, "m1", "create-room", json!({"userName": "Alice"})).await;
    let created = common::recv_event(&mut a, "create-room-ack").await;
    let room_id = created["payload"]["roomId"].as_str().unwrap().to_string();

    let mut b = common::connect(port).await;
    common::send(&mut b, "m2", "join-room", json!({"roomId": room_id})).await;
    common::recv_event(&mut b, "join-room-ack").await;
    common::recv_event(&mut a, "user-joined").await;

    common::send(&mut a, "", "language-change", json!({"language": "rust"})).await;
    let changed = common::recv_event(&mut b, "language-changed").await;
    assert_eq!(changed["payload"]["language"], "rust");
    assert!(changed["id"].as_str().unwrap_or_default().is_empty());
}

#[tokio::test]
async fn request_sync_returns_current_document_and_history() {
    let port = common::next_port();
    common::spawn_server(ServerConfig {
        port,
        ..ServerConfig::default()
    })
    .await;

    let mut a = common::connect(port).await;
    common::send(&mut a, "m1", "create-room", json!({"userName": "Alice"})).await;
    common::recv_event(&mut a, "create-room-ack").await;

    common::send(
        &mut a,
        "",
        "document-operation",
        json!({"type": "insert", "position": 0, "content": "Y", "id": "op1"}),
    )
    .await;
    common::recv_event(&mut a, "operation-ack").await;

    common::send(&mut a, "sync1", "request-sync", serde_json::Value::Null).await;
    let sync = common::recv_event(&mut a, "document-sync").await;
    assert_eq!(sync["id"], "sync1");
    assert_eq!(sync["payload"]["version"], 1);
    assert_eq!(sync["payload"]["operations"].as_array().unwrap().len(), 1);
    assert!(sync["payload"]["document"].as_str().unwrap().starts_with('Y'));
}
