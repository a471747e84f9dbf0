use collabedit_server::config::ServerConfig;
use serde_json::json;

use crate::common;

#[tokio::test]
async fn capacity_limit_rejects_members_past_the_configured_max() {
    let port = common::next_port();
    common::spawn_server(ServerConfig {
        port,
        room_max_users: 2,
        ..ServerConfig::default()
    })
    .await;

    let mut a = common::connect(port).await;
    common::send(&mut a, "m1", "create-room", json!({"userName": "Alice"})).await;
    let created = common::recv_event(&mut a, "create-room-ack").await;
    let room_id = created["payload"]["roomId"].as_str().unwrap().to_string();

    let mut b = common::connect(port).await;
    common::send(&mut b, "m2", "join-room", json!({"roomId": room_id})).await;
    let joined = common::recv_event(&mut b, "join-room-ack").await;
    assert_eq!(joined["payload"]["success"], true);

    let mut c = common::connect(port).await;
    common::send(&mut c, "m3", "join-room", json!({"roomId": room_id})).await;
    let rejected = common::recv_event(&mut c, "join-room-error").await;
    assert_eq!(rejected["payload"]["error"], "Room is full");
}

#[tokio::test]
async fn rejoining_the_same_room_does_not_duplicate_membership() {
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

    common::send(&mut a, "m2", "join-room", json!({"roomId": room_id})).await;
    let rejoin = common::recv_event(&mut a, "join-room-ack").await;
    assert_eq!(rejoin["payload"]["users"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn reconnecting_with_a_fresh_session_joins_as_a_new_member() {
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
    common::send(&mut b, "m2", "join-room", json!({"roomId": room_id.clone()})).await;
    let joined = common::recv_event(&mut b, "join-room-ack").await;
    assert_eq!(joined["payload"]["users"].as_array().unwrap().len(), 2);

    drop(b);
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    common::recv_event(&mut a, "user-left").await;

    let mut c = common::connect(port).await;
    common::send(&mut c, "m3", "join-room", json!({"roomId": room_id})).await;
    let rejoined = common::recv_event(&mut c, "join-room-ack").await;
    assert_eq!(rejoined["payload"]["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn disconnecting_the_last_member_removes_the_room() {
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

    drop(a);
    // give the gateway task time to observe the closed socket and run
    // `Session::disconnect`.
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    let (status, _) = common::http_get(port, &format!("/room/{room_id}")).await;
    assert_eq!(status, 404);
}
