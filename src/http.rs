//! Read-only HTTP introspection surface. Unauthenticated by design; these
//! handlers read the registry directly rather than reusing any of the
//! WebSocket dispatch machinery.

use std::sync::Arc;

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{catch, get, State};
use serde_json::{json, Value};

use crate::config::ServerConfig;
use crate::registry::Registry;

/// Wall-clock timestamp (epoch seconds) the server booted at, used to
/// compute `GET /health`'s `server.uptime`.
pub struct ServerStart(pub i64);

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Best-effort resident memory usage in kilobytes. Returns `0` where
/// `/proc/self/status` isn't available (non-Linux) rather than pulling in
/// a platform crate this server has no other reason to depend on.
fn resident_memory_kb() -> u64 {
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| {
            status.lines().find_map(|line| {
                line.strip_prefix("VmRSS:").map(|rest| {
                    rest.trim()
                        .trim_end_matches(" kB")
                        .trim()
                        .parse::<u64>()
                        .unwrap_or(0)
                })
            })
        })
        .unwrap_or(0)
}

#[get("/health")]
pub fn health(
    registry: &State<Arc<Registry>>,
    config: &State<ServerConfig>,
    start: &State<ServerStart>,
) -> Json<Value> {
    let now = now();
    let rooms: Vec<Value> = registry
        .all_rooms()
        .iter()
        .map(|room| {
            let guard = room.lock().unwrap_or_else(|e| e.into_inner());
            serde_json::to_value(guard.stats(now, config.room_stats_active_window_secs))
                .unwrap_or(Value::Null)
        })
        .collect();

    Json(json!({
        "status": "ok",
        "timestamp": now,
        "server": {
            "uptime": (now - start.0).max(0),
            "memory": resident_memory_kb(),
            "rooms": rooms.len(),
        },
        "rooms": rooms,
    }))
}

/// `id` is case-insensitive, same as the gateway's `join-room` lookup.
#[get("/room/<id>")]
pub fn get_room(
    id: &str,
    registry: &State<Arc<Registry>>,
    config: &State<ServerConfig>,
) -> Result<Json<Value>, Status> {
    let room = registry.get(id).ok_or(Status::NotFound)?;
    let now = now();
    let guard = room.lock().unwrap_or_else(|e| e.into_inner());

    let mut body = serde_json::to_value(guard.stats(now, config.room_stats_active_window_secs))
        .unwrap_or(Value::Null);
    let users: Vec<Value> = guard
        .user_list(now, config.presence_active_window_secs)
        .iter()
        .map(|(p, active)| serde_json::to_value(p.to_view(*active)).unwrap_or(Value::Null))
        .collect();
    let recent_operations = guard.recent_history(10);

    if let Value::Object(ref mut map) = body {
        map.insert("users".into(), json!(users));
        map.insert("recentOperations".into(), json!(recent_operations));
    }

    Ok(Json(body))
}

#[catch(404)]
pub fn not_found() -> Json<Value> {
    Json(json!({"error": "Not found"}))
}
