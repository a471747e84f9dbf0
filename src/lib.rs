pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod gateway;
pub mod http;
pub mod identifiers;
pub mod presence;
pub mod protocol;
pub mod registry;
pub mod room;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use rocket_cors::{AllowedOrigins, CorsOptions};

use config::ServerConfig;
use events::EventBus;
use http::ServerStart;
use identifiers::ColorAllocator;
use registry::Registry;

pub fn rocket() -> rocket::Rocket<rocket::Build> {
    build_rocket(ServerConfig::from_env())
}

/// Builds the application with an explicit configuration rather than one
/// read from the environment — used by tests that need deterministic
/// capacity/timeout values (see `tests/integration/common.rs`).
pub fn rocket_with_config(config: ServerConfig) -> rocket::Rocket<rocket::Build> {
    build_rocket(config)
}

fn build_rocket(config: ServerConfig) -> rocket::Rocket<rocket::Build> {
    let registry = Arc::new(Registry::new(config.room_max_users, config.room_history_cap));
    let events = Arc::new(EventBus::new());
    let colors = Arc::new(ColorAllocator::new());
    let start = ServerStart(chrono::Utc::now().timestamp());

    let cors = CorsOptions {
        allowed_origins: AllowedOrigins::some_exact(&[config.cors_origin.clone()]),
        ..Default::default()
    }
    .to_cors()
    .expect("failed to build CORS fairing");

    // Merged into Rocket's figment directly rather than requiring the
    // caller to set `ROCKET_PORT`.
    let figment = rocket::Config::figment().merge(("port", config.port));

    let sweep_registry = registry.clone();
    let idle_timeout_secs = config.room_idle_timeout_secs;
    let sweep_interval_secs = config.sweep_interval_secs;

    rocket::custom(figment)
        .manage(config)
        .manage(registry)
        .manage(events)
        .manage(colors)
        .manage(start)
        .attach(cors)
        .register("/", rocket::catchers![http::not_found])
        .mount(
            "/",
            rocket::routes![http::health, http::get_room, gateway::ws_gateway],
        )
        .attach(rocket::fairing::AdHoc::on_liftoff("Room Sweep", move |_rocket| {
            // Cloning here, rather than moving `sweep_registry` itself,
            // keeps this closure callable more than once (liftoff only
            // ever fires once in practice, but the `Fn` bound doesn't know
            // that).
            let registry = sweep_registry.clone();
            Box::pin(async move {
                tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(Duration::from_secs(sweep_interval_secs));
                    loop {
                        ticker.tick().await;
                        let now = chrono::Utc::now().timestamp();
                        let removed = registry.sweep(now, idle_timeout_secs);
                        if !removed.is_empty() {
                            log::info!("sweep removed {} idle room(s): {:?}", removed.len(), removed);
                        }
                    }
                });
                log::info!("room sweep task started (every {sweep_interval_secs}s)");
            })
        }))
}
