//! Server configuration loaded from the environment: parse with a
//! documented default, never fail startup on a missing or malformed
//! variable.

use std::env;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listening port. Merged into Rocket's figment in `build_rocket`.
    pub port: u16,
    /// Hard cap on members per room.
    pub room_max_users: usize,
    /// Bound on a room's operation history.
    pub room_history_cap: usize,
    /// A room idle for longer than this, with no members, is swept.
    pub room_idle_timeout_secs: i64,
    /// Interval between registry sweeps.
    pub sweep_interval_secs: u64,
    /// Window within which a member is considered `isActive`.
    pub presence_active_window_secs: i64,
    /// Window within which a room is considered `isActive` for
    /// `getStats`.
    pub room_stats_active_window_secs: i64,
    /// Allowed cross-origin dev client.
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            room_max_users: 10,
            room_history_cap: 1000,
            room_idle_timeout_secs: 1800,
            sweep_interval_secs: 300,
            presence_active_window_secs: 30,
            room_stats_active_window_secs: 300,
            cors_origin: "http://localhost:5173".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("PORT")
            && let Ok(n) = val.parse::<u16>()
        {
            config.port = n;
        }
        if let Ok(val) = env::var("ROOM_MAX_USERS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.room_max_users = n;
        }
        if let Ok(val) = env::var("ROOM_HISTORY_CAP")
            && let Ok(n) = val.parse::<usize>()
        {
            config.room_history_cap = n;
        }
        if let Ok(val) = env::var("ROOM_IDLE_TIMEOUT_SECS")
            && let Ok(n) = val.parse::<i64>()
        {
            config.room_idle_timeout_secs = n;
        }
        if let Ok(val) = env::var("SWEEP_INTERVAL_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.sweep_interval_secs = n;
        }
        if let Ok(val) = env::var("PRESENCE_ACTIVE_WINDOW_SECS")
            && let Ok(n) = val.parse::<i64>()
        {
            config.presence_active_window_secs = n;
        }
        if let Ok(val) = env::var("ROOM_STATS_ACTIVE_WINDOW_SECS")
            && let Ok(n) = val.parse::<i64>()
        {
            config.room_stats_active_window_secs = n;
        }
        if let Ok(val) = env::var("CORS_ORIGIN") {
            config.cors_origin = val;
        }

        config
    }
}
