//! Engine configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Every key has a default so the
//! engine runs out of the box against a local SQLite file.

/// Top-level engine configuration.
///
/// Loaded once at startup via [`TourConfig::from_env`].
#[derive(Debug, Clone)]
pub struct TourConfig {
    /// Path to the local SQLite mirror database (e.g. `waytour.db`).
    pub database_path: String,

    /// Base URL of the remote BaaS (e.g. `https://proj.supabase.co`).
    pub remote_base_url: String,

    /// API key sent as `apikey` and bearer token on every remote call.
    pub remote_api_key: String,

    /// Seconds between periodic background sync wakes (default 24 h).
    pub sync_interval_secs: u64,

    /// Distance in meters below which a POI counts as reached.
    pub proximity_threshold_m: f64,

    /// Capacity of the `EventBus` broadcast channel.
    pub event_bus_capacity: usize,

    /// Attempts before an outbox mutation is dead-lettered.
    pub outbox_max_attempts: u32,

    /// Base of the exponential retry backoff, in seconds.
    pub outbox_backoff_base_secs: u64,
}

impl TourConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `REMOTE_BASE_URL` is set but empty, since a
    /// blank base URL would make every remote call fail in confusing ways.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "waytour.db".to_string());

        let remote_base_url = std::env::var("REMOTE_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:54321".to_string());
        if remote_base_url.trim().is_empty() {
            return Err("REMOTE_BASE_URL must not be empty".into());
        }

        let remote_api_key = std::env::var("REMOTE_API_KEY").unwrap_or_default();

        let sync_interval_secs = parse_env("SYNC_INTERVAL_SECS", 86_400);
        let proximity_threshold_m = parse_env("PROXIMITY_THRESHOLD_M", 20.0);
        let event_bus_capacity = parse_env("EVENT_BUS_CAPACITY", 1_024);
        let outbox_max_attempts = parse_env("OUTBOX_MAX_ATTEMPTS", 8);
        let outbox_backoff_base_secs = parse_env("OUTBOX_BACKOFF_BASE_SECS", 30);

        Ok(Self {
            database_path,
            remote_base_url,
            remote_api_key,
            sync_interval_secs,
            proximity_threshold_m,
            event_bus_capacity,
            outbox_max_attempts,
            outbox_backoff_base_secs,
        })
    }
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            database_path: "waytour.db".to_string(),
            remote_base_url: "http://localhost:54321".to_string(),
            remote_api_key: String::new(),
            sync_interval_secs: 86_400,
            proximity_threshold_m: 20.0,
            event_bus_capacity: 1_024,
            outbox_max_attempts: 8,
            outbox_backoff_base_secs: 30,
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
