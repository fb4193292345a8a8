use crate::auth::jwt::JwtConfig;

/// Default matching radius in meters (5 km).
const DEFAULT_MATCH_RADIUS_METERS: f64 = 5_000.0;

/// Default interval between background expiry sweeps, in seconds.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Default minimum movement before a provider location update is
/// re-broadcast, in meters.
const DEFAULT_LOCATION_MIN_MOVE_METERS: f64 = 25.0;

/// Default maximum age of the last broadcast before a location update is
/// re-broadcast regardless of movement, in seconds.
const DEFAULT_LOCATION_MAX_STALENESS_SECS: u64 = 30;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Provider matching radius in meters (default: `5000`).
    pub match_radius_meters: f64,
    /// Background expiry sweep interval in seconds (default: `60`).
    pub sweep_interval_secs: u64,
    /// Failed completion attempts allowed per request (default: `5`).
    pub pin_max_attempts: i32,
    /// Minimum movement before re-broadcasting a provider position (default: `25` m).
    pub location_min_move_meters: f64,
    /// Maximum staleness before re-broadcasting regardless of movement (default: `30` s).
    pub location_max_staleness_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                 |
    /// |--------------------------------|-------------------------|
    /// | `HOST`                         | `0.0.0.0`               |
    /// | `PORT`                         | `3000`                  |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`        | `30`                    |
    /// | `MATCH_RADIUS_METERS`          | `5000`                  |
    /// | `SWEEP_INTERVAL_SECS`          | `60`                    |
    /// | `PIN_MAX_ATTEMPTS`             | `5`                     |
    /// | `LOCATION_MIN_MOVE_METERS`     | `25`                    |
    /// | `LOCATION_MAX_STALENESS_SECS`  | `30`                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let match_radius_meters: f64 = std::env::var("MATCH_RADIUS_METERS")
            .unwrap_or_else(|_| DEFAULT_MATCH_RADIUS_METERS.to_string())
            .parse()
            .expect("MATCH_RADIUS_METERS must be a valid f64");

        let sweep_interval_secs: u64 = std::env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_SWEEP_INTERVAL_SECS.to_string())
            .parse()
            .expect("SWEEP_INTERVAL_SECS must be a valid u64");

        let pin_max_attempts: i32 = std::env::var("PIN_MAX_ATTEMPTS")
            .unwrap_or_else(|_| nearhand_core::pin::DEFAULT_MAX_PIN_ATTEMPTS.to_string())
            .parse()
            .expect("PIN_MAX_ATTEMPTS must be a valid i32");

        let location_min_move_meters: f64 = std::env::var("LOCATION_MIN_MOVE_METERS")
            .unwrap_or_else(|_| DEFAULT_LOCATION_MIN_MOVE_METERS.to_string())
            .parse()
            .expect("LOCATION_MIN_MOVE_METERS must be a valid f64");

        let location_max_staleness_secs: u64 = std::env::var("LOCATION_MAX_STALENESS_SECS")
            .unwrap_or_else(|_| DEFAULT_LOCATION_MAX_STALENESS_SECS.to_string())
            .parse()
            .expect("LOCATION_MAX_STALENESS_SECS must be a valid u64");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt,
            match_radius_meters,
            sweep_interval_secs,
            pin_max_attempts,
            location_min_move_meters,
            location_max_staleness_secs,
        }
    }
}
