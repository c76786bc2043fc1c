//! Application settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// Redis configuration (shared store and delivery bus)
    pub redis: RedisSettings,

    /// JWT verification settings
    pub jwt: JwtSettings,

    /// Snowflake ID generator settings
    pub snowflake: SnowflakeSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// WebSocket configuration
    pub websocket: WebSocketSettings,

    /// Presence propagation settings
    pub presence: PresenceSettings,

    /// Story fan-out settings
    pub stories: StorySettings,

    /// Call signaling settings
    pub calls: CallSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,

    /// Apply embedded migrations at startup
    pub run_migrations: bool,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL
    pub url: String,

    /// Pub/sub channel carrying cross-process deliveries
    pub delivery_channel: String,
}

/// JWT verification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Shared HS256 secret used to verify connection tokens
    pub secret: String,
}

/// Snowflake ID generator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeSettings {
    /// Machine/worker ID (0-1023)
    pub machine_id: u16,

    /// Custom epoch timestamp in milliseconds
    pub epoch: u64,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

/// WebSocket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketSettings {
    /// Maximum message size in bytes (default: 1MB)
    pub max_message_size: usize,

    /// Maximum frame size in bytes (default: 64KB)
    pub max_frame_size: usize,

    /// Heartbeat interval in milliseconds (default: 25000)
    pub heartbeat_interval_ms: u64,

    /// How long to wait for the client's identify frame (default: 10)
    pub identify_timeout_secs: u64,

    /// Identify wait when the upgrade request already carries a token
    /// (default: 500)
    pub identify_grace_ms: u64,
}

/// Presence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceSettings {
    /// Lifetime of the `presence:{user}` offline marker
    pub offline_marker_ttl_secs: u64,
}

/// Story configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorySettings {
    /// Media URLs must be hosted on this domain or one of its subdomains
    pub allowed_media_host: String,

    /// How long a story stays visible
    pub ttl_hours: i64,

    /// Maximum caption length in characters
    pub max_caption_length: usize,
}

/// Call signaling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CallSettings {
    /// Unanswered calls time out after this many seconds
    pub ring_timeout_secs: u64,

    /// Lifetime of a call session record in the shared store
    pub session_ttl_secs: u64,
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if JWT secret is too short.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Self::builder(&environment)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__SERVER__PORT=3000 -> server.port = 3000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .set_override_option(
                "snowflake.machine_id",
                std::env::var("SNOWFLAKE_MACHINE_ID").ok(),
            )?
            .build()?
            .try_deserialize()
            .and_then(Self::validate)
    }

    /// Builder pre-populated with every default value.
    fn builder(
        environment: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", environment)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("database.run_migrations", true)?
            .set_default("redis.delivery_channel", "realtime:deliveries")?
            .set_default("snowflake.machine_id", 1)?
            .set_default("snowflake.epoch", 1420070400000_u64)?
            .set_default("cors.allowed_origins", vec!["http://localhost:5173"])?
            .set_default("websocket.max_message_size", 1_048_576_i64)? // 1MB
            .set_default("websocket.max_frame_size", 65_536_i64)? // 64KB
            .set_default("websocket.heartbeat_interval_ms", 25_000_i64)?
            .set_default("websocket.identify_timeout_secs", 10_i64)?
            .set_default("websocket.identify_grace_ms", 500_i64)?
            .set_default("presence.offline_marker_ttl_secs", 60_i64)?
            .set_default("stories.allowed_media_host", "res.cloudinary.com")?
            .set_default("stories.ttl_hours", 24_i64)?
            .set_default("stories.max_caption_length", 500_i64)?
            .set_default("calls.ring_timeout_secs", 45_i64)?
            .set_default("calls.session_ttl_secs", 14_400_i64)
    }

    fn validate(settings: Self) -> Result<Self, ConfigError> {
        if settings.jwt.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "JWT secret must be at least {} characters for security. Current length: {}",
                MIN_JWT_SECRET_LENGTH,
                settings.jwt.secret.len()
            )));
        }
        if settings.stories.allowed_media_host.trim().is_empty() {
            return Err(ConfigError::Message(
                "stories.allowed_media_host must not be empty".into(),
            ));
        }
        if settings.stories.ttl_hours <= 0 {
            return Err(ConfigError::Message("stories.ttl_hours must be positive".into()));
        }
        Ok(settings)
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
