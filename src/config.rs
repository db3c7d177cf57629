use std::env;

/// Largest batch the push relay accepts in one request.
pub const MAX_RELAY_BATCH: usize = 90;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub push_multicast_url: String,
    pub push_multicast_key: String,
    pub push_relay_url: String,
    pub relay_batch_size: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "availability.db".to_string()),
            push_multicast_url: env::var("PUSH_MULTICAST_URL").unwrap_or_default(),
            push_multicast_key: env::var("PUSH_MULTICAST_KEY").unwrap_or_default(),
            push_relay_url: env::var("PUSH_RELAY_URL")
                .unwrap_or_else(|_| "https://exp.host/--/api/v2/push/send".to_string()),
            relay_batch_size: env::var("PUSH_RELAY_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(clamp_batch_size)
                .unwrap_or(MAX_RELAY_BATCH),
        }
    }
}

pub fn clamp_batch_size(size: usize) -> usize {
    size.clamp(1, MAX_RELAY_BATCH)
}
