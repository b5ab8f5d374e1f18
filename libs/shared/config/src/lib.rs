use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_url: String,
    pub store_api_key: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub booking_window_days: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            store_url: env::var("HMS_STORE_URL")
                .unwrap_or_else(|_| {
                    warn!("HMS_STORE_URL not set, using empty value");
                    String::new()
                }),
            store_api_key: env::var("HMS_STORE_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("HMS_STORE_API_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("HMS_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("HMS_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            token_ttl_hours: env::var("HMS_TOKEN_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(12),
            booking_window_days: env::var("HMS_BOOKING_WINDOW_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(7),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.store_url.is_empty()
            && !self.store_api_key.is_empty()
            && !self.jwt_secret.is_empty()
    }
}
