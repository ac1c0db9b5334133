use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub log_level: String,

    // Database configuration
    pub database_url: String,
    pub database_namespace: String,
    pub database_name: String,
    pub database_username: String,
    pub database_password: String,

    // Telegram configuration
    pub bot_token: String,
    pub admin_telegram_ids: Vec<i64>,

    // Authentication configuration
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,

    // 发布频道 (按资源类型, 可选)
    pub publish_channel_channels: Option<String>,
    pub publish_channel_groups: Option<String>,
    pub publish_channel_bots: Option<String>,
    pub publish_channel_stickers: Option<String>,
    pub publish_channel_emoji: Option<String>,

    // Content settings
    pub max_title_length: usize,
    pub max_description_length: usize,
    pub default_resources_per_page: usize,

    // 广告位
    pub ad_slots_per_category: u32,
    pub paid_slot_sweep_interval: u64,

    // CORS configuration
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            database_namespace: env::var("DATABASE_NAMESPACE")
                .unwrap_or_else(|_| "rainbow".to_string()),
            database_name: env::var("DATABASE_NAME")
                .unwrap_or_else(|_| "catalog".to_string()),
            database_username: env::var("DATABASE_USERNAME")
                .unwrap_or_else(|_| "root".to_string()),
            database_password: env::var("DATABASE_PASSWORD")
                .unwrap_or_else(|_| "root".to_string()),

            bot_token: env::var("BOT_TOKEN").expect("BOT_TOKEN must be set"),
            admin_telegram_ids: env::var("ADMIN_TELEGRAM_IDS")
                .unwrap_or_default()
                .split(',')
                .filter_map(|id| id.trim().parse().ok())
                .collect(),

            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "168".to_string())
                .parse()?,

            publish_channel_channels: env::var("PUBLISH_CHANNEL_CHANNELS").ok(),
            publish_channel_groups: env::var("PUBLISH_CHANNEL_GROUPS").ok(),
            publish_channel_bots: env::var("PUBLISH_CHANNEL_BOTS").ok(),
            publish_channel_stickers: env::var("PUBLISH_CHANNEL_STICKERS").ok(),
            publish_channel_emoji: env::var("PUBLISH_CHANNEL_EMOJI").ok(),

            max_title_length: env::var("MAX_TITLE_LENGTH")
                .unwrap_or_else(|_| "150".to_string())
                .parse()?,
            max_description_length: env::var("MAX_DESCRIPTION_LENGTH")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()?,
            default_resources_per_page: env::var("DEFAULT_RESOURCES_PER_PAGE")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,

            ad_slots_per_category: env::var("AD_SLOTS_PER_CATEGORY")
                .unwrap_or_else(|_| "3".to_string())
                .parse()?,
            paid_slot_sweep_interval: env::var("PAID_SLOT_SWEEP_INTERVAL")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_admin(&self, telegram_id: i64) -> bool {
        self.admin_telegram_ids.contains(&telegram_id)
    }
}
