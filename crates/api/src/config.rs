use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "https://dinchatbot.com",
    "https://www.dinchatbot.com",
];

/// Runtime settings for the HTTP app, read from `DINCHAT_*` variables.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: String,
    pub tenants_dir: Option<PathBuf>,
    pub database_url: Option<String>,
    pub intents_file: Option<PathBuf>,
    pub allowed_origins: Vec<String>,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
    pub max_message_graphemes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            tenants_dir: None,
            database_url: None,
            intents_file: None,
            allowed_origins: DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect(),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 30,
            max_message_graphemes: 1_000,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unparseable numbers keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            bind: text("DINCHAT_BIND").unwrap_or(defaults.bind),
            tenants_dir: text("DINCHAT_TENANTS_DIR").map(PathBuf::from),
            database_url: text("DINCHAT_DATABASE_URL"),
            intents_file: text("DINCHAT_INTENTS_FILE").map(PathBuf::from),
            allowed_origins: text("DINCHAT_ALLOWED_ORIGINS")
                .map(|value| {
                    value
                        .split(',')
                        .map(|origin| origin.trim().trim_end_matches('/').to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.allowed_origins),
            rate_limit_window: text("DINCHAT_RATE_LIMIT_WINDOW_SECONDS")
                .and_then(|value| value.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_limit_window),
            rate_limit_max: text("DINCHAT_RATE_LIMIT_MAX")
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(defaults.rate_limit_max),
            max_message_graphemes: text("DINCHAT_MAX_MESSAGE_GRAPHEMES")
                .and_then(|value| value.parse::<usize>().ok())
                .filter(|max| *max > 0)
                .unwrap_or(defaults.max_message_graphemes),
        }
    }
}
