use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::info;

use crate::DEFAULT_PORT;

/// Everything the server reads from the environment. Secrets are required
/// and fail startup loudly; tunables fall back to defaults with a log line.
pub struct Config {
    pub port: u16,
    pub database_url: String,

    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: Option<String>,

    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_price_id: String,

    pub liveblocks_secret_key: String,

    pub public_app_url: String,
    pub generation_pacing: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: try_load("PATHWAY_PORT", &DEFAULT_PORT.to_string()),
            database_url: required("DATABASE_URL"),

            openai_api_key: required("OPENAI_API_KEY"),
            openai_model: try_load("OPENAI_MODEL", "gpt-4o-mini"),
            openai_base_url: env::var("OPENAI_BASE_URL").ok(),

            stripe_secret_key: required("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET"),
            stripe_price_id: required("STRIPE_PRICE_ID"),

            liveblocks_secret_key: required("LIVEBLOCKS_SECRET_KEY"),

            public_app_url: required("PUBLIC_APP_URL"),
            generation_pacing: Duration::from_secs(try_load("GENERATION_PACING_SECS", "30")),
        }
    }
}

fn required(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} must be set"))
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .unwrap_or_else(|e| panic!("Invalid {key} value: {e}"))
}
