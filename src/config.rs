use std::env;

use crate::engine::route::ServiceTimes;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub service_times: ServiceTimes,
    pub seed_demo: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            service_times: ServiceTimes {
                pickup_s: parse_or_default("PICKUP_SERVICE_S", ServiceTimes::DEFAULT_PICKUP_S)?,
                dropoff_s: parse_or_default("DROPOFF_SERVICE_S", ServiceTimes::DEFAULT_DROPOFF_S)?,
            },
            seed_demo: parse_or_default("SEED_DEMO", false)?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
