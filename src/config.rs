use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub driver_service_url: String,
    pub assignment_interval_secs: u64,
    pub driver_http_timeout_secs: u64,
    pub driver_http_retries: u32,
    pub driver_http_retry_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            driver_service_url: env::var("DRIVER_SERVICE_URL")
                .unwrap_or_else(|_| "http://driver-service:4000/driver".to_string()),
            assignment_interval_secs: parse_or_default("ASSIGNMENT_INTERVAL_SECS", 60)?,
            driver_http_timeout_secs: parse_or_default("DRIVER_HTTP_TIMEOUT_SECS", 10)?,
            driver_http_retries: parse_or_default("DRIVER_HTTP_RETRIES", 3)?,
            driver_http_retry_delay_ms: parse_or_default("DRIVER_HTTP_RETRY_DELAY_MS", 1000)?,
        })
    }

    pub fn assignment_interval(&self) -> Duration {
        Duration::from_secs(self.assignment_interval_secs)
    }

    pub fn driver_http_timeout(&self) -> Duration {
        Duration::from_secs(self.driver_http_timeout_secs)
    }

    pub fn driver_http_retry_delay(&self) -> Duration {
        Duration::from_millis(self.driver_http_retry_delay_ms)
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
