use crate::auth::DEFAULT_SESSION_TTL;
use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub enable_demo: bool,
    pub session_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: resolve_port(env::var("PORT").ok()),
            data_dir: env::var("APP_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR)),
            enable_demo: parse_flag(env::var("APP_ENABLE_DEMO").ok()),
            session_ttl: resolve_session_ttl(env::var("APP_SESSION_TTL_HOURS").ok()),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            enable_demo: false,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

fn resolve_port(value: Option<String>) -> u16 {
    value
        .and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

fn resolve_session_ttl(value: Option<String>) -> Duration {
    value
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|hours| *hours > 0)
        .map(|hours| Duration::from_secs(hours.saturating_mul(60 * 60)))
        .unwrap_or(DEFAULT_SESSION_TTL)
}

fn parse_flag(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}
