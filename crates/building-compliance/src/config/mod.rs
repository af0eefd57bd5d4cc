use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::scoring::{PolicyError, ScoringPolicy};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the scoring service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scoring: ScoringPolicy,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            scoring: scoring_policy_from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Scoring policy on its own, for callers that never bind a server. Server settings are not
/// read, so a bad `APP_PORT` cannot hide the `SCORING_*` overrides.
pub fn load_scoring_policy() -> Result<ScoringPolicy, ConfigError> {
    dotenvy::dotenv().ok();
    scoring_policy_from_env()
}

/// Default policy with any `SCORING_*` overrides applied, then validated as a whole.
fn scoring_policy_from_env() -> Result<ScoringPolicy, ConfigError> {
    let mut policy = ScoringPolicy::default();

    let weights = [
        ("SCORING_WEIGHT_DOB", &mut policy.weights.dob),
        ("SCORING_WEIGHT_ECB", &mut policy.weights.ecb),
        ("SCORING_WEIGHT_HPD", &mut policy.weights.hpd),
        ("SCORING_WEIGHT_PERMITS", &mut policy.weights.permits),
    ];
    for (key, slot) in weights {
        if let Ok(raw) = env::var(key) {
            *slot = raw
                .trim()
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidNumber { key })?;
        }
    }

    if let Ok(raw) = env::var("SCORING_STALE_PERMIT_DAYS") {
        policy.stale_permit_days = raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidNumber {
                key: "SCORING_STALE_PERMIT_DAYS",
            })?
            .into();
    }

    policy.validate().map_err(ConfigError::Scoring)?;
    Ok(policy)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    Scoring(PolicyError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => write!(f, "{key} must be a number"),
            ConfigError::Scoring(err) => write!(f, "invalid scoring policy: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::Scoring(err) => Some(err),
        }
    }
}
