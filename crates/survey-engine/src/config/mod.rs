use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Throttle window applied to events that do not carry their own.
pub const DEFAULT_THROTTLE_DAYS: u32 = 90;

/// Tag prepended to every generated API key.
pub const DEFAULT_API_KEY_TAG: &str = "upk_";

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub engine: EngineConfig,
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

        let default_throttle_days = match env::var("SURVEY_DEFAULT_THROTTLE_DAYS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidThrottleDays { value: raw })?,
            Err(_) => DEFAULT_THROTTLE_DAYS,
        };

        let api_key_tag =
            env::var("SURVEY_API_KEY_TAG").unwrap_or_else(|_| DEFAULT_API_KEY_TAG.to_string());
        if !is_valid_key_tag(&api_key_tag) {
            return Err(ConfigError::InvalidKeyTag { value: api_key_tag });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine: EngineConfig {
                default_throttle_days,
                api_key_tag,
            },
        })
    }
}

// The display prefix is the first 12 characters of the key, so the tag must leave room for
// random material inside it.
fn is_valid_key_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag.len() < 12
        && tag
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Defaults consumed by the decision engine and the key issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub default_throttle_days: u32,
    pub api_key_tag: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_throttle_days: DEFAULT_THROTTLE_DAYS,
            api_key_tag: DEFAULT_API_KEY_TAG.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidThrottleDays { value: String },
    InvalidKeyTag { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { source } => {
                write!(f, "APP_HOST must be an IP address or localhost: {source}")
            }
            ConfigError::InvalidThrottleDays { value } => write!(
                f,
                "SURVEY_DEFAULT_THROTTLE_DAYS must be a non-negative integer, found '{value}'"
            ),
            ConfigError::InvalidKeyTag { value } => write!(
                f,
                "SURVEY_API_KEY_TAG must be 1-11 characters of [A-Za-z0-9_-], found '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidThrottleDays { .. }
            | ConfigError::InvalidKeyTag { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("SURVEY_DEFAULT_THROTTLE_DAYS");
        env::remove_var("SURVEY_API_KEY_TAG");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_engine_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SURVEY_DEFAULT_THROTTLE_DAYS", "30");
        env::set_var("SURVEY_API_KEY_TAG", "acme_");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.engine.default_throttle_days, 30);
        assert_eq!(config.engine.api_key_tag, "acme_");
        reset_env();
    }

    #[test]
    fn rejects_negative_throttle_days() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SURVEY_DEFAULT_THROTTLE_DAYS", "-5");
        match AppConfig::load() {
            Err(ConfigError::InvalidThrottleDays { value }) => assert_eq!(value, "-5"),
            other => panic!("expected throttle days error, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rejects_key_tag_that_fills_display_prefix() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SURVEY_API_KEY_TAG", "much_too_long_tag_");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidKeyTag { .. })
        ));
        reset_env();
    }
}
