//! API configuration.

use std::path::PathBuf;

use tracing::warn;
use url::Url;

const DEFAULT_PRODUCTION_ORIGIN: &str = "http://localhost:3000";

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Display name reported by `/health`
    pub app_name: String,
    pub app_version: String,
    pub debug: bool,
    /// Environment (development/production)
    pub environment: String,
    pub log_level: String,
    /// `json` for structured logs, anything else for human-readable output
    pub log_format: String,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Root of the video store
    pub storage_base_path: PathBuf,
    /// CORS origins honored in production
    pub allowed_origins: Vec<String>,
    /// Per-client request budget
    pub rate_limit_per_minute: u32,
    /// Max request body size
    pub max_body_size: usize,
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            app_name: "Text-to-Video Generator".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            debug: false,
            environment: "development".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            storage_base_path: PathBuf::from("./videos"),
            allowed_origins: vec![DEFAULT_PRODUCTION_ORIGIN.to_string()],
            rate_limit_per_minute: 100,
            max_body_size: 1024 * 1024, // 1MB
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from `TTG_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            app_name: env_or("TTG_APP_NAME", defaults.app_name),
            app_version: env_or("TTG_APP_VERSION", defaults.app_version),
            debug: env_flag("TTG_DEBUG").unwrap_or(defaults.debug),
            environment: env_or("TTG_ENVIRONMENT", defaults.environment),
            log_level: env_or("TTG_LOG_LEVEL", defaults.log_level),
            log_format: env_or("TTG_LOG_FORMAT", defaults.log_format),
            host: env_or("TTG_HOST", defaults.host),
            port: env_parse("TTG_PORT").unwrap_or(defaults.port),
            storage_base_path: std::env::var("TTG_STORAGE_BASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_base_path),
            allowed_origins: std::env::var("TTG_ALLOWED_ORIGINS")
                .map(|s| parse_origins(&s))
                .unwrap_or(defaults.allowed_origins),
            rate_limit_per_minute: env_parse("TTG_RATE_LIMIT_PER_MINUTE")
                .unwrap_or(defaults.rate_limit_per_minute),
            max_body_size: env_parse("TTG_MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            metrics_enabled: env_flag("TTG_METRICS_ENABLED").unwrap_or(defaults.metrics_enabled),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Wildcard outside production, the configured origins in production.
    pub fn cors_origins(&self) -> Vec<String> {
        if self.is_production() {
            self.allowed_origins.clone()
        } else {
            vec!["*".to_string()]
        }
    }

    pub fn use_json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

/// Comma-separated origins; entries that are not http(s) URLs are dropped.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|origin| {
            let ok = *origin == "*"
                || Url::parse(origin)
                    .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
                    .unwrap_or(false);
            if !ok {
                warn!(origin, "Ignoring invalid CORS origin");
            }
            ok
        })
        .map(|s| s.trim_end_matches('/').to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_depends_on_environment() {
        let mut config = ApiConfig::default();
        assert_eq!(config.cors_origins(), vec!["*"]);

        config.environment = "Production".to_string();
        assert!(config.is_production());
        assert_eq!(config.cors_origins(), vec!["http://localhost:3000"]);
    }

    #[test]
    fn test_parse_origins_drops_garbage() {
        let origins = parse_origins("https://app.example.com/, not a url, ftp://x.y,http://localhost:3000");
        assert_eq!(origins, vec!["https://app.example.com", "http://localhost:3000"]);
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.rate_limit_per_minute, 100);
        assert_eq!(config.max_body_size, 1024 * 1024);
        assert!(!config.use_json_logs());
    }
}
