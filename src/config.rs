//! Configuration handling for the perovskite web service.
//!
//! Server settings come from CLI arguments with environment fallbacks. Database
//! connection parameters are resolved separately from the deployment
//! environment flag and the `DB_*` variables.

use crate::db::PoolSettings;
use crate::error::{AppError, AppResult};
use crate::models::{ConnectionConfig, DEFAULT_DB_PORT, DatasetRegistry};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ENVIRONMENT: &str = "dev";
pub const DEFAULT_SERVER_HOST: &str = "localhost";
pub const DEFAULT_SERVER_PORT: u16 = 5555;
pub const DEFAULT_TEMPLATE_DIR: &str = "templates";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_DASHBOARD_URL: &str = "http://localhost:5006";
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Host used by the staging and production branches.
pub const DEPLOYED_DB_HOST: &str = "localhost";

/// Deployment environment selecting how connection parameters are sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentEnvironment {
    Staging,
    Production,
    Dev,
}

impl DeploymentEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Production => "production",
            Self::Dev => "dev",
        }
    }
}

impl FromStr for DeploymentEnvironment {
    type Err = AppError;

    /// Matching is exact: `Production` or ` dev` are unknown environments.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            "dev" => Ok(Self::Dev),
            other => Err(AppError::unknown_environment(other)),
        }
    }
}

impl std::fmt::Display for DeploymentEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source of `DB_*` variables.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Resolve connection parameters for a deployment environment.
///
/// `staging` and `production` always use `localhost:5432`; `dev` reads
/// `DB_HOST` and `DB_PORT` (default 5432). `host_override` replaces the host
/// part in every environment and leaves the port rule alone.
pub fn resolve_connection_config(
    environment: &str,
    env: &impl EnvSource,
    host_override: Option<&str>,
) -> AppResult<ConnectionConfig> {
    let environment: DeploymentEnvironment = environment.parse()?;
    let read = |key: &str| env.var(key).unwrap_or_default();

    let (host, port) = match environment {
        DeploymentEnvironment::Staging | DeploymentEnvironment::Production => {
            (DEPLOYED_DB_HOST.to_string(), DEFAULT_DB_PORT.to_string())
        }
        DeploymentEnvironment::Dev => {
            let port = env
                .var("DB_PORT")
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_DB_PORT.to_string());
            (read("DB_HOST"), port)
        }
    };
    let host = host_override
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .unwrap_or(host);

    Ok(ConnectionConfig::new(
        format!("{}:{}", host, port),
        read("DB_USERNAME"),
        read("DB_PASSWORD"),
        read("DB_DATABASE"),
    ))
}

/// Where the service gets its data from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// An explicit connection URL, used as given
    Url(String),
    /// Parameters resolved from the deployment environment
    Resolved(ConnectionConfig),
}

impl DatabaseTarget {
    pub fn connection_string(&self) -> AppResult<String> {
        match self {
            Self::Url(url) => Ok(url.clone()),
            Self::Resolved(config) => config.connection_string(),
        }
    }

    /// Display form with any password masked.
    pub fn masked(&self) -> String {
        match self {
            Self::Resolved(config) => config.masked_connection_string(),
            Self::Url(raw) => match Url::parse(raw) {
                Ok(mut url) if url.password().is_some() => {
                    let _ = url.set_password(Some("****"));
                    url.to_string()
                }
                Ok(url) => url.to_string(),
                Err(_) => "<unparseable database url>".to_string(),
            },
        }
    }
}

/// Configuration for the perovskite web service.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "perovskite-web",
    about = "Website and data downloads for the perovskite solar cell database",
    version,
    author
)]
pub struct Config {
    /// Deployment environment (staging, production or dev)
    #[arg(long, default_value = DEFAULT_ENVIRONMENT, env = "ENVIRONMENT")]
    pub environment: String,

    /// HTTP host to bind to
    #[arg(long, default_value = DEFAULT_SERVER_HOST, env = "SERVER_HOST")]
    pub host: String,

    /// HTTP port to bind to
    #[arg(long, default_value_t = DEFAULT_SERVER_PORT, env = "SERVER_PORT")]
    pub port: u16,

    /// Full database URL. Skips environment-based resolution when set,
    /// e.g. sqlite:perovskite.db for local runs.
    #[arg(long, value_name = "URL", env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Database host used instead of the resolved one, in every environment
    #[arg(long, value_name = "HOST", env = "DB_HOST_OVERRIDE")]
    pub db_host_override: Option<String>,

    /// Directory holding the page templates
    #[arg(long, default_value = DEFAULT_TEMPLATE_DIR, env = "TEMPLATE_DIR")]
    pub template_dir: PathBuf,

    /// Directory served under /static; protocol documents live in its files/ subdirectory
    #[arg(long, default_value = DEFAULT_STATIC_DIR, env = "STATIC_DIR")]
    pub static_dir: PathBuf,

    /// Base URL of the interactive dashboards
    #[arg(long, default_value = DEFAULT_DASHBOARD_URL, env = "DASHBOARD_URL")]
    pub dashboard_url: String,

    /// JSON file with additional dataset descriptors
    #[arg(long, value_name = "PATH", env = "DATASETS_FILE")]
    pub datasets_file: Option<PathBuf>,

    /// Query timeout in seconds
    #[arg(long, default_value_t = DEFAULT_QUERY_TIMEOUT_SECS, env = "QUERY_TIMEOUT")]
    pub query_timeout: u64,

    /// Connection timeout in seconds
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS, env = "CONNECT_TIMEOUT")]
    pub connect_timeout: u64,

    /// Maximum pool connections (default: 10, 1 for SQLite)
    #[arg(long, env = "DB_MAX_CONNECTIONS")]
    pub max_connections: Option<u32>,

    /// Minimum pool connections (default: 1)
    #[arg(long, env = "DB_MIN_CONNECTIONS")]
    pub min_connections: Option<u32>,

    /// Pool idle timeout in seconds (default: 600)
    #[arg(long, env = "DB_IDLE_TIMEOUT")]
    pub idle_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
            database_url: None,
            db_host_override: None,
            template_dir: PathBuf::from(DEFAULT_TEMPLATE_DIR),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
            datasets_file: None,
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            max_connections: None,
            min_connections: None,
            idle_timeout: None,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Get the HTTP bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            idle_timeout_secs: self.idle_timeout,
            connect_timeout_secs: Some(self.connect_timeout),
        }
    }

    /// Directory the protocol documents are served from.
    pub fn files_dir(&self) -> PathBuf {
        self.static_dir.join("files")
    }

    /// Built-in datasets plus any from `--datasets-file`.
    pub fn dataset_registry(&self) -> AppResult<DatasetRegistry> {
        match &self.datasets_file {
            Some(path) => DatasetRegistry::with_file(path),
            None => Ok(DatasetRegistry::builtin()),
        }
    }

    /// Pick the database target: `--database-url` if given, else resolve from the environment.
    pub fn database_target(&self, env: &impl EnvSource) -> AppResult<DatabaseTarget> {
        if let Some(url) = self.database_url.as_ref().filter(|u| !u.is_empty()) {
            return Ok(DatabaseTarget::Url(url.clone()));
        }
        resolve_connection_config(
            &self.environment,
            env,
            self.db_host_override.as_deref(),
        )
        .map(DatabaseTarget::Resolved)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.environment, "dev");
        assert_eq!(config.bind_addr(), "localhost:5555");
        assert_eq!(config.dashboard_url, DEFAULT_DASHBOARD_URL);
        assert_eq!(config.files_dir(), PathBuf::from("static/files"));
    }

    #[test]
    fn test_parse_explicit_flags() {
        let config = Config::try_parse_from([
            "perovskite-web",
            "--environment",
            "production",
            "--port",
            "8080",
            "--max-connections",
            "4",
            "--json-logs",
        ])
        .unwrap();
        assert_eq!(config.environment, "production");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_connections, Some(4));
        assert!(config.json_logs);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = Config::try_parse_from(["perovskite-web", "--port", "not-a-port"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_pool_settings_from_config() {
        let config = Config {
            max_connections: Some(5),
            connect_timeout: 3,
            ..Config::default()
        };
        let settings = config.pool_settings();
        assert_eq!(settings.max_connections, Some(5));
        assert_eq!(settings.connect_timeout_or_default(), 3);
        assert_eq!(settings.min_connections_or_default(), 1);
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            "staging".parse::<DeploymentEnvironment>().unwrap(),
            DeploymentEnvironment::Staging
        );
        assert_eq!(
            "production".parse::<DeploymentEnvironment>().unwrap(),
            DeploymentEnvironment::Production
        );
        assert_eq!(
            "dev".parse::<DeploymentEnvironment>().unwrap(),
            DeploymentEnvironment::Dev
        );
        assert!(matches!(
            "Production".parse::<DeploymentEnvironment>(),
            Err(AppError::UnknownEnvironment { .. })
        ));
    }

    #[test]
    fn test_deployed_environments_ignore_db_host() {
        let vars = env(&[
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
            ("DB_DATABASE", "perovskite"),
            ("DB_USERNAME", "reader"),
            ("DB_PASSWORD", "secret"),
        ]);
        for environment in ["staging", "production"] {
            let config = resolve_connection_config(environment, &vars, None).unwrap();
            assert_eq!(config.host, "localhost:5432");
            assert_eq!(config.database, "perovskite");
        }
    }

    #[test]
    fn test_host_override_keeps_port_rule() {
        let vars = env(&[("DB_PORT", "6543")]);
        let config = resolve_connection_config("production", &vars, Some("db.internal")).unwrap();
        assert_eq!(config.host, "db.internal:5432");

        let config = resolve_connection_config("dev", &vars, Some("db.internal")).unwrap();
        assert_eq!(config.host, "db.internal:6543");
    }

    #[test]
    fn test_dev_port_default_and_override() {
        let config = resolve_connection_config("dev", &env(&[("DB_HOST", "db")]), None).unwrap();
        assert_eq!(config.host, "db:5432");

        let vars = env(&[("DB_HOST", "db"), ("DB_PORT", "15432")]);
        let config = resolve_connection_config("dev", &vars, None).unwrap();
        assert_eq!(config.host, "db:15432");
    }

    #[test]
    fn test_database_url_bypasses_resolution() {
        let config = Config {
            environment: "qa".to_string(),
            database_url: Some("sqlite:perovskite.db".to_string()),
            ..Config::default()
        };
        let target = config.database_target(&HashMap::new()).unwrap();
        assert_eq!(target, DatabaseTarget::Url("sqlite:perovskite.db".to_string()));

        let config = Config {
            environment: "qa".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.database_target(&HashMap::new()),
            Err(AppError::UnknownEnvironment { .. })
        ));
    }

    #[test]
    fn test_masked_target() {
        let target = DatabaseTarget::Url("postgres://reader:secret@db:5432/perovskite".to_string());
        let masked = target.masked();
        assert!(!masked.contains("secret"));
        assert!(masked.contains("****"));

        let target = DatabaseTarget::Url("sqlite:perovskite.db".to_string());
        assert_eq!(target.masked(), "sqlite:perovskite.db");
    }
}
