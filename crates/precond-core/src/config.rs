//! Configuration management for precond.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration for a verification run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Store endpoint and credentials.
    pub store: StoreConfig,
    /// Readiness polling.
    pub readiness: ReadinessConfig,
    /// Leftover-key cleanup.
    pub cleanup: CleanupConfig,
    /// Concurrency race driver.
    pub race: RaceConfig,
    /// Retrying counter driver.
    pub counter: CounterConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration: defaults, then the optional TOML file, then
    /// environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = get("S3_ENDPOINT") {
            self.store.endpoint = endpoint;
        }
        if let Some(bucket) = get("S3_BUCKET") {
            self.store.bucket = bucket;
        }
        if let Some(access_key) = get("AWS_ACCESS_KEY_ID") {
            self.store.access_key = access_key;
        }
        if let Some(secret_key) = get("AWS_SECRET_ACCESS_KEY") {
            self.store.secret_key = secret_key;
        }
    }

    /// Check cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.store.endpoint.is_empty() {
            return Err(Error::Config("store.endpoint must not be empty".to_string()));
        }
        if self.store.bucket.is_empty() {
            return Err(Error::Config("store.bucket must not be empty".to_string()));
        }
        if self.race.writers < 2 {
            return Err(Error::Config(format!(
                "race.writers must be at least 2, got {}",
                self.race.writers
            )));
        }
        if self.counter.workers == 0 {
            return Err(Error::Config("counter.workers must be at least 1".to_string()));
        }
        if self.counter.max_attempts == 0 {
            return Err(Error::Config("counter.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Store endpoint and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Endpoint URL of the S3-compatible store.
    pub endpoint: String,
    /// Bucket all scenarios run against.
    pub bucket: String,
    /// Access key ID.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
    /// Region name sent to the store.
    pub region: String,
    /// Use path-style addressing (required by MinIO and most local stores).
    pub force_path_style: bool,
    /// Per-call timeout in seconds. A call that neither applies nor is
    /// rejected within this window counts as inconclusive.
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://minio:9000".to_string(),
            bucket: "testbucket".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            force_path_style: true,
            timeout_secs: 30,
        }
    }
}

/// Readiness polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Maximum number of `head_bucket` attempts before the run is fatal.
    pub attempts: u32,
    /// Delay between attempts in milliseconds.
    pub interval_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self { attempts: 30, interval_ms: 1000 }
    }
}

/// Cleanup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Key prefix of objects left over from prior runs.
    pub prefix: String,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self { prefix: "test-".to_string() }
    }
}

/// Concurrency race driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Number of concurrent writers. Must be at least 2.
    pub writers: u32,
    /// Upper bound of the randomized pre-write delay in milliseconds,
    /// used to widen the interleaving window.
    pub jitter_ms: u64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self { writers: 5, jitter_ms: 100 }
    }
}

/// Retrying counter driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Number of concurrent increment workers.
    pub workers: u32,
    /// Attempt budget per worker before reporting retries exhausted.
    pub max_attempts: u32,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self { workers: 10, max_attempts: 10 }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter when `RUST_LOG` is not set.
    pub level: String,
    /// Log output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Pretty }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// Newline-delimited JSON.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().expect("defaults should validate");
        assert_eq!(config.race.writers, 5);
        assert_eq!(config.counter.workers, 10);
        assert_eq!(config.counter.max_attempts, 10);
        assert_eq!(config.readiness.attempts, 30);
        assert_eq!(config.cleanup.prefix, "test-");
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = Config::parse(
            r#"
            [store]
            endpoint = "http://localhost:9000"
            bucket = "conditional-writes"

            [race]
            writers = 8
            "#,
        )
        .expect("should parse");

        assert_eq!(config.store.endpoint, "http://localhost:9000");
        assert_eq!(config.store.bucket, "conditional-writes");
        assert_eq!(config.race.writers, 8);
        // Unspecified sections keep their defaults.
        assert_eq!(config.counter.workers, 10);
        assert_eq!(config.store.timeout_secs, 30);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_from(|name| match name {
            "S3_ENDPOINT" => Some("http://127.0.0.1:9100".to_string()),
            "S3_BUCKET" => Some("race-bucket".to_string()),
            "AWS_ACCESS_KEY_ID" => Some("AKIAEXAMPLE".to_string()),
            "AWS_SECRET_ACCESS_KEY" => Some("secret".to_string()),
            _ => None,
        });

        assert_eq!(config.store.endpoint, "http://127.0.0.1:9100");
        assert_eq!(config.store.bucket, "race-bucket");
        assert_eq!(config.store.access_key, "AKIAEXAMPLE");
        assert_eq!(config.store.secret_key, "secret");
    }

    #[test]
    fn test_validate_rejects_single_writer_race() {
        let mut config = Config::default();
        config.race.writers = 1;
        let err = config.validate().expect_err("one writer is not a race");
        assert!(err.to_string().contains("race.writers"));
    }

    #[test]
    fn test_from_file_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("precond.toml");
        std::fs::write(&path, "[counter]\nworkers = 3\nmax_attempts = 5\n").expect("write");

        let config = Config::from_file(&path).expect("should load");
        assert_eq!(config.counter.workers, 3);
        assert_eq!(config.counter.max_attempts, 5);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_file(Path::new("/nonexistent/precond.toml"))
            .expect_err("missing file");
        assert_eq!(err.reason_code(), "Config");
    }
}
