//! Configuration types for weaviate-migrate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::retry::RetryConfig;
use crate::schema::VectorizerTarget;

/// Main migration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Instance objects are read from.
    pub source: InstanceConfig,
    /// Instance objects are written to.
    pub destination: DestinationConfig,
    /// Migration options.
    #[serde(default)]
    pub options: MigrationOptions,
    /// Policy for classes without an entry in `classes`.
    #[serde(default)]
    pub defaults: ClassPolicy,
    /// Per-class policies, keyed by class name.
    #[serde(default)]
    pub classes: HashMap<String, ClassPolicy>,
}

/// A Weaviate instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Base URL, e.g. `http://localhost:8080`.
    pub url: String,
    /// Optional Weaviate API key, sent as a bearer token.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// The destination instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Base URL, e.g. `http://localhost:8095`.
    pub url: String,
    /// Optional Weaviate API key, sent as a bearer token.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the embedding provider key, sent as
    /// `X-OpenAI-Api-Key` on inserts into classes with a vectorizer.
    #[serde(default = "default_embedding_key_env")]
    pub embedding_api_key_env: String,
}

impl DestinationConfig {
    /// The destination as a plain instance.
    pub fn instance(&self) -> InstanceConfig {
        InstanceConfig {
            url: self.url.clone(),
            api_key: self.api_key.clone(),
        }
    }

    /// Reads the embedding provider key from the environment.
    pub fn embedding_api_key(&self) -> Option<String> {
        std::env::var(&self.embedding_api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
    }
}

/// Declarative per-class migration policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassPolicy {
    /// Vectorizer the destination class must end up with.
    #[serde(default)]
    pub vectorizer: VectorizerTarget,
    /// Re-migrate when the destination vectorizer differs, even if the
    /// destination class already holds objects.
    #[serde(default)]
    pub enforce_vectorizer: bool,
}

/// Migration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// Objects fetched per page.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between pages, in milliseconds.
    #[serde(default = "default_sleep_ms")]
    pub sleep_between_batches_ms: u64,
    /// Suffix of the staging class used by the swap.
    #[serde(default = "default_temp_suffix")]
    pub temp_suffix: String,
    /// Timeout for schema and fetch requests, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Timeout for object inserts, in seconds. Inserts into vectorized
    /// classes wait on the embedding provider.
    #[serde(default = "default_insert_timeout")]
    pub insert_timeout_secs: u64,
    /// Retry policy for each object insert.
    #[serde(default = "RetryConfig::for_inserts")]
    pub insert_retry: RetryConfig,
    /// Retry policy for each page fetch.
    #[serde(default = "RetryConfig::for_batch_fetch")]
    pub fetch_retry: RetryConfig,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            sleep_between_batches_ms: default_sleep_ms(),
            temp_suffix: default_temp_suffix(),
            request_timeout_secs: default_request_timeout(),
            insert_timeout_secs: default_insert_timeout(),
            insert_retry: RetryConfig::for_inserts(),
            fetch_retry: RetryConfig::for_batch_fetch(),
        }
    }
}

impl MigrationOptions {
    /// Pause between pages.
    pub fn sleep_between_batches(&self) -> Duration {
        Duration::from_millis(self.sleep_between_batches_ms)
    }

    /// Staging class name for `class`.
    pub fn temp_class_name(&self, class: &str) -> String {
        format!("{}{}", class, self.temp_suffix)
    }
}

fn default_embedding_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_sleep_ms() -> u64 {
    100
}

fn default_temp_suffix() -> String {
    "_temp".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_insert_timeout() -> u64 {
    60
}

impl MigrationConfig {
    /// Builds a configuration from two URLs with default options.
    pub fn from_urls(source_url: &str, destination_url: &str) -> Self {
        Self {
            source: InstanceConfig {
                url: source_url.to_string(),
                api_key: None,
            },
            destination: DestinationConfig {
                url: destination_url.to_string(),
                api_key: None,
                embedding_api_key_env: default_embedding_key_env(),
            },
            options: MigrationOptions::default(),
            defaults: ClassPolicy::default(),
            classes: HashMap::new(),
        }
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Policy for `class`, falling back to `defaults`.
    pub fn policy_for(&self, class: &str) -> &ClassPolicy {
        self.classes.get(class).unwrap_or(&self.defaults)
    }

    /// True when any policy needs the embedding provider key on insert.
    pub fn needs_embedding_key(&self) -> bool {
        self.defaults.vectorizer.embeds_on_insert()
            || self
                .classes
                .values()
                .any(|p| p.vectorizer.embeds_on_insert())
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        validate_url(&self.source.url, "source")?;
        validate_url(&self.destination.url, "destination")?;

        if self.options.batch_size == 0 {
            return Err(Error::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if self.options.temp_suffix.is_empty() {
            return Err(Error::Config("temp_suffix cannot be empty".to_string()));
        }
        if self.options.insert_retry.max_attempts == 0 || self.options.fetch_retry.max_attempts == 0
        {
            return Err(Error::Config(
                "retry max_attempts must be at least 1".to_string(),
            ));
        }

        let policies = std::iter::once(("defaults", &self.defaults))
            .chain(self.classes.iter().map(|(k, v)| (k.as_str(), v)));
        for (name, policy) in policies {
            if let VectorizerTarget::Enabled { module, .. } = &policy.vectorizer {
                if module.trim().is_empty() {
                    return Err(Error::Config(format!(
                        "policy '{}' enables a vectorizer without a module name",
                        name
                    )));
                }
            }
        }

        Ok(())
    }
}

fn validate_url(url: &str, which: &str) -> Result<()> {
    if url.is_empty() {
        return Err(Error::Config(format!("{} url cannot be empty", which)));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::Config(format!(
            "Invalid {} URL '{}'. Allowed schemes: http, https",
            which, url
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const EXAMPLE: &str = r#"
source:
  url: http://prod.example.com:8090
destination:
  url: http://localhost:8095
options:
  batch_size: 50
  fetch_retry:
    max_attempts: 2
    initial_delay_ms: 10
    max_delay_ms: 10
classes:
  ConstructionProducts:
    vectorizer:
      type: enabled
      module: text2vec-openai
    enforce_vectorizer: true
"#;

    #[test]
    fn test_options_defaults() {
        let options = MigrationOptions::default();
        assert_eq!(options.batch_size, 100);
        assert_eq!(options.sleep_between_batches(), Duration::from_millis(100));
        assert_eq!(options.insert_retry.max_attempts, 3);
        assert_eq!(options.fetch_retry.max_attempts, 6);
        assert_eq!(options.temp_class_name("Widgets"), "Widgets_temp");
    }

    #[test]
    fn test_config_yaml_parse() {
        let config: MigrationConfig = serde_yaml::from_str(EXAMPLE).unwrap();

        assert_eq!(config.options.batch_size, 50);
        assert_eq!(config.options.fetch_retry.max_attempts, 2);
        // Unset sections keep their defaults.
        assert_eq!(config.options.insert_retry, RetryConfig::for_inserts());
        assert_eq!(config.destination.embedding_api_key_env, "OPENAI_API_KEY");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_policy_lookup_falls_back_to_defaults() {
        let config: MigrationConfig = serde_yaml::from_str(EXAMPLE).unwrap();

        let special = config.policy_for("ConstructionProducts");
        assert!(special.enforce_vectorizer);
        assert_eq!(special.vectorizer, VectorizerTarget::openai());

        let other = config.policy_for("Merchants");
        assert_eq!(other, &ClassPolicy::default());
        assert!(!other.enforce_vectorizer);
        assert!(config.needs_embedding_key());
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let mut config = MigrationConfig::from_urls("http://a:1", "http://b:2");
        config.options.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_scheme() {
        let config = MigrationConfig::from_urls("ftp://a:1", "http://b:2");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_module() {
        let mut config = MigrationConfig::from_urls("http://a:1", "http://b:2");
        config.classes.insert(
            "Widgets".to_string(),
            ClassPolicy {
                vectorizer: VectorizerTarget::Enabled {
                    module: " ".to_string(),
                    vectorize_class_name: false,
                },
                enforce_vectorizer: false,
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EXAMPLE.as_bytes()).unwrap();

        let config = MigrationConfig::from_file(file.path()).unwrap();
        assert_eq!(config.source.url, "http://prod.example.com:8090");
        assert_eq!(config.classes.len(), 1);
    }

    #[test]
    fn test_from_file_missing() {
        let result = MigrationConfig::from_file(Path::new("/nonexistent/migration.yaml"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
