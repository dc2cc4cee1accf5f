use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use quill::providers::configs::OpenAiProviderConfig;
use quill::resolver::backends::{ObjectStoreBackend, RecordStoreBackend};
use quill::resolver::DocumentBackend;
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Default, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Failed to parse socket address")
    }
}

#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_openai_host")]
    pub host: String,
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ProviderSettings {
    /// Split into the provider config and the model identifier the
    /// registry stamps onto agent configurations.
    pub fn into_parts(self) -> (OpenAiProviderConfig, String) {
        (
            OpenAiProviderConfig {
                host: self.host,
                api_key: self.api_key,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                timeout_secs: self.timeout_secs,
            },
            self.model,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_object_store_url")]
    pub object_store_url: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Record store lookups are skipped entirely when unset.
    #[serde(default)]
    pub record_store_url: Option<String>,
    #[serde(default = "default_upload_expiry_secs")]
    pub upload_expiry_secs: u64,
}

impl StorageSettings {
    /// Assemble the resolver's backend chain. Priority order is fixed:
    /// the object store is consulted first, the record store (when
    /// configured) second.
    pub fn document_backends(&self) -> anyhow::Result<Vec<Box<dyn DocumentBackend>>> {
        let object_store =
            ObjectStoreBackend::new(self.object_store_url.as_str(), self.bucket.as_str())?;

        let mut backends: Vec<Box<dyn DocumentBackend>> = vec![Box::new(object_store.clone())];
        if let Some(record_store_url) = &self.record_store_url {
            backends.push(Box::new(RecordStoreBackend::new(
                record_store_url.as_str(),
                object_store,
            )?));
        }
        Ok(backends)
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            object_store_url: default_object_store_url(),
            bucket: default_bucket(),
            record_store_url: None,
            upload_expiry_secs: default_upload_expiry_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        // Start with default configuration
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Provider defaults
            .set_default("provider.host", default_openai_host())?
            .set_default("provider.model", default_model())?
            // Storage defaults
            .set_default("storage.object_store_url", default_object_store_url())?
            .set_default("storage.bucket", default_bucket())?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("QUILL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        // Try to deserialize the configuration
        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        // Handle missing field errors specially
        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                // Handle both NotFound and missing field message variants
                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    // Extract field name from error message "missing field `api_key`"
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    // Serde reports the bare field name; the only
                    // required field lives under `provider`.
                    let field = if field.contains('.') {
                        field.to_string()
                    } else {
                        format!("provider.{field}")
                    };
                    let env_var = to_env_var(&field);
                    Err(ConfigError::MissingEnvVar { env_var })
                } else if let config::ConfigError::NotFound(field) = &err {
                    let env_var = to_env_var(field);
                    Err(ConfigError::MissingEnvVar { env_var })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8001
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_openai_host() -> String {
    "https://api.openai.com".to_string()
}

fn default_object_store_url() -> String {
    "http://127.0.0.1:9000".to_string()
}

fn default_bucket() -> String {
    "documents".to_string()
}

fn default_upload_expiry_secs() -> u64 {
    900
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("QUILL_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();
        env::set_var("QUILL_PROVIDER__API_KEY", "test-key");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8001);
        assert_eq!(settings.provider.host, "https://api.openai.com");
        assert_eq!(settings.provider.api_key, "test-key");
        assert_eq!(settings.provider.model, "gpt-4o");
        assert_eq!(settings.provider.temperature, None);
        assert_eq!(settings.storage.bucket, "documents");
        assert!(settings.storage.record_store_url.is_none());

        env::remove_var("QUILL_PROVIDER__API_KEY");
    }

    #[test]
    #[serial]
    fn test_missing_api_key_names_env_var() {
        clean_env();

        match Settings::new() {
            Err(ConfigError::MissingEnvVar { env_var }) => {
                assert_eq!(env_var, "QUILL_PROVIDER__API_KEY");
            }
            other => panic!("expected MissingEnvVar, got {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("QUILL_SERVER__PORT", "8080");
        env::set_var("QUILL_PROVIDER__API_KEY", "test-key");
        env::set_var("QUILL_PROVIDER__MODEL", "gpt-4o-mini");
        env::set_var("QUILL_PROVIDER__TEMPERATURE", "0.8");
        env::set_var("QUILL_STORAGE__OBJECT_STORE_URL", "http://store.local");
        env::set_var("QUILL_STORAGE__RECORD_STORE_URL", "http://records.local");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.provider.model, "gpt-4o-mini");
        assert_eq!(settings.provider.temperature, Some(0.8));
        assert_eq!(settings.storage.object_store_url, "http://store.local");
        assert_eq!(
            settings.storage.record_store_url.as_deref(),
            Some("http://records.local")
        );

        env::remove_var("QUILL_SERVER__PORT");
        env::remove_var("QUILL_PROVIDER__API_KEY");
        env::remove_var("QUILL_PROVIDER__MODEL");
        env::remove_var("QUILL_PROVIDER__TEMPERATURE");
        env::remove_var("QUILL_STORAGE__OBJECT_STORE_URL");
        env::remove_var("QUILL_STORAGE__RECORD_STORE_URL");
    }

    #[test]
    fn test_object_store_is_first_in_backend_chain() {
        let storage = StorageSettings {
            record_store_url: Some("http://records.local".to_string()),
            ..StorageSettings::default()
        };

        let backends = storage.document_backends().unwrap();
        let names: Vec<&str> = backends.iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["object-store", "record-store"]);
    }

    #[test]
    fn test_backend_chain_without_record_store() {
        let backends = StorageSettings::default().document_backends().unwrap();
        let names: Vec<&str> = backends.iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["object-store"]);
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 8001,
        };
        let addr = server_settings.socket_addr();
        assert_eq!(addr.to_string(), "127.0.0.1:8001");
    }
}
