use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use crate::payments::traits::ConfigProvider;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub gateway: GatewayServiceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayServiceConfig {
    /// Transport timeout for the create-payment call
    pub http_timeout_secs: u64,
    /// Settings file read by [`FileConfigProvider`]; env settings otherwise
    pub settings_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let server = ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        };

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL").context("DATABASE_URL not set")?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
        };

        let gateway = GatewayServiceConfig {
            http_timeout_secs: env::var("DUITKU_HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("DUITKU_HTTP_TIMEOUT_SECS must be a valid number")?,
            settings_file: env::var("DUITKU_CONFIG_FILE").ok().map(PathBuf::from),
        };

        let config = Config {
            server,
            database,
            gateway,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port < 1024 {
            return Err(anyhow!(
                "Port must be at least 1024, got {}",
                self.server.port
            ));
        }

        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        if self.database.url.trim().is_empty() {
            return Err(anyhow!("DATABASE_URL cannot be empty"));
        }

        if self.database.max_connections == 0 {
            return Err(anyhow!("DATABASE_MAX_CONNECTIONS must be greater than 0"));
        }

        if self.gateway.http_timeout_secs == 0 {
            return Err(anyhow!("DUITKU_HTTP_TIMEOUT_SECS must be greater than 0"));
        }

        Ok(())
    }
}

/// Gateway settings from process environment, e.g. `DUITKU_API_KEY`.
///
/// Looked up on every call.
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider;

impl EnvConfigProvider {
    pub fn var_name(gateway: &str, key: &str) -> String {
        format!("{}_{}", gateway, key).to_ascii_uppercase()
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get(&self, gateway: &str, key: &str) -> Option<String> {
        env::var(Self::var_name(gateway, key)).ok()
    }
}

/// Gateway settings from a file (any format the `config` crate reads), with
/// `GATEWAYS__<GATEWAY>__<KEY>` environment overrides.
///
/// ```toml
/// [duitku]
/// merchant_code = "D0001"
/// api_key = "..."
/// environment = "sandbox"
/// ```
///
/// The file is re-read on every lookup so edits apply to the next request.
#[derive(Debug, Clone)]
pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<config::Config> {
        config::Config::builder()
            .add_source(config::File::from(self.path.as_path()).required(false))
            .add_source(config::Environment::with_prefix("GATEWAYS").separator("__"))
            .build()
            .with_context(|| {
                format!(
                    "Failed to read gateway settings from {}",
                    self.path.display()
                )
            })
    }
}

impl ConfigProvider for FileConfigProvider {
    fn get(&self, gateway: &str, key: &str) -> Option<String> {
        let settings = match self.load() {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!("{:#}", e);
                return None;
            }
        };
        settings
            .get_string(&format!("{}.{}", gateway.to_ascii_lowercase(), key))
            .ok()
    }
}

/// Fixed in-memory settings
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    values: HashMap<(String, String), String>,
}

impl StaticConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, gateway: &str, key: &str, value: impl Into<String>) -> Self {
        self.values
            .insert((gateway.to_string(), key.to_string()), value.into());
        self
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn get(&self, gateway: &str, key: &str) -> Option<String> {
        self.values
            .get(&(gateway.to_string(), key.to_string()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base_config() -> Config {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                environment: "development".to_string(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/shop".to_string(),
                max_connections: 10,
            },
            gateway: GatewayServiceConfig {
                http_timeout_secs: 30,
                settings_file: None,
            },
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = base_config();
        config.server.port = 80;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.server.environment = "qa".to_string();
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.gateway.http_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(
            EnvConfigProvider::var_name("Duitku", "merchant_code"),
            "DUITKU_MERCHANT_CODE"
        );
    }

    #[test]
    fn test_static_provider() {
        let provider = StaticConfigProvider::new().with("Duitku", "api_key", "k1");
        assert_eq!(provider.get("Duitku", "api_key").as_deref(), Some("k1"));
        assert_eq!(provider.get("Duitku", "merchant_code"), None);
        assert_eq!(provider.get("Other", "api_key"), None);
    }

    #[test]
    fn test_file_provider_rereads_file() {
        let path = env::temp_dir().join(format!("duitku-settings-{}.toml", std::process::id()));
        let write = |api_key: &str| {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(
                file,
                "[duitku]\nmerchant_code = \"D0001\"\napi_key = \"{}\"\nverify_callback_signature = true",
                api_key
            )
            .unwrap();
        };

        write("first");
        let provider = FileConfigProvider::new(&path);
        assert_eq!(provider.get("Duitku", "merchant_code").as_deref(), Some("D0001"));
        assert_eq!(provider.get("Duitku", "api_key").as_deref(), Some("first"));
        assert_eq!(
            provider.get("Duitku", "verify_callback_signature").as_deref(),
            Some("true")
        );

        write("rotated");
        assert_eq!(provider.get("Duitku", "api_key").as_deref(), Some("rotated"));
        assert_eq!(provider.get("Duitku", "payment_method"), None);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_file_provider_missing_file_yields_nothing() {
        let provider = FileConfigProvider::new("/nonexistent/duitku.toml");
        assert_eq!(provider.get("Duitku", "api_key"), None);
    }
}
