use serde::Deserialize;
use service_core::config::{self as core_config, get_env};
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct InvoicingConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub store: StoreConfig,
    pub jwt: JwtConfig,
    pub uploads: UploadsConfig,
    pub frontend_url: String,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub mongodb: Option<MongoConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadsConfig {
    pub local_path: String,
    pub public_base_url: String,
}

impl InvoicingConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common = core_config::Config::load()?;
        let is_prod = common.environment.is_production();

        let backend: StoreBackend = get_env("STORE_BACKEND", Some("mongo"), false)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let mongodb = match backend {
            StoreBackend::Mongo => Some(MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("invoicing_db"), false)?,
            }),
            StoreBackend::Memory => None,
        };

        let expires_in_days = get_env("JWT_EXPIRES_IN_DAYS", Some("7"), false)?
            .parse()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Invalid JWT_EXPIRES_IN_DAYS: {}", e))
            })?;

        Ok(InvoicingConfig {
            common,
            store: StoreConfig { backend, mongodb },
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET", Some("dev-only-insecure-secret"), is_prod)?,
                expires_in_days,
            },
            uploads: UploadsConfig {
                local_path: get_env("UPLOADS_LOCAL_PATH", Some("uploads"), false)?,
                public_base_url: get_env("UPLOADS_PUBLIC_BASE_URL", Some("/uploads"), false)?,
            },
            frontend_url: get_env("FRONTEND_URL", Some("http://localhost:3000"), false)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.common.environment.is_production()
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_parses_known_values() {
        assert_eq!("mongo".parse::<StoreBackend>(), Ok(StoreBackend::Mongo));
        assert_eq!("MongoDB".parse::<StoreBackend>(), Ok(StoreBackend::Mongo));
        assert_eq!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert!("postgres".parse::<StoreBackend>().is_err());
    }
}
