use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct DoctorConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub jwt: JwtConfig,
    pub store: StoreConfig,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HS256 secret used by the identity provider to sign access tokens.
    pub secret: Secret<String>,
    /// Expected `iss` claim; unchecked when absent.
    pub issuer: Option<String>,
    pub leeway_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub mongodb: Option<MongoConfig>,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Memory,
    MongoDb,
}

impl DoctorConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        let environment: Environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "dev".to_string())
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;
        let is_prod = environment == Environment::Prod;

        let backend: StoreBackend = get_env("STORE_BACKEND", Some("memory"), false)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let mongodb = match backend {
            StoreBackend::MongoDb => Some(MongoConfig {
                uri: get_env("MONGODB_URI", None, is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("doctor_db"), false)?,
            }),
            StoreBackend::Memory => None,
        };

        let leeway_seconds = get_env("JWT_LEEWAY_SECONDS", Some("0"), false)?
            .parse()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Invalid JWT_LEEWAY_SECONDS: {}", e))
            })?;

        Ok(DoctorConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("doctor-service"), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            jwt: JwtConfig {
                secret: jwt_secret(get_env("JWT_SECRET", None, is_prod)?)?,
                issuer: env::var("JWT_ISSUER").ok().filter(|s| !s.is_empty()),
                leeway_seconds,
            },
            store: StoreConfig { backend, mongodb },
            allowed_origins: parse_origins(&env::var("ALLOWED_ORIGINS").unwrap_or_default()),
        })
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "mongodb" | "mongo" => Ok(StoreBackend::MongoDb),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

/// The HS256 secret must contain at least one non-whitespace character.
fn jwt_secret(raw: String) -> Result<Secret<String>, AppError> {
    if raw.trim().is_empty() {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "JWT_SECRET must not be empty"
        )));
    }
    Ok(Secret::new(raw))
}

/// Reads `key`, falling back to `default`. When `is_prod` is set the key is
/// mandatory and the default is ignored.
fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_backend_parsing() {
        assert_eq!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert_eq!("MongoDB".parse::<StoreBackend>(), Ok(StoreBackend::MongoDb));
        assert!("postgres".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("PROD".parse::<Environment>(), Ok(Environment::Prod));
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_blank_jwt_secret_is_rejected() {
        for raw in ["", "   ", "\t\n"] {
            assert!(matches!(
                jwt_secret(raw.to_string()),
                Err(AppError::ConfigError(_))
            ));
        }
        assert!(jwt_secret("s3cret".to_string()).is_ok());
    }

    #[test]
    fn test_parse_origins_skips_blanks() {
        assert_eq!(
            parse_origins(" https://a.example , ,https://b.example"),
            vec!["https://a.example", "https://b.example"]
        );
        assert!(parse_origins("").is_empty());
    }
}
