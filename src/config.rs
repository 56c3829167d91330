/// Configuration management for the events board
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub email: Option<EmailConfig>,
    pub places: Option<PlacesConfig>,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Token lifetime in seconds
    pub token_ttl: i64,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Nearby-places lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesConfig {
    pub api_key: String,
    /// Cache TTL for lookup results, in seconds
    pub cache_ttl: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("BOARD_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("BOARD_PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid port number".to_string()))?;
        let version = env::var("BOARD_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let data_directory: PathBuf = env::var("BOARD_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("BOARD_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("board.sqlite"));

        let jwt_secret = env::var("BOARD_JWT_SECRET")
            .map_err(|_| ApiError::Validation("JWT secret required".to_string()))?;
        let token_ttl = env::var("BOARD_TOKEN_TTL")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .unwrap_or(86400);

        let email = if let Ok(smtp_url) = env::var("BOARD_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("BOARD_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
            })
        } else {
            None
        };

        let places = if let Ok(api_key) = env::var("BOARD_PLACES_API_KEY") {
            Some(PlacesConfig {
                api_key,
                cache_ttl: env::var("BOARD_PLACES_CACHE_TTL")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .unwrap_or(300),
            })
        } else {
            None
        };

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                database,
            },
            authentication: AuthConfig {
                jwt_secret,
                token_ttl,
            },
            email,
            places,
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ApiError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(ApiError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.token_ttl <= 0 {
            return Err(ApiError::Validation(
                "Token TTL must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_secret(secret: &str) -> ServerConfig {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 4000,
                version: "0.1.0".to_string(),
            },
            storage: StorageConfig {
                data_directory: "./data".into(),
                database: "./data/board.sqlite".into(),
            },
            authentication: AuthConfig {
                jwt_secret: secret.to_string(),
                token_ttl: 86400,
            },
            email: None,
            places: None,
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    #[test]
    fn rejects_short_jwt_secret() {
        let config = config_with_secret("too-short");
        assert!(config.validate().is_err());
    }

    #[test]
    fn accepts_long_jwt_secret() {
        let config = config_with_secret("0123456789abcdef0123456789abcdef");
        assert!(config.validate().is_ok());
    }
}
