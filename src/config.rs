use anyhow::Result;
use std::env;

pub const MEMORY_STORE_URL: &str = "memory://";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub shift_collection: String,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_env_only()
    }

    /// Load configuration from environment variables only (without loading .env files)
    /// This is useful for testing where you want to control the environment directly
    pub fn from_env_only() -> Result<Self> {
        let port = match env::var("PORT") {
            Ok(port) => port
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid PORT `{}`: {}", port, e))?,
            Err(_) => 8080,
        };

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/shiftlog".to_string()),
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(10),
            shift_collection: env::var("SHIFT_COLLECTION")
                .unwrap_or_else(|_| "work_shifts".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            cors_origins: parse_origins(
                &env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()),
            ),
        })
    }

    pub fn test_config() -> Self {
        Config {
            database_url: MEMORY_STORE_URL.to_string(),
            database_max_connections: 1,
            shift_collection: "work_shifts".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            cors_origins: vec!["*".to_string()],
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with(MEMORY_STORE_URL)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|origin| origin == "*")
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_split_and_trimmed() {
        assert_eq!(
            parse_origins("http://a.example, http://b.example ,,"),
            vec!["http://a.example", "http://b.example"]
        );
    }

    #[test]
    fn wildcard_or_empty_origins_allow_any() {
        let mut config = Config::test_config();
        assert!(config.allows_any_origin());

        config.cors_origins = Vec::new();
        assert!(config.allows_any_origin());

        config.cors_origins = vec!["http://localhost:3000".to_string()];
        assert!(!config.allows_any_origin());
    }

    #[test]
    fn test_config_uses_memory_store() {
        let config = Config::test_config();
        assert!(config.uses_memory_store());
        assert!(!config.is_production());
        assert_eq!(config.server_address(), "127.0.0.1:0");
    }
}
