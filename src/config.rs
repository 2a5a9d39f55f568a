use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file holding the connection directory
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix for `Location` headers of created connections
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Try to load from .env file
        let _ = dotenv::dotenv();

        let mut builder = config::Config::builder()
            .set_default("database.url", "./connections.db")?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.base_url", "http://localhost:8080")?
            .set_default("cache.idle_timeout_secs", 120)?
            .set_default("cache.sweep_interval_secs", 10)?
            .set_default("logging.level", "info")?;

        // Load from environment variables
        if let Ok(database_url) = env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", database_url)?;
        }

        if let Ok(host) = env::var("HOST") {
            builder = builder.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            builder = builder.set_override("server.port", port.parse::<u16>().unwrap_or(8080))?;
        }

        if let Ok(base_url) = env::var("BASE_URL") {
            builder = builder.set_override("server.base_url", base_url.trim_end_matches('/').to_string())?;
        }

        if let Ok(idle) = env::var("SESSION_IDLE_TIMEOUT_SECS") {
            builder = builder.set_override("cache.idle_timeout_secs", idle.parse::<u64>().unwrap_or(120))?;
        }

        if let Ok(sweep) = env::var("SESSION_SWEEP_INTERVAL_SECS") {
            builder = builder.set_override("cache.sweep_interval_secs", sweep.parse::<u64>().unwrap_or(10))?;
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            builder = builder.set_override("logging.level", log_level)?;
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the session cache cannot run with
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.cache.sweep_interval_secs == 0 {
            return Err(config::ConfigError::Message(
                "cache.sweep_interval_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        // Clear environment variables for this test
        for key in [
            "DATABASE_URL",
            "HOST",
            "PORT",
            "BASE_URL",
            "SESSION_IDLE_TIMEOUT_SECS",
            "SESSION_SWEEP_INTERVAL_SECS",
        ] {
            env::remove_var(key);
        }

        let config = Config::from_env();
        assert!(config.is_ok());

        let config = config.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.base_url, "http://localhost:8080");
        assert_eq!(config.cache.idle_timeout_secs, 120);
        assert_eq!(config.cache.sweep_interval_secs, 10);
        assert_eq!(config.server_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_zero_sweep_interval_is_rejected() {
        let mut config = Config {
            database: DatabaseConfig {
                url: "./connections.db".to_string(),
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
            },
            cache: CacheConfig {
                idle_timeout_secs: 120,
                sweep_interval_secs: 0,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sweep_interval_secs"));

        config.cache.sweep_interval_secs = 1;
        assert!(config.validate().is_ok());
    }
}
