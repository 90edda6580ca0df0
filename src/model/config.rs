use std::collections::HashMap;

use clap::Parser;
use serde::{Deserialize, Serialize};

/**
 * Command-line arguments for the application.
 */
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct ApplicationArguments {
    /**
     * Path to the configuration file.
     */
    #[arg(short, long)]
    pub config_file: String,
}

/**
 * Represents the configuration for the application.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /**
     * Logging configuration for the application.
     */
    pub logging: LoggingConfig,
    /**
     * Server configuration for the application.
     */
    pub server: Server,
    /**
     * Database configuration for the application.
     */
    pub database: Database,
    /**
     * Upstream APIs exposed through the proxy endpoints.
     */
    pub proxy: ProxyConfig,
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /**
     * Whether to log the target of the log message.
     */
    pub target: bool,
    /**
     * Whether to log thread IDs .
     */
    pub thread_ids: bool,
    /**
     * Whether to log thread names.
     */
    pub thread_names: bool,
    /**
     * Whether to log line numbers.
     */
    pub line_number: bool,
    /**
     * Whether to log the log level.
     */
    pub level: bool,
    /**
     * Whether to use ANSI colors in logs.
     */
    pub ansi: bool,
    /**
     * Whether to log the source file.
     */
    pub file: bool,
    /**
     * Additional directives for logging configuration.
     */
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { target: true, thread_ids: true, thread_names: true, line_number: true, level: true, ansi: true, file: true, directives: vec![] }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    /**
     * Type of the database.
     */
    pub db_type: DatabaseType,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatabaseType {
    /**
     * Embedded `SQLite` database. Timeouts are given in milliseconds.
     */
    #[serde(rename_all = "camelCase")]
    Sqlite { connection_string: String, max_connections: u32, min_connections: u32, acquire_timeout: u64, idle_timeout: Option<u64>, max_lifetime: Option<u64> },
}

/**
 * Represents the server configuration for the application.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    /**
     * Number of worker threads for the server.
     */
    pub workers: usize,
    /**
     * HTTP port for the server.
     */
    pub http_port: Option<u16>,
    /**
     * HTTPS configuration for the server.
     */
    pub https_config: Option<HttpsConfig>,
    /**
     * External API documentation. Target of the docs redirect.
     */
    pub docs_url: String,
}

/**
 * Represents the HTTPS configuration for the server.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpsConfig {
    /**
     * Port for the HTTPS server.
     */
    pub port: u16,
    /**
     * Path to the certificate file.
     */
    pub certificate_file: String,
    /**
     * Path to the private key file.
     */
    pub private_key_file: String,
}

/**
 * Upstream endpoints for the proxy handlers.
 */
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    /**
     * Raw passthrough proxies. Key is the route name below `/proxy/`, value the upstream base URL.
     */
    pub passthrough: HashMap<String, String>,
    /**
     * Market chart endpoint for bitcoin.
     */
    pub bitcoin_stats_url: String,
    /**
     * Base URL of the historical covid-19 endpoint. The country is appended as a path segment.
     */
    pub covid_stats_url: String,
    /**
     * Cocktail search endpoint.
     */
    pub cocktail_stats_url: String,
    /**
     * Optional request timeout for upstream calls. The client default applies when not set.
     */
    pub timeout_secs: Option<u64>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = Config {
            logging: LoggingConfig::default(),
            database: Database {
                db_type: DatabaseType::Sqlite { connection_string: "sqlite::memory:".to_string(), max_connections: 1, min_connections: 1, acquire_timeout: 30, idle_timeout: None, max_lifetime: Some(3600) },
            },
            server: Server { workers: 4, http_port: Some(8080), https_config: None, docs_url: "https://docs.example.com".to_string() },
            proxy: ProxyConfig {
                passthrough: HashMap::from([("fines".to_string(), "https://fines.example.com/api/v1/fines".to_string())]),
                bitcoin_stats_url: "https://coins.example.com/market_chart".to_string(),
                covid_stats_url: "https://covid.example.com/historical".to_string(),
                cocktail_stats_url: "https://cocktails.example.com/search.php".to_string(),
                timeout_secs: Some(10),
            },
        };
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.logging.target, deserialized.logging.target);
        assert_eq!(config.logging.thread_ids, deserialized.logging.thread_ids);
        assert_eq!(config.logging.line_number, deserialized.logging.line_number);
        assert_eq!(config.logging.directives, deserialized.logging.directives);
        assert_eq!(config.server.workers, deserialized.server.workers);
        assert_eq!(config.server.http_port, deserialized.server.http_port);
        assert_eq!(config.server.docs_url, deserialized.server.docs_url);
        assert!(deserialized.server.https_config.is_none());
        assert_eq!(deserialized.proxy.passthrough.get("fines").map(String::as_str), Some("https://fines.example.com/api/v1/fines"));
        assert_eq!(deserialized.proxy.timeout_secs, Some(10));
        let DatabaseType::Sqlite { connection_string, max_lifetime, idle_timeout, .. } = deserialized.database.db_type;
        assert_eq!(connection_string, "sqlite::memory:");
        assert_eq!(max_lifetime, Some(3600));
        assert_eq!(idle_timeout, None);
    }

    #[test]
    fn test_shipped_config_parses() {
        let config: Config = toml::from_str(include_str!("../../config/forest_fires_api.toml")).unwrap();
        assert_eq!(config.server.http_port, Some(16078));
        assert_eq!(config.proxy.passthrough.len(), 4);
        assert!(config.proxy.passthrough.contains_key("temperature-stats"));
        assert!(config.server.https_config.is_none());
    }
}
