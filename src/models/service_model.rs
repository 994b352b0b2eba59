use serde::{Deserialize, Serialize};

use canlog::core::constants::DEFAULT_MAX_ERRORS;
use canlog::{SignalInfo, StoreSummary, TimeUnit};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub version: String,
    pub description: String,
    pub connection: Connection,
    /// Row errors tolerated per log; zero or negative disables the limit.
    pub max_errors: i64,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Telemetry log reader".to_string(),
            connection: Connection::default(),
            max_errors: DEFAULT_MAX_ERRORS,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub ip: String,
    /// 0 asks the OS for a free port.
    pub port: u16,
}

impl Default for Connection {
    fn default() -> Self {
        Self {
            ip: "127.0.0.1".to_string(),
            port: 0,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct FileReadRequest {
    pub path: String,
    pub max_errors: Option<i64>,
}

#[derive(Serialize, Debug)]
pub struct FileReadResponse {
    pub id: String,
    pub name: String,
    pub path: String,
    pub loaded_at: String,
    pub summary: StoreSummary,
    pub signals: Vec<SignalInfo>,
}

#[derive(Deserialize, Debug)]
pub struct SearchQuery {
    pub q: String,
}

/// Window bounds are in `unit`; a missing or negative `end` runs to the end of the data.
#[derive(Deserialize, Debug, Default)]
pub struct StatsQuery {
    pub start: Option<f64>,
    pub end: Option<f64>,
    #[serde(default)]
    pub unit: TimeUnit,
}
