use crate::workflows::rhna::inventory::DEFAULT_JURISDICTION;
use crate::workflows::rhna::{ColumnPrefix, LinkageOptions};
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the ledger.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub sources: SourceConfig,
    pub analysis: AnalysisConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("RHNA_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let parcels_path = env::var("RHNA_PARCELS_PATH")
            .unwrap_or_else(|_| "./data/parcels.csv".to_string());
        let permits_path = env::var("RHNA_PERMITS_PATH")
            .unwrap_or_else(|_| "./data/building_permits.csv".to_string());

        let jurisdiction =
            env::var("RHNA_JURISDICTION").unwrap_or_else(|_| DEFAULT_JURISDICTION.to_string());

        let column_prefix = match env::var("RHNA_COLUMN_PREFIX") {
            Ok(raw) => raw
                .parse::<ColumnPrefix>()
                .map_err(|_| ConfigError::InvalidColumnPrefix(raw))?,
            Err(_) => ColumnPrefix::default(),
        };

        let record_backups = match env::var("RHNA_RECORD_BACKUPS") {
            Ok(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidFlag {
                name: "RHNA_RECORD_BACKUPS",
                value: raw,
            })?,
            Err(_) => true,
        };

        let log_level = env::var("RHNA_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            sources: SourceConfig {
                parcels_path: PathBuf::from(parcels_path),
                permits_path: PathBuf::from(permits_path),
            },
            analysis: AnalysisConfig {
                jurisdiction,
                column_prefix,
                record_backups,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Locations of the parcel and permit exports.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub parcels_path: PathBuf,
    pub permits_path: PathBuf,
}

/// Knobs for the variants the analysis has been run with.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub jurisdiction: String,
    pub column_prefix: ColumnPrefix,
    pub record_backups: bool,
}

impl AnalysisConfig {
    pub fn linkage_options(&self) -> LinkageOptions {
        LinkageOptions {
            record_backups: self.record_backups,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidColumnPrefix(String),
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidColumnPrefix(value) => write!(
                f,
                "RHNA_COLUMN_PREFIX must be 'pipeline' or 'permit', got '{}'",
                value
            ),
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{} must be true or false, got '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
