use std::env;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::AdLiftError;

/// Application configuration loaded from environment variables.
///
/// Collaborator endpoints are required; a missing one is a configuration
/// error at startup, not a runtime surprise on the first evolution cycle.
#[derive(Debug, Clone)]
pub struct Config {
    // Collaborator endpoints
    pub metrics_base_url: String,
    pub variants_base_url: String,
    pub lineage_base_url: String,

    // Arm statistics store. Falls back to the in-process store when unset.
    pub database_url: Option<String>,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Evolution tuning
    pub breeding_pool_pct: f64,
    pub mutation_rate: f64,
    pub min_impressions: u64,
    pub fitness_weight_ctr: f64,
    pub fitness_weight_cvr: f64,
    pub fitness_weight_revenue: f64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AdLiftError> {
        Ok(Self {
            metrics_base_url: required_env("METRICS_BASE_URL")?,
            variants_base_url: required_env("VARIANTS_BASE_URL")?,
            lineage_base_url: required_env("LINEAGE_BASE_URL")?,
            database_url: env::var("DATABASE_URL").ok(),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: parsed_env("WEB_PORT", 8080)?,
            breeding_pool_pct: parsed_env("BREEDING_POOL_PERCENTAGE", 20.0)?,
            mutation_rate: parsed_env("MUTATION_RATE", 0.15)?,
            min_impressions: parsed_env("MIN_INTERACTIONS_FOR_EVOLUTION", 1000)?,
            fitness_weight_ctr: parsed_env("FITNESS_WEIGHT_CTR", 0.3)?,
            fitness_weight_cvr: parsed_env("FITNESS_WEIGHT_CONVERSION", 0.5)?,
            fitness_weight_revenue: parsed_env("FITNESS_WEIGHT_REVENUE", 0.2)?,
        })
    }
}

fn required_env(key: &str) -> Result<String, AdLiftError> {
    env::var(key).map_err(|_| AdLiftError::Config(format!("{key} environment variable is required")))
}

fn parsed_env<T>(key: &str, default: T) -> Result<T, AdLiftError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| AdLiftError::Config(format!("{key} must be a valid value: {e}"))),
        Err(_) => Ok(default),
    }
}
