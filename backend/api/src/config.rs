//! Application configuration loaded from environment variables.

use crate::errors::{ApiError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Absolute tolerance when comparing a client-offered price against the
    /// server-derived cost per share
    pub price_tolerance: f64,
    /// Endpoint of the external transaction verifier
    pub verifier_url: String,
    /// GST rate applied to invoices (fraction, not percent)
    pub gst_rate: f64,
    /// Flat fee billed when a franchise listing is created
    pub listing_fee: f64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./franchise.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid API_PORT".to_string()))?,
            price_tolerance: env_var("PRICE_TOLERANCE")
                .unwrap_or_else(|_| "0.01".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid PRICE_TOLERANCE".to_string()))?,
            verifier_url: env_var("VERIFIER_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8899/verify".to_string()),
            gst_rate: env_var("GST_RATE")
                .unwrap_or_else(|_| "0.18".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid GST_RATE".to_string()))?,
            listing_fee: env_var("LISTING_FEE")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid LISTING_FEE".to_string()))?,
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| ApiError::Config(format!("Missing env var: {key}")))
}
