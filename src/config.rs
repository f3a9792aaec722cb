use std::path::PathBuf;

use crate::error::Result;

const DEFAULT_MODEL_DIR: &str = "model";

#[derive(Debug, Clone)]
pub struct Config {
    pub tidal_client_id: String,
    pub tidal_client_secret: String,
    pub model_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let tidal_client_id = std::env::var("TIDAL_CLIENT_ID").unwrap_or_default();
        let tidal_client_secret = std::env::var("TIDAL_CLIENT_SECRET").unwrap_or_default();

        let model_dir = std::env::var("MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_DIR));

        Ok(Self {
            tidal_client_id,
            tidal_client_secret,
            model_dir,
        })
    }

    pub fn get_missing_config(&self) -> Vec<String> {
        let mut missing = Vec::new();

        if self.tidal_client_id.is_empty() {
            missing.push("TIDAL_CLIENT_ID".to_string());
        }
        if self.tidal_client_secret.is_empty() {
            missing.push("TIDAL_CLIENT_SECRET".to_string());
        }

        missing
    }

    pub fn validate_tidal_config(&self) -> bool {
        !self.tidal_client_id.is_empty() && !self.tidal_client_secret.is_empty()
    }
}
