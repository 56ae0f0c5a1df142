//! Coordinator configuration file management.
//!
//! A small JSON document, created with defaults on first run:
//! `{"hostname": "localhost:8462", "database": "./database.sqlite"}`.
//! `FREON_COORDINATOR_CONFIG` overrides the path, otherwise it lives at
//! `$HOME/.freon-coordinator.json`.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Complete coordinator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Listen address, `host:port`.
    pub hostname: String,
    /// Path of the SQLite database file.
    pub database: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            hostname: "localhost:8462".to_string(),
            database: "./database.sqlite".to_string(),
        }
    }
}

fn config_path() -> anyhow::Result<PathBuf> {
    if let Ok(path) = std::env::var("FREON_COORDINATOR_CONFIG") {
        return Ok(PathBuf::from(path));
    }
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set and FREON_COORDINATOR_CONFIG is absent"))?;
    Ok(PathBuf::from(home).join(".freon-coordinator.json"))
}

impl CoordinatorConfig {
    /// Load the config, writing a default file on first run.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path()?;
        match File::open(&path) {
            Ok(file) => Ok(serde_json::from_reader(BufReader::new(file))?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let config = CoordinatorConfig::default();
                config.save()?;
                Ok(config)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Write the config back, pretty-printed.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = config_path()?;
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips() {
        let config = CoordinatorConfig::default();
        let json = serde_json::to_string(&config).expect("serialize");
        let parsed: CoordinatorConfig = serde_json::from_str(&json).expect("parse");
        assert_eq!(parsed.hostname, "localhost:8462");
        assert_eq!(parsed.database, "./database.sqlite");
    }

    #[test]
    fn parses_partial_overrides() {
        let parsed: CoordinatorConfig = serde_json::from_str(
            r#"{"hostname": "0.0.0.0:9000", "database": "/var/lib/freon.sqlite"}"#,
        )
        .expect("parse");
        assert_eq!(parsed.hostname, "0.0.0.0:9000");
    }
}
