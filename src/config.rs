use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub rate_api_url: String,
    pub refresh_interval_secs: u64,
    pub database_url: String,
    pub listings_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rate_api_url: "https://rates.costarent.app/api/latest".to_string(),
            refresh_interval_secs: 30,
            database_url: "sqlite://carrates.db".to_string(),
            listings_path: "listings.json".to_string(),
        }
    }
}

fn get_config_path() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("config.toml");
    path
}

pub fn load_config() -> anyhow::Result<Config> {
    load_config_from(&get_config_path())
}

pub fn load_config_from(path: &PathBuf) -> anyhow::Result<Config> {
    let config_str = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&config_str)?;
    Ok(config)
}

pub fn save_config(config: &Config) -> anyhow::Result<()> {
    save_config_to(config, &get_config_path())
}

pub fn save_config_to(config: &Config, path: &PathBuf) -> anyhow::Result<()> {
    let config_str = toml::to_string_pretty(config)?;
    fs::write(path, config_str)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.refresh_interval_secs, 30);
        assert_eq!(config.listings_path, "listings.json");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.refresh_interval_secs = 120;
        config.rate_api_url = "http://localhost:9999/rates".to_string();
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.refresh_interval_secs, 120);
        assert_eq!(loaded.rate_api_url, "http://localhost:9999/rates");
        assert_eq!(loaded.database_url, config.database_url);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config_from(&dir.path().join("nope.toml")).is_err());
    }
}
