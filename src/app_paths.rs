use anyhow::{anyhow, Result};
use std::fs;
use std::path::PathBuf;

pub struct AppPaths;

impl AppPaths {
    /// `~/mercury_data`, without touching the filesystem.
    pub fn data_dir_path() -> Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow!("Cannot determine home directory"))?
            .join("mercury_data"))
    }

    /// `~/mercury_data`: key file, memory file and logs live here. Created on
    /// first use.
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = Self::data_dir_path()?;
        fs::create_dir_all(&data_dir)?;
        Ok(data_dir)
    }

    pub fn config_file() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("mercury").join("config.toml"))
    }

    pub fn api_key_file() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("api_key"))
    }

    pub fn memory_file() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("memory.json"))
    }

    pub fn last_recipient_file() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("last_recipient.json"))
    }

    pub fn log_dir() -> Result<PathBuf> {
        let log_dir = Self::data_dir()?.join("logs");
        fs::create_dir_all(&log_dir)?;
        Ok(log_dir)
    }
}
