use std::path::PathBuf;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::naming::VersionSuffix;
use crate::ytdlp::{Browser, Downloader};

/// Downloader executable, or a full command line such as
/// `["python3", "-m", "yt_dlp"]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ProgramSetting {
    Program(String),
    Command(Vec<String>),
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub output_dir: Option<PathBuf>,
    pub ytdlp_program: Option<ProgramSetting>,
    pub format: Option<String>,
    pub version_suffix: VersionSuffix,
    /// Deployment switch for `--cookies-from-browser`
    pub allow_browser_cookies: bool,
    pub default_browser: Option<Browser>,
}

impl Config {
    /// Load config from ~/.config/ytclip/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    /// Downloader configured from this file
    pub fn downloader(&self) -> Downloader {
        let mut downloader = match &self.ytdlp_program {
            Some(ProgramSetting::Program(program)) => Downloader::new(program.clone()),
            Some(ProgramSetting::Command(command)) => Downloader::from_command(command),
            None => Downloader::default(),
        };
        if let Some(format) = &self.format {
            downloader = downloader.with_format(format.clone());
        }
        downloader
            .with_browser_cookies(self.allow_browser_cookies)
            .with_suffix(self.version_suffix)
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytclip")
        .join("config.toml")
}
