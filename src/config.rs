use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

pub const GEMINI_KEY_ENV: &str = "GOOGLE_API_KEY";
pub const ELEVENLABS_KEY_ENV: &str = "ELEVENLABS_API_KEY";
pub const DB_PATH_ENV: &str = "PODSUM_DB_PATH";

pub const MIN_BROWSE_LIMIT: usize = 1;
pub const MAX_BROWSE_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    pub gemini_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    #[serde(default = "default_voice_model_id")]
    pub voice_model_id: String,

    #[serde(default = "default_voice_output_format")]
    pub voice_output_format: String,

    /// Caption languages to try, in order of preference.
    #[serde(default = "default_transcript_languages")]
    pub transcript_languages: Vec<String>,

    #[serde(default = "default_browse_limit")]
    pub default_browse_limit: usize,
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("podsum")
}

fn default_db_path() -> String {
    let data_dir = data_dir();
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("summaries.db").to_string_lossy().to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_voice_id() -> String {
    "JBFqnCBsd6RMkjVDRZzb".to_string()
}

fn default_voice_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_voice_output_format() -> String {
    "mp3_44100_128".to_string()
}

fn default_transcript_languages() -> Vec<String> {
    vec!["en".to_string()]
}

fn default_browse_limit() -> usize {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            gemini_api_key: None,
            elevenlabs_api_key: None,
            gemini_model: default_gemini_model(),
            voice_id: default_voice_id(),
            voice_model_id: default_voice_model_id(),
            voice_output_format: default_voice_output_format(),
            transcript_languages: default_transcript_languages(),
            default_browse_limit: default_browse_limit(),
        }
    }
}

impl Config {
    /// Load the config file (writing defaults on first run), then apply
    /// environment overrides for the secrets and the database location.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(GEMINI_KEY_ENV) {
            self.gemini_api_key = Some(key);
        }
        if let Some(key) = non_empty(ELEVENLABS_KEY_ENV) {
            self.elevenlabs_api_key = Some(key);
        }
        if let Some(path) = non_empty(DB_PATH_ENV) {
            self.db_path = path;
        }
    }

    /// Browse size clamped to the range the UI offers.
    pub fn browse_limit(&self) -> usize {
        self.default_browse_limit
            .clamp(MIN_BROWSE_LIMIT, MAX_BROWSE_LIMIT)
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("podsum")
            .join("config.toml")
    }

    /// Where voice summaries are written when in-process playback is unavailable.
    pub fn voice_dir() -> PathBuf {
        data_dir().join("voice")
    }
}
