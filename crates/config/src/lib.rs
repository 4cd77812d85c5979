use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use core_types::{ModelFallback, UiLanguage, UploadFile, format_file_size};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub extra_headers: Vec<(String, String)>,
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            request_timeout_ms: default_request_timeout_ms(),
            extra_headers: Vec::new(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

const fn default_request_timeout_ms() -> Option<u64> {
    Some(120_000)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    #[serde(default)]
    pub model_fallback: ModelFallback,
}

impl SessionConfig {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: default_search_debounce_ms(),
            model_fallback: ModelFallback::None,
        }
    }
}

const fn default_search_debounce_ms() -> u64 {
    300
}

/// File-picker hints. The backend decides what it actually accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_accepted_extensions")]
    pub accepted_extensions: Vec<String>,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            accepted_extensions: default_accepted_extensions(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_accepted_extensions() -> Vec<String> {
    ["pdf", "doc", "docx", "txt", "html"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

const fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadWarning {
    UnsupportedExtension(String),
    TooLarge { size: u64, max: u64 },
}

impl fmt::Display for UploadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadWarning::UnsupportedExtension(ext) if ext.is_empty() => {
                f.write_str("file has no extension")
            }
            UploadWarning::UnsupportedExtension(ext) => write!(f, "`.{ext}` files are not accepted"),
            UploadWarning::TooLarge { size, max } => write!(
                f,
                "file is {} but the limit is {}",
                format_file_size(*size),
                format_file_size(*max)
            ),
        }
    }
}

impl UploadConfig {
    pub fn check(&self, file: &UploadFile) -> Vec<UploadWarning> {
        let mut warnings = Vec::new();
        let ext = file.extension().unwrap_or_default();
        if !self
            .accepted_extensions
            .iter()
            .any(|accepted| accepted.trim_start_matches('.').eq_ignore_ascii_case(&ext))
        {
            warnings.push(UploadWarning::UnsupportedExtension(ext));
        }
        if file.size() > self.max_file_size {
            warnings.push(UploadWarning::TooLarge {
                size: file.size(),
                max: self.max_file_size,
            });
        }
        warnings
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub schema_version: u32,
    pub language: UiLanguage,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            language: UiLanguage::EnUs,
            backend: BackendConfig::default(),
            session: SessionConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join("config.json"),
        }
    }

    pub fn from_default_location() -> Result<Self> {
        let mut dir = dirs::config_dir().context("failed to resolve config_dir")?;
        dir.push("docintel");
        Ok(Self::from_dir(dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_or_init(&self) -> Result<ClientConfig> {
        if !self.path.exists() {
            let config = ClientConfig::default();
            self.save(&config)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let mut config: ClientConfig =
            serde_json::from_str(&raw).context("failed to parse client config json")?;
        self.migrate(&mut config);
        self.save(&config)?;
        Ok(config)
    }

    pub fn save(&self, config: &ClientConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let text = serde_json::to_string_pretty(config).context("failed to serialize config")?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }

    fn migrate(&self, config: &mut ClientConfig) {
        if config.schema_version >= CURRENT_SCHEMA_VERSION {
            return;
        }

        warn!(
            from = config.schema_version,
            to = CURRENT_SCHEMA_VERSION,
            "migrating client config schema"
        );

        if config.upload.accepted_extensions.is_empty() {
            config.upload.accepted_extensions = default_accepted_extensions();
        }
        if config.session.search_debounce_ms == 0 {
            config.session.search_debounce_ms = default_search_debounce_ms();
        }
        config.schema_version = CURRENT_SCHEMA_VERSION;
    }
}
