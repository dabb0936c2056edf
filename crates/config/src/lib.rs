//! audiohub configuration.
//!
//! Layered with `figment`, later layers winning:
//!
//! 1. built-in defaults,
//! 2. a config file: either the one given explicitly, or `config.toml`,
//!    `config.yaml`, `config.yml` or `config.json` in the platform config
//!    directory,
//! 3. `AUDIOHUB_`-prefixed environment variables, with `__` separating
//!    nested keys (`AUDIOHUB_SCAN__CONCURRENCY=4`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILES: [&str; 4] = ["config.toml", "config.yaml", "config.yml", "config.json"];
const ENV_PREFIX: &str = "AUDIOHUB_";
const DATABASE_FILE: &str = "library.sqlite";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Label for the library, used in logs.
    pub name: String,
    /// Absolute path of the folder holding one sub-folder per book.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}
impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            name: "local".to_string(),
            root: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// SQLite database file. Defaults to the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub concurrency: usize,
    /// Seconds a single file's extraction may take; `0` means no limit.
    pub extract_timeout: u64,
}
impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            extract_timeout: 300,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub cache: CacheConfig,
    pub scan: ScanConfig,
}

impl Config {
    /// Load and validate configuration from every layer.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let figment = Self::figment(explicit)?.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    /// Defaults plus the config file layer.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            return with_file(figment, path);
        }
        let Some(dirs) = project_dirs() else {
            return Ok(figment);
        };
        match CONFIG_FILES.iter().map(|name| dirs.config_dir().join(name)).find(|path| path.is_file()) {
            Some(path) => with_file(figment, &path),
            None => Ok(figment),
        }
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scan.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("scan.concurrency must be at least 1".to_string()));
        }
        if let Some(root) = &self.library.root
            && !root.is_absolute()
        {
            exn::bail!(ErrorKind::Invalid(format!("library.root must be absolute, got {}", root.display())));
        }
        if self.library.name.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("library.name must not be empty".to_string()));
        }
        Ok(())
    }

    /// The library root; scanning is impossible without one.
    pub fn root(&self) -> Result<&Path> {
        match &self.library.root {
            Some(root) => Ok(root),
            None => exn::bail!(ErrorKind::Invalid("library.root is not set".to_string())),
        }
    }

    /// Where the library database lives.
    pub fn cache_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.cache.path {
            return Ok(path.clone());
        }
        match project_dirs() {
            Some(dirs) => Ok(dirs.data_dir().join(DATABASE_FILE)),
            None => exn::bail!(ErrorKind::NoProjectDirectory),
        }
    }

    pub fn extract_timeout(&self) -> Option<Duration> {
        (self.scan.extract_timeout > 0).then(|| Duration::from_secs(self.scan.extract_timeout))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "audiohub")
}

fn with_file(figment: Figment, path: &Path) -> Result<Figment> {
    tracing::debug!(path = %path.display(), "loading config file");
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    let figment = match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::Invalid(format!("unsupported config format: {}", path.display()))),
    };
    Ok(figment)
}
