//! Configuration Vault – reads/writes `~/.egomap/config.toml`.
//!
//! ```toml
//! [map]
//! image_size = 256
//! marker_radius = 6
//! outlier_std_multiplier = 2.0
//!
//! [watermark]
//! size = 24
//! ```
//!
//! Every key is optional; missing keys take the library defaults.

use egomap_render::{MapConfig, WatermarkConfig};
use egomap_runtime::SpatialContextConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted user configuration stored in `~/.egomap/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Map rendering tunables.
    #[serde(default)]
    pub map: MapConfig,

    /// Keyframe watermark tunables.
    #[serde(default)]
    pub watermark: WatermarkConfig,
}

impl Config {
    pub fn context_config(&self) -> SpatialContextConfig {
        SpatialContextConfig {
            map: self.map.clone(),
            watermark: self.watermark.clone(),
        }
    }
}

/// Return the path to `~/.egomap/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".egomap").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// The effective configuration: the file if present, defaults otherwise,
/// with environment overrides applied either way.
pub fn resolve() -> Result<Config, String> {
    match load()? {
        Some(cfg) => Ok(cfg),
        None => {
            let mut cfg = Config::default();
            apply_env_overrides(&mut cfg);
            Ok(cfg)
        }
    }
}

/// Apply `EGOMAP_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `EGOMAP_IMAGE_SIZE` | `map.image_size` |
/// | `EGOMAP_OUTLIER_STD` | `map.outlier_std_multiplier` |
/// | `EGOMAP_MARKER_RADIUS` | `map.marker_radius` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("EGOMAP_IMAGE_SIZE")
        && let Ok(size) = v.trim().parse::<u32>()
    {
        cfg.map.image_size = size;
    }
    if let Ok(v) = std::env::var("EGOMAP_OUTLIER_STD")
        && let Ok(k) = v.trim().parse::<f64>()
    {
        cfg.map.outlier_std_multiplier = k;
    }
    if let Ok(v) = std::env::var("EGOMAP_MARKER_RADIUS")
        && let Ok(r) = v.trim().parse::<u32>()
    {
        cfg.map.marker_radius = r;
    }
}

/// Save the config to disk, creating `~/.egomap/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
