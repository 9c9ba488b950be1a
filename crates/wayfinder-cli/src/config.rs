//! Configuration Vault – reads/writes `~/.wayfinder/config.toml`.
//!
//! The file holds a [`ScanConfig`]; missing fields fall back to the built-in
//! defaults and `WAYFINDER_*` environment variables override individual
//! values after loading. Range validation stays in
//! [`ScanConfig::validate`] – the vault only handles I/O and overrides.

use std::fs;
use std::path::PathBuf;

use wayfinder_runtime::ScanConfig;
use wayfinder_types::TriggerMode;

/// Return the path to `~/.wayfinder/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
/// Extracted for testability without mutating environment variables.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".wayfinder").join("config.toml")
}

/// Load the config from disk. Returns `None` if the file does not exist.
pub fn load() -> Result<Option<ScanConfig>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &PathBuf) -> Result<Option<ScanConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: ScanConfig =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `WAYFINDER_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `WAYFINDER_TRIGGER` (`distance`/`time`) | `trigger` |
/// | `WAYFINDER_REFRESH_DISTANCE` | `refresh_distance` |
/// | `WAYFINDER_TARGET_MARKERS` | `target_marker_count` |
/// | `WAYFINDER_PARALLELISM` | `parallelism` |
/// | `WAYFINDER_CONE_DEG` | `cone_half_angle_deg` |
pub fn apply_env_overrides(cfg: &mut ScanConfig) {
    if let Ok(v) = std::env::var("WAYFINDER_TRIGGER") {
        match v.to_ascii_lowercase().as_str() {
            "distance" => cfg.trigger = TriggerMode::Distance,
            "time" => cfg.trigger = TriggerMode::Time,
            _ => {}
        }
    }
    if let Ok(v) = std::env::var("WAYFINDER_REFRESH_DISTANCE")
        && let Ok(d) = v.parse::<f32>()
    {
        cfg.refresh_distance = d;
    }
    if let Ok(v) = std::env::var("WAYFINDER_TARGET_MARKERS")
        && let Ok(n) = v.parse::<usize>()
    {
        cfg.target_marker_count = n;
    }
    if let Ok(v) = std::env::var("WAYFINDER_PARALLELISM")
        && let Ok(n) = v.parse::<usize>()
    {
        cfg.parallelism = n;
    }
    if let Ok(v) = std::env::var("WAYFINDER_CONE_DEG")
        && let Ok(deg) = v.parse::<f32>()
    {
        cfg.cone_half_angle_deg = deg;
    }
}

/// Save the config to disk, creating `~/.wayfinder/` if necessary.
pub fn save(cfg: &ScanConfig) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &ScanConfig, path: &PathBuf) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
