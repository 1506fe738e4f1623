use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::report::ToolKind;

use super::types::AppConfig;

pub const DEFAULT_CONFIG_FILE: &str = "qcheck.toml";

/// `./qcheck.toml` if present, defaults otherwise, then `QCHECK_*` overrides.
pub fn load_default() -> Result<AppConfig, ConfigError> {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    let cfg = if path.exists() {
        read_file(path)?
    } else {
        AppConfig::default()
    };
    finish(cfg, |k| std::env::var(k).ok())
}

/// An explicit path must exist.
pub fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }
    let cfg = read_file(path)?;
    finish(cfg, |k| std::env::var(k).ok())
}

pub fn parse_str(s: &str) -> Result<AppConfig, ConfigError> {
    toml::from_str::<AppConfig>(s).map_err(|e| ConfigError::Parse(e.into()))
}

fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_str(&s)
}

fn finish<F>(mut cfg: AppConfig, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    apply_env_overrides(&mut cfg, lookup)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Blank values are ignored, so `QCHECK_X=` never clears a file setting.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("QCHECK_PROJECT_ROOT") {
        cfg.project_root = Some(PathBuf::from(v));
    }
    for (key, kind) in [
        ("QCHECK_PYTEST_BIN", ToolKind::Test),
        ("QCHECK_MYPY_BIN", ToolKind::Type),
        ("QCHECK_RUFF_BIN", ToolKind::Style),
    ] {
        if let Some(v) = get(key) {
            cfg.tools.get_mut(kind).program = Some(v);
        }
    }
    if let Some(v) = get("QCHECK_MAX_FAILURES") {
        cfg.display.max_failures = parse_num("QCHECK_MAX_FAILURES", &v)?;
    }
    if let Some(v) = get("QCHECK_MAX_OUTPUT_LINES") {
        cfg.display.max_output_lines = parse_num("QCHECK_MAX_OUTPUT_LINES", &v)?;
    }
    if let Some(v) = get("QCHECK_TIMEOUT_SECS") {
        let secs: u64 = parse_num("QCHECK_TIMEOUT_SECS", &v)?;
        for kind in ToolKind::ALL {
            cfg.tools.get_mut(kind).timeout_secs = Some(secs);
        }
    }
    Ok(())
}

fn parse_num<T>(key: &str, v: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    v.trim().parse::<T>().map_err(|e| ConfigError::EnvInvalid {
        key: key.to_string(),
        source: e.into(),
    })
}

pub fn validate(cfg: &AppConfig) -> Result<(), ConfigError> {
    if cfg.display.max_failures == 0 {
        return Err(ConfigError::Validation(
            "display.max_failures must be at least 1".into(),
        ));
    }
    if cfg.display.max_output_lines < 5 {
        return Err(ConfigError::Validation(
            "display.max_output_lines must be at least 5".into(),
        ));
    }
    if cfg.run_order.is_empty() {
        return Err(ConfigError::Validation("run_order must not be empty".into()));
    }
    let mut seen = HashSet::new();
    for kind in &cfg.run_order {
        if !seen.insert(*kind) {
            return Err(ConfigError::Validation(format!(
                "run_order lists {kind} more than once"
            )));
        }
    }
    for kind in ToolKind::ALL {
        if cfg.tools.get(kind).timeout_secs == Some(0) {
            return Err(ConfigError::Validation(format!(
                "tools.{}.timeout_secs must be at least 1",
                kind.default_program()
            )));
        }
    }
    if cfg.executor.capture_bytes == 0 {
        return Err(ConfigError::Validation(
            "executor.capture_bytes must be greater than 0".into(),
        ));
    }
    Ok(())
}
