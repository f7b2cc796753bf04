//! Configuration file support for Loadgrid
//!
//! Loads project-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.loadgridrc.json` in project root
//! 3. `loadgrid.config.json` in project root
//! 4. `"loadgrid"` key in `package.json`
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::calendar::{CalendarKey, DEFAULT_HORIZON_MONTHS};
use crate::color::{ColorBreakpoint, ColorRamp};
use crate::session::Identity;
use crate::view::{Filters, SortState};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Longest display horizon accepted from configuration
const MAX_HORIZON_MONTHS: u32 = 120;

/// Loadgrid configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadgridConfig {
    /// Color breakpoints (default: built-in white-green-yellow-red ramp)
    #[serde(default)]
    pub colors: Vec<ColorBreakpoint>,

    /// Loads at or above this value use the last color (default: unset)
    #[serde(default)]
    pub saturation_cap: Option<i64>,

    /// Fixed display range (default: current month plus horizon)
    #[serde(default)]
    pub range: Option<RangeConfig>,

    /// Months shown after the current month when no range is fixed (default: 18)
    #[serde(default)]
    pub horizon_months: Option<u32>,

    /// Initial sort (default: name ascending)
    #[serde(default)]
    pub sort: Option<SortState>,

    /// Row identity: "name" or "id" (default: name)
    #[serde(default)]
    pub identity: Option<Identity>,

    /// Default filters
    #[serde(default)]
    pub filters: Option<Filters>,
}

/// Inclusive display range; an inverted range shows no months
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeConfig {
    pub start: CalendarKey,
    pub end: CalendarKey,
}

/// Resolved configuration with a built color ramp
#[derive(Debug)]
pub struct ResolvedConfig {
    pub ramp: ColorRamp,
    pub range: Option<(CalendarKey, CalendarKey)>,
    pub horizon_months: u32,
    pub sort: SortState,
    pub identity: Identity,
    pub filters: Filters,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl LoadgridConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if !self.colors.is_empty() {
            ColorRamp::new(self.colors.clone()).context("invalid colors")?;
        }

        if let Some(cap) = self.saturation_cap {
            if cap <= 0 {
                anyhow::bail!("saturation_cap must be positive (got {})", cap);
            }
        }

        if let Some(horizon) = self.horizon_months {
            if horizon == 0 {
                anyhow::bail!("horizon_months must be positive (got {})", horizon);
            }
            if horizon > MAX_HORIZON_MONTHS {
                anyhow::bail!(
                    "horizon_months must be at most {} (got {})",
                    MAX_HORIZON_MONTHS,
                    horizon
                );
            }
        }

        Ok(())
    }

    /// Resolve config into compiled form ready for use
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let ramp = if self.colors.is_empty() {
            ColorRamp::builtin()
        } else {
            ColorRamp::new(self.colors.clone())?
        }
        .with_saturation_cap(self.saturation_cap);

        Ok(ResolvedConfig {
            ramp,
            range: self.range.map(|r| (r.start, r.end)),
            horizon_months: self.horizon_months.unwrap_or(DEFAULT_HORIZON_MONTHS),
            sort: self.sort.unwrap_or_default(),
            identity: self.identity.unwrap_or_default(),
            filters: self.filters.clone().unwrap_or_default(),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        LoadgridConfig::default().resolve()
    }
}

/// Discover and load a config file from the project root
///
/// Search order:
/// 1. `.loadgridrc.json`
/// 2. `loadgrid.config.json`
/// 3. `"loadgrid"` key in `package.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(LoadgridConfig, PathBuf)>> {
    let rc_path = project_root.join(".loadgridrc.json");
    if rc_path.exists() {
        let config = load_config_file(&rc_path)?;
        return Ok(Some((config, rc_path)));
    }

    let config_path = project_root.join("loadgrid.config.json");
    if config_path.exists() {
        let config = load_config_file(&config_path)?;
        return Ok(Some((config, config_path)));
    }

    let pkg_path = project_root.join("package.json");
    if pkg_path.exists() {
        if let Some(config) = load_from_package_json(&pkg_path)? {
            return Ok(Some((config, pkg_path)));
        }
    }

    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<LoadgridConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: LoadgridConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load loadgrid config from the "loadgrid" key in package.json
fn load_from_package_json(path: &Path) -> Result<Option<LoadgridConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let pkg: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    match pkg.get("loadgrid") {
        Some(value) => {
            let config: LoadgridConfig = serde_json::from_value(value.clone())
                .with_context(|| format!("invalid loadgrid config in {}", path.display()))?;
            config
                .validate()
                .with_context(|| format!("invalid loadgrid config in {}", path.display()))?;
            Ok(Some(config))
        }
        None => Ok(None),
    }
}

/// Load and resolve config for a project
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from the project root.
/// Returns default config if nothing is found.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (LoadgridConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}
