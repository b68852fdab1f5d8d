//! Configuration file support for flashreport
//!
//! Loads optional settings from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.flashreportrc.json` in the working directory
//! 3. `flashreport.config.json` in the working directory
//!
//! All fields are optional. CLI flags take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::assemble::{ReportStyles, HIGHLIGHT_RGB};
use crate::enrich::RssiPolicy;
use crate::grid::Style;
use crate::window::Timezone;

/// Default SQLite database written by the flashing station
pub const DEFAULT_DATABASE: &str = "db.sqlite3";

/// Configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlashReportConfig {
    /// Path to the SQLite database (default: db.sqlite3)
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Directory the report is written into (default: current directory)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Highlight fill as six hex digits, e.g. "FD5421"
    #[serde(default)]
    pub highlight_color: Option<String>,

    /// Handling of non-integer rssi values (default: abort)
    #[serde(default)]
    pub rssi_policy: Option<RssiPolicy>,

    /// Timezone used to interpret --start-date/--end-date (default: local)
    #[serde(default)]
    pub timezone: Option<Timezone>,
}

/// Resolved configuration with defaults applied
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub database: PathBuf,
    pub output_dir: PathBuf,
    /// Highlight fill as `0xRRGGBB`
    pub highlight_rgb: u32,
    pub rssi_policy: RssiPolicy,
    pub timezone: Timezone,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl FlashReportConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref color) = self.highlight_color {
            parse_rgb(color)?;
        }
        if let Some(ref db) = self.database {
            if db.as_os_str().is_empty() {
                anyhow::bail!("database path must not be empty");
            }
        }
        Ok(())
    }

    /// Resolve config into the form used by the report pipeline
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let highlight_rgb = match &self.highlight_color {
            Some(color) => parse_rgb(color)?,
            None => HIGHLIGHT_RGB,
        };

        Ok(ResolvedConfig {
            database: self
                .database
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
            output_dir: self
                .output_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(".")),
            highlight_rgb,
            rssi_policy: self.rssi_policy.unwrap_or_default(),
            timezone: self.timezone.unwrap_or_default(),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        FlashReportConfig::default().resolve()
    }

    /// Styles the grid assembler applies
    pub fn styles(&self) -> ReportStyles {
        ReportStyles {
            highlight: Style::Fill(self.highlight_rgb),
            ..ReportStyles::default()
        }
    }
}

/// Parse `RRGGBB` (optionally prefixed with `#`) into `0xRRGGBB`
fn parse_rgb(value: &str) -> Result<u32> {
    let hex = value.strip_prefix('#').unwrap_or(value);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        anyhow::bail!(
            "highlight_color must be six hex digits like \"FD5421\" (got {:?})",
            value
        );
    }
    u32::from_str_radix(hex, 16)
        .with_context(|| format!("invalid highlight_color: {:?}", value))
}

/// Discover a config file in `dir`
///
/// Search order:
/// 1. `.flashreportrc.json`
/// 2. `flashreport.config.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(dir: &Path) -> Result<Option<(FlashReportConfig, PathBuf)>> {
    for name in [".flashreportrc.json", "flashreport.config.json"] {
        let path = dir.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<FlashReportConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: FlashReportConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config in `dir`.
/// Returns default config if nothing is found.
pub fn load_and_resolve(dir: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(dir)? {
            Some((config, path)) => (config, Some(path)),
            None => (FlashReportConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config_is_valid() {
        let resolved = ResolvedConfig::defaults().expect("default config should resolve");
        assert_eq!(resolved.database, PathBuf::from("db.sqlite3"));
        assert_eq!(resolved.output_dir, PathBuf::from("."));
        assert_eq!(resolved.highlight_rgb, 0xFD5421);
        assert_eq!(resolved.rssi_policy, RssiPolicy::Abort);
        assert_eq!(resolved.timezone, Timezone::Local);
        assert!(resolved.config_path.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let json = r##"{
            "database": "/var/lib/flasher/db.sqlite3",
            "output_dir": "reports",
            "highlight_color": "#00ff00",
            "rssi_policy": "degrade",
            "timezone": "utc"
        }"##;
        let config: FlashReportConfig = serde_json::from_str(json).unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(
            resolved.database,
            PathBuf::from("/var/lib/flasher/db.sqlite3")
        );
        assert_eq!(resolved.output_dir, PathBuf::from("reports"));
        assert_eq!(resolved.highlight_rgb, 0x00FF00);
        assert_eq!(resolved.rssi_policy, RssiPolicy::Degrade);
        assert_eq!(resolved.timezone, Timezone::Utc);
        assert_eq!(resolved.styles().highlight, Style::Fill(0x00FF00));
    }

    #[test]
    fn test_reject_unknown_fields() {
        let result: Result<FlashReportConfig, _> = serde_json::from_str(r#"{"color": "red"}"#);
        assert!(result.is_err(), "unknown fields should be rejected");
    }

    #[test]
    fn test_reject_unknown_policy() {
        let result: Result<FlashReportConfig, _> =
            serde_json::from_str(r#"{"rssi_policy": "ignore"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_bad_highlight_color() {
        for bad in ["orange", "FD542", "FD54211", "GG0000"] {
            let config = FlashReportConfig {
                highlight_color: Some(bad.to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_reject_empty_database_path() {
        let config: FlashReportConfig = serde_json::from_str(r#"{"database": ""}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discover_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".flashreportrc.json"),
            r#"{"database": "rc.sqlite3"}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("flashreport.config.json"),
            r#"{"database": "config.sqlite3"}"#,
        )
        .unwrap();

        let (config, path) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.database, Some(PathBuf::from("rc.sqlite3")));
        assert_eq!(path, dir.path().join(".flashreportrc.json"));
    }

    #[test]
    fn test_no_config_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_and_resolve_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("custom.json");
        fs::write(&config_path, r#"{"timezone": "utc"}"#).unwrap();

        let resolved = load_and_resolve(dir.path(), Some(&config_path)).unwrap();
        assert_eq!(resolved.timezone, Timezone::Utc);
        assert_eq!(resolved.config_path, Some(config_path));
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".flashreportrc.json");
        fs::write(&config_path, r#"{"highlight_color": "nope"}"#).unwrap();

        let err = load_and_resolve(dir.path(), None).unwrap_err();
        assert!(format!("{:#}", err).contains(".flashreportrc.json"));
    }
}
