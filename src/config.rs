//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/convo.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:7341"
//!
//! [dashboard]
//! default_limit = 50
//! max_limit = 500
//! message_limit = 1000
//! ```
//!
//! The `[dashboard]` table is optional; every key in it has a default.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    /// Conversations returned by a search when no limit is requested.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Upper bound applied to any requested limit.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// Most messages returned for a single conversation (newest kept).
    #[serde(default = "default_message_limit")]
    pub message_limit: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            message_limit: default_message_limit(),
        }
    }
}

fn default_limit() -> usize {
    50
}
fn default_max_limit() -> usize {
    500
}
fn default_message_limit() -> usize {
    1000
}

impl DashboardConfig {
    /// Apply the default and the cap to a requested search limit.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.dashboard.default_limit == 0 {
        anyhow::bail!("dashboard.default_limit must be >= 1");
    }

    if config.dashboard.max_limit < config.dashboard.default_limit {
        anyhow::bail!("dashboard.max_limit must be >= dashboard.default_limit");
    }

    if config.dashboard.message_limit == 0 {
        anyhow::bail!("dashboard.message_limit must be >= 1");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("convo.toml");
        std::fs::write(&path, body).unwrap();
        (tmp, path)
    }

    const BASE: &str = r#"
[db]
path = "./data/convo.sqlite"

[server]
bind = "127.0.0.1:7341"
"#;

    #[test]
    fn test_dashboard_defaults() {
        let (_tmp, path) = write_config(BASE);
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.dashboard.default_limit, 50);
        assert_eq!(cfg.dashboard.max_limit, 500);
        assert_eq!(cfg.dashboard.message_limit, 1000);
    }

    #[test]
    fn test_effective_limit_is_clamped() {
        let d = DashboardConfig::default();
        assert_eq!(d.effective_limit(None), 50);
        assert_eq!(d.effective_limit(Some(0)), 1);
        assert_eq!(d.effective_limit(Some(10_000)), 500);
    }

    #[test]
    fn test_rejects_inverted_limits() {
        let body = format!("{}\n[dashboard]\ndefault_limit = 100\nmax_limit = 10\n", BASE);
        let (_tmp, path) = write_config(&body);
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("max_limit"));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_config(Path::new("/nonexistent/convo.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/convo.toml"));
    }
}
