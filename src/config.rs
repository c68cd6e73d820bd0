//! Configuration module for upwatch.
//!
//! Server settings come from environment variables with sensible defaults.
//! The monitored targets live in a separate `key=url` file that is re-read
//! on every scheduler tick.

use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::db::Target;

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the web server (default: 3030)
    pub http_port: u16,
    /// Path to the SQLite database file (default: "upwatch.db")
    pub db_path: String,
    /// Path to the `key=url` target list (default: "urls.cfg")
    pub targets_path: PathBuf,
    /// Directory of static assets served as a fallback (default: "public")
    pub public_dir: PathBuf,
    /// Seconds between check cycles (default: 60)
    pub probe_interval_secs: u64,
    /// Per-attempt HTTP timeout in seconds (default: 10)
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 3030,
            db_path: "upwatch.db".to_string(),
            targets_path: PathBuf::from("urls.cfg"),
            public_dir: PathBuf::from("public"),
            probe_interval_secs: 60,
            request_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `UPWATCH_HTTP_PORT`: HTTP port (default: 3030)
    /// - `UPWATCH_DB_PATH`: Database file path (default: "upwatch.db")
    /// - `UPWATCH_TARGETS_PATH`: Target list path (default: "urls.cfg")
    /// - `UPWATCH_PUBLIC_DIR`: Static asset directory (default: "public")
    /// - `UPWATCH_PROBE_INTERVAL_SECS`: Cycle cadence (default: 60)
    /// - `UPWATCH_REQUEST_TIMEOUT_SECS`: Per-attempt timeout (default: 10)
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Some(port) = parse_var("UPWATCH_HTTP_PORT") {
            cfg.http_port = port;
        }
        if let Ok(db_path) = env::var("UPWATCH_DB_PATH") {
            cfg.db_path = db_path;
        }
        if let Ok(path) = env::var("UPWATCH_TARGETS_PATH") {
            cfg.targets_path = PathBuf::from(path);
        }
        if let Ok(dir) = env::var("UPWATCH_PUBLIC_DIR") {
            cfg.public_dir = PathBuf::from(dir);
        }
        if let Some(secs) = parse_var::<u64>("UPWATCH_PROBE_INTERVAL_SECS").filter(|s| *s > 0) {
            cfg.probe_interval_secs = secs;
        }
        if let Some(secs) = parse_var::<u64>("UPWATCH_REQUEST_TIMEOUT_SECS").filter(|s| *s > 0) {
            cfg.request_timeout_secs = secs;
        }

        cfg
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Parse a newline-delimited `key=url` target list.
///
/// Lines are split at the first `=`. Blank lines, lines without `=`, and
/// lines with an empty key or url are skipped. The first occurrence of a
/// key wins.
pub fn parse_targets(text: &str) -> Vec<Target> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        let Some((key, url)) = line.split_once('=') else {
            continue;
        };

        let (key, url) = (key.trim(), url.trim());
        if key.is_empty() || url.is_empty() {
            continue;
        }

        if !seen.insert(key.to_string()) {
            tracing::warn!("Config: Duplicate target key {}, keeping the first entry", key);
            continue;
        }

        targets.push(Target::new(key, url));
    }

    targets
}

/// Read the raw target list.
pub fn read_raw(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and parse the target list at `path`.
pub fn load_targets(path: &Path) -> Result<Vec<Target>, ConfigError> {
    read_raw(path).map(|text| parse_targets(&text))
}
