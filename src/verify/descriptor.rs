//! Service descriptor loading and validation.
//! Source: TOML file (`--config`) or the embedded default stack.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::utils::{Result, StackcheckError};

/// Static specification of one expected service. Loaded once at start,
/// immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Unique identifier; must match the container name.
    pub name: String,
    /// Published port on localhost. Kept as u32 so out-of-range values
    /// survive deserialization and reach validation.
    pub port: u32,
    /// Liveness probe path. Empty = container-running check only.
    #[serde(default)]
    pub health_path: String,
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default)]
    pub require_nonroot: bool,
}

fn default_expected_status() -> u16 {
    200
}
fn default_timeout_seconds() -> u64 {
    5
}
fn default_retries() -> u32 {
    3
}

impl ServiceDescriptor {
    pub fn has_endpoint(&self) -> bool {
        !self.health_path.is_empty()
    }

    pub fn health_url(&self) -> String {
        format!("http://localhost:{}{}", self.port, self.health_path)
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default, rename = "service")]
    services: Vec<ServiceDescriptor>,
}

// ── loading ─────────────────────────────────────────────────────────────────

pub fn load(config: Option<&Path>) -> Result<Vec<ServiceDescriptor>> {
    let services = match config {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            let file: ConfigFile = toml::from_str(&content).map_err(|e| {
                StackcheckError::Config(vec![format!("{}: {}", path.display(), e)])
            })?;
            file.services
        }
        None => default_services(),
    };

    validate(&services)?;
    Ok(services)
}

/// Embedded default: the local Phoenix Hydra stack.
fn default_services() -> Vec<ServiceDescriptor> {
    let svc = |name: &str, port: u32, health_path: &str, require_nonroot: bool| ServiceDescriptor {
        name: name.to_string(),
        port,
        health_path: health_path.to_string(),
        expected_status: default_expected_status(),
        timeout_seconds: default_timeout_seconds(),
        retries: default_retries(),
        require_nonroot,
    };

    vec![
        svc("phoenix-core", 8080, "/health", true),
        svc("nca-toolkit", 8081, "/health", true),
        svc("n8n", 5678, "/healthz", true),
        svc("windmill", 8000, "/health", true),
        // database has no HTTP surface; container + user check only
        svc("revenue-db", 5432, "", true),
    ]
}

// ── validation ──────────────────────────────────────────────────────────────

/// Collects every violation before failing; a bad list never loads partially.
fn validate(services: &[ServiceDescriptor]) -> Result<()> {
    let mut violations = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for (i, s) in services.iter().enumerate() {
        let label = if s.name.is_empty() {
            format!("service #{}", i + 1)
        } else {
            format!("service '{}'", s.name)
        };

        if s.name.is_empty() {
            violations.push(format!("{}: name must not be empty", label));
        } else if !seen.insert(&s.name) {
            violations.push(format!("{}: duplicate name", label));
        }
        if s.port == 0 || s.port > 65535 {
            violations.push(format!("{}: port {} out of range 1-65535", label, s.port));
        }
        if s.timeout_seconds == 0 {
            violations.push(format!("{}: timeout_seconds must be > 0", label));
        }
        if s.retries == 0 {
            violations.push(format!("{}: retries must be >= 1", label));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(StackcheckError::Config(violations))
    }
}

// ── tests ───────────────────────────────────────────────────────────────────
