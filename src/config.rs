use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, ensure};
use jsonschema::{Draft, JSONSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{gate::PolicyConfig, reasoning::ReasoningConfig};

const SCHEMA_FILE_NAME: &str = "healer.schema.json";

/// Process configuration, read once at startup from a JSON5 file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub policy: PolicyConfig,
    pub reasoning: ReasoningConfig,
    pub audit: AuditConfig,
    pub history: HistoryConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub filter: String,
    pub rotation: LoggingRotation,
    pub retention_days: usize,
    /// Mirrors warnings and errors to stderr next to the JSON log files.
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./logs"),
            filter: "info".to_string(),
            rotation: LoggingRotation::Daily,
            retention_days: 14,
            stderr_warn_enabled: true,
        }
    }
}

/// Without a path the trail lives in memory for the process lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub path: Option<PathBuf>,
}

/// Resolved incidents used as historical patterns. Without a path the
/// correlator works from reasoning alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub socket_path: PathBuf,
    pub max_concurrent_incidents: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("healer.sock"),
            max_concurrent_incidents: 8,
        }
    }
}

impl Config {
    /// Parses, schema-checks and validates the file, then anchors relative
    /// paths at the directory holding it.
    pub fn load(config_path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(config_path)
            .with_context(|| format!("cannot read config file {}", config_path.display()))?;
        let document: Value = json5::from_str(&raw)
            .with_context(|| format!("config file {} is not valid JSON5", config_path.display()))?;

        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        ConfigSchema::locate(base, &document)?.check(&document)?;

        let mut config: Config =
            serde_json::from_value(document).context("config does not match healer settings")?;
        config.validate()?;
        config.anchor_paths(base);
        Ok(config)
    }

    /// Cross-field rules the schema cannot express. Any violation must stop startup.
    pub fn validate(&self) -> Result<()> {
        self.policy
            .validate_policy()
            .context("invalid policy configuration")?;
        ensure!(
            self.reasoning.backoff_base_ms <= self.reasoning.backoff_max_ms,
            "reasoning.backoff_base_ms ({}) must not exceed reasoning.backoff_max_ms ({})",
            self.reasoning.backoff_base_ms,
            self.reasoning.backoff_max_ms
        );
        ensure!(
            self.server.max_concurrent_incidents > 0,
            "server.max_concurrent_incidents must be at least 1"
        );
        Ok(())
    }

    fn anchor_paths(&mut self, base: &Path) {
        let anchor = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                base.join(path)
            }
        };
        self.server.socket_path = anchor(&self.server.socket_path);
        self.audit.path = self.audit.path.as_deref().map(anchor);
        self.history.path = self.history.path.as_deref().map(anchor);
    }
}

/// JSON Schema named by the config's `$schema` key, or the one next to it.
struct ConfigSchema {
    path: PathBuf,
    compiled: JSONSchema,
}

impl ConfigSchema {
    fn locate(base: &Path, document: &Value) -> Result<Self> {
        let path = match document.get("$schema").and_then(Value::as_str) {
            Some(declared) if Path::new(declared).is_absolute() => PathBuf::from(declared),
            Some(declared) => base.join(declared),
            None => {
                let sibling = base.join(SCHEMA_FILE_NAME);
                ensure!(
                    sibling.exists(),
                    "no $schema in config and no {SCHEMA_FILE_NAME} in {}",
                    base.display()
                );
                sibling
            }
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("cannot read config schema {}", path.display()))?;
        let schema: Value = serde_json::from_str(&text)
            .with_context(|| format!("config schema {} is not valid JSON", path.display()))?;
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|err| anyhow!("config schema {} does not compile: {err}", path.display()))?;
        Ok(Self { path, compiled })
    }

    fn check(&self, document: &Value) -> Result<()> {
        let Err(errors) = self.compiled.validate(document) else {
            return Ok(());
        };
        let violations = errors
            .map(|error| {
                let at = error.instance_path.to_string();
                if at.is_empty() {
                    error.to_string()
                } else {
                    format!("{at}: {error}")
                }
            })
            .collect::<Vec<_>>();
        Err(anyhow!(
            "config rejected by {}: {}",
            self.path.display(),
            violations.join("; ")
        ))
    }
}
