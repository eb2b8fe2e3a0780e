//! Launch configuration.
//!
//! `LaunchConfig` is built exactly once at startup from a snapshot of the
//! process environment plus an optional JSON settings file, and is passed by
//! reference from then on. Nothing in the crate reads ambient environment
//! variables after construction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{LaunchError, Result};

/// Environment variable selecting development mode when equal to `"true"`.
pub const DEBUG_VAR: &str = "DEBUG";
/// Environment variable selecting development mode when equal to `"development"`.
pub const NODE_ENV_VAR: &str = "NODE_ENV";
/// Search path used by the process-manager probe.
pub const PATH_VAR: &str = "PATH";

/// Program and arguments replacing one of the default pre-flight commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepOverride {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Optional per-step command overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StepOverrides {
    pub wait_for_db: Option<StepOverride>,
    pub test_imports: Option<StepOverride>,
    pub test_ftp: Option<StepOverride>,
    pub init_db: Option<StepOverride>,
}

/// Server and step settings that can be loaded from a JSON file.
///
/// Every field has a default, so an empty object `{}` is a valid file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Bind address for the server.
    pub host: String,
    /// Bind port for the server.
    pub port: u16,
    /// ASGI application import path.
    pub app: String,
    /// Worker count when the process manager is available.
    pub workers: u32,
    /// Worker class handed to the process manager.
    pub worker_class: String,
    /// Process manager executable probed on `PATH`.
    pub process_manager: String,
    /// Application server executable.
    pub server: String,
    /// Interpreter used by the default Python steps.
    pub python: String,
    pub steps: StepOverrides,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            app: "app.main:app".to_string(),
            workers: 4,
            worker_class: "uvicorn.workers.UvicornWorker".to_string(),
            process_manager: "gunicorn".to_string(),
            server: "uvicorn".to_string(),
            python: "python".to_string(),
            steps: StepOverrides::default(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            LaunchError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parse settings from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that can only produce a broken server command.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(LaunchError::config("port must be non-zero"));
        }
        if self.workers == 0 {
            return Err(LaunchError::config("workers must be at least 1"));
        }
        let required = [
            ("host", &self.host),
            ("app", &self.app),
            ("worker_class", &self.worker_class),
            ("process_manager", &self.process_manager),
            ("server", &self.server),
            ("python", &self.python),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(LaunchError::config(format!("{} must not be empty", name)));
            }
        }
        let overrides = [
            ("wait_for_db", &self.steps.wait_for_db),
            ("test_imports", &self.steps.test_imports),
            ("test_ftp", &self.steps.test_ftp),
            ("init_db", &self.steps.init_db),
        ];
        for (name, step) in overrides {
            if let Some(step) = step
                && step.program.trim().is_empty()
            {
                return Err(LaunchError::config(format!(
                    "steps.{}.program must not be empty",
                    name
                )));
            }
        }
        Ok(())
    }

    /// `host:port` as passed to `--bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Immutable launch configuration, constructed once at entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Raw value of `DEBUG`, if set.
    pub debug: Option<String>,
    /// Raw value of `NODE_ENV`, if set.
    pub node_env: Option<String>,
    /// Raw value of `PATH`, if set.
    pub path: Option<String>,
    pub settings: Settings,
}

impl LaunchConfig {
    /// Build from an environment snapshot and already-loaded settings.
    pub fn from_env_map(env: &HashMap<String, String>, settings: Settings) -> Self {
        Self {
            debug: env.get(DEBUG_VAR).cloned(),
            node_env: env.get(NODE_ENV_VAR).cloned(),
            path: env.get(PATH_VAR).cloned(),
            settings,
        }
    }

    /// Snapshot the current process environment and load the optional
    /// settings file.
    pub fn from_process_env(settings_path: Option<&Path>) -> Result<Self> {
        let settings = match settings_path {
            Some(path) => Settings::load_from_file(path)?,
            None => Settings::default(),
        };
        Ok(Self::from_env_map(&env_snapshot(), settings))
    }
}

/// Current environment, skipping entries that are not valid UTF-8.
pub fn env_snapshot() -> HashMap<String, String> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}
