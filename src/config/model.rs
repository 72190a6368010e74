// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// fail_on_nonzero = true
///
/// [task]
/// cmd = "/usr/bin/env"
/// args = ["printf", "hello"]
/// stdin = ["first line\n"]
///
/// [task.env]
/// GREETING = "hi"
/// ```
///
/// Only `[task].cmd` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    pub task: TaskConfig,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: TaskConfig,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, task: TaskConfig) -> Self {
        Self { config, task }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Report a non-zero exit status as a failure (default `true`).
    #[serde(default = "default_fail_on_nonzero")]
    pub fail_on_nonzero: bool,
}

fn default_fail_on_nonzero() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            fail_on_nonzero: default_fail_on_nonzero(),
        }
    }
}

/// `[task]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Executable to launch. Looked up on `PATH` when it has no separator.
    pub cmd: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Variables set on top of the inherited environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Working directory for the child.
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Strings written to stdin in order; stdin is closed afterwards.
    #[serde(default)]
    pub stdin: Option<Vec<String>>,
}
