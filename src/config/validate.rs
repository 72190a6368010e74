// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, TaskConfig};
use crate::errors::{Result, TaskstreamError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::TaskstreamError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_task(&raw.task)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task))
    }
}

fn validate_task(task: &TaskConfig) -> Result<()> {
    validate_cmd(task)?;
    validate_args(task)?;
    validate_env(task)?;
    Ok(())
}

fn validate_cmd(task: &TaskConfig) -> Result<()> {
    if task.cmd.trim().is_empty() {
        return Err(TaskstreamError::ConfigError(
            "[task].cmd must not be empty".to_string(),
        ));
    }
    if task.cmd.contains('\0') {
        return Err(TaskstreamError::ConfigError(
            "[task].cmd must not contain NUL bytes".to_string(),
        ));
    }
    Ok(())
}

fn validate_args(task: &TaskConfig) -> Result<()> {
    if let Some(idx) = task.args.iter().position(|a| a.contains('\0')) {
        return Err(TaskstreamError::ConfigError(format!(
            "[task].args[{}] must not contain NUL bytes",
            idx
        )));
    }
    Ok(())
}

fn validate_env(task: &TaskConfig) -> Result<()> {
    for (key, value) in task.env.iter() {
        if key.is_empty() {
            return Err(TaskstreamError::ConfigError(
                "[task.env] contains an empty variable name".to_string(),
            ));
        }
        if key.contains('=') || key.contains('\0') {
            return Err(TaskstreamError::ConfigError(format!(
                "[task.env] variable name '{}' must not contain '=' or NUL",
                key.escape_debug()
            )));
        }
        if value.contains('\0') {
            return Err(TaskstreamError::ConfigError(format!(
                "[task.env] value of '{}' must not contain NUL bytes",
                key
            )));
        }
    }
    Ok(())
}
