//! 配置 / 上下文文件加载
//!
//! 配置文件路径优先级：
//! 1. `--config <file>`
//! 2. 环境变量 `SLACK_NOTIFY_CONFIG`
//! 3. `<config_dir>/slack-notify/config.json`（Linux 为 `~/.config/slack-notify/config.json`）

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::notification::{
    ConfigValidator, Event, EventDefinition, JobTrigger, MessageSummary, NotificationContext,
    ValidatedConfig,
};

/// 配置文件路径环境变量
pub const ENV_CONFIG_PATH: &str = "SLACK_NOTIFY_CONFIG";

/// 解析配置文件路径
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    resolve_config_path_with(explicit, std::env::var(ENV_CONFIG_PATH).ok(), dirs::config_dir())
}

fn resolve_config_path_with(
    explicit: Option<&Path>,
    from_env: Option<String>,
    config_dir: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = from_env.filter(|p| !p.trim().is_empty()) {
        return Ok(PathBuf::from(path));
    }
    config_dir
        .map(|dir| dir.join("slack-notify").join("config.json"))
        .ok_or_else(|| anyhow!("Cannot find config directory; pass --config or set {}", ENV_CONFIG_PATH))
}

/// 读取扁平配置映射
pub fn load_raw_config(path: &Path) -> Result<Map<String, Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Config file {} is not valid JSON", path.display()))?;

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow!("Config file {} must contain a JSON object", path.display())),
    }
}

/// 读取并校验配置
pub fn load_config(path: &Path) -> Result<ValidatedConfig> {
    let raw = load_raw_config(path)?;
    debug!(path = %path.display(), keys = raw.len(), "Loaded notification config");
    ConfigValidator::new()
        .validate_map(&raw)
        .with_context(|| format!("Config file {} failed validation", path.display()))
}

/// 上下文文件：宿主提供的事件数据（不含通知配置）
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContextFile {
    event_definition: Option<EventDefinition>,
    job_trigger: Option<JobTrigger>,
    event: Event,
    backlog: Vec<MessageSummary>,
}

/// 读取上下文文件并与配置组合
pub fn load_context(config: ValidatedConfig, path: &Path) -> Result<NotificationContext> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read context file {}", path.display()))?;
    let file: ContextFile = serde_json::from_str(&content)
        .with_context(|| format!("Context file {} is not a valid event context", path.display()))?;

    Ok(NotificationContext {
        notification_config: config,
        event_definition: file.event_definition,
        job_trigger: file.job_trigger,
        event: file.event,
        backlog: file.backlog,
    })
}
