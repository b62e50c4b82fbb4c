//! 渲染模型构建
//!
//! 把事件上下文展开为字符串 key 的映射，供模板替换使用。模型 key
//! 会被用户模板引用，必须保持稳定：
//!
//! | key | 来源 |
//! |---|---|
//! | `event_definition_id` | event_definition.id |
//! | `event_definition_type` | event_definition.type |
//! | `event_definition_title` | event_definition.title |
//! | `event_definition_description` | event_definition.description |
//! | `job_definition_id` | job_trigger.job_definition_id |
//! | `job_trigger_id` | job_trigger.id |
//! | `event` | 原始事件（嵌套对象） |
//! | `backlog` | backlog 消息摘要数组 |
//!
//! 嵌套字段用点号访问：`event.message`、`backlog.0.source`。

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use super::config::parse_bool_str;
use super::context::NotificationContext;

/// 上游字段缺失时的占位值
pub const UNKNOWN: &str = "<unknown>";

pub const KEY_EVENT_DEFINITION_ID: &str = "event_definition_id";
pub const KEY_EVENT_DEFINITION_TYPE: &str = "event_definition_type";
pub const KEY_EVENT_DEFINITION_TITLE: &str = "event_definition_title";
pub const KEY_EVENT_DEFINITION_DESCRIPTION: &str = "event_definition_description";
pub const KEY_JOB_DEFINITION_ID: &str = "job_definition_id";
pub const KEY_JOB_TRIGGER_ID: &str = "job_trigger_id";
pub const KEY_EVENT: &str = "event";
pub const KEY_BACKLOG: &str = "backlog";

/// backlog 条数限制（来自 `backlog_items`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BacklogLimit {
    /// 保留宿主提供的全部条目
    #[default]
    All,
    /// 最多保留 N 条
    Limit(usize),
}

impl BacklogLimit {
    /// 解析 `backlog_items`：空 / `true` → All，`false` → 0，数字 → N
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Some(Self::All);
        }
        if let Ok(n) = raw.parse::<usize>() {
            return Some(Self::Limit(n));
        }
        match parse_bool_str(raw)? {
            true => Some(Self::All),
            false => Some(Self::Limit(0)),
        }
    }

    fn apply(self, len: usize) -> usize {
        match self {
            Self::All => len,
            Self::Limit(n) => n.min(len),
        }
    }
}

/// 渲染模型（构建后不可变）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderModel {
    root: Map<String, Value>,
}

impl RenderModel {
    /// 顶层 key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// 顶层 key 的字符串值，非字符串按紧凑 JSON 输出
    pub fn get_str(&self, key: &str) -> String {
        match self.root.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// 按点号路径查找：`event.fields.host`、`backlog.0.message`
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        descend(self.root.get(first)?, segments)
    }

    /// 展开为点号 key → 字符串值
    pub fn flatten(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (key, value) in &self.root {
            flatten_into(key.clone(), value, &mut out);
        }
        out
    }

    /// 顶层 key 列表
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.root.keys().map(|k| k.as_str())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }
}

impl From<Map<String, Value>> for RenderModel {
    fn from(root: Map<String, Value>) -> Self {
        Self { root }
    }
}

/// 沿路径段逐级下钻（对象 key 或数组下标）
pub(crate) fn descend<'a, 'p>(
    mut value: &'a Value,
    segments: impl Iterator<Item = &'p str>,
) -> Option<&'a Value> {
    for segment in segments {
        value = match value {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

fn flatten_into(prefix: String, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(format!("{}.{}", prefix, key), child, out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                flatten_into(format!("{}.{}", prefix, i), child, out);
            }
        }
        Value::String(s) => {
            out.insert(prefix, s.clone());
        }
        Value::Null => {
            out.insert(prefix, String::new());
        }
        other => {
            out.insert(prefix, other.to_string());
        }
    }
}

/// 渲染模型构建器
///
/// 无副作用、不会失败；缺失字段替换为 [`UNKNOWN`]。
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelBuilder {
    backlog_limit: BacklogLimit,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置 backlog 条数限制
    pub fn backlog_limit(mut self, limit: BacklogLimit) -> Self {
        self.backlog_limit = limit;
        self
    }

    pub fn build(&self, ctx: &NotificationContext) -> RenderModel {
        let definition = ctx.event_definition.as_ref();
        let trigger = ctx.job_trigger.as_ref();

        let or_unknown = |v: Option<&String>| Value::String(v.cloned().unwrap_or_else(|| UNKNOWN.to_string()));

        let mut root = Map::new();
        root.insert(
            KEY_EVENT_DEFINITION_ID.to_string(),
            or_unknown(definition.and_then(|d| d.id.as_ref())),
        );
        root.insert(
            KEY_EVENT_DEFINITION_TYPE.to_string(),
            or_unknown(definition.and_then(|d| d.definition_type.as_ref())),
        );
        root.insert(
            KEY_EVENT_DEFINITION_TITLE.to_string(),
            or_unknown(definition.and_then(|d| d.title.as_ref())),
        );
        root.insert(
            KEY_EVENT_DEFINITION_DESCRIPTION.to_string(),
            or_unknown(definition.and_then(|d| d.description.as_ref())),
        );
        root.insert(
            KEY_JOB_DEFINITION_ID.to_string(),
            or_unknown(trigger.and_then(|t| t.job_definition_id.as_ref())),
        );
        root.insert(
            KEY_JOB_TRIGGER_ID.to_string(),
            or_unknown(trigger.and_then(|t| t.id.as_ref())),
        );

        // Event / MessageSummary 只含可序列化字段，失败时退化为 null
        let event = serde_json::to_value(&ctx.event).unwrap_or(Value::Null);
        root.insert(KEY_EVENT.to_string(), event);

        let keep = self.backlog_limit.apply(ctx.backlog.len());
        let backlog: Vec<Value> = ctx.backlog[..keep]
            .iter()
            .map(|m| serde_json::to_value(m).unwrap_or(Value::Null))
            .collect();
        root.insert(KEY_BACKLOG.to_string(), Value::Array(backlog));

        debug!(
            backlog_total = ctx.backlog.len(),
            backlog_kept = keep,
            has_event_definition = definition.is_some(),
            has_job_trigger = trigger.is_some(),
            "Built render model"
        );

        RenderModel { root }
    }
}
