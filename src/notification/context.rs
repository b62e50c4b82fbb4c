//! 宿主提供的通知上下文
//!
//! 宿主（事件处理框架）在告警触发时构造 `NotificationContext`，
//! 所有外部数据都可选，缺失时由 ModelBuilder 兜底。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::validator::ValidatedConfig;

/// 事件定义（各字段独立可选）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventDefinition {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub definition_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// 调度任务触发器
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobTrigger {
    pub id: Option<String>,
    pub job_definition_id: Option<String>,
}

/// 触发告警的事件
///
/// 未识别的字段保存在 `extra`，序列化时原样输出。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    pub id: String,
    pub event_definition_type: String,
    pub event_definition_id: String,
    pub origin_context: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub timestamp_processing: Option<DateTime<Utc>>,
    pub timerange_start: Option<DateTime<Utc>>,
    pub timerange_end: Option<DateTime<Utc>>,
    pub streams: Vec<String>,
    pub source_streams: Vec<String>,
    pub message: String,
    pub source: String,
    pub key_tuple: Vec<String>,
    pub key: Option<String>,
    pub priority: i64,
    pub alert: bool,
    pub fields: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// backlog 中的一条消息摘要
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageSummary {
    pub index: String,
    pub id: String,
    pub message: String,
    pub source: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub stream_ids: Vec<String>,
    pub fields: Map<String, Value>,
}

/// 单次通知调用的上下文（只读）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationContext {
    /// 已校验的通知配置
    pub notification_config: ValidatedConfig,
    /// 事件定义
    #[serde(default)]
    pub event_definition: Option<EventDefinition>,
    /// 任务触发器
    #[serde(default)]
    pub job_trigger: Option<JobTrigger>,
    /// 触发事件
    #[serde(default)]
    pub event: Event,
    /// backlog（宿主保证有限且有序）
    #[serde(default)]
    pub backlog: Vec<MessageSummary>,
}

impl NotificationContext {
    pub fn new(notification_config: ValidatedConfig, event: Event) -> Self {
        Self {
            notification_config,
            event_definition: None,
            job_trigger: None,
            event,
            backlog: Vec::new(),
        }
    }

    pub fn with_event_definition(mut self, definition: EventDefinition) -> Self {
        self.event_definition = Some(definition);
        self
    }

    pub fn with_job_trigger(mut self, trigger: JobTrigger) -> Self {
        self.job_trigger = Some(trigger);
        self
    }

    pub fn with_backlog(mut self, backlog: Vec<MessageSummary>) -> Self {
        self.backlog = backlog;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_keeps_unknown_fields() {
        let event: Event = serde_json::from_value(serde_json::json!({
            "id": "01EVENT",
            "message": "CPU high on web-1",
            "priority": 2,
            "replay_info": { "query": "source:web-1" }
        }))
        .unwrap();

        assert_eq!(event.id, "01EVENT");
        assert_eq!(event.priority, 2);
        assert!(event.extra.contains_key("replay_info"));

        let back = serde_json::to_value(&event).unwrap();
        assert_eq!(back["replay_info"]["query"], "source:web-1");
    }

    #[test]
    fn test_event_definition_type_key() {
        let def: EventDefinition = serde_json::from_value(serde_json::json!({
            "id": "def-1",
            "type": "aggregation-v1"
        }))
        .unwrap();

        assert_eq!(def.definition_type.as_deref(), Some("aggregation-v1"));
        assert!(def.title.is_none());
    }
}
