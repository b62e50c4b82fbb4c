//! Slack 通知配置
//!
//! 字段 key 是存储契约的一部分，不能重命名：
//! `color, custom_message, webhook_url, channel, user_name, backlog_items,
//! notify_channel, link_names, icon_url, icon_emoji, graylog2_url, proxy_address`

use serde::{Deserialize, Deserializer, Serialize};

/// 通知类型名称
pub const TYPE_NAME: &str = "slack-notification-v3";

pub const CK_COLOR: &str = "color";
pub const CK_CUSTOM_MESSAGE: &str = "custom_message";
pub const CK_WEBHOOK_URL: &str = "webhook_url";
pub const CK_CHANNEL: &str = "channel";
pub const CK_USER_NAME: &str = "user_name";
pub const CK_BACKLOG_ITEMS: &str = "backlog_items";
pub const CK_NOTIFY_CHANNEL: &str = "notify_channel";
pub const CK_LINK_NAMES: &str = "link_names";
pub const CK_ICON_URL: &str = "icon_url";
pub const CK_ICON_EMOJI: &str = "icon_emoji";
pub const CK_GRAYLOG2_URL: &str = "graylog2_url";
pub const CK_PROXY_ADDRESS: &str = "proxy_address";

/// 字符串类型的配置 key
pub const STRING_KEYS: &[&str] = &[
    CK_COLOR,
    CK_CUSTOM_MESSAGE,
    CK_WEBHOOK_URL,
    CK_CHANNEL,
    CK_USER_NAME,
    CK_BACKLOG_ITEMS,
    CK_ICON_URL,
    CK_ICON_EMOJI,
    CK_GRAYLOG2_URL,
    CK_PROXY_ADDRESS,
];

/// 布尔类型的配置 key
pub const BOOL_KEYS: &[&str] = &[CK_NOTIFY_CHANNEL, CK_LINK_NAMES];

/// 默认强调色
pub const DEFAULT_COLOR: &str = "#FF0000";

/// 默认 backlog 条数
pub const DEFAULT_BACKLOG_ITEMS: &str = "5";

/// 未配置 custom_message 时使用的模板
pub const DEFAULT_CUSTOM_MESSAGE: &str = r#"# --- [Event Definition] ---------------------------
**ID:**                   ${event_definition_id}
**Type:**                 ${event_definition_type}
**Title:**                ${event_definition_title}
**Description:**          ${event_definition_description}
# --- [Event] --------------------------------------
**Event:**                ${event}
# --- [Event Detail] -------------------------------
**Timestamp:**            ${event.timestamp}
**Message:**              ${event.message}
**Source:**               ${event.source}
**Key:**                  ${event.key}
**Priority:**             ${event.priority}
**Alert:**                ${event.alert}
**Timestamp Processing:** ${event.timestamp_processing}
**TimeRange Start:**      ${event.timerange_start}
**TimeRange End:**        ${event.timerange_end}
${if event.fields}
**Fields:**
${foreach event.fields field}  ${field.key}: ${field.value}
${end}
${end}
${if backlog}
# --- [Backlog] ------------------------------------
**Messages:**
${foreach backlog message}
```
${message.message}
```
${end}
${end}"#;

/// Slack 通知配置（不可变值）
///
/// 通过 [`ConfigBuilder`] 构建，或从存储的 JSON 反序列化。
/// 是否合法由 [`crate::notification::ConfigValidator`] 决定。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    color: String,
    custom_message: String,
    webhook_url: String,
    channel: String,
    user_name: String,
    backlog_items: String,
    #[serde(deserialize_with = "lenient_bool")]
    notify_channel: bool,
    #[serde(deserialize_with = "lenient_bool")]
    link_names: bool,
    icon_url: String,
    icon_emoji: String,
    graylog2_url: String,
    proxy_address: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            color: String::new(),
            custom_message: String::new(),
            webhook_url: String::new(),
            channel: String::new(),
            user_name: String::new(),
            backlog_items: String::new(),
            notify_channel: false,
            link_names: false,
            icon_url: String::new(),
            icon_emoji: String::new(),
            graylog2_url: String::new(),
            proxy_address: String::new(),
        }
    }
}

impl NotificationConfig {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// 以当前值为起点构建新配置
    pub fn to_builder(&self) -> ConfigBuilder {
        ConfigBuilder {
            config: self.clone(),
        }
    }

    /// 配置表单的初始值（含默认模板）
    pub fn form_defaults() -> Self {
        ConfigBuilder::new()
            .color(DEFAULT_COLOR)
            .custom_message(DEFAULT_CUSTOM_MESSAGE)
            .backlog_items(DEFAULT_BACKLOG_ITEMS)
            .build()
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn custom_message(&self) -> &str {
        &self.custom_message
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn backlog_items(&self) -> &str {
        &self.backlog_items
    }

    pub fn notify_channel(&self) -> bool {
        self.notify_channel
    }

    pub fn link_names(&self) -> bool {
        self.link_names
    }

    pub fn icon_url(&self) -> &str {
        &self.icon_url
    }

    pub fn icon_emoji(&self) -> &str {
        &self.icon_emoji
    }

    pub fn graylog2_url(&self) -> &str {
        &self.graylog2_url
    }

    pub fn proxy_address(&self) -> &str {
        &self.proxy_address
    }

    /// 转为扁平 key → value 映射（存储格式）
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            // 结构体只含 String/bool 字段，序列化总是得到对象
            _ => serde_json::Map::new(),
        }
    }
}

/// 配置构建器
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: NotificationConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.config.color = color.into();
        self
    }

    pub fn custom_message(mut self, custom_message: impl Into<String>) -> Self {
        self.config.custom_message = custom_message.into();
        self
    }

    pub fn webhook_url(mut self, webhook_url: impl Into<String>) -> Self {
        self.config.webhook_url = webhook_url.into();
        self
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.config.channel = channel.into();
        self
    }

    pub fn user_name(mut self, user_name: impl Into<String>) -> Self {
        self.config.user_name = user_name.into();
        self
    }

    pub fn backlog_items(mut self, backlog_items: impl Into<String>) -> Self {
        self.config.backlog_items = backlog_items.into();
        self
    }

    pub fn notify_channel(mut self, notify_channel: bool) -> Self {
        self.config.notify_channel = notify_channel;
        self
    }

    pub fn link_names(mut self, link_names: bool) -> Self {
        self.config.link_names = link_names;
        self
    }

    pub fn icon_url(mut self, icon_url: impl Into<String>) -> Self {
        self.config.icon_url = icon_url.into();
        self
    }

    pub fn icon_emoji(mut self, icon_emoji: impl Into<String>) -> Self {
        self.config.icon_emoji = icon_emoji.into();
        self
    }

    pub fn graylog2_url(mut self, graylog2_url: impl Into<String>) -> Self {
        self.config.graylog2_url = graylog2_url.into();
        self
    }

    pub fn proxy_address(mut self, proxy_address: impl Into<String>) -> Self {
        self.config.proxy_address = proxy_address.into();
        self
    }

    pub fn build(self) -> NotificationConfig {
        self.config
    }
}

/// 旧配置把布尔值存成字符串，这里同时接受 `true` 和 `"true"`，空串视为 false
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Str(s) => parse_bool_str(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("expected a boolean, got {:?}", s))),
    }
}

/// 解析字符串形式的布尔值
pub(crate) fn parse_bool_str(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" | "" => Some(false),
        _ => None,
    }
}
