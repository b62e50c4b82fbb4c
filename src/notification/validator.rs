//! 配置校验
//!
//! 保存配置时运行，是配置进入投递流程的唯一关口。[`ValidatedConfig`]
//! 只能由校验产生，下游（组装、投递）不再重复校验。

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::OnceLock;
use tracing::debug;
use url::Url;

use super::config::{
    parse_bool_str, NotificationConfig, BOOL_KEYS, CK_BACKLOG_ITEMS, CK_CHANNEL, CK_COLOR,
    CK_CUSTOM_MESSAGE, CK_GRAYLOG2_URL, CK_ICON_URL, CK_PROXY_ADDRESS, CK_WEBHOOK_URL, STRING_KEYS,
};
use super::error::ConfigValidationError;
use super::model::BacklogLimit;
use super::template::TemplateEngine;

/// 字段级错误集合（key 为存储字段名）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(field.into()).or_default().push(message.into());
    }

    pub fn failed(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    pub fn errors_for(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    fn merge(&mut self, other: ValidationResult) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
    }
}

/// 校验通过的配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NotificationConfig", into = "NotificationConfig")]
pub struct ValidatedConfig(NotificationConfig);

impl ValidatedConfig {
    pub fn into_inner(self) -> NotificationConfig {
        self.0
    }
}

impl Deref for ValidatedConfig {
    type Target = NotificationConfig;

    fn deref(&self) -> &NotificationConfig {
        &self.0
    }
}

impl TryFrom<NotificationConfig> for ValidatedConfig {
    type Error = ConfigValidationError;

    fn try_from(config: NotificationConfig) -> Result<Self, Self::Error> {
        ConfigValidator::new().check(config)
    }
}

impl From<ValidatedConfig> for NotificationConfig {
    fn from(config: ValidatedConfig) -> Self {
        config.0
    }
}

fn channel_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[#@].+").expect("channel regex is valid"))
}

fn proxy_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.\-]*)://(?P<host>\[[0-9A-Fa-f:.]+\]|[^\s:/?#@\[\]]+):(?P<port>[0-9]{1,5})/?$",
        )
        .expect("proxy regex is valid")
    })
}

/// 配置校验器
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigValidator {
    engine: TemplateEngine,
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定的模板引擎检查 custom_message 语法
    pub fn with_engine(engine: TemplateEngine) -> Self {
        Self { engine }
    }

    /// 校验配置，返回完整的错误集合
    pub fn validate(&self, config: &NotificationConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        if is_blank(config.color()) {
            result.add_error(CK_COLOR, "Color cannot be empty.");
        }

        if is_blank(config.webhook_url()) {
            result.add_error(CK_WEBHOOK_URL, "Webhook URL cannot be empty.");
        } else if !is_http_url(config.webhook_url()) {
            result.add_error(
                CK_WEBHOOK_URL,
                "Webhook URL must be a valid absolute http or https URL.",
            );
        }

        if is_blank(config.channel()) {
            result.add_error(CK_CHANNEL, "Channel cannot be empty.");
        } else if !channel_regex().is_match(config.channel()) {
            result.add_error(
                CK_CHANNEL,
                "Channel must start with # (channel) or @ (direct message).",
            );
        }

        for (key, value, label) in [
            (CK_ICON_URL, config.icon_url(), "Icon URL"),
            (CK_GRAYLOG2_URL, config.graylog2_url(), "Graylog URL"),
        ] {
            if !is_blank(value) && !is_http_url(value) {
                result.add_error(key, format!("{} must be a valid absolute http or https URL.", label));
            }
        }

        if !is_blank(config.proxy_address()) {
            if let Err(message) = check_proxy_address(config.proxy_address()) {
                result.add_error(CK_PROXY_ADDRESS, message);
            }
        }

        if BacklogLimit::parse(config.backlog_items()).is_none() {
            result.add_error(
                CK_BACKLOG_ITEMS,
                "Backlog items must be a non-negative number, true or false.",
            );
        }

        if !is_blank(config.custom_message()) {
            if let Err(e) = self.engine.parse(config.custom_message()) {
                result.add_error(CK_CUSTOM_MESSAGE, format!("Custom message is not a valid template: {}", e));
            }
        }

        debug!(failed = result.failed(), fields = result.errors().len(), "Validated notification config");
        result
    }

    /// 校验并包装为 [`ValidatedConfig`]
    pub fn check(&self, config: NotificationConfig) -> Result<ValidatedConfig, ConfigValidationError> {
        let result = self.validate(&config);
        if result.failed() {
            Err(ConfigValidationError::new(result))
        } else {
            Ok(ValidatedConfig(config))
        }
    }

    /// 校验扁平 key → value 映射（表单 / 存储原始数据）
    ///
    /// 类型不符（如 `channel: 42`）记为字段错误，不会 panic。未知 key 忽略。
    pub fn validate_map(&self, raw: &Map<String, Value>) -> Result<ValidatedConfig, ConfigValidationError> {
        let mut type_errors = ValidationResult::new();
        let mut cleaned = Map::new();

        for &key in STRING_KEYS {
            match raw.get(key) {
                None | Some(Value::Null) => {}
                Some(Value::String(s)) => {
                    cleaned.insert(key.to_string(), Value::String(s.clone()));
                }
                // 表单把 backlog 条数作为数字提交
                Some(Value::Number(n)) if key == CK_BACKLOG_ITEMS => {
                    cleaned.insert(key.to_string(), Value::String(n.to_string()));
                }
                Some(_) => type_errors.add_error(key, "Value must be a string."),
            }
        }

        for &key in BOOL_KEYS {
            match raw.get(key) {
                None | Some(Value::Null) => {}
                Some(Value::Bool(b)) => {
                    cleaned.insert(key.to_string(), Value::Bool(*b));
                }
                Some(Value::String(s)) => match parse_bool_str(s) {
                    Some(b) => {
                        cleaned.insert(key.to_string(), Value::Bool(b));
                    }
                    None => type_errors.add_error(key, "Value must be a boolean."),
                },
                Some(_) => type_errors.add_error(key, "Value must be a boolean."),
            }
        }

        let config: NotificationConfig = match serde_json::from_value(Value::Object(cleaned)) {
            Ok(config) => config,
            Err(e) => {
                type_errors.add_error("config", format!("Cannot read configuration: {}", e));
                NotificationConfig::default()
            }
        };

        // 类型不符的字段只报类型错误，不再叠加"不能为空"之类的规则错误
        let mut result = self.validate(&config);
        for field in type_errors.errors.keys() {
            result.errors.remove(field);
        }
        result.merge(type_errors);

        if result.failed() {
            Err(ConfigValidationError::new(result))
        } else {
            Ok(ValidatedConfig(config))
        }
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// 绝对 URL，scheme 为 http/https，且有 host
fn is_http_url(raw: &str) -> bool {
    match Url::parse(raw.trim()) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}

/// `scheme://host:port`，scheme 限 http/https，端口必须显式给出
fn check_proxy_address(raw: &str) -> Result<(), String> {
    let raw = raw.trim();
    let caps = proxy_regex()
        .captures(raw)
        .ok_or_else(|| "Proxy address must be in the form scheme://host:port.".to_string())?;

    let scheme = caps["scheme"].to_ascii_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err("Proxy address scheme must be http or https.".to_string());
    }

    match caps["port"].parse::<u16>() {
        Ok(port) if port > 0 => {}
        _ => return Err("Proxy address port must be between 1 and 65535.".to_string()),
    }

    Url::parse(raw)
        .map(|_| ())
        .map_err(|e| format!("Proxy address is not a valid URL: {}.", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> NotificationConfig {
        NotificationConfig::builder()
            .webhook_url("https://www.example.org/")
            .channel("#test_channel")
            .user_name("test_user_name")
            .notify_channel(true)
            .link_names(true)
            .icon_url("http://example.com")
            .icon_emoji("test_icon_emoji")
            .graylog2_url("http://graylog2.example.com")
            .color("#FF0000")
            .build()
    }

    fn errors_with(config: NotificationConfig) -> ValidationResult {
        ConfigValidator::new().validate(&config)
    }

    #[test]
    fn test_valid_config_passes() {
        let result = errors_with(valid());
        assert!(!result.failed(), "unexpected errors: {}", result);
    }

    #[test]
    fn test_blank_required_fields_all_reported() {
        let result = errors_with(NotificationConfig::default());
        assert!(result.errors_for(CK_WEBHOOK_URL).is_some());
        assert!(result.errors_for(CK_CHANNEL).is_some());
        assert!(result.errors_for(CK_COLOR).is_some());
        // 可选字段为空不报错
        assert!(result.errors_for(CK_ICON_URL).is_none());
        assert!(result.errors_for(CK_PROXY_ADDRESS).is_none());
    }

    #[test]
    fn test_webhook_url_rules() {
        for bad in ["   ", "example.org/hook", "/relative/path", "ftp://example.org/", "Definitely$$Not#A!!URL"] {
            let cfg = valid().to_builder().webhook_url(bad).build();
            assert!(errors_with(cfg).errors_for(CK_WEBHOOK_URL).is_some(), "{:?} should fail", bad);
        }
        let cfg = valid().to_builder().webhook_url("http://hooks.local:8080/x").build();
        assert!(errors_with(cfg).errors_for(CK_WEBHOOK_URL).is_none());
    }

    #[test]
    fn test_channel_notations() {
        for good in ["#valid_channel", "@john"] {
            let cfg = valid().to_builder().channel(good).build();
            assert!(!errors_with(cfg).failed(), "{:?} should pass", good);
        }
        for bad in ["general", "#", "@", " #general"] {
            let cfg = valid().to_builder().channel(bad).build();
            assert!(errors_with(cfg).errors_for(CK_CHANNEL).is_some(), "{:?} should fail", bad);
        }
    }

    #[test]
    fn test_optional_urls_rejected_when_invalid() {
        for bad in ["Definitely$$Not#A!!URL", "ftp://example.net"] {
            let cfg = valid().to_builder().icon_url(bad).build();
            assert!(errors_with(cfg).errors_for(CK_ICON_URL).is_some());

            let cfg = valid().to_builder().graylog2_url(bad).build();
            assert!(errors_with(cfg).errors_for(CK_GRAYLOG2_URL).is_some());
        }
    }

    #[test]
    fn test_proxy_address_rules() {
        let cfg = valid().to_builder().proxy_address("http://127.0.0.1:1080").build();
        assert!(!errors_with(cfg).failed());

        let cfg = valid().to_builder().proxy_address("https://proxy.corp:3128/").build();
        assert!(!errors_with(cfg).failed());

        for bad in [
            "Definitely$$Not#A!!URL",
            "127.0.0.1",
            "vpn://127.0.0.1",
            "socks5://127.0.0.1:1080",
            "http://127.0.0.1",
            "http://127.0.0.1:99999",
            "http://127.0.0.1:0",
        ] {
            let cfg = valid().to_builder().proxy_address(bad).build();
            assert!(errors_with(cfg).errors_for(CK_PROXY_ADDRESS).is_some(), "{:?} should fail", bad);
        }
    }

    #[test]
    fn test_backlog_items_rules() {
        for good in ["", "0", "5", "true", "false"] {
            let cfg = valid().to_builder().backlog_items(good).build();
            assert!(!errors_with(cfg).failed(), "{:?} should pass", good);
        }
        let cfg = valid().to_builder().backlog_items("many").build();
        assert!(errors_with(cfg).errors_for(CK_BACKLOG_ITEMS).is_some());
    }

    #[test]
    fn test_custom_message_syntax_checked() {
        let cfg = valid().to_builder().custom_message("${if event.alert}oops").build();
        let result = errors_with(cfg);
        let messages = result.errors_for(CK_CUSTOM_MESSAGE).unwrap();
        assert!(messages[0].contains("missing `${end}`"));
    }

    #[test]
    fn test_validate_map_type_errors() {
        let raw = json!({
            "webhook_url": "https://example.org/",
            "channel": 42,
            "color": "#FF0000",
            "notify_channel": "sometimes",
            "link_names": true,
            "type": "slack-notification-v3"
        });
        let err = ConfigValidator::new()
            .validate_map(raw.as_object().unwrap())
            .unwrap_err();

        assert!(err.has_error(CK_CHANNEL));
        assert!(err.has_error("notify_channel"));
        assert!(!err.has_error("link_names"));
    }

    #[test]
    fn test_validate_map_reports_only_the_type_error() {
        let raw = json!({
            "webhook_url": "https://example.org/",
            "channel": 42,
            "color": "#FF0000"
        });
        let err = ConfigValidator::new()
            .validate_map(raw.as_object().unwrap())
            .unwrap_err();

        assert_eq!(
            err.result().errors_for(CK_CHANNEL),
            Some(&["Value must be a string.".to_string()][..])
        );
        assert_eq!(err.result().errors().len(), 1);
    }

    #[test]
    fn test_deeply_nested_custom_message_is_a_field_error() {
        let cfg = valid().to_builder().custom_message("${if a}".repeat(10_000)).build();
        let result = errors_with(cfg);

        let messages = result.errors_for(CK_CUSTOM_MESSAGE).unwrap();
        assert!(messages[0].contains("nested too deeply"), "{:?}", messages);
    }

    #[test]
    fn test_validate_map_accepts_form_values() {
        let raw = json!({
            "webhook_url": "https://example.org/",
            "channel": "#test",
            "color": "#FF0000",
            "notify_channel": "true",
            "backlog_items": 5,
            "icon_url": null
        });
        let config = ConfigValidator::new()
            .validate_map(raw.as_object().unwrap())
            .unwrap();

        assert!(config.notify_channel());
        assert_eq!(config.backlog_items(), "5");
        assert_eq!(config.icon_url(), "");
    }

    #[test]
    fn test_deserialize_validated_config_runs_validation() {
        let ok: Result<ValidatedConfig, _> = serde_json::from_value(json!({
            "webhook_url": "https://example.org/",
            "channel": "#test",
            "color": "#FF0000"
        }));
        assert!(ok.is_ok());

        let bad: Result<ValidatedConfig, _> = serde_json::from_value(json!({
            "webhook_url": "not a url",
            "channel": "#test",
            "color": "#FF0000"
        }));
        let message = bad.unwrap_err().to_string();
        assert!(message.contains("webhook_url"), "{}", message);
    }
}
