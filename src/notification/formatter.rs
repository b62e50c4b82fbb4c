//! 消息文本格式化
//!
//! 每次通知生成两段文本：
//! - 标准文本：固定格式，直接拼接，不经过模板引擎
//! - 自定义文本：`custom_message` 模板（为空时用默认模板）的渲染结果

use super::config::{NotificationConfig, DEFAULT_CUSTOM_MESSAGE};
use super::error::TemplateError;
use super::model::{RenderModel, KEY_EVENT_DEFINITION_DESCRIPTION, KEY_EVENT_DEFINITION_TITLE};
use super::template::TemplateEngine;

/// 开启 notify_channel 时的提及前缀
pub const CHANNEL_MENTION: &str = "@channel";

/// 生成标准文本：`{mention}*Alert for Graylog stream {title}*:\n> {description} \n`
///
/// 配置了 `graylog2_url` 时标题为 `<url|title`。链接标记没有闭合的 `>`，
/// 现有接收方依赖这一字面格式，修改它属于行为变更。未配置时标题为 `_title_`。
pub fn standard_text(config: &NotificationConfig, model: &RenderModel) -> String {
    let title = model.get_str(KEY_EVENT_DEFINITION_TITLE);
    let graylog_url = config.graylog2_url().trim();

    let title = if graylog_url.is_empty() {
        format!("_{}_", title)
    } else {
        format!("<{}|{}", graylog_url, title)
    };

    let audience = if config.notify_channel() { CHANNEL_MENTION } else { "" };
    let description = model.get_str(KEY_EVENT_DEFINITION_DESCRIPTION);

    format!(
        "{}*Alert for Graylog stream {}*:\n> {} \n",
        audience, title, description
    )
}

/// 渲染自定义文本
pub fn custom_text(
    engine: &TemplateEngine,
    config: &NotificationConfig,
    model: &RenderModel,
) -> Result<String, TemplateError> {
    let template = if config.custom_message().trim().is_empty() {
        DEFAULT_CUSTOM_MESSAGE
    } else {
        config.custom_message()
    };
    engine.transform(template, model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::model::UNKNOWN;
    use serde_json::json;

    fn model(title: &str, description: &str) -> RenderModel {
        match json!({
            "event_definition_title": title,
            "event_definition_description": description,
            "event": { "message": "load 12" },
            "backlog": []
        }) {
            serde_json::Value::Object(map) => RenderModel::from(map),
            _ => unreachable!(),
        }
    }

    fn config() -> NotificationConfig {
        NotificationConfig::builder()
            .webhook_url("https://example.org/")
            .channel("#test")
            .color("#FF0000")
            .build()
    }

    #[test]
    fn test_standard_text_with_mention_and_italic_title() {
        let cfg = config().to_builder().notify_channel(true).build();
        let text = standard_text(&cfg, &model("CPU High", "CPU > 90%"));
        assert_eq!(text, "@channel*Alert for Graylog stream _CPU High_*:\n> CPU > 90% \n");
    }

    #[test]
    fn test_standard_text_without_mention() {
        let text = standard_text(&config(), &model("CPU High", "CPU > 90%"));
        assert_eq!(text, "*Alert for Graylog stream _CPU High_*:\n> CPU > 90% \n");
    }

    #[test]
    fn test_standard_text_linked_title_is_unterminated() {
        let cfg = config()
            .to_builder()
            .graylog2_url("https://graylog.example.org")
            .build();
        let text = standard_text(&cfg, &model("CPU High", "CPU > 90%"));
        assert_eq!(
            text,
            "*Alert for Graylog stream <https://graylog.example.org|CPU High*:\n> CPU > 90% \n"
        );
    }

    #[test]
    fn test_standard_text_with_sentinel_values() {
        let text = standard_text(&config(), &model(UNKNOWN, UNKNOWN));
        assert_eq!(text, "*Alert for Graylog stream _<unknown>_*:\n> <unknown> \n");
    }

    #[test]
    fn test_custom_text_uses_configured_template() {
        let cfg = config()
            .to_builder()
            .custom_message("${event_definition_title}: ${event.message} ${nope}!")
            .build();
        let text = custom_text(&TemplateEngine::new(), &cfg, &model("CPU High", "d")).unwrap();
        assert_eq!(text, "CPU High: load 12 !");
    }

    #[test]
    fn test_custom_text_falls_back_to_default_template() {
        let cfg = config().to_builder().custom_message("  ").build();
        let text = custom_text(&TemplateEngine::new(), &cfg, &model("CPU High", "CPU > 90%")).unwrap();
        assert!(text.contains("**Title:**                CPU High"));
        assert!(text.contains("**Message:**              load 12"));
        // backlog 为空时不输出 backlog 段
        assert!(!text.contains("[Backlog]"));
    }
}
