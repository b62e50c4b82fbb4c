//! 通知流水线测试：模型 → 文本 → 消息（不访问网络）

use serde_json::Value;
use slack_notify::notification::{
    BacklogLimit, ClientSettings, ConfigValidator, DryRunSender, Event, EventDefinition, JobTrigger,
    MessageSummary, MissingKeyPolicy, ModelBuilder, NotificationConfig, NotificationContext,
    SlackEventNotification, TemplateEngine, UNKNOWN,
};
use slack_notify::{NotificationError, TemplateError};

fn base_config() -> slack_notify::notification::ConfigBuilder {
    NotificationConfig::builder()
        .webhook_url("https://example.org/")
        .channel("#test")
        .color("#FF0000")
}

fn cpu_definition() -> EventDefinition {
    EventDefinition {
        id: Some("def-1".to_string()),
        definition_type: Some("aggregation-v1".to_string()),
        title: Some("CPU High".to_string()),
        description: Some("CPU > 90%".to_string()),
    }
}

fn cpu_event() -> Event {
    Event {
        id: "evt-1".to_string(),
        message: "CPU load 97%".to_string(),
        source: "web-01".to_string(),
        priority: 2,
        alert: true,
        ..Default::default()
    }
}

fn backlog(n: usize) -> Vec<MessageSummary> {
    (0..n)
        .map(|i| MessageSummary {
            index: "graylog_0".to_string(),
            id: format!("msg-{}", i),
            message: format!("line {}", i),
            source: "web-01".to_string(),
            ..Default::default()
        })
        .collect()
}

fn context(config: NotificationConfig) -> NotificationContext {
    let config = ConfigValidator::new().check(config).unwrap();
    NotificationContext::new(config, cpu_event()).with_event_definition(cpu_definition())
}

mod standard_text {
    use super::*;

    #[test]
    fn test_channel_mention_and_italic_title() {
        let ctx = context(base_config().notify_channel(true).build());
        let message = SlackEventNotification::default().prepare(&ctx).unwrap();

        assert_eq!(
            message.text(),
            "@channel*Alert for Graylog stream _CPU High_*:\n> CPU > 90% \n"
        );
        // notify_channel 强制开启 link_names
        assert!(message.link_names());
    }

    #[test]
    fn test_graylog_link_is_left_open() {
        let ctx = context(base_config().graylog2_url("http://graylog.example.com").build());
        let message = SlackEventNotification::default().prepare(&ctx).unwrap();

        assert_eq!(
            message.text(),
            "*Alert for Graylog stream <http://graylog.example.com|CPU High*:\n> CPU > 90% \n"
        );
        assert!(!message.link_names());
    }

    #[test]
    fn test_missing_definition_uses_unknown() {
        let config = ConfigValidator::new().check(base_config().build()).unwrap();
        let ctx = NotificationContext::new(config, cpu_event());
        let message = SlackEventNotification::default().prepare(&ctx).unwrap();

        assert_eq!(
            message.text(),
            format!("*Alert for Graylog stream _{0}_*:\n> {0} \n", UNKNOWN)
        );
    }
}

mod custom_text {
    use super::*;

    #[test]
    fn test_default_template_lists_event_and_backlog() {
        let ctx = context(base_config().build()).with_backlog(backlog(2));
        let message = SlackEventNotification::default().prepare(&ctx).unwrap();
        let custom = message.custom_message().unwrap();

        assert!(custom.contains("CPU High"));
        assert!(custom.contains("CPU load 97%"));
        assert!(custom.contains("web-01"));
        assert!(custom.contains("# --- [Backlog]"));
        assert!(custom.contains("line 0"));
        assert!(custom.contains("line 1"));
    }

    #[test]
    fn test_default_template_skips_empty_backlog_section() {
        let ctx = context(base_config().build());
        let message = SlackEventNotification::default().prepare(&ctx).unwrap();

        assert!(!message.custom_message().unwrap().contains("# --- [Backlog]"));
    }

    #[test]
    fn test_user_template() {
        let template = "${if event.alert}ALERT ${end}${event_definition_title} on ${event.source}";
        let ctx = context(base_config().custom_message(template).build());
        let message = SlackEventNotification::default().prepare(&ctx).unwrap();

        assert_eq!(message.custom_message(), Some("ALERT CPU High on web-01"));
    }

    #[test]
    fn test_unknown_key_renders_empty() {
        let ctx = context(base_config().custom_message("[${no.such.key}]").build());
        let message = SlackEventNotification::default().prepare(&ctx).unwrap();

        assert_eq!(message.custom_message(), Some("[]"));
    }

    #[test]
    fn test_unknown_key_fails_in_strict_mode() {
        let ctx = context(base_config().custom_message("[${no.such.key}]").build());
        let engine = TemplateEngine::new().with_missing_key_policy(MissingKeyPolicy::Strict);
        let notification = SlackEventNotification::new(engine, ClientSettings::default());

        let err = notification.prepare(&ctx).unwrap_err();
        assert!(matches!(
            err,
            NotificationError::Template(TemplateError::UnknownKey(ref key)) if key == "no.such.key"
        ));
    }
}

mod backlog_limit {
    use super::*;

    fn kept(backlog_items: &str, available: usize) -> usize {
        let ctx = context(base_config().backlog_items(backlog_items).build()).with_backlog(backlog(available));
        let limit = BacklogLimit::parse(ctx.notification_config.backlog_items()).unwrap();
        let model = ModelBuilder::new().backlog_limit(limit).build(&ctx);
        match model.get("backlog") {
            Some(Value::Array(items)) => items.len(),
            other => panic!("unexpected backlog value: {:?}", other),
        }
    }

    #[test]
    fn test_limit_truncates() {
        assert_eq!(kept("3", 10), 3);
        assert_eq!(kept("3", 2), 2);
    }

    #[test]
    fn test_zero_or_false_drops_backlog() {
        assert_eq!(kept("0", 4), 0);
        assert_eq!(kept("false", 4), 0);
    }

    #[test]
    fn test_empty_keeps_everything() {
        assert_eq!(kept("", 7), 7);
    }
}

#[test]
fn test_model_exposes_job_trigger() {
    let ctx = context(base_config().build()).with_job_trigger(JobTrigger {
        id: Some("trigger-9".to_string()),
        job_definition_id: Some("job-3".to_string()),
    });
    let model = ModelBuilder::new().build(&ctx);

    assert_eq!(model.get_str("job_trigger_id"), "trigger-9");
    assert_eq!(model.get_str("job_definition_id"), "job-3");
    assert_eq!(model.get_str("event_definition_type"), "aggregation-v1");
}

#[test]
fn test_dry_run_payload_shape() {
    let ctx = context(
        base_config()
            .user_name("graylog")
            .icon_emoji("rotating_light")
            .link_names(true)
            .build(),
    );
    let sender = DryRunSender::new();
    SlackEventNotification::default().execute_with(&ctx, &sender).unwrap();

    let payloads = sender.payloads();
    assert_eq!(payloads.len(), 1);
    let payload: Value = serde_json::from_str(&payloads[0]).unwrap();

    assert_eq!(payload["channel"], "#test");
    assert_eq!(payload["username"], "graylog");
    assert_eq!(payload["icon_emoji"], ":rotating_light:");
    assert_eq!(payload["link_names"], 1);
    assert!(payload.get("icon_url").is_none());

    let attachment = &payload["attachments"][0];
    assert_eq!(attachment["fallback"], "Custom Message");
    assert_eq!(attachment["pretext"], "Custom Message:");
    assert_eq!(attachment["color"], "#FF0000");
    assert!(attachment["text"].as_str().unwrap().contains("CPU High"));
}
