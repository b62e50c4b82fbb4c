//! Slack Notify - 把事件告警格式化后投递到 Slack 风格的 webhook

pub mod cli;
pub mod notification;

pub use notification::{
    ConfigValidationError, ConfigValidator, DeliveryError, NotificationConfig, NotificationContext,
    NotificationError, OutboundMessage, SlackClient, SlackEventNotification, TemplateEngine,
    TemplateError, ValidatedConfig,
};
