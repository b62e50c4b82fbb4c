//! 通知投递流水线 - 把告警事件格式化后发送到 Slack webhook
//!
//! # 流程
//! 1. 保存配置时：`ConfigValidator` 校验，得到 `ValidatedConfig`
//! 2. 告警触发时：`ModelBuilder` 构建模型 → 渲染标准文本和自定义文本 →
//!    `MessageAssembler` 组装 → `SlackClient` 投递
//!
//! # 使用示例
//! ```ignore
//! use slack_notify::notification::{ConfigValidator, NotificationConfig, SlackEventNotification};
//!
//! let config = ConfigValidator::new().check(
//!     NotificationConfig::builder()
//!         .webhook_url("https://hooks.slack.com/services/T000/B000/XXX")
//!         .channel("#ops")
//!         .color("#FF0000")
//!         .build(),
//! )?;
//!
//! let ctx = NotificationContext::new(config, event);
//! SlackEventNotification::default().execute(&ctx)?;
//! ```

pub mod channel;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod formatter;
pub mod message;
pub mod model;
pub mod notifier;
pub mod template;
pub mod validator;

pub use channel::{DryRunSender, MessageSender};
pub use client::{ClientSettings, SlackClient};
pub use config::{ConfigBuilder, NotificationConfig, DEFAULT_CUSTOM_MESSAGE, TYPE_NAME};
pub use context::{Event, EventDefinition, JobTrigger, MessageSummary, NotificationContext};
pub use error::{ConfigValidationError, DeliveryError, NotificationError, TemplateError};
pub use formatter::{custom_text, standard_text};
pub use message::{MessageAssembler, OutboundMessage, SlackPayload};
pub use model::{BacklogLimit, ModelBuilder, RenderModel, UNKNOWN};
pub use notifier::SlackEventNotification;
pub use template::{MissingKeyPolicy, Template, TemplateEngine};
pub use validator::{ConfigValidator, ValidatedConfig, ValidationResult};
