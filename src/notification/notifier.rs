//! Slack 事件通知 - 完整的通知流水线
//!
//! `execute`：构建模型 → 渲染文本 → 组装消息 → 投递。同步执行，所有组件
//! 只持有不可变配置，可在多个线程上并发调用。

use tracing::{debug, instrument, warn};

use super::channel::MessageSender;
use super::client::{ClientSettings, SlackClient};
use super::context::NotificationContext;
use super::error::NotificationError;
use super::formatter::{custom_text, standard_text};
use super::message::{MessageAssembler, OutboundMessage};
use super::model::{BacklogLimit, ModelBuilder};
use super::template::TemplateEngine;

/// Slack 事件通知
#[derive(Debug, Clone, Default)]
pub struct SlackEventNotification {
    engine: TemplateEngine,
    assembler: MessageAssembler,
    settings: ClientSettings,
}

impl SlackEventNotification {
    pub fn new(engine: TemplateEngine, settings: ClientSettings) -> Self {
        Self {
            engine,
            assembler: MessageAssembler::new(),
            settings,
        }
    }

    pub fn engine(&self) -> &TemplateEngine {
        &self.engine
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// 执行完整通知：通过 Slack webhook 投递
    ///
    /// 内部使用 reqwest blocking 客户端，不能直接在 tokio 运行时里调用；
    /// 异步宿主需通过 `tokio::task::spawn_blocking` 调用。
    #[instrument(skip_all, fields(channel = %ctx.notification_config.channel()))]
    pub fn execute(&self, ctx: &NotificationContext) -> Result<(), NotificationError> {
        let message = self.prepare(ctx)?;
        let client = SlackClient::new(&ctx.notification_config, &self.settings)?;
        self.deliver(&client, &message)
    }

    /// 使用指定的发送端执行
    pub fn execute_with(
        &self,
        ctx: &NotificationContext,
        sender: &dyn MessageSender,
    ) -> Result<(), NotificationError> {
        let message = self.prepare(ctx)?;
        self.deliver(sender, &message)
    }

    /// 构建模型、渲染、组装，不发送
    pub fn prepare(&self, ctx: &NotificationContext) -> Result<OutboundMessage, NotificationError> {
        let config = &ctx.notification_config;

        // 校验阶段已保证可解析
        let limit = BacklogLimit::parse(config.backlog_items()).unwrap_or_default();
        let model = ModelBuilder::new().backlog_limit(limit).build(ctx);

        let text = standard_text(config, &model);
        let custom = custom_text(&self.engine, config, &model)?;
        debug!(text_len = text.len(), custom_len = custom.len(), "Rendered notification text");

        Ok(self.assembler.assemble(config, text, Some(custom)))
    }

    fn deliver(&self, sender: &dyn MessageSender, message: &OutboundMessage) -> Result<(), NotificationError> {
        sender.send(message).map_err(|e| {
            warn!(sender = sender.name(), error = %e, "Failed to send message to Slack");
            NotificationError::from(e)
        })
    }
}
