//! 消息发送 trait 定义

use std::sync::Mutex;
use tracing::info;

use super::error::DeliveryError;
use super::message::OutboundMessage;

/// 消息发送端
///
/// 每次调用最多发送一条消息，不做重试；重试由宿主的任务调度负责。
pub trait MessageSender: Send + Sync {
    /// 名称（用于日志）
    fn name(&self) -> &str;

    /// 同步发送
    fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryError>;
}

/// Dry-run 发送端：只打印负载，不访问网络
#[derive(Debug, Default)]
pub struct DryRunSender {
    sent: Mutex<Vec<String>>,
}

impl DryRunSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已"发送"的负载 JSON
    pub fn payloads(&self) -> Vec<String> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl MessageSender for DryRunSender {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        let body = serde_json::to_string_pretty(&message.to_payload())?;
        info!(channel = message.channel(), "[DRY-RUN] Would send webhook payload");
        eprintln!("[DRY-RUN] Would send to {}:\n{}", message.channel(), body);

        match self.sent.lock() {
            Ok(mut sent) => sent.push(body),
            Err(poisoned) => poisoned.into_inner().push(body),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_records_payload() {
        let sender = DryRunSender::new();
        let msg = OutboundMessage::new("#FF0000", "", "", "hello", "", "#ops", false, None);

        sender.send(&msg).unwrap();

        let payloads = sender.payloads();
        assert_eq!(payloads.len(), 1);
        assert!(payloads[0].contains("\"text\": \"hello\""));
        assert_eq!(sender.name(), "dry-run");
    }
}
