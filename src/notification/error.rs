//! 错误类型 - 配置校验 / 模板渲染 / 投递
//!
//! 模型构建没有错误类型：缺失的上游字段统一替换为 `<unknown>`。

use std::fmt;

use thiserror::Error;

use super::validator::ValidationResult;

/// 配置校验失败（保存配置时）
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid notification configuration: {result}")]
pub struct ConfigValidationError {
    result: ValidationResult,
}

impl ConfigValidationError {
    pub fn new(result: ValidationResult) -> Self {
        Self { result }
    }

    /// 全部字段错误
    pub fn result(&self) -> &ValidationResult {
        &self.result
    }

    /// 指定字段是否有错误
    pub fn has_error(&self, field: &str) -> bool {
        self.result.errors_for(field).is_some()
    }
}

/// 模板解析 / 渲染错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// 语法错误，`position` 为字节偏移
    #[error("template syntax error at byte {position}: {message}")]
    Syntax { position: usize, message: String },

    /// Strict 模式下引用了不存在的 key
    #[error("template references unknown key `{0}`")]
    UnknownKey(String),
}

impl TemplateError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }
}

/// Webhook 投递失败
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// HTTP 客户端构建失败（如代理地址无法被 reqwest 接受）
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// 负载序列化失败
    #[error("failed to serialize webhook payload")]
    Serialize(#[from] serde_json::Error),

    /// 连接失败、超时、读取响应失败
    #[error("webhook request failed")]
    Transport(#[source] reqwest::Error),

    /// 非 2xx 响应
    #[error("webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl DeliveryError {
    /// 是否超时
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(e) | Self::Client(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// HTTP 状态码（仅 Status 变体）
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// `execute` 对宿主暴露的唯一失败信号
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification configuration rejected")]
    InvalidConfig(#[from] ConfigValidationError),

    #[error("failed to render notification message")]
    Template(#[from] TemplateError),

    #[error("failed to send message to Slack")]
    Delivery(#[from] DeliveryError),
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in self.errors() {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                first = false;
                write!(f, "{}: {}", field, message)?;
            }
        }
        if first {
            f.write_str("no errors")?;
        }
        Ok(())
    }
}
