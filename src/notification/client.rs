//! Slack Webhook 客户端
//!
//! 单次同步 POST，可选 HTTP/HTTPS 代理。连接和整体请求都有超时上限。
//!
//! 超时配置读取：
//! 1. 环境变量 `SLACK_NOTIFY_CONNECT_TIMEOUT_MS` / `SLACK_NOTIFY_TIMEOUT_MS`
//! 2. 默认值（连接 5 秒，整体 10 秒）

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::Proxy;
use std::io::Read;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

use super::channel::MessageSender;
use super::error::DeliveryError;
use super::message::OutboundMessage;
use super::validator::ValidatedConfig;

/// 默认连接超时（毫秒）
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// 默认请求超时（毫秒）
pub const DEFAULT_TIMEOUT_MS: u64 = 10000;

pub const ENV_CONNECT_TIMEOUT_MS: &str = "SLACK_NOTIFY_CONNECT_TIMEOUT_MS";
pub const ENV_TIMEOUT_MS: &str = "SLACK_NOTIFY_TIMEOUT_MS";

/// 错误响应体最多保留的字符数
const MAX_ERROR_BODY_CHARS: usize = 512;

/// 错误响应体最多读取的字节数（UTF-8 每字符最多 4 字节）
const MAX_ERROR_BODY_BYTES: u64 = (MAX_ERROR_BODY_CHARS * 4) as u64;

/// HTTP 客户端设置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            user_agent: format!("slack-notify/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientSettings {
    /// 从环境变量读取，缺失或非法时使用默认值
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str, fallback: Duration| match lookup(key) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    warn!(key, value = %raw, "Ignoring invalid timeout setting");
                    fallback
                }
            },
            None => fallback,
        };

        Self {
            connect_timeout: millis(ENV_CONNECT_TIMEOUT_MS, defaults.connect_timeout),
            timeout: millis(ENV_TIMEOUT_MS, defaults.timeout),
            user_agent: defaults.user_agent,
        }
    }
}

/// Slack Webhook 客户端
///
/// 按单次通知构造，配置须已通过校验。
#[derive(Debug)]
pub struct SlackClient {
    client: Client,
    webhook_url: String,
    webhook_host: String,
    proxied: bool,
}

impl SlackClient {
    pub fn new(config: &ValidatedConfig, settings: &ClientSettings) -> Result<Self, DeliveryError> {
        let mut builder = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.as_str());

        let proxy_address = config.proxy_address().trim();
        let proxied = !proxy_address.is_empty();
        builder = if proxied {
            builder.proxy(Proxy::all(proxy_address).map_err(DeliveryError::Client)?)
        } else {
            // 直连，忽略 HTTP(S)_PROXY 环境变量
            builder.no_proxy()
        };

        let client = builder.build().map_err(DeliveryError::Client)?;
        let webhook_url = config.webhook_url().trim().to_string();
        let webhook_host = Url::parse(&webhook_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        Ok(Self {
            client,
            webhook_url,
            webhook_host,
            proxied,
        })
    }

    /// 发送消息，2xx 为成功
    pub fn send_message(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(&message.to_payload())?;

        debug!(
            webhook_host = %self.webhook_host,
            channel = message.channel(),
            proxied = self.proxied,
            bytes = body.len(),
            "Posting message to Slack webhook"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(&self.webhook_url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| {
                warn!(
                    webhook_host = %self.webhook_host,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    timeout = e.is_timeout(),
                    error = %e,
                    "Slack webhook request failed"
                );
                DeliveryError::Transport(e)
            })?;

        let status = response.status();
        if status.is_success() {
            info!(
                webhook_host = %self.webhook_host,
                channel = message.channel(),
                status = status.as_u16(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Sent message to Slack"
            );
            return Ok(());
        }

        let body = read_error_body(response);
        warn!(
            webhook_host = %self.webhook_host,
            status = status.as_u16(),
            body = %body,
            "Slack webhook rejected message"
        );

        Err(DeliveryError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

impl MessageSender for SlackClient {
    fn name(&self) -> &str {
        "slack"
    }

    fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        self.send_message(message)
    }
}

/// 只读取错误响应体的开头部分；读取失败时保留已读到的内容
fn read_error_body(reader: impl Read) -> String {
    let mut raw = Vec::new();
    if let Err(e) = reader.take(MAX_ERROR_BODY_BYTES).read_to_end(&mut raw) {
        debug!(error = %e, "Failed to read webhook error body");
    }
    let text = String::from_utf8_lossy(&raw);
    truncate_chars(text.trim(), MAX_ERROR_BODY_CHARS)
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
