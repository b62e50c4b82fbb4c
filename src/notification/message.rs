//! 出站消息与 Slack webhook 负载
//!
//! 负载格式：
//! ```json
//! {
//!   "channel": "#ops",
//!   "text": "@channel*Alert for Graylog stream _CPU High_*:\n> CPU > 90% \n",
//!   "link_names": 1,
//!   "username": "graylog",
//!   "icon_emoji": ":rotating_light:",
//!   "attachments": [{
//!     "fallback": "Custom Message",
//!     "pretext": "Custom Message:",
//!     "text": "...",
//!     "color": "#FF0000",
//!     "mrkdwn_in": ["text", "pretext"]
//!   }]
//! }
//! ```

use serde::Serialize;

use super::config::NotificationConfig;

const ATTACHMENT_FALLBACK: &str = "Custom Message";
const ATTACHMENT_PRETEXT: &str = "Custom Message:";

/// 出站消息（构造后不可变）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    color: String,
    icon_emoji: String,
    icon_url: String,
    text: String,
    user_name: String,
    channel: String,
    link_names: bool,
    custom_message: Option<String>,
}

impl OutboundMessage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        color: impl Into<String>,
        icon_emoji: impl Into<String>,
        icon_url: impl Into<String>,
        text: impl Into<String>,
        user_name: impl Into<String>,
        channel: impl Into<String>,
        link_names: bool,
        custom_message: Option<String>,
    ) -> Self {
        Self {
            color: color.into(),
            icon_emoji: icon_emoji.into(),
            icon_url: icon_url.into(),
            text: text.into(),
            user_name: user_name.into(),
            channel: channel.into(),
            link_names,
            custom_message,
        }
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn icon_emoji(&self) -> &str {
        &self.icon_emoji
    }

    pub fn icon_url(&self) -> &str {
        &self.icon_url
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn link_names(&self) -> bool {
        self.link_names
    }

    pub fn custom_message(&self) -> Option<&str> {
        self.custom_message.as_deref()
    }

    /// 转为 webhook 负载
    pub fn to_payload(&self) -> SlackPayload<'_> {
        let attachments = self
            .custom_message
            .as_deref()
            .filter(|m| !m.is_empty())
            .map(|text| {
                vec![SlackAttachment {
                    fallback: ATTACHMENT_FALLBACK,
                    pretext: ATTACHMENT_PRETEXT,
                    text,
                    color: &self.color,
                    mrkdwn_in: ["text", "pretext"],
                }]
            });

        SlackPayload {
            channel: &self.channel,
            text: &self.text,
            link_names: u8::from(self.link_names),
            username: non_empty(&self.user_name),
            icon_url: non_empty(&self.icon_url),
            icon_emoji: non_empty(&self.icon_emoji).map(emoji_syntax),
            attachments,
        }
    }
}

/// Slack webhook 负载
#[derive(Debug, Serialize)]
pub struct SlackPayload<'a> {
    pub channel: &'a str,
    pub text: &'a str,
    pub link_names: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_emoji: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<SlackAttachment<'a>>>,
}

/// 承载自定义文本的附件
#[derive(Debug, Serialize)]
pub struct SlackAttachment<'a> {
    pub fallback: &'a str,
    pub pretext: &'a str,
    pub text: &'a str,
    pub color: &'a str,
    pub mrkdwn_in: [&'static str; 2],
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

/// `rotating_light` → `:rotating_light:`
fn emoji_syntax(emoji: &str) -> String {
    let name = emoji.trim_matches(':');
    format!(":{}:", name)
}

/// 消息组装器
///
/// 不做校验，输入来自已校验的配置。
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageAssembler;

impl MessageAssembler {
    pub fn new() -> Self {
        Self
    }

    /// `link_names` 为 `link_names || notify_channel`
    pub fn assemble(
        &self,
        config: &NotificationConfig,
        text: String,
        custom_message: Option<String>,
    ) -> OutboundMessage {
        OutboundMessage::new(
            config.color(),
            config.icon_emoji(),
            config.icon_url(),
            text,
            config.user_name(),
            config.channel(),
            config.link_names() || config.notify_channel(),
            custom_message,
        )
    }
}
