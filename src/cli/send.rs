//! Send / Render 命令 - 执行通知流水线
//!
//! `render` 只渲染不发送；`send` 通过 webhook 投递（`--dry-run` 时只打印负载）。

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use super::input::{load_config, load_context, resolve_config_path};
use super::output::to_pretty_json;
use crate::notification::{ClientSettings, DryRunSender, SlackEventNotification, TemplateEngine};

/// Send 命令参数
#[derive(Args)]
pub struct SendArgs {
    /// 配置文件路径
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// 事件上下文 JSON 文件
    #[arg(long)]
    pub context: PathBuf,

    /// Dry-run 模式（只打印不发送）
    #[arg(long)]
    pub dry_run: bool,
}

/// Render 命令参数
#[derive(Args)]
pub struct RenderArgs {
    /// 配置文件路径
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// 事件上下文 JSON 文件
    #[arg(long)]
    pub context: PathBuf,

    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// Render 命令输出
#[derive(Debug, Serialize)]
pub struct RenderOutput {
    pub text: String,
    pub custom_message: Option<String>,
    pub payload: serde_json::Value,
}

fn notification() -> SlackEventNotification {
    SlackEventNotification::new(TemplateEngine::new(), ClientSettings::from_env())
}

/// 处理 send 命令
pub fn handle_send(args: SendArgs) -> Result<()> {
    let config_path = resolve_config_path(args.config.as_deref())?;
    let config = load_config(&config_path)?;
    let ctx = load_context(config, &args.context)?;
    let notification = notification();

    if args.dry_run {
        notification
            .execute_with(&ctx, &DryRunSender::new())
            .context("Dry-run failed")?;
        return Ok(());
    }

    notification
        .execute(&ctx)
        .context("Failed to deliver notification")?;
    info!(channel = ctx.notification_config.channel(), "Notification delivered");
    println!("✅ Sent to {}", ctx.notification_config.channel());
    Ok(())
}

/// 处理 render 命令
pub fn handle_render(args: RenderArgs) -> Result<()> {
    let config_path = resolve_config_path(args.config.as_deref())?;
    let config = load_config(&config_path)?;
    let ctx = load_context(config, &args.context)?;

    let message = notification()
        .prepare(&ctx)
        .context("Failed to render notification")?;
    let output = RenderOutput {
        text: message.text().to_string(),
        custom_message: message.custom_message().map(str::to_string),
        payload: serde_json::to_value(message.to_payload())?,
    };

    if args.json {
        println!("{}", to_pretty_json(&output)?);
    } else {
        println!("--- Text ---\n{}", output.text);
        if let Some(custom) = &output.custom_message {
            println!("--- Custom Message ---\n{}", custom);
        }
        println!("--- Payload ---\n{}", to_pretty_json(&output.payload)?);
    }
    Ok(())
}
