//! Slack Notify CLI
//!
//! 校验通知配置、渲染并投递 Slack webhook 告警

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use slack_notify::cli::{
    handle_init, handle_render, handle_send, handle_validate, InitArgs, RenderArgs, SendArgs,
    ValidateArgs,
};

#[derive(Parser)]
#[command(name = "slack-notify")]
#[command(about = "Slack Notify - 把事件告警投递到 Slack webhook")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 校验通知配置
    Validate(ValidateArgs),
    /// 渲染消息（不发送）
    Render(RenderArgs),
    /// 执行通知并投递到 webhook
    Send(SendArgs),
    /// 生成默认配置文件
    Init(InitArgs),
}

fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=slack_notify=debug slack-notify send --context ctx.json
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("slack_notify=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate(args) => handle_validate(args)?,
        Commands::Render(args) => handle_render(args)?,
        Commands::Send(args) => handle_send(args)?,
        Commands::Init(args) => handle_init(args)?,
    }

    Ok(())
}
