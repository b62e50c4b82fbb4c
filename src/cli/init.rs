//! Init 命令 - 生成带默认模板的配置文件

use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;

use super::input::resolve_config_path;
use super::output::to_pretty_json;
use crate::notification::NotificationConfig;

/// Init 命令参数
#[derive(Args)]
pub struct InitArgs {
    /// 输出路径（默认为配置文件路径）
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// 覆盖已存在的文件
    #[arg(long)]
    pub force: bool,

    /// 输出到 stdout 而不是文件
    #[arg(long, conflicts_with = "output")]
    pub stdout: bool,
}

/// 处理 init 命令
pub fn handle_init(args: InitArgs) -> Result<()> {
    let content = to_pretty_json(&NotificationConfig::form_defaults().to_map())?;

    if args.stdout {
        println!("{}", content);
        return Ok(());
    }

    let path = resolve_config_path(args.output.as_deref())?;
    if path.exists() && !args.force {
        return Err(anyhow!("{} already exists (use --force to overwrite)", path.display()));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&path, content + "\n").with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Wrote {}", path.display());
    println!("   Fill in webhook_url and channel, then run `slack-notify validate`.");
    Ok(())
}
