//! Validate 命令 - 校验通知配置文件

use anyhow::{anyhow, Result};
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::input::{load_raw_config, resolve_config_path};
use super::output::to_pretty_json;
use crate::notification::ConfigValidator;

/// Validate 命令参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// Validate 命令输出
#[derive(Debug, Serialize)]
pub struct ValidateOutput {
    pub path: String,
    pub valid: bool,
    pub errors: BTreeMap<String, Vec<String>>,
}

/// 处理 validate 命令，配置非法时返回错误（非零退出码）
pub fn handle_validate(args: ValidateArgs) -> Result<()> {
    let path = resolve_config_path(args.config.as_deref())?;
    let raw = load_raw_config(&path)?;

    let output = match ConfigValidator::new().validate_map(&raw) {
        Ok(_) => ValidateOutput {
            path: path.display().to_string(),
            valid: true,
            errors: BTreeMap::new(),
        },
        Err(e) => ValidateOutput {
            path: path.display().to_string(),
            valid: false,
            errors: e.result().errors().clone(),
        },
    };

    if args.json {
        println!("{}", to_pretty_json(&output)?);
    } else if output.valid {
        println!("✅ {} is valid", output.path);
    } else {
        println!("❌ {} has errors:", output.path);
        for (field, messages) in &output.errors {
            for message in messages {
                println!("  {}: {}", field, message);
            }
        }
    }

    if output.valid {
        Ok(())
    } else {
        Err(anyhow!("configuration is invalid ({} field(s))", output.errors.len()))
    }
}
