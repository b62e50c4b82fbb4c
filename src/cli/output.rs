//! Output formatting for CLI commands

use anyhow::Result;
use serde::Serialize;

/// 输出 pretty JSON
pub fn to_pretty_json<T: Serialize + ?Sized>(data: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}
