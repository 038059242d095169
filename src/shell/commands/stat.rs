use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Command, ShellState};
use crate::fs::DavFileSystem;
use crate::print_line;

pub struct StatCommand;

#[async_trait]
impl Command for StatCommand {
    fn name(&self) -> &str {
        "stat"
    }

    fn usage(&self) -> &str {
        "stat PATH              - Show metadata"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let Some(path_str) = args.first() else {
            return Err(anyhow!("Usage: stat PATH"));
        };
        let target = state.resolve(path_str);
        let fs = state.fs();
        let ctx = state.ctx();

        let kind = fs.resource_type(ctx, &target).await?;
        let size = fs.size(ctx, &target).await?;
        let created = fs.creation_date(ctx, &target).await?;
        let modified = fs.last_modified_date(ctx, &target).await?;

        print_line!("  Path: {target}");
        print_line!("  Type: {}", if kind.is_dir() { "directory" } else { "file" });
        print_line!(
            "  Size: {}",
            size.map(|s| format!("{} ({s} bytes)", humansize::format_size(s, humansize::BINARY)))
                .unwrap_or_else(|| "-".to_string())
        );
        print_line!("Created: {}", date(created));
        print_line!("Modified: {}", date(modified));
        Ok(())
    }
}

fn date(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|d| d.to_rfc3339())
        .unwrap_or_else(|| "-".to_string())
}
