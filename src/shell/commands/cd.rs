use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::{Command, ShellState};
use crate::fs::DavFileSystem;
use crate::vfs::VirtualPath;

pub struct CdCommand;

#[async_trait]
impl Command for CdCommand {
    fn name(&self) -> &str {
        "cd"
    }

    fn usage(&self) -> &str {
        "cd PATH                - Change current directory"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let Some(path_str) = args.first() else {
            // cd with no args goes to root
            state.set_cwd(VirtualPath::root());
            return Ok(());
        };

        let target = state.resolve(path_str);
        let kind = state.fs().resource_type(state.ctx(), &target).await?;
        if !kind.is_dir() {
            return Err(anyhow!("Not a directory: {path_str}"));
        }

        // warm the completion cache for the new directory
        let _ = state.list(&target).await;
        state.set_cwd(target);
        Ok(())
    }
}
