use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::{Command, ShellState};
use crate::fs::DavFileSystem;
use crate::vfs::ResourceKind;

pub struct MkdirCommand;

#[async_trait]
impl Command for MkdirCommand {
    fn name(&self) -> &str {
        "mkdir"
    }

    fn usage(&self) -> &str {
        "mkdir DIR              - Create a directory"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let Some(dir) = args.first() else {
            return Err(anyhow!("Usage: mkdir DIR"));
        };
        let target = state.resolve(dir);
        state
            .fs()
            .create(state.ctx(), &target, ResourceKind::Directory)
            .await?;
        Ok(())
    }
}

/// Create an empty file (office documents come from backend templates)
pub struct TouchCommand;

#[async_trait]
impl Command for TouchCommand {
    fn name(&self) -> &str {
        "touch"
    }

    fn usage(&self) -> &str {
        "touch FILE             - Create an empty file"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let Some(file) = args.first() else {
            return Err(anyhow!("Usage: touch FILE"));
        };
        let target = state.resolve(file);
        state
            .fs()
            .create(state.ctx(), &target, ResourceKind::File)
            .await?;
        Ok(())
    }
}

pub struct RmCommand;

#[async_trait]
impl Command for RmCommand {
    fn name(&self) -> &str {
        "rm"
    }

    fn usage(&self) -> &str {
        "rm PATH                - Delete a file or directory"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        if args.is_empty() {
            return Err(anyhow!("Usage: rm PATH..."));
        }
        for arg in args {
            let target = state.resolve(arg);
            if state.cwd().starts_with(&target) {
                return Err(anyhow!("Refusing to remove the current directory: {arg}"));
            }
            state.fs().delete(state.ctx(), &target).await?;
        }
        Ok(())
    }
}

pub struct MvCommand;

#[async_trait]
impl Command for MvCommand {
    fn name(&self) -> &str {
        "mv"
    }

    fn usage(&self) -> &str {
        "mv FROM TO             - Rename or move"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let [from, to] = args else {
            return Err(anyhow!("Usage: mv FROM TO"));
        };
        let source = state.resolve(from);
        let mut target = state.resolve(to);

        // moving onto an existing directory moves into it
        if let Ok(kind) = state.fs().resource_type(state.ctx(), &target).await {
            if kind.is_dir() {
                let name = source
                    .filename()
                    .ok_or_else(|| anyhow!("Cannot move {from}"))?;
                target = target.child(name);
            }
        }

        state.fs().move_to(state.ctx(), &source, &target).await?;
        Ok(())
    }
}
