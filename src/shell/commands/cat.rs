use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::StreamExt;
use std::io::Write;

use super::{Command, ShellState};
use crate::fs::DavFileSystem;

pub struct CatCommand;

#[async_trait]
impl Command for CatCommand {
    fn name(&self) -> &str {
        "cat"
    }

    fn usage(&self) -> &str {
        "cat FILE               - Display file contents"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let Some(path_str) = args.first() else {
            return Err(anyhow!("Usage: cat FILE"));
        };

        let target = state.resolve(path_str);
        let mut stream = state.fs().open_read(state.ctx(), &target).await?;

        let mut binary_warned = false;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if !binary_warned && std::str::from_utf8(&chunk).is_err() {
                eprintln!("Warning: File contains binary data");
                binary_warned = true;
            }
            match std::io::stdout().write_all(&chunk) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
        match std::io::stdout().flush() {
            Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e.into()),
            _ => Ok(()),
        }
    }
}
