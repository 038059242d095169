use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::{Command, ShellState};
use crate::fs::DavFileSystem;
use crate::shell::ui::create_spinner;
use crate::vfs::VirtualPath;

/// Download a file to the local disk
pub struct GetCommand;

#[async_trait]
impl Command for GetCommand {
    fn name(&self) -> &str {
        "get"
    }

    fn usage(&self) -> &str {
        "get FILE [LOCAL]       - Download a file"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let Some(remote) = args.first() else {
            return Err(anyhow!("Usage: get FILE [LOCAL]"));
        };
        let source = state.resolve(remote);
        let filename = source
            .filename()
            .ok_or_else(|| anyhow!("Not a file: {remote}"))?
            .to_string();
        let local = args
            .get(1)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(&filename));

        let spinner = create_spinner(&format!("Downloading {filename}..."));
        let result = download(state, &source, &local).await;
        spinner.finish_and_clear();

        let written = result?;
        println!(
            "{} -> {} ({})",
            source,
            local.display(),
            humansize::format_size(written, humansize::BINARY)
        );
        Ok(())
    }
}

async fn download(state: &ShellState, source: &VirtualPath, local: &Path) -> Result<u64> {
    let mut stream = state.fs().open_read(state.ctx(), source).await?;
    let mut file = tokio::fs::File::create(local)
        .await
        .with_context(|| format!("cannot create {}", local.display()))?;
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Upload a local file
pub struct PutCommand;

#[async_trait]
impl Command for PutCommand {
    fn name(&self) -> &str {
        "put"
    }

    fn usage(&self) -> &str {
        "put LOCAL [FILE]       - Upload a local file"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let Some(local) = args.first() else {
            return Err(anyhow!("Usage: put LOCAL [FILE]"));
        };
        let local = PathBuf::from(local);
        let target = match args.get(1) {
            Some(remote) => state.resolve(remote),
            None => {
                let name = local
                    .file_name()
                    .and_then(|n| n.to_str())
                    .ok_or_else(|| anyhow!("Invalid local file name: {}", local.display()))?;
                state.cwd().child(name)
            }
        };

        let data = tokio::fs::read(&local)
            .await
            .with_context(|| format!("cannot read {}", local.display()))?;

        let spinner = create_spinner(&format!("Uploading {}...", local.display()));
        let result = async {
            let mut sink = state.fs().open_write(state.ctx(), &target).await?;
            sink.write_all(&data).await?;
            sink.shutdown().await?;
            Ok::<_, anyhow::Error>(sink.finish().await?)
        }
        .await;
        spinner.finish_and_clear();

        let resource = result?;
        println!(
            "{} -> {} ({})",
            local.display(),
            target,
            humansize::format_size(resource.size.unwrap_or(0), humansize::BINARY)
        );
        Ok(())
    }
}
