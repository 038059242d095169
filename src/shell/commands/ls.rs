use anyhow::Result;
use async_trait::async_trait;
use colored::*;

use super::{Command, ShellState};
use crate::print_line;
use crate::vfs::Permissions;

pub struct LsCommand;

#[async_trait]
impl Command for LsCommand {
    fn name(&self) -> &str {
        "ls"
    }

    fn usage(&self) -> &str {
        "ls [-l] [PATH]         - List directory contents"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let mut long_format = false;
        let mut path_arg: Option<&str> = None;

        for arg in args {
            if arg == "-l" {
                long_format = true;
            } else if !arg.starts_with('-') {
                path_arg = Some(arg);
                break; // Only take the first non-flag argument
            }
        }

        let target = match path_arg {
            Some(path) => state.resolve(path),
            None => state.cwd().clone(),
        };
        let entries = state.list(&target).await?;

        if long_format {
            print_line!("{:<4} {:<50} {:>12} MODIFIED", "PERM", "NAME", "SIZE");
            print_line!("{}", "-".repeat(90));
            for entry in &entries {
                let size = entry
                    .size
                    .map(|s| humansize::format_size(s, humansize::BINARY))
                    .unwrap_or_else(|| "-".to_string());
                let modified = entry
                    .modified
                    .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                let name = if entry.kind.is_dir() {
                    format!("{}/", entry.name).blue().bold()
                } else {
                    entry.name.normal()
                };
                print_line!(
                    "{:<4} {:<50} {:>12} {}",
                    perm_string(&entry.permissions),
                    name,
                    size,
                    modified
                );
            }
        } else {
            for entry in &entries {
                if entry.kind.is_dir() {
                    print_line!("{}/", entry.name.blue().bold());
                } else {
                    print_line!("{}", entry.name);
                }
            }
        }

        Ok(())
    }
}

/// Compact `rwcd` rendering of a permission set
pub fn perm_string(perms: &Permissions) -> String {
    [
        (perms.read, 'r'),
        (perms.write, 'w'),
        (perms.create, 'c'),
        (perms.delete, 'd'),
    ]
    .iter()
    .map(|(set, c)| if *set { *c } else { '-' })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perm_string() {
        assert_eq!(perm_string(&Permissions::all()), "rwcd");
        assert_eq!(perm_string(&Permissions::read_only()), "r---");
        assert_eq!(perm_string(&Permissions::none()), "----");
    }
}
