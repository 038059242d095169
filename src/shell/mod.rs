pub mod commands;
pub mod completion;
pub mod ui;

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::Arc;

use crate::fs::{DavFileSystem, DirEntry, MountTable, RequestContext};
use crate::vfs::VirtualPath;
use commands::Command;
pub use completion::{CompletionCache, CompletionEntry, ShellCompleter};

/// Shell state - tracks current location and provides command execution
pub struct ShellState {
    /// Current directory (full path, first segment is the mount)
    cwd: VirtualPath,
    /// Mounted collections
    fs: Arc<MountTable>,
    /// Credentials sent with every operation
    ctx: RequestContext,
    /// Tab completion cache
    completion_cache: CompletionCache,
    /// Registered commands
    commands: HashMap<String, Arc<dyn Command>>,
}

impl ShellState {
    /// Create a new shell state at `/`
    pub fn new(fs: Arc<MountTable>, ctx: RequestContext) -> Self {
        let mut state = ShellState {
            cwd: VirtualPath::root(),
            fs,
            ctx,
            completion_cache: CompletionCache::new(),
            commands: HashMap::new(),
        };

        state.register_command(Arc::new(commands::ls::LsCommand));
        state.register_command(Arc::new(commands::cd::CdCommand));
        state.register_command(Arc::new(commands::cat::CatCommand));
        state.register_command(Arc::new(commands::transfer::GetCommand));
        state.register_command(Arc::new(commands::transfer::PutCommand));
        state.register_command(Arc::new(commands::edit::MkdirCommand));
        state.register_command(Arc::new(commands::edit::TouchCommand));
        state.register_command(Arc::new(commands::edit::RmCommand));
        state.register_command(Arc::new(commands::edit::MvCommand));
        state.register_command(Arc::new(commands::stat::StatCommand));

        let mut names: Vec<String> = state.commands.keys().cloned().collect();
        names.extend(["pwd", "help", "exit"].map(String::from));
        names.sort();
        state.completion_cache.set_commands(names);

        state
    }

    /// Register a command
    fn register_command(&mut self, command: Arc<dyn Command>) {
        self.commands.insert(command.name().to_string(), command);
    }

    /// Execute a command line
    pub async fn execute(&mut self, line: &str) -> Result<()> {
        let parts = Self::parse_command_line(line.trim())?;

        if parts.is_empty() {
            return Ok(());
        }

        let cmd_name = &parts[0];
        let args = &parts[1..];

        // Check for built-in commands first
        match cmd_name.as_str() {
            "exit" | "quit" => {
                return Err(anyhow!("exit"));
            }
            "help" => {
                self.print_help();
                return Ok(());
            }
            "pwd" => {
                println!("{}", self.cwd);
                return Ok(());
            }
            _ => {}
        }

        // Look up command
        if let Some(command) = self.commands.get(cmd_name) {
            let cmd = Arc::clone(command);
            cmd.execute(self, args).await
        } else {
            Err(anyhow!("Unknown command: {cmd_name}"))
        }
    }

    pub fn fs(&self) -> &Arc<MountTable> {
        &self.fs
    }

    pub fn ctx(&self) -> &RequestContext {
        &self.ctx
    }

    pub fn cwd(&self) -> &VirtualPath {
        &self.cwd
    }

    pub fn set_cwd(&mut self, path: VirtualPath) {
        self.completion_cache.set_current_path(path.as_key());
        self.cwd = path;
    }

    /// Get the completion cache
    pub fn completion_cache(&self) -> &CompletionCache {
        &self.completion_cache
    }

    /// Absolute path for a command argument
    pub fn resolve(&self, arg: &str) -> VirtualPath {
        if arg.starts_with('/') {
            VirtualPath::parse(arg)
        } else {
            self.cwd.join(arg)
        }
    }

    /// List a directory and remember the names for tab completion
    pub async fn list(&self, path: &VirtualPath) -> Result<Vec<DirEntry>> {
        let mut entries = self.fs.read_dir(&self.ctx, path).await?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        self.completion_cache.update_entries(
            path.as_key(),
            entries
                .iter()
                .map(|e| CompletionEntry {
                    name: e.name.clone(),
                    is_dir: e.kind.is_dir(),
                })
                .collect(),
        );
        Ok(entries)
    }

    /// Print help message
    fn print_help(&self) {
        println!("Available commands:");
        let mut commands: Vec<_> = self.commands.values().collect();
        commands.sort_by(|a, b| a.name().cmp(b.name()));
        for command in commands {
            println!("  {}", command.usage());
        }
        println!("  pwd                    - Print working directory");
        println!("  help                   - Show this help");
        println!("  exit/quit              - Exit the shell");
        println!();
        println!("Mounts:");
        for name in self.fs.names() {
            let description = self.fs.get(name).map(|m| m.description()).unwrap_or("");
            println!("  /{name:<10} {description}");
        }
    }

    /// Get the prompt string
    pub fn prompt(&self) -> String {
        format!("edudav:{} $ ", self.cwd)
    }

    /// Split a command line into words
    ///
    /// Single and double quotes group words; a backslash escapes the next
    /// character outside single quotes.
    fn parse_command_line(line: &str) -> Result<Vec<String>> {
        let mut words = Vec::new();
        let mut word = String::new();
        let mut quote: Option<char> = None;
        let mut chars = line.chars();

        while let Some(ch) = chars.next() {
            match (quote, ch) {
                (Some('\''), '\'') | (Some('"'), '"') => quote = None,
                (Some('\''), _) => word.push(ch),
                (_, '\\') => {
                    if let Some(next) = chars.next() {
                        word.push(next);
                    }
                }
                (Some(_), _) => word.push(ch),
                (None, '\'' | '"') => quote = Some(ch),
                (None, ' ' | '\t') => {
                    if !word.is_empty() {
                        words.push(std::mem::take(&mut word));
                    }
                }
                (None, _) => word.push(ch),
            }
        }

        if let Some(q) = quote {
            return Err(anyhow!("Unclosed quote: {q}"));
        }
        if !word.is_empty() {
            words.push(word);
        }
        Ok(words)
    }
}
