use parking_lot::RwLock;
use rustyline::Context;
use rustyline::completion::{Completer, Pair};
use std::collections::HashMap;
use std::sync::Arc;

use crate::vfs::VirtualPath;

/// Entry in completion cache with metadata
#[derive(Clone, Debug)]
pub struct CompletionEntry {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Default)]
struct Completions {
    /// Listed entries by directory key
    entries: HashMap<String, Vec<CompletionEntry>>,
    commands: Vec<String>,
    /// Key of the shell's current directory
    current_path: String,
}

/// Names the shell has already seen, shared with the line editor
///
/// Filled from the listings the shell already performed; completion never
/// talks to the backend itself.
#[derive(Clone, Default)]
pub struct CompletionCache {
    inner: Arc<RwLock<Completions>>,
}

impl CompletionCache {
    pub fn new() -> Self {
        let cache = Self::default();
        cache.set_current_path("/".to_string());
        cache
    }

    pub fn set_commands(&self, commands: Vec<String>) {
        self.inner.write().commands = commands;
    }

    pub fn set_current_path(&self, path: String) {
        self.inner.write().current_path = path;
    }

    pub fn current_path(&self) -> String {
        self.inner.read().current_path.clone()
    }

    /// Remember the listing of `path`
    pub fn update_entries(&self, path: String, entries: Vec<CompletionEntry>) {
        self.inner.write().entries.insert(path, entries);
    }

    pub fn get_entries(&self, path: &str) -> Option<Vec<CompletionEntry>> {
        self.inner.read().entries.get(path).cloned()
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.inner.read().commands.clone()
    }
}

/// Tab completion helper for the shell
pub struct ShellCompleter {
    cache: CompletionCache,
}

impl ShellCompleter {
    pub fn new(cache: CompletionCache) -> Self {
        ShellCompleter { cache }
    }

    /// Complete a command at the start of the line
    fn complete_command(&self, line: &str) -> Vec<Pair> {
        self.cache
            .get_commands()
            .into_iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd,
            })
            .collect()
    }

    /// Complete a path (file or directory)
    fn complete_path(&self, path: &str, command: &str) -> Vec<Pair> {
        // Split into the directory part (with trailing slash) and the prefix
        let (dir_path, file_prefix) = match path.rfind('/') {
            Some(last_slash) => (&path[..last_slash + 1], &path[last_slash + 1..]),
            None => ("", path),
        };

        let current = VirtualPath::parse(&self.cache.current_path());
        let dir = if dir_path.starts_with('/') {
            VirtualPath::parse(dir_path)
        } else {
            current.join(dir_path)
        };

        let Some(entries) = self.cache.get_entries(&dir.as_key()) else {
            return Vec::new();
        };

        entries
            .into_iter()
            .filter(|entry| entry.name.starts_with(file_prefix))
            // cd only shows directories
            .filter(|entry| command != "cd" || entry.is_dir)
            .map(|entry| {
                let suffix = if entry.is_dir { "/" } else { "" };
                Pair {
                    display: format!("{}{}", entry.name, suffix),
                    replacement: format!("{}{}{}", dir_path, entry.name, suffix),
                }
            })
            .collect()
    }
}

impl Completer for ShellCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        let word_start = line.rfind(' ').map(|i| i + 1).unwrap_or(0);
        let word = &line[word_start..];

        if word_start == 0 {
            return Ok((0, self.complete_command(word)));
        }

        let command = line.split_whitespace().next().unwrap_or("");
        Ok((word_start, self.complete_path(word, command)))
    }
}

impl rustyline::Helper for ShellCompleter {}
impl rustyline::highlight::Highlighter for ShellCompleter {}
impl rustyline::hint::Hinter for ShellCompleter {
    type Hint = String;
}
impl rustyline::validate::Validator for ShellCompleter {}
