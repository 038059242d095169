use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Editor};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use edudav::backend::{HttpBackend, HttpBlobStore};
use edudav::config::Config;
use edudav::fs::{MountTable, RequestContext};
use edudav::session::SessionProvider;
use edudav::shell;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    // RUST_LOG wins over the configured level; logs stay off stdout
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!(
        base_url = %config.base_url,
        environment = %config.environment,
        "starting edudav"
    );

    let backend = Arc::new(HttpBackend::new(&config.base_url, config.request_timeout())?);
    let blobs = Arc::new(HttpBlobStore::new(config.request_timeout())?);
    let sessions = SessionProvider::new(backend.clone(), config.session_cache_size);

    // Print welcome message
    println!("{}", "=".repeat(60).cyan());
    println!("{}", "  edudav - cloud-education files as a filesystem".bold().cyan());
    println!("{}", format!("  {}", config.base_url).cyan());
    println!("{}", "=".repeat(60).cyan());
    println!();

    let (username, password) = credentials(&config)?;
    let session = match sessions.login(&username, &password).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{} Login failed: {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    println!("Logged in as {}", session.display_name.bold());
    println!("Type 'help' for available commands or 'exit' to quit");
    println!();

    let table = Arc::new(MountTable::standard(
        backend,
        blobs,
        config.metadata_ttl(),
    ));
    let mut state = shell::ShellState::new(table, RequestContext::new(session));

    let completer = shell::ShellCompleter::new(state.completion_cache().clone());
    let mut rl = Editor::new()?;
    rl.set_helper(Some(completer));

    let history = dirs::home_dir().map(|home| home.join(".edudav_history"));
    if let Some(path) = &history {
        let _ = rl.load_history(path);
    }

    repl(&mut state, &mut rl).await;

    if let Some(path) = &history {
        let _ = rl.save_history(path);
    }
    println!("Goodbye!");
    Ok(())
}

/// Read and run commands until `exit`, Ctrl-D or a terminal error
async fn repl<H: rustyline::Helper>(
    state: &mut shell::ShellState,
    rl: &mut Editor<H, rustyline::history::DefaultHistory>,
) {
    loop {
        let line = match rl.readline(&state.prompt()) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("exit");
                return;
            }
            Err(err) => {
                eprintln!("{} {:?}", "Error:".red().bold(), err);
                return;
            }
        };
        let _ = rl.add_history_entry(line.as_str());

        if let Err(e) = state.execute(&line).await {
            if e.to_string() == "exit" {
                return;
            }
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
    }
}

/// Username and password from the config, prompting for what is missing
fn credentials(config: &Config) -> Result<(String, String)> {
    let mut prompt = DefaultEditor::new()?;
    let username = match &config.username {
        Some(u) => u.clone(),
        None => prompt.readline("username: ").context("reading username")?,
    };
    let password = match &config.password {
        Some(p) => p.clone(),
        None => prompt.readline("password: ").context("reading password")?,
    };
    if username.trim().is_empty() {
        return Err(anyhow!("a username is required (--username or EDUDAV_USERNAME)"));
    }
    Ok((username.trim().to_string(), password))
}
