mod script;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use buletin_post_core::PluginRegistry;
use buletin_post_editor::{PostEditorSession, SessionConfig};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::script::{StoryRunner, default_script, parse_script};

/// Replay an editing story against a headless post editor.
#[derive(Parser, Debug)]
#[command(name = "buletin-story", about, long_about = None)]
struct Cli {
    /// Session configuration (JSON)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Steps to replay (JSON array); a built-in story runs when omitted
    #[arg(short = 's', long = "script", value_name = "FILE")]
    script: Option<PathBuf>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,

    /// List the editor's commands and exit
    #[arg(long = "list-commands")]
    list_commands: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.list_commands {
        return list_commands(cli.json);
    }

    let config = match &cli.config {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::default(),
    };
    let steps = match &cli.script {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read script {}", path.display()))?;
            parse_script(&raw)?
        }
        None => default_script(),
    };

    let mut runner = StoryRunner::new(PostEditorSession::new(config));
    runner.run(&steps)?;
    tracing::debug!(active = %runner.session().active_formats(), "story finished");
    let report = runner.finish();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("slug:    {}", report.slug);
    println!("preview: {}", report.url_preview);
    println!("html:    {}", report.html);
    for snapshot in &report.autosaves {
        println!("autosave: {} ({})", snapshot.title, snapshot.post_type);
    }
    for payload in &report.submissions {
        println!("{}", serde_json::to_string(payload)?);
    }
    Ok(())
}

fn list_commands(json: bool) -> Result<()> {
    let catalog = PluginRegistry::post().command_catalog();
    if json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    for command in &catalog {
        println!("{:<26} {}", command.id, command.label);
        if let Some(description) = &command.description {
            println!("{:<26} {}", "", description);
        }
        if let Some(args) = &command.args_example {
            println!("{:<26} args: {}", "", args);
        }
    }
    Ok(())
}
