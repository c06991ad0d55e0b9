use crate::config::EngineConfig;
use anyhow::Context;
use clap::{Parser, Subcommand};
use notegraph_core::{
    find_title_collisions, project_with_style, recompute_links, resolve_title, Note, Snapshot,
};
use std::path::{Path, PathBuf};

/// Inspect the link graph of a JSON dump of notes without touching a store.
#[derive(Parser, Debug)]
#[command(name = "notegraph", version, about)]
pub struct Cli {
    /// Default log filter when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn", env = "NOTEGRAPH_LOG")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Recompute links and print the graph view as JSON
    Graph {
        #[arg(long)]
        input: PathBuf,
        /// TOML engine config; only the [graph] section is used here
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print backlinks and forward links of one note
    Links {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        title: String,
    },
    /// List titles shared by more than one note
    Collisions {
        #[arg(long)]
        input: PathBuf,
    },
}

pub fn load_notes(path: &Path) -> anyhow::Result<Snapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read notes from {}", path.display()))?;
    let notes: Vec<Note> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid notes JSON in {}", path.display()))?;
    Ok(Snapshot::new(notes))
}

/// Run a command and return what should be printed.
pub fn execute(command: &Command) -> anyhow::Result<String> {
    match command {
        Command::Graph { input, config } => {
            let config = match config {
                Some(path) => EngineConfig::load(path)?,
                None => EngineConfig::default(),
            };
            let snapshot = recompute_links(&load_notes(input)?);
            let view = project_with_style(&snapshot, &config.graph);
            Ok(serde_json::to_string_pretty(&view)?)
        }
        Command::Links { input, title } => {
            let snapshot = recompute_links(&load_notes(input)?);
            format_links(&snapshot, title)
        }
        Command::Collisions { input } => {
            let snapshot = load_notes(input)?;
            Ok(format_collisions(&snapshot))
        }
    }
}

fn format_links(snapshot: &Snapshot, title: &str) -> anyhow::Result<String> {
    let note = resolve_title(title, snapshot)
        .and_then(|id| snapshot.get(id))
        .ok_or_else(|| anyhow::anyhow!("Note not found: {}", title))?;
    let linked = snapshot
        .linked_notes(&note.id)
        .ok_or_else(|| anyhow::anyhow!("Note not found: {}", title))?;

    let mut output = String::new();
    output.push_str("Backlinks (notes linking to this):\n");
    push_titles(&mut output, &linked.backlinks);
    output.push_str("\nForward links (notes this links to):\n");
    push_titles(&mut output, &linked.forward_links);
    Ok(output)
}

fn push_titles(output: &mut String, notes: &[&Note]) {
    if notes.is_empty() {
        output.push_str("- (none)\n");
        return;
    }
    for note in notes {
        output.push_str(&format!("- {}\n", note.title));
    }
}

fn format_collisions(snapshot: &Snapshot) -> String {
    let collisions = find_title_collisions(snapshot);
    if collisions.is_empty() {
        return "No title collisions\n".to_string();
    }
    let mut output = String::new();
    for collision in collisions {
        let ids: Vec<&str> = collision.ids().iter().map(|id| id.as_str()).collect();
        output.push_str(&format!(
            "{:?}: {} (references resolve to {})\n",
            collision.folded_title(),
            ids.join(", "),
            collision.winner()
        ));
    }
    output
}
