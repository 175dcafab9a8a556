use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Retrieval-augmented coding assistant.
#[derive(Parser)]
#[command(name = "atelier", version, about)]
pub struct Cli {
    /// Path to a configuration file (defaults to ./atelier.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Index a workspace for semantic search
    Index {
        /// Workspace root (defaults to the current directory)
        path: Option<PathBuf>,
    },
    /// Search the indexed workspace
    Search {
        /// Natural-language query
        query: String,
        /// Maximum results to return
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Ask a single question with retrieved context
    Chat {
        /// The question or request
        prompt: String,
        /// File to include as open-file context
        #[arg(long)]
        file: Option<PathBuf>,
        /// Skip the web-research pass even when the query would trigger it
        #[arg(long)]
        no_research: bool,
    },
    /// Run the plan, implement, review agent team on a request
    Team {
        /// The coding request
        request: String,
        /// File to include as open-file context
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Show index status
    Status,
    /// Manage remembered facts about you and your projects
    Memory {
        /// Memory operation
        #[command(subcommand)]
        action: MemoryAction,
    },
}

/// Memory subcommands.
#[derive(Subcommand)]
pub enum MemoryAction {
    /// Remember a fact
    Add {
        /// The fact to remember
        fact: String,
    },
    /// List remembered facts
    List,
    /// Forget everything
    Clear,
}
