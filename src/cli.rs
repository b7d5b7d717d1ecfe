//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

/// Distill - executable specs from decision-forcing conversations
#[derive(Debug, Parser)]
#[command(
    name = "distill",
    about = "Turn a fuzzy feature idea into an executable spec through a decision-forcing conversation",
    version
)]
pub struct Cli {
    /// Repository to analyze: a local path or a git URL
    #[arg(short, long, help = "Repository path or git URL")]
    pub repo: String,

    /// The feature request to distill
    #[arg(value_name = "FEATURE")]
    pub feature: String,

    /// Where to write the spec document (default: SPEC.md in the repo)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Run with scripted answers instead of interactive input
    #[arg(long)]
    pub demo: bool,

    /// Headless mode: print events to stdout, read input from stdin
    #[arg(long)]
    pub plain: bool,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Agent CLI binary to invoke
    #[arg(long, value_name = "PATH")]
    pub agent_bin: Option<PathBuf>,

    /// Agent-turn budget for the engineering conversation
    #[arg(long)]
    pub max_turns: Option<u32>,
}
