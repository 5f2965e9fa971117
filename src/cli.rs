use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "doc-explorer")]
#[command(about = "Drive explorer tree views over a shared document tree from saved states")]
pub struct Cli {
    /// Engine settings (JSON); defaults are used when omitted
    #[arg(long, global = true)]
    pub settings: Option<String>,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute one action against a saved state and output the result
    Execute {
        /// Path to the JSON state file
        #[arg(short, long)]
        config: String,
        /// Action to execute (e.g., "open:main:multi", "toggle:main:feeds", or JSON)
        #[arg(short = 'x', long)]
        command: String,
        /// Output file for the resulting state (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Execute a script of actions, one per line
    Script {
        /// Path to the JSON state file
        #[arg(short, long)]
        config: String,
        /// Script file (`#` comments and blank lines are skipped)
        #[arg(short, long)]
        script: String,
        /// Output file for the resulting state (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print view snapshots from a saved state
    Views {
        /// Path to the JSON state file
        #[arg(short, long)]
        config: String,
        /// Only print this view, with its visible rows
        #[arg(long)]
        view: Option<String>,
    },
    /// Write the built-in sample state
    Sample {
        /// Output file for the state (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
}
