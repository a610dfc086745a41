//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// reaccess - reciprocity ranking and slot selection
#[derive(Parser)]
#[command(name = "reaccess")]
#[command(version)]
#[command(about = "Reciprocity ranking and slot selection for affiliated sites", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show the sites a slot would render
    Select {
        /// Slot number (clamped to 1..=10)
        slot: i64,

        /// Select from RSS slots instead of link slots
        #[arg(long)]
        rss: bool,

        /// Override the slot's display limit
        #[arg(long)]
        limit: Option<u8>,

        /// Override the slot's order mode
        /// (alphabetical, newest, oldest, random, priority_weighted)
        #[arg(long)]
        order: Option<String>,

        /// Render exactly this site instead of the slot's members
        #[arg(long)]
        site_id: Option<i64>,
    },

    /// Compute return-need priorities for the given sites
    Priorities {
        /// Aggregation period in days
        #[arg(long)]
        period: Option<u32>,

        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Show the network ranking by inbound traffic
    Ranking {
        /// Aggregation period in days
        #[arg(long)]
        period: Option<u32>,

        /// Number of entries (1..=100)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Record one inbound or outbound visit for a site
    Record {
        /// in | out
        metric: String,

        /// Site to credit
        #[arg(long, required_unless_present = "url", conflicts_with = "url")]
        site_id: Option<i64>,

        /// Referrer (in) or target (out) URL, matched to a registered site
        #[arg(long)]
        url: Option<String>,

        /// Day to record on (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Assign slots to a site, releasing them from any other holder
    Assign {
        site_id: i64,

        /// Link slots, comma separated (e.g. "1,3")
        #[arg(long, default_value = "")]
        link: String,

        /// RSS slots, comma separated
        #[arg(long, default_value = "")]
        rss: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate a sample configuration file
    Generate {
        /// Output path (default: config.toml)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
