use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use milkbook_core::{AlcoholTest, Collector};

#[derive(Parser)]
#[command(name = "milkbook")]
#[command(about = "Record milk collections offline and sync them to the sheet")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Spreadsheet web app URL (overrides env and config file)
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Treat the network as unavailable
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a new collection
    #[command(alias = "new")]
    Add(AddArgs),
    /// Change an existing collection
    Edit {
        /// Collection BUID
        id: String,
        #[command(flatten)]
        changes: CollectionArgs,
    },
    /// Subtract a quantity from an open batch
    Deduct {
        /// Batch to deduct from
        batch: String,
        /// Liters to subtract
        quantity: f64,
        /// Why the milk was removed
        #[arg(short, long)]
        reason: String,
    },
    /// Mark a batch as dispatched
    Dispatch {
        /// Batch to dispatch
        batch: String,
    },
    /// List collections, newest first
    List {
        /// Only show this batch
        #[arg(long)]
        batch: Option<String>,
        /// Number of collections to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show net liters per batch
    Batches {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show operations waiting to be synced
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show sync state and queue size
    Status,
    /// Push pending operations and pull the sheet
    Sync,
    /// Reload local data and pull when nothing is pending
    Refresh,
    /// Keep running, syncing whenever the endpoint becomes reachable
    Watch {
        /// Seconds between connectivity probes
        #[arg(long, default_value = "30", value_name = "SECS")]
        interval: u64,
    },
    /// Manage the CLI config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Clone, Debug)]
pub struct AddArgs {
    /// Liters collected
    pub quantity: f64,
    /// Batch the milk goes into, e.g. M-010124
    #[arg(short, long)]
    pub batch: String,
    /// Collector name
    #[arg(short, long, default_value = "Raju")]
    pub collector: Collector,
    /// Arrival time as HH:MM today (default: now)
    #[arg(short, long, value_name = "HH:MM")]
    pub arrival: Option<String>,
    #[command(flatten)]
    pub quality: QualityArgs,
}

/// Fields an edit may change; omitted ones keep their value
#[derive(Args, Clone, Debug, Default)]
pub struct CollectionArgs {
    /// Liters collected
    #[arg(short, long)]
    pub quantity: Option<f64>,
    /// Batch the milk goes into
    #[arg(short, long)]
    pub batch: Option<String>,
    /// Collector name
    #[arg(short, long)]
    pub collector: Option<Collector>,
    /// Arrival time as HH:MM today
    #[arg(short, long, value_name = "HH:MM")]
    pub arrival: Option<String>,
    #[command(flatten)]
    pub quality: QualityArgs,
}

/// Quality readings; a negative value clears the reading
#[derive(Args, Clone, Debug, Default)]
pub struct QualityArgs {
    #[arg(long)]
    pub clr: Option<f64>,
    #[arg(long)]
    pub fat: Option<f64>,
    #[arg(long)]
    pub snf: Option<f64>,
    /// Added water, percent
    #[arg(long)]
    pub water: Option<f64>,
    /// Methylene blue reduction time, hours
    #[arg(long)]
    pub mbrt: Option<f64>,
    /// Alcohol test: +ve, -ve or NA
    #[arg(long, allow_hyphen_values = true)]
    pub alcohol: Option<AlcoholTest>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the config file
    Init {
        /// Spreadsheet web app URL
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,
        /// Seconds before a push or pull gives up
        #[arg(long, value_name = "SECS")]
        request_timeout_secs: Option<u64>,
        /// Default local database path
        #[arg(long = "store-path", value_name = "PATH")]
        store_path: Option<PathBuf>,
    },
    /// Print the effective configuration
    Show,
}
