use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "tribe")]
#[command(about = "Shared lists, sync state and weighted menus from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create, show and delete lists
    List {
        #[command(subcommand)]
        command: ListCommands,
    },
    /// Add and manage list items
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },
    /// Drive a list's sync state
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Inspect and resolve sync conflicts
    Conflict {
        #[command(subcommand)]
        command: ConflictCommands,
    },
    /// Draw a weighted menu from one or more lists
    Menu {
        /// List IDs or unique ID prefixes
        #[arg(required = true)]
        lists: Vec<String>,
        /// Number of items to draw
        #[arg(short = 'n', long, default_value = "3")]
        count: usize,
        /// Item IDs that must not be drawn
        #[arg(long, value_name = "ITEM")]
        exclude: Vec<String>,
        /// Only items within a radius: LAT,LNG,KM
        #[arg(long, value_name = "LAT,LNG,KM")]
        near: Option<String>,
        /// Only items whose name contains this text
        #[arg(long, value_name = "TEXT")]
        name: Option<String>,
        /// Seed for a reproducible draw
        #[arg(long)]
        seed: Option<u64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the config file
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

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ListCommands {
    /// Create a new list
    #[command(alias = "add")]
    New {
        /// List name
        name: Vec<String>,
        /// general, location, activity, interest or external-map
        #[arg(long = "type", value_name = "TYPE", default_value = "general")]
        list_type: String,
        /// private, shared or public
        #[arg(long, default_value = "private")]
        visibility: String,
        /// Weight of items without their own weight
        #[arg(long, default_value = "1.0")]
        weight: f64,
        /// Cap on items drawn from this list per menu
        #[arg(long)]
        max_items: Option<u32>,
        /// Days an item stays out of menus after being drawn
        #[arg(long)]
        cooldown_days: Option<u32>,
    },
    /// List all lists
    #[command(alias = "ls")]
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a list
    Delete {
        /// List ID or unique ID prefix
        list: String,
    },
}

#[derive(Subcommand)]
pub enum ItemCommands {
    /// Add an item to a list
    Add {
        /// List ID or unique ID prefix
        list: String,
        /// Item name
        name: Vec<String>,
        /// Selection weight (defaults to the list weight)
        #[arg(long)]
        weight: Option<f64>,
        /// Overrides the list cooldown
        #[arg(long)]
        cooldown_days: Option<u32>,
        /// First day of the season (YYYY-MM-DD)
        #[arg(long, value_name = "DATE", requires = "season_end")]
        season_start: Option<String>,
        /// Last day of the season (YYYY-MM-DD)
        #[arg(long, value_name = "DATE", requires = "season_start")]
        season_end: Option<String>,
        /// Location as LAT,LNG
        #[arg(long, value_name = "LAT,LNG", requires = "address")]
        at: Option<String>,
        /// Street address for the location
        #[arg(long, requires = "at")]
        address: Option<String>,
        /// Add the item as unavailable
        #[arg(long)]
        unavailable: bool,
    },
    /// List the items of a list
    #[command(alias = "ls")]
    Show {
        /// List ID or unique ID prefix
        list: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record that an item was used
    Use {
        /// Item ID or unique ID prefix
        item: String,
    },
    /// Make an item available for menus
    Enable {
        /// Item ID or unique ID prefix
        item: String,
    },
    /// Keep an item out of menus
    Disable {
        /// Item ID or unique ID prefix
        item: String,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Tie a list to an external source
    Configure {
        /// List ID or unique ID prefix
        list: String,
        /// external_map, manual or imported
        #[arg(long)]
        source: String,
        /// Identifier of the list in the source
        #[arg(long, default_value = "")]
        external_id: String,
    },
    /// Apply a named sync action
    Apply {
        /// List ID or unique ID prefix
        list: String,
        /// Action name, e.g. sync_complete or local_change
        action: String,
    },
    /// Check whether a transition is legal
    Check {
        from: String,
        to: String,
        action: String,
    },
    /// Show a list's sync fields
    Status {
        /// List ID or unique ID prefix
        list: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch the external copy and record divergences
    Pull {
        /// List ID or unique ID prefix
        list: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send local items to the external source
    Push {
        /// List ID or unique ID prefix
        list: String,
    },
}

#[derive(Subcommand)]
pub enum ConflictCommands {
    /// List a list's conflicts in creation order
    #[command(alias = "ls")]
    Show {
        /// List ID or unique ID prefix
        list: String,
        /// Only unresolved conflicts
        #[arg(long)]
        open: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a conflict by hand
    Add {
        /// List ID or unique ID prefix
        list: String,
        /// Conflict type, e.g. modified
        conflict_type: String,
        /// Local data as JSON
        #[arg(long, value_name = "JSON")]
        local: String,
        /// Remote data as JSON
        #[arg(long, value_name = "JSON")]
        remote: String,
        /// Item the conflict is about
        #[arg(long)]
        item: Option<String>,
    },
    /// Resolve a conflict
    Resolve {
        /// Conflict ID
        conflict: String,
        /// How the conflict was settled
        resolution: Vec<String>,
        /// Go straight to synced once no conflicts remain
        #[arg(long)]
        auto: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a config file, keeping existing values unless overridden
    Init {
        /// Database file
        #[arg(long, value_name = "PATH")]
        database_path: Option<PathBuf>,
        /// Directory of the JSON file sync adapter
        #[arg(long, value_name = "PATH")]
        import_dir: Option<PathBuf>,
        /// Per-operation timeout in milliseconds (0 disables)
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
        /// Compare-and-swap attempts for sync transitions
        #[arg(long, value_name = "N")]
        retry_limit: Option<u32>,
    },
    /// Print the effective config
    Show,
}
