use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug, Default)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
    pub verbose: bool,  // global --verbose
}

#[derive(Parser)]
#[command(name = "adx")]
#[command(
    about = "Walk a dated text archive, extract article records and upload them in size-bounded batches"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without uploading or checkpointing
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Log progress at info level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    pub fn context(&self) -> AppContext {
        AppContext {
            quiet: self.quiet,
            no_color: self.no_color,
            dry_run: self.dry_run,
            verbose: self.verbose,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Traverse the archive and upload every record in batches
    Run(RunArgs),

    /// Parse a single article file and print its fields
    Parse(ParseArgs),

    /// Display the archive's year/month/day structure with article counts
    Tree(TreeArgs),

    /// Initialize an archdex.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Archive root (overrides archive.base_path)
    #[arg(long)]
    pub base: Option<PathBuf>,

    /// First year to process (inclusive)
    #[arg(long)]
    pub start_year: Option<u32>,

    /// Year to stop before (exclusive)
    #[arg(long)]
    pub end_year: Option<u32>,

    /// Directory receiving batch payloads
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Directory receiving the run log
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Directory holding resume checkpoints
    #[arg(long)]
    pub checkpoint_dir: Option<PathBuf>,

    /// Stop after visiting N articles
    #[arg(long)]
    pub max_articles: Option<usize>,

    /// Continue after the last uploaded article of a previous run
    #[arg(long)]
    pub resume: bool,

    /// Articles read and parsed in parallel per step
    #[arg(long)]
    pub parse_window: Option<usize>,

    /// Additional glob patterns to ignore at the article level
    #[arg(short, long)]
    pub ignore: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Article file, inside a YYYY/MM/DD directory
    pub file: PathBuf,

    /// Print the upload document instead of a readable summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Archive root (overrides archive.base_path)
    pub base: Option<PathBuf>,

    /// First year to show (inclusive)
    #[arg(long)]
    pub start_year: Option<u32>,

    /// Year to stop before (exclusive)
    #[arg(long)]
    pub end_year: Option<u32>,

    /// Levels to show: 1 = years, 2 = months, 3 = days
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Additional glob patterns to ignore at the article level
    #[arg(short, long)]
    pub ignore: Vec<String>,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Directory the completion file is written to (required unless --stdout)
    #[arg(long, required_unless_present = "stdout")]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
