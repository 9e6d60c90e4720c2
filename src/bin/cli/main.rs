//! CLI tool for batch-driven zip archive creation.

mod commands;
mod exit_codes;
mod output;
mod progress;

use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::path::PathBuf;
use std::time::Duration;

use exit_codes::ExitCode;

/// Batch-driven zip archive tool
#[derive(Parser)]
#[command(name = "zipbatch")]
#[command(author, version, about = "Batch-driven zip archive tool", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Suppress progress output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Archive files in batches and publish the result (alias: z)
    #[command(alias = "z")]
    Zip {
        /// Files and directories to archive (directories are walked recursively)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Files per batch (0 = everything in one batch)
        #[arg(short = 'b', long, default_value = "20")]
        batch_size: u64,

        /// Directory for the in-progress archive
        #[arg(long, env = "ZIPBATCH_SCRATCH_DIR")]
        scratch_dir: Option<PathBuf>,

        /// Directory the finished archive is published to
        #[arg(short = 'o', long, env = "ZIPBATCH_PUBLIC_DIR")]
        public_dir: PathBuf,

        /// Public URL prefix of the publish directory
        #[arg(long, env = "ZIPBATCH_BASE_URL")]
        base_url: Option<String>,

        /// Artifact name prefix
        #[arg(long, default_value = zipbatch::options::DEFAULT_NAME_PREFIX)]
        prefix: String,

        /// Keep the scratch archive after publishing
        #[arg(long)]
        keep_scratch: bool,

        /// What to do with files whose name is already in the archive
        #[arg(long, value_enum, default_value = "rename")]
        on_duplicate: DuplicateMode,

        /// Store files without compression
        #[arg(long)]
        store: bool,
    },

    /// Import a remote file into the publish directory
    Fetch {
        /// URL of the file
        url: String,

        /// Directory the file is stored in
        #[arg(short = 'o', long, env = "ZIPBATCH_PUBLIC_DIR")]
        public_dir: PathBuf,

        /// Public URL prefix of the publish directory
        #[arg(long, env = "ZIPBATCH_BASE_URL")]
        base_url: Option<String>,
    },

    /// Remove temporary archives older than the maximum age
    Expire {
        /// Directory to clean up
        #[arg(short = 'o', long, env = "ZIPBATCH_PUBLIC_DIR")]
        public_dir: PathBuf,

        /// Maximum age in seconds
        #[arg(long, default_value_t = zipbatch::storage::DEFAULT_TEMPORARY_MAX_AGE.as_secs())]
        max_age_secs: u64,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum DuplicateMode {
    Rename,
    Skip,
}

impl From<DuplicateMode> for zipbatch::DuplicatePolicy {
    fn from(mode: DuplicateMode) -> Self {
        match mode {
            DuplicateMode::Rename => zipbatch::DuplicatePolicy::Rename,
            DuplicateMode::Skip => zipbatch::DuplicatePolicy::Skip,
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn main() {
    // Set up Ctrl+C handler
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted");
        std::process::exit(exit_codes::USER_INTERRUPT);
    })
    .ok();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let exit_code = match cli.command {
        Commands::Zip {
            inputs,
            batch_size,
            scratch_dir,
            public_dir,
            base_url,
            prefix,
            keep_scratch,
            on_duplicate,
            store,
        } => commands::zip(&commands::ZipConfig {
            inputs: &inputs,
            batch_size,
            scratch_dir: scratch_dir.as_deref(),
            public_dir: &public_dir,
            base_url,
            name_prefix: prefix,
            keep_scratch,
            duplicates: on_duplicate,
            store_only: store,
            format: cli.format,
            quiet: cli.quiet,
        }),

        Commands::Fetch {
            url,
            public_dir,
            base_url,
        } => commands::fetch(&url, &public_dir, base_url, cli.format),

        Commands::Expire {
            public_dir,
            max_age_secs,
        } => commands::expire(&public_dir, Duration::from_secs(max_age_secs), cli.format),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}
