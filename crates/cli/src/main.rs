mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use confkit_lib::hash::HashScheme;
use confkit_lib::settings::StoreKind;

use cmd::{cmd_apply, cmd_diff, cmd_hash, cmd_history, cmd_pull, cmd_serve, cmd_status, cmd_validate};
use output::OutputFormat;

/// confkit - configuration as code
#[derive(Parser)]
#[command(name = "confkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Settings file (default: <config dir>/confkit/config.toml)
  #[arg(long, global = true, value_name = "PATH")]
  config_file: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Validate a configuration file
  Validate {
    /// Configuration file (JSON with comments)
    file: PathBuf,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Print the content hash of a configuration file
  Hash {
    /// Configuration file (JSON with comments)
    file: PathBuf,

    /// Canonicalization scheme (v1 or v2)
    #[arg(long, default_value = "v1")]
    scheme: HashScheme,
  },

  /// Show what changed between a file and another file or the last pulled copy
  Diff {
    /// Configuration file (JSON with comments)
    file: PathBuf,

    /// Compare against this file instead of the local cache
    #[arg(long, value_name = "FILE")]
    against: Option<PathBuf>,

    /// Instance whose cached copy to compare against
    #[arg(long)]
    instance: Option<String>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Validate a configuration file and apply it to an instance
  Apply {
    /// Configuration file (JSON with comments)
    file: PathBuf,

    /// Target instance (default: api.instance)
    #[arg(long)]
    instance: Option<String>,

    /// Validate and diff locally without sending anything
    #[arg(long)]
    dry_run: bool,

    /// Only apply if the instance's current hash equals this one
    #[arg(long, value_name = "HASH")]
    expected_hash: Option<String>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Fetch the current configuration of an instance
  Pull {
    /// Source instance (default: api.instance)
    #[arg(long)]
    instance: Option<String>,

    /// Write to this file instead of stdout
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Overwrite the output file without asking
    #[arg(long)]
    force: bool,
  },

  /// Show the current hash and provenance of an instance
  Status {
    /// Local file to check for drift against the instance
    file: Option<PathBuf>,

    /// Instance to query (default: api.instance)
    #[arg(long)]
    instance: Option<String>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// List applied revisions of an instance
  History {
    /// Instance to query (default: api.instance)
    #[arg(long)]
    instance: Option<String>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Run the configuration service
  Serve {
    /// Listen address (default: server.addr)
    #[arg(long)]
    addr: Option<String>,

    /// Storage backend (memory or file)
    #[arg(long)]
    store: Option<StoreKind>,

    /// Directory for the file store
    #[arg(long, value_name = "DIR")]
    store_dir: Option<PathBuf>,

    /// Canonicalization scheme for stored hashes (v1 or v2)
    #[arg(long)]
    hash_scheme: Option<HashScheme>,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = match (&cli.command, cli.verbose) {
    (_, true) => "debug",
    (Commands::Serve { .. }, false) => "info",
    _ => "warn",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let config_file = cli.config_file.as_deref();

  match cli.command {
    Commands::Validate { file, output } => cmd_validate(&file, output),
    Commands::Hash { file, scheme } => cmd_hash(&file, scheme),
    Commands::Diff {
      file,
      against,
      instance,
      output,
    } => cmd_diff(&file, against.as_deref(), instance.as_deref(), config_file, output),
    Commands::Apply {
      file,
      instance,
      dry_run,
      expected_hash,
      output,
    } => cmd_apply(
      &file,
      instance.as_deref(),
      dry_run,
      expected_hash.as_deref(),
      config_file,
      output,
    ),
    Commands::Pull {
      instance,
      output,
      force,
    } => cmd_pull(instance.as_deref(), output.as_deref(), force, config_file),
    Commands::Status { file, instance, output } => {
      cmd_status(file.as_deref(), instance.as_deref(), config_file, cli.verbose, output)
    }
    Commands::History { instance, output } => cmd_history(instance.as_deref(), config_file, output),
    Commands::Serve {
      addr,
      store,
      store_dir,
      hash_scheme,
    } => cmd_serve(addr, store, store_dir, hash_scheme, config_file),
  }
}
