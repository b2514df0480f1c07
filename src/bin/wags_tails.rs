use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use wags_tails::config::{FetchOptions, SourceConfig};
use wags_tails::domain::{KnownSource, Version};
use wags_tails::error::WagsError;
use wags_tails::output::{FetchResult, HumanOutput, JsonOutput, OutputMode, VersionsResult};
use wags_tails::providers::SourceHandle;

#[derive(Parser)]
#[command(name = "wags-tails")]
#[command(about = "Fetch and cache versioned snapshots of external datasets")]
#[command(version, author)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Hide download progress
    #[arg(long, global = true)]
    silent: bool,

    /// Cache root to use instead of the resolved data directory; each source
    /// keeps its files in a subdirectory named after it
    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Get the latest version of a source")]
    Latest(LatestArgs),
    #[command(about = "Get a specific version of a source")]
    Get(GetArgs),
    #[command(about = "List remote versions, newest first")]
    Versions(VersionsArgs),
}

#[derive(Args, Clone, Copy)]
struct FetchFlags {
    /// Only use data already cached locally
    #[arg(long, conflicts_with = "force_refresh")]
    from_local: bool,

    /// Download again even if the version is cached
    #[arg(long)]
    force_refresh: bool,
}

impl From<FetchFlags> for FetchOptions {
    fn from(flags: FetchFlags) -> Self {
        FetchOptions {
            from_local: flags.from_local,
            force_refresh: flags.force_refresh,
        }
    }
}

#[derive(Args)]
struct LatestArgs {
    source: KnownSource,

    #[command(flatten)]
    flags: FetchFlags,
}

#[derive(Args)]
struct GetArgs {
    source: KnownSource,

    version: String,

    #[command(flatten)]
    flags: FetchFlags,
}

#[derive(Args)]
struct VersionsArgs {
    source: KnownSource,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<WagsError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &WagsError) -> u8 {
    match error {
        WagsError::NotFound(_) => 2,
        error if error.is_remote() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    let config = SourceConfig {
        data_dir: None,
        silent: cli.silent || cli.json,
    };

    match cli.command {
        Commands::Latest(args) => {
            let handle = open(args.source, config, cli.data_dir.as_deref())?;
            let path = handle.get_latest(args.flags.into())?;
            let result = FetchResult {
                source: handle.name().clone(),
                requested: None,
                path,
            };
            print_fetch(&result, output_mode)
        }
        Commands::Get(args) => {
            let version: Version = args.version.parse()?;
            let handle = open(args.source, config, cli.data_dir.as_deref())?;
            let path = handle.get_specific(&version, args.flags.into())?;
            let result = FetchResult {
                source: handle.name().clone(),
                requested: Some(version),
                path,
            };
            print_fetch(&result, output_mode)
        }
        Commands::Versions(args) => {
            let handle = open(args.source, config, cli.data_dir.as_deref())?;
            let result = VersionsResult {
                source: handle.name().clone(),
                versions: handle.versions()?,
            };
            match output_mode {
                OutputMode::Json => JsonOutput::print_versions(&result).into_diagnostic(),
                OutputMode::Human => HumanOutput::print_versions(&result).into_diagnostic(),
            }
        }
    }
}

fn open(
    source: KnownSource,
    mut config: SourceConfig,
    data_dir: Option<&str>,
) -> miette::Result<SourceHandle> {
    if let Some(root) = data_dir {
        config = config.with_data_dir(source_dir(root, source));
    }
    tracing::debug!(%source, "opening source");
    Ok(SourceHandle::open(source, config)?)
}

fn source_dir(root: &str, source: KnownSource) -> Utf8PathBuf {
    Utf8PathBuf::from(root).join(source.to_string())
}

fn print_fetch(result: &FetchResult, output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::Json => JsonOutput::print_fetch(result).into_diagnostic(),
        OutputMode::Human => HumanOutput::print_fetch(result).into_diagnostic(),
    }
}
