//! `mirror`: rebuild a vanished blog from its web archive captures.
mod config;
mod wiring;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use mirror_engine::JsonLinesSink;
use mirror_logging::{mirror_info, LogDestination};

use crate::config::{ConfigOverrides, MirrorConfig, StoreBackend};

#[derive(Parser)]
#[command(name = "mirror")]
#[command(about = "Mirror a blog from web archive snapshots")]
#[command(version)]
struct Cli {
    /// RON configuration file
    #[arg(short, long, env = "MIRROR_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the page and content stores
    #[arg(short, long, env = "MIRROR_DATA")]
    data_dir: Option<PathBuf>,

    /// Storage backend
    #[arg(long, env = "MIRROR_STORE", value_enum)]
    store: Option<StoreBackend>,

    /// Archive base URL
    #[arg(long, env = "MIRROR_ARCHIVE_URL")]
    archive_url: Option<String>,

    /// Site prefix to list pages under
    #[arg(long)]
    site: Option<String>,

    /// Pattern page URLs must match
    #[arg(long)]
    pattern: Option<String>,

    /// Pages resolved at once when dumping
    #[arg(long)]
    concurrency: Option<usize>,

    /// Also write the log to a file: `--log-file` for ./mirror.log, `--log-file=PATH` otherwise
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = mirror_logging::DEFAULT_LOG_FILE
    )]
    log_file: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve every page into the local store
    Download,

    /// Write all posts as one JSON array, oldest first
    DumpFile {
        /// Output path
        path: PathBuf,
    },

    /// Write page records for the search database as JSON lines
    DumpDb {
        /// Output path
        path: PathBuf,
    },
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            data_dir: self.data_dir.clone(),
            store: self.store,
            archive_url: self.archive_url.clone(),
            site_url: self.site.clone(),
            url_pattern: self.pattern.clone(),
            concurrency: self.concurrency,
        }
    }

    fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let destination = match &cli.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    mirror_logging::initialize(destination, cli.log_level());

    let config = MirrorConfig::load(cli.config.as_deref(), cli.overrides())?;
    let runner = wiring::build_runner(&config)?;

    let summary = match &cli.command {
        Command::Download => runner.download().await?,
        Command::DumpFile { path } => runner.dump_file(path).await?,
        Command::DumpDb { path } => runner.dump_records(&JsonLinesSink::new(path)).await?,
    };
    mirror_info!(
        "Done: {} pages, {} resolved, {} failed",
        summary.pages,
        summary.resolved,
        summary.failed
    );

    if summary.failed > 0 {
        anyhow::bail!("{} pages could not be resolved", summary.failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_become_overrides() {
        let cli = Cli::parse_from([
            "mirror",
            "--store",
            "sled",
            "--site",
            "example.org/",
            "--concurrency",
            "3",
            "dump-file",
            "posts.json",
        ]);
        let overrides = cli.overrides();
        assert_eq!(overrides.store, Some(StoreBackend::Sled));
        assert_eq!(overrides.site_url.as_deref(), Some("example.org/"));
        assert_eq!(overrides.concurrency, Some(3));
        assert!(matches!(cli.command, Command::DumpFile { ref path } if path == &PathBuf::from("posts.json")));
    }

    #[test]
    fn bare_log_file_flag_uses_default_path() {
        let cli = Cli::parse_from(["mirror", "--log-file", "download"]);
        assert_eq!(cli.log_file, Some(PathBuf::from(mirror_logging::DEFAULT_LOG_FILE)));
    }

    #[test]
    fn verbosity_raises_log_level() {
        assert_eq!(Cli::parse_from(["mirror", "download"]).log_level(), LevelFilter::Info);
        assert_eq!(Cli::parse_from(["mirror", "-vv", "download"]).log_level(), LevelFilter::Trace);
    }
}
