use clap::{ArgGroup, Parser};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

use openlist_sync::config::DEFAULT_CONFIG_PATH;
use openlist_sync::logging::init_logging;
use openlist_sync::sync::DEFAULT_WORKERS;
use openlist_sync::{Config, SyncManager, SyncMode, SyncOptions};

#[derive(Parser)]
#[command(name = "olsync")]
#[command(version)]
#[command(about = "Mirror an OpenList file tree to disk, or upload a local tree to it")]
#[command(long_about = "olsync - batch transfers against an OpenList (AList) server.

By default the remote tree at `remote_path` is listed, saved to the file list
and every file is downloaded below `local_save_dir`. Files already on disk
with the remote size are skipped when `skip_existing` is on.")]
#[command(after_help = "EXAMPLES:
    # List and download everything
    olsync

    # Only refresh the file list
    olsync --list-only

    # Download from the saved file list with 20 workers
    olsync --download-only --workers 20

    # Upload upload.local_path to upload.remote_upload_path
    olsync --upload-only --config ./site.json
")]
#[command(group(ArgGroup::new("mode").args(["list_only", "download_only", "upload_only"])))]
struct Cli {
    /// Only list the remote tree and save the file list
    #[arg(long)]
    list_only: bool,

    /// Skip listing and download from the saved file list
    #[arg(long)]
    download_only: bool,

    /// Only upload local files to the remote directory
    #[arg(long)]
    upload_only: bool,

    /// Number of concurrent transfers
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Path to the JSON config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Show a progress bar instead of periodic progress lines
    #[arg(long)]
    progress: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn mode(&self) -> SyncMode {
        if self.list_only {
            SyncMode::ListOnly
        } else if self.download_only {
            SyncMode::DownloadFromManifest
        } else if self.upload_only {
            SyncMode::UploadOnly
        } else {
            SyncMode::Download
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("{}: {:#}", "Error".red(), e);
        return ExitCode::FAILURE;
    }

    tokio::select! {
        result = run(&cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!("{:#}", e);
                eprintln!("{}: {:#}", "Fatal".red().bold(), e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted by user");
            ExitCode::SUCCESS
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    if cli.workers == 0 {
        anyhow::bail!("--workers must be at least 1");
    }

    let config = Config::load(&cli.config)?;
    let options = SyncOptions {
        workers: cli.workers,
        show_progress: cli.progress,
    };

    let manager = SyncManager::connect(config, options).await?;
    if let Some(summary) = manager.run(cli.mode()).await? {
        println!(
            "{} {}",
            if summary.failed == 0 {
                "Done:".green()
            } else {
                "Done with failures:".yellow()
            },
            summary.describe()
        );
    }
    Ok(())
}
