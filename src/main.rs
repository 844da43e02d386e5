mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::error;
use tokio::sync::mpsc;

use ginko_bootstrap::install::{InstallPhase, InstallProgress, Platform};
use ginko_bootstrap::{BootstrapConfig, LanguageServerSource, LogHost, bootstrap_with_progress};

fn main() {
    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(real_main()) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn real_main() -> Result<()> {
    let args = cli::Args::parse();

    let mut config = match &args.config {
        Some(path) => BootstrapConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let path = BootstrapConfig::default_path()
                .context("Could not determine config directory")?;
            BootstrapConfig::load_or_create(&path)
                .with_context(|| format!("Failed to load config {}", path.display()))?
        }
    };
    if let Some(root) = args.root {
        config.root = Some(root);
    }
    if args.system_path {
        config.language_server = LanguageServerSource::SystemPath;
    }
    if let Some(secs) = args.timeout_secs {
        config.download_timeout_secs = secs;
    }
    config.validate().context("Invalid configuration")?;

    let host = LogHost::new(config);
    let (tx, progress_task) = if args.quiet {
        (None, None)
    } else {
        let (tx, rx) = mpsc::channel::<InstallProgress>(64);
        (Some(tx), Some(tokio::spawn(render_progress(rx))))
    };

    let command = bootstrap_with_progress(&host, Platform::detect(), tx)
        .await
        .context("Language server bootstrap failed")?;

    if let Some(task) = progress_task {
        // Sender is dropped with the installer, so the renderer ends on its own
        let _ = task.await;
    }

    match &command.version {
        Some(version) => log::info!("ginko_ls {version} ready"),
        None => log::info!("ginko_ls ready (version unknown)"),
    }
    println!("{}", command.program.display());
    Ok(())
}

/// Draw installer progress as a download bar
async fn render_progress(mut rx: mpsc::Receiver<InstallProgress>) {
    let bar = ProgressBar::hidden();
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {bytes}/{total_bytes}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );

    while let Some(progress) = rx.recv().await {
        match progress.phase {
            InstallPhase::Downloading => {
                if bar.is_hidden() {
                    bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
                }
                if progress.total_bytes > 0 {
                    bar.set_length(progress.total_bytes);
                }
                bar.set_position(progress.bytes_downloaded);
                bar.set_message(progress.message);
            }
            InstallPhase::Extracting => bar.set_message(progress.message),
            InstallPhase::Installed => bar.finish_with_message(progress.message),
            InstallPhase::FailedRolledBack => bar.abandon_with_message(progress.message),
            _ => {}
        }
    }
}
