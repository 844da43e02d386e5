use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Install or update the ginko language server and print its path")]
pub struct Args {
    /// Path to configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Extension-private root holding the server/ tree
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Use the ginko_ls found on the search path instead of the managed copy
    #[arg(long)]
    pub system_path: bool,

    /// Download timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Don't draw a progress bar
    #[arg(long)]
    pub quiet: bool,
}
