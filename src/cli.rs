use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::config::defaults;

#[derive(Parser)]
#[command(name = "tgdrop")]
#[command(author, version, about = "Telegram bot that downloads forwarded media into a categorized tree", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (default)
    Run,

    /// Print the directory a file name would be routed to
    Route {
        /// File name to route
        filename: String,

        /// Explicit folder override
        #[arg(long)]
        folder: Option<PathBuf>,

        #[command(flatten)]
        paths: PathArgs,
    },

    /// Create the download directory tree and exit
    Init {
        #[command(flatten)]
        paths: PathArgs,
    },
}

/// Download and torrent roots, defaulting to the bot's environment
#[derive(Args, Debug, Clone)]
pub struct PathArgs {
    /// Download root
    #[arg(long, env = "TG_DOWNLOAD_PATH", default_value = defaults::DOWNLOAD_ROOT)]
    pub download_path: PathBuf,

    /// Torrent watch root
    #[arg(long, env = "TG_DOWNLOAD_PATH_TORRENTS", default_value = defaults::TORRENT_ROOT)]
    pub torrent_path: PathBuf,
}

impl Cli {
    /// Loads `.env` if present, then parses the command line.
    ///
    /// The env file goes first so the `TG_DOWNLOAD_PATH*` fallbacks see it.
    pub fn parse_args() -> Self {
        let _ = dotenvy::dotenv();
        Self::parse()
    }
}
