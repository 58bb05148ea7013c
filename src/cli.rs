use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Browse, stream and download from the movie catalog
#[derive(Parser)]
#[command(name = "maxmovies", version)]
#[command(about = "A movie/TV catalog client with offline fallback", long_about = None)]
pub struct Cli {
    /// Path to a maxmovies.toml config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Answer everything from the bundled mock data
    #[arg(long, global = true)]
    pub mock: bool,

    /// Log filter, e.g. `info` or `maxmovies=debug` (overrides RUST_LOG)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search the catalog
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// movie or tv
        #[arg(long = "type", default_value = "movie")]
        media_type: String,
        /// Bypass the response cache
        #[arg(long)]
        refresh: bool,
    },
    /// Show a title's details and record it in the history
    Info { id: String },
    /// List streaming sources
    Sources {
        id: String,
        #[command(flatten)]
        ep: EpisodeArgs,
    },
    /// Print the stream URL a player should open
    Play {
        id: String,
        #[command(flatten)]
        ep: EpisodeArgs,
    },
    /// Download the best source and wait for it to finish
    Download {
        id: String,
        #[command(flatten)]
        ep: EpisodeArgs,
    },
    /// List downloads, newest first
    Downloads,
    /// Recently viewed titles
    History {
        /// Forget everything instead of listing
        #[arg(long)]
        clear: bool,
    },
    /// The home view: popular action movies
    Trending,
}

#[derive(clap::Args, Debug, Default)]
pub struct EpisodeArgs {
    #[arg(long, requires = "episode")]
    pub season: Option<String>,
    #[arg(long, requires = "season")]
    pub episode: Option<String>,
}
