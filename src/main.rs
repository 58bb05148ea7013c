mod cli;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use maxmovies::api::RequestOptions;
use maxmovies::config::Config;
use maxmovies::dao::DownloadStatus;
use maxmovies::mapping::{download_meta_from_detail, playback_url};
use maxmovies::notify::TracingNotifier;
use maxmovies::types::{MediaSummary, SearchResult};
use maxmovies::MaxMovies;

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(l) => EnvFilter::new(l),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,maxmovies=info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn print_summaries(result: &SearchResult) {
    if result.results.is_empty() {
        println!("No results.");
        return;
    }
    for MediaSummary { id, title, kind, year, .. } in &result.results {
        let year = if year.is_empty() { String::new() } else { format!(" ({year})") };
        println!("{:<16} {:<8} {title}{year}", id.as_deref().unwrap_or("-"), kind.as_str());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.mock {
        config.mock_mode = true;
    }
    let app = MaxMovies::connect(config, Arc::new(TracingNotifier)).await?;

    match cli.command {
        Commands::Search { query, page, media_type, refresh } => {
            let opts = if refresh { RequestOptions::refresh() } else { RequestOptions::default() };
            print_summaries(&app.api().search(&query, page, &media_type, opts).await);
        }
        Commands::Trending => print_summaries(&app.trending().await),
        Commands::Info { id } => {
            let detail = app.view_detail(&id, RequestOptions::default()).await?;
            match detail.subject() {
                Some(d) => {
                    println!("{}", d.title);
                    if !d.year.is_empty() { println!("Year:    {}", d.year); }
                    if !d.rating.is_empty() { println!("Rating:  {}", d.rating); }
                    if !d.poster.is_empty() { println!("Poster:  {}", d.poster); }
                    if !d.description.is_empty() { println!("\n{}", d.description); }
                }
                None => println!("Not found: {id}"),
            }
        }
        Commands::Sources { id, ep } => {
            let sources = app
                .api()
                .get_sources(Some(&id), ep.season.as_deref(), ep.episode.as_deref(), RequestOptions::default())
                .await;
            if sources.results.is_empty() {
                println!("No sources.");
            }
            for (i, s) in sources.results.iter().enumerate() {
                println!("{:>2}. {}", i + 1, playback_url(s).unwrap_or("-"));
            }
        }
        Commands::Play { id, ep } => match app.play_url(&id, ep.season.as_deref(), ep.episode.as_deref()).await {
            Some(url) => println!("{url}"),
            None => println!("No playable source for {id}"),
        },
        Commands::Download { id, ep } => {
            let detail = app.api().get_detail(Some(&id), RequestOptions::default()).await;
            let mut meta = detail.subject().map(download_meta_from_detail).unwrap_or_default();
            meta.id = Some(id);
            match app.download_best_source(meta, ep.season.as_deref(), ep.episode.as_deref()).await? {
                Some(handle) => {
                    let done = handle.wait().await?;
                    match (done.status, done.path) {
                        (DownloadStatus::Complete, Some(path)) => println!("Saved {} to {path}", done.title),
                        (status, _) => println!("{}: {status}", done.title),
                    }
                }
                None => println!("Nothing to download."),
            }
        }
        Commands::Downloads => {
            let list = app.downloads().list_downloads().await?;
            if list.is_empty() {
                println!("No downloads.");
            }
            for d in list {
                println!("{:<16} {:<12} {:>3}%  {}", d.id, d.status.as_str(), d.progress, d.title);
            }
        }
        Commands::History { clear } => {
            if clear {
                let n = app.clear_history().await?;
                println!("Cleared {n} entries.");
            } else {
                for h in app.history().await? {
                    println!("{:<16} {}", h.id, h.title);
                }
            }
        }
    }
    Ok(())
}
