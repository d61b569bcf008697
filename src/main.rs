use anyhow::Result;
use aws_config::{BehaviorVersion, Region};
use clap::{Parser, Subcommand};
use log::info;
use photo_indexer::config::AppConfig;
use photo_indexer::labels::RekognitionOracle;
use photo_indexer::search::{ensure_index_exists, SearchTransport};
use photo_indexer::search_clients::opensearch::SignedSearchClient;
use photo_indexer::storage::S3ObjectStore;
use photo_indexer::web_server::{self, AppState};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "photo-indexer", version, about = "Label-indexed photo search over S3, Rekognition and OpenSearch")]
struct Cli {
    /// Directory holding default/{RUN_MODE}/local configuration files.
    #[arg(long, default_value = "config")]
    config_dir: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Serve notification and search routes (default).
    Serve,
    /// Create the search index with its mapping if missing, then exit.
    EnsureIndex,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::new(&cli.config_dir)?;

    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting photo-indexer");

    // Credentials are resolved once here and handed to every client.
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()))
        .load()
        .await;

    let search: Arc<dyn SearchTransport> = Arc::new(SignedSearchClient::new(&config, &sdk_config)?);

    match cli.command.unwrap_or(Command::Serve) {
        Command::EnsureIndex => {
            ensure_index_exists(search.as_ref(), &config.index).await?;
        }
        Command::Serve => {
            if config.ensure_index {
                ensure_index_exists(search.as_ref(), &config.index).await?;
            }
            let store = Arc::new(S3ObjectStore::new(&sdk_config));
            let oracle = Arc::new(RekognitionOracle::new(&config, &sdk_config));
            let state = AppState::new(&config, search, store, oracle);

            web_server::start_web_server(&config, state)
                .await
                .map_err(|e| {
                    log::error!("Web server error: {}", e);
                    e
                })?;
        }
    }

    info!("photo-indexer finished");

    Ok(())
}
