use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, bail, eyre};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use imgstash::application::CacheManager;
use imgstash::domain::entities::RemoteImage;
use imgstash::domain::ports::{Clock, ImageFetcher};
use imgstash::infrastructure::config::parse_header;
use imgstash::infrastructure::{
    AppConfig, CliArgs, Command, ConfigStore, HttpImageFetcher, Platform, SystemClock,
    create_backend,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.log_file() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn create_manager(config: &AppConfig) -> Result<CacheManager> {
    let fetcher: Arc<dyn ImageFetcher> = Arc::new(HttpImageFetcher::new(&config.http)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let platform = config.cache.backend.platform(Platform::detect());
    let backend = create_backend(platform, &config.cache, fetcher, clock.clone());

    Ok(CacheManager::new(backend, clock).with_default_expires_in(config.cache.default_expires_in))
}

fn parse_headers(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|h| parse_header(h).ok_or_else(|| eyre!("invalid header {h:?}, expected `Name: value`")))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let store = ConfigStore::new()?;

    if matches!(args.command, Command::ConfigPath) {
        println!("{}", store.config_path(args.config.as_deref()).display());
        return Ok(());
    }

    let mut config = store.load_config(args.config.as_deref())?;
    config.merge_with_args(&args);

    init_logging(&config)?;

    info!(version = imgstash::VERSION, backend = %config.cache.backend, "Starting imgstash");

    let manager = create_manager(&config)?;
    manager.open().await;

    match args.command {
        Command::Resolve {
            uri,
            key,
            expires_in,
            headers,
        } => {
            let image = RemoteImage::new(uri.clone()).with_headers(parse_headers(&headers)?);
            let key = key.unwrap_or(uri);
            let handle = manager.resolve(&image, &key, expires_in).await;
            debug!(kind = %handle.kind(), "Resolved");
            println!("{}\t{}", handle.kind(), handle.uri());
        }
        Command::Get { key } => {
            let Some(handle) = manager.peek(&key).await else {
                bail!("no fresh entry for key {key:?}");
            };
            let size = handle.load_bytes().await.map_or(0, |b| b.len());
            println!("{}\t{}\t{size}", handle.kind(), handle.uri());
        }
        Command::Delete { key } => {
            manager.evict(&key).await;
            info!(key = %key, "Deleted entry");
        }
        Command::ConfigPath => {}
    }

    Ok(())
}
