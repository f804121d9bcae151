use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use stock_search::application::{
    AttachmentDownloader, DownloadEvent, SearchCoordinator, SearchEvent, StockPhotoSearchManager,
    ThumbnailManager,
};
use stock_search::domain::entities::{Photo, ThumbnailReceiver};
use stock_search::domain::ports::ResourceFetcher;
use stock_search::infrastructure::{
    AppConfig, CliArgs, HttpResourceFetcher, PhotoStore, StorageManager, ThumbnailCache, providers,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

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
        tracing_subscriber::registry().with(filter).init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

/// Runs the query for `rounds` rounds, printing photos as they arrive.
/// A round ends whenever the coordinator goes idle.
async fn search(
    coordinator: &SearchCoordinator,
    rx: &mut mpsc::UnboundedReceiver<SearchEvent>,
    query: &str,
    rounds: usize,
) -> Vec<Photo> {
    let mut photos = Vec::new();
    let mut round = 0;
    coordinator.start(query);

    while let Some(event) = rx.recv().await {
        match event {
            SearchEvent::PhotosAdded(added) => {
                for photo in &added {
                    println!(
                        "{:>4}  {}  {}",
                        photos.len() + 1,
                        photo.full_image_url,
                        photo.alt_text.as_deref().unwrap_or_default()
                    );
                    photos.push(photo.clone());
                }
            }
            SearchEvent::StateChanged { busy: true } => {}
            SearchEvent::StateChanged { busy: false } => {
                round += 1;
                if round >= rounds || !coordinator.has_pending() {
                    break;
                }
                debug!(round, pending = coordinator.pending_count(), "Fetching next round");
                coordinator.run_next();
            }
        }
    }
    photos
}

async fn prefetch_thumbnails(thumbnails: &ThumbnailManager, photos: &[Photo]) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let receiver = ThumbnailReceiver::new(tx);
    let urls: Vec<&str> = photos
        .iter()
        .filter_map(|p| p.thumbnail_url.as_deref())
        .collect();
    for url in &urls {
        thumbnails.request(url, receiver.clone());
    }

    let mut loaded = 0usize;
    loop {
        tokio::select! {
            Some(event) = rx.recv() => {
                debug!(url = %event.url, width = event.thumbnail.width(), "Thumbnail ready");
                loaded += 1;
            }
            () = tokio::time::sleep(Duration::from_millis(50)) => {
                if thumbnails.in_flight_count() == 0 {
                    break;
                }
            }
        }
    }
    while rx.try_recv().is_ok() {
        loaded += 1;
    }

    println!("Loaded {loaded}/{} thumbnails. {}", urls.len(), thumbnails.cache().stats());
}

async fn download(
    fetcher: Arc<dyn ResourceFetcher>,
    config: &AppConfig,
    photo: Photo,
    favourite: bool,
) -> Result<()> {
    let attachment_dir = config
        .effective_attachment_dir()
        .ok_or_else(|| eyre!("failed to determine attachment directory"))?;
    let data_dir = AppConfig::default_data_dir()
        .ok_or_else(|| eyre!("failed to determine data directory"))?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let downloader = AttachmentDownloader::new(fetcher, attachment_dir, &tx);
    drop(tx);
    downloader.download(photo);

    while let Some(event) = rx.recv().await {
        match event {
            DownloadEvent::CurrentlyDownloadingChanged(Some(photo)) => {
                eprintln!("Downloading {}", photo.full_image_url);
            }
            DownloadEvent::CurrentlyDownloadingChanged(None) => break,
            DownloadEvent::Progress { received, total, .. } => {
                debug!(received, total, "Download progress");
            }
            DownloadEvent::Finished { photo, result } => {
                let attachment = result?;
                println!("Saved {} ({})", attachment.path().display(), attachment.kind());

                PhotoStore::recents(&data_dir).add(photo.clone());
                if favourite {
                    PhotoStore::favourites(&data_dir).add(photo);
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = stock_search::VERSION, query = %args.query, "Starting stock-search");

    let fetcher = Arc::new(HttpResourceFetcher::new(config.download.timeout_secs)?);
    let manager = Arc::new(StockPhotoSearchManager::new(
        providers::built_in(fetcher.client()),
        config.search.disabled_providers.iter().cloned().collect(),
    ));
    manager.set_ideal_total(config.search.ideal_total);

    let (search_tx, mut search_rx) = mpsc::unbounded_channel();
    let coordinator = SearchCoordinator::with_limit(
        Arc::clone(&manager),
        &search_tx,
        config.search.concurrent_limit,
    );
    let photos = search(&coordinator, &mut search_rx, &args.query, args.pages.max(1)).await;
    coordinator.reset();

    if photos.is_empty() {
        println!("No results for {:?}", args.query);
        return Ok(());
    }

    if args.thumbnails {
        let cache = Arc::new(ThumbnailCache::new(
            config.cache.max_entries,
            config.cache.max_bytes,
        ));
        let thumbnails = ThumbnailManager::new(cache, fetcher.clone());
        prefetch_thumbnails(&thumbnails, &photos).await;
    }

    if args.download {
        download(fetcher, &config, photos[0].clone(), args.favourite).await?;
    }

    Ok(())
}
