use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

use video_detector::config::LoggingConfig;
use video_detector::storage::DocumentStore;
use video_detector::{
    ApiServer, AppState, Config, DetectionPipeline, MemoryStore, MongoStore, VideoResolver,
    YoloModel,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Video Detector")
        .version(env!("CARGO_PKG_VERSION"))
        .author("TigreRoll")
        .about("Background object detection for uploaded videos")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (TOML)"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Interface to bind"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .value_parser(clap::value_parser!(u16))
                .help("Port to listen on"),
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .value_name("FILE")
                .help("ONNX detection model"),
        )
        .arg(
            Arg::new("memory-store")
                .long("memory-store")
                .help("Keep results in process memory instead of MongoDB")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");

    // Pick up MONGODB_URI and friends from a local .env
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    // Initialize logging with the default level so config loading is visible
    let bootstrap = LoggingConfig::default().directives(verbose);
    let (filter, filter_handle) = reload::Layer::new(env_filter(&bootstrap));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    if dotenv_loaded {
        info!("Loaded environment from .env");
    }

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(&PathBuf::from(path))?,
        None => Config::load()?,
    };

    if let Some(host) = matches.get_one::<String>("host") {
        config.server.host = host.clone();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }
    if let Some(model) = matches.get_one::<String>("model") {
        config.model.model_path = PathBuf::from(model);
    }
    if matches.get_flag("memory-store") {
        config.storage.in_memory = true;
    }

    // Switch to the configured level now that it is known
    filter_handle.reload(env_filter(&config.logging.directives(verbose)))?;

    config.validate()?;
    info!("🚀 Video Detector starting...");
    info!("{}", config.summary());

    let store: Arc<dyn DocumentStore> = if config.storage.in_memory {
        warn!("Using in-memory store, results are lost on shutdown");
        Arc::new(MemoryStore::new())
    } else {
        let store = MongoStore::connect(&config.storage)
            .await
            .context("Failed to configure MongoDB client")?;
        store.ping().await;
        Arc::new(store)
    };

    let model_config = config.model.clone();
    let model = tokio::task::spawn_blocking(move || YoloModel::load(&model_config))
        .await?
        .context("Failed to load detection model")?;

    let resolver = VideoResolver::new(Duration::from_secs(config.download.timeout_seconds))?;
    let pipeline = Arc::new(DetectionPipeline::new(
        resolver,
        Arc::new(model),
        store,
        config.scratch.root_dir.clone(),
    ));

    let server = ApiServer::new(
        AppState::new(pipeline),
        config.server.host.clone(),
        config.server.port,
    );
    server.start().await
}

/// `RUST_LOG` wins over the configured directives
fn env_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
}
