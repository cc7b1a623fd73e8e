use std::sync::Arc;

use anyhow::Result;
use aws_config::{BehaviorVersion, Region};

use segmentation_relay::api::{self, AppState};
use segmentation_relay::config::Config;
use segmentation_relay::dispatch::SsmDispatcher;
use segmentation_relay::storage::S3ObjectStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with filters
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting segmentation relay...");

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        "Bucket: {} | Region: {}",
        config.storage_config.bucket,
        config.storage_config.region
    );
    tracing::info!("GPU instance: {}", config.remote_config.instance_id);
    tracing::info!("Serving frontend from {}", config.frontend_dir);
    if let Some(ref url) = config.upload_forward_url {
        tracing::info!("Upload proxy enabled, forwarding to {}", url);
    }

    // Credentials come from the standard provider chain (env, profile,
    // instance role); only the region is taken from our config.
    let aws_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.storage_config.region.clone()))
        .load()
        .await;

    let store = Arc::new(S3ObjectStore::new(
        aws_sdk_s3::Client::new(&aws_config),
        config.storage_config.bucket.clone(),
    ));
    let dispatch = Arc::new(SsmDispatcher::new(
        aws_sdk_ssm::Client::new(&aws_config),
        config.remote_config.instance_id.clone(),
    ));

    let addr = format!("{}:{}", config.api_host, config.api_port);

    let state = AppState {
        config: Arc::new(config),
        store,
        dispatch,
        http: reqwest::Client::new(),
    };
    let app = api::router(state);

    tracing::info!("HTTP API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
