mod ai_client;
mod archive;
mod config;
mod cv;
mod errors;
mod models;
mod query;
mod routes;
mod state;
#[cfg(test)]
mod testing;
mod vector_db;

use anyhow::Result;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai_client::build_ai_service;
use crate::archive::S3Archive;
use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;
use crate::vector_db::{ChromaStore, VectorStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; an invalid value aborts startup
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http=info",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting {} v{}",
        config.project_name,
        env!("CARGO_PKG_VERSION")
    );

    let sdk_config = load_aws_config(&config).await;

    // AI provider (Bedrock or OpenAI)
    let ai = build_ai_service(&config, &sdk_config)?;

    // Vector store
    let vectors = Arc::new(ChromaStore::connect(&config).await?);
    info!("Vector store ready ({})", vectors.name());

    // S3 / MinIO archive
    let archive = if config.s3_archive_enabled {
        let archive = S3Archive::new(
            build_s3_client(&config, &sdk_config),
            config.s3_bucket.clone(),
            config.aws_region.clone(),
        );
        info!("S3 archive enabled (bucket: {})", config.s3_bucket);
        Some(archive)
    } else {
        info!("S3 archive disabled");
        None
    };

    let state = AppState {
        config: config.clone(),
        ai,
        vectors,
        archive,
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Shared AWS config for S3 and Bedrock. Static keys are used when both are
/// configured, otherwise the default provider chain applies.
async fn load_aws_config(config: &Config) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.aws_region.clone()));
    if let Some((access_key_id, secret_access_key)) = config.static_aws_credentials() {
        loader = loader.credentials_provider(Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "cv-assistant-static",
        ));
    }
    loader.load().await
}

/// Constructs an S3 client for AWS, or for MinIO when `S3_ENDPOINT` is set.
fn build_s3_client(config: &Config, sdk_config: &SdkConfig) -> aws_sdk_s3::Client {
    let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);
    if let Some(endpoint) = &config.s3_endpoint {
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }
    aws_sdk_s3::Client::from_conf(builder.build())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
    }
}
