#![warn(missing_docs)]

//! `quota-service` binary: loads configuration and serves the `Allow` RPC.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tonic::transport::Server;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use quota_service::bucket::LocalBucketFactory;
use quota_service::cli::{Cli, Command};
use quota_service::config::FileConfig;
use quota_service::container::BucketContainer;
use quota_service::service::QuotaService;
use quota_service::transport::pb::quota_service_server::QuotaServiceServer;
use quota_service::transport::QuotaGrpc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let Command::Serve { config } = cli.command;

    tracing::info!(path = %config.display(), "loading configuration");
    let file_config = FileConfig::from_file(&config)?;

    let factory = Arc::new(LocalBucketFactory::new());
    let container = BucketContainer::new(file_config.service.clone(), factory).await?;
    let default_max_wait = Duration::from_millis(file_config.service.default_max_wait_millis);
    let facade = QuotaService::new(container, default_max_wait);

    tracing::info!(addr = %file_config.bind_addr, "quota service starting");

    Server::builder()
        .add_service(QuotaServiceServer::new(QuotaGrpc::new(facade)))
        .serve(file_config.bind_addr)
        .await?;

    Ok(())
}
