#![doc = include_str!("../README.md")]

mod config;
mod telemetry;

use anyhow::Context;
use axum::routing::get;
use clap::Parser;
use tandem::grpc::{GrpcServer, RpcService};
use tandem::http::HttpServer;
use tandem::sql::NullDatabase;
use tandem::{CancellationToken, Host};
use tonic_health::ServingStatus;
use tracing::info;

use config::{CliArgs, ServerConfig};
use telemetry::init_telemetry;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    init_telemetry(config.log_json)?;

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        "starting"
    );

    let host = Host::new(
        GrpcServer::new(config.grpc_addr),
        HttpServer::new(config.http_addr),
        NullDatabase,
    )
    .with_grace(config.grace);

    host.db()
        .ping()
        .await
        .context("database is not reachable")?;

    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_service_status("", ServingStatus::Serving)
        .await;
    host.register(vec![RpcService::from_fn(
        "grpc.health.v1.Health",
        move |routes| routes.add_service(health_service),
    )]);

    host.handle(router());

    info!(
        grpc = %config.grpc_addr,
        http = %config.http_addr,
        "hosting servers"
    );

    host.serve(CancellationToken::new()).await?;

    info!("shut down cleanly");
    Ok(())
}

fn router() -> axum::Router {
    axum::Router::new().route("/healthz", get(healthz))
}

async fn healthz() -> &'static str {
    "ok"
}
