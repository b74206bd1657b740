//! Environment-driven configuration.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

/// Command-line and environment configuration for the tandem server.
#[derive(Debug, Clone, Parser)]
#[command(name = "tandem-server", version, about)]
pub struct CliArgs {
    /// Address the gRPC server listens on.
    #[arg(long, env = "TANDEM_GRPC_ADDR", default_value = "127.0.0.1:4201")]
    pub grpc_addr: String,

    /// Address the HTTP server listens on.
    #[arg(long, env = "TANDEM_HTTP_ADDR", default_value = "127.0.0.1:8080")]
    pub http_addr: String,

    /// Milliseconds to linger after shutdown so buffered logs can
    /// flush.
    #[arg(long, env = "TANDEM_SHUTDOWN_GRACE_MS", default_value_t = 1000)]
    pub shutdown_grace_ms: u64,

    /// Emit logs as JSON instead of human-readable text.
    #[arg(long, env = "TANDEM_LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub grpc_addr: SocketAddr,
    pub http_addr: SocketAddr,
    pub grace: Duration,
    pub log_json: bool,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let grpc_addr: SocketAddr = args
            .grpc_addr
            .parse()
            .with_context(|| format!("invalid gRPC listen address {:?}", args.grpc_addr))?;
        let http_addr: SocketAddr = args
            .http_addr
            .parse()
            .with_context(|| format!("invalid HTTP listen address {:?}", args.http_addr))?;
        if grpc_addr == http_addr {
            anyhow::bail!("gRPC and HTTP servers cannot share the listen address {grpc_addr}");
        }

        Ok(Self {
            grpc_addr,
            http_addr,
            grace: Duration::from_millis(args.shutdown_grace_ms),
            log_json: args.log_json,
        })
    }
}
