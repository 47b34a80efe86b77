use anyhow::{Context, Result};
use clap::Args;
use std::net::SocketAddr;

use crate::models::Config;
use crate::server::run_server;

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, help = "Address to bind (default: server.host)")]
    pub host: Option<String>,

    #[arg(long, short = 'p', help = "Port to listen on (default: server.port)")]
    pub port: Option<u16>,
}

pub async fn handle_serve<F>(args: ServeArgs, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let config = Config::load()?;
    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))?;

    run_server(config, addr, shutdown)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))
}
