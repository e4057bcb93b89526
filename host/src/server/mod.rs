pub mod api;

use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use crate::{Cli, HostState};

/// Binds and serves the HTTP API, grounded on `raiko-host::server::serve`.
pub async fn serve(cli: &Cli, state: HostState) -> anyhow::Result<()> {
    let addr = SocketAddr::from_str(&cli.bind_address)
        .with_context(|| format!("invalid bind address: {}", cli.bind_address))?;
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);

    let router = api::create_router(cli.concurrency_limit).with_state(state);
    axum::serve(listener, router)
        .await
        .context("server stopped serving")?;
    Ok(())
}
