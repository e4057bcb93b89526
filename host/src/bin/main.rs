use anyhow::Result;
use clap::Parser;
use texcompile_host::{logging, Cli, HostState};
use tracing::info;

const MAX_LOG_DAYS: usize = 7;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let mut cli = Cli::parse();
    cli.merge_from_file()?;

    let _guard = logging::subscribe_log(&cli.log_level, &cli.log_path, MAX_LOG_DAYS);
    info!("starting with config: {:?}", cli);

    let state = HostState::init(&cli).await?;
    texcompile_host::server::serve(&cli, state).await
}
