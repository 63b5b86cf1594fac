use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use media_collector::cli::Args;
use media_collector::{commands, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose, args.quiet)?;

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping");
            signal_token.cancel();
        }
    });

    if let Err(e) = commands::run(args, token).await {
        error!("{e}");
        std::process::exit(1);
    }
    Ok(())
}
