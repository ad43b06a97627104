use anyhow::{Context, Result};
use clap::Parser;
use repofinder::cli::CliArgs;
use repofinder::config::Config;
use repofinder::report::format_results;
use repofinder::services::Resolver;
use repofinder_core::domain::RefList;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let config = Config::from_cli_and_file(&cli_args)?;

    // RUST_LOG wins over -v, which wins over the config file
    let default_filter = if cli_args.verbose {
        "debug".to_string()
    } else {
        config.log_filter.clone().unwrap_or_else(|| "warn".to_string())
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&default_filter))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let refs = RefList::parse(&cli_args.refs)?;
    let resolver = Resolver::from_config(&config)?;

    let cancel = CancellationToken::new();
    let watchdog = tokio::spawn(cancel_on_interrupt(cancel.clone(), cli_args.timeout));

    info!("Looking up {} refs", refs.len());
    let outcome = resolver.find_remotes(&refs, &cancel).await;
    watchdog.abort();

    let results = outcome?;
    print!("{}", format_results(&results));
    Ok(())
}

/// Fire `cancel` on Ctrl-C or once `timeout` seconds have passed.
async fn cancel_on_interrupt(cancel: CancellationToken, timeout: Option<u64>) {
    let deadline = async {
        match timeout {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };

    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            // Only the deadline can cancel now.
            debug!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = interrupted => info!("Interrupted, cancelling"),
        _ = deadline => info!("Timed out, cancelling"),
    }

    cancel.cancel();
}
