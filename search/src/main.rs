//! Search box on a terminal.
//!
//! Every line read from stdin is one edit of the query text. The current
//! request state is printed to stdout whenever it changes; logs go to stderr.
//!
//! ```text
//! $ printf 'rust\nrust async\n' | searchbox
//! ```

use anyhow::Context;
use searchbox::{
    HttpSearchClient, Screen, SearchConfig, SearchEnvironment, SearchReducer, SearchState,
};
use searchbox_core::environment::SystemClock;
use searchbox_runtime::{Store, metrics::MetricsServer};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "searchbox=info,searchbox_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = SearchConfig::from_env().context("invalid configuration")?;
    tracing::info!(endpoint = %config.endpoint, timeout = ?config.timeout, "Starting searchbox");

    if let Some(addr) = config.metrics_addr {
        MetricsServer::new(addr)
            .start()
            .context("failed to start metrics exporter")?;
    }

    let client = HttpSearchClient::new(&config).context("failed to build HTTP client")?;
    let env = SearchEnvironment::new(Arc::new(client), SystemClock);
    let store = Store::new(SearchState::default(), SearchReducer::new(), env);

    let mut screen = Screen::new(std::io::stdout(), config.output);
    let stdin = BufReader::new(tokio::io::stdin());

    // Let the latest search run into its own timeout before giving up
    let grace = config.timeout + Duration::from_secs(1);
    searchbox::cli::run(&store, stdin, &mut screen, grace).await?;

    if let Err(error) = store.shutdown(Duration::from_millis(100)).await {
        tracing::debug!(%error, "Superseded searches still in flight at exit");
    }

    Ok(())
}
