use clap::Parser;
use purchase_etl::{Args, DeliveryClient, PgExtractor, Pipeline, RetryPolicy};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "purchase_etl=info,warn".into()),
        )
        .init();

    let args = Args::parse();

    let extractor = PgExtractor::new(args.database_url);
    let client = DeliveryClient::new(args.endpoint, args.api_token, RetryPolicy::default())?;
    let pipeline = Pipeline::new(extractor, client);

    let result = pipeline.run().await;
    info!(%result, "run finished");

    // A scheduler reads the exit code: any failed batch (or a failed
    // extraction) makes the whole run report failure.
    if !result.is_success() {
        std::process::exit(1);
    }

    Ok(())
}
