//! Runtime configuration.
//!
//! Everything comes from CLI flags with environment variable fallbacks, so
//! the job can run unattended under a scheduler with nothing but env vars
//! set: `DATABASE_URL`, `API_TOKEN`, and optionally `ETL_ENDPOINT`.

use clap::Parser;
use url::Url;

/// CLI arguments for a single ETL run.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// PostgreSQL connection string for the purchases database
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Ingestion endpoint that receives the per-category batches
    #[arg(
        long,
        env = "ETL_ENDPOINT",
        default_value = "https://api.example.com/receive"
    )]
    pub endpoint: Url,

    /// Bearer token for the ingestion endpoint
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    pub api_token: String,
}
