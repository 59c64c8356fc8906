//! Brochure CLI: turn a company website into a streamed markdown brochure.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    commands::init_tracing(&cli);

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env"),
    }

    commands::run(cli).await
}
