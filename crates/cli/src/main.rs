//! `cabin` -- family cabin from the terminal.
//!
//! Stands in for the web pages: every invocation restores the stored
//! session, passes the route guard and runs one command.
//!
//! # Environment variables
//!
//! | Variable                | Required | Default                      |
//! |-------------------------|----------|------------------------------|
//! | `CABIN_API_URL`         | no       | `http://localhost:3000/api`  |
//! | `CABIN_CREDENTIAL_FILE` | no       | `$HOME/.familycabin/token`   |
//! | `CABIN_USER_AGENT`      | no       | `familycabin/<version>`      |
//! | `CABIN_PASSWORD`        | no       | -- (`--password` fallback)   |

mod args;
mod commands;
mod output;

use cabin_client::{Cabin, ClientConfig};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::args::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cabin_client=info,cabin_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;
    tracing::debug!(api_url = %config.api_url, "Configured");
    let cabin = Cabin::from_config(&config)?;

    commands::run(cli, &cabin).await
}
