//! Products CLI - run catalog requests against a SQL database

use clap::Parser;
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_products::{product_mediator, SqlProductStore};
use migration::Migrator;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod commands;
mod config;

use commands::Command;
use config::Config;

#[derive(Parser, Debug)]
#[command(author, version, about = "Manage the product catalog")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    install_color_eyre();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let db = database::connect_with_retry(&config.database, None).await?;
    database::run_migrations::<Migrator>(&db).await?;

    let mediator = product_mediator(SqlProductStore::new(db));
    mediator.verify()?;

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling request");
                cancel.cancel();
            }
        }
    });

    let outcome = commands::run(&mediator, cli.command, &cancel).await;
    interrupt.abort();

    match outcome {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            info!("Done");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) if err.is_expected() => {
            eprintln!("{}", commands::describe(&err));
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err.into()),
    }
}
