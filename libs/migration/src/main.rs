//! Schema management CLI for the products database (`up`, `down`, `status`, ...)
//!
//! Reads `DATABASE_URL` like the rest of the workspace.

use migration::Migrator;
use sea_orm_migration::cli;

#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
