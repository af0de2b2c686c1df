use sea_orm_migration::prelude::*;

use tessera_identity_migration::Migrator;

#[tokio::main]
async fn main() {
    tessera_core::tracing::init_tracing();
    cli::run_cli(Migrator).await;
}
