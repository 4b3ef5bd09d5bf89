//! Standalone migration runner: `migrate --database-url postgres://…`
//! (or set `DATABASE_URL`).

use clap::Parser;
use sea_orm_migration::MigratorTrait;
use stockledger::{db, logging, migrator::Migrator};

#[derive(Parser, Debug)]
#[command(about = "Apply stockledger schema migrations")]
struct Args {
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Roll everything back instead of migrating up.
    #[arg(long, default_value_t = false)]
    down: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing("info", false);
    let args = Args::parse();

    let pool = db::connect(&args.database_url).await?;
    if args.down {
        Migrator::down(&pool, None).await?;
        tracing::info!("Migrations rolled back");
    } else {
        Migrator::up(&pool, None).await?;
        tracing::info!("Migrations applied");
    }
    Ok(())
}
