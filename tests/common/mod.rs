//! Shared harness: spins the engine up against a fresh in-memory SQLite
//! database with the embedded migrations applied.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, TransactionTrait};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use uuid::Uuid;

use stockledger::entities::stock_ledger_entry::TransactionType;
use stockledger::migrator::Migrator;
use stockledger::{
    events, BalanceKey, BatchService, MovementDirection, MovementService, StockMovement,
    StockQueryService, StockTransferService, TenantContext,
};

#[allow(dead_code)]
pub struct TestEngine {
    pub db: Arc<DatabaseConnection>,
    pub movements: MovementService,
    pub batches: BatchService,
    pub transfers: StockTransferService,
    pub queries: StockQueryService,
}

#[allow(dead_code)]
pub async fn setup() -> TestEngine {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("db connect");
    Migrator::up(&db, None).await.expect("migrations apply");

    let db = Arc::new(db);
    let (sender, rx) = events::channel(64);
    tokio::spawn(events::process_events(rx));

    TestEngine {
        movements: MovementService::new(db.clone()),
        batches: BatchService::new(db.clone(), Some(sender.clone())),
        transfers: StockTransferService::new(db.clone(), sender),
        queries: StockQueryService::new(db.clone()),
        db,
    }
}

#[allow(dead_code)]
pub fn ctx() -> TenantContext {
    TenantContext {
        tenant_id: Uuid::new_v4(),
        actor_id: Uuid::new_v4(),
    }
}

#[allow(dead_code)]
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A plain item movement with everything optional left empty.
#[allow(dead_code)]
pub fn item_movement(
    ctx: TenantContext,
    branch_id: Uuid,
    warehouse_id: Uuid,
    item_id: Uuid,
    transaction_type: TransactionType,
    direction: MovementDirection,
    quantity: Decimal,
) -> StockMovement {
    StockMovement {
        tenant_id: ctx.tenant_id,
        branch_id,
        warehouse_id,
        item_id: Some(item_id),
        product_id: None,
        batch_id: None,
        transaction_type,
        transaction_date: date(2025, 6, 1),
        reference_type: None,
        reference_id: None,
        reference_number: None,
        direction,
        quantity,
        uom: None,
        unit_cost: None,
        serial_number: None,
        narration: None,
        created_by: ctx.actor_id,
    }
}

/// Seeds stock for an item via a committed GRN receipt movement.
#[allow(dead_code)]
pub async fn seed_stock(
    engine: &TestEngine,
    ctx: TenantContext,
    branch_id: Uuid,
    warehouse_id: Uuid,
    item_id: Uuid,
    quantity: Decimal,
    unit_cost: Option<Decimal>,
) {
    let mut movement = item_movement(
        ctx,
        branch_id,
        warehouse_id,
        item_id,
        TransactionType::GrnReceipt,
        MovementDirection::In,
        quantity,
    );
    movement.unit_cost = unit_cost;

    let txn = engine.db.begin().await.expect("begin");
    MovementService::record_movement(&txn, movement)
        .await
        .expect("seed movement");
    txn.commit().await.expect("commit");
}

/// Current available quantity for an item key, zero when no row exists.
#[allow(dead_code)]
pub async fn available(
    engine: &TestEngine,
    ctx: TenantContext,
    warehouse_id: Uuid,
    item_id: Uuid,
) -> Decimal {
    engine
        .movements
        .get_stock_balance(BalanceKey::for_item(ctx.tenant_id, warehouse_id, item_id))
        .await
        .expect("balance lookup")
        .map(|b| b.available_quantity)
        .unwrap_or(Decimal::ZERO)
}
