mod common;

use assert_matches::assert_matches;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, TransactionTrait};
use uuid::Uuid;

use common::{available, ctx, date, item_movement, seed_stock, setup};
use stockledger::entities::stock_ledger_entry::TransactionType;
use stockledger::{
    BalanceKey, LedgerHistoryFilter, MovementDirection, MovementService, NewBatch, ServiceError,
};

#[tokio::test]
async fn aggregate_tracks_ledger_across_movements() {
    let engine = setup().await;
    let ctx = ctx();
    let (branch, warehouse, item) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    seed_stock(&engine, ctx, branch, warehouse, item, dec!(10), None).await;

    let txn = engine.db.begin().await.unwrap();
    MovementService::record_movement(
        &txn,
        item_movement(
            ctx,
            branch,
            warehouse,
            item,
            TransactionType::SalesDispatch,
            MovementDirection::Out,
            dec!(3),
        ),
    )
    .await
    .unwrap();
    let entry = MovementService::record_movement(
        &txn,
        item_movement(
            ctx,
            branch,
            warehouse,
            item,
            TransactionType::Adjustment,
            MovementDirection::In,
            dec!(2.5),
        ),
    )
    .await
    .unwrap();
    txn.commit().await.unwrap();

    assert_eq!(entry.running_balance, dec!(9.5));
    assert_eq!(available(&engine, ctx, warehouse, item).await, dec!(9.5));

    // The aggregate must equal the sum over the full ledger history.
    let (entries, total) = engine
        .queries
        .ledger_history(
            ctx.tenant_id,
            LedgerHistoryFilter {
                warehouse_id: Some(warehouse),
                item_id: Some(item),
                ..Default::default()
            },
            1,
            50,
        )
        .await
        .unwrap();
    assert_eq!(total, 3);
    let net: Decimal = entries.iter().map(|e| e.quantity_in - e.quantity_out).sum();
    assert_eq!(net, dec!(9.5));
}

#[tokio::test]
async fn exactly_one_quantity_side_is_set_per_entry() {
    let engine = setup().await;
    let ctx = ctx();
    let (branch, warehouse, item) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    seed_stock(&engine, ctx, branch, warehouse, item, dec!(4), None).await;
    let txn = engine.db.begin().await.unwrap();
    MovementService::record_movement(
        &txn,
        item_movement(
            ctx,
            branch,
            warehouse,
            item,
            TransactionType::Scrap,
            MovementDirection::Out,
            dec!(1),
        ),
    )
    .await
    .unwrap();
    txn.commit().await.unwrap();

    let (entries, _) = engine
        .queries
        .ledger_history(ctx.tenant_id, LedgerHistoryFilter::default(), 1, 50)
        .await
        .unwrap();
    for entry in entries {
        let in_set = entry.quantity_in > Decimal::ZERO;
        let out_set = entry.quantity_out > Decimal::ZERO;
        assert!(in_set != out_set, "entry must be strictly in or out");
    }
}

#[tokio::test]
async fn insufficient_stock_rejects_without_partial_write() {
    let engine = setup().await;
    let ctx = ctx();
    let (branch, warehouse, item) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    seed_stock(&engine, ctx, branch, warehouse, item, dec!(5), None).await;

    let txn = engine.db.begin().await.unwrap();
    let result = MovementService::record_movement(
        &txn,
        item_movement(
            ctx,
            branch,
            warehouse,
            item,
            TransactionType::SalesDispatch,
            MovementDirection::Out,
            dec!(8),
        ),
    )
    .await;
    assert_matches!(result, Err(ServiceError::InsufficientStock(_)));
    txn.rollback().await.unwrap();

    assert_eq!(available(&engine, ctx, warehouse, item).await, dec!(5));
    let (_, total) = engine
        .queries
        .ledger_history(ctx.tenant_id, LedgerHistoryFilter::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(total, 1, "only the seed entry may exist");
}

#[tokio::test]
async fn first_movement_lazily_creates_the_balance_row() {
    let engine = setup().await;
    let ctx = ctx();
    let (branch, warehouse, item) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let key = BalanceKey::for_item(ctx.tenant_id, warehouse, item);
    assert!(engine.movements.get_stock_balance(key).await.unwrap().is_none());

    seed_stock(&engine, ctx, branch, warehouse, item, dec!(7), None).await;

    let balance = engine
        .movements
        .get_stock_balance(key)
        .await
        .unwrap()
        .expect("row created by first movement");
    assert_eq!(balance.available_quantity, dec!(7));
    assert_eq!(balance.free_quantity, dec!(7));
    assert_eq!(balance.last_movement_date, Some(date(2025, 6, 1)));
}

#[tokio::test]
async fn costed_receipt_refreshes_valuation_and_purchase_date() {
    let engine = setup().await;
    let ctx = ctx();
    let (branch, warehouse, item) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    seed_stock(&engine, ctx, branch, warehouse, item, dec!(10), Some(dec!(2.75))).await;

    let balance = engine
        .movements
        .get_stock_balance(BalanceKey::for_item(ctx.tenant_id, warehouse, item))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(balance.valuation_rate, Some(dec!(2.75)));
    assert_eq!(balance.last_purchase_date, Some(date(2025, 6, 1)));

    let valuation = engine
        .queries
        .stock_valuation(ctx.tenant_id, warehouse)
        .await
        .unwrap();
    assert_eq!(valuation, dec!(27.50));
}

#[tokio::test]
async fn on_order_counter_moves_with_po_approval_and_receipt() {
    let engine = setup().await;
    let ctx = ctx();
    let (warehouse, item) = (Uuid::new_v4(), Uuid::new_v4());
    let key = BalanceKey::for_item(ctx.tenant_id, warehouse, item);

    let txn = engine.db.begin().await.unwrap();
    let balance = MovementService::adjust_on_order(&txn, key, dec!(30))
        .await
        .unwrap();
    txn.commit().await.unwrap();
    assert_eq!(balance.on_order_quantity, dec!(30));

    let txn = engine.db.begin().await.unwrap();
    let balance = MovementService::adjust_on_order(&txn, key, dec!(-30))
        .await
        .unwrap();
    txn.commit().await.unwrap();
    assert_eq!(balance.on_order_quantity, dec!(0));

    let txn = engine.db.begin().await.unwrap();
    let result = MovementService::adjust_on_order(&txn, key, dec!(-1)).await;
    assert_matches!(result, Err(ServiceError::InvalidInput(_)));
    txn.rollback().await.unwrap();
}

#[tokio::test]
async fn batch_movement_adjusts_batch_under_the_same_unit_of_work() {
    let engine = setup().await;
    let ctx = ctx();
    let (branch, warehouse, item) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    seed_stock(&engine, ctx, branch, warehouse, item, dec!(20), None).await;
    let batch = engine
        .batches
        .create_batch(NewBatch {
            tenant_id: ctx.tenant_id,
            item_id: item,
            batch_number: "BN-001".to_string(),
            manufacturing_date: None,
            expiry_date: None,
            quantity: dec!(3),
            unit_cost: None,
        })
        .await
        .unwrap();

    // Batch holds 3; asking for 5 must fail the whole movement even though
    // the warehouse balance could cover it.
    let txn = engine.db.begin().await.unwrap();
    let mut movement = item_movement(
        ctx,
        branch,
        warehouse,
        item,
        TransactionType::SalesDispatch,
        MovementDirection::Out,
        dec!(5),
    );
    movement.batch_id = Some(batch.id);
    let result = MovementService::record_movement(&txn, movement).await;
    assert_matches!(result, Err(ServiceError::InsufficientBatchQuantity(_)));
    txn.rollback().await.unwrap();
    assert_eq!(available(&engine, ctx, warehouse, item).await, dec!(20));

    // Draining the batch exactly flips it to depleted.
    let txn = engine.db.begin().await.unwrap();
    let mut movement = item_movement(
        ctx,
        branch,
        warehouse,
        item,
        TransactionType::SalesDispatch,
        MovementDirection::Out,
        dec!(3),
    );
    movement.batch_id = Some(batch.id);
    MovementService::record_movement(&txn, movement).await.unwrap();
    txn.commit().await.unwrap();

    let drained = stockledger::entities::stock_batch::Entity::find_by_id(batch.id)
        .one(&*engine.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(drained.current_quantity, dec!(0));
    assert_eq!(drained.status, "depleted");
}

#[tokio::test]
async fn reservation_counters_move_without_ledger_entries() {
    let engine = setup().await;
    let ctx = ctx();
    let (branch, warehouse, item) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    seed_stock(&engine, ctx, branch, warehouse, item, dec!(10), None).await;
    let key = BalanceKey::for_item(ctx.tenant_id, warehouse, item);

    let txn = engine.db.begin().await.unwrap();
    let balance = MovementService::adjust_reservation(&txn, key, dec!(4))
        .await
        .unwrap();
    txn.commit().await.unwrap();
    assert_eq!(balance.reserved_quantity, dec!(4));
    assert_eq!(balance.free_quantity, dec!(6));

    // Reserving past available stock is a hard reject.
    let txn = engine.db.begin().await.unwrap();
    let result = MovementService::adjust_reservation(&txn, key, dec!(7)).await;
    assert_matches!(result, Err(ServiceError::InsufficientStock(_)));
    txn.rollback().await.unwrap();

    // Releasing below zero is malformed.
    let txn = engine.db.begin().await.unwrap();
    let result = MovementService::adjust_reservation(&txn, key, dec!(-9)).await;
    assert_matches!(result, Err(ServiceError::InvalidInput(_)));
    txn.rollback().await.unwrap();

    // No ledger entries beyond the seed: reservations move no stock.
    let (_, total) = engine
        .queries
        .ledger_history(ctx.tenant_id, LedgerHistoryFilter::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn concurrent_outs_never_oversell() {
    let engine = setup().await;
    let ctx = ctx();
    let (branch, warehouse, item) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    seed_stock(&engine, ctx, branch, warehouse, item, dec!(10), None).await;

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let db = engine.db.clone();
        tasks.push(tokio::spawn(async move {
            let txn = match db.begin().await {
                Ok(txn) => txn,
                Err(_) => return false,
            };
            let result = MovementService::record_movement(
                &txn,
                item_movement(
                    ctx,
                    branch,
                    warehouse,
                    item,
                    TransactionType::SalesDispatch,
                    MovementDirection::Out,
                    dec!(1),
                ),
            )
            .await;
            match result {
                Ok(_) => txn.commit().await.is_ok(),
                Err(_) => {
                    let _ = txn.rollback().await;
                    false
                }
            }
        }));
    }

    let mut succeeded = 0;
    for task in tasks {
        if task.await.unwrap_or(false) {
            succeeded += 1;
        }
    }
    assert_eq!(succeeded, 10, "exactly the available stock may be consumed");
    assert_eq!(available(&engine, ctx, warehouse, item).await, dec!(0));
}
