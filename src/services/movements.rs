use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        stock_balance::{self, Entity as StockBalance},
        stock_ledger_entry::{self, TransactionType},
    },
    errors::ServiceError,
    services::batches::BatchService,
};

lazy_static! {
    static ref STOCK_MOVEMENTS: IntCounter = IntCounter::new(
        "stock_movements_total",
        "Total number of recorded stock movements"
    )
    .expect("metric can be created");
    static ref STOCK_MOVEMENT_FAILURES: IntCounter = IntCounter::new(
        "stock_movement_failures_total",
        "Total number of rejected stock movements"
    )
    .expect("metric can be created");
}

/// Direction of a stock movement relative to the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MovementDirection {
    In,
    Out,
}

/// Identifies one balance aggregate row: (tenant, item-or-product, warehouse).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceKey {
    pub tenant_id: Uuid,
    pub warehouse_id: Uuid,
    pub item_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
}

impl BalanceKey {
    pub fn for_item(tenant_id: Uuid, warehouse_id: Uuid, item_id: Uuid) -> Self {
        Self {
            tenant_id,
            warehouse_id,
            item_id: Some(item_id),
            product_id: None,
        }
    }

    pub fn for_product(tenant_id: Uuid, warehouse_id: Uuid, product_id: Uuid) -> Self {
        Self {
            tenant_id,
            warehouse_id,
            item_id: None,
            product_id: Some(product_id),
        }
    }

    fn validate(&self) -> Result<(), ServiceError> {
        match (self.item_id, self.product_id) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            (None, None) => Err(ServiceError::InvalidInput(
                "movement must reference an item or a product".to_string(),
            )),
            (Some(_), Some(_)) => Err(ServiceError::InvalidInput(
                "movement cannot reference both an item and a product".to_string(),
            )),
        }
    }
}

/// Input contract of the Movement Recorder. Callers decide whether a
/// movement should happen; the recorder records it exactly once.
#[derive(Debug, Clone)]
pub struct StockMovement {
    pub tenant_id: Uuid,
    pub branch_id: Uuid,
    pub warehouse_id: Uuid,
    pub item_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub transaction_type: TransactionType,
    pub transaction_date: NaiveDate,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub reference_number: Option<String>,
    pub direction: MovementDirection,
    pub quantity: Decimal,
    pub uom: Option<String>,
    pub unit_cost: Option<Decimal>,
    pub serial_number: Option<String>,
    pub narration: Option<String>,
    pub created_by: Uuid,
}

impl StockMovement {
    pub fn balance_key(&self) -> BalanceKey {
        BalanceKey {
            tenant_id: self.tenant_id,
            warehouse_id: self.warehouse_id,
            item_id: self.item_id,
            product_id: self.product_id,
        }
    }
}

pub(crate) fn validate_movement(movement: &StockMovement) -> Result<(), ServiceError> {
    movement.balance_key().validate()?;
    if movement.quantity <= Decimal::ZERO {
        return Err(ServiceError::InvalidInput(format!(
            "movement quantity must be positive, got {}",
            movement.quantity
        )));
    }
    if movement.batch_id.is_some() && movement.item_id.is_none() {
        return Err(ServiceError::InvalidInput(
            "batch reference requires an item movement".to_string(),
        ));
    }
    Ok(())
}

/// The single entry point through which every stock quantity change flows.
///
/// All mutation paths funnel through the locked-balance helpers below, so
/// the insufficient-stock check and the balance update are read-modify-write
/// atomic under concurrency. Movements against different (item, warehouse)
/// pairs do not contend.
#[derive(Clone)]
pub struct MovementService {
    db: Arc<DatabaseConnection>,
}

impl MovementService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Records one stock movement inside the caller-supplied unit of work.
    ///
    /// Writes exactly one immutable ledger entry carrying the post-movement
    /// running balance, updates the balance aggregate, and, when a batch is
    /// referenced, adjusts the batch under the same lock discipline. The
    /// recorder never opens its own top-level transaction; a caller rollback
    /// undoes every side effect.
    #[instrument(skip(txn))]
    pub async fn record_movement<C>(
        txn: &C,
        movement: StockMovement,
    ) -> Result<stock_ledger_entry::Model, ServiceError>
    where
        C: ConnectionTrait,
    {
        validate_movement(&movement).map_err(|e| {
            STOCK_MOVEMENT_FAILURES.inc();
            e
        })?;

        let key = movement.balance_key();
        let balance = match Self::lock_balance_row(txn, &key).await? {
            Some(row) => row,
            None => Self::init_balance_row(txn, &key).await?,
        };

        let new_available = match movement.direction {
            MovementDirection::In => balance.available_quantity + movement.quantity,
            MovementDirection::Out => {
                if movement.quantity > balance.available_quantity {
                    STOCK_MOVEMENT_FAILURES.inc();
                    return Err(ServiceError::InsufficientStock(format!(
                        "available={}, requested={}",
                        balance.available_quantity, movement.quantity
                    )));
                }
                balance.available_quantity - movement.quantity
            }
        };

        let (quantity_in, quantity_out) = match movement.direction {
            MovementDirection::In => (movement.quantity, Decimal::ZERO),
            MovementDirection::Out => (Decimal::ZERO, movement.quantity),
        };

        let entry = stock_ledger_entry::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(movement.tenant_id),
            branch_id: Set(movement.branch_id),
            warehouse_id: Set(movement.warehouse_id),
            item_id: Set(movement.item_id),
            product_id: Set(movement.product_id),
            batch_id: Set(movement.batch_id),
            transaction_type: Set(movement.transaction_type.as_str().to_string()),
            transaction_date: Set(movement.transaction_date),
            reference_type: Set(movement.reference_type.clone()),
            reference_id: Set(movement.reference_id),
            reference_number: Set(movement.reference_number.clone()),
            quantity_in: Set(quantity_in),
            quantity_out: Set(quantity_out),
            unit_cost: Set(movement.unit_cost),
            total_value: Set(movement.unit_cost.map(|c| c * movement.quantity)),
            running_balance: Set(new_available),
            uom: Set(movement.uom.clone()),
            serial_number: Set(movement.serial_number.clone()),
            narration: Set(movement.narration.clone()),
            created_by: Set(movement.created_by),
            created_at: Set(Utc::now()),
        };
        let inserted = entry.insert(txn).await.map_err(ServiceError::db_error)?;

        let reserved = balance.reserved_quantity;
        let mut active: stock_balance::ActiveModel = balance.into();
        active.available_quantity = Set(new_available);
        active.free_quantity = Set(new_available - reserved);
        active.last_movement_date = Set(Some(movement.transaction_date));
        if movement.transaction_type.is_costed_receipt() {
            if let Some(cost) = movement.unit_cost {
                active.valuation_rate = Set(Some(cost));
            }
        }
        if movement.transaction_type == TransactionType::GrnReceipt {
            active.last_purchase_date = Set(Some(movement.transaction_date));
        }
        active.updated_at = Set(Utc::now());
        active.update(txn).await.map_err(ServiceError::db_error)?;

        if let Some(batch_id) = movement.batch_id {
            let batch = BatchService::adjust_batch_quantity(
                txn,
                movement.tenant_id,
                batch_id,
                movement.quantity,
                movement.direction,
            )
            .await
            .map_err(|e| {
                STOCK_MOVEMENT_FAILURES.inc();
                e
            })?;
            if Some(batch.item_id) != movement.item_id {
                return Err(ServiceError::InvalidInput(format!(
                    "batch {} does not belong to the moved item",
                    batch_id
                )));
            }
        }

        STOCK_MOVEMENTS.inc();
        info!(
            warehouse_id = %movement.warehouse_id,
            transaction_type = %movement.transaction_type.as_str(),
            quantity = %movement.quantity,
            running_balance = %new_available,
            "Stock movement recorded"
        );

        Ok(inserted)
    }

    /// Moves the reserved counter without touching the ledger: nothing has
    /// physically moved. Used by sales-order confirmation (reserve) and
    /// delivery confirmation (release, negative delta). A reservation may
    /// not exceed available stock.
    #[instrument(skip(txn))]
    pub async fn adjust_reservation<C>(
        txn: &C,
        key: BalanceKey,
        delta: Decimal,
    ) -> Result<stock_balance::Model, ServiceError>
    where
        C: ConnectionTrait,
    {
        key.validate()?;
        let balance = match Self::lock_balance_row(txn, &key).await? {
            Some(row) => row,
            None => Self::init_balance_row(txn, &key).await?,
        };

        let new_reserved = balance.reserved_quantity + delta;
        if new_reserved < Decimal::ZERO {
            return Err(ServiceError::InvalidInput(format!(
                "reserved quantity cannot go negative: reserved={}, delta={}",
                balance.reserved_quantity, delta
            )));
        }
        if delta > Decimal::ZERO && new_reserved > balance.available_quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "cannot reserve {} beyond available {}",
                new_reserved, balance.available_quantity
            )));
        }

        let available = balance.available_quantity;
        let mut active: stock_balance::ActiveModel = balance.into();
        active.reserved_quantity = Set(new_reserved);
        active.free_quantity = Set(available - new_reserved);
        active.updated_at = Set(Utc::now());
        active.update(txn).await.map_err(ServiceError::db_error)
    }

    /// Moves the on-order counter (expected from approved purchase orders).
    #[instrument(skip(txn))]
    pub async fn adjust_on_order<C>(
        txn: &C,
        key: BalanceKey,
        delta: Decimal,
    ) -> Result<stock_balance::Model, ServiceError>
    where
        C: ConnectionTrait,
    {
        key.validate()?;
        let balance = match Self::lock_balance_row(txn, &key).await? {
            Some(row) => row,
            None => Self::init_balance_row(txn, &key).await?,
        };

        let new_on_order = balance.on_order_quantity + delta;
        if new_on_order < Decimal::ZERO {
            return Err(ServiceError::InvalidInput(format!(
                "on-order quantity cannot go negative: on_order={}, delta={}",
                balance.on_order_quantity, delta
            )));
        }

        let mut active: stock_balance::ActiveModel = balance.into();
        active.on_order_quantity = Set(new_on_order);
        active.updated_at = Set(Utc::now());
        active.update(txn).await.map_err(ServiceError::db_error)
    }

    /// Read-only balance lookup on the live connection. Returns `None` when
    /// no movement has ever touched the key.
    #[instrument(skip(self))]
    pub async fn get_stock_balance(
        &self,
        key: BalanceKey,
    ) -> Result<Option<stock_balance::Model>, ServiceError> {
        key.validate()?;
        Self::find_balance(&*self.db, &key).await
    }

    /// Unlocked balance read usable inside a caller's transaction.
    pub async fn find_balance<C>(
        conn: &C,
        key: &BalanceKey,
    ) -> Result<Option<stock_balance::Model>, ServiceError>
    where
        C: ConnectionTrait,
    {
        Self::balance_query(key)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)
    }

    // Every mutation path funnels through these two helpers so the lock
    // discipline cannot be bypassed.

    async fn lock_balance_row<C>(
        conn: &C,
        key: &BalanceKey,
    ) -> Result<Option<stock_balance::Model>, ServiceError>
    where
        C: ConnectionTrait,
    {
        Self::balance_query(key)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(ServiceError::db_error)
    }

    async fn init_balance_row<C>(
        conn: &C,
        key: &BalanceKey,
    ) -> Result<stock_balance::Model, ServiceError>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();
        let row = stock_balance::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(key.tenant_id),
            item_id: Set(key.item_id),
            product_id: Set(key.product_id),
            warehouse_id: Set(key.warehouse_id),
            available_quantity: Set(Decimal::ZERO),
            reserved_quantity: Set(Decimal::ZERO),
            on_order_quantity: Set(Decimal::ZERO),
            in_production_quantity: Set(Decimal::ZERO),
            free_quantity: Set(Decimal::ZERO),
            last_purchase_date: Set(None),
            last_movement_date: Set(None),
            valuation_rate: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        row.insert(conn).await.map_err(ServiceError::db_error)
    }

    fn balance_query(key: &BalanceKey) -> sea_orm::Select<StockBalance> {
        let query = StockBalance::find()
            .filter(stock_balance::Column::TenantId.eq(key.tenant_id))
            .filter(stock_balance::Column::WarehouseId.eq(key.warehouse_id));
        match (key.item_id, key.product_id) {
            (Some(item_id), _) => query.filter(stock_balance::Column::ItemId.eq(item_id)),
            (None, Some(product_id)) => {
                query.filter(stock_balance::Column::ProductId.eq(product_id))
            }
            (None, None) => query,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn movement(item: Option<Uuid>, product: Option<Uuid>, quantity: Decimal) -> StockMovement {
        StockMovement {
            tenant_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            item_id: item,
            product_id: product,
            batch_id: None,
            transaction_type: TransactionType::Adjustment,
            transaction_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            reference_type: None,
            reference_id: None,
            reference_number: None,
            direction: MovementDirection::In,
            quantity,
            uom: None,
            unit_cost: None,
            serial_number: None,
            narration: None,
            created_by: Uuid::new_v4(),
        }
    }

    #[test]
    fn rejects_movement_without_item_or_product() {
        let m = movement(None, None, dec!(5));
        assert!(matches!(
            validate_movement(&m),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_movement_with_both_item_and_product() {
        let m = movement(Some(Uuid::new_v4()), Some(Uuid::new_v4()), dec!(5));
        assert!(matches!(
            validate_movement(&m),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let m = movement(Some(Uuid::new_v4()), None, dec!(0));
        assert!(matches!(
            validate_movement(&m),
            Err(ServiceError::InvalidInput(_))
        ));
        let m = movement(Some(Uuid::new_v4()), None, dec!(-3));
        assert!(matches!(
            validate_movement(&m),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_batch_on_product_movement() {
        let mut m = movement(None, Some(Uuid::new_v4()), dec!(5));
        m.batch_id = Some(Uuid::new_v4());
        assert!(matches!(
            validate_movement(&m),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn accepts_well_formed_movement() {
        let m = movement(Some(Uuid::new_v4()), None, dec!(2.5));
        assert!(validate_movement(&m).is_ok());
    }
}
