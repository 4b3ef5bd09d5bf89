use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::stock_batch::{self, BatchStatus, Entity as StockBatch},
    errors::ServiceError,
    events::{Event, EventSender},
    services::movements::MovementDirection,
};

/// One entry of a FEFO allocation plan: consume `consume` units out of the
/// batch's `available`. The plan is advisory; applying it is the caller's
/// job via Movement Recorder calls, which re-validate at commit time.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FefoAllocation {
    pub batch_id: Uuid,
    pub batch_number: String,
    pub available: Decimal,
    pub consume: Decimal,
    pub expiry_date: Option<NaiveDate>,
}

/// Input for minting a batch from a receiving workflow.
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub tenant_id: Uuid,
    pub item_id: Uuid,
    pub batch_number: String,
    pub manufacturing_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub quantity: Decimal,
    pub unit_cost: Option<Decimal>,
}

/// Tracks per-batch remaining quantity and status, and plans expiry-ordered
/// consumption over the batches of one item.
#[derive(Clone)]
pub struct BatchService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl BatchService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a batch with `current_quantity = initial_quantity` and
    /// status `active`. Batch numbers are unique per tenant and item.
    #[instrument(skip(self))]
    pub async fn create_batch(&self, input: NewBatch) -> Result<stock_batch::Model, ServiceError> {
        if input.batch_number.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "batch number cannot be empty".to_string(),
            ));
        }
        if input.quantity < Decimal::ZERO {
            return Err(ServiceError::InvalidInput(format!(
                "batch quantity cannot be negative, got {}",
                input.quantity
            )));
        }

        let db = &*self.db;
        let existing = StockBatch::find()
            .filter(stock_batch::Column::TenantId.eq(input.tenant_id))
            .filter(stock_batch::Column::ItemId.eq(input.item_id))
            .filter(stock_batch::Column::BatchNumber.eq(input.batch_number.clone()))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Err(ServiceError::ValidationError(format!(
                "batch number {} already exists for this item",
                input.batch_number
            )));
        }

        let status = if input.quantity == Decimal::ZERO {
            BatchStatus::Depleted
        } else {
            BatchStatus::Active
        };
        let now = Utc::now();
        let batch = stock_batch::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(input.tenant_id),
            item_id: Set(input.item_id),
            batch_number: Set(input.batch_number.clone()),
            manufacturing_date: Set(input.manufacturing_date),
            expiry_date: Set(input.expiry_date),
            initial_quantity: Set(input.quantity),
            current_quantity: Set(input.quantity),
            unit_cost: Set(input.unit_cost),
            status: Set(status.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = batch.insert(db).await.map_err(ServiceError::db_error)?;

        info!(batch_id = %created.id, batch_number = %created.batch_number, "Batch created");
        self.emit(Event::BatchCreated(created.id));
        Ok(created)
    }

    /// Applies a quantity delta to a batch inside the caller's unit of work.
    ///
    /// Locks the row, rejects underflow, and applies the depleted/active
    /// auto-transition. Quarantined and expired batches keep their status;
    /// quantity still moves so cancellation reversals stay truthful.
    #[instrument(skip(txn))]
    pub async fn adjust_batch_quantity<C>(
        txn: &C,
        tenant_id: Uuid,
        batch_id: Uuid,
        quantity: Decimal,
        direction: MovementDirection,
    ) -> Result<stock_batch::Model, ServiceError>
    where
        C: ConnectionTrait,
    {
        if quantity <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(format!(
                "batch adjustment quantity must be positive, got {}",
                quantity
            )));
        }

        let batch = StockBatch::find()
            .filter(stock_batch::Column::Id.eq(batch_id))
            .filter(stock_batch::Column::TenantId.eq(tenant_id))
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))?;

        let new_quantity = match direction {
            MovementDirection::In => batch.current_quantity + quantity,
            MovementDirection::Out => {
                if quantity > batch.current_quantity {
                    return Err(ServiceError::InsufficientBatchQuantity(format!(
                        "batch {}: available={}, requested={}",
                        batch.batch_number, batch.current_quantity, quantity
                    )));
                }
                batch.current_quantity - quantity
            }
        };

        let current_status = BatchStatus::from_str(&batch.status).ok_or_else(|| {
            ServiceError::InternalError(format!("unknown batch status {}", batch.status))
        })?;
        let new_status = if current_status.is_sticky() {
            current_status
        } else if new_quantity == Decimal::ZERO {
            BatchStatus::Depleted
        } else {
            BatchStatus::Active
        };

        let mut active: stock_batch::ActiveModel = batch.into();
        active.current_quantity = Set(new_quantity);
        active.status = Set(new_status.as_str().to_string());
        active.updated_at = Set(Utc::now());
        active.update(txn).await.map_err(ServiceError::db_error)
    }

    /// Plans FEFO consumption for an item: walks active, non-empty batches
    /// in expiry order (no-expiry batches last, creation order breaking
    /// ties) and greedily takes from each until the need is covered or
    /// batches run out. Read-only; may under-allocate — the caller compares
    /// the planned total against the request to detect shortfall.
    #[instrument(skip(self))]
    pub async fn select_fefo_batches(
        &self,
        tenant_id: Uuid,
        item_id: Uuid,
        quantity_needed: Decimal,
    ) -> Result<Vec<FefoAllocation>, ServiceError> {
        if quantity_needed <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(format!(
                "requested quantity must be positive, got {}",
                quantity_needed
            )));
        }

        let db = &*self.db;
        let mut batches = StockBatch::find()
            .filter(stock_batch::Column::TenantId.eq(tenant_id))
            .filter(stock_batch::Column::ItemId.eq(item_id))
            .filter(stock_batch::Column::Status.eq(BatchStatus::Active.as_str()))
            .filter(stock_batch::Column::CurrentQuantity.gt(Decimal::ZERO))
            .order_by_asc(stock_batch::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        batches.sort_by(fefo_order);

        Ok(plan_fefo(&batches, quantity_needed))
    }

    /// Explicit operator status change. This is the only way out of
    /// `expired` and `quarantine`.
    #[instrument(skip(self))]
    pub async fn change_batch_status(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        new_status: BatchStatus,
    ) -> Result<stock_batch::Model, ServiceError> {
        let db = &*self.db;
        let batch = StockBatch::find()
            .filter(stock_batch::Column::Id.eq(batch_id))
            .filter(stock_batch::Column::TenantId.eq(tenant_id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))?;

        let old_status = batch.status.clone();
        let mut active: stock_batch::ActiveModel = batch.into();
        active.status = Set(new_status.as_str().to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await.map_err(ServiceError::db_error)?;

        info!(
            batch_id = %batch_id,
            old_status = %old_status,
            new_status = %new_status.as_str(),
            "Batch status changed"
        );
        self.emit(Event::BatchStatusChanged {
            batch_id,
            old_status,
            new_status: new_status.as_str().to_string(),
        });
        Ok(updated)
    }

    /// Sweeps active batches whose expiry date has passed into `expired`.
    /// Meant to run periodically from a scheduler owned by the caller.
    #[instrument(skip(self))]
    pub async fn mark_expired_batches(
        &self,
        tenant_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<u64, ServiceError> {
        let db = &*self.db;
        let expired = StockBatch::find()
            .filter(stock_batch::Column::TenantId.eq(tenant_id))
            .filter(stock_batch::Column::Status.eq(BatchStatus::Active.as_str()))
            .filter(stock_batch::Column::ExpiryDate.lt(as_of))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut count = 0u64;
        for batch in expired {
            let batch_id = batch.id;
            let mut active: stock_batch::ActiveModel = batch.into();
            active.status = Set(BatchStatus::Expired.as_str().to_string());
            active.updated_at = Set(Utc::now());
            active.update(db).await.map_err(ServiceError::db_error)?;
            count += 1;
            info!(batch_id = %batch_id, "Batch marked expired");
        }

        if count > 0 {
            self.emit(Event::BatchesExpired { tenant_id, count });
        }
        Ok(count)
    }

    fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.try_send(event) {
                warn!("Failed to send batch event: {}", e);
            }
        }
    }
}

/// FEFO ordering: earliest expiry first, batches without an expiry date
/// last, ties broken by creation order.
fn fefo_order(a: &stock_batch::Model, b: &stock_batch::Model) -> Ordering {
    match (a.expiry_date, b.expiry_date) {
        (Some(ea), Some(eb)) => ea.cmp(&eb).then(a.created_at.cmp(&b.created_at)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.created_at.cmp(&b.created_at),
    }
}

fn plan_fefo(batches: &[stock_batch::Model], quantity_needed: Decimal) -> Vec<FefoAllocation> {
    let mut plan = Vec::new();
    let mut remaining = quantity_needed;
    for batch in batches {
        if remaining <= Decimal::ZERO {
            break;
        }
        let consume = remaining.min(batch.current_quantity);
        plan.push(FefoAllocation {
            batch_id: batch.id,
            batch_number: batch.batch_number.clone(),
            available: batch.current_quantity,
            consume,
            expiry_date: batch.expiry_date,
        });
        remaining -= consume;
    }
    plan
}
