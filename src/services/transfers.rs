use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        stock_batch::{self, Entity as StockBatch},
        stock_ledger_entry::TransactionType,
        stock_transfer::{self, Entity as StockTransfer, TransferStatus, TransferType},
        stock_transfer_line::{self, Entity as StockTransferLine},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::movements::{BalanceKey, MovementDirection, MovementService, StockMovement},
};

lazy_static! {
    static ref TRANSFER_DISPATCHES: IntCounter = IntCounter::new(
        "stock_transfer_dispatches_total",
        "Total number of dispatched stock transfers"
    )
    .expect("metric can be created");
    static ref TRANSFER_FAILURES: IntCounter = IntCounter::new(
        "stock_transfer_failures_total",
        "Total number of failed stock transfer operations"
    )
    .expect("metric can be created");
}

/// Tenant and actor on whose behalf a workflow operation runs.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext {
    pub tenant_id: Uuid,
    pub actor_id: Uuid,
}

#[derive(Debug, Clone, Validate)]
pub struct TransferInput {
    #[validate(length(min = 1, message = "Transfer number cannot be empty"))]
    pub transfer_number: String,
    pub from_branch_id: Uuid,
    pub to_branch_id: Uuid,
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    pub transfer_type: TransferType,
    pub transfer_date: NaiveDate,
    pub remarks: Option<String>,
    #[validate(length(min = 1, message = "Transfer requires at least one line"))]
    pub lines: Vec<TransferLineInput>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TransferLineInput {
    pub item_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub quantity: Decimal,
    pub unit_cost: Option<Decimal>,
    pub uom: Option<String>,
}

/// One entry of a partial-receipt manifest.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptLine {
    pub line_id: Uuid,
    pub quantity: Decimal,
}

/// The transfer aggregate as returned by every workflow operation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TransferWithLines {
    pub transfer: stock_transfer::Model,
    pub lines: Vec<stock_transfer_line::Model>,
}

/// State machine over a transfer-with-lines aggregate.
///
/// Stock moves only on dispatch, receive, and cancel; draft and approval
/// are ledger-free, so a transfer can be edited or abandoned before it has
/// any footprint, and its footprint is reversible by tracking the
/// unreceived remainder.
#[derive(Clone)]
pub struct StockTransferService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl StockTransferService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates a draft transfer. No stock impact.
    #[instrument(skip(self, input), fields(transfer_number = %input.transfer_number))]
    pub async fn create_transfer(
        &self,
        ctx: TenantContext,
        input: TransferInput,
    ) -> Result<TransferWithLines, ServiceError> {
        validate_transfer_input(&input)?;

        let db = &*self.db;
        let result = db
            .transaction::<_, TransferWithLines, ServiceError>(move |txn| {
                Box::pin(async move {
                    check_line_batches(txn, ctx.tenant_id, &input.lines).await?;

                    let now = Utc::now();
                    let header = stock_transfer::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        tenant_id: Set(ctx.tenant_id),
                        transfer_number: Set(input.transfer_number.clone()),
                        from_branch_id: Set(input.from_branch_id),
                        to_branch_id: Set(input.to_branch_id),
                        from_warehouse_id: Set(input.from_warehouse_id),
                        to_warehouse_id: Set(input.to_warehouse_id),
                        transfer_type: Set(input.transfer_type.as_str().to_string()),
                        status: Set(TransferStatus::Draft.as_str().to_string()),
                        transfer_date: Set(input.transfer_date),
                        remarks: Set(input.remarks.clone()),
                        created_by: Set(ctx.actor_id),
                        created_at: Set(now),
                        updated_at: Set(now),
                        deleted_at: Set(None),
                    };
                    let header = header.insert(txn).await.map_err(ServiceError::db_error)?;

                    insert_lines(txn, header.id, &input.lines).await?;
                    let lines = load_lines(txn, header.id).await?;
                    Ok(TransferWithLines {
                        transfer: header,
                        lines,
                    })
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(transfer_id = %result.transfer.id, "Stock transfer created");
        self.emit(Event::TransferCreated(result.transfer.id));
        Ok(result)
    }

    /// Replaces the header fields and the full line set. Draft only.
    #[instrument(skip(self, input))]
    pub async fn update_transfer(
        &self,
        ctx: TenantContext,
        transfer_id: Uuid,
        input: TransferInput,
    ) -> Result<TransferWithLines, ServiceError> {
        validate_transfer_input(&input)?;

        let db = &*self.db;
        let result = db
            .transaction::<_, TransferWithLines, ServiceError>(move |txn| {
                Box::pin(async move {
                    let header = lock_transfer(txn, ctx.tenant_id, transfer_id).await?;
                    require_status(&header, TransferStatus::Draft, "update")?;
                    check_line_batches(txn, ctx.tenant_id, &input.lines).await?;

                    StockTransferLine::delete_many()
                        .filter(stock_transfer_line::Column::TransferId.eq(transfer_id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    insert_lines(txn, transfer_id, &input.lines).await?;

                    let mut active: stock_transfer::ActiveModel = header.into();
                    active.transfer_number = Set(input.transfer_number.clone());
                    active.from_branch_id = Set(input.from_branch_id);
                    active.to_branch_id = Set(input.to_branch_id);
                    active.from_warehouse_id = Set(input.from_warehouse_id);
                    active.to_warehouse_id = Set(input.to_warehouse_id);
                    active.transfer_type = Set(input.transfer_type.as_str().to_string());
                    active.transfer_date = Set(input.transfer_date);
                    active.remarks = Set(input.remarks.clone());
                    active.updated_at = Set(Utc::now());
                    let header = active.update(txn).await.map_err(ServiceError::db_error)?;

                    let lines = load_lines(txn, transfer_id).await?;
                    Ok(TransferWithLines {
                        transfer: header,
                        lines,
                    })
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(transfer_id = %transfer_id, "Stock transfer updated");
        Ok(result)
    }

    /// Pure status transition draft -> approved. No stock impact.
    #[instrument(skip(self))]
    pub async fn approve_transfer(
        &self,
        ctx: TenantContext,
        transfer_id: Uuid,
    ) -> Result<TransferWithLines, ServiceError> {
        let db = &*self.db;
        let result = db
            .transaction::<_, TransferWithLines, ServiceError>(move |txn| {
                Box::pin(async move {
                    let header = lock_transfer(txn, ctx.tenant_id, transfer_id).await?;
                    require_status(&header, TransferStatus::Draft, "approve")?;

                    let header = set_status(txn, header, TransferStatus::Approved).await?;
                    let lines = load_lines(txn, transfer_id).await?;
                    Ok(TransferWithLines {
                        transfer: header,
                        lines,
                    })
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(transfer_id = %transfer_id, "Stock transfer approved");
        self.emit(Event::TransferApproved(transfer_id));
        Ok(result)
    }

    /// Deducts every line at the source warehouse and moves the header to
    /// in_transit. Unit costs missing on a line are resolved from the
    /// source warehouse's current valuation rate and frozen onto the line
    /// so receipt and cancellation use the same cost. Atomic across lines:
    /// one insufficient line aborts the whole dispatch.
    #[instrument(skip(self))]
    pub async fn dispatch_transfer(
        &self,
        ctx: TenantContext,
        transfer_id: Uuid,
    ) -> Result<TransferWithLines, ServiceError> {
        let db = &*self.db;
        let result = db
            .transaction::<_, TransferWithLines, ServiceError>(move |txn| {
                Box::pin(async move {
                    let header = lock_transfer(txn, ctx.tenant_id, transfer_id).await?;
                    require_status(&header, TransferStatus::Approved, "dispatch")?;

                    let lines = load_lines(txn, transfer_id).await?;
                    let dispatch_date = Utc::now().date_naive();

                    for line in &lines {
                        let unit_cost = match line.unit_cost {
                            Some(cost) => Some(cost),
                            None => {
                                let key = BalanceKey {
                                    tenant_id: ctx.tenant_id,
                                    warehouse_id: header.from_warehouse_id,
                                    item_id: line.item_id,
                                    product_id: line.product_id,
                                };
                                MovementService::find_balance(txn, &key)
                                    .await?
                                    .and_then(|b| b.valuation_rate)
                            }
                        };

                        MovementService::record_movement(
                            txn,
                            transfer_movement(
                                ctx,
                                &header,
                                line,
                                header.from_branch_id,
                                header.from_warehouse_id,
                                TransactionType::TransferOut,
                                MovementDirection::Out,
                                line.quantity,
                                unit_cost,
                                dispatch_date,
                                format!("Transfer {} dispatch", header.transfer_number),
                            ),
                        )
                        .await?;

                        if unit_cost != line.unit_cost {
                            let mut active: stock_transfer_line::ActiveModel =
                                line.clone().into();
                            active.unit_cost = Set(unit_cost);
                            active.updated_at = Set(Utc::now());
                            active.update(txn).await.map_err(ServiceError::db_error)?;
                        }
                    }

                    let header = set_status(txn, header, TransferStatus::InTransit).await?;
                    let lines = load_lines(txn, transfer_id).await?;
                    Ok(TransferWithLines {
                        transfer: header,
                        lines,
                    })
                })
            })
            .await;

        let result = match result {
            Ok(res) => res,
            Err(e) => {
                TRANSFER_FAILURES.inc();
                return Err(e.into());
            }
        };

        TRANSFER_DISPATCHES.inc();
        info!(transfer_id = %transfer_id, "Stock transfer dispatched");
        self.emit(Event::TransferDispatched(transfer_id));
        Ok(result)
    }

    /// Applies a receipt manifest at the destination warehouse. With no
    /// manifest, everything still outstanding is received. The header
    /// reaches `received` only once every line is fully received;
    /// otherwise it stays in_transit for further partial receipts.
    #[instrument(skip(self, manifest))]
    pub async fn receive_transfer(
        &self,
        ctx: TenantContext,
        transfer_id: Uuid,
        manifest: Option<Vec<ReceiptLine>>,
    ) -> Result<TransferWithLines, ServiceError> {
        let db = &*self.db;
        let result = db
            .transaction::<_, TransferWithLines, ServiceError>(move |txn| {
                Box::pin(async move {
                    let header = lock_transfer(txn, ctx.tenant_id, transfer_id).await?;
                    require_status(&header, TransferStatus::InTransit, "receive")?;

                    let lines = load_lines(txn, transfer_id).await?;
                    let receipts = resolve_receipts(&lines, manifest)?;
                    let receipt_date = Utc::now().date_naive();

                    for (line, quantity) in &receipts {
                        MovementService::record_movement(
                            txn,
                            transfer_movement(
                                ctx,
                                &header,
                                line,
                                header.to_branch_id,
                                header.to_warehouse_id,
                                TransactionType::TransferIn,
                                MovementDirection::In,
                                *quantity,
                                line.unit_cost,
                                receipt_date,
                                format!("Transfer {} receipt", header.transfer_number),
                            ),
                        )
                        .await?;

                        let mut active: stock_transfer_line::ActiveModel = line.clone().into();
                        active.received_quantity = Set(line.received_quantity + *quantity);
                        active.updated_at = Set(Utc::now());
                        active.update(txn).await.map_err(ServiceError::db_error)?;
                    }

                    let lines = load_lines(txn, transfer_id).await?;
                    let complete = lines.iter().all(|l| l.received_quantity == l.quantity);
                    let header = if complete {
                        set_status(txn, header, TransferStatus::Received).await?
                    } else {
                        touch(txn, header).await?
                    };
                    Ok(TransferWithLines {
                        transfer: header,
                        lines,
                    })
                })
            })
            .await
            .map_err(ServiceError::from)?;

        let complete = result.transfer.status == TransferStatus::Received.as_str();
        info!(transfer_id = %transfer_id, complete, "Stock transfer received");
        self.emit(Event::TransferReceived {
            transfer_id,
            complete,
        });
        Ok(result)
    }

    /// Cancels a transfer. From draft or approved this is a pure status
    /// change. From in_transit, the still-unreceived remainder of every
    /// line is returned to the source warehouse; quantity already received
    /// stays at the destination.
    #[instrument(skip(self))]
    pub async fn cancel_transfer(
        &self,
        ctx: TenantContext,
        transfer_id: Uuid,
    ) -> Result<TransferWithLines, ServiceError> {
        let db = &*self.db;
        let result = db
            .transaction::<_, TransferWithLines, ServiceError>(move |txn| {
                Box::pin(async move {
                    let header = lock_transfer(txn, ctx.tenant_id, transfer_id).await?;
                    let status = parse_status(&header)?;
                    if !status.can_cancel() {
                        return Err(ServiceError::InvalidStateTransition(format!(
                            "cannot cancel transfer {} in status {}",
                            header.transfer_number, header.status
                        )));
                    }

                    if status == TransferStatus::InTransit {
                        let lines = load_lines(txn, transfer_id).await?;
                        let reversal_date = Utc::now().date_naive();
                        for line in &lines {
                            let unreceived = line.quantity - line.received_quantity;
                            if unreceived <= Decimal::ZERO {
                                continue;
                            }
                            MovementService::record_movement(
                                txn,
                                transfer_movement(
                                    ctx,
                                    &header,
                                    line,
                                    header.from_branch_id,
                                    header.from_warehouse_id,
                                    TransactionType::TransferIn,
                                    MovementDirection::In,
                                    unreceived,
                                    line.unit_cost,
                                    reversal_date,
                                    format!(
                                        "Transfer {} cancelled, unreceived quantity returned",
                                        header.transfer_number
                                    ),
                                ),
                            )
                            .await?;
                        }
                    }

                    let header = set_status(txn, header, TransferStatus::Cancelled).await?;
                    let lines = load_lines(txn, transfer_id).await?;
                    Ok(TransferWithLines {
                        transfer: header,
                        lines,
                    })
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(transfer_id = %transfer_id, "Stock transfer cancelled");
        self.emit(Event::TransferCancelled(transfer_id));
        Ok(result)
    }

    /// Soft-retires a draft transfer and its lines.
    #[instrument(skip(self))]
    pub async fn delete_transfer(
        &self,
        ctx: TenantContext,
        transfer_id: Uuid,
    ) -> Result<(), ServiceError> {
        let db = &*self.db;
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let header = lock_transfer(txn, ctx.tenant_id, transfer_id).await?;
                require_status(&header, TransferStatus::Draft, "delete")?;

                let now = Utc::now();
                let lines = load_lines(txn, transfer_id).await?;
                for line in lines {
                    let mut active: stock_transfer_line::ActiveModel = line.into();
                    active.deleted_at = Set(Some(now));
                    active.updated_at = Set(now);
                    active.update(txn).await.map_err(ServiceError::db_error)?;
                }

                let mut active: stock_transfer::ActiveModel = header.into();
                active.deleted_at = Set(Some(now));
                active.updated_at = Set(now);
                active.update(txn).await.map_err(ServiceError::db_error)?;
                Ok(())
            })
        })
        .await
        .map_err(ServiceError::from)?;

        info!(transfer_id = %transfer_id, "Stock transfer deleted");
        Ok(())
    }

    /// Loads a transfer with its lines.
    #[instrument(skip(self))]
    pub async fn get_transfer(
        &self,
        ctx: TenantContext,
        transfer_id: Uuid,
    ) -> Result<TransferWithLines, ServiceError> {
        let db = &*self.db;
        let header = StockTransfer::find()
            .filter(stock_transfer::Column::Id.eq(transfer_id))
            .filter(stock_transfer::Column::TenantId.eq(ctx.tenant_id))
            .filter(stock_transfer::Column::DeletedAt.is_null())
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", transfer_id)))?;
        let lines = load_lines(db, transfer_id).await?;
        Ok(TransferWithLines {
            transfer: header,
            lines,
        })
    }

    fn emit(&self, event: Event) {
        if let Err(e) = self.event_sender.try_send(event) {
            warn!("Failed to send transfer event: {}", e);
        }
    }
}

fn validate_transfer_input(input: &TransferInput) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(format!("Invalid transfer input: {}", e)))?;

    if input.from_warehouse_id == input.to_warehouse_id {
        return Err(ServiceError::InvalidInput(
            "source and destination warehouse must differ".to_string(),
        ));
    }
    match input.transfer_type {
        TransferType::InterWarehouse => {
            if input.from_branch_id != input.to_branch_id {
                return Err(ServiceError::InvalidInput(
                    "inter-warehouse transfer requires the same branch on both sides".to_string(),
                ));
            }
        }
        TransferType::InterBranch => {
            if input.from_branch_id == input.to_branch_id {
                return Err(ServiceError::InvalidInput(
                    "inter-branch transfer requires different branches".to_string(),
                ));
            }
        }
    }

    for (idx, line) in input.lines.iter().enumerate() {
        match (line.item_id, line.product_id) {
            (Some(_), None) | (None, Some(_)) => {}
            _ => {
                return Err(ServiceError::InvalidInput(format!(
                    "line {} must reference exactly one of item or product",
                    idx + 1
                )))
            }
        }
        if line.quantity <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(format!(
                "line {} quantity must be positive, got {}",
                idx + 1,
                line.quantity
            )));
        }
        if line.batch_id.is_some() && line.item_id.is_none() {
            return Err(ServiceError::InvalidInput(format!(
                "line {} batch reference requires an item line",
                idx + 1
            )));
        }
    }
    Ok(())
}

/// Batch references must resolve within the tenant and belong to the
/// line's item. Item/product existence is the calling document service's
/// concern; the engine treats those ids as opaque.
async fn check_line_batches(
    txn: &DatabaseTransaction,
    tenant_id: Uuid,
    lines: &[TransferLineInput],
) -> Result<(), ServiceError> {
    for (idx, line) in lines.iter().enumerate() {
        let Some(batch_id) = line.batch_id else {
            continue;
        };
        let batch = StockBatch::find()
            .filter(stock_batch::Column::Id.eq(batch_id))
            .filter(stock_batch::Column::TenantId.eq(tenant_id))
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))?;
        if Some(batch.item_id) != line.item_id {
            return Err(ServiceError::InvalidInput(format!(
                "line {}: batch {} does not belong to the line item",
                idx + 1,
                batch.batch_number
            )));
        }
    }
    Ok(())
}

async fn insert_lines(
    txn: &DatabaseTransaction,
    transfer_id: Uuid,
    lines: &[TransferLineInput],
) -> Result<(), ServiceError> {
    let now = Utc::now();
    for (idx, line) in lines.iter().enumerate() {
        let row = stock_transfer_line::ActiveModel {
            id: Set(Uuid::new_v4()),
            transfer_id: Set(transfer_id),
            line_number: Set(idx as i32 + 1),
            item_id: Set(line.item_id),
            product_id: Set(line.product_id),
            batch_id: Set(line.batch_id),
            quantity: Set(line.quantity),
            received_quantity: Set(Decimal::ZERO),
            unit_cost: Set(line.unit_cost),
            uom: Set(line.uom.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };
        row.insert(txn).await.map_err(ServiceError::db_error)?;
    }
    Ok(())
}

async fn load_lines<C>(
    conn: &C,
    transfer_id: Uuid,
) -> Result<Vec<stock_transfer_line::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    StockTransferLine::find()
        .filter(stock_transfer_line::Column::TransferId.eq(transfer_id))
        .filter(stock_transfer_line::Column::DeletedAt.is_null())
        .order_by_asc(stock_transfer_line::Column::LineNumber)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}

async fn lock_transfer(
    txn: &DatabaseTransaction,
    tenant_id: Uuid,
    transfer_id: Uuid,
) -> Result<stock_transfer::Model, ServiceError> {
    StockTransfer::find()
        .filter(stock_transfer::Column::Id.eq(transfer_id))
        .filter(stock_transfer::Column::TenantId.eq(tenant_id))
        .filter(stock_transfer::Column::DeletedAt.is_null())
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", transfer_id)))
}

fn parse_status(header: &stock_transfer::Model) -> Result<TransferStatus, ServiceError> {
    TransferStatus::from_str(&header.status).ok_or_else(|| {
        ServiceError::InternalError(format!("unknown transfer status {}", header.status))
    })
}

fn require_status(
    header: &stock_transfer::Model,
    expected: TransferStatus,
    action: &str,
) -> Result<(), ServiceError> {
    if parse_status(header)? != expected {
        return Err(ServiceError::InvalidStateTransition(format!(
            "cannot {} transfer {} in status {}",
            action, header.transfer_number, header.status
        )));
    }
    Ok(())
}

async fn set_status(
    txn: &DatabaseTransaction,
    header: stock_transfer::Model,
    status: TransferStatus,
) -> Result<stock_transfer::Model, ServiceError> {
    let mut active: stock_transfer::ActiveModel = header.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now());
    active.update(txn).await.map_err(ServiceError::db_error)
}

async fn touch(
    txn: &DatabaseTransaction,
    header: stock_transfer::Model,
) -> Result<stock_transfer::Model, ServiceError> {
    let mut active: stock_transfer::ActiveModel = header.into();
    active.updated_at = Set(Utc::now());
    active.update(txn).await.map_err(ServiceError::db_error)
}

/// Resolves a receipt manifest against the line set: every targeted line
/// must exist, the quantity must be positive, and cumulative receipts may
/// never exceed the quantity sent. With no manifest, everything still
/// outstanding is received.
fn resolve_receipts(
    lines: &[stock_transfer_line::Model],
    manifest: Option<Vec<ReceiptLine>>,
) -> Result<Vec<(stock_transfer_line::Model, Decimal)>, ServiceError> {
    let receipts = match manifest {
        Some(entries) => {
            if entries.is_empty() {
                return Err(ServiceError::InvalidInput(
                    "receipt manifest is empty".to_string(),
                ));
            }
            let mut receipts = Vec::with_capacity(entries.len());
            for entry in entries {
                let line = lines
                    .iter()
                    .find(|l| l.id == entry.line_id)
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!(
                            "Transfer line {} not found",
                            entry.line_id
                        ))
                    })?;
                if entry.quantity <= Decimal::ZERO {
                    return Err(ServiceError::InvalidInput(format!(
                        "receipt quantity for line {} must be positive, got {}",
                        line.line_number, entry.quantity
                    )));
                }
                if line.received_quantity + entry.quantity > line.quantity {
                    return Err(ServiceError::InvalidInput(format!(
                        "line {}: receiving {} would exceed quantity sent ({} of {} already received)",
                        line.line_number, entry.quantity, line.received_quantity, line.quantity
                    )));
                }
                receipts.push((line.clone(), entry.quantity));
            }
            receipts
        }
        None => lines
            .iter()
            .filter(|l| l.quantity > l.received_quantity)
            .map(|l| (l.clone(), l.quantity - l.received_quantity))
            .collect(),
    };

    if receipts.is_empty() {
        return Err(ServiceError::InvalidInput(
            "nothing outstanding to receive".to_string(),
        ));
    }
    Ok(receipts)
}

#[allow(clippy::too_many_arguments)]
fn transfer_movement(
    ctx: TenantContext,
    header: &stock_transfer::Model,
    line: &stock_transfer_line::Model,
    branch_id: Uuid,
    warehouse_id: Uuid,
    transaction_type: TransactionType,
    direction: MovementDirection,
    quantity: Decimal,
    unit_cost: Option<Decimal>,
    transaction_date: NaiveDate,
    narration: String,
) -> StockMovement {
    StockMovement {
        tenant_id: ctx.tenant_id,
        branch_id,
        warehouse_id,
        item_id: line.item_id,
        product_id: line.product_id,
        batch_id: line.batch_id,
        transaction_type,
        transaction_date,
        reference_type: Some("stock_transfer".to_string()),
        reference_id: Some(header.id),
        reference_number: Some(header.transfer_number.clone()),
        direction,
        quantity,
        uom: line.uom.clone(),
        unit_cost,
        serial_number: None,
        narration: Some(narration),
        created_by: ctx.actor_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line_input(quantity: Decimal) -> TransferLineInput {
        TransferLineInput {
            item_id: Some(Uuid::new_v4()),
            product_id: None,
            batch_id: None,
            quantity,
            unit_cost: None,
            uom: None,
        }
    }

    fn input(transfer_type: TransferType, same_branch: bool) -> TransferInput {
        let branch = Uuid::new_v4();
        TransferInput {
            transfer_number: "ST-0001".to_string(),
            from_branch_id: branch,
            to_branch_id: if same_branch { branch } else { Uuid::new_v4() },
            from_warehouse_id: Uuid::new_v4(),
            to_warehouse_id: Uuid::new_v4(),
            transfer_type,
            transfer_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            remarks: None,
            lines: vec![line_input(dec!(10))],
        }
    }

    fn line_model(quantity: Decimal, received: Decimal) -> stock_transfer_line::Model {
        let now = Utc::now();
        stock_transfer_line::Model {
            id: Uuid::new_v4(),
            transfer_id: Uuid::new_v4(),
            line_number: 1,
            item_id: Some(Uuid::new_v4()),
            product_id: None,
            batch_id: None,
            quantity,
            received_quantity: received,
            unit_cost: None,
            uom: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn accepts_inter_warehouse_on_same_branch() {
        assert!(validate_transfer_input(&input(TransferType::InterWarehouse, true)).is_ok());
    }

    #[test]
    fn rejects_inter_warehouse_across_branches() {
        let result = validate_transfer_input(&input(TransferType::InterWarehouse, false));
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
    }

    #[test]
    fn rejects_inter_branch_on_same_branch() {
        let result = validate_transfer_input(&input(TransferType::InterBranch, true));
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
    }

    #[test]
    fn rejects_same_source_and_destination_warehouse() {
        let mut i = input(TransferType::InterWarehouse, true);
        i.to_warehouse_id = i.from_warehouse_id;
        assert!(matches!(
            validate_transfer_input(&i),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_empty_line_set() {
        let mut i = input(TransferType::InterWarehouse, true);
        i.lines.clear();
        assert!(matches!(
            validate_transfer_input(&i),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn rejects_line_with_non_positive_quantity() {
        let mut i = input(TransferType::InterWarehouse, true);
        i.lines[0].quantity = dec!(0);
        assert!(matches!(
            validate_transfer_input(&i),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn manifest_receipt_cannot_exceed_quantity_sent() {
        let line = line_model(dec!(100), dec!(60));
        let manifest = vec![ReceiptLine {
            line_id: line.id,
            quantity: dec!(50),
        }];
        let result = resolve_receipts(&[line], Some(manifest));
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
    }

    #[test]
    fn omitted_manifest_receives_everything_outstanding() {
        let l1 = line_model(dec!(100), dec!(60));
        let l2 = line_model(dec!(50), dec!(50));
        let receipts = resolve_receipts(&[l1.clone(), l2], None).unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].0.id, l1.id);
        assert_eq!(receipts[0].1, dec!(40));
    }

    #[test]
    fn fully_received_transfer_has_nothing_outstanding() {
        let l1 = line_model(dec!(100), dec!(100));
        let result = resolve_receipts(&[l1], None);
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
    }

    #[test]
    fn empty_manifest_is_rejected() {
        let l1 = line_model(dec!(100), dec!(0));
        let result = resolve_receipts(&[l1], Some(vec![]));
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
    }
}
