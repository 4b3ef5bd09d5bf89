use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::{
        stock_balance::{self, Entity as StockBalance},
        stock_ledger_entry::{self, Entity as StockLedgerEntry},
    },
    errors::ServiceError,
    services::movements::BalanceKey,
};

/// Filters for a ledger history lookup. Everything besides the tenant is
/// optional; unset filters widen the result.
#[derive(Debug, Clone, Default)]
pub struct LedgerHistoryFilter {
    pub warehouse_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub reference_id: Option<Uuid>,
}

/// Read-only reporting surface over the ledger and the balance aggregate.
#[derive(Clone)]
pub struct StockQueryService {
    db: Arc<DatabaseConnection>,
}

impl StockQueryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Paginated movement history, newest first.
    #[instrument(skip(self))]
    pub async fn ledger_history(
        &self,
        tenant_id: Uuid,
        filter: LedgerHistoryFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<stock_ledger_entry::Model>, u64), ServiceError> {
        if page == 0 || limit == 0 {
            return Err(ServiceError::InvalidInput(
                "page and limit must be positive".to_string(),
            ));
        }

        let db = &*self.db;
        let mut query = StockLedgerEntry::find()
            .filter(stock_ledger_entry::Column::TenantId.eq(tenant_id));
        if let Some(warehouse_id) = filter.warehouse_id {
            query = query.filter(stock_ledger_entry::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(item_id) = filter.item_id {
            query = query.filter(stock_ledger_entry::Column::ItemId.eq(item_id));
        }
        if let Some(product_id) = filter.product_id {
            query = query.filter(stock_ledger_entry::Column::ProductId.eq(product_id));
        }
        if let Some(batch_id) = filter.batch_id {
            query = query.filter(stock_ledger_entry::Column::BatchId.eq(batch_id));
        }
        if let Some(reference_id) = filter.reference_id {
            query = query.filter(stock_ledger_entry::Column::ReferenceId.eq(reference_id));
        }

        let paginator = query
            .order_by_desc(stock_ledger_entry::Column::CreatedAt)
            .paginate(db, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let entries = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;
        Ok((entries, total))
    }

    /// All balance rows of one warehouse.
    #[instrument(skip(self))]
    pub async fn warehouse_balances(
        &self,
        tenant_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<Vec<stock_balance::Model>, ServiceError> {
        let db = &*self.db;
        StockBalance::find()
            .filter(stock_balance::Column::TenantId.eq(tenant_id))
            .filter(stock_balance::Column::WarehouseId.eq(warehouse_id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Total inventory value of one warehouse: Σ available × valuation rate
    /// over rows that carry a rate.
    #[instrument(skip(self))]
    pub async fn stock_valuation(
        &self,
        tenant_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<Decimal, ServiceError> {
        let balances = self.warehouse_balances(tenant_id, warehouse_id).await?;
        Ok(balances
            .iter()
            .filter_map(|b| b.valuation_rate.map(|rate| b.available_quantity * rate))
            .sum())
    }

    /// Latest ledger entry for a balance key, i.e. the entry whose running
    /// balance the aggregate must currently equal.
    #[instrument(skip(self))]
    pub async fn latest_entry(
        &self,
        key: BalanceKey,
    ) -> Result<Option<stock_ledger_entry::Model>, ServiceError> {
        let db = &*self.db;
        let mut query = StockLedgerEntry::find()
            .filter(stock_ledger_entry::Column::TenantId.eq(key.tenant_id))
            .filter(stock_ledger_entry::Column::WarehouseId.eq(key.warehouse_id));
        if let Some(item_id) = key.item_id {
            query = query.filter(stock_ledger_entry::Column::ItemId.eq(item_id));
        }
        if let Some(product_id) = key.product_id {
            query = query.filter(stock_ledger_entry::Column::ProductId.eq(product_id));
        }
        query
            .order_by_desc(stock_ledger_entry::Column::CreatedAt)
            .one(db)
            .await
            .map_err(ServiceError::db_error)
    }
}
