use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transaction types recorded in the stock ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    GrnReceipt,
    ProductionIn,
    ProductionOut,
    SalesDispatch,
    TransferIn,
    TransferOut,
    Adjustment,
    Scrap,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::GrnReceipt => "grn_receipt",
            TransactionType::ProductionIn => "production_in",
            TransactionType::ProductionOut => "production_out",
            TransactionType::SalesDispatch => "sales_dispatch",
            TransactionType::TransferIn => "transfer_in",
            TransactionType::TransferOut => "transfer_out",
            TransactionType::Adjustment => "adjustment",
            TransactionType::Scrap => "scrap",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "grn_receipt" => Some(TransactionType::GrnReceipt),
            "production_in" => Some(TransactionType::ProductionIn),
            "production_out" => Some(TransactionType::ProductionOut),
            "sales_dispatch" => Some(TransactionType::SalesDispatch),
            "transfer_in" => Some(TransactionType::TransferIn),
            "transfer_out" => Some(TransactionType::TransferOut),
            "adjustment" => Some(TransactionType::Adjustment),
            "scrap" => Some(TransactionType::Scrap),
            _ => None,
        }
    }

    /// Receipt-side types carry a purchase/production cost that refreshes
    /// the balance aggregate's valuation rate.
    pub fn is_costed_receipt(&self) -> bool {
        matches!(
            self,
            TransactionType::GrnReceipt | TransactionType::ProductionIn | TransactionType::TransferIn
        )
    }
}

/// One immutable stock movement fact. Entries are only ever inserted;
/// corrections are new offsetting entries.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub branch_id: Uuid,
    pub warehouse_id: Uuid,
    pub item_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub transaction_type: String,
    pub transaction_date: NaiveDate,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub reference_number: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity_in: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity_out: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_cost: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_value: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub running_balance: Decimal,
    pub uom: Option<String>,
    pub serial_number: Option<String>,
    pub narration: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
