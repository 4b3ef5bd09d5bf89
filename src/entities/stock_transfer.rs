use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stock transfer header. Stock movement is tied strictly to the
/// dispatch/receive/cancel transitions, never to draft/approve, so a
/// transfer can be edited or abandoned before it has any ledger footprint.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_transfers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub transfer_number: String,
    pub from_branch_id: Uuid,
    pub to_branch_id: Uuid,
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    pub transfer_type: String,
    pub status: String,
    pub transfer_date: NaiveDate,
    pub remarks: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stock_transfer_line::Entity")]
    StockTransferLines,
}

impl Related<super::stock_transfer_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockTransferLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferType {
    InterWarehouse,
    InterBranch,
}

impl TransferType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferType::InterWarehouse => "inter_warehouse",
            TransferType::InterBranch => "inter_branch",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "inter_warehouse" => Some(TransferType::InterWarehouse),
            "inter_branch" => Some(TransferType::InterBranch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    Draft,
    Approved,
    InTransit,
    Received,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Draft => "draft",
            TransferStatus::Approved => "approved",
            TransferStatus::InTransit => "in_transit",
            TransferStatus::Received => "received",
            TransferStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(TransferStatus::Draft),
            "approved" => Some(TransferStatus::Approved),
            "in_transit" => Some(TransferStatus::InTransit),
            "received" => Some(TransferStatus::Received),
            "cancelled" => Some(TransferStatus::Cancelled),
            _ => None,
        }
    }

    /// Cancellation is reachable from every non-terminal state.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            TransferStatus::Draft | TransferStatus::Approved | TransferStatus::InTransit
        )
    }
}
