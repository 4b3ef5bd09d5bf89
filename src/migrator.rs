//! Embedded schema migrations for the stock engine tables.

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_stock_ledger_entries::Migration),
            Box::new(m20250301_000002_create_stock_balances::Migration),
            Box::new(m20250301_000003_create_stock_batches::Migration),
            Box::new(m20250301_000004_create_stock_transfers::Migration),
            Box::new(m20250301_000005_create_stock_transfer_lines::Migration),
        ]
    }
}

mod m20250301_000001_create_stock_ledger_entries {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_stock_ledger_entries"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockLedgerEntries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockLedgerEntries::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::TenantId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::BranchId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockLedgerEntries::ItemId).uuid().null())
                        .col(ColumnDef::new(StockLedgerEntries::ProductId).uuid().null())
                        .col(ColumnDef::new(StockLedgerEntries::BatchId).uuid().null())
                        .col(
                            ColumnDef::new(StockLedgerEntries::TransactionType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::TransactionDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::ReferenceType)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::ReferenceId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::ReferenceNumber)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::QuantityIn)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::QuantityOut)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::UnitCost)
                                .decimal_len(19, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::TotalValue)
                                .decimal_len(19, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::RunningBalance)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockLedgerEntries::Uom).string().null())
                        .col(
                            ColumnDef::new(StockLedgerEntries::SerialNumber)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(StockLedgerEntries::Narration).text().null())
                        .col(
                            ColumnDef::new(StockLedgerEntries::CreatedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_ledger_tenant_warehouse")
                        .table(StockLedgerEntries::Table)
                        .col(StockLedgerEntries::TenantId)
                        .col(StockLedgerEntries::WarehouseId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_ledger_reference")
                        .table(StockLedgerEntries::Table)
                        .col(StockLedgerEntries::ReferenceId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockLedgerEntries::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum StockLedgerEntries {
        Table,
        Id,
        TenantId,
        BranchId,
        WarehouseId,
        ItemId,
        ProductId,
        BatchId,
        TransactionType,
        TransactionDate,
        ReferenceType,
        ReferenceId,
        ReferenceNumber,
        QuantityIn,
        QuantityOut,
        UnitCost,
        TotalValue,
        RunningBalance,
        Uom,
        SerialNumber,
        Narration,
        CreatedBy,
        CreatedAt,
    }
}

mod m20250301_000002_create_stock_balances {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_stock_balances"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockBalances::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockBalances::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(StockBalances::TenantId).uuid().not_null())
                        .col(ColumnDef::new(StockBalances::ItemId).uuid().null())
                        .col(ColumnDef::new(StockBalances::ProductId).uuid().null())
                        .col(
                            ColumnDef::new(StockBalances::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBalances::AvailableQuantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBalances::ReservedQuantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBalances::OnOrderQuantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBalances::InProductionQuantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBalances::FreeQuantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBalances::LastPurchaseDate)
                                .date()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockBalances::LastMovementDate)
                                .date()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockBalances::ValuationRate)
                                .decimal_len(19, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockBalances::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBalances::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_stock_balances_key")
                        .table(StockBalances::Table)
                        .col(StockBalances::TenantId)
                        .col(StockBalances::WarehouseId)
                        .col(StockBalances::ItemId)
                        .col(StockBalances::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockBalances::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum StockBalances {
        Table,
        Id,
        TenantId,
        ItemId,
        ProductId,
        WarehouseId,
        AvailableQuantity,
        ReservedQuantity,
        OnOrderQuantity,
        InProductionQuantity,
        FreeQuantity,
        LastPurchaseDate,
        LastMovementDate,
        ValuationRate,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000003_create_stock_batches {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_stock_batches"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockBatches::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockBatches::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(StockBatches::TenantId).uuid().not_null())
                        .col(ColumnDef::new(StockBatches::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockBatches::BatchNumber)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBatches::ManufacturingDate)
                                .date()
                                .null(),
                        )
                        .col(ColumnDef::new(StockBatches::ExpiryDate).date().null())
                        .col(
                            ColumnDef::new(StockBatches::InitialQuantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBatches::CurrentQuantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBatches::UnitCost)
                                .decimal_len(19, 4)
                                .null(),
                        )
                        .col(ColumnDef::new(StockBatches::Status).string().not_null())
                        .col(
                            ColumnDef::new(StockBatches::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBatches::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_stock_batches_number")
                        .table(StockBatches::Table)
                        .col(StockBatches::TenantId)
                        .col(StockBatches::ItemId)
                        .col(StockBatches::BatchNumber)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockBatches::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum StockBatches {
        Table,
        Id,
        TenantId,
        ItemId,
        BatchNumber,
        ManufacturingDate,
        ExpiryDate,
        InitialQuantity,
        CurrentQuantity,
        UnitCost,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000004_create_stock_transfers {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000004_create_stock_transfers"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockTransfers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockTransfers::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(StockTransfers::TenantId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockTransfers::TransferNumber)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::FromBranchId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransfers::ToBranchId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockTransfers::FromWarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::ToWarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::TransferType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransfers::Status).string().not_null())
                        .col(
                            ColumnDef::new(StockTransfers::TransferDate)
                                .date()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransfers::Remarks).text().null())
                        .col(ColumnDef::new(StockTransfers::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(StockTransfers::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransfers::DeletedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_stock_transfers_number")
                        .table(StockTransfers::Table)
                        .col(StockTransfers::TenantId)
                        .col(StockTransfers::TransferNumber)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockTransfers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum StockTransfers {
        Table,
        Id,
        TenantId,
        TransferNumber,
        FromBranchId,
        ToBranchId,
        FromWarehouseId,
        ToWarehouseId,
        TransferType,
        Status,
        TransferDate,
        Remarks,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
        DeletedAt,
    }
}

mod m20250301_000005_create_stock_transfer_lines {
    use sea_orm_migration::prelude::*;

    use super::m20250301_000004_create_stock_transfers::StockTransfers;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000005_create_stock_transfer_lines"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockTransferLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockTransferLines::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(StockTransferLines::TransferId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransferLines::LineNumber)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransferLines::ItemId).uuid().null())
                        .col(ColumnDef::new(StockTransferLines::ProductId).uuid().null())
                        .col(ColumnDef::new(StockTransferLines::BatchId).uuid().null())
                        .col(
                            ColumnDef::new(StockTransferLines::Quantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransferLines::ReceivedQuantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransferLines::UnitCost)
                                .decimal_len(19, 4)
                                .null(),
                        )
                        .col(ColumnDef::new(StockTransferLines::Uom).string().null())
                        .col(
                            ColumnDef::new(StockTransferLines::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransferLines::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransferLines::DeletedAt)
                                .timestamp()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_transfer_lines_transfer")
                                .from(StockTransferLines::Table, StockTransferLines::TransferId)
                                .to(StockTransfers::Table, StockTransfers::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_transfer_lines_transfer")
                        .table(StockTransferLines::Table)
                        .col(StockTransferLines::TransferId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockTransferLines::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum StockTransferLines {
        Table,
        Id,
        TransferId,
        LineNumber,
        ItemId,
        ProductId,
        BatchId,
        Quantity,
        ReceivedQuantity,
        UnitCost,
        Uom,
        CreatedAt,
        UpdatedAt,
        DeletedAt,
    }
}
