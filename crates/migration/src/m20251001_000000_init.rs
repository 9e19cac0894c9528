//! Initial schema migration.
//!
//! Creates the four record kinds of the rental desk:
//!
//! - `bicycles`: inventory, with availability status and condition
//! - `members`: membership accounts and rental limits
//! - `rental_transactions`: one row per rental, open while `return_date` is NULL
//! - `rental_fees`: late/damage fees, one row per closed transaction

use sea_orm::ConnectionTrait;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Bicycles {
    Table,
    Id,
    Brand,
    Type,
    FrameSize,
    DailyRateMinor,
    PurchaseDate,
    Condition,
    Status,
}

#[derive(Iden)]
enum Members {
    Table,
    Id,
    Name,
    Email,
    Phone,
    MembershipType,
    Status,
    RegistrationDate,
    RentalLimit,
    MembershipEndDate,
}

#[derive(Iden)]
enum RentalTransactions {
    Table,
    Id,
    BicycleId,
    MemberId,
    RentalDate,
    ExpectedReturnDate,
    ReturnDate,
}

#[derive(Iden)]
enum RentalFees {
    Table,
    TransactionId,
    LateFeeMinor,
    DamageFeeMinor,
}

/// At most one open rental per bicycle, enforced by the store itself.
const OPEN_RENTAL_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS \
     \"idx-rental_transactions-open-bicycle_id\" \
     ON rental_transactions (bicycle_id) WHERE return_date IS NULL";

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Bicycles
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Bicycles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Bicycles::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Bicycles::Brand).string().not_null())
                    .col(ColumnDef::new(Bicycles::Type).string().not_null())
                    .col(ColumnDef::new(Bicycles::FrameSize).string().not_null())
                    .col(
                        ColumnDef::new(Bicycles::DailyRateMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Bicycles::PurchaseDate).date())
                    .col(
                        ColumnDef::new(Bicycles::Condition)
                            .string()
                            .not_null()
                            .default("Good"),
                    )
                    .col(
                        ColumnDef::new(Bicycles::Status)
                            .string()
                            .not_null()
                            .default("Available"),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-bicycles-status")
                    .table(Bicycles::Table)
                    .col(Bicycles::Status)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Members
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Members::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Members::Name).string().not_null())
                    .col(ColumnDef::new(Members::Email).string())
                    .col(ColumnDef::new(Members::Phone).string())
                    .col(
                        ColumnDef::new(Members::MembershipType)
                            .string()
                            .not_null()
                            .default("regular"),
                    )
                    .col(
                        ColumnDef::new(Members::Status)
                            .string()
                            .not_null()
                            .default("Active"),
                    )
                    .col(ColumnDef::new(Members::RegistrationDate).date().not_null())
                    .col(
                        ColumnDef::new(Members::RentalLimit)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Members::MembershipEndDate).date().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Rental transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(RentalTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RentalTransactions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RentalTransactions::BicycleId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RentalTransactions::MemberId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RentalTransactions::RentalDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RentalTransactions::ExpectedReturnDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RentalTransactions::ReturnDate).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-rental_transactions-bicycle_id")
                            .from(RentalTransactions::Table, RentalTransactions::BicycleId)
                            .to(Bicycles::Table, Bicycles::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-rental_transactions-member_id")
                            .from(RentalTransactions::Table, RentalTransactions::MemberId)
                            .to(Members::Table, Members::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-rental_transactions-member_id-return_date")
                    .table(RentalTransactions::Table)
                    .col(RentalTransactions::MemberId)
                    .col(RentalTransactions::ReturnDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-rental_transactions-bicycle_id")
                    .table(RentalTransactions::Table)
                    .col(RentalTransactions::BicycleId)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(OPEN_RENTAL_INDEX)
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Rental fees
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(RentalFees::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RentalFees::TransactionId)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RentalFees::LateFeeMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RentalFees::DamageFeeMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-rental_fees-transaction_id")
                            .from(RentalFees::Table, RentalFees::TransactionId)
                            .to(RentalTransactions::Table, RentalTransactions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(RentalFees::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RentalTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Bicycles::Table).to_owned())
            .await?;
        Ok(())
    }
}
