//! Create infraction table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Infraction::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Infraction::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Infraction::SubjectId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Infraction::IssuerId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Infraction::Severity)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Infraction::SeverityWeight)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Infraction::Reason).text().not_null())
                    .col(
                        ColumnDef::new(Infraction::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Infraction::Discarded)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (subject_id, created_at) - active warns of a user in time order
        manager
            .create_index(
                Index::create()
                    .name("idx_infraction_subject_created")
                    .table(Infraction::Table)
                    .col(Infraction::SubjectId)
                    .col(Infraction::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_infraction_discarded")
                    .table(Infraction::Table)
                    .col(Infraction::Discarded)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Infraction::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Infraction {
    Table,
    Id,
    SubjectId,
    IssuerId,
    Severity,
    SeverityWeight,
    Reason,
    CreatedAt,
    Discarded,
}
