use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tasks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tasks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tasks::TaskType).string().not_null())
                    .col(ColumnDef::new(Tasks::Status).string().not_null())
                    .col(ColumnDef::new(Tasks::Payload).json().not_null())
                    .col(ColumnDef::new(Tasks::AttemptCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Tasks::MaxAttempts).integer().not_null().default(3))
                    .col(ColumnDef::new(Tasks::NextRunAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Tasks::LastError).text())
                    .col(ColumnDef::new(Tasks::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Tasks::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Tasks::ClaimToken).uuid())
                    .col(
                        ColumnDef::new(Tasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Tasks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Eligible-task scan
        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_status_next_run_at")
                    .table(Tasks::Table)
                    .col(Tasks::Status)
                    .col(Tasks::NextRunAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Tasks {
    Table,
    Id,
    TaskType,
    Status,
    Payload,
    AttemptCount,
    MaxAttempts,
    NextRunAt,
    LastError,
    StartedAt,
    CompletedAt,
    ClaimToken,
    CreatedAt,
    UpdatedAt,
}
