use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Holdings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Holdings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Holdings::FilingId).uuid().not_null())
                    .col(ColumnDef::new(Holdings::Position).integer().not_null())
                    .col(ColumnDef::new(Holdings::IssuerName).string())
                    .col(ColumnDef::new(Holdings::TitleOfClass).string())
                    .col(ColumnDef::new(Holdings::Cusip).string())
                    .col(ColumnDef::new(Holdings::Value).string())
                    .col(ColumnDef::new(Holdings::Shares).big_integer())
                    .col(ColumnDef::new(Holdings::ShareType).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_holdings_filing_id")
                            .from(Holdings::Table, Holdings::FilingId)
                            .to(Filings::Table, Filings::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_holdings_filing_id")
                    .table(Holdings::Table)
                    .col(Holdings::FilingId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_holdings_cusip")
                    .table(Holdings::Table)
                    .col(Holdings::Cusip)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Holdings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Holdings {
    Table,
    Id,
    FilingId,
    Position,
    IssuerName,
    TitleOfClass,
    Cusip,
    Value,
    Shares,
    ShareType,
}

#[derive(DeriveIden)]
enum Filings {
    Table,
    Id,
}
