use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Filings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Filings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Filings::Cik).string().not_null())
                    .col(
                        ColumnDef::new(Filings::AccessionNumber)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Filings::FilingType).string())
                    .col(ColumnDef::new(Filings::FilingDate).date())
                    .col(ColumnDef::new(Filings::ReportPeriod).date())
                    .col(ColumnDef::new(Filings::CompanyName).string())
                    .col(
                        ColumnDef::new(Filings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Filings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per accession number, concurrent writers race on this
        manager
            .create_index(
                Index::create()
                    .name("idx_filings_accession_number")
                    .table(Filings::Table)
                    .col(Filings::AccessionNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_filings_cik")
                    .table(Filings::Table)
                    .col(Filings::Cik)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Filings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Filings {
    Table,
    Id,
    Cik,
    AccessionNumber,
    FilingType,
    FilingDate,
    ReportPeriod,
    CompanyName,
    CreatedAt,
    UpdatedAt,
}
