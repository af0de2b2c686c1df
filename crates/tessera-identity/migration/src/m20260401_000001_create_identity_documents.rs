use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IdentityDocuments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IdentityDocuments::Collection)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(IdentityDocuments::Id).string().not_null())
                    .col(ColumnDef::new(IdentityDocuments::Body).text().not_null())
                    .col(ColumnDef::new(IdentityDocuments::Stamp).string().null())
                    .col(
                        ColumnDef::new(IdentityDocuments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(IdentityDocuments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(IdentityDocuments::Collection)
                            .col(IdentityDocuments::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_identity_documents_collection_created_at")
                    .table(IdentityDocuments::Table)
                    .col(IdentityDocuments::Collection)
                    .col(IdentityDocuments::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IdentityDocuments::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum IdentityDocuments {
    Table,
    Collection,
    Id,
    Body,
    Stamp,
    CreatedAt,
    UpdatedAt,
}
