use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(
            m20240101_000001_create_payment_orders_table::Migration,
        )]
    }
}

mod m20240101_000001_create_payment_orders_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_payment_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Aligned with entities::payment_order::Model
            manager
                .create_table(
                    Table::create()
                        .table(PaymentOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentOrders::CustomerName).string().not_null())
                        .col(ColumnDef::new(PaymentOrders::Phone).string().not_null())
                        .col(ColumnDef::new(PaymentOrders::Email).string().null())
                        .col(ColumnDef::new(PaymentOrders::Address).string().null())
                        .col(ColumnDef::new(PaymentOrders::Service).string().null())
                        .col(
                            ColumnDef::new(PaymentOrders::AmountMinor)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentOrders::Status).string().not_null())
                        .col(ColumnDef::new(PaymentOrders::TransactionId).string().null())
                        .col(ColumnDef::new(PaymentOrders::PaymentMethod).string().null())
                        .col(
                            ColumnDef::new(PaymentOrders::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentOrders::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payment_orders_status")
                        .table(PaymentOrders::Table)
                        .col(PaymentOrders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payment_orders_created_at")
                        .table(PaymentOrders::Table)
                        .col(PaymentOrders::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PaymentOrders::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum PaymentOrders {
        Table,
        Id,
        CustomerName,
        Phone,
        Email,
        Address,
        Service,
        AmountMinor,
        Status,
        TransactionId,
        PaymentMethod,
        CreatedAt,
        UpdatedAt,
    }
}
