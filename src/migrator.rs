use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240201_000001_create_fleet_reference_tables::Migration),
            Box::new(m20240201_000002_create_requisitions_table::Migration),
            Box::new(m20240201_000003_create_delivery_batches_table::Migration),
            Box::new(m20240201_000004_create_packaging_tables::Migration),
            Box::new(m20240201_000005_create_slot_cost_configs_table::Migration),
        ]
    }
}

mod m20240201_000001_create_fleet_reference_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000001_create_fleet_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Drivers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Drivers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Drivers::Name).string().not_null())
                        .col(ColumnDef::new(Drivers::LicenseNumber).string().not_null())
                        .col(
                            ColumnDef::new(Drivers::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Drivers::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Vehicles::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Vehicles::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Vehicles::PlateNumber).string().not_null())
                        .col(ColumnDef::new(Vehicles::Model).string().null())
                        .col(
                            ColumnDef::new(Vehicles::CapacitySlots)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Vehicles::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Vehicles::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Vehicles::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Drivers::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Drivers {
        Table,
        Id,
        Name,
        LicenseNumber,
        Active,
        CreatedAt,
    }

    #[derive(Iden)]
    enum Vehicles {
        Table,
        Id,
        PlateNumber,
        Model,
        CapacitySlots,
        Active,
        CreatedAt,
    }
}

mod m20240201_000002_create_requisitions_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000002_create_requisitions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Requisitions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Requisitions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Requisitions::RequisitionNumber)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Requisitions::FacilityId).uuid().not_null())
                        .col(ColumnDef::new(Requisitions::WarehouseId).uuid().not_null())
                        .col(
                            ColumnDef::new(Requisitions::RequisitionType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Requisitions::Status).string().not_null())
                        .col(
                            ColumnDef::new(Requisitions::TotalItems)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Requisitions::TotalWeightKg)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Requisitions::TotalVolumeM3)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Requisitions::BatchId).uuid().null())
                        .col(ColumnDef::new(Requisitions::DecisionActor).uuid().null())
                        .col(
                            ColumnDef::new(Requisitions::DecisionReason)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(Requisitions::ApprovedAt).timestamp().null())
                        .col(ColumnDef::new(Requisitions::PackagedAt).timestamp().null())
                        .col(
                            ColumnDef::new(Requisitions::ReadyForDispatchAt)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Requisitions::AssignedToBatchAt)
                                .timestamp()
                                .null(),
                        )
                        .col(ColumnDef::new(Requisitions::InTransitAt).timestamp().null())
                        .col(ColumnDef::new(Requisitions::FulfilledAt).timestamp().null())
                        .col(ColumnDef::new(Requisitions::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Requisitions::UpdatedAt).timestamp().null())
                        .col(
                            ColumnDef::new(Requisitions::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_requisitions_status")
                        .table(Requisitions::Table)
                        .col(Requisitions::Status)
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("idx_requisitions_facility")
                        .table(Requisitions::Table)
                        .col(Requisitions::FacilityId)
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("idx_requisitions_batch")
                        .table(Requisitions::Table)
                        .col(Requisitions::BatchId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(RequisitionItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RequisitionItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequisitionItems::RequisitionId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(RequisitionItems::Name).string().not_null())
                        .col(
                            ColumnDef::new(RequisitionItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequisitionItems::UnitWeightKg)
                                .decimal()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(RequisitionItems::UnitVolumeM3)
                                .decimal()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(RequisitionItems::RequiresColdChain)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(RequisitionItems::Fragile)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(RequisitionItems::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_requisition_items_requisition")
                                .from(RequisitionItems::Table, RequisitionItems::RequisitionId)
                                .to(Requisitions::Table, Requisitions::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_requisition_items_requisition")
                        .table(RequisitionItems::Table)
                        .col(RequisitionItems::RequisitionId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(RequisitionItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Requisitions::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub(super) enum Requisitions {
        Table,
        Id,
        RequisitionNumber,
        FacilityId,
        WarehouseId,
        RequisitionType,
        Status,
        TotalItems,
        TotalWeightKg,
        TotalVolumeM3,
        BatchId,
        DecisionActor,
        DecisionReason,
        ApprovedAt,
        PackagedAt,
        ReadyForDispatchAt,
        AssignedToBatchAt,
        InTransitAt,
        FulfilledAt,
        CreatedAt,
        UpdatedAt,
        Version,
    }

    #[derive(Iden)]
    pub(super) enum RequisitionItems {
        Table,
        Id,
        RequisitionId,
        Name,
        Quantity,
        UnitWeightKg,
        UnitVolumeM3,
        RequiresColdChain,
        Fragile,
        CreatedAt,
    }
}

mod m20240201_000003_create_delivery_batches_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000003_create_delivery_batches_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DeliveryBatches::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeliveryBatches::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryBatches::BatchNumber)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryBatches::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryBatches::VehicleId).uuid().null())
                        .col(ColumnDef::new(DeliveryBatches::DriverId).uuid().null())
                        .col(
                            ColumnDef::new(DeliveryBatches::FacilityIds)
                                .json()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryBatches::OptimizedRoute)
                                .json()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryBatches::ScheduledDate)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryBatches::Status).string().not_null())
                        .col(
                            ColumnDef::new(DeliveryBatches::TotalSlotDemand)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(DeliveryBatches::BatchSnapshot).json().null())
                        .col(
                            ColumnDef::new(DeliveryBatches::IsSnapshotLocked)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(DeliveryBatches::SnapshotLockedAt)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryBatches::ActualStartTime)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryBatches::ActualEndTime)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryBatches::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryBatches::UpdatedAt).timestamp().null())
                        .col(
                            ColumnDef::new(DeliveryBatches::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_delivery_batches_status")
                        .table(DeliveryBatches::Table)
                        .col(DeliveryBatches::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DeliveryBatches::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum DeliveryBatches {
        Table,
        Id,
        BatchNumber,
        WarehouseId,
        VehicleId,
        DriverId,
        FacilityIds,
        OptimizedRoute,
        ScheduledDate,
        Status,
        TotalSlotDemand,
        BatchSnapshot,
        IsSnapshotLocked,
        SnapshotLockedAt,
        ActualStartTime,
        ActualEndTime,
        CreatedAt,
        UpdatedAt,
        Version,
    }
}

mod m20240201_000004_create_packaging_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000004_create_packaging_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(RequisitionPackaging::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RequisitionPackaging::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequisitionPackaging::RequisitionId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequisitionPackaging::TotalSlotDemand)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(RequisitionPackaging::RoundedSlotDemand)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(RequisitionPackaging::TotalWeightKg)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(RequisitionPackaging::TotalVolumeM3)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(RequisitionPackaging::TotalItems)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(RequisitionPackaging::IsFinal)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(RequisitionPackaging::ComputedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // The unique index is the guard against concurrent double-computation
            manager
                .create_index(
                    Index::create()
                        .name("uq_requisition_packaging_requisition")
                        .table(RequisitionPackaging::Table)
                        .col(RequisitionPackaging::RequisitionId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(RequisitionPackagingItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RequisitionPackagingItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequisitionPackagingItems::PackagingId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequisitionPackagingItems::RequisitionItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequisitionPackagingItems::PackagingType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequisitionPackagingItems::PackageCount)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequisitionPackagingItems::SlotCostPerPackage)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequisitionPackagingItems::SlotDemand)
                                .decimal()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_packaging_items_packaging")
                                .from(
                                    RequisitionPackagingItems::Table,
                                    RequisitionPackagingItems::PackagingId,
                                )
                                .to(RequisitionPackaging::Table, RequisitionPackaging::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_packaging_items_packaging")
                        .table(RequisitionPackagingItems::Table)
                        .col(RequisitionPackagingItems::PackagingId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(
                    Table::drop()
                        .table(RequisitionPackagingItems::Table)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_table(Table::drop().table(RequisitionPackaging::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum RequisitionPackaging {
        Table,
        Id,
        RequisitionId,
        TotalSlotDemand,
        RoundedSlotDemand,
        TotalWeightKg,
        TotalVolumeM3,
        TotalItems,
        IsFinal,
        ComputedAt,
    }

    #[derive(Iden)]
    enum RequisitionPackagingItems {
        Table,
        Id,
        PackagingId,
        RequisitionItemId,
        PackagingType,
        PackageCount,
        SlotCostPerPackage,
        SlotDemand,
    }
}

mod m20240201_000005_create_slot_cost_configs_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000005_create_slot_cost_configs_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SlotCostConfigs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SlotCostConfigs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SlotCostConfigs::PackagingType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SlotCostConfigs::SlotCost).decimal().not_null())
                        .col(
                            ColumnDef::new(SlotCostConfigs::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_slot_cost_configs_packaging_type")
                        .table(SlotCostConfigs::Table)
                        .col(SlotCostConfigs::PackagingType)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SlotCostConfigs::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum SlotCostConfigs {
        Table,
        Id,
        PackagingType,
        SlotCost,
        UpdatedAt,
    }
}
