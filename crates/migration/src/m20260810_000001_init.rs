use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
#[sea_orm(iden = "admin_user")]
enum AdminUser {
    Table,
    Id,
    Email,
    Name,
    Role,
    IsActive,
    LastLoginAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "admin_secret")]
enum AdminSecret {
    Table,
    AdminUserId,
    PasswordHash,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Employee {
    Table,
    Id,
    FullName,
    Email,
    Phone,
    Company,
    NetSalaryCents,
    Currency,
    KycStatus,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "salary_advance")]
enum SalaryAdvance {
    Table,
    Id,
    EmployeeId,
    AmountCents,
    ServiceFeeCents,
    TotalCents,
    Status,
    CreatedBy,
    ReviewedBy,
    RejectionReason,
    RequestedAt,
    ApprovedAt,
    DisbursedAt,
    RepaidAt,
    DueDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "transaction")]
enum Transaction {
    Table,
    Id,
    EmployeeId,
    SalaryAdvanceId,
    Kind,
    AmountCents,
    Status,
    Description,
    Reference,
    CreatedBy,
    CreatedAt,
    CompletedAt,
}

#[derive(DeriveIden)]
enum Card {
    Table,
    Id,
    EmployeeId,
    MaskedPan,
    CardholderName,
    ExpiryMonth,
    ExpiryYear,
    CardType,
    Status,
    BalanceCents,
    DailyLimitCents,
    MonthlyLimitCents,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "card_transaction")]
enum CardTransaction {
    Table,
    Id,
    CardId,
    AmountCents,
    Currency,
    Merchant,
    OccurredAt,
    CreatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "audit_log")]
enum AuditLog {
    Table,
    Id,
    AdminUserId,
    Action,
    EntityType,
    EntityId,
    Allowed,
    Reason,
    Details,
    IpAddress,
    CreatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "app_setting")]
enum AppSetting {
    Table,
    Key,
    Value,
    UpdatedBy,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AdminUser::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdminUser::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(
                        ColumnDef::new(AdminUser::Email)
                            .string_len(320)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(AdminUser::Name).string_len(256).not_null())
                    .col(ColumnDef::new(AdminUser::Role).string_len(16).not_null())
                    .col(
                        ColumnDef::new(AdminUser::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(AdminUser::LastLoginAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(AdminUser::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(AdminUser::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdminSecret::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdminSecret::AdminUserId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AdminSecret::PasswordHash)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AdminSecret::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_admin_secret_user")
                            .from(AdminSecret::Table, AdminSecret::AdminUserId)
                            .to(AdminUser::Table, AdminUser::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Employee::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Employee::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Employee::FullName).string_len(256).not_null())
                    .col(
                        ColumnDef::new(Employee::Email)
                            .string_len(320)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Employee::Phone).string_len(32))
                    .col(ColumnDef::new(Employee::Company).string_len(256))
                    .col(ColumnDef::new(Employee::NetSalaryCents).big_integer())
                    .col(
                        ColumnDef::new(Employee::Currency)
                            .string_len(3)
                            .not_null()
                            .default("MAD"),
                    )
                    .col(
                        ColumnDef::new(Employee::KycStatus)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(Employee::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Employee::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Employee::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SalaryAdvance::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SalaryAdvance::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(SalaryAdvance::EmployeeId).uuid().not_null())
                    .col(
                        ColumnDef::new(SalaryAdvance::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalaryAdvance::ServiceFeeCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalaryAdvance::TotalCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalaryAdvance::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(SalaryAdvance::CreatedBy).uuid())
                    .col(ColumnDef::new(SalaryAdvance::ReviewedBy).uuid())
                    .col(ColumnDef::new(SalaryAdvance::RejectionReason).text())
                    .col(
                        ColumnDef::new(SalaryAdvance::RequestedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(ColumnDef::new(SalaryAdvance::ApprovedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(SalaryAdvance::DisbursedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(SalaryAdvance::RepaidAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(SalaryAdvance::DueDate).date())
                    .col(
                        ColumnDef::new(SalaryAdvance::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(SalaryAdvance::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_salary_advance_employee")
                            .from(SalaryAdvance::Table, SalaryAdvance::EmployeeId)
                            .to(Employee::Table, Employee::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_salary_advance_employee")
                    .table(SalaryAdvance::Table)
                    .col(SalaryAdvance::EmployeeId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_salary_advance_status")
                    .table(SalaryAdvance::Table)
                    .col(SalaryAdvance::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transaction::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transaction::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Transaction::EmployeeId).uuid().not_null())
                    .col(ColumnDef::new(Transaction::SalaryAdvanceId).uuid())
                    .col(ColumnDef::new(Transaction::Kind).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Transaction::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transaction::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(Transaction::Description).text())
                    .col(ColumnDef::new(Transaction::Reference).string_len(100))
                    .col(ColumnDef::new(Transaction::CreatedBy).uuid())
                    .col(
                        ColumnDef::new(Transaction::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(ColumnDef::new(Transaction::CompletedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_employee")
                            .from(Transaction::Table, Transaction::EmployeeId)
                            .to(Employee::Table, Employee::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_salary_advance")
                            .from(Transaction::Table, Transaction::SalaryAdvanceId)
                            .to(SalaryAdvance::Table, SalaryAdvance::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_transaction_employee")
                    .table(Transaction::Table)
                    .col(Transaction::EmployeeId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_transaction_status")
                    .table(Transaction::Table)
                    .col(Transaction::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Card::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Card::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Card::EmployeeId).uuid().not_null())
                    .col(ColumnDef::new(Card::MaskedPan).string_len(19).not_null())
                    .col(
                        ColumnDef::new(Card::CardholderName)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Card::ExpiryMonth).small_integer().not_null())
                    .col(ColumnDef::new(Card::ExpiryYear).small_integer().not_null())
                    .col(
                        ColumnDef::new(Card::CardType)
                            .string_len(50)
                            .not_null()
                            .default("virtual"),
                    )
                    .col(
                        ColumnDef::new(Card::Status)
                            .string_len(16)
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(
                        ColumnDef::new(Card::BalanceCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Card::DailyLimitCents).big_integer())
                    .col(ColumnDef::new(Card::MonthlyLimitCents).big_integer())
                    .col(
                        ColumnDef::new(Card::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Card::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_card_employee")
                            .from(Card::Table, Card::EmployeeId)
                            .to(Employee::Table, Employee::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_card_employee")
                    .table(Card::Table)
                    .col(Card::EmployeeId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CardTransaction::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CardTransaction::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(CardTransaction::CardId).uuid().not_null())
                    .col(
                        ColumnDef::new(CardTransaction::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CardTransaction::Currency)
                            .string_len(3)
                            .not_null()
                            .default("MAD"),
                    )
                    .col(
                        ColumnDef::new(CardTransaction::Merchant)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CardTransaction::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CardTransaction::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_card_transaction_card")
                            .from(CardTransaction::Table, CardTransaction::CardId)
                            .to(Card::Table, Card::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_card_transaction_card")
                    .table(CardTransaction::Table)
                    .col(CardTransaction::CardId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuditLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditLog::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(AuditLog::AdminUserId).uuid())
                    .col(ColumnDef::new(AuditLog::Action).string_len(255).not_null())
                    .col(
                        ColumnDef::new(AuditLog::EntityType)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AuditLog::EntityId).uuid())
                    .col(ColumnDef::new(AuditLog::Allowed).boolean().not_null())
                    .col(ColumnDef::new(AuditLog::Reason).string_len(64).not_null())
                    .col(ColumnDef::new(AuditLog::Details).json_binary())
                    .col(ColumnDef::new(AuditLog::IpAddress).string_len(45))
                    .col(
                        ColumnDef::new(AuditLog::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_audit_log_admin_user")
                            .from(AuditLog::Table, AuditLog::AdminUserId)
                            .to(AdminUser::Table, AdminUser::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_audit_log_admin_user")
                    .table(AuditLog::Table)
                    .col(AuditLog::AdminUserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_audit_log_created_at")
                    .table(AuditLog::Table)
                    .col(AuditLog::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AppSetting::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AppSetting::Key)
                            .string_len(128)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AppSetting::Value).text().not_null())
                    .col(ColumnDef::new(AppSetting::UpdatedBy).uuid())
                    .col(
                        ColumnDef::new(AppSetting::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AppSetting::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AuditLog::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CardTransaction::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Card::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transaction::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SalaryAdvance::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Employee::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdminSecret::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdminUser::Table).to_owned())
            .await?;
        Ok(())
    }
}
