use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "transaction")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub employee_id: Uuid,
    pub salary_advance_id: Option<Uuid>,
    pub kind: Kind,
    pub amount_cents: i64,
    pub status: Status,
    pub description: Option<String>,
    pub reference: Option<String>,
    /// Admin who created the transaction; the maker for self-approval checks.
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id"
    )]
    Employee,
    #[sea_orm(
        belongs_to = "super::salary_advance::Entity",
        from = "Column::SalaryAdvanceId",
        to = "super::salary_advance::Column::Id"
    )]
    SalaryAdvance,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl Related<super::salary_advance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalaryAdvance.def()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum Kind {
    #[sea_orm(string_value = "SALARY_ADVANCE")]
    SalaryAdvance,
    #[sea_orm(string_value = "REPAYMENT")]
    Repayment,
    #[sea_orm(string_value = "FEE")]
    Fee,
    #[sea_orm(string_value = "TRANSFER")]
    Transfer,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum Status {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "FAILED")]
    Failed,
}

impl ActiveModelBehavior for ActiveModel {}
