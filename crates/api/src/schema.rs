use crate::audit::record_action;
use crate::auth::{issue_token, role_from_entity, role_to_entity, AuthConfig, SESSION_COOKIE};
use std::sync::Arc;

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use async_graphql::{
    Context, EmptySubscription, Enum, Error, ErrorExtensions, InputObject, Object, Schema,
    SimpleObject, ID,
};
use authz::{
    ActionableEntity, AuthorizationEngine, AuthzError, DecisionReason, Permission, Principal, Role,
};
use chrono::{NaiveDate, Utc};
use entity::{
    admin_secret, admin_user, app_setting, audit_log, card, card_transaction, employee,
    salary_advance, transaction,
};
use sea_orm::sea_query::{Expr, Func, OnConflict};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection,
    DbErr, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use serde_json::json;
use tracing::info_span;
use uuid::Uuid;

pub struct AppSchema(pub Schema<QueryRoot, MutationRoot, EmptySubscription>);

pub fn build_schema(
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthConfig>,
    engine: Arc<AuthorizationEngine>,
) -> AppSchema {
    let schema = Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(db)
        .data(auth)
        .data(engine)
        .finish();
    AppSchema(schema)
}

pub struct QueryRoot;
pub struct MutationRoot;

const MAX_PAGE: i32 = 200;

#[Object]
impl QueryRoot {
    async fn admin(&self) -> AdminQuery {
        AdminQuery
    }
}

#[Object]
impl MutationRoot {
    async fn admin(&self) -> AdminMutation {
        AdminMutation
    }
}

#[derive(Default)]
pub struct AdminQuery;

#[derive(Default)]
pub struct AdminMutation;

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum AdminRole {
    #[graphql(name = "MAKER")]
    Maker,
    #[graphql(name = "CHECKER")]
    Checker,
    #[graphql(name = "SUPPORT")]
    Support,
    #[graphql(name = "SUPER_ADMIN")]
    SuperAdmin,
}

impl From<Role> for AdminRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Maker => AdminRole::Maker,
            Role::Checker => AdminRole::Checker,
            Role::Support => AdminRole::Support,
            Role::SuperAdmin => AdminRole::SuperAdmin,
        }
    }
}

impl From<AdminRole> for Role {
    fn from(role: AdminRole) -> Self {
        match role {
            AdminRole::Maker => Role::Maker,
            AdminRole::Checker => Role::Checker,
            AdminRole::Support => Role::Support,
            AdminRole::SuperAdmin => Role::SuperAdmin,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum KycStatus {
    #[graphql(name = "PENDING")]
    Pending,
    #[graphql(name = "IN_PROGRESS")]
    InProgress,
    #[graphql(name = "VERIFIED")]
    Verified,
    #[graphql(name = "REJECTED")]
    Rejected,
}

impl From<employee::KycStatus> for KycStatus {
    fn from(status: employee::KycStatus) -> Self {
        match status {
            employee::KycStatus::Pending => KycStatus::Pending,
            employee::KycStatus::InProgress => KycStatus::InProgress,
            employee::KycStatus::Verified => KycStatus::Verified,
            employee::KycStatus::Rejected => KycStatus::Rejected,
        }
    }
}

impl From<KycStatus> for employee::KycStatus {
    fn from(status: KycStatus) -> Self {
        match status {
            KycStatus::Pending => employee::KycStatus::Pending,
            KycStatus::InProgress => employee::KycStatus::InProgress,
            KycStatus::Verified => employee::KycStatus::Verified,
            KycStatus::Rejected => employee::KycStatus::Rejected,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum AdvanceStatus {
    #[graphql(name = "PENDING")]
    Pending,
    #[graphql(name = "APPROVED")]
    Approved,
    #[graphql(name = "DISBURSED")]
    Disbursed,
    #[graphql(name = "REPAID")]
    Repaid,
    #[graphql(name = "REJECTED")]
    Rejected,
}

impl From<salary_advance::Status> for AdvanceStatus {
    fn from(status: salary_advance::Status) -> Self {
        match status {
            salary_advance::Status::Pending => AdvanceStatus::Pending,
            salary_advance::Status::Approved => AdvanceStatus::Approved,
            salary_advance::Status::Disbursed => AdvanceStatus::Disbursed,
            salary_advance::Status::Repaid => AdvanceStatus::Repaid,
            salary_advance::Status::Rejected => AdvanceStatus::Rejected,
        }
    }
}

impl From<AdvanceStatus> for salary_advance::Status {
    fn from(status: AdvanceStatus) -> Self {
        match status {
            AdvanceStatus::Pending => salary_advance::Status::Pending,
            AdvanceStatus::Approved => salary_advance::Status::Approved,
            AdvanceStatus::Disbursed => salary_advance::Status::Disbursed,
            AdvanceStatus::Repaid => salary_advance::Status::Repaid,
            AdvanceStatus::Rejected => salary_advance::Status::Rejected,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransactionKind {
    #[graphql(name = "SALARY_ADVANCE")]
    SalaryAdvance,
    #[graphql(name = "REPAYMENT")]
    Repayment,
    #[graphql(name = "FEE")]
    Fee,
    #[graphql(name = "TRANSFER")]
    Transfer,
}

impl From<transaction::Kind> for TransactionKind {
    fn from(kind: transaction::Kind) -> Self {
        match kind {
            transaction::Kind::SalaryAdvance => TransactionKind::SalaryAdvance,
            transaction::Kind::Repayment => TransactionKind::Repayment,
            transaction::Kind::Fee => TransactionKind::Fee,
            transaction::Kind::Transfer => TransactionKind::Transfer,
        }
    }
}

impl From<TransactionKind> for transaction::Kind {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::SalaryAdvance => transaction::Kind::SalaryAdvance,
            TransactionKind::Repayment => transaction::Kind::Repayment,
            TransactionKind::Fee => transaction::Kind::Fee,
            TransactionKind::Transfer => transaction::Kind::Transfer,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransactionStatus {
    #[graphql(name = "PENDING")]
    Pending,
    #[graphql(name = "COMPLETED")]
    Completed,
    #[graphql(name = "FAILED")]
    Failed,
}

impl From<transaction::Status> for TransactionStatus {
    fn from(status: transaction::Status) -> Self {
        match status {
            transaction::Status::Pending => TransactionStatus::Pending,
            transaction::Status::Completed => TransactionStatus::Completed,
            transaction::Status::Failed => TransactionStatus::Failed,
        }
    }
}

impl From<TransactionStatus> for transaction::Status {
    fn from(status: TransactionStatus) -> Self {
        match status {
            TransactionStatus::Pending => transaction::Status::Pending,
            TransactionStatus::Completed => transaction::Status::Completed,
            TransactionStatus::Failed => transaction::Status::Failed,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum CardStatus {
    #[graphql(name = "ACTIVE")]
    Active,
    #[graphql(name = "FROZEN")]
    Frozen,
    #[graphql(name = "BLOCKED")]
    Blocked,
    #[graphql(name = "EXPIRED")]
    Expired,
}

impl From<card::Status> for CardStatus {
    fn from(status: card::Status) -> Self {
        match status {
            card::Status::Active => CardStatus::Active,
            card::Status::Frozen => CardStatus::Frozen,
            card::Status::Blocked => CardStatus::Blocked,
            card::Status::Expired => CardStatus::Expired,
        }
    }
}

impl From<CardStatus> for card::Status {
    fn from(status: CardStatus) -> Self {
        match status {
            CardStatus::Active => card::Status::Active,
            CardStatus::Frozen => card::Status::Frozen,
            CardStatus::Blocked => card::Status::Blocked,
            CardStatus::Expired => card::Status::Expired,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AdminUserNode {
    pub id: ID,
    pub email: String,
    pub name: String,
    pub role: AdminRole,
    pub role_display_name: String,
    pub role_description: String,
    pub is_active: bool,
    pub last_login_at: Option<chrono::DateTime<Utc>>,
    pub created_at: chrono::DateTime<Utc>,
}

impl AdminUserNode {
    fn from_model(model: admin_user::Model) -> Self {
        let role = role_from_entity(model.role);
        Self {
            id: ID(model.id.to_string()),
            email: model.email,
            name: model.name,
            role: role.into(),
            role_display_name: role.display_name().to_string(),
            role_description: role.description().to_string(),
            is_active: model.is_active,
            last_login_at: model.last_login_at.map(Into::into),
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct EmployeeNode {
    pub id: ID,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub net_salary_cents: Option<i64>,
    pub currency: String,
    pub kyc_status: KycStatus,
    pub is_active: bool,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<employee::Model> for EmployeeNode {
    fn from(model: employee::Model) -> Self {
        Self {
            id: ID(model.id.to_string()),
            full_name: model.full_name,
            email: model.email,
            phone: model.phone,
            company: model.company,
            net_salary_cents: model.net_salary_cents,
            currency: model.currency,
            kyc_status: model.kyc_status.into(),
            is_active: model.is_active,
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AdvanceNode {
    pub id: ID,
    pub employee_id: ID,
    pub amount_cents: i64,
    pub service_fee_cents: i64,
    pub total_cents: i64,
    pub status: AdvanceStatus,
    pub created_by: Option<ID>,
    pub reviewed_by: Option<ID>,
    pub rejection_reason: Option<String>,
    pub requested_at: chrono::DateTime<Utc>,
    pub approved_at: Option<chrono::DateTime<Utc>>,
    pub due_date: Option<NaiveDate>,
}

impl From<salary_advance::Model> for AdvanceNode {
    fn from(model: salary_advance::Model) -> Self {
        Self {
            id: ID(model.id.to_string()),
            employee_id: ID(model.employee_id.to_string()),
            amount_cents: model.amount_cents,
            service_fee_cents: model.service_fee_cents,
            total_cents: model.total_cents,
            status: model.status.into(),
            created_by: model.created_by.map(|id| ID(id.to_string())),
            reviewed_by: model.reviewed_by.map(|id| ID(id.to_string())),
            rejection_reason: model.rejection_reason,
            requested_at: model.requested_at.into(),
            approved_at: model.approved_at.map(Into::into),
            due_date: model.due_date,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct TransactionNode {
    pub id: ID,
    pub employee_id: ID,
    pub salary_advance_id: Option<ID>,
    pub kind: TransactionKind,
    pub amount_cents: i64,
    pub status: TransactionStatus,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub created_by: Option<ID>,
    pub created_at: chrono::DateTime<Utc>,
    pub completed_at: Option<chrono::DateTime<Utc>>,
}

impl From<transaction::Model> for TransactionNode {
    fn from(model: transaction::Model) -> Self {
        Self {
            id: ID(model.id.to_string()),
            employee_id: ID(model.employee_id.to_string()),
            salary_advance_id: model.salary_advance_id.map(|id| ID(id.to_string())),
            kind: model.kind.into(),
            amount_cents: model.amount_cents,
            status: model.status.into(),
            description: model.description,
            reference: model.reference,
            created_by: model.created_by.map(|id| ID(id.to_string())),
            created_at: model.created_at.into(),
            completed_at: model.completed_at.map(Into::into),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct CardNode {
    pub id: ID,
    pub employee_id: ID,
    pub masked_pan: String,
    pub cardholder_name: String,
    pub expiry_month: i32,
    pub expiry_year: i32,
    pub card_type: String,
    pub status: CardStatus,
    pub balance_cents: i64,
    pub daily_limit_cents: Option<i64>,
    pub monthly_limit_cents: Option<i64>,
}

impl From<card::Model> for CardNode {
    fn from(model: card::Model) -> Self {
        Self {
            id: ID(model.id.to_string()),
            employee_id: ID(model.employee_id.to_string()),
            masked_pan: model.masked_pan,
            cardholder_name: model.cardholder_name,
            expiry_month: model.expiry_month as i32,
            expiry_year: model.expiry_year as i32,
            card_type: model.card_type,
            status: model.status.into(),
            balance_cents: model.balance_cents,
            daily_limit_cents: model.daily_limit_cents,
            monthly_limit_cents: model.monthly_limit_cents,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct CardTransactionNode {
    pub id: ID,
    pub card_id: ID,
    pub amount_cents: i64,
    pub currency: String,
    pub merchant: String,
    pub occurred_at: chrono::DateTime<Utc>,
}

impl From<card_transaction::Model> for CardTransactionNode {
    fn from(model: card_transaction::Model) -> Self {
        Self {
            id: ID(model.id.to_string()),
            card_id: ID(model.card_id.to_string()),
            amount_cents: model.amount_cents,
            currency: model.currency,
            merchant: model.merchant,
            occurred_at: model.occurred_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AuditLogNode {
    pub id: ID,
    pub admin_user_id: Option<ID>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<ID>,
    pub allowed: bool,
    pub reason: String,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<audit_log::Model> for AuditLogNode {
    fn from(model: audit_log::Model) -> Self {
        Self {
            id: ID(model.id.to_string()),
            admin_user_id: model.admin_user_id.map(|id| ID(id.to_string())),
            action: model.action,
            entity_type: model.entity_type,
            entity_id: model.entity_id.map(|id| ID(id.to_string())),
            allowed: model.allowed,
            reason: model.reason,
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct SettingNode {
    pub key: String,
    pub value: String,
    pub updated_at: chrono::DateTime<Utc>,
}

impl From<app_setting::Model> for SettingNode {
    fn from(model: app_setting::Model) -> Self {
        Self {
            key: model.key,
            value: model.value,
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct DashboardStats {
    pub employee_count: i64,
    pub pending_advance_count: i64,
    pub pending_transaction_count: i64,
    pub outstanding_advance_cents: i64,
    pub active_card_count: i64,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AuthPayload {
    pub ok: bool,
    pub user: Option<AdminUserNode>,
    pub token: Option<String>,
    pub error: Option<String>,
}

impl AuthPayload {
    fn failed(message: &str) -> Self {
        Self {
            ok: false,
            user: None,
            token: None,
            error: Some(message.to_string()),
        }
    }
}

#[derive(InputObject, Clone, Debug)]
pub struct NewEmployeeInput {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub net_salary_cents: Option<i64>,
    pub currency: Option<String>,
}

#[derive(InputObject, Clone, Debug)]
pub struct UpdateEmployeeInput {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub net_salary_cents: Option<i64>,
    pub kyc_status: Option<KycStatus>,
    pub is_active: Option<bool>,
}

#[derive(InputObject, Clone, Debug)]
pub struct NewAdvanceInput {
    pub employee_id: ID,
    pub amount_cents: i64,
    pub due_date: Option<NaiveDate>,
}

#[derive(InputObject, Clone, Debug)]
pub struct NewTransactionInput {
    pub employee_id: ID,
    pub kind: TransactionKind,
    pub amount_cents: i64,
    pub description: Option<String>,
    pub salary_advance_id: Option<ID>,
}

#[derive(InputObject, Clone, Debug)]
pub struct NewAdminUserInput {
    pub email: String,
    pub name: String,
    pub role: AdminRole,
    pub password: String,
}

#[derive(InputObject, Clone, Debug)]
pub struct UpdateAdminUserInput {
    pub role: Option<AdminRole>,
    pub is_active: Option<bool>,
}

#[Object]
impl AdminQuery {
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<AdminUserNode> {
        let principal = current_principal(ctx)?;
        let db = database(ctx)?;
        let model = admin_user::Entity::find_by_id(principal.id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("UNAUTHENTICATED", "User not found"))?;
        Ok(AdminUserNode::from_model(model))
    }

    async fn employees(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
        q: Option<String>,
        #[graphql(name = "kycStatus")] kyc_status: Option<KycStatus>,
    ) -> async_graphql::Result<Vec<EmployeeNode>> {
        require_permission(ctx, Permission::ViewEmployees, None)?;
        let db = database(ctx)?;
        let (limit, skip) = page(first, offset)?;
        let span = info_span!("admin.employees.list", has_q = q.is_some(), first = limit);
        let _guard = span.enter();
        let mut query = employee::Entity::find();
        if let Some(filter) = sanitize_optional_filter(q) {
            let pattern = format!("%{}%", filter.to_lowercase());
            let name_expr = Expr::expr(Func::lower(Expr::col(employee::Column::FullName)));
            let email_expr = Expr::expr(Func::lower(Expr::col(employee::Column::Email)));
            query = query.filter(
                Condition::any()
                    .add(name_expr.like(pattern.clone()))
                    .add(email_expr.like(pattern)),
            );
        }
        if let Some(status) = kyc_status {
            query = query.filter(employee::Column::KycStatus.eq(employee::KycStatus::from(status)));
        }
        let rows = query
            .order_by_asc(employee::Column::FullName)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(EmployeeNode::from).collect())
    }

    async fn employee(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<Option<EmployeeNode>> {
        require_permission(ctx, Permission::ViewEmployees, None)?;
        let db = database(ctx)?;
        let employee_id = parse_uuid(&id)?;
        let record = employee::Entity::find_by_id(employee_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(record.map(EmployeeNode::from))
    }

    async fn transactions(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
        status: Option<TransactionStatus>,
        kind: Option<TransactionKind>,
    ) -> async_graphql::Result<Vec<TransactionNode>> {
        require_permission(ctx, Permission::ViewTransactions, None)?;
        let db = database(ctx)?;
        let (limit, skip) = page(first, offset)?;
        let mut query = transaction::Entity::find();
        if let Some(status) = status {
            query = query.filter(transaction::Column::Status.eq(transaction::Status::from(status)));
        }
        if let Some(kind) = kind {
            query = query.filter(transaction::Column::Kind.eq(transaction::Kind::from(kind)));
        }
        let rows = query
            .order_by_desc(transaction::Column::CreatedAt)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(TransactionNode::from).collect())
    }

    #[graphql(name = "salaryAdvances")]
    async fn salary_advances(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
        status: Option<AdvanceStatus>,
    ) -> async_graphql::Result<Vec<AdvanceNode>> {
        require_permission(ctx, Permission::ViewAdvances, None)?;
        let db = database(ctx)?;
        let (limit, skip) = page(first, offset)?;
        let mut query = salary_advance::Entity::find();
        if let Some(status) = status {
            query = query
                .filter(salary_advance::Column::Status.eq(salary_advance::Status::from(status)));
        }
        let rows = query
            .order_by_desc(salary_advance::Column::RequestedAt)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(AdvanceNode::from).collect())
    }

    async fn cards(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
        status: Option<CardStatus>,
    ) -> async_graphql::Result<Vec<CardNode>> {
        require_permission(ctx, Permission::ViewCards, None)?;
        let db = database(ctx)?;
        let (limit, skip) = page(first, offset)?;
        let mut query = card::Entity::find();
        if let Some(status) = status {
            query = query.filter(card::Column::Status.eq(card::Status::from(status)));
        }
        let rows = query
            .order_by_desc(card::Column::CreatedAt)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(CardNode::from).collect())
    }

    #[graphql(name = "cardTransactions")]
    async fn card_transactions(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "cardId")] card_id: ID,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<CardTransactionNode>> {
        require_permission(ctx, Permission::ViewCardTransactions, None)?;
        let db = database(ctx)?;
        let card_uuid = parse_uuid(&card_id)?;
        let (limit, skip) = page(first, offset)?;
        let rows = card_transaction::Entity::find()
            .filter(card_transaction::Column::CardId.eq(card_uuid))
            .order_by_desc(card_transaction::Column::OccurredAt)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(CardTransactionNode::from).collect())
    }

    #[graphql(name = "adminUsers")]
    async fn admin_users(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<AdminUserNode>> {
        require_permission(ctx, Permission::ManageUsers, None)?;
        let db = database(ctx)?;
        let (limit, skip) = page(first, offset)?;
        let rows = admin_user::Entity::find()
            .order_by_asc(admin_user::Column::Email)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(AdminUserNode::from_model).collect())
    }

    #[graphql(name = "auditLogs")]
    async fn audit_logs(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
        action: Option<String>,
    ) -> async_graphql::Result<Vec<AuditLogNode>> {
        require_permission(ctx, Permission::ViewAuditLogs, None)?;
        let db = database(ctx)?;
        let (limit, skip) = page(first, offset)?;
        let mut query = audit_log::Entity::find();
        if let Some(action) = sanitize_optional_filter(action) {
            query = query.filter(audit_log::Column::Action.eq(action));
        }
        let rows = query
            .order_by_desc(audit_log::Column::CreatedAt)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(AuditLogNode::from).collect())
    }

    async fn settings(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<SettingNode>> {
        require_permission(ctx, Permission::ManageSettings, None)?;
        let db = database(ctx)?;
        let rows = app_setting::Entity::find()
            .order_by_asc(app_setting::Column::Key)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(SettingNode::from).collect())
    }

    #[graphql(name = "dashboardStats")]
    async fn dashboard_stats(&self, ctx: &Context<'_>) -> async_graphql::Result<DashboardStats> {
        require_permission(ctx, Permission::ViewReports, None)?;
        let db = database(ctx)?;
        let span = info_span!("admin.dashboardStats");
        let _guard = span.enter();

        let employee_count = employee::Entity::find()
            .filter(employee::Column::IsActive.eq(true))
            .count(db.as_ref())
            .await
            .map_err(db_error)? as i64;
        let pending_advance_count = salary_advance::Entity::find()
            .filter(salary_advance::Column::Status.eq(salary_advance::Status::Pending))
            .count(db.as_ref())
            .await
            .map_err(db_error)? as i64;
        let pending_transaction_count = transaction::Entity::find()
            .filter(transaction::Column::Status.eq(transaction::Status::Pending))
            .count(db.as_ref())
            .await
            .map_err(db_error)? as i64;
        let active_card_count = card::Entity::find()
            .filter(card::Column::Status.eq(card::Status::Active))
            .count(db.as_ref())
            .await
            .map_err(db_error)? as i64;

        #[derive(FromQueryResult)]
        struct SumRow {
            total: Option<i64>,
        }
        let outstanding = salary_advance::Entity::find()
            .select_only()
            .column_as(Expr::col(salary_advance::Column::TotalCents).sum(), "total")
            .filter(
                salary_advance::Column::Status.is_in([
                    salary_advance::Status::Approved,
                    salary_advance::Status::Disbursed,
                ]),
            )
            .into_model::<SumRow>()
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .and_then(|row| row.total)
            .unwrap_or(0);

        Ok(DashboardStats {
            employee_count,
            pending_advance_count,
            pending_transaction_count,
            outstanding_advance_cents: outstanding,
            active_card_count,
        })
    }

    /// CSV export of the transaction ledger. Gated separately from viewing
    /// because exports leave the system.
    #[graphql(name = "exportTransactionsCsv")]
    async fn export_transactions_csv(
        &self,
        ctx: &Context<'_>,
        status: Option<TransactionStatus>,
    ) -> async_graphql::Result<String> {
        let principal = require_permission(ctx, Permission::ExportData, None)?;
        let db = database(ctx)?;
        let mut query = transaction::Entity::find();
        if let Some(status) = status {
            query = query.filter(transaction::Column::Status.eq(transaction::Status::from(status)));
        }
        let rows = query
            .order_by_desc(transaction::Column::CreatedAt)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        let mut csv =
            String::from("id,employee_id,kind,amount_cents,status,reference,created_at\n");
        for row in &rows {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{}\n",
                row.id,
                row.employee_id,
                row.kind.to_value(),
                row.amount_cents,
                row.status.to_value(),
                row.reference.as_deref().unwrap_or(""),
                row.created_at.to_rfc3339(),
            ));
        }
        record_action(
            db.as_ref(),
            principal.id,
            "export_transactions",
            "transaction",
            None,
            Some(json!({ "rows": rows.len() })),
        )
        .await
        .map_err(db_error)?;
        Ok(csv)
    }
}

#[Object]
impl AdminMutation {
    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> async_graphql::Result<AuthPayload> {
        let auth = auth_config(ctx)?;
        if !auth.local_auth_enabled {
            return Err(error_with_code(
                "FORBIDDEN",
                "Local authentication is disabled",
            ));
        }
        let db = database(ctx)?;
        let normalized = normalize_email(&email)?;
        let user = admin_user::Entity::find()
            .filter(admin_user::Column::Email.eq(normalized))
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        let Some(user) = user else {
            return Ok(AuthPayload::failed("Invalid credentials"));
        };
        if !user.is_active {
            return Ok(AuthPayload::failed("Account disabled"));
        }
        let secret = admin_secret::Entity::find_by_id(user.id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        let Some(secret) = secret else {
            return Ok(AuthPayload::failed("Invalid credentials"));
        };
        let parsed_hash = PasswordHash::new(&secret.password_hash)
            .map_err(|_| error_with_code("INTERNAL", "Invalid password hash"))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            return Ok(AuthPayload::failed("Invalid credentials"));
        }
        let role = role_from_entity(user.role);
        let token = issue_token(user.id, role, &auth)
            .map_err(|_| error_with_code("INTERNAL", "Failed to issue session token"))?;
        append_session_cookie(ctx, &token, auth.session_ttl_minutes);

        let mut active: admin_user::ActiveModel = user.clone().into();
        active.last_login_at = Set(Some(Utc::now().into()));
        let user = active.update(db.as_ref()).await.map_err(db_error)?;
        record_action(db.as_ref(), user.id, "login", "admin_user", Some(user.id), None)
            .await
            .map_err(db_error)?;
        Ok(AuthPayload {
            ok: true,
            user: Some(AdminUserNode::from_model(user)),
            token: Some(token),
            error: None,
        })
    }

    async fn logout(&self, ctx: &Context<'_>) -> async_graphql::Result<bool> {
        append_session_cookie(ctx, "", -1);
        Ok(true)
    }

    #[graphql(name = "createEmployee")]
    async fn create_employee(
        &self,
        ctx: &Context<'_>,
        input: NewEmployeeInput,
    ) -> async_graphql::Result<EmployeeNode> {
        let principal = require_permission(ctx, Permission::CreateEmployee, None)?;
        let db = database(ctx)?;
        let email = normalize_email(&input.email)?;
        let full_name = validate_name(&input.full_name)?;
        let now = Utc::now();
        let model = employee::ActiveModel {
            id: Set(Uuid::new_v4()),
            full_name: Set(full_name),
            email: Set(email),
            phone: Set(input.phone),
            company: Set(input.company),
            net_salary_cents: Set(input.net_salary_cents),
            currency: Set(input.currency.unwrap_or_else(|| "MAD".to_string())),
            kyc_status: Set(employee::KycStatus::Pending),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        record_action(
            db.as_ref(),
            principal.id,
            "create_employee",
            "employee",
            Some(model.id),
            None,
        )
        .await
        .map_err(db_error)?;
        Ok(EmployeeNode::from(model))
    }

    #[graphql(name = "updateEmployee")]
    async fn update_employee(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: UpdateEmployeeInput,
    ) -> async_graphql::Result<EmployeeNode> {
        let principal = require_permission(ctx, Permission::EditEmployee, None)?;
        let db = database(ctx)?;
        let employee_id = parse_uuid(&id)?;
        let model = employee::Entity::find_by_id(employee_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Employee not found"))?;
        let mut active: employee::ActiveModel = model.into();
        if let Some(full_name) = input.full_name {
            active.full_name = Set(validate_name(&full_name)?);
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(company) = input.company {
            active.company = Set(Some(company));
        }
        if let Some(net_salary_cents) = input.net_salary_cents {
            active.net_salary_cents = Set(Some(net_salary_cents));
        }
        if let Some(kyc_status) = input.kyc_status {
            active.kyc_status = Set(kyc_status.into());
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().into());
        let model = active.update(db.as_ref()).await.map_err(db_error)?;
        record_action(
            db.as_ref(),
            principal.id,
            "update_employee",
            "employee",
            Some(model.id),
            None,
        )
        .await
        .map_err(db_error)?;
        Ok(EmployeeNode::from(model))
    }

    #[graphql(name = "deleteEmployee")]
    async fn delete_employee(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let db = database(ctx)?;
        let employee_id = parse_uuid(&id)?;
        // No creator concept on employees; the entity is passed for the audit
        // trail only.
        let target = ActionableEntity::new(employee_id, None);
        let principal = require_permission(ctx, Permission::DeleteEmployee, Some(&target))?;
        let result = employee::Entity::delete_by_id(employee_id)
            .exec(db.as_ref())
            .await
            .map_err(db_error)?;
        if result.rows_affected == 0 {
            return Err(error_with_code("NOT_FOUND", "Employee not found"));
        }
        record_action(
            db.as_ref(),
            principal.id,
            "delete_employee",
            "employee",
            Some(employee_id),
            None,
        )
        .await
        .map_err(db_error)?;
        Ok(true)
    }

    #[graphql(name = "createAdvance")]
    async fn create_advance(
        &self,
        ctx: &Context<'_>,
        input: NewAdvanceInput,
    ) -> async_graphql::Result<AdvanceNode> {
        let principal = require_permission(ctx, Permission::CreateAdvance, None)?;
        let db = database(ctx)?;
        if input.amount_cents <= 0 {
            return Err(validation_error("amountCents must be positive"));
        }
        let employee_id = parse_uuid(&input.employee_id)?;
        let employee = employee::Entity::find_by_id(employee_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Employee not found"))?;
        if !employee.is_active {
            return Err(validation_error("Employee is not active"));
        }
        let fee_bps = advance_fee_bps(db.as_ref()).await?;
        let service_fee_cents = input.amount_cents * fee_bps / 10_000;
        let now = Utc::now();
        let model = salary_advance::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(employee_id),
            amount_cents: Set(input.amount_cents),
            service_fee_cents: Set(service_fee_cents),
            total_cents: Set(input.amount_cents + service_fee_cents),
            status: Set(salary_advance::Status::Pending),
            created_by: Set(Some(principal.id)),
            reviewed_by: Set(None),
            rejection_reason: Set(None),
            requested_at: Set(now.into()),
            approved_at: Set(None),
            disbursed_at: Set(None),
            repaid_at: Set(None),
            due_date: Set(input.due_date),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        record_action(
            db.as_ref(),
            principal.id,
            "create_salary_advance",
            "salary_advance",
            Some(model.id),
            Some(json!({ "amount_cents": model.amount_cents })),
        )
        .await
        .map_err(db_error)?;
        Ok(AdvanceNode::from(model))
    }

    /// Approve a pending advance. Authorization runs inside the same database
    /// transaction that performs the state change so the creator snapshot the
    /// self-approval rule saw cannot go stale before the write.
    #[graphql(name = "approveAdvance")]
    async fn approve_advance(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<AdvanceNode> {
        let db = database(ctx)?;
        let advance_id = parse_uuid(&id)?;
        let txn = db.begin().await.map_err(db_error)?;
        let model = salary_advance::Entity::find_by_id(advance_id)
            .one(&txn)
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Salary advance not found"))?;
        let target = ActionableEntity::new(model.id, model.created_by).with_state("pending");
        let principal = require_permission(ctx, Permission::ApproveAdvance, Some(&target))?;
        if model.status != salary_advance::Status::Pending {
            return Err(validation_error("Only pending advances can be approved"));
        }
        let now = Utc::now();
        let mut active: salary_advance::ActiveModel = model.into();
        active.status = Set(salary_advance::Status::Approved);
        active.reviewed_by = Set(Some(principal.id));
        active.approved_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        let model = active.update(&txn).await.map_err(db_error)?;
        record_action(
            &txn,
            principal.id,
            "approve_salary_advance",
            "salary_advance",
            Some(model.id),
            None,
        )
        .await
        .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;
        Ok(AdvanceNode::from(model))
    }

    #[graphql(name = "rejectAdvance")]
    async fn reject_advance(
        &self,
        ctx: &Context<'_>,
        id: ID,
        reason: Option<String>,
    ) -> async_graphql::Result<AdvanceNode> {
        let db = database(ctx)?;
        let advance_id = parse_uuid(&id)?;
        let txn = db.begin().await.map_err(db_error)?;
        let model = salary_advance::Entity::find_by_id(advance_id)
            .one(&txn)
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Salary advance not found"))?;
        let target = ActionableEntity::new(model.id, model.created_by).with_state("pending");
        let principal = require_permission(ctx, Permission::RejectAdvance, Some(&target))?;
        if model.status != salary_advance::Status::Pending {
            return Err(validation_error("Only pending advances can be rejected"));
        }
        let now = Utc::now();
        let mut active: salary_advance::ActiveModel = model.into();
        active.status = Set(salary_advance::Status::Rejected);
        active.reviewed_by = Set(Some(principal.id));
        active.rejection_reason = Set(reason.clone());
        active.updated_at = Set(now.into());
        let model = active.update(&txn).await.map_err(db_error)?;
        record_action(
            &txn,
            principal.id,
            "reject_salary_advance",
            "salary_advance",
            Some(model.id),
            reason.map(|r| json!({ "reason": r })),
        )
        .await
        .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;
        Ok(AdvanceNode::from(model))
    }

    #[graphql(name = "createTransaction")]
    async fn create_transaction(
        &self,
        ctx: &Context<'_>,
        input: NewTransactionInput,
    ) -> async_graphql::Result<TransactionNode> {
        let principal = require_permission(ctx, Permission::CreateTransaction, None)?;
        let db = database(ctx)?;
        if input.amount_cents <= 0 {
            return Err(validation_error("amountCents must be positive"));
        }
        let employee_id = parse_uuid(&input.employee_id)?;
        let advance_id = match &input.salary_advance_id {
            Some(id) => Some(parse_uuid(id)?),
            None => None,
        };
        let now = Utc::now();
        let model = transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(employee_id),
            salary_advance_id: Set(advance_id),
            kind: Set(input.kind.into()),
            amount_cents: Set(input.amount_cents),
            status: Set(transaction::Status::Pending),
            description: Set(input.description),
            reference: Set(Some(format!("TXN-{}", Uuid::new_v4().simple()))),
            created_by: Set(Some(principal.id)),
            created_at: Set(now.into()),
            completed_at: Set(None),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        record_action(
            db.as_ref(),
            principal.id,
            "create_transaction",
            "transaction",
            Some(model.id),
            Some(json!({ "amount_cents": model.amount_cents })),
        )
        .await
        .map_err(db_error)?;
        Ok(TransactionNode::from(model))
    }

    #[graphql(name = "approveTransaction")]
    async fn approve_transaction(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<TransactionNode> {
        let db = database(ctx)?;
        let transaction_id = parse_uuid(&id)?;
        let txn = db.begin().await.map_err(db_error)?;
        let model = transaction::Entity::find_by_id(transaction_id)
            .one(&txn)
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Transaction not found"))?;
        let target = ActionableEntity::new(model.id, model.created_by).with_state("pending");
        let principal = require_permission(ctx, Permission::ApproveTransaction, Some(&target))?;
        if model.status != transaction::Status::Pending {
            return Err(validation_error("Only pending transactions can be approved"));
        }
        let now = Utc::now();
        let mut active: transaction::ActiveModel = model.into();
        active.status = Set(transaction::Status::Completed);
        active.completed_at = Set(Some(now.into()));
        let model = active.update(&txn).await.map_err(db_error)?;
        record_action(
            &txn,
            principal.id,
            "approve_transaction",
            "transaction",
            Some(model.id),
            None,
        )
        .await
        .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;
        Ok(TransactionNode::from(model))
    }

    #[graphql(name = "rejectTransaction")]
    async fn reject_transaction(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<TransactionNode> {
        let db = database(ctx)?;
        let transaction_id = parse_uuid(&id)?;
        let txn = db.begin().await.map_err(db_error)?;
        let model = transaction::Entity::find_by_id(transaction_id)
            .one(&txn)
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Transaction not found"))?;
        let target = ActionableEntity::new(model.id, model.created_by).with_state("pending");
        let principal = require_permission(ctx, Permission::RejectTransaction, Some(&target))?;
        if model.status != transaction::Status::Pending {
            return Err(validation_error("Only pending transactions can be rejected"));
        }
        let mut active: transaction::ActiveModel = model.into();
        active.status = Set(transaction::Status::Failed);
        let model = active.update(&txn).await.map_err(db_error)?;
        record_action(
            &txn,
            principal.id,
            "reject_transaction",
            "transaction",
            Some(model.id),
            None,
        )
        .await
        .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;
        Ok(TransactionNode::from(model))
    }

    #[graphql(name = "activateCard")]
    async fn activate_card(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<CardNode> {
        set_card_status(
            ctx,
            &id,
            Permission::ActivateCard,
            card::Status::Active,
            "activate_card",
        )
        .await
    }

    /// Freeze a card (the product calls this "deactivate"); reversible via
    /// activate.
    #[graphql(name = "freezeCard")]
    async fn freeze_card(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<CardNode> {
        set_card_status(
            ctx,
            &id,
            Permission::DeactivateCard,
            card::Status::Frozen,
            "freeze_card",
        )
        .await
    }

    #[graphql(name = "blockCard")]
    async fn block_card(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<CardNode> {
        set_card_status(
            ctx,
            &id,
            Permission::BlockCard,
            card::Status::Blocked,
            "block_card",
        )
        .await
    }

    #[graphql(name = "createAdminUser")]
    async fn create_admin_user(
        &self,
        ctx: &Context<'_>,
        input: NewAdminUserInput,
    ) -> async_graphql::Result<AdminUserNode> {
        let principal = require_permission(ctx, Permission::ManageUsers, None)?;
        let db = database(ctx)?;
        let email = normalize_email(&input.email)?;
        let name = validate_name(&input.name)?;
        if input.password.chars().count() < 8 {
            return Err(validation_error("Password must be at least 8 characters"));
        }
        let password_hash = hash_password(&input.password).map_err(db_error)?;
        let now = Utc::now();
        let txn = db.begin().await.map_err(db_error)?;
        let user = admin_user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            name: Set(name),
            role: Set(role_to_entity(input.role.into())),
            is_active: Set(true),
            last_login_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;
        admin_secret::ActiveModel {
            admin_user_id: Set(user.id),
            password_hash: Set(password_hash),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;
        record_action(
            &txn,
            principal.id,
            "create_admin_user",
            "admin_user",
            Some(user.id),
            Some(json!({ "role": Role::from(input.role).as_str() })),
        )
        .await
        .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;
        Ok(AdminUserNode::from_model(user))
    }

    #[graphql(name = "updateAdminUser")]
    async fn update_admin_user(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: UpdateAdminUserInput,
    ) -> async_graphql::Result<AdminUserNode> {
        let principal = require_permission(ctx, Permission::ManageUsers, None)?;
        let db = database(ctx)?;
        let user_id = parse_uuid(&id)?;
        let model = admin_user::Entity::find_by_id(user_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Admin user not found"))?;
        if user_id == principal.id && input.is_active == Some(false) {
            return Err(validation_error("You cannot deactivate your own account"));
        }
        let mut active: admin_user::ActiveModel = model.into();
        if let Some(role) = input.role {
            active.role = Set(role_to_entity(role.into()));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().into());
        let model = active.update(db.as_ref()).await.map_err(db_error)?;
        record_action(
            db.as_ref(),
            principal.id,
            "update_admin_user",
            "admin_user",
            Some(model.id),
            None,
        )
        .await
        .map_err(db_error)?;
        Ok(AdminUserNode::from_model(model))
    }

    #[graphql(name = "setSetting")]
    async fn set_setting(
        &self,
        ctx: &Context<'_>,
        key: String,
        value: String,
    ) -> async_graphql::Result<SettingNode> {
        let principal = require_permission(ctx, Permission::ManageSettings, None)?;
        let db = database(ctx)?;
        let key = key.trim().to_string();
        if key.is_empty() {
            return Err(validation_error("key is required"));
        }
        let now = Utc::now();
        app_setting::Entity::insert(app_setting::ActiveModel {
            key: Set(key.clone()),
            value: Set(value),
            updated_by: Set(Some(principal.id)),
            updated_at: Set(now.into()),
        })
        .on_conflict(
            OnConflict::column(app_setting::Column::Key)
                .update_columns([
                    app_setting::Column::Value,
                    app_setting::Column::UpdatedBy,
                    app_setting::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(db.as_ref())
        .await
        .map_err(db_error)?;
        let model = app_setting::Entity::find_by_id(key.clone())
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("INTERNAL", "Setting not persisted"))?;
        record_action(
            db.as_ref(),
            principal.id,
            "update_setting",
            "app_setting",
            None,
            Some(json!({ "key": key })),
        )
        .await
        .map_err(db_error)?;
        Ok(SettingNode::from(model))
    }
}

async fn set_card_status(
    ctx: &Context<'_>,
    id: &ID,
    permission: Permission,
    next: card::Status,
    action: &str,
) -> async_graphql::Result<CardNode> {
    let db = database(ctx)?;
    let card_id = parse_uuid(id)?;
    let txn = db.begin().await.map_err(db_error)?;
    let model = card::Entity::find_by_id(card_id)
        .one(&txn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| error_with_code("NOT_FOUND", "Card not found"))?;
    let target = ActionableEntity::new(model.id, None);
    let principal = require_permission(ctx, permission, Some(&target))?;
    if model.status == card::Status::Expired {
        return Err(validation_error("Expired cards cannot change status"));
    }
    if model.status == next {
        return Err(validation_error("Card is already in the requested status"));
    }
    let mut active: card::ActiveModel = model.into();
    active.status = Set(next);
    active.updated_at = Set(Utc::now().into());
    let model = active.update(&txn).await.map_err(db_error)?;
    record_action(&txn, principal.id, action, "card", Some(model.id), None)
        .await
        .map_err(db_error)?;
    txn.commit().await.map_err(db_error)?;
    Ok(CardNode::from(model))
}

async fn advance_fee_bps(db: &DatabaseConnection) -> async_graphql::Result<i64> {
    let setting = app_setting::Entity::find_by_id("advance_fee_bps".to_string())
        .one(db)
        .await
        .map_err(db_error)?;
    Ok(setting
        .and_then(|s| s.value.parse::<i64>().ok())
        .unwrap_or(500))
}

fn database(ctx: &Context<'_>) -> async_graphql::Result<Arc<DatabaseConnection>> {
    ctx.data::<Arc<DatabaseConnection>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing database connection"))
}

fn auth_config(ctx: &Context<'_>) -> async_graphql::Result<Arc<AuthConfig>> {
    ctx.data::<Arc<AuthConfig>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing auth configuration"))
}

fn authorization_engine(ctx: &Context<'_>) -> async_graphql::Result<Arc<AuthorizationEngine>> {
    ctx.data::<Arc<AuthorizationEngine>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing authorization engine"))
}

fn current_principal(ctx: &Context<'_>) -> async_graphql::Result<Principal> {
    ctx.data::<Principal>()
        .cloned()
        .map_err(|_| error_with_code("UNAUTHENTICATED", "Login required"))
}

/// The single authorization entry point for every sensitive resolver. Screens
/// and handlers must not test roles directly; the engine owns both the role
/// matrix and the self-approval rule.
fn require_permission(
    ctx: &Context<'_>,
    action: Permission,
    entity: Option<&ActionableEntity>,
) -> async_graphql::Result<Principal> {
    let principal = current_principal(ctx)?;
    let engine = authorization_engine(ctx)?;
    engine
        .require(&principal, action, entity)
        .map_err(authz_error)?;
    Ok(principal)
}

fn authz_error(err: AuthzError) -> Error {
    let code = match err.reason() {
        DecisionReason::SelfApprovalBlocked => "SELF_APPROVAL_BLOCKED",
        DecisionReason::RoleInactive => "ACCOUNT_DISABLED",
        _ => "FORBIDDEN",
    };
    error_with_code(code, err.to_string())
}

fn page(first: Option<i32>, offset: Option<i32>) -> async_graphql::Result<(u64, u64)> {
    let requested = first.unwrap_or(50);
    if requested < 0 {
        return Err(validation_error("first must be non-negative"));
    }
    if requested > MAX_PAGE {
        return Err(error_with_code(
            "LIMIT_EXCEEDED",
            format!("first cannot exceed {}", MAX_PAGE),
        ));
    }
    let limit = requested.max(1) as u64;
    let skip = offset.unwrap_or(0).max(0) as u64;
    Ok((limit, skip))
}

fn parse_uuid(id: &ID) -> async_graphql::Result<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| error_with_code("BAD_REQUEST", "Invalid ID"))
}

fn db_error(err: DbErr) -> Error {
    error_with_code("INTERNAL", format!("Database error: {}", err))
}

fn error_with_code(code: &'static str, message: impl Into<String>) -> Error {
    Error::new(message).extend_with(|_, e| e.set("code", code))
}

fn validation_error(message: impl Into<String>) -> Error {
    error_with_code("VALIDATION", message)
}

fn sanitize_optional_filter(value: Option<String>) -> Option<String> {
    value.and_then(|input| {
        let trimmed = input.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

fn normalize_email(value: &str) -> async_graphql::Result<String> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(validation_error("Invalid email address"));
    }
    Ok(trimmed)
}

fn validate_name(value: &str) -> async_graphql::Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(validation_error("name is required"));
    }
    if trimmed.chars().count() > 100 {
        return Err(validation_error("name must be <= 100 characters"));
    }
    Ok(trimmed.to_string())
}

fn append_session_cookie(ctx: &Context<'_>, token: &str, ttl_minutes: i64) {
    let max_age = (ttl_minutes.max(0) * 60).to_string();
    let cookie = if ttl_minutes < 0 {
        format!(
            "{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE
        )
    } else {
        format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, token, max_age
        )
    };
    ctx.append_http_header("Set-Cookie", cookie);
}

fn hash_password(password: &str) -> Result<String, DbErr> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| DbErr::Custom(format!("hash error: {}", err)))
}

#[derive(Debug, Clone)]
pub struct SeededAdminRecords {
    pub admins: Vec<admin_user::Model>,
    pub employees: Vec<employee::Model>,
    pub advances: Vec<salary_advance::Model>,
    pub cards: Vec<card::Model>,
}

impl SeededAdminRecords {
    pub fn admin_email(&self, email: &str) -> Option<&admin_user::Model> {
        self.admins.iter().find(|u| u.email == email)
    }

    pub fn employee_email(&self, email: &str) -> Option<&employee::Model> {
        self.employees.iter().find(|e| e.email == email)
    }
}

/// Seed demo data: one admin per role, a couple of employees, a pending
/// advance raised by the maker and a card. Used by the `seed` subcommand and
/// by integration tests.
pub async fn seed_admin_demo(db: &DatabaseConnection) -> Result<SeededAdminRecords, DbErr> {
    let now = Utc::now();
    let mut admins = Vec::new();
    for (email, name, role, password) in [
        (
            "maker@advancia.test",
            "Mona Maker",
            admin_user::Role::Maker,
            "makerpass",
        ),
        (
            "checker@advancia.test",
            "Carl Checker",
            admin_user::Role::Checker,
            "checkerpass",
        ),
        (
            "support@advancia.test",
            "Sami Support",
            admin_user::Role::Support,
            "supportpass",
        ),
        (
            "root@advancia.test",
            "Root Admin",
            admin_user::Role::SuperAdmin,
            "rootpass",
        ),
    ] {
        let user = admin_user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            name: Set(name.to_string()),
            role: Set(role),
            is_active: Set(true),
            last_login_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(db)
        .await?;
        admin_secret::ActiveModel {
            admin_user_id: Set(user.id),
            password_hash: Set(hash_password(password)?),
            updated_at: Set(now.into()),
        }
        .insert(db)
        .await?;
        admins.push(user);
    }

    let mut employees = Vec::new();
    for (full_name, email, salary) in [
        ("Amina Alaoui", "amina@acme.test", 1_200_000),
        ("Youssef Benani", "youssef@acme.test", 900_000),
    ] {
        let model = employee::ActiveModel {
            id: Set(Uuid::new_v4()),
            full_name: Set(full_name.to_string()),
            email: Set(email.to_string()),
            phone: Set(None),
            company: Set(Some("ACME Maroc".to_string())),
            net_salary_cents: Set(Some(salary)),
            currency: Set("MAD".to_string()),
            kyc_status: Set(employee::KycStatus::Verified),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(db)
        .await?;
        employees.push(model);
    }

    let maker = admins
        .iter()
        .find(|a| a.role == admin_user::Role::Maker)
        .ok_or_else(|| DbErr::Custom("maker admin missing from seed set".to_string()))?;
    let advance = salary_advance::ActiveModel {
        id: Set(Uuid::new_v4()),
        employee_id: Set(employees[0].id),
        amount_cents: Set(300_000),
        service_fee_cents: Set(15_000),
        total_cents: Set(315_000),
        status: Set(salary_advance::Status::Pending),
        created_by: Set(Some(maker.id)),
        reviewed_by: Set(None),
        rejection_reason: Set(None),
        requested_at: Set(now.into()),
        approved_at: Set(None),
        disbursed_at: Set(None),
        repaid_at: Set(None),
        due_date: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await?;

    transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        employee_id: Set(employees[0].id),
        salary_advance_id: Set(Some(advance.id)),
        kind: Set(transaction::Kind::SalaryAdvance),
        amount_cents: Set(300_000),
        status: Set(transaction::Status::Pending),
        description: Set(Some("Advance disbursement".to_string())),
        reference: Set(Some(format!("TXN-{}", Uuid::new_v4().simple()))),
        created_by: Set(Some(maker.id)),
        created_at: Set(now.into()),
        completed_at: Set(None),
    }
    .insert(db)
    .await?;

    let seeded_card = card::ActiveModel {
        id: Set(Uuid::new_v4()),
        employee_id: Set(employees[0].id),
        masked_pan: Set("**** **** **** 4521".to_string()),
        cardholder_name: Set(employees[0].full_name.clone()),
        expiry_month: Set(9),
        expiry_year: Set(2028),
        card_type: Set("virtual".to_string()),
        status: Set(card::Status::Active),
        balance_cents: Set(50_000),
        daily_limit_cents: Set(Some(200_000)),
        monthly_limit_cents: Set(Some(1_000_000)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await?;

    card_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        card_id: Set(seeded_card.id),
        amount_cents: Set(-4_500),
        currency: Set("MAD".to_string()),
        merchant: Set("Marjane".to_string()),
        occurred_at: Set(now.into()),
        created_at: Set(now.into()),
    }
    .insert(db)
    .await?;

    app_setting::ActiveModel {
        key: Set("advance_fee_bps".to_string()),
        value: Set("500".to_string()),
        updated_by: Set(None),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await?;

    Ok(SeededAdminRecords {
        admins,
        employees,
        advances: vec![advance],
        cards: vec![seeded_card],
    })
}
