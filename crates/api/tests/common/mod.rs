use std::sync::Arc;

use api::auth::{principal_from_model, AuthConfig};
use api::schema::{build_schema, AppSchema};
use async_graphql::Response;
use authz::{AuthorizationEngine, Principal};
use chrono::Utc;
use entity::{admin_user, card, employee, salary_advance, transaction};
use sea_orm::{
    ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, EntityTrait, Statement, Value,
};
use uuid::Uuid;

pub type TestSchema =
    async_graphql::Schema<api::schema::QueryRoot, api::schema::MutationRoot, async_graphql::EmptySubscription>;

pub async fn setup() -> (Arc<DatabaseConnection>, TestSchema) {
    let conn = Database::connect("sqlite::memory:").await.unwrap();
    let db = Arc::new(conn);
    bootstrap_sqlite(db.as_ref()).await;
    let auth = Arc::new(AuthConfig {
        jwt_secret: "test-secret".to_string(),
        local_auth_enabled: true,
        session_ttl_minutes: 60,
    });
    let engine = Arc::new(AuthorizationEngine::default());
    let AppSchema(schema) = build_schema(db.clone(), auth, engine);
    (db, schema)
}

pub async fn insert_admin(
    db: &DatabaseConnection,
    email: &str,
    role: &str,
    is_active: bool,
) -> admin_user::Model {
    let id = Uuid::new_v4();
    let now = Utc::now().to_rfc3339();
    db.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        "INSERT INTO admin_user (id, email, name, role, is_active, last_login_at, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            id.into(),
            email.into(),
            email.split('@').next().unwrap_or("admin").into(),
            role.into(),
            is_active.into(),
            Value::from(None::<String>),
            now.clone().into(),
            now.into(),
        ],
    ))
    .await
    .unwrap();
    admin_user::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
}

pub async fn insert_employee(db: &DatabaseConnection, email: &str) -> employee::Model {
    let id = Uuid::new_v4();
    let now = Utc::now().to_rfc3339();
    db.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        "INSERT INTO employee (id, full_name, email, phone, company, net_salary_cents, currency, kyc_status, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            id.into(),
            "Test Employee".into(),
            email.into(),
            Value::from(None::<String>),
            Value::from(None::<String>),
            1_000_000i64.into(),
            "MAD".into(),
            "VERIFIED".into(),
            true.into(),
            now.clone().into(),
            now.into(),
        ],
    ))
    .await
    .unwrap();
    employee::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
}

pub async fn insert_pending_advance(
    db: &DatabaseConnection,
    employee_id: Uuid,
    created_by: Option<Uuid>,
) -> salary_advance::Model {
    let id = Uuid::new_v4();
    let now = Utc::now().to_rfc3339();
    db.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        "INSERT INTO salary_advance (id, employee_id, amount_cents, service_fee_cents, total_cents, status, created_by, reviewed_by, rejection_reason, requested_at, approved_at, disbursed_at, repaid_at, due_date, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            id.into(),
            employee_id.into(),
            200_000i64.into(),
            10_000i64.into(),
            210_000i64.into(),
            "PENDING".into(),
            created_by.into(),
            Value::from(None::<Uuid>),
            Value::from(None::<String>),
            now.clone().into(),
            Value::from(None::<String>),
            Value::from(None::<String>),
            Value::from(None::<String>),
            Value::from(None::<String>),
            now.clone().into(),
            now.into(),
        ],
    ))
    .await
    .unwrap();
    salary_advance::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
}

pub async fn insert_pending_transaction(
    db: &DatabaseConnection,
    employee_id: Uuid,
    created_by: Option<Uuid>,
) -> transaction::Model {
    let id = Uuid::new_v4();
    let now = Utc::now().to_rfc3339();
    db.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        "INSERT INTO \"transaction\" (id, employee_id, salary_advance_id, kind, amount_cents, status, description, reference, created_by, created_at, completed_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            id.into(),
            employee_id.into(),
            Value::from(None::<Uuid>),
            "SALARY_ADVANCE".into(),
            200_000i64.into(),
            "PENDING".into(),
            Value::from(None::<String>),
            "TXN-TEST".into(),
            created_by.into(),
            now.into(),
            Value::from(None::<String>),
        ],
    ))
    .await
    .unwrap();
    transaction::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
}

pub async fn insert_card(
    db: &DatabaseConnection,
    employee_id: Uuid,
    status: &str,
) -> card::Model {
    let id = Uuid::new_v4();
    let now = Utc::now().to_rfc3339();
    db.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        "INSERT INTO card (id, employee_id, masked_pan, cardholder_name, expiry_month, expiry_year, card_type, status, balance_cents, daily_limit_cents, monthly_limit_cents, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            id.into(),
            employee_id.into(),
            "**** **** **** 1234".into(),
            "Test Employee".into(),
            6i16.into(),
            2029i16.into(),
            "virtual".into(),
            status.into(),
            0i64.into(),
            Value::from(None::<i64>),
            Value::from(None::<i64>),
            now.clone().into(),
            now.into(),
        ],
    ))
    .await
    .unwrap();
    card::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
}

pub fn principal_for(model: &admin_user::Model) -> Principal {
    principal_from_model(model)
}

pub fn error_code(resp: &Response) -> Option<String> {
    resp.errors.first().and_then(|err| {
        err.extensions.as_ref().and_then(|ext| {
            ext.get("code").map(|value| match value {
                async_graphql::Value::String(code) => code.clone(),
                other => other.to_string(),
            })
        })
    })
}

pub async fn bootstrap_sqlite(db: &DatabaseConnection) {
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON;",
    ))
    .await
    .unwrap();

    for ddl in [
        r#"
        CREATE TABLE admin_user (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            role TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            last_login_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
        r#"
        CREATE TABLE admin_secret (
            admin_user_id TEXT PRIMARY KEY,
            password_hash TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(admin_user_id) REFERENCES admin_user(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE employee (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            phone TEXT,
            company TEXT,
            net_salary_cents INTEGER,
            currency TEXT NOT NULL,
            kyc_status TEXT NOT NULL DEFAULT 'PENDING',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
        r#"
        CREATE TABLE salary_advance (
            id TEXT PRIMARY KEY,
            employee_id TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            service_fee_cents INTEGER NOT NULL,
            total_cents INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            created_by TEXT,
            reviewed_by TEXT,
            rejection_reason TEXT,
            requested_at TEXT NOT NULL,
            approved_at TEXT,
            disbursed_at TEXT,
            repaid_at TEXT,
            due_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(employee_id) REFERENCES employee(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE "transaction" (
            id TEXT PRIMARY KEY,
            employee_id TEXT NOT NULL,
            salary_advance_id TEXT,
            kind TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            description TEXT,
            reference TEXT,
            created_by TEXT,
            created_at TEXT NOT NULL,
            completed_at TEXT,
            FOREIGN KEY(employee_id) REFERENCES employee(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE card (
            id TEXT PRIMARY KEY,
            employee_id TEXT NOT NULL,
            masked_pan TEXT NOT NULL,
            cardholder_name TEXT NOT NULL,
            expiry_month INTEGER NOT NULL,
            expiry_year INTEGER NOT NULL,
            card_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'ACTIVE',
            balance_cents INTEGER NOT NULL DEFAULT 0,
            daily_limit_cents INTEGER,
            monthly_limit_cents INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(employee_id) REFERENCES employee(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE card_transaction (
            id TEXT PRIMARY KEY,
            card_id TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            currency TEXT NOT NULL,
            merchant TEXT NOT NULL,
            occurred_at TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(card_id) REFERENCES card(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE audit_log (
            id TEXT PRIMARY KEY,
            admin_user_id TEXT,
            action TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT,
            allowed INTEGER NOT NULL,
            reason TEXT NOT NULL,
            details TEXT,
            ip_address TEXT,
            created_at TEXT NOT NULL
        );
        "#,
        r#"
        CREATE TABLE app_setting (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_by TEXT,
            updated_at TEXT NOT NULL
        );
        "#,
    ] {
        db.execute(Statement::from_string(DatabaseBackend::Sqlite, ddl))
            .await
            .unwrap();
    }
}
