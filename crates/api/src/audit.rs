use std::sync::Arc;

use authz::{AuditSink, AuthorizationDecision};
use chrono::Utc;
use entity::audit_log;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DatabaseConnection};
use uuid::Uuid;

/// Audit sink that appends authorization decisions to the `audit_log` table.
///
/// Inserts run on a spawned task: the engine has already produced its verdict
/// and a failed insert must not surface into the request path. Failures are
/// logged and dropped.
pub struct DbAuditSink {
    db: Arc<DatabaseConnection>,
}

impl DbAuditSink {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl AuditSink for DbAuditSink {
    fn record(&self, decision: &AuthorizationDecision) {
        let db = self.db.clone();
        let decision = decision.clone();
        tokio::spawn(async move {
            let row = audit_log::ActiveModel {
                id: Set(Uuid::new_v4()),
                admin_user_id: Set(Some(decision.principal_id)),
                action: Set(decision.action.as_str().to_string()),
                entity_type: Set("authorization".to_string()),
                entity_id: Set(decision.entity_id),
                allowed: Set(decision.allowed),
                reason: Set(decision.reason.as_str().to_string()),
                details: Set(None),
                ip_address: Set(None),
                created_at: Set(decision.decided_at.into()),
            };
            if let Err(err) = row.insert(db.as_ref()).await {
                tracing::warn!(error = %err, "failed to persist authorization decision");
            }
        });
    }
}

/// Append an action-level audit row for a completed sensitive mutation, e.g.
/// `approve_salary_advance`. Written in the caller's transaction so the audit
/// trail and the state change commit together.
pub async fn record_action<C: ConnectionTrait>(
    conn: &C,
    admin_user_id: Uuid,
    action: &str,
    entity_type: &str,
    entity_id: Option<Uuid>,
    details: Option<serde_json::Value>,
) -> Result<(), sea_orm::DbErr> {
    audit_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        admin_user_id: Set(Some(admin_user_id)),
        action: Set(action.to_string()),
        entity_type: Set(entity_type.to_string()),
        entity_id: Set(entity_id),
        allowed: Set(true),
        reason: Set("action".to_string()),
        details: Set(details),
        ip_address: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;
    Ok(())
}
