use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::registry::{permissions_for, Permission, Role};

/// An authenticated admin actor. Built by the authentication layer from a
/// verified session; the engine trusts `role` and `active` as resolved facts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub active: bool,
}

/// Snapshot of a resource under maker-checker control, supplied by the caller.
/// The caller owns consistency: for approve/reject, re-read the row inside the
/// same database transaction that performs the state change so this snapshot
/// cannot be stale relative to the write.
#[derive(Clone, Debug)]
pub struct ActionableEntity {
    pub id: Uuid,
    /// The admin who created the entity, when maker attribution exists.
    pub created_by: Option<Uuid>,
    pub state: Option<String>,
}

impl ActionableEntity {
    pub fn new(id: Uuid, created_by: Option<Uuid>) -> Self {
        Self {
            id,
            created_by,
            state: None,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }
}

/// Why a check resolved the way it did. `PermissionDenied` is terminal before
/// the self-approval rule is ever consulted, so a statically denied actor can
/// never surface as `SelfApprovalBlocked`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    Allowed,
    PermissionDenied,
    SelfApprovalBlocked,
    RoleInactive,
}

impl DecisionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionReason::Allowed => "allowed",
            DecisionReason::PermissionDenied => "permission_denied",
            DecisionReason::SelfApprovalBlocked => "self_approval_blocked",
            DecisionReason::RoleInactive => "role_inactive",
        }
    }
}

/// One record per authorization check, allowed or denied. Created fresh,
/// handed to the audit sink, never reused.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
    pub principal_id: Uuid,
    pub action: Permission,
    pub entity_id: Option<Uuid>,
    pub decided_at: DateTime<Utc>,
}

/// Receives every decision the engine produces. Implementations must be
/// fire-and-forget: a sink that fails or blocks cannot change a verdict that
/// has already been computed.
pub trait AuditSink: Send + Sync {
    fn record(&self, decision: &AuthorizationDecision);
}

/// Default sink: structured log lines via `tracing`.
#[derive(Default, Debug)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, decision: &AuthorizationDecision) {
        tracing::info!(
            principal = %decision.principal_id,
            action = decision.action.as_str(),
            entity = ?decision.entity_id,
            allowed = decision.allowed,
            reason = decision.reason.as_str(),
            "authorization decision"
        );
    }
}

/// Permanent business-rule denials. Nothing here is transient or retryable;
/// callers propagate and abort the mutating operation.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum AuthzError {
    #[error("You do not have permission to perform this action.")]
    PermissionDenied { action: Permission },
    #[error("You cannot approve or reject a request you created.")]
    SelfApprovalBlocked { entity_id: Uuid },
    #[error("This account has been deactivated.")]
    RoleInactive,
}

impl AuthzError {
    pub fn reason(&self) -> DecisionReason {
        match self {
            AuthzError::PermissionDenied { .. } => DecisionReason::PermissionDenied,
            AuthzError::SelfApprovalBlocked { .. } => DecisionReason::SelfApprovalBlocked,
            AuthzError::RoleInactive => DecisionReason::RoleInactive,
        }
    }
}

/// Stateless decision engine over the role matrix plus the self-approval rule.
/// Shared freely across request tasks; the matrix is compile-time data and the
/// engine holds no mutable state.
pub struct AuthorizationEngine {
    sink: Arc<dyn AuditSink>,
}

impl Default for AuthorizationEngine {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl AuthorizationEngine {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Evaluate one (principal, action, entity) triple and emit the decision
    /// to the audit sink. Exactly one record per call, on every path.
    pub fn authorize(
        &self,
        principal: &Principal,
        action: Permission,
        entity: Option<&ActionableEntity>,
    ) -> AuthorizationDecision {
        let reason = evaluate(principal, action, entity);
        let decision = AuthorizationDecision {
            allowed: reason == DecisionReason::Allowed,
            reason,
            principal_id: principal.id,
            action,
            entity_id: entity.map(|e| e.id),
            decided_at: Utc::now(),
        };
        self.sink.record(&decision);
        decision
    }

    /// Convenience gate for handlers: `?` out of the resolver before any
    /// state is touched.
    pub fn require(
        &self,
        principal: &Principal,
        action: Permission,
        entity: Option<&ActionableEntity>,
    ) -> Result<(), AuthzError> {
        let decision = self.authorize(principal, action, entity);
        match decision.reason {
            DecisionReason::Allowed => Ok(()),
            DecisionReason::PermissionDenied => Err(AuthzError::PermissionDenied { action }),
            DecisionReason::SelfApprovalBlocked => Err(AuthzError::SelfApprovalBlocked {
                entity_id: decision.entity_id.unwrap_or_default(),
            }),
            DecisionReason::RoleInactive => Err(AuthzError::RoleInactive),
        }
    }
}

fn evaluate(
    principal: &Principal,
    action: Permission,
    entity: Option<&ActionableEntity>,
) -> DecisionReason {
    // A deactivated account is denied everything; tagged separately so
    // operators can tell stale accounts from policy gaps in the log.
    if !principal.active {
        return DecisionReason::RoleInactive;
    }
    if !permissions_for(principal.role).allows(action) {
        return DecisionReason::PermissionDenied;
    }
    // Segregation of duties: the maker of a request can never be its checker.
    // Applies to every role, SuperAdmin included.
    if action.is_approval() {
        if let Some(entity) = entity {
            if entity.created_by == Some(principal.id) {
                return DecisionReason::SelfApprovalBlocked;
            }
        }
    }
    DecisionReason::Allowed
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    struct RecordingSink {
        calls: AtomicUsize,
        last: Mutex<Option<AuthorizationDecision>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            })
        }
    }

    impl AuditSink for RecordingSink {
        fn record(&self, decision: &AuthorizationDecision) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(decision.clone());
        }
    }

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            name: format!("{} test", role.display_name()),
            role,
            active: true,
        }
    }

    fn engine() -> AuthorizationEngine {
        AuthorizationEngine::default()
    }

    #[test]
    fn maker_cannot_approve_own_advance() {
        let maker = principal(Role::Maker);
        let advance = ActionableEntity::new(Uuid::new_v4(), Some(maker.id)).with_state("pending");
        let decision = engine().authorize(&maker, Permission::ApproveAdvance, Some(&advance));
        assert!(!decision.allowed);
        // Maker lacks the approve capability, so the static deny wins before
        // the self-approval rule is reached.
        assert_eq!(decision.reason, DecisionReason::PermissionDenied);
    }

    #[test]
    fn checker_approves_someone_elses_advance() {
        let maker = principal(Role::Maker);
        let checker = principal(Role::Checker);
        let advance = ActionableEntity::new(Uuid::new_v4(), Some(maker.id)).with_state("pending");
        let decision = engine().authorize(&checker, Permission::ApproveAdvance, Some(&advance));
        assert!(decision.allowed);
        assert_eq!(decision.reason, DecisionReason::Allowed);
    }

    #[test]
    fn self_approval_blocked_for_every_role_with_approve_rights() {
        for role in [Role::Checker, Role::SuperAdmin] {
            let actor = principal(role);
            let own = ActionableEntity::new(Uuid::new_v4(), Some(actor.id));
            for action in [
                Permission::ApproveAdvance,
                Permission::RejectAdvance,
                Permission::ApproveTransaction,
                Permission::RejectTransaction,
            ] {
                let decision = engine().authorize(&actor, action, Some(&own));
                assert!(!decision.allowed, "{role:?} {action:?}");
                assert_eq!(
                    decision.reason,
                    DecisionReason::SelfApprovalBlocked,
                    "{role:?} {action:?}"
                );
            }
        }
    }

    #[test]
    fn static_deny_short_circuits_ahead_of_self_approval() {
        // Support approving their own entity: the matrix denies Support
        // approval outright, so the reason must be PermissionDenied, not
        // SelfApprovalBlocked.
        let support = principal(Role::Support);
        let own = ActionableEntity::new(Uuid::new_v4(), Some(support.id));
        let decision = engine().authorize(&support, Permission::ApproveTransaction, Some(&own));
        assert_eq!(decision.reason, DecisionReason::PermissionDenied);
    }

    #[test]
    fn super_admin_deletes_employee_without_creator_concept() {
        let admin = principal(Role::SuperAdmin);
        let employee = ActionableEntity::new(Uuid::new_v4(), None);
        let decision = engine().authorize(&admin, Permission::DeleteEmployee, Some(&employee));
        assert!(decision.allowed);
        assert_eq!(decision.reason, DecisionReason::Allowed);
    }

    #[test]
    fn maker_cannot_view_cards() {
        let maker = principal(Role::Maker);
        let decision = engine().authorize(&maker, Permission::ViewCards, None);
        assert!(!decision.allowed);
        assert_eq!(decision.reason, DecisionReason::PermissionDenied);
    }

    #[test]
    fn entity_without_creator_is_approvable() {
        let checker = principal(Role::Checker);
        let advance = ActionableEntity::new(Uuid::new_v4(), None);
        let decision = engine().authorize(&checker, Permission::ApproveAdvance, Some(&advance));
        assert!(decision.allowed);
    }

    #[test]
    fn inactive_principal_is_denied_with_distinct_reason() {
        let mut checker = principal(Role::Checker);
        checker.active = false;
        let decision = engine().authorize(&checker, Permission::ViewTransactions, None);
        assert!(!decision.allowed);
        assert_eq!(decision.reason, DecisionReason::RoleInactive);
        assert_eq!(
            engine().require(&checker, Permission::ViewTransactions, None),
            Err(AuthzError::RoleInactive)
        );
    }

    #[test]
    fn every_check_emits_exactly_one_audit_record() {
        let sink = RecordingSink::new();
        let engine = AuthorizationEngine::new(sink.clone());
        let checker = principal(Role::Checker);
        let own = ActionableEntity::new(Uuid::new_v4(), Some(checker.id));

        engine.authorize(&checker, Permission::ViewTransactions, None);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);

        engine.authorize(&checker, Permission::ApproveAdvance, Some(&own));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
        let last = sink.last.lock().unwrap().clone().unwrap();
        assert!(!last.allowed);
        assert_eq!(last.reason, DecisionReason::SelfApprovalBlocked);
        assert_eq!(last.principal_id, checker.id);
        assert_eq!(last.entity_id, Some(own.id));

        // require() goes through the same path and also emits one record.
        let _ = engine.require(&checker, Permission::ManageUsers, None);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn identical_inputs_yield_identical_decisions() {
        let checker = principal(Role::Checker);
        let maker = principal(Role::Maker);
        let advance = ActionableEntity::new(Uuid::new_v4(), Some(maker.id));
        let engine = engine();
        let first = engine.authorize(&checker, Permission::ApproveAdvance, Some(&advance));
        let second = engine.authorize(&checker, Permission::ApproveAdvance, Some(&advance));
        assert_eq!(first.allowed, second.allowed);
        assert_eq!(first.reason, second.reason);
    }

    #[test]
    fn require_maps_reasons_onto_errors() {
        let engine = engine();
        let support = principal(Role::Support);
        assert_eq!(
            engine.require(&support, Permission::ExportData, None),
            Err(AuthzError::PermissionDenied {
                action: Permission::ExportData
            })
        );

        let checker = principal(Role::Checker);
        let own = ActionableEntity::new(Uuid::new_v4(), Some(checker.id));
        assert_eq!(
            engine.require(&checker, Permission::RejectAdvance, Some(&own)),
            Err(AuthzError::SelfApprovalBlocked { entity_id: own.id })
        );

        assert_eq!(
            engine.require(&checker, Permission::ApproveAdvance, None),
            Ok(())
        );
    }

    #[test]
    fn denial_messages_are_distinguishable() {
        let denied = AuthzError::PermissionDenied {
            action: Permission::ExportData,
        };
        let blocked = AuthzError::SelfApprovalBlocked {
            entity_id: Uuid::new_v4(),
        };
        assert_ne!(denied.to_string(), blocked.to_string());
        assert!(blocked.to_string().contains("you created"));
    }
}
