//! Authorization core for the admin backend: the role/permission registry and
//! the maker-checker decision engine.
//!
//! Every sensitive handler asks [`AuthorizationEngine::require`] before it
//! touches the store. The engine checks the static role matrix first, then the
//! self-approval rule, and hands one [`AuthorizationDecision`] per check to the
//! configured [`AuditSink`].

mod engine;
mod registry;

pub use engine::{
    ActionableEntity, AuditSink, AuthorizationDecision, AuthorizationEngine, AuthzError,
    DecisionReason, Principal, TracingSink,
};
pub use registry::{permissions_for, Permission, PermissionSet, Role, RoleBadge};
