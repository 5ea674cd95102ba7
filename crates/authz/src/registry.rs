use serde::{Deserialize, Serialize};

/// Admin roles, closed set. Assigning or changing a role is an administrative
/// action outside this crate; here a role is an immutable fact about a
/// principal.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Maker,
    Checker,
    Support,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Maker, Role::Checker, Role::Support, Role::SuperAdmin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Maker => "MAKER",
            Role::Checker => "CHECKER",
            Role::Support => "SUPPORT",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "MAKER" => Some(Role::Maker),
            "CHECKER" => Some(Role::Checker),
            "SUPPORT" => Some(Role::Support),
            "SUPER_ADMIN" => Some(Role::SuperAdmin),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Role::Maker => "Maker",
            Role::Checker => "Checker",
            Role::Support => "Support",
            Role::SuperAdmin => "Super Admin",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Role::Maker => "Creates transactions and salary advance requests for review",
            Role::Checker => "Reviews and approves or rejects what Makers created",
            Role::Support => "Read-only access for customer support",
            Role::SuperAdmin => "Full system access including user and settings management",
        }
    }

    /// Badge category for UI chips. Presentational only; never consulted by
    /// the engine.
    pub fn badge(self) -> RoleBadge {
        match self {
            Role::Maker => RoleBadge::Info,
            Role::Checker => RoleBadge::Success,
            Role::Support => RoleBadge::Neutral,
            Role::SuperAdmin => RoleBadge::Warning,
        }
    }
}

/// Badge categories the frontend maps to colors.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleBadge {
    Info,
    Success,
    Neutral,
    Warning,
}

/// Capabilities gated by the role matrix, closed set.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    // Employee management
    ViewEmployees,
    CreateEmployee,
    EditEmployee,
    DeleteEmployee,
    // Transaction review
    ViewTransactions,
    CreateTransaction,
    ApproveTransaction,
    RejectTransaction,
    // Salary advance review
    ViewAdvances,
    CreateAdvance,
    ApproveAdvance,
    RejectAdvance,
    // Card lifecycle
    ViewCards,
    ActivateCard,
    DeactivateCard,
    BlockCard,
    ViewCardTransactions,
    // Reporting
    ViewReports,
    ExportData,
    // System
    ViewAuditLogs,
    ManageUsers,
    ManageSettings,
}

impl Permission {
    pub const ALL: [Permission; 22] = [
        Permission::ViewEmployees,
        Permission::CreateEmployee,
        Permission::EditEmployee,
        Permission::DeleteEmployee,
        Permission::ViewTransactions,
        Permission::CreateTransaction,
        Permission::ApproveTransaction,
        Permission::RejectTransaction,
        Permission::ViewAdvances,
        Permission::CreateAdvance,
        Permission::ApproveAdvance,
        Permission::RejectAdvance,
        Permission::ViewCards,
        Permission::ActivateCard,
        Permission::DeactivateCard,
        Permission::BlockCard,
        Permission::ViewCardTransactions,
        Permission::ViewReports,
        Permission::ExportData,
        Permission::ViewAuditLogs,
        Permission::ManageUsers,
        Permission::ManageSettings,
    ];

    /// Stable snake_case name used in audit records.
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::ViewEmployees => "view_employees",
            Permission::CreateEmployee => "create_employee",
            Permission::EditEmployee => "edit_employee",
            Permission::DeleteEmployee => "delete_employee",
            Permission::ViewTransactions => "view_transactions",
            Permission::CreateTransaction => "create_transaction",
            Permission::ApproveTransaction => "approve_transaction",
            Permission::RejectTransaction => "reject_transaction",
            Permission::ViewAdvances => "view_advances",
            Permission::CreateAdvance => "create_advance",
            Permission::ApproveAdvance => "approve_advance",
            Permission::RejectAdvance => "reject_advance",
            Permission::ViewCards => "view_cards",
            Permission::ActivateCard => "activate_card",
            Permission::DeactivateCard => "deactivate_card",
            Permission::BlockCard => "block_card",
            Permission::ViewCardTransactions => "view_card_transactions",
            Permission::ViewReports => "view_reports",
            Permission::ExportData => "export_data",
            Permission::ViewAuditLogs => "view_audit_logs",
            Permission::ManageUsers => "manage_users",
            Permission::ManageSettings => "manage_settings",
        }
    }

    /// Approve/reject actions are additionally subject to the self-approval
    /// rule when the target carries maker attribution.
    pub const fn is_approval(self) -> bool {
        matches!(
            self,
            Permission::ApproveTransaction
                | Permission::RejectTransaction
                | Permission::ApproveAdvance
                | Permission::RejectAdvance
        )
    }
}

/// Capabilities a single role holds. Total: every permission resolves to a
/// defined boolean through [`PermissionSet::allows`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PermissionSet {
    pub view_employees: bool,
    pub create_employee: bool,
    pub edit_employee: bool,
    pub delete_employee: bool,
    pub view_transactions: bool,
    pub create_transaction: bool,
    pub approve_transaction: bool,
    pub reject_transaction: bool,
    pub view_advances: bool,
    pub create_advance: bool,
    pub approve_advance: bool,
    pub reject_advance: bool,
    pub view_cards: bool,
    pub activate_card: bool,
    pub deactivate_card: bool,
    pub block_card: bool,
    pub view_card_transactions: bool,
    pub view_reports: bool,
    pub export_data: bool,
    pub view_audit_logs: bool,
    pub manage_users: bool,
    pub manage_settings: bool,
}

impl PermissionSet {
    pub const fn allows(&self, permission: Permission) -> bool {
        match permission {
            Permission::ViewEmployees => self.view_employees,
            Permission::CreateEmployee => self.create_employee,
            Permission::EditEmployee => self.edit_employee,
            Permission::DeleteEmployee => self.delete_employee,
            Permission::ViewTransactions => self.view_transactions,
            Permission::CreateTransaction => self.create_transaction,
            Permission::ApproveTransaction => self.approve_transaction,
            Permission::RejectTransaction => self.reject_transaction,
            Permission::ViewAdvances => self.view_advances,
            Permission::CreateAdvance => self.create_advance,
            Permission::ApproveAdvance => self.approve_advance,
            Permission::RejectAdvance => self.reject_advance,
            Permission::ViewCards => self.view_cards,
            Permission::ActivateCard => self.activate_card,
            Permission::DeactivateCard => self.deactivate_card,
            Permission::BlockCard => self.block_card,
            Permission::ViewCardTransactions => self.view_card_transactions,
            Permission::ViewReports => self.view_reports,
            Permission::ExportData => self.export_data,
            Permission::ViewAuditLogs => self.view_audit_logs,
            Permission::ManageUsers => self.manage_users,
            Permission::ManageSettings => self.manage_settings,
        }
    }
}

/// The canonical role matrix. Single source of truth; screens and handlers
/// must never duplicate rows of this table locally.
///
/// Makers operate on their own resources (create transactions and advances),
/// Checkers approve and hold elevated read plus audit access, Support is
/// read-only, SuperAdmin holds everything. The self-approval rule is layered
/// on top by the engine and is not expressible here.
pub const fn permissions_for(role: Role) -> PermissionSet {
    match role {
        Role::Maker => PermissionSet {
            view_employees: true,
            create_employee: false,
            edit_employee: false,
            delete_employee: false,
            view_transactions: true,
            create_transaction: true,
            approve_transaction: false,
            reject_transaction: false,
            view_advances: true,
            create_advance: true,
            approve_advance: false,
            reject_advance: false,
            view_cards: false,
            activate_card: false,
            deactivate_card: false,
            block_card: false,
            view_card_transactions: false,
            view_reports: true,
            export_data: false,
            view_audit_logs: false,
            manage_users: false,
            manage_settings: false,
        },
        Role::Checker => PermissionSet {
            view_employees: true,
            create_employee: false,
            edit_employee: false,
            delete_employee: false,
            view_transactions: true,
            create_transaction: false,
            approve_transaction: true,
            reject_transaction: true,
            view_advances: true,
            create_advance: false,
            approve_advance: true,
            reject_advance: true,
            view_cards: true,
            activate_card: true,
            deactivate_card: true,
            block_card: true,
            view_card_transactions: true,
            view_reports: true,
            export_data: true,
            view_audit_logs: true,
            manage_users: false,
            manage_settings: false,
        },
        Role::Support => PermissionSet {
            view_employees: true,
            create_employee: false,
            edit_employee: false,
            delete_employee: false,
            view_transactions: true,
            create_transaction: false,
            approve_transaction: false,
            reject_transaction: false,
            view_advances: true,
            create_advance: false,
            approve_advance: false,
            reject_advance: false,
            view_cards: true,
            activate_card: false,
            deactivate_card: false,
            block_card: false,
            view_card_transactions: true,
            view_reports: true,
            export_data: false,
            view_audit_logs: false,
            manage_users: false,
            manage_settings: false,
        },
        Role::SuperAdmin => PermissionSet {
            view_employees: true,
            create_employee: true,
            edit_employee: true,
            delete_employee: true,
            view_transactions: true,
            create_transaction: true,
            approve_transaction: true,
            reject_transaction: true,
            view_advances: true,
            create_advance: true,
            approve_advance: true,
            reject_advance: true,
            view_cards: true,
            activate_card: true,
            deactivate_card: true,
            block_card: true,
            view_card_transactions: true,
            view_reports: true,
            export_data: true,
            view_audit_logs: true,
            manage_users: true,
            manage_settings: true,
        },
    }
}
