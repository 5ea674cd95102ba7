pub mod admin_secret;
pub mod admin_user;
pub mod app_setting;
pub mod audit_log;
pub mod card;
pub mod card_transaction;
pub mod employee;
pub mod salary_advance;
pub mod transaction;
