mod common;

use async_graphql::{Request, Variables};
use common::{
    error_code, insert_admin, insert_employee, insert_pending_advance, principal_for, setup,
};
use entity::{audit_log, salary_advance};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

#[tokio::test]
async fn maker_creates_advance_with_default_fee() {
    let (db, schema) = setup().await;
    let maker = insert_admin(db.as_ref(), "maker@test", "MAKER", true).await;
    let employee = insert_employee(db.as_ref(), "emp@test").await;

    let mutation = r#"
        mutation Create($input: NewAdvanceInput!) {
            admin {
                createAdvance(input: $input) {
                    id
                    amountCents
                    serviceFeeCents
                    totalCents
                    status
                    createdBy
                }
            }
        }
    "#;
    let resp = schema
        .execute(
            Request::new(mutation)
                .variables(Variables::from_json(json!({
                    "input": { "employeeId": employee.id, "amountCents": 100_000 }
                })))
                .data(principal_for(&maker)),
        )
        .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let node = resp.data.into_json().unwrap()["admin"]["createAdvance"].clone();
    // 500 bps default when no advance_fee_bps setting exists.
    assert_eq!(node["serviceFeeCents"].as_i64(), Some(5_000));
    assert_eq!(node["totalCents"].as_i64(), Some(105_000));
    assert_eq!(node["status"].as_str(), Some("PENDING"));
    assert_eq!(node["createdBy"].as_str(), Some(maker.id.to_string().as_str()));

    let action_rows = audit_log::Entity::find()
        .filter(audit_log::Column::Action.eq("create_salary_advance"))
        .all(db.as_ref())
        .await
        .unwrap();
    assert_eq!(action_rows.len(), 1);
    assert_eq!(action_rows[0].admin_user_id, Some(maker.id));
    assert!(action_rows[0].allowed);
}

#[tokio::test]
async fn checker_cannot_create_advances() {
    let (db, schema) = setup().await;
    let checker = insert_admin(db.as_ref(), "checker@test", "CHECKER", true).await;
    let employee = insert_employee(db.as_ref(), "emp@test").await;

    let mutation = r#"
        mutation Create($input: NewAdvanceInput!) {
            admin {
                createAdvance(input: $input) { id }
            }
        }
    "#;
    let resp = schema
        .execute(
            Request::new(mutation)
                .variables(Variables::from_json(json!({
                    "input": { "employeeId": employee.id, "amountCents": 100_000 }
                })))
                .data(principal_for(&checker)),
        )
        .await;
    assert_eq!(error_code(&resp).as_deref(), Some("FORBIDDEN"));
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let (db, schema) = setup().await;
    let maker = insert_admin(db.as_ref(), "maker@test", "MAKER", true).await;
    let employee = insert_employee(db.as_ref(), "emp@test").await;

    let mutation = r#"
        mutation Create($input: NewAdvanceInput!) {
            admin {
                createAdvance(input: $input) { id }
            }
        }
    "#;
    let resp = schema
        .execute(
            Request::new(mutation)
                .variables(Variables::from_json(json!({
                    "input": { "employeeId": employee.id, "amountCents": 0 }
                })))
                .data(principal_for(&maker)),
        )
        .await;
    assert_eq!(error_code(&resp).as_deref(), Some("VALIDATION"));
}

#[tokio::test]
async fn rejection_reason_is_persisted() {
    let (db, schema) = setup().await;
    let maker = insert_admin(db.as_ref(), "maker@test", "MAKER", true).await;
    let checker = insert_admin(db.as_ref(), "checker@test", "CHECKER", true).await;
    let employee = insert_employee(db.as_ref(), "emp@test").await;
    let advance = insert_pending_advance(db.as_ref(), employee.id, Some(maker.id)).await;

    let mutation = r#"
        mutation Reject($id: ID!, $reason: String) {
            admin {
                rejectAdvance(id: $id, reason: $reason) {
                    id
                    status
                    rejectionReason
                }
            }
        }
    "#;
    let resp = schema
        .execute(
            Request::new(mutation)
                .variables(Variables::from_json(json!({
                    "id": advance.id,
                    "reason": "Salary already advanced this month"
                })))
                .data(principal_for(&checker)),
        )
        .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);

    let saved = salary_advance::Entity::find_by_id(advance.id)
        .one(db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.status, salary_advance::Status::Rejected);
    assert_eq!(
        saved.rejection_reason.as_deref(),
        Some("Salary already advanced this month")
    );
    assert_eq!(saved.reviewed_by, Some(checker.id));
}

#[tokio::test]
async fn approving_a_non_pending_advance_fails() {
    let (db, schema) = setup().await;
    let maker = insert_admin(db.as_ref(), "maker@test", "MAKER", true).await;
    let checker = insert_admin(db.as_ref(), "checker@test", "CHECKER", true).await;
    let employee = insert_employee(db.as_ref(), "emp@test").await;
    let advance = insert_pending_advance(db.as_ref(), employee.id, Some(maker.id)).await;

    let mutation = r#"
        mutation Approve($id: ID!) {
            admin {
                approveAdvance(id: $id) { id status }
            }
        }
    "#;
    let vars = Variables::from_json(json!({ "id": advance.id }));
    let resp = schema
        .execute(
            Request::new(mutation)
                .variables(vars.clone())
                .data(principal_for(&checker)),
        )
        .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);

    let resp = schema
        .execute(
            Request::new(mutation)
                .variables(vars)
                .data(principal_for(&checker)),
        )
        .await;
    assert_eq!(error_code(&resp).as_deref(), Some("VALIDATION"));
}

#[tokio::test]
async fn approval_writes_an_action_audit_row() {
    let (db, schema) = setup().await;
    let maker = insert_admin(db.as_ref(), "maker@test", "MAKER", true).await;
    let checker = insert_admin(db.as_ref(), "checker@test", "CHECKER", true).await;
    let employee = insert_employee(db.as_ref(), "emp@test").await;
    let advance = insert_pending_advance(db.as_ref(), employee.id, Some(maker.id)).await;

    let mutation = r#"
        mutation Approve($id: ID!) {
            admin {
                approveAdvance(id: $id) { id }
            }
        }
    "#;
    let resp = schema
        .execute(
            Request::new(mutation)
                .variables(Variables::from_json(json!({ "id": advance.id })))
                .data(principal_for(&checker)),
        )
        .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);

    let rows = audit_log::Entity::find()
        .filter(audit_log::Column::Action.eq("approve_salary_advance"))
        .all(db.as_ref())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].admin_user_id, Some(checker.id));
    assert_eq!(rows[0].entity_id, Some(advance.id));
    assert_eq!(rows[0].entity_type, "salary_advance");
}
