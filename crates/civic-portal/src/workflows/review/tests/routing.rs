use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::review::domain::{ApplicationStatus, Role};
use crate::workflows::review::router::{status_handler, StatusUpdateRequest, VettingData};
use crate::workflows::review::ReviewWorkflowService;

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("encode body")))
        .expect("request builds")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn submit_route_returns_created_application() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/applications",
            serde_json::to_value(submission(&all_kinds())).expect("encode submission"),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], json!("pending"));
    assert_eq!(payload["serviceName"], json!("City Pass"));
    assert!(payload["referenceNumber"].as_str().is_some());
    assert_eq!(
        payload["applicationData"]["documentVerifications"]["national_id_verified"],
        json!(false)
    );
    assert_eq!(
        payload["applicationData"]["personalInfo"]["fullName"],
        json!("Ama Mensah")
    );
}

#[tokio::test]
async fn malformed_body_is_a_validation_error() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/applications",
            json!({ "serviceName": 42 }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert!(payload["error"].as_str().is_some());
}

#[tokio::test]
async fn status_handler_reports_vetting_incomplete() {
    let (service, _, _) = build_service();
    let application = service.submit(submission(&all_kinds())).expect("submit");

    let response = status_handler::<MemoryRepository, MemoryNotifier>(
        State(Arc::new(service)),
        Path(application.id.0.clone()),
        Ok(axum::Json(StatusUpdateRequest {
            status: Some(ApplicationStatus::InProgress),
            admin_id: Some(admin(Role::VettingAdmin).id),
            admin_role: Some(Role::VettingAdmin),
            notes: None,
            vetting_data: None,
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["missingDocuments"],
        json!(["National ID", "Address Proof", "Category-Specific Document"])
    );
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("National ID"));
}

#[tokio::test]
async fn status_handler_honours_vetting_data_override() {
    let (service, repository, _) = build_service();
    let application = service.submit(submission(&all_kinds())).expect("submit");

    let response = status_handler::<MemoryRepository, MemoryNotifier>(
        State(Arc::new(service)),
        Path(application.id.0.clone()),
        Ok(axum::Json(StatusUpdateRequest {
            status: Some(ApplicationStatus::InProgress),
            admin_id: Some(admin(Role::SuperAdmin).id),
            admin_role: Some(Role::SuperAdmin),
            notes: Some("outer note".to_string()),
            vetting_data: Some(VettingData {
                documents_verified: true,
                notes: Some("checked at counter".to_string()),
            }),
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let stored = repository.stored(&application.id).expect("stored");
    assert_eq!(stored.status, ApplicationStatus::InProgress);
    let vetting = stored.application_data.vetting.expect("vetting record");
    assert_eq!(vetting.notes.as_deref(), Some("checked at counter"));
}

#[tokio::test]
async fn status_route_maps_errors_to_http_codes() {
    let (service, _, _) = build_service();
    let application = service.submit(submission(&all_kinds())).expect("submit");
    let router = router_with_service(service);
    let uri = format!("/api/v1/applications/{}/status", application.id);

    let cases = [
        (
            json!({ "status": "completed", "adminId": "a-1", "adminRole": "super_admin" }),
            StatusCode::FORBIDDEN,
        ),
        (
            json!({ "status": "pending", "adminId": "a-1", "adminRole": "super_admin" }),
            StatusCode::BAD_REQUEST,
        ),
        (
            json!({ "status": "rejected", "adminRole": "super_admin" }),
            StatusCode::BAD_REQUEST,
        ),
        (
            json!({ "status": "rejected", "adminId": "a-1", "adminRole": "citizen" }),
            StatusCode::FORBIDDEN,
        ),
    ];

    for (body, expected) in cases {
        let response = router
            .clone()
            .oneshot(json_request(Method::PATCH, &uri, body.clone()))
            .await
            .expect("route executes");
        assert_eq!(response.status(), expected, "body {body}");
    }

    let missing = router
        .oneshot(json_request(
            Method::PATCH,
            "/api/v1/applications/app-missing/status",
            json!({ "status": "rejected", "adminId": "a-1", "adminRole": "admin" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn verify_documents_route_updates_flags() {
    let (service, _, _) = build_service();
    let application = service.submit(submission(&all_kinds())).expect("submit");
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            Method::PATCH,
            &format!("/api/v1/applications/{}/verify-documents", application.id),
            json!({
                "national_id_verified": true,
                "category_doc_verified": true,
                "verified_by": "vetting_admin-7",
                "verification_notes": "originals sighted",
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let record = &payload["applicationData"]["documentVerifications"];
    assert_eq!(record["national_id_verified"], json!(true));
    assert_eq!(record["address_proof_verified"], json!(false));
    assert_eq!(record["category_doc_verified"], json!(true));
    assert_eq!(record["verified_by"], json!("vetting_admin-7"));
    assert_eq!(payload["status"], json!("pending"));
}

#[tokio::test]
async fn delete_route_checks_ownership() {
    let (service, repository, _) = build_service();
    let application = service.submit(submission(&all_kinds())).expect("submit");
    let router = router_with_service(service);
    let uri = format!("/api/v1/applications/{}", application.id);

    let stranger = router
        .clone()
        .oneshot(json_request(
            Method::DELETE,
            &uri,
            json!({ "userId": "someone-else" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(stranger.status(), StatusCode::NOT_FOUND);
    assert!(repository.stored(&application.id).is_some());

    let owner_response = router
        .oneshot(json_request(Method::DELETE, &uri, json!({ "userId": OWNER })))
        .await
        .expect("route executes");
    assert_eq!(owner_response.status(), StatusCode::NO_CONTENT);
    assert!(repository.stored(&application.id).is_none());
}

#[tokio::test]
async fn owner_and_admin_read_routes() {
    let (service, _, _) = build_service();
    let application = service.submit(submission(&all_kinds())).expect("submit");
    let router = router_with_service(service);

    let own = router
        .clone()
        .oneshot(get_request(&format!(
            "/api/v1/applications/{}?userId={OWNER}",
            application.id
        )))
        .await
        .expect("route executes");
    assert_eq!(own.status(), StatusCode::OK);

    let missing_user = router
        .clone()
        .oneshot(get_request(&format!(
            "/api/v1/applications/{}",
            application.id
        )))
        .await
        .expect("route executes");
    assert_eq!(missing_user.status(), StatusCode::BAD_REQUEST);

    let mine = router
        .clone()
        .oneshot(get_request(&format!("/api/v1/users/{OWNER}/applications")))
        .await
        .expect("route executes");
    let payload = read_json_body(mine).await;
    assert_eq!(payload.as_array().map(Vec::len), Some(1));

    let queue = router
        .clone()
        .oneshot(get_request(
            "/api/v1/applications?adminId=a-1&adminRole=vetting_admin&status=pending",
        ))
        .await
        .expect("route executes");
    assert_eq!(queue.status(), StatusCode::OK);
    let payload = read_json_body(queue).await;
    assert_eq!(payload.as_array().map(Vec::len), Some(1));

    let forbidden = router
        .clone()
        .oneshot(get_request("/api/v1/applications?adminId=u-1&adminRole=citizen"))
        .await
        .expect("route executes");
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let review = router
        .oneshot(get_request(&format!(
            "/api/v1/admin/applications/{}?adminId=a-1&adminRole=approving_admin",
            application.id
        )))
        .await
        .expect("route executes");
    assert_eq!(review.status(), StatusCode::OK);
    let payload = read_json_body(review).await;
    assert_eq!(payload["workflowMessage"], json!("Awaiting Vetting Process"));
    assert_eq!(payload["presentation"]["displayName"], json!("Pending Review"));
    assert_eq!(payload["actions"][0]["allowed"], json!(false));
    assert_eq!(payload["actions"][2]["allowed"], json!(true));
}

#[tokio::test]
async fn persistence_failure_hides_detail() {
    let service = Arc::new(ReviewWorkflowService::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryNotifier::default()),
        workflow_config(),
    ));
    let router = crate::workflows::review::application_router(service);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/applications",
            serde_json::to_value(submission(&all_kinds())).expect("encode submission"),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    let message = payload["error"].as_str().unwrap_or_default();
    assert!(!message.contains("database offline"));
    assert!(message.contains("unavailable"));
}
