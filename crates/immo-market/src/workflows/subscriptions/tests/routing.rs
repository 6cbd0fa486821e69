use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use std::sync::Arc;

use super::common::*;
use crate::auth::USER_ID_HEADER;
use crate::store::RepositoryError;
use crate::workflows::accounts::domain::{Role, UserAccount};
use crate::workflows::subscriptions::{
    subscription_router, SubscriptionPlan, SubscriptionService, SubscriptionStore,
};

fn json_request(
    method: Method,
    uri: &str,
    caller: &UserAccount,
    body: serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, caller.id.0.as_str())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn empty_request(method: Method, uri: &str, caller: &UserAccount) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, caller.id.0.as_str())
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn plans_endpoint_lists_prices_and_durations() {
    let fixture = fixture();
    let response = application_router_with(&fixture)
        .oneshot(
            Request::builder()
                .uri("/api/v1/subscriptions/plans")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let plans = read_json_body(response).await;
    assert_eq!(plans[0]["plan"], "trial");
    assert_eq!(plans[0]["price"], 0);
    assert_eq!(plans[2]["plan"], "premium");
    assert_eq!(plans[2]["price"], 25_000);
    assert_eq!(plans[2]["advertised_days"], 90);
    assert_eq!(plans[2]["granted_days"], 30);
    assert_eq!(plans[1]["currency"], "XOF");
}

#[tokio::test]
async fn unconfirmed_submission_echoes_draft_without_writing() {
    let fixture = fixture();
    let response = application_router_with(&fixture)
        .oneshot(json_request(
            Method::POST,
            "/api/v1/subscriptions/requests",
            &fixture.agent,
            json!({ "plan": "basic" }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["draft"]["amount"], 10_000);
    assert_eq!(body["draft"]["applicant"]["name"], "Ibrahima Sow");

    assert!(fixture
        .store
        .requests_newest_first()
        .expect("list")
        .is_empty());
}

#[tokio::test]
async fn confirmed_submission_then_review_round_trip() {
    let fixture = fixture();
    let router = application_router_with(&fixture);

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/subscriptions/requests",
            &fixture.agent,
            json!({ "plan": "premium", "confirmed": true }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json_body(response).await;
    assert_eq!(created["status"], "pending");
    assert_eq!(created["payment_status"], "pending");
    let id = created["id"].as_str().expect("id string").to_string();

    let approve_uri = format!("/api/v1/admin/subscriptions/requests/{id}/approve");

    let forbidden = router
        .clone()
        .oneshot(empty_request(Method::POST, &approve_uri, &fixture.agent))
        .await
        .expect("router responds");
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let approved = router
        .clone()
        .oneshot(empty_request(Method::POST, &approve_uri, &fixture.admin))
        .await
        .expect("router responds");
    assert_eq!(approved.status(), StatusCode::OK);
    let receipt = read_json_body(approved).await;
    assert_eq!(receipt["request"]["status"], "approved");
    assert_eq!(receipt["request"]["payment_status"], "confirmed");
    assert_eq!(receipt["notification"]["kind"], "subscription_created");

    let again = router
        .clone()
        .oneshot(empty_request(Method::POST, &approve_uri, &fixture.admin))
        .await
        .expect("router responds");
    assert_eq!(again.status(), StatusCode::CONFLICT);
    let body = read_json_body(again).await;
    assert_eq!(body["status"], "approved");

    let owner_view = router
        .oneshot(empty_request(
            Method::GET,
            &format!("/api/v1/subscriptions/requests/{id}"),
            &fixture.agent,
        ))
        .await
        .expect("router responds");
    assert_eq!(owner_view.status(), StatusCode::OK);
}

#[tokio::test]
async fn incomplete_profile_returns_missing_fields() {
    let fixture = fixture();
    let applicant = register(
        &*fixture.store,
        Role::Demarcheur,
        profile("Awa Diop", "awa@immo.test", ""),
    );

    let response = application_router_with(&fixture)
        .oneshot(json_request(
            Method::POST,
            "/api/v1/subscriptions/requests",
            &applicant,
            json!({ "plan": "trial", "confirmed": true }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "Incomplete user data, refresh the page.");
    assert_eq!(body["missing"], json!(["zone"]));
}

#[tokio::test]
async fn review_queue_accepts_search_query() {
    let fixture = fixture();
    let draft = fixture
        .service
        .prepare(&principal(&fixture.agent), SubscriptionPlan::Basic)
        .expect("draft");
    fixture.service.confirm(draft).expect("stored");

    let hit = application_router_with(&fixture)
        .oneshot(empty_request(
            Method::GET,
            "/api/v1/admin/subscriptions/requests?q=parcelles",
            &fixture.admin,
        ))
        .await
        .expect("router responds");
    assert_eq!(hit.status(), StatusCode::OK);
    let entries = read_json_body(hit).await;
    assert_eq!(entries.as_array().map(Vec::len), Some(1));
    assert_eq!(entries[0]["can_approve"], true);

    let miss = application_router_with(&fixture)
        .oneshot(empty_request(
            Method::GET,
            "/api/v1/admin/subscriptions/requests?q=thies&status=pending",
            &fixture.admin,
        ))
        .await
        .expect("router responds");
    let entries = read_json_body(miss).await;
    assert_eq!(entries.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn export_is_served_as_csv() {
    let fixture = fixture();
    let response = application_router_with(&fixture)
        .oneshot(empty_request(
            Method::GET,
            "/api/v1/admin/subscriptions/requests/export",
            &fixture.admin,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/csv"));
}

#[tokio::test]
async fn missing_identity_header_is_unauthorized() {
    let fixture = fixture();
    let response = application_router_with(&fixture)
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/subscriptions/requests")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "plan": "basic" }).to_string()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_caller_is_unauthorized() {
    let fixture = fixture();
    let response = application_router_with(&fixture)
        .oneshot(
            Request::builder()
                .uri("/api/v1/admin/subscriptions/requests")
                .header(USER_ID_HEADER, "usr-404404")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn store_failures_surface_user_wording_over_http() {
    let store = Arc::new(FailingStore::new(RepositoryError::Unavailable(
        "replica lag".to_string(),
    )));
    let agent = register(
        &*store,
        Role::Demarcheur,
        profile("Ousmane Ba", "ousmane@immo.test", "Grand Yoff"),
    );
    let router = subscription_router(Arc::new(SubscriptionService::new(store)));

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/subscriptions/requests",
            &agent,
            json!({ "plan": "basic", "confirmed": true }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = read_json_body(response).await;
    assert_eq!(
        body["error"],
        RepositoryError::Unavailable(String::new()).user_message()
    );
    assert!(!body.to_string().contains("replica lag"));
}

#[tokio::test]
async fn permission_denied_store_maps_to_forbidden_on_queue() {
    let store = Arc::new(FailingStore::new(RepositoryError::PermissionDenied));
    let admin = register(
        &*store,
        Role::Admin,
        profile("Mame Diarra", "mame@immo.test", "Mermoz"),
    );
    let router = subscription_router(Arc::new(SubscriptionService::new(store)));

    let response = router
        .oneshot(empty_request(
            Method::GET,
            "/api/v1/admin/subscriptions/requests",
            &admin,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = read_json_body(response).await;
    assert_eq!(
        body["error"],
        "You do not have permission to perform this action."
    );
}
