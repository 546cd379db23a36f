use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use super::common::*;
use crate::marketplace::domain::PropertyStatus;
use crate::marketplace::error::ADMIN_REQUIRED;

fn admin_endpoints(property_id: &str) -> Vec<(Method, String, Option<Value>)> {
    vec![
        (Method::GET, "/api/admin/agents".to_string(), None),
        (
            Method::POST,
            "/api/admin/agents/verify".to_string(),
            Some(json!({ "agentId": Uuid::new_v4(), "action": "approve" })),
        ),
        (Method::GET, "/api/admin/properties".to_string(), None),
        (
            Method::POST,
            format!("/api/admin/properties/{property_id}/moderate"),
            Some(json!({ "action": "approve" })),
        ),
        (Method::GET, "/api/admin/analytics".to_string(), None),
        (Method::GET, "/api/admin/system-config".to_string(), None),
        (
            Method::PUT,
            "/api/admin/system-config".to_string(),
            Some(json!({ "category": "listings", "key": "max_images", "value": 20 })),
        ),
    ]
}

/// Requests an admin would get 400 for.
fn malformed_admin_requests(property_id: &str) -> Vec<(Method, String, Option<Value>)> {
    vec![
        (Method::GET, "/api/admin/agents?status=bogus".to_string(), None),
        (Method::GET, "/api/admin/properties?page=abc".to_string(), None),
        (
            Method::POST,
            "/api/admin/agents/verify".to_string(),
            Some(json!({})),
        ),
        (
            Method::POST,
            format!("/api/admin/properties/{property_id}/moderate"),
            Some(json!({ "action": "explode" })),
        ),
        (
            Method::POST,
            "/api/admin/properties/not-a-uuid/moderate".to_string(),
            Some(json!({ "action": "approve" })),
        ),
        (
            Method::PUT,
            "/api/admin/system-config".to_string(),
            Some(json!("listings.max_images=20")),
        ),
    ]
}

#[tokio::test]
async fn admin_endpoints_reject_customers_and_agents() {
    let harness = Harness::new();
    let customer = harness.sign_in(&customer_profile("buyer@example.com"));
    let agent_profile = verified_agent("agent@example.com");
    let agent = harness.sign_in(&agent_profile);
    let property = harness.stored_listing(&agent_profile, PropertyStatus::Pending);

    let property_id = property.id.to_string();
    let requests: Vec<_> = admin_endpoints(&property_id)
        .into_iter()
        .chain(malformed_admin_requests(&property_id))
        .collect();
    for token in [&customer, &agent] {
        for (method, uri, body) in requests.clone() {
            let response = send(harness.router(), method.clone(), &uri, Some(token), body).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{method} {uri}");
            let payload = read_json_body(response).await;
            assert_eq!(payload["error"], ADMIN_REQUIRED, "{method} {uri}");
        }
    }

    assert_eq!(harness.property(property.id).status, PropertyStatus::Pending);
}

#[tokio::test]
async fn admin_endpoints_require_a_session() {
    let harness = Harness::new();
    for (method, uri, body) in admin_endpoints(&Uuid::new_v4().to_string()) {
        let response = send(harness.router(), method.clone(), &uri, None, body).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        let payload = read_json_body(response).await;
        assert_eq!(payload, json!({ "error": "Unauthorized" }));
    }
}

#[tokio::test]
async fn protected_endpoints_require_a_session() {
    let harness = Harness::new();
    let property_id = Uuid::new_v4();
    let inquiry_id = Uuid::new_v4();
    let endpoints = [
        (Method::GET, "/api/auth/session".to_string()),
        (Method::GET, "/api/profile".to_string()),
        (Method::POST, "/api/profile".to_string()),
        (Method::PUT, "/api/profile".to_string()),
        (Method::GET, "/api/profile/completion".to_string()),
        (Method::POST, "/api/properties".to_string()),
        (Method::PUT, format!("/api/properties/{property_id}")),
        (Method::DELETE, format!("/api/properties/{property_id}")),
        (Method::GET, "/api/inquiries".to_string()),
        (Method::PUT, format!("/api/inquiries/{inquiry_id}")),
        (Method::GET, "/api/seller/dashboard".to_string()),
    ];

    for (method, uri) in endpoints {
        let response = send(harness.router(), method.clone(), &uri, None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}

#[tokio::test]
async fn revoked_or_unknown_tokens_are_unauthorized() {
    let harness = Harness::new();
    let token = harness.sign_in(&customer_profile("buyer@example.com"));
    harness.sessions.revoke(&token);

    for token in [token.as_str(), "made-up"] {
        let response = send(
            harness.router(),
            Method::GET,
            "/api/profile",
            Some(token),
            None,
        )
        .await;
        assert_status(&response, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn seller_dashboard_is_for_agents() {
    let harness = Harness::new();
    let customer = harness.sign_in(&customer_profile("buyer@example.com"));
    let response = send(
        harness.router(),
        Method::GET,
        "/api/seller/dashboard",
        Some(&customer),
        None,
    )
    .await;
    assert_status(&response, StatusCode::FORBIDDEN);
}
