use axum::http::{Method, StatusCode};
use serde_json::json;

use super::common::*;
use crate::marketplace::domain::{InquiryStatus, PropertyStatus};
use crate::marketplace::repository::InquiryRepository;

fn inquiry_body() -> serde_json::Value {
    json!({
        "name": "Casey Buyer",
        "email": "buyer@example.com",
        "message": "Could we tour the house on Saturday?"
    })
}

#[tokio::test]
async fn inquiry_lifecycle_through_routes() {
    let harness = Harness::new();
    let agent = verified_agent("agent@example.com");
    let agent_token = harness.sign_in(&agent);
    let customer = customer_profile("buyer@example.com");
    let customer_token = harness.sign_in(&customer);
    let property = harness.stored_listing(&agent, PropertyStatus::Active);

    let response = send(
        harness.router(),
        Method::POST,
        &format!("/api/properties/{}/inquiries", property.id),
        Some(&customer_token),
        Some(inquiry_body()),
    )
    .await;
    assert_status(&response, StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["data"]["profile_id"], json!(customer.id));
    let inquiry_id = payload["data"]["id"]
        .as_str()
        .expect("inquiry id")
        .to_string();

    let response = send(
        harness.router(),
        Method::GET,
        "/api/inquiries",
        Some(&agent_token),
        None,
    )
    .await;
    assert_status(&response, StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["pagination"]["total"], 1);

    let response = send(
        harness.router(),
        Method::PUT,
        &format!("/api/inquiries/{inquiry_id}"),
        Some(&customer_token),
        Some(json!({ "response": "Sure" })),
    )
    .await;
    assert_status(&response, StatusCode::FORBIDDEN);

    let response = send(
        harness.router(),
        Method::PUT,
        &format!("/api/inquiries/{inquiry_id}"),
        Some(&agent_token),
        Some(json!({ "response": "Saturday at 10 works." })),
    )
    .await;
    assert_status(&response, StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["data"]["status"], "responded");
    assert!(payload["data"]["responded_at"].is_string());

    let response = send(
        harness.router(),
        Method::PUT,
        &format!("/api/inquiries/{inquiry_id}"),
        Some(&agent_token),
        Some(json!({ "status": "closed" })),
    )
    .await;
    assert_status(&response, StatusCode::OK);

    let response = send(
        harness.router(),
        Method::PUT,
        &format!("/api/inquiries/{inquiry_id}"),
        Some(&agent_token),
        Some(json!({ "status": "pending" })),
    )
    .await;
    assert_status(&response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn anonymous_inquiries_need_an_active_listing() {
    let harness = Harness::new();
    let agent = verified_agent("agent@example.com");
    let pending = harness.stored_listing(&agent, PropertyStatus::Pending);
    let active = harness.stored_listing(&agent, PropertyStatus::Active);

    let response = send(
        harness.router(),
        Method::POST,
        &format!("/api/properties/{}/inquiries", pending.id),
        None,
        Some(inquiry_body()),
    )
    .await;
    assert_status(&response, StatusCode::NOT_FOUND);

    let response = send(
        harness.router(),
        Method::POST,
        &format!("/api/properties/{}/inquiries", active.id),
        None,
        Some(inquiry_body()),
    )
    .await;
    assert_status(&response, StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert!(payload["data"]["profile_id"].is_null());
}

#[tokio::test]
async fn customers_only_see_their_own_inquiries() {
    let harness = Harness::new();
    let agent = verified_agent("agent@example.com");
    let property = harness.stored_listing(&agent, PropertyStatus::Active);
    let customer = customer_profile("buyer@example.com");
    let token = harness.sign_in(&customer);
    InquiryRepository::insert(&harness.store, inquiry_for(&property, Some(customer.id)))
        .expect("insert");
    InquiryRepository::insert(&harness.store, inquiry_for(&property, None)).expect("insert");

    let response = send(
        harness.router(),
        Method::GET,
        "/api/inquiries",
        Some(&token),
        None,
    )
    .await;
    let payload = read_json_body(response).await;
    assert_eq!(payload["pagination"]["total"], 1);
    assert_eq!(payload["data"][0]["profile_id"], json!(customer.id));
}

#[tokio::test]
async fn seller_dashboard_summarizes_own_listings() {
    let harness = Harness::new();
    let agent = verified_agent("agent@example.com");
    let token = harness.sign_in(&agent);
    let other = verified_agent("other@example.com");
    let active = harness.stored_listing(&agent, PropertyStatus::Active);
    harness.stored_listing(&agent, PropertyStatus::Pending);
    harness.stored_listing(&other, PropertyStatus::Active);
    harness.service.view_property(None, active.id).expect("view");
    let mut answered = inquiry_for(&active, None);
    answered.status = InquiryStatus::Responded;
    InquiryRepository::insert(&harness.store, answered).expect("insert");
    InquiryRepository::insert(&harness.store, inquiry_for(&active, None)).expect("insert");

    let response = send(
        harness.router(),
        Method::GET,
        "/api/seller/dashboard",
        Some(&token),
        None,
    )
    .await;
    assert_status(&response, StatusCode::OK);
    let payload = read_json_body(response).await;
    let data = &payload["data"];
    assert_eq!(data["total_listings"], 2);
    assert_eq!(data["listings_by_status"]["active"], 1);
    assert_eq!(data["listings_by_status"]["pending"], 1);
    assert_eq!(data["total_views"], 1);
    assert_eq!(data["total_inquiries"], 2);
    assert_eq!(data["open_inquiries"], 1);
    assert_eq!(data["recent_inquiries"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn admin_analytics_and_moderation() {
    let harness = Harness::new();
    let admin = harness.sign_in(&admin_profile("admin@example.com"));
    let agent = verified_agent("agent@example.com");
    harness.sign_in(&agent);
    harness.sign_in(&customer_profile("buyer@example.com"));
    let pending = harness.stored_listing(&agent, PropertyStatus::Pending);

    let response = send(
        harness.router(),
        Method::POST,
        &format!("/api/admin/properties/{}/moderate", pending.id),
        Some(&admin),
        Some(json!({ "action": "reject", "reason": "Photos missing" })),
    )
    .await;
    assert_status(&response, StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["data"]["status"], "archived");
    assert_eq!(payload["data"]["rejection_reason"], "Photos missing");

    let response = send(
        harness.router(),
        Method::POST,
        &format!("/api/admin/properties/{}/moderate", pending.id),
        Some(&admin),
        Some(json!({ "action": "approve" })),
    )
    .await;
    assert_status(&response, StatusCode::BAD_REQUEST);

    let response = send(
        harness.router(),
        Method::GET,
        "/api/admin/analytics",
        Some(&admin),
        None,
    )
    .await;
    assert_status(&response, StatusCode::OK);
    let payload = read_json_body(response).await;
    let data = &payload["data"];
    assert_eq!(data["profiles_by_role"]["admin"], 1);
    assert_eq!(data["profiles_by_role"]["agent"], 1);
    assert_eq!(data["profiles_by_role"]["customer"], 1);
    assert_eq!(data["agents_by_verification"]["verified"], 1);
    assert_eq!(data["properties_by_status"]["archived"], 1);
    assert_eq!(data["events_by_kind"]["rejected"], 1);
}

#[tokio::test]
async fn system_settings_round_trip_by_category() {
    let harness = Harness::new();
    let admin = harness.sign_in(&admin_profile("admin@example.com"));

    for (category, key, value) in [
        ("listings", "max_images", json!(20)),
        ("listings", "auto_approve", json!(false)),
        ("inquiries", "daily_limit", json!(25)),
    ] {
        let response = send(
            harness.router(),
            Method::PUT,
            "/api/admin/system-config",
            Some(&admin),
            Some(json!({ "category": category, "key": key, "value": value })),
        )
        .await;
        assert_status(&response, StatusCode::OK);
    }

    let response = send(
        harness.router(),
        Method::GET,
        "/api/admin/system-config?category=listings",
        Some(&admin),
        None,
    )
    .await;
    let payload = read_json_body(response).await;
    let listings = payload["data"]["listings"]
        .as_object()
        .expect("listings category");
    assert_eq!(listings.len(), 2);
    assert_eq!(listings["max_images"]["value"], 20);
    assert!(payload["data"].get("inquiries").is_none());

    let stored = harness
        .service
        .setting("inquiries", "daily_limit")
        .expect("lookup")
        .expect("setting saved");
    assert_eq!(stored.value, json!(25));
    assert!(stored.updated_by.is_some());

    let response = send(
        harness.router(),
        Method::PUT,
        "/api/admin/system-config",
        Some(&admin),
        Some(json!({ "category": "Listings", "key": "max images", "value": 1 })),
    )
    .await;
    assert_status(&response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn agent_directory_lists_verified_agents_only() {
    let harness = Harness::new();
    let verified = verified_agent("verified@example.com");
    harness.sign_in(&verified);
    let pending = agent_profile("pending@example.com");
    harness.sign_in(&pending);
    harness.stored_listing(&verified, PropertyStatus::Active);

    let response = send(harness.router(), Method::GET, "/api/agents", None, None).await;
    assert_status(&response, StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["pagination"]["total"], 1);
    assert_eq!(payload["data"][0]["active_listings"], 1);

    let response = send(
        harness.router(),
        Method::GET,
        &format!("/api/agents/{}", pending.id),
        None,
        None,
    )
    .await;
    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn property_routes_use_pagination_envelope() {
    let harness = Harness::new();
    let agent = verified_agent("agent@example.com");
    for _ in 0..3 {
        harness.stored_listing(&agent, PropertyStatus::Active);
    }

    let response = send(
        harness.router(),
        Method::GET,
        "/api/properties?page=2&limit=2&city=des%20moines",
        None,
        None,
    )
    .await;
    assert_status(&response, StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(
        payload["pagination"],
        json!({ "page": 2, "limit": 2, "total": 3, "totalPages": 2 })
    );
}

#[tokio::test]
async fn out_of_range_paging_is_clamped() {
    let harness = Harness::new();
    let agent = verified_agent("agent@example.com");
    for _ in 0..3 {
        harness.stored_listing(&agent, PropertyStatus::Active);
    }

    let response = send(
        harness.router(),
        Method::GET,
        "/api/properties?page=-1&limit=0",
        None,
        None,
    )
    .await;
    assert_status(&response, StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["pagination"],
        json!({ "page": 1, "limit": 1, "total": 3, "totalPages": 3 })
    );
}

#[tokio::test]
async fn bad_query_values_use_error_envelope() {
    let harness = Harness::new();
    for uri in [
        "/api/properties?property_type=castle",
        "/api/properties?min_price=cheap",
        "/api/agents?page=first",
    ] {
        let response = send(harness.router(), Method::GET, uri, None, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let payload = read_json_body(response).await;
        assert_eq!(payload["error"], "Invalid query parameters", "{uri}");
        assert!(payload["details"].is_string(), "{uri}");
    }
}

#[tokio::test]
async fn unsupported_method_is_rejected() {
    let harness = Harness::new();
    let response = send(harness.router(), Method::PATCH, "/api/properties", None, None).await;
    assert_status(&response, StatusCode::METHOD_NOT_ALLOWED);
}
