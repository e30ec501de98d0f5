//! End-to-end brokerage workflow over HTTP.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`ed-cli migrate`)
//! - The API running (`cargo run -p estate-desk-api`)
//! - A broker account (`ed-cli user create -r broker ...`) whose
//!   credentials are in `BROKER_EMAIL` / `BROKER_PASSWORD`
//! - No active advisor with an empty zone list, since those serve every zone
//!
//! Run with: cargo test -p estate-desk-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

fn base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

/// Suffix that keeps codes and emails unique across runs.
fn stamp() -> String {
    Utc::now().format("%H%M%S%f").to_string()
}

async fn login(client: &Client, email: &str, password: &str) -> String {
    let resp = client
        .post(format!("{}/api/v1/auth/login", base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    body["access_token"].as_str().unwrap().to_owned()
}

async fn broker_token(client: &Client) -> String {
    let email = std::env::var("BROKER_EMAIL").expect("BROKER_EMAIL not set");
    let password = std::env::var("BROKER_PASSWORD").expect("BROKER_PASSWORD not set");
    login(client, &email, &password).await
}

async fn post(client: &Client, token: &str, path: &str, body: &Value) -> (StatusCode, Value) {
    let resp = client
        .post(format!("{}/api/v1{path}", base_url()))
        .bearer_auth(token)
        .json(body)
        .send()
        .await
        .expect("request failed");
    let status = resp.status();
    (status, resp.json().await.unwrap_or(Value::Null))
}

async fn get(client: &Client, token: &str, path: &str) -> (StatusCode, Value) {
    let resp = client
        .get(format!("{}/api/v1{path}", base_url()))
        .bearer_auth(token)
        .send()
        .await
        .expect("request failed");
    let status = resp.status();
    (status, resp.json().await.unwrap_or(Value::Null))
}

/// Employee plus a linked advisor login. Returns (`employee_id`, email).
async fn create_advisor(client: &Client, broker: &str, zone: &str, tag: &str) -> (i64, String) {
    let email = format!("advisor-{tag}@example.com");
    let (status, employee) = post(
        client,
        broker,
        "/employees",
        &json!({
            "national_id": format!("CI-{tag}"),
            "first_names": "Ana",
            "last_names": format!("Rojas {tag}"),
            "email": email,
            "phone": "+591 70000000",
            "zones": [zone],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{employee}");
    let employee_id = employee["id"].as_i64().unwrap();

    let (status, user) = post(
        client,
        broker,
        "/users",
        &json!({
            "email": email,
            "password": "Advisor-pass-2026",
            "role": "advisor",
            "employee_id": employee_id,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{user}");

    (employee_id, email)
}

async fn create_property(
    client: &Client,
    broker: &str,
    code: &str,
    zone: &str,
    advisor_id: Option<i64>,
) -> i64 {
    let (status, property) = post(
        client,
        broker,
        "/properties",
        &json!({
            "code": code,
            "title": "Casa en condominio",
            "listing_type": "sale",
            "price": "120000.00",
            "street": "Calle 8 #12",
            "city": "La Paz",
            "zone": zone,
            "owner_name": "Jorge Choque",
            "owner_phone": "+591 74444444",
            "advisor_id": advisor_id,
            "commission_rate": "3",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{property}");
    property["id"].as_i64().unwrap()
}

async fn create_client(client: &Client, broker: &str, zone: &str) -> i64 {
    let (status, row) = post(
        client,
        broker,
        "/clients",
        &json!({
            "full_name": "Carla Vargas",
            "phone": "+591 75555555",
            "preferred_zone": zone,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{row}");
    row["id"].as_i64().unwrap()
}

#[tokio::test]
#[ignore = "Requires running API and database"]
async fn test_visit_to_operation_flow() {
    let client = Client::new();
    let broker = broker_token(&client).await;
    let tag = stamp();
    let zone = format!("Zona {tag}");

    let (advisor_id, advisor_email) = create_advisor(&client, &broker, &zone, &tag).await;

    let (status, property) = post(
        &client,
        &broker,
        "/properties",
        &json!({
            "code": format!("P-{tag}"),
            "title": "Casa con jardin",
            "listing_type": "sale",
            "price": "185000.00",
            "street": "Calle 21 #45",
            "city": "La Paz",
            "zone": zone,
            "owner_name": "Luis Mamani",
            "owner_phone": "+591 71111111",
            "advisor_id": advisor_id,
            "commission_rate": "3",
            "published": true,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{property}");
    let property_id = property["id"].as_i64().unwrap();

    let (status, client_row) = post(
        &client,
        &broker,
        "/clients",
        &json!({
            "full_name": "Maria Quispe",
            "phone": "+591 72222222",
            "preferred_zone": zone,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{client_row}");
    let client_id = client_row["id"].as_i64().unwrap();

    let starts = Utc::now() + Duration::days(2);
    let (status, visit) = post(
        &client,
        &broker,
        "/visits",
        &json!({
            "property_id": property_id,
            "client_id": client_id,
            "advisor_id": advisor_id,
            "scheduled_at": starts,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{visit}");
    assert_eq!(visit["status"], "scheduled");
    let visit_id = visit["id"].as_i64().unwrap();

    // Same advisor, overlapping slot.
    let (status, _) = post(
        &client,
        &broker,
        "/visits",
        &json!({
            "property_id": property_id,
            "client_id": client_id,
            "advisor_id": advisor_id,
            "scheduled_at": starts + Duration::minutes(15),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let advisor = login(&client, &advisor_email, "Advisor-pass-2026").await;

    let (status, own) = get(&client, &advisor, "/visits").await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        own["items"]
            .as_array()
            .unwrap()
            .iter()
            .all(|v| v["advisor_id"].as_i64() == Some(advisor_id))
    );

    let (status, done) = post(
        &client,
        &advisor,
        &format!("/visits/{visit_id}/outcome"),
        &json!({ "outcome_notes": "Quiere cerrar", "client_interested": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{done}");
    assert_eq!(done["status"], "completed");

    let (status, operation) = post(
        &client,
        &broker,
        "/operations",
        &json!({
            "property_id": property_id,
            "client_id": client_id,
            "visit_id": visit_id,
            "kind": "sale",
            "amount": "180000.00",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{operation}");
    let operation_id = operation["id"].as_i64().unwrap();
    let shares = operation["shares"].as_array().unwrap();
    assert!(shares.iter().any(|s| s["recipient"] == "broker"));
    assert!(
        shares
            .iter()
            .any(|s| s["employee_id"].as_i64() == Some(advisor_id))
    );

    let (status, finalized) = post(
        &client,
        &broker,
        &format!("/operations/{operation_id}/finalize"),
        &json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{finalized}");

    let (status, detail) = get(&client, &broker, &format!("/properties/{property_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["status"], "sold");

    // Closed listings drop out of the public catalog.
    let resp = client
        .get(format!("{}/api/v1/catalog/properties/P-{tag}", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running API and database"]
async fn test_advisor_sees_only_assigned_listings() {
    let client = Client::new();
    let broker = broker_token(&client).await;
    let tag = stamp();
    let zone = format!("Zona {tag}");

    let (advisor_id, advisor_email) = create_advisor(&client, &broker, &zone, &tag).await;

    let (status, unassigned) = post(
        &client,
        &broker,
        "/properties",
        &json!({
            "code": format!("U-{tag}"),
            "title": "Departamento centrico",
            "listing_type": "rental",
            "price": "650.00",
            "street": "Av. 6 de Agosto",
            "city": "La Paz",
            "zone": zone,
            "owner_name": "Rosa Flores",
            "owner_phone": "+591 73333333",
            "commission_rate": "5",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{unassigned}");
    let unassigned_id = unassigned["id"].as_i64().unwrap();

    let advisor = login(&client, &advisor_email, "Advisor-pass-2026").await;

    let (status, listed) = get(&client, &advisor, "/properties").await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        listed["items"]
            .as_array()
            .unwrap()
            .iter()
            .all(|p| p["advisor_id"].as_i64() == Some(advisor_id))
    );

    let (status, _) = get(&client, &advisor, &format!("/properties/{unassigned_id}")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running API and database"]
async fn test_login_rejects_wrong_password() {
    let client = Client::new();
    let email = std::env::var("BROKER_EMAIL").expect("BROKER_EMAIL not set");

    let resp = client
        .post(format!("{}/api/v1/auth/login", base_url()))
        .json(&json!({ "email": email, "password": "definitely-wrong" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
#[ignore = "Requires running API and database"]
async fn test_rotation_spreads_visits_across_zone_advisors() {
    let client = Client::new();
    let broker = broker_token(&client).await;
    let tag = stamp();
    let zone = format!("Zona {tag}");

    let (first, _) = create_advisor(&client, &broker, &zone, &format!("{tag}a")).await;
    let (second, _) = create_advisor(&client, &broker, &zone, &format!("{tag}b")).await;
    let property_id = create_property(&client, &broker, &format!("R-{tag}"), &zone, None).await;
    let client_id = create_client(&client, &broker, &zone).await;

    let starts = Utc::now() + Duration::days(3);
    let mut assigned = Vec::new();
    for offset in [0, 4] {
        let (status, visit) = post(
            &client,
            &broker,
            "/visits",
            &json!({
                "property_id": property_id,
                "client_id": client_id,
                "scheduled_at": starts + Duration::hours(offset),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{visit}");
        assigned.push(visit["advisor_id"].as_i64().unwrap());
    }

    // Slots do not overlap, so only the rotation pointer separates them.
    assert_ne!(assigned[0], assigned[1]);
    assert!(assigned.iter().all(|id| [first, second].contains(id)));
}

#[tokio::test]
#[ignore = "Requires running API and database"]
async fn test_unassigned_visit_without_zone_advisor_is_unprocessable() {
    let client = Client::new();
    let broker = broker_token(&client).await;
    let tag = stamp();
    let zone = format!("Zona vacia {tag}");

    let property_id = create_property(&client, &broker, &format!("E-{tag}"), &zone, None).await;
    let client_id = create_client(&client, &broker, &zone).await;

    let (status, body) = post(
        &client,
        &broker,
        "/visits",
        &json!({
            "property_id": property_id,
            "client_id": client_id,
            "scheduled_at": Utc::now() + Duration::days(1),
        }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["error"], "no_eligible_advisor");
}

#[tokio::test]
#[ignore = "Requires running API and database"]
async fn test_concurrent_bookings_for_one_advisor_do_not_overlap() {
    let client = Client::new();
    let broker = broker_token(&client).await;
    let tag = stamp();
    let zone = format!("Zona {tag}");

    let (advisor_id, _) = create_advisor(&client, &broker, &zone, &tag).await;
    let north = create_property(&client, &broker, &format!("N-{tag}"), &zone, None).await;
    let south = create_property(&client, &broker, &format!("S-{tag}"), &zone, None).await;
    let client_id = create_client(&client, &broker, &zone).await;

    let starts = Utc::now() + Duration::days(5);
    let booking = |property_id: i64| {
        json!({
            "property_id": property_id,
            "client_id": client_id,
            "advisor_id": advisor_id,
            "scheduled_at": starts,
        })
    };
    let (north_body, south_body) = (booking(north), booking(south));

    let (a, b) = tokio::join!(
        post(&client, &broker, "/visits", &north_body),
        post(&client, &broker, "/visits", &south_body),
    );

    let mut statuses = [a.0, b.0];
    statuses.sort_by_key(StatusCode::as_u16);
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT], "{} / {}", a.1, b.1);
}

#[tokio::test]
#[ignore = "Requires running API and database"]
async fn test_email_is_unique_regardless_of_case() {
    let client = Client::new();
    let broker = broker_token(&client).await;
    let tag = stamp();

    let (_, email) = create_advisor(&client, &broker, &format!("Zona {tag}"), &tag).await;

    let (status, body) = post(
        &client,
        &broker,
        "/users",
        &json!({
            "email": email.to_uppercase(),
            "password": "Advisor-pass-2026",
            "role": "secretary",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
#[ignore = "Requires running API and database"]
async fn test_last_broker_cannot_step_down() {
    let client = Client::new();
    let broker = broker_token(&client).await;

    let (status, me) = get(&client, &broker, "/auth/me").await;
    assert_eq!(status, StatusCode::OK);
    let me_id = me["id"].as_i64().unwrap();

    let (status, brokers) = get(&client, &broker, "/users?role=broker&active=true").await;
    assert_eq!(status, StatusCode::OK);
    if brokers["total"].as_i64() != Some(1) {
        // Only meaningful when the test broker is the sole active broker.
        return;
    }

    let resp = client
        .patch(format!("{}/api/v1/users/{me_id}/active", base_url()))
        .bearer_auth(&broker)
        .json(&json!({ "active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}
