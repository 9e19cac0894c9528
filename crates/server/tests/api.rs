use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::{Bicycle, BicycleStatus, Engine, Member, Money};
use migration::MigratorTrait;

async fn app_with_db() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();

    for (id, brand, kind, rate) in [(5, "Trek", "Road", 15_00), (6, "Giant", "Mountain", 20_00)] {
        let bicycle = Bicycle::new(id, brand, kind, "M", Money::new(rate)).unwrap();
        engine.add_bicycle(&bicycle).await.unwrap();
    }
    let maintenance = Bicycle::new(7, "Trek", "Hybrid", "S", Money::new(10_00))
        .unwrap()
        .with_status(BicycleStatus::UnderMaintenance);
    engine.add_bicycle(&maintenance).await.unwrap();

    let member = Member::new(
        1,
        "Alice",
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
    )
    .unwrap()
    .rental_limit(2);
    engine.upsert_member(&member).await.unwrap();

    server::app(engine)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn rent_and_return_round_trip() {
    let app = app_with_db().await;

    let (status, body) = send(
        &app,
        "POST",
        "/rentals",
        Some(json!({
            "member_id": 1,
            "bicycle_id": 5,
            "rented_at": "2025-03-01T10:00:00+00:00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let confirmed = &body["confirmed"];
    assert_eq!(confirmed["bicycle_id"], 5);
    assert!(
        confirmed["expected_return_date"]
            .as_str()
            .unwrap()
            .starts_with("2025-03-08T10:00:00")
    );

    let (status, body) = send(&app, "GET", "/rentals/open", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rentals"].as_array().unwrap().len(), 1);
    assert_eq!(body["rentals"][0]["type"], "Road");

    let (status, body) = send(
        &app,
        "POST",
        "/returns",
        Some(json!({
            "bicycle_id": 5,
            "member_id": 1,
            "confirmed": true,
            "damage_amount_minor": null,
            "condition": "Fair",
            "returned_at": "2025-03-11T09:00:00+00:00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["days_rented"], 10);
    assert_eq!(body["late_fee_minor"], 3000);
    assert_eq!(body["damage_fee_minor"], 0);
    assert_eq!(body["total_fee_minor"], 3000);

    let (_, body) = send(&app, "GET", "/bicycles/5", None).await;
    assert_eq!(body["status"], "Available");
    assert_eq!(body["condition"], "Fair");

    let (status, body) = send(
        &app,
        "POST",
        "/returns",
        Some(json!({
            "bicycle_id": 5,
            "member_id": 1,
            "confirmed": true,
            "damage_amount_minor": null,
            "condition": "Good",
            "returned_at": null
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["rejected"].as_str().is_some());

    let (status, body) = send(
        &app,
        "POST",
        "/rentals/history",
        Some(json!({ "member_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rentals"][0]["late_fee_minor"], 3000);
    assert_eq!(body["next_cursor"], Value::Null);
}

#[tokio::test]
async fn rejections_carry_the_reason() {
    let app = app_with_db().await;

    let (status, body) = send(
        &app,
        "POST",
        "/rentals",
        Some(json!({ "member_id": 2, "bicycle_id": 5, "rented_at": null })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["rejected"], "Invalid or inactive membership");

    let (status, _) = send(
        &app,
        "POST",
        "/rentals",
        Some(json!({ "member_id": 1, "bicycle_id": 7, "rented_at": null })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "GET", "/bicycles/404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "POST",
        "/rentals",
        Some(json!({ "member_id": 1, "bicycle_id": 5, "rented_at": null })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let (status, body) = send(
        &app,
        "POST",
        "/returns",
        Some(json!({
            "bicycle_id": 5,
            "member_id": 1,
            "confirmed": false,
            "damage_amount_minor": null,
            "condition": "Good",
            "returned_at": null
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["rejected"], "Return canceled by user");
}

#[tokio::test]
async fn catalog_listing_and_search() {
    let app = app_with_db().await;

    let (status, body) = send(&app, "GET", "/bicycles", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bicycles"].as_array().unwrap().len(), 3);
    assert_eq!(body["bicycles"][2]["status"], "Under Maintenance");

    let (status, body) = send(&app, "GET", "/bicycles/available?brand=trek", None).await;
    assert_eq!(status, StatusCode::OK);
    let bicycles = body["bicycles"].as_array().unwrap();
    assert_eq!(bicycles.len(), 1);
    assert_eq!(bicycles[0]["id"], 5);

    let (status, body) = send(
        &app,
        "POST",
        "/bicycles/search",
        Some(json!({ "brand": "trek", "type": "mountain" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exact"], false);
    assert_eq!(body["count"], 3);

    let (_, body) = send(
        &app,
        "POST",
        "/bicycles/search",
        Some(json!({ "min_rate_minor": 1500, "sort_by": "rate" })),
    )
    .await;
    assert_eq!(body["exact"], true);
    assert_eq!(body["average_daily_rate_minor"], 1750);
}

#[tokio::test]
async fn member_views() {
    let app = app_with_db().await;

    let (status, body) = send(&app, "GET", "/members/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Alice");
    assert_eq!(body["membership_type"], "regular");
    assert_eq!(body["open_rentals"], 0);

    let (status, body) = send(&app, "GET", "/members/1/eligibility", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["eligible"], true);

    let (status, _) = send(&app, "GET", "/members/9", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = send(&app, "GET", "/members/9/eligibility", None).await;
    assert_eq!(body["eligible"], false);
    assert_eq!(body["reason"], "Invalid or inactive membership");
}
