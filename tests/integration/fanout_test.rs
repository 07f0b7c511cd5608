//! Integration tests for the alert fanout hook.

mod helpers;

use http::StatusCode;
use serde_json::{Value, json};

use cropwatch_entity::notification::NotificationType;

const ORIGIN: (f64, f64) = (-1.2921, 36.8219);

/// A point roughly `km` kilometres north of [`ORIGIN`].
fn north_of_origin(km: f64) -> (f64, f64) {
    (ORIGIN.0 + km / 111.195, ORIGIN.1)
}

fn alert(crop: &str, radius_km: f64) -> Value {
    json!({
        "title": "Fall armyworm",
        "description": "Larvae found on young maize leaves across the eastern plots",
        "crop": crop,
        "category": "Pest",
        "severity": "High",
        "address": "Nairobi",
        "latitude": ORIGIN.0,
        "longitude": ORIGIN.1,
        "radius_km": radius_km
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = helpers::TestApp::new().await;

    let response = app.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["database"], "memory");
}

#[tokio::test]
async fn test_fanout_without_token() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request("POST", "/api/alerts/fanout", Some(alert("Corn", 50.0)), None)
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(app.notifications.is_empty().await);
}

#[tokio::test]
async fn test_fanout_reaches_nearby_growers_only() {
    let app = helpers::TestApp::new().await;
    let author = app.create_user("author", Some(ORIGIN), &["Corn"]).await;
    let near = app
        .create_user("near", Some(north_of_origin(10.0)), &["Corn"])
        .await;
    let far = app
        .create_user("far", Some(north_of_origin(80.0)), &["Corn"])
        .await;
    let other_crop = app
        .create_user("rice", Some(north_of_origin(5.0)), &["Rice"])
        .await;

    let response = app
        .request(
            "POST",
            "/api/alerts/fanout",
            Some(alert("Corn", 50.0)),
            Some("author-token"),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["author_notified"], true);
    assert_eq!(response.body["candidates"], 1);
    assert_eq!(response.body["delivered"], 1);
    assert_eq!(response.body["failed"], 0);

    let receipts = app.notifications.for_user(author).await;
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].notification_type, NotificationType::AlertCreated);
    assert_eq!(receipts[0].title, "✅ Alert Created: Fall armyworm");

    let notices = app.notifications.for_user(near).await;
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].notification_type, NotificationType::AlertNearby);
    assert_eq!(notices[0].title, "🌱 Alert Nearby: Fall armyworm");
    assert!(notices[0].message.starts_with("New High alert for Corn ("));
    assert!(notices[0].message.contains("km from you)"));

    assert!(app.notifications.for_user(far).await.is_empty());
    assert!(app.notifications.for_user(other_crop).await.is_empty());
}

#[tokio::test]
async fn test_fanout_with_session_token() {
    let app = helpers::TestApp::new().await;
    let author = app.create_user("author", Some(ORIGIN), &[]).await;
    let token = app.session_token(author);

    let response = app
        .request(
            "POST",
            "/api/alerts/fanout",
            Some(alert("", 25.0)),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(app.notifications.for_user(author).await.len(), 1);
}

#[tokio::test]
async fn test_fanout_empty_crop_reaches_everyone_in_range() {
    let app = helpers::TestApp::new().await;
    app.create_user("author", Some(ORIGIN), &[]).await;
    app.create_user("corn", Some(north_of_origin(3.0)), &["Corn"])
        .await;
    app.create_user("beans", Some(north_of_origin(4.0)), &["Beans"])
        .await;
    app.create_user("unknown", Some(north_of_origin(6.0)), &[])
        .await;

    let response = app
        .request(
            "POST",
            "/api/alerts/fanout",
            Some(alert("", 20.0)),
            Some("author-token"),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["candidates"], 3);
    assert_eq!(response.body["delivered"], 3);
}

#[tokio::test]
async fn test_fanout_respects_recipient_cap() {
    let mut config = helpers::test_config();
    config.fanout.max_recipients = 2;
    let app = helpers::TestApp::with_config(config).await;
    // no location, so the author does not take a slot under the cap
    app.create_user("author", None, &[]).await;
    for i in 0..5 {
        app.create_user(&format!("grower{i}"), Some(north_of_origin(1.0 + i as f64)), &[])
            .await;
    }

    let response = app
        .request(
            "POST",
            "/api/alerts/fanout",
            Some(alert("Corn", 50.0)),
            Some("author-token"),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["candidates"], 2);
    assert_eq!(response.body["delivered"], 2);
    // two nearby notices plus the author's receipt
    assert_eq!(app.notifications.len().await, 3);
}

#[tokio::test]
async fn test_fanout_rejects_invalid_alert() {
    let app = helpers::TestApp::new().await;
    app.create_user("author", Some(ORIGIN), &[]).await;

    let mut body = alert("Corn", 50.0);
    body["latitude"] = json!(123.0);

    let response = app
        .request("POST", "/api/alerts/fanout", Some(body), Some("author-token"))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");
    assert!(app.notifications.is_empty().await);
}
