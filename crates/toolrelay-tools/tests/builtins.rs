//! Built-in tools against a local mock HTTP server.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use reqwest::Client;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use toolrelay_protocol::ToolError;
use toolrelay_tools::{
    EmailSettings, EmailTool, FreshdeskSettings, FreshdeskTool, Tool, WeatherSettings, WeatherTool,
};

#[derive(Default)]
struct Recorded {
    queries: Mutex<Vec<HashMap<String, String>>>,
    bodies: Mutex<Vec<Value>>,
    auth: Mutex<Vec<String>>,
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

async fn weather_ok(
    State(recorded): State<Arc<Recorded>>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    recorded.queries.lock().push(query);
    Json(json!({
        "coord": { "lat": 51.5, "lon": -0.12 },
        "weather": [{ "description": "light rain" }],
        "main": { "temp": 12.5 },
        "name": "London",
    }))
}

async fn weather_unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "cod": 401, "message": "Invalid API key" })),
    )
}

#[tokio::test]
async fn weather_tool_shapes_report() {
    let recorded = Arc::new(Recorded::default());
    let app = Router::new()
        .route("/weather", get(weather_ok))
        .with_state(recorded.clone());
    let base = serve(app).await;

    let tool = WeatherTool::new(
        Client::new(),
        WeatherSettings {
            base_url: format!("{base}/weather"),
            api_key: "key-1".to_string(),
        },
    );
    let value = tool
        .call(json!({ "latitude": 51.5, "longitude": -0.12 }))
        .await
        .expect("weather");

    assert_eq!(
        value,
        json!({
            "latitude": 51.5,
            "longitude": -0.12,
            "weather_condition": "light rain",
            "temperature": 12.5,
            "city": "London",
        })
    );
    let queries = recorded.queries.lock();
    assert_eq!(queries[0].get("appid").map(String::as_str), Some("key-1"));
    assert_eq!(queries[0].get("units").map(String::as_str), Some("metric"));
}

#[tokio::test]
async fn weather_tool_reports_api_message() {
    let app = Router::new().route("/weather", get(weather_unauthorized));
    let base = serve(app).await;
    let tool = WeatherTool::new(
        Client::new(),
        WeatherSettings {
            base_url: format!("{base}/weather"),
            api_key: "bad".to_string(),
        },
    );

    let err = tool
        .call(json!({ "latitude": 0.0, "longitude": 0.0 }))
        .await
        .expect_err("error");
    match err {
        ToolError::ExecutionFailed(message) => assert!(message.contains("Invalid API key")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn weather_tool_rejects_missing_coordinates() {
    let tool = WeatherTool::new(
        Client::new(),
        WeatherSettings {
            base_url: "http://127.0.0.1:9/weather".to_string(),
            api_key: "unused".to_string(),
        },
    );
    let err = tool.call(json!({ "latitude": 1.0 })).await.expect_err("error");
    assert!(matches!(err, ToolError::InvalidArguments(_)));
}

async fn webhook(
    State(recorded): State<Arc<Recorded>>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> StatusCode {
    recorded.queries.lock().push(query);
    recorded.bodies.lock().push(body);
    StatusCode::ACCEPTED
}

async fn webhook_down() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

#[tokio::test]
async fn email_tool_posts_message_with_signature_query() {
    let recorded = Arc::new(Recorded::default());
    let app = Router::new()
        .route("/workflows/send", post(webhook))
        .with_state(recorded.clone());
    let base = serve(app).await;

    let tool = EmailTool::new(
        Client::new(),
        EmailSettings {
            webhook_url: format!("{base}/workflows/send?sig=abc"),
            timeout: Duration::from_secs(5),
        },
    );
    let value = tool
        .call(json!({
            "email_to": "ops@example.com",
            "email_subject": "Weather",
            "email_body": "Rain expected.",
        }))
        .await
        .expect("send");

    assert_eq!(value, json!({ "status": "sent" }));
    assert_eq!(
        recorded.queries.lock()[0].get("sig").map(String::as_str),
        Some("abc")
    );
    assert_eq!(
        recorded.bodies.lock()[0],
        json!({
            "email_to": "ops@example.com",
            "email_subject": "Weather",
            "email_body": "Rain expected.",
        })
    );
}

#[tokio::test]
async fn email_tool_fails_on_webhook_error() {
    let app = Router::new().route("/send", post(webhook_down));
    let base = serve(app).await;
    let tool = EmailTool::new(
        Client::new(),
        EmailSettings {
            webhook_url: format!("{base}/send"),
            timeout: Duration::from_secs(5),
        },
    );

    let err = tool
        .call(json!({ "email_to": "a@example.com", "email_subject": "s", "email_body": "b" }))
        .await
        .expect_err("error");
    match err {
        ToolError::ExecutionFailed(message) => assert!(message.contains("500")),
        other => panic!("unexpected error: {other:?}"),
    }
}

async fn create_ticket(
    State(recorded): State<Arc<Recorded>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        recorded.auth.lock().push(auth.to_string());
    }
    let subject = body["subject"].clone();
    recorded.bodies.lock().push(body);
    (
        StatusCode::CREATED,
        Json(json!({ "id": 42, "subject": subject })),
    )
}

async fn reject_ticket() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "description": "Validation failed" })),
    )
}

fn ticket_tool(base: String) -> FreshdeskTool {
    FreshdeskTool::new(
        Client::new(),
        FreshdeskSettings {
            base_url: base,
            api_key: "fd-key".to_string(),
            description: "Created by a test.".to_string(),
        },
    )
}

#[tokio::test]
async fn freshdesk_tool_creates_ticket() {
    let recorded = Arc::new(Recorded::default());
    let app = Router::new()
        .route("/api/v2/tickets", post(create_ticket))
        .with_state(recorded.clone());
    let base = serve(app).await;

    let value = ticket_tool(base)
        .call(json!({ "Email": "user@example.com", "Subject": "Printer jam" }))
        .await
        .expect("ticket");

    assert_eq!(value, json!({ "id": 42, "subject": "Printer jam" }));
    let body = recorded.bodies.lock()[0].clone();
    assert_eq!(body["email"], json!("user@example.com"));
    assert_eq!(body["priority"], json!(2));
    assert_eq!(body["status"], json!(2));
    assert_eq!(body["tags"], json!(["AI-Agent", "Automation"]));
    assert_eq!(body["description"], json!("Created by a test."));
    assert!(recorded.auth.lock()[0].starts_with("Basic "));
}

#[tokio::test]
async fn freshdesk_tool_reports_status_and_body() {
    let app = Router::new().route("/api/v2/tickets", post(reject_ticket));
    let base = serve(app).await;

    let err = ticket_tool(base)
        .call(json!({ "Email": "user@example.com", "Subject": "x" }))
        .await
        .expect_err("error");
    let message = match err {
        ToolError::ExecutionFailed(message) => message,
        other => panic!("unexpected error: {other:?}"),
    };
    let payload: Value = serde_json::from_str(&message).expect("json");
    assert_eq!(payload["status_code"], json!(400));
    assert_eq!(payload["error"]["description"], json!("Validation failed"));
}
