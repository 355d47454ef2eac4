//! HTTP-level tests for the weather relay, driven in-process through the router

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tower::ServiceExt;

use weather_relay::config::ServerConfig;
use weather_relay::{
    BrokerClient, Destination, EventCodec, EventPublisher, InMemoryWeatherStore, WeatherError,
    WeatherReading, WeatherService, web,
};

struct CapturingBroker {
    sender: UnboundedSender<(Destination, Vec<u8>)>,
}

#[async_trait]
impl BrokerClient for CapturingBroker {
    async fn publish(&self, destination: &Destination, payload: &[u8]) -> weather_relay::Result<()> {
        let _ = self.sender.send((destination.clone(), payload.to_vec()));
        Ok(())
    }
}

struct FailingBroker;

#[async_trait]
impl BrokerClient for FailingBroker {
    async fn publish(&self, _destination: &Destination, _payload: &[u8]) -> weather_relay::Result<()> {
        Err(WeatherError::publish("connection refused"))
    }
}

fn app_with(client: Arc<dyn BrokerClient>) -> Router {
    let (publisher, _handle) = EventPublisher::spawn(client);
    let service = WeatherService::new(
        Arc::new(InMemoryWeatherStore::new()),
        publisher,
        Destination::default(),
    );
    web::app(&ServerConfig::default(), Arc::new(service))
}

fn capturing_app() -> (Router, UnboundedReceiver<(Destination, Vec<u8>)>) {
    let (sender, receiver) = unbounded_channel();
    (app_with(Arc::new(CapturingBroker { sender })), receiver)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/weather")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_get_unknown_city_is_404() {
    let (app, _events) = capturing_app();

    let response = app.oneshot(get("/weather/Atlantis")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn test_post_then_get_london() {
    let (app, mut events) = capturing_app();
    let london = json!({"city": "London", "temperature": 15, "condition": "rain"});

    let response = app.clone().oneshot(post_json(&london)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());

    let response = app.oneshot(get("/weather/London")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    assert_eq!(body_json(response).await, london);

    let (destination, payload) = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event was not published")
        .unwrap();
    assert_eq!(destination.routing_key, "weather-event");
    assert_eq!(destination.queue, "weather-event");
    assert_eq!(serde_json::from_slice::<Value>(&payload).unwrap(), london);
    assert_eq!(
        EventCodec.decode(&payload).unwrap(),
        WeatherReading::new("London")
            .with_temperature(15)
            .with_condition("rain")
    );
}

#[tokio::test]
async fn test_extra_fields_survive_round_trip() {
    let (app, mut events) = capturing_app();
    let reading = json!({
        "city": "Reykjavik",
        "temperature": -2.5,
        "condition": "snow",
        "humidity": 91,
        "wind": {"speed": 14, "direction": "NE"}
    });

    let response = app.clone().oneshot(post_json(&reading)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.oneshot(get("/weather/Reykjavik")).await.unwrap();
    assert_eq!(body_json(response).await, reading);

    let (_, payload) = events.recv().await.unwrap();
    assert_eq!(serde_json::from_slice::<Value>(&payload).unwrap(), reading);
}

#[tokio::test]
async fn test_descriptive_fields_are_not_interpreted() {
    let (app, mut events) = capturing_app();
    let reading = json!({
        "city": "Lima",
        "temperature": "15C",
        "condition": {"code": 61, "text": "light rain"},
        "humidity": null
    });

    let response = app.clone().oneshot(post_json(&reading)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.oneshot(get("/weather/Lima")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, reading);

    let (_, payload) = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event was not published")
        .unwrap();
    assert_eq!(serde_json::from_slice::<Value>(&payload).unwrap(), reading);
}

#[tokio::test]
async fn test_last_write_wins() {
    let (app, _events) = capturing_app();
    let first = json!({"city": "Paris", "temperature": 21, "condition": "sun"});
    let second = json!({"city": "Paris", "temperature": 17, "condition": "cloudy"});

    for reading in [&first, &second] {
        let response = app.clone().oneshot(post_json(reading)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.oneshot(get("/weather/Paris")).await.unwrap();
    assert_eq!(body_json(response).await, second);
}

#[tokio::test]
async fn test_city_lookup_is_case_sensitive() {
    let (app, _events) = capturing_app();
    let response = app
        .clone()
        .oneshot(post_json(&json!({"city": "London", "temperature": 15})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.oneshot(get("/weather/london")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_broker_failure_does_not_affect_response() {
    let app = app_with(Arc::new(FailingBroker));
    let berlin = json!({"city": "Berlin", "temperature": 4, "condition": "drizzle"});

    let response = app.clone().oneshot(post_json(&berlin)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.oneshot(get("/weather/Berlin")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, berlin);
}

#[tokio::test]
async fn test_missing_city_is_400_and_not_published() {
    let (app, mut events) = capturing_app();

    for body in [json!({"temperature": 10}), json!({"city": "", "temperature": 10})] {
        let response = app.clone().oneshot(post_json(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("city"));
    }

    // nothing reached the broker
    assert!(
        tokio::time::timeout(Duration::from_millis(100), events.recv())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let (app, _events) = capturing_app();
    let request = Request::builder()
        .method("POST")
        .uri("/weather")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"city\": "))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_concurrent_posts_to_distinct_cities() {
    let (app, _events) = capturing_app();

    let posts = (0..25).map(|i| {
        let app = app.clone();
        async move {
            let body = json!({"city": format!("city-{i}"), "temperature": i});
            app.oneshot(post_json(&body)).await.unwrap().status()
        }
    });
    for status in futures::future::join_all(posts).await {
        assert_eq!(status, StatusCode::CREATED);
    }

    for i in 0..25 {
        let response = app
            .clone()
            .oneshot(get(&format!("/weather/city-{i}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["temperature"], json!(i));
    }
}

#[tokio::test]
async fn test_health() {
    let (app, _events) = capturing_app();

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], weather_relay::VERSION);
}
