//! HTTP API for shieldr.
//!
//! Exposes SOS state, location, contacts and zones as JSON over axum. All
//! state lives behind [`AppState`], which handlers receive through axum's
//! state extractor.

mod handlers;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::{SafetyStore, SqliteStore};
use crate::zones::ZoneProximityResolver;

pub use handlers::{ApiError, ZONE_SOURCE_HEADER};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// SOS, location, contact and curated zone records.
    pub store: Arc<dyn SafetyStore>,
    /// Nearby zone resolution.
    pub resolver: Arc<ZoneProximityResolver>,
}

impl AppState {
    /// Create state from its parts.
    #[must_use]
    pub fn new(store: Arc<dyn SafetyStore>, resolver: Arc<ZoneProximityResolver>) -> Self {
        Self { store, resolver }
    }

    /// Create state with a fresh in-memory store and a resolver built from
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or the HTTP client cannot be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = SqliteStore::open_in_memory()?;
        let resolver = ZoneProximityResolver::from_config(&config.zones)?;
        Ok(Self::new(Arc::new(store), Arc::new(resolver)))
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/sos", get(handlers::get_sos).post(handlers::trigger_sos))
        .route("/sos/resolve", post(handlers::resolve_sos))
        .route(
            "/location",
            get(handlers::get_location).post(handlers::update_location),
        )
        .route(
            "/contacts",
            get(handlers::list_contacts).post(handlers::create_contact),
        )
        .route(
            "/contacts/{id}",
            put(handlers::update_contact).delete(handlers::delete_contact),
        )
        .route("/zones", get(handlers::list_zones))
        .route("/zones/nearby", get(handlers::nearby_zones))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C.
///
/// # Errors
///
/// Returns [`Error::ServerBind`] if the address cannot be bound, or an I/O
/// error if the server fails while running.
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| Error::ServerBind { addr, source })?;

    info!("SHIELD-R backend listening on {}", listener.local_addr()?);
    if !config.zones.live_enabled {
        info!("Live zone lookups disabled, serving the static catalog only");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::zones::{GeoQuery, ResolverSettings, UpstreamError, Zone, ZoneSource, ZoneType};

    #[derive(Debug)]
    struct ScriptedSource(Vec<Zone>);

    #[async_trait]
    impl ZoneSource for ScriptedSource {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch(&self, _query: &GeoQuery) -> std::result::Result<Vec<Zone>, UpstreamError> {
            Ok(self.0.clone())
        }
    }

    fn offline_app() -> Router {
        let store = SqliteStore::open_in_memory().unwrap();
        let resolver = ZoneProximityResolver::offline(ResolverSettings::default());
        router(AppState::new(Arc::new(store), Arc::new(resolver)))
    }

    fn live_app(zones: Vec<Zone>) -> Router {
        let store = SqliteStore::open_in_memory().unwrap();
        let settings = ResolverSettings {
            timeout: Duration::from_secs(1),
            ..ResolverSettings::default()
        };
        let resolver = ZoneProximityResolver::new(Some(Arc::new(ScriptedSource(zones))), settings);
        router(AppState::new(Arc::new(store), Arc::new(resolver)))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, _, json) = send_full(app, method, uri, body).await;
        (status, json)
    }

    async fn send_full(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, json)
    }

    #[tokio::test]
    async fn test_health() {
        let app = offline_app();
        let (status, body) = send(&app, Method::GET, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "message": "Backend running"}));
    }

    #[tokio::test]
    async fn test_sos_trigger_and_resolve() {
        let app = offline_app();

        let (_, initial) = send(&app, Method::GET, "/sos", None).await;
        assert_eq!(initial["active"], false);
        assert!(initial["time"].is_null());

        let (status, body) = send(
            &app,
            Method::POST,
            "/sos",
            Some(json!({"lat": 16.48, "lng": "78.31"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "SOS triggered");
        assert!(body["time"].is_string());

        let (_, raised) = send(&app, Method::GET, "/sos", None).await;
        assert_eq!(raised["active"], true);
        assert_eq!(raised["lat"], 16.48);
        assert!(raised["lng"].is_null());
        assert_eq!(raised["time"], body["time"]);

        let (status, body) = send(&app, Method::POST, "/sos/resolve", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "SOS resolved");

        let (_, cleared) = send(&app, Method::GET, "/sos", None).await;
        assert_eq!(cleared["active"], false);
        assert!(cleared["lat"].is_null());
        assert!(cleared["time"].is_string());
    }

    #[tokio::test]
    async fn test_sos_without_body() {
        let app = offline_app();
        let (status, _) = send(&app, Method::POST, "/sos", None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, raised) = send(&app, Method::GET, "/sos", None).await;
        assert_eq!(raised["active"], true);
        assert!(raised["lat"].is_null());
    }

    #[tokio::test]
    async fn test_location_update() {
        let app = offline_app();

        let (_, initial) = send(&app, Method::GET, "/location", None).await;
        assert!(initial["updatedAt"].is_null());

        let (status, body) = send(
            &app,
            Method::POST,
            "/location",
            Some(json!({"lat": 17.4, "lng": 78.5})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["lat"], 17.4);
        assert!(body["updatedAt"].is_string());

        let (_, stored) = send(&app, Method::GET, "/location", None).await;
        assert_eq!(stored, body);
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let app = offline_app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/location")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_contacts_crud() {
        let app = offline_app();

        let (status, created) = send(
            &app,
            Method::POST,
            "/contacts",
            Some(json!({"name": "Asha", "phone": "100", "priority": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_i64().unwrap();

        send(
            &app,
            Method::POST,
            "/contacts",
            Some(json!({"name": "Ravi", "phone": "112", "priority": 1})),
        )
        .await;
        send(
            &app,
            Method::POST,
            "/contacts",
            Some(json!({"name": "Meena", "phone": "108"})),
        )
        .await;

        let (_, list) = send(&app, Method::GET, "/contacts", None).await;
        let names: Vec<&str> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Ravi", "Asha", "Meena"]);

        let (status, updated) = send(
            &app,
            Method::PUT,
            &format!("/contacts/{id}"),
            Some(json!({"phone": "101"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Asha");
        assert_eq!(updated["phone"], "101");
        assert_eq!(updated["priority"], 2);

        let (status, removed) = send(&app, Method::DELETE, &format!("/contacts/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(removed["id"], id);

        let (_, list) = send(&app, Method::GET, "/contacts", None).await;
        assert_eq!(list.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_contact_requires_name_and_phone() {
        let app = offline_app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/contacts",
            Some(json!({"name": "Asha"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"message": "Name and phone are required"}));
    }

    #[tokio::test]
    async fn test_fractional_priority_is_kept() {
        let app = offline_app();
        send(
            &app,
            Method::POST,
            "/contacts",
            Some(json!({"name": "Two", "phone": "2", "priority": 2})),
        )
        .await;
        let (status, created) = send(
            &app,
            Method::POST,
            "/contacts",
            Some(json!({"name": "Half", "phone": "1", "priority": 1.5})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["priority"], 1.5);

        let (_, list) = send(&app, Method::GET, "/contacts", None).await;
        assert_eq!(list[0]["name"], "Half");
        assert_eq!(list[1]["priority"], 2);
    }

    #[tokio::test]
    async fn test_missing_contact_is_404() {
        let app = offline_app();

        for (method, uri) in [
            (Method::PUT, "/contacts/999"),
            (Method::DELETE, "/contacts/999"),
            (Method::DELETE, "/contacts/not-a-number"),
        ] {
            let body = (method == Method::PUT).then(|| json!({"name": "X"}));
            let (status, body) = send(&app, method, uri, body).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body, json!({"message": "Contact not found"}));
        }
    }

    #[tokio::test]
    async fn test_list_zones() {
        let app = offline_app();
        let (status, body) = send(&app, Method::GET, "/zones", None).await;

        assert_eq!(status, StatusCode::OK);
        let zones = body.as_array().unwrap();
        assert_eq!(zones.len(), 12);
        assert_eq!(zones[0]["id"], 1);
        assert_eq!(zones[9]["type"], "avoid");
        assert!(zones[0].get("distance").is_none());
    }

    #[tokio::test]
    async fn test_nearby_requires_coordinates() {
        let app = offline_app();

        for uri in [
            "/zones/nearby",
            "/zones/nearby?lat=16.48",
            "/zones/nearby?lat=abc&lng=78.3",
        ] {
            let (status, body) = send(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body, json!({"message": "lat and lng are required"}));
        }
    }

    #[tokio::test]
    async fn test_nearby_fallback() {
        let app = offline_app();
        let (status, headers, body) = send_full(
            &app,
            Method::GET,
            "/zones/nearby?lat=16.4833&lng=78.3167&radius=1000",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[ZONE_SOURCE_HEADER], "fallback");

        let zones = body.as_array().unwrap();
        assert_eq!(zones[0]["name"], "Nagarkurnool District Hospital");
        assert_eq!(zones[0]["distance"], 0.0);
        assert!(zones.iter().all(|z| z["id"].as_i64().unwrap() >= 1000));
    }

    #[tokio::test]
    async fn test_nearby_live() {
        let app = live_app(vec![Zone {
            id: 5_551_234,
            zone_type: ZoneType::Safe,
            name: "Area Hospital".to_string(),
            category: "hospital".to_string(),
            lat: 16.49,
            lng: 78.32,
            distance_m: None,
        }]);

        let (status, headers, body) = send_full(
            &app,
            Method::GET,
            "/zones/nearby?lat=16.4833&lng=78.3167",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[ZONE_SOURCE_HEADER], "live");
        assert_eq!(body[0]["id"], 5_551_234);
        assert!(body[0].get("distance").is_none());
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let app = offline_app();
        let request = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }
}
