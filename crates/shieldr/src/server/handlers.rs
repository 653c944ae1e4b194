//! Route handlers.

// Handlers must be async for axum even when the store call is synchronous.
#![allow(clippy::unused_async)]

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use super::AppState;
use crate::error::Error;
use crate::records::{Contact, ContactInput, Coordinates, LocationFix, SosState};
use crate::zones::{GeoQuery, Zone};

/// Response header naming which path answered `/zones/nearby`.
pub const ZONE_SOURCE_HEADER: &str = "x-zone-source";

/// An [`Error`] rendered as a JSON `{message}` response.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_not_found() {
            StatusCode::NOT_FOUND
        } else if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let message = if self.0.is_client_error() {
            self.0.to_string()
        } else {
            error!("Request failed: {}", self.0);
            "Internal server error".to_string()
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Parse an optional JSON body; an empty body is the default value.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        warn!("Rejected request body: {}", e);
        Error::validation("Invalid JSON body").into()
    })
}

/// Contact ids are rowids, which start at 1, so an unparseable id is
/// reported as not found.
fn contact_id(raw: &str) -> i64 {
    raw.parse().unwrap_or(0)
}

#[derive(Debug, Serialize)]
pub(super) struct StatusReply {
    status: &'static str,
    time: DateTime<Utc>,
}

pub(super) async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "message": "Backend running" }))
}

pub(super) async fn get_sos(State(state): State<AppState>) -> ApiResult<Json<SosState>> {
    Ok(Json(state.store.sos()?))
}

pub(super) async fn trigger_sos(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<StatusReply>> {
    let coords: Coordinates = parse_body(&body)?;
    let time = Utc::now();

    state.store.set_sos(&SosState::triggered(time, coords))?;
    warn!("SOS triggered at {:?}, {:?}", coords.lat, coords.lng);

    Ok(Json(StatusReply {
        status: "SOS triggered",
        time,
    }))
}

pub(super) async fn resolve_sos(State(state): State<AppState>) -> ApiResult<Json<StatusReply>> {
    let time = Utc::now();

    state.store.set_sos(&SosState::resolved(time))?;
    info!("SOS resolved");

    Ok(Json(StatusReply {
        status: "SOS resolved",
        time,
    }))
}

pub(super) async fn get_location(State(state): State<AppState>) -> ApiResult<Json<LocationFix>> {
    Ok(Json(state.store.location()?))
}

pub(super) async fn update_location(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<LocationFix>> {
    let coords: Coordinates = parse_body(&body)?;
    let fix = LocationFix::reported(Utc::now(), coords);

    state.store.set_location(&fix)?;
    Ok(Json(fix))
}

pub(super) async fn list_contacts(State(state): State<AppState>) -> ApiResult<Json<Vec<Contact>>> {
    Ok(Json(state.store.contacts()?))
}

pub(super) async fn create_contact(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Contact>)> {
    let input: ContactInput = parse_body(&body)?;
    let contact = state.store.insert_contact(&input.into_new()?)?;

    info!("Added contact {}", contact.id);
    Ok((StatusCode::CREATED, Json(contact)))
}

pub(super) async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Contact>> {
    let patch: ContactInput = parse_body(&body)?;
    Ok(Json(state.store.update_contact(contact_id(&id), patch)?))
}

pub(super) async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Contact>> {
    let removed = state.store.delete_contact(contact_id(&id))?;

    info!("Removed contact {}", removed.id);
    Ok(Json(removed))
}

pub(super) async fn list_zones(State(state): State<AppState>) -> ApiResult<Json<Vec<Zone>>> {
    Ok(Json(state.store.zones()?))
}

/// Raw `/zones/nearby` query string; validation happens in [`GeoQuery`].
#[derive(Debug, Deserialize)]
pub(super) struct NearbyParams {
    lat: Option<String>,
    lng: Option<String>,
    radius: Option<String>,
}

pub(super) async fn nearby_zones(
    State(state): State<AppState>,
    Query(params): Query<NearbyParams>,
) -> ApiResult<impl IntoResponse> {
    let query = GeoQuery::parse(
        params.lat.as_deref(),
        params.lng.as_deref(),
        params.radius.as_deref(),
        state.resolver.settings().default_radius_m,
    )?;

    let resolution = state.resolver.resolve_query(&query).await;
    let source = resolution.source_label();

    Ok(([(ZONE_SOURCE_HEADER, source)], Json(resolution.into_zones())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_id() {
        assert_eq!(contact_id("42"), 42);
        assert_eq!(contact_id("1712345678901"), 1_712_345_678_901);
        assert_eq!(contact_id("abc"), 0);
    }

    #[test]
    fn test_parse_body_empty_is_default() {
        let coords: Coordinates = parse_body(&Bytes::new()).unwrap();
        assert_eq!(coords, Coordinates::default());

        let coords: Coordinates = parse_body(&Bytes::from_static(b"  \n")).unwrap();
        assert_eq!(coords, Coordinates::default());
    }

    #[test]
    fn test_parse_body_invalid() {
        let result: ApiResult<Coordinates> = parse_body(&Bytes::from_static(b"[1,2"));
        assert!(result.is_err());
    }

    #[test]
    fn test_api_error_status() {
        let cases = [
            (Error::InvalidQuery, StatusCode::BAD_REQUEST),
            (Error::validation("bad"), StatusCode::BAD_REQUEST),
            (Error::ContactNotFound { id: 1 }, StatusCode::NOT_FOUND),
            (Error::StorageLock, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }
}
