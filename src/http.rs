use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use ulid::Ulid;

use crate::engine::{Engine, EngineError, GenerateMode};
use crate::model::*;

/// The HTTP surface. Instants on the wire are RFC 3339 UTC; wall-clock
/// times are `"HH:mm"` strings interpreted in the coach's timezone.
pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/coaches/:coach_id/slots", get(list_slots))
        .route(
            "/coaches/:coach_id/schedule",
            get(get_schedule).put(replace_schedule),
        )
        .route("/coaches/:coach_id/overrides", post(add_override))
        .route("/coaches/:coach_id/overrides/:date", delete(remove_override))
        .route(
            "/coaches/:coach_id/settings",
            get(get_settings).put(update_settings),
        )
        .route("/coaches/:coach_id/status", get(get_status))
        .with_state(engine)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// ── Error mapping ────────────────────────────────────────────────

struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, field) = match &self.0 {
            EngineError::Validation { field, .. } => {
                (StatusCode::BAD_REQUEST, "validation", Some(*field))
            }
            EngineError::RangeTooLarge { .. } => {
                (StatusCode::BAD_REQUEST, "range_too_large", None)
            }
            EngineError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", None),
            EngineError::VersionConflict { .. } => {
                (StatusCode::CONFLICT, "version_conflict", None)
            }
            EngineError::Store(_) => (StatusCode::BAD_GATEWAY, "store_unavailable", None),
            EngineError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "cancelled", None),
        };
        if status.is_server_error() {
            tracing::error!("request failed: {}", self.0);
        } else {
            tracing::debug!("request rejected: {}", self.0);
        }
        let mut body = json!({ "error": code, "message": self.0.to_string() });
        if let Some(field) = field {
            body["field"] = json!(field);
        }
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn to_utc(ms: Ms) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).expect("engine timestamps are bounded")
}

fn now_ms() -> Ms {
    Utc::now().timestamp_millis()
}

// ── Slots ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotsQuery {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    /// Minutes; defaults to the profile's default duration.
    duration: Option<i64>,
    /// Include candidates suppressed by a date override, marked.
    #[serde(default)]
    preview: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SlotView {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    conflict_reason: Option<ConflictReason>,
}

impl From<&AvailableSlot> for SlotView {
    fn from(slot: &AvailableSlot) -> Self {
        Self {
            start: to_utc(slot.span.start),
            end: to_utc(slot.span.end),
            is_available: slot.available,
            conflict_reason: slot.reason,
        }
    }
}

#[derive(Debug, Serialize)]
struct SlotsResponse {
    slots: Vec<SlotView>,
}

async fn list_slots(
    State(engine): State<Arc<Engine>>,
    Path(coach_id): Path<Ulid>,
    Query(query): Query<SlotsQuery>,
) -> ApiResult<Json<SlotsResponse>> {
    let (from, to) = (query.from.timestamp_millis(), query.to.timestamp_millis());
    if to <= from {
        return Err(EngineError::validation("range", "`to` must be after `from`").into());
    }
    let mode = if query.preview {
        GenerateMode::Preview
    } else {
        GenerateMode::Bookable
    };
    let slots = engine
        .available_slots(
            coach_id,
            Span::new(from, to),
            query.duration,
            mode,
            now_ms(),
            &CancellationToken::new(),
        )
        .await?;
    Ok(Json(SlotsResponse {
        slots: slots.iter().map(SlotView::from).collect(),
    }))
}

// ── Schedule ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleView {
    recurring: Vec<RecurringRule>,
    version: u64,
    updated_at: DateTime<Utc>,
}

impl From<CoachProfile> for ScheduleView {
    fn from(profile: CoachProfile) -> Self {
        Self {
            recurring: profile.recurring,
            version: profile.version,
            updated_at: to_utc(profile.updated_at),
        }
    }
}

async fn get_schedule(
    State(engine): State<Arc<Engine>>,
    Path(coach_id): Path<Ulid>,
) -> ApiResult<Json<ScheduleView>> {
    let profile = engine.profile_or_default(coach_id).await?;
    Ok(Json(profile.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplaceScheduleBody {
    recurring: Vec<RecurringRule>,
    expected_version: u64,
}

async fn replace_schedule(
    State(engine): State<Arc<Engine>>,
    Path(coach_id): Path<Ulid>,
    Json(body): Json<ReplaceScheduleBody>,
) -> ApiResult<Json<ScheduleView>> {
    let profile = engine
        .replace_recurring(coach_id, body.recurring, body.expected_version)
        .await?;
    Ok(Json(profile.into()))
}

// ── Overrides ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OverridesView {
    overrides: Vec<DateOverride>,
    version: u64,
    updated_at: DateTime<Utc>,
}

impl From<CoachProfile> for OverridesView {
    fn from(profile: CoachProfile) -> Self {
        Self {
            overrides: profile.overrides,
            version: profile.version,
            updated_at: to_utc(profile.updated_at),
        }
    }
}

async fn add_override(
    State(engine): State<Arc<Engine>>,
    Path(coach_id): Path<Ulid>,
    Json(body): Json<DateOverride>,
) -> ApiResult<(StatusCode, Json<OverridesView>)> {
    let profile = engine.add_override(coach_id, body).await?;
    Ok((StatusCode::CREATED, Json(profile.into())))
}

async fn remove_override(
    State(engine): State<Arc<Engine>>,
    Path((coach_id, date)): Path<(Ulid, NaiveDate)>,
) -> ApiResult<Json<OverridesView>> {
    let profile = engine.remove_override(coach_id, date).await?;
    Ok(Json(profile.into()))
}

// ── Settings ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsView {
    #[serde(flatten)]
    settings: AvailabilitySettings,
    version: u64,
    updated_at: DateTime<Utc>,
}

impl From<CoachProfile> for SettingsView {
    fn from(profile: CoachProfile) -> Self {
        Self {
            settings: profile.settings,
            version: profile.version,
            updated_at: to_utc(profile.updated_at),
        }
    }
}

async fn get_settings(
    State(engine): State<Arc<Engine>>,
    Path(coach_id): Path<Ulid>,
) -> ApiResult<Json<SettingsView>> {
    let profile = engine.profile_or_default(coach_id).await?;
    Ok(Json(profile.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSettingsBody {
    #[serde(flatten)]
    settings: AvailabilitySettings,
    expected_version: u64,
}

async fn update_settings(
    State(engine): State<Arc<Engine>>,
    Path(coach_id): Path<Ulid>,
    Json(body): Json<UpdateSettingsBody>,
) -> ApiResult<Json<SettingsView>> {
    let profile = engine
        .update_settings(coach_id, body.settings, body.expected_version)
        .await?;
    Ok(Json(profile.into()))
}

// ── Status ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusView {
    is_currently_available: bool,
    current_session_end: Option<DateTime<Utc>>,
    next_available_slot: Option<DateTime<Utc>>,
}

async fn get_status(
    State(engine): State<Arc<Engine>>,
    Path(coach_id): Path<Ulid>,
) -> ApiResult<Json<StatusView>> {
    let status = engine.status(coach_id, now_ms()).await?;
    Ok(Json(StatusView {
        is_currently_available: status.currently_available,
        current_session_end: status.current_session_end.map(to_utc),
        next_available_slot: status.next_available_slot.map(to_utc),
    }))
}
