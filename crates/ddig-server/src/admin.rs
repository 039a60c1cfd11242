//! Admin Query API: `GET /api?action=...`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use ddig_core::{sanitize, Category, Record};
use ddig_settings::EventSummary;
use ddig_store::ListQuery;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

use crate::auth::authorize;
use crate::envelope::{ApiError, Envelope};
use crate::server::AppState;

pub const ADMIN_ACTIONS: [&str; 3] = ["export_data", "get_events", "get_registrations"];

/// Export type used when none is given.
const DEFAULT_EXPORT_TYPE: &str = "events";

#[derive(Debug, Default, Deserialize)]
pub struct AdminParams {
    pub action: Option<String>,
    pub event_id: Option<String>,
    #[serde(rename = "type")]
    pub export_type: Option<String>,
}

fn param(value: &Option<String>) -> Option<String> {
    value.as_deref().map(sanitize).filter(|v| !v.is_empty())
}

pub async fn admin_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<AdminParams>,
) -> Response {
    let action = param(&params.action).unwrap_or_default();
    let result = match action.as_str() {
        "get_events" => Ok(get_events(&state).into_response()),
        "get_registrations" => get_registrations(&state, &headers, &params)
            .await
            .map(IntoResponse::into_response),
        "export_data" => export_data(&state, &headers, &params).await,
        _ => Err(ApiError::UnknownAction(ADMIN_ACTIONS.to_vec())),
    };
    result.unwrap_or_else(IntoResponse::into_response)
}

/// The configured catalogue ordered by date, then time.
pub fn get_events(state: &AppState) -> Envelope {
    let mut events: Vec<EventSummary> = state.forms.settings.events.clone();
    events.sort_by(|a, b| (&a.date, &a.time).cmp(&(&b.date, &b.time)));
    Envelope::ok("Events retrieved", serde_json::to_value(events).unwrap_or_default())
}

/// Resolve an `event_id` parameter to the event name registrations carry.
fn resolve_event(state: &AppState, event_id: &str) -> String {
    event_id
        .parse::<u32>()
        .ok()
        .and_then(|id| state.forms.settings.events.iter().find(|e| e.id == id))
        .map(|e| sanitize(&e.title))
        .unwrap_or_else(|| event_id.to_string())
}

pub async fn get_registrations(
    state: &AppState,
    headers: &HeaderMap,
    params: &AdminParams,
) -> Result<Envelope, ApiError> {
    authorize(headers, state.forms.settings.admin.api_token.as_deref())?;

    let query = match param(&params.event_id) {
        Some(event_id) => ListQuery::for_event(resolve_event(state, &event_id)),
        None => ListQuery::recent(),
    };
    let records = list(state, Category::Registrations, query).await?;
    info!(count = records.len(), "registrations listed");
    Ok(Envelope::ok("Registrations retrieved", to_array(&records)))
}

fn export_category(export_type: &str) -> Option<Category> {
    match export_type {
        "events" => Some(Category::Registrations),
        "newsletter" => Some(Category::Newsletter),
        "contacts" => Some(Category::Contacts),
        _ => None,
    }
}

pub async fn export_data(
    state: &AppState,
    headers: &HeaderMap,
    params: &AdminParams,
) -> Result<Response, ApiError> {
    authorize(headers, state.forms.settings.admin.api_token.as_deref())?;

    let export_type = param(&params.export_type).unwrap_or_else(|| DEFAULT_EXPORT_TYPE.to_string());
    let category =
        export_category(&export_type).ok_or_else(|| ApiError::UnknownExportType(export_type.clone()))?;

    let records = list(state, category, ListQuery::export()).await?;
    let body = serde_json::to_string_pretty(&to_array(&records)).map_err(|e| {
        error!(error = %e, "failed to encode export");
        ApiError::Persistence
    })?;
    let filename = format!("{export_type}_{}.json", Utc::now().format("%Y-%m-%d"));
    info!(export_type = %export_type, count = records.len(), "export served");

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/json".to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        body,
    )
        .into_response())
}

async fn list(state: &AppState, category: Category, query: ListQuery) -> Result<Vec<Record>, ApiError> {
    let store = Arc::clone(&state.forms.store);
    match tokio::task::spawn_blocking(move || store.list(category, &query)).await {
        Ok(Ok(records)) => Ok(records),
        Ok(Err(e)) => {
            error!(category = %category, error = %e, "failed to list records");
            Err(ApiError::Persistence)
        }
        Err(e) => {
            error!(category = %category, error = %e, "list task failed");
            Err(ApiError::Persistence)
        }
    }
}

fn to_array(records: &[Record]) -> Value {
    Value::Array(records.iter().map(Record::to_value).collect())
}
