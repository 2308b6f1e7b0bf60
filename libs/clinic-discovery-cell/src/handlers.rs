use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::error::DiscoveryError;
use crate::models::{AreaSearchRequest, SearchFilters, SearchQuery, SearchRequest, SearchView};
use crate::services::location::ClientReportedLocation;
use crate::services::search_state::SearchAction;
use crate::state::DiscoveryState;

#[axum::debug_handler]
pub async fn search_clinics(
    State(state): State<Arc<DiscoveryState>>,
    Query(query): Query<SearchQuery>,
    Json(request): Json<SearchRequest>,
) -> Result<(StatusCode, Json<SearchView>), AppError> {
    let session = state.sessions.open(request.session_id).await;

    if let Some(filters) = request.filters {
        session.write().await.apply(SearchAction::FiltersChanged(filters));
    }

    let provider = ClientReportedLocation::new(
        request.geolocation_supported,
        request.location,
        request.location_error,
    );

    if query.wait.unwrap_or(true) {
        let view = state.orchestrator.search(&session, &provider).await?;
        info!("Search {} ready with {} facilities", view.session_id, view.total_count);
        return Ok((StatusCode::OK, Json(view)));
    }

    let (request_id, coordinates) = state.orchestrator.begin_search(&session, &provider).await?;
    let orchestrator = state.orchestrator.clone();
    let background = session.clone();
    tokio::spawn(async move {
        orchestrator.fetch_sources(&background, request_id, coordinates).await;
    });

    let view = session.read().await.view();
    debug!("Search {} accepted, sources resolving in background", view.session_id);
    Ok((StatusCode::ACCEPTED, Json(view)))
}

#[axum::debug_handler]
pub async fn get_search(
    State(state): State<Arc<DiscoveryState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SearchView>, AppError> {
    let session = state.sessions.get(session_id).await
        .ok_or(DiscoveryError::SessionNotFound)?;

    let view = session.read().await.view();
    Ok(Json(view))
}

#[axum::debug_handler]
pub async fn update_filters(
    State(state): State<Arc<DiscoveryState>>,
    Path(session_id): Path<Uuid>,
    Json(filters): Json<SearchFilters>,
) -> Result<Json<SearchView>, AppError> {
    let session = state.sessions.get(session_id).await
        .ok_or(DiscoveryError::SessionNotFound)?;

    let view = state.orchestrator.update_filters(&session, filters).await;
    Ok(Json(view))
}

#[axum::debug_handler]
pub async fn search_area(
    State(state): State<Arc<DiscoveryState>>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AreaSearchRequest>,
) -> Result<Json<SearchView>, AppError> {
    let session = state.sessions.get(session_id).await
        .ok_or(DiscoveryError::SessionNotFound)?;

    let view = state.orchestrator.search_area(&session, &request.area).await?;
    Ok(Json(view))
}

#[axum::debug_handler]
pub async fn reset_search(
    State(state): State<Arc<DiscoveryState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SearchView>, AppError> {
    let session = state.sessions.get(session_id).await
        .ok_or(DiscoveryError::SessionNotFound)?;

    let mut search = session.write().await;
    search.apply(SearchAction::Reset);
    Ok(Json(search.view()))
}

#[axum::debug_handler]
pub async fn close_search(
    State(state): State<Arc<DiscoveryState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if !state.sessions.remove(session_id).await {
        return Err(DiscoveryError::SessionNotFound.into());
    }

    Ok(Json(json!({
        "success": true,
        "session_id": session_id
    })))
}
