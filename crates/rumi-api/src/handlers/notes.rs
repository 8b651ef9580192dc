//! Note CRUD and search handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use rumi_core::Note;

use crate::error::ApiError;
use crate::services::NoteInput;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// `GET /api/notes`
pub async fn list_notes(State(state): State<AppState>) -> Result<Json<Vec<Note>>, ApiError> {
    Ok(Json(state.notes.list_all().await?))
}

/// `POST /api/notes`
pub async fn create_note(
    State(state): State<AppState>,
    payload: Result<Json<NoteInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let Json(input) = payload?;
    let note = state.notes.create(input).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// `GET /api/notes/:id`
pub async fn get_note(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<Note>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.notes.get(&id).await?))
}

/// `PUT /api/notes/:id`
pub async fn update_note(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<NoteInput>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let Path(id) = id?;
    let Json(input) = payload?;
    Ok(Json(state.notes.update(&id, input).await?))
}

/// `DELETE /api/notes/:id`
pub async fn delete_note(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.notes.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/notes/date/:date`
pub async fn notes_by_date(
    State(state): State<AppState>,
    date: Result<Path<String>, PathRejection>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let Path(date) = date?;
    Ok(Json(state.notes.get_by_date(&date).await?))
}

/// `GET /api/search?q=`
pub async fn search_notes(
    State(state): State<AppState>,
    params: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let Query(params) = params?;
    Ok(Json(state.notes.search(params.q.as_deref()).await?))
}
