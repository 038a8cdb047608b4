//! The API entry point: every generated resource, as links, in the
//! negotiated hypermedia format.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    let accept = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok());
    let adapter = state.adapters.negotiate(accept);
    let body = adapter.index(&state.model);
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, adapter.media_type())],
        Json(body),
    )
        .into_response())
}
