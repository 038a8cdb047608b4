//! Resource CRUD+List handlers. Routes are parameterized on the path
//! segment; each handler resolves the reflected table, negotiates the
//! response format, and delegates to the CRUD service.

use crate::error::AppError;
use crate::hypermedia::{item_href, Adapter, Page};
use crate::reflect::{PkType, ReflectedTable};
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;

fn accept<'h>(headers: &'h HeaderMap) -> Option<&'h str> {
    headers.get(header::ACCEPT).and_then(|v| v.to_str().ok())
}

fn rendered(status: StatusCode, adapter: &dyn Adapter, body: Value) -> Response {
    (status, [(header::CONTENT_TYPE, adapter.media_type())], Json(body)).into_response()
}

fn resolve<'s>(state: &'s AppState, segment: &str) -> Result<&'s ReflectedTable, AppError> {
    state
        .model
        .table_by_path(segment)
        .ok_or_else(|| AppError::NotFound(segment.to_string()))
}

/// Item routes need a single-column key to parse the path id.
fn single_pk(table: &ReflectedTable) -> Result<&str, AppError> {
    table.single_pk().ok_or_else(|| {
        AppError::BadRequest(format!(
            "{} has a composite primary key; only list and create are exposed",
            table.path_segment
        ))
    })
}

fn parse_id(id_str: &str, pk_type: &PkType) -> Result<Value, AppError> {
    Ok(match pk_type {
        PkType::Uuid => {
            let u = uuid::Uuid::parse_str(id_str)
                .map_err(|_| AppError::BadRequest("invalid uuid".into()))?;
            Value::String(u.to_string())
        }
        PkType::BigInt | PkType::Int => {
            let n: i64 = id_str
                .parse()
                .map_err(|_| AppError::BadRequest("invalid id".into()))?;
            Value::Number(n.into())
        }
        PkType::Text => Value::String(id_str.to_string()),
    })
}

fn body_to_map(value: Value) -> Result<HashMap<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m.into_iter().collect()),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Coerce a query-string filter to the column's JSON shape so it binds with
/// the right wire type.
fn filter_value(table: &ReflectedTable, col: &str, s: &str) -> Value {
    let udt = table.column(col).map(|c| c.udt.as_str()).unwrap_or("");
    match udt {
        "int2" | "int4" | "int8" => match s.parse::<i64>() {
            Ok(n) => Value::Number(n.into()),
            Err(_) => Value::String(s.to_string()),
        },
        "float4" | "float8" => match s.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            Some(n) => Value::Number(n),
            None => Value::String(s.to_string()),
        },
        "bool" => match s.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Value::Bool(true),
            "false" | "f" | "0" => Value::Bool(false),
            _ => Value::String(s.to_string()),
        },
        _ => Value::String(s.to_string()),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let table = resolve(&state, &segment)?;

    let mut limit = DEFAULT_LIMIT;
    let mut offset = 0u32;
    let mut filters: Vec<(String, Value)> = Vec::new();
    let mut echoed: Vec<(String, String)> = Vec::new();
    for (k, v) in params {
        match k.as_str() {
            "limit" => limit = v.parse().unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
            "offset" => offset = v.parse().unwrap_or(0),
            _ if table.column(&k).is_some() => {
                filters.push((k.clone(), filter_value(table, &k, &v)));
                echoed.push((k, v));
            }
            _ => {}
        }
    }

    let rows = CrudService::list(&state.pool, table, &filters, limit, offset).await?;
    let page = Page {
        limit,
        offset,
        returned: rows.len(),
        filters: echoed,
    };
    let adapter = state.adapters.negotiate(accept(&headers));
    Ok(rendered(
        StatusCode::OK,
        adapter,
        adapter.collection(table, &rows, &page),
    ))
}

pub async fn create(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let table = resolve(&state, &segment)?;
    let body = body_to_map(body)?;
    let row = CrudService::create(&state.pool, table, &body).await?;
    let adapter = state.adapters.negotiate(accept(&headers));
    let rendered_body = adapter.item(table, &row);
    let mut response = rendered(StatusCode::CREATED, adapter, rendered_body);
    if let Some(href) = item_href(table, &row) {
        if let Ok(value) = href.parse() {
            response.headers_mut().insert(header::LOCATION, value);
        }
    }
    Ok(response)
}

pub async fn read(
    State(state): State<AppState>,
    Path((segment, id_str)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let table = resolve(&state, &segment)?;
    let pk = single_pk(table)?;
    let id = parse_id(&id_str, &table.pk_type)?;
    let row = CrudService::read(&state.pool, table, pk, &id)
        .await?
        .ok_or(AppError::NotFound(id_str))?;
    let adapter = state.adapters.negotiate(accept(&headers));
    Ok(rendered(StatusCode::OK, adapter, adapter.item(table, &row)))
}

pub async fn update(
    State(state): State<AppState>,
    Path((segment, id_str)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let table = resolve(&state, &segment)?;
    let pk = single_pk(table)?;
    let id = parse_id(&id_str, &table.pk_type)?;
    let body = body_to_map(body)?;
    let row = CrudService::update(&state.pool, table, pk, &id, &body)
        .await?
        .ok_or(AppError::NotFound(id_str))?;
    let adapter = state.adapters.negotiate(accept(&headers));
    Ok(rendered(StatusCode::OK, adapter, adapter.item(table, &row)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((segment, id_str)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let table = resolve(&state, &segment)?;
    let pk = single_pk(table)?;
    let id = parse_id(&id_str, &table.pk_type)?;
    CrudService::delete(&state.pool, table, pk, &id)
        .await?
        .ok_or(AppError::NotFound(id_str))?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypermedia::fixtures::album;
    use serde_json::json;

    #[test]
    fn ids_parse_per_key_type() {
        assert_eq!(parse_id("42", &PkType::Int).unwrap(), json!(42));
        assert_eq!(parse_id("42", &PkType::BigInt).unwrap(), json!(42));
        assert_eq!(parse_id("42", &PkType::Text).unwrap(), json!("42"));
        assert!(parse_id("42", &PkType::Uuid).is_err());
        assert!(parse_id("x", &PkType::Int).is_err());

        let u = "8c5f97f0-16f4-4b0f-9dfe-3b4c7c9c8f21";
        assert_eq!(parse_id(u, &PkType::Uuid).unwrap(), json!(u));
    }

    #[test]
    fn filters_coerce_to_the_column_type() {
        let table = album();
        assert_eq!(filter_value(&table, "artist_id", "3"), json!(3));
        assert_eq!(filter_value(&table, "artist_id", "x"), json!("x"));
        assert_eq!(filter_value(&table, "title", "Aja"), json!("Aja"));
    }

    #[test]
    fn non_object_bodies_are_rejected() {
        assert!(body_to_map(json!([1, 2])).is_err());
        assert!(body_to_map(json!({"a": 1})).is_ok());
    }
}
