//! Generic CRUD execution against PostgreSQL.

use crate::error::AppError;
use crate::reflect::ReflectedTable;
use crate::sql::{delete, insert, select_by_id, select_list, PgBindValue, QueryBuf};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{Column, PgPool, Row};
use std::collections::HashMap;

pub struct CrudService;

impl CrudService {
    /// List rows with exact-match filters, ordered by primary key.
    pub async fn list(
        pool: &PgPool,
        table: &ReflectedTable,
        filters: &[(String, Value)],
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Value>, AppError> {
        let q = select_list(table, filters, limit, offset);
        Self::fetch_all(pool, &q).await
    }

    /// Fetch one row by primary key. None when absent.
    pub async fn read(
        pool: &PgPool,
        table: &ReflectedTable,
        pk: &str,
        id: &Value,
    ) -> Result<Option<Value>, AppError> {
        let mut q = select_by_id(table, pk);
        q.params.push(id.clone());
        Self::fetch_optional(pool, &q).await
    }

    /// Insert one row from a JSON body. Returns the created row.
    pub async fn create(
        pool: &PgPool,
        table: &ReflectedTable,
        body: &HashMap<String, Value>,
    ) -> Result<Value, AppError> {
        let q = insert(table, body);
        Self::fetch_optional(pool, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Update one row by primary key. None when absent.
    pub async fn update(
        pool: &PgPool,
        table: &ReflectedTable,
        pk: &str,
        id: &Value,
        body: &HashMap<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        let q = crate::sql::update(table, pk, id, body);
        Self::fetch_optional(pool, &q).await
    }

    /// Delete one row by primary key. Returns the deleted row, None when absent.
    pub async fn delete(
        pool: &PgPool,
        table: &ReflectedTable,
        pk: &str,
        id: &Value,
    ) -> Result<Option<Value>, AppError> {
        let mut q = delete(table, pk);
        q.params.push(id.clone());
        Self::fetch_optional(pool, &q).await
    }

    async fn fetch_all(pool: &PgPool, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query.fetch_all(pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn fetch_optional(pool: &PgPool, q: &QueryBuf) -> Result<Option<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let row = query.fetch_optional(pool).await?;
        Ok(row.map(|r| row_to_json(&r)))
    }
}

fn row_to_json(row: &PgRow) -> Value {
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        map.insert(col.name().to_string(), cell_to_value(row, col));
    }
    Value::Object(map)
}

/// Decode one cell to JSON by the column's reported Postgres type. Enum and
/// numeric columns were selected as ::text, so everything left is a type
/// sqlx decodes natively; anything unrecognized falls back to text, then
/// JSON, then null.
fn cell_to_value(row: &PgRow, col: &sqlx::postgres::PgColumn) -> Value {
    let name = col.name();
    match col.type_info().to_string().as_str() {
        "BOOL" => opt(row.try_get::<Option<bool>, _>(name)).map_or(Value::Null, Value::Bool),
        "INT2" => int_value(opt(row.try_get::<Option<i16>, _>(name)).map(i64::from)),
        "INT4" => int_value(opt(row.try_get::<Option<i32>, _>(name)).map(i64::from)),
        "INT8" => int_value(opt(row.try_get::<Option<i64>, _>(name))),
        "FLOAT4" => float_value(opt(row.try_get::<Option<f32>, _>(name)).map(f64::from)),
        "FLOAT8" => float_value(opt(row.try_get::<Option<f64>, _>(name))),
        "UUID" => opt(row.try_get::<Option<uuid::Uuid>, _>(name))
            .map_or(Value::Null, |u| Value::String(u.to_string())),
        "TIMESTAMPTZ" => opt(row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name))
            .map_or(Value::Null, |d| Value::String(d.to_rfc3339())),
        "TIMESTAMP" => opt(row.try_get::<Option<chrono::NaiveDateTime>, _>(name))
            .map_or(Value::Null, |d| {
                Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }),
        "DATE" => opt(row.try_get::<Option<chrono::NaiveDate>, _>(name))
            .map_or(Value::Null, |d| Value::String(d.format("%Y-%m-%d").to_string())),
        "TIME" => opt(row.try_get::<Option<chrono::NaiveTime>, _>(name))
            .map_or(Value::Null, |t| Value::String(t.format("%H:%M:%S%.f").to_string())),
        "JSON" | "JSONB" => {
            opt(row.try_get::<Option<Value>, _>(name)).unwrap_or(Value::Null)
        }
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "CITEXT" => {
            opt(row.try_get::<Option<String>, _>(name)).map_or(Value::Null, Value::String)
        }
        _ => opt(row.try_get::<Option<String>, _>(name))
            .map(Value::String)
            .or_else(|| opt(row.try_get::<Option<Value>, _>(name)))
            .unwrap_or(Value::Null),
    }
}

fn opt<T>(res: Result<Option<T>, sqlx::Error>) -> Option<T> {
    res.ok().flatten()
}

fn int_value(v: Option<i64>) -> Value {
    v.map_or(Value::Null, |n| Value::Number(n.into()))
}

fn float_value(v: Option<f64>) -> Value {
    v.and_then(serde_json::Number::from_f64)
        .map_or(Value::Null, Value::Number)
}
