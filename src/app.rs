//! The app builder: open an engine for the URI, reflect the schema, and
//! wire one CRUD+List resource per table into a runnable router.

use crate::error::AppError;
use crate::reflect::reflect_schema;
use crate::routes::{common_routes, entity_routes};
use crate::state::AppState;
use crate::uri::DatabaseUri;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::limit::RequestBodyLimitLayer;

const MAX_POOL_CONNECTIONS: u32 = 5;
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Dialects this build has an engine for.
const POSTGRES_DIALECTS: &[&str] = &["postgres", "postgresql"];

/// Build the application for a database URI: connect, reflect every keyed
/// table, and return the router serving them all with both hypermedia
/// formats registered.
///
/// A dialect with no compiled-in engine yields
/// [`AppError::UnsupportedDriver`]; every other failure (unreachable host,
/// bad credentials, reflection errors) propagates to the caller.
pub async fn build_app(uri: &DatabaseUri) -> Result<Router, AppError> {
    let dialect = uri.dialect();
    if !POSTGRES_DIALECTS.contains(&dialect) {
        return Err(AppError::UnsupportedDriver {
            dialect: dialect.to_string(),
        });
    }

    tracing::info!(uri = %uri.redacted(), "connecting");
    let pool = PgPoolOptions::new()
        .max_connections(MAX_POOL_CONNECTIONS)
        .connect(&uri.engine_url())
        .await?;

    let model = reflect_schema(&pool).await?;
    tracing::info!(resources = model.len(), "schema reflected");
    for table in &model.tables {
        tracing::debug!(resource = %table.path_segment, columns = table.columns.len(), "resource generated");
    }

    Ok(router(AppState::new(pool, model)))
}

/// Assemble the router from prepared state. Split from [`build_app`] so
/// tests can run against a hand-built model.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(entity_routes(state))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn foreign_dialects_fail_before_any_connection() {
        let err = build_app(&DatabaseUri::from("mysql://root@db/orders"))
            .await
            .unwrap_err();
        match err {
            AppError::UnsupportedDriver { dialect } => assert_eq!(dialect, "mysql"),
            other => panic!("expected UnsupportedDriver, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn driver_suffixes_do_not_change_the_engine() {
        // postgres+anything selects the postgres engine; the error here is a
        // connection failure, not an unsupported driver.
        let err = build_app(&DatabaseUri::from("postgres+quirk://nobody@localhost:1/void"))
            .await
            .unwrap_err();
        assert!(!matches!(err, AppError::UnsupportedDriver { .. }));
    }
}
