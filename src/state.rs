//! Shared application state. The model is a boot-time snapshot: schema
//! changes are not observed after startup.

use crate::hypermedia::AdapterRegistry;
use crate::reflect::ReflectedModel;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub model: Arc<ReflectedModel>,
    pub adapters: Arc<AdapterRegistry>,
}

impl AppState {
    pub fn new(pool: PgPool, model: ReflectedModel) -> Self {
        AppState {
            pool,
            model: Arc::new(model),
            adapters: Arc::new(AdapterRegistry::default()),
        }
    }
}
