//! oasis: expose a relational database as a ReSTful hypermedia API.
//!
//! Point it at a database and every keyed table becomes a CRUD+List
//! resource, served as HAL or SIREN by content negotiation, with links to
//! related resources derived from the foreign keys.

pub mod app;
pub mod error;
pub mod handlers;
pub mod hypermedia;
pub mod reflect;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod uri;

pub use app::{build_app, router};
pub use error::{AppError, ReflectError};
pub use hypermedia::{AdapterRegistry, HalAdapter, SirenAdapter};
pub use reflect::{reflect_schema, ReflectedModel, ReflectedTable};
pub use service::CrudService;
pub use state::AppState;
pub use uri::{DatabaseUri, UriParts};
