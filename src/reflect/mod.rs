//! Schema reflection: derive the resource model from the live database.

pub mod loader;
pub mod model;

pub use loader::reflect_schema;
pub use model::{ColumnInfo, PkType, ReflectedModel, ReflectedTable, RelationKind, RelationSpec};
