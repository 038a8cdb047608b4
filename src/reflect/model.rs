//! Reflected entity model: one table per resource, built once at startup.

use std::collections::HashMap;

/// Direction of a relation derived from a foreign key: to_one (we hold the
/// FK) or to_many (they hold the FK to us).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationKind {
    ToOne,
    ToMany,
}

/// One hypermedia relation. `name` is the link rel exposed to clients.
#[derive(Clone, Debug)]
pub struct RelationSpec {
    pub name: String,
    pub kind: RelationKind,
    /// Path segment of the related resource.
    pub related_path: String,
    /// Our column in the join (the FK for to_one; our PK for to_many).
    pub our_key: String,
    /// Their column in the join (their PK for to_one; their FK for to_many).
    pub their_key: String,
}

/// Primary key type for parsing path ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PkType {
    Uuid,
    BigInt,
    Int,
    Text,
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub pk_type: Option<PkType>,
    pub nullable: bool,
    /// Whether the column has a database default (serial, gen_random_uuid(), NOW(), ...).
    pub has_default: bool,
    /// Raw udt name from the catalog (int4, varchar, ...). Drives the field
    /// types the SIREN actions advertise.
    pub udt: String,
    /// PostgreSQL type name for SQL casts (e.g. "timestamptz") when binding
    /// or selecting values that travel as JSON strings. None for types that
    /// bind directly.
    pub pg_type: Option<String>,
}

impl ColumnInfo {
    pub fn is_pk(&self) -> bool {
        self.pk_type.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct ReflectedTable {
    pub schema_name: String,
    pub table_name: String,
    /// URL segment for this resource; the table name.
    pub path_segment: String,
    pub pk_columns: Vec<String>,
    pub pk_type: PkType,
    pub columns: Vec<ColumnInfo>,
    pub relations: Vec<RelationSpec>,
}

impl ReflectedTable {
    /// The primary key column, when it is a single column. Item routes
    /// (read/update/delete) require one; composite-key tables expose only
    /// list and create.
    pub fn single_pk(&self) -> Option<&str> {
        match self.pk_columns.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReflectedModel {
    pub tables: Vec<ReflectedTable>,
    by_path: HashMap<String, usize>,
}

impl ReflectedModel {
    pub fn new(tables: Vec<ReflectedTable>) -> Self {
        let by_path = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.path_segment.clone(), i))
            .collect();
        ReflectedModel { tables, by_path }
    }

    pub fn table_by_path(&self, path: &str) -> Option<&ReflectedTable> {
        self.by_path.get(path).map(|&i| &self.tables[i])
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
