//! Reflect the connected database's default schema through the
//! information_schema views. Identifier-typed catalog columns are cast to
//! text so they decode as plain strings.

use crate::error::ReflectError;
use crate::reflect::model::{
    ColumnInfo, PkType, ReflectedModel, ReflectedTable, RelationKind, RelationSpec,
};
use sqlx::PgPool;
use std::collections::HashMap;

/// automap-parity: reflection covers the default schema only.
const DEFAULT_SCHEMA: &str = "public";

const COLUMNS_SQL: &str = "\
SELECT c.table_name::text,
       c.column_name::text,
       c.udt_name::text,
       c.udt_schema::text,
       (c.data_type = 'USER-DEFINED'),
       (c.is_nullable = 'YES'),
       (c.column_default IS NOT NULL)
FROM information_schema.columns c
JOIN information_schema.tables t
  ON t.table_schema = c.table_schema AND t.table_name = c.table_name
WHERE c.table_schema = $1 AND t.table_type = 'BASE TABLE'
ORDER BY c.table_name, c.ordinal_position";

const PRIMARY_KEYS_SQL: &str = "\
SELECT tc.table_name::text, kcu.column_name::text
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_name = tc.constraint_name AND kcu.table_schema = tc.table_schema
WHERE tc.table_schema = $1 AND tc.constraint_type = 'PRIMARY KEY'
ORDER BY tc.table_name, kcu.ordinal_position";

const FOREIGN_KEYS_SQL: &str = "\
SELECT tc.table_name::text, kcu.column_name::text, ccu.table_name::text, ccu.column_name::text
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_name = tc.constraint_name AND kcu.table_schema = tc.table_schema
JOIN information_schema.constraint_column_usage ccu
  ON ccu.constraint_name = tc.constraint_name AND ccu.table_schema = tc.table_schema
WHERE tc.table_schema = $1 AND tc.constraint_type = 'FOREIGN KEY'
ORDER BY tc.table_name, kcu.ordinal_position";

/// Reflect all keyed base tables of the default schema into the resource
/// model. Tables without a primary key cannot be addressed as items and are
/// skipped with a warning.
pub async fn reflect_schema(pool: &PgPool) -> Result<ReflectedModel, ReflectError> {
    let schema = DEFAULT_SCHEMA;
    tracing::debug!(schema = %schema, "reflecting schema");

    let columns: Vec<(String, String, String, String, bool, bool, bool)> =
        sqlx::query_as(COLUMNS_SQL).bind(schema).fetch_all(pool).await?;
    let pks: Vec<(String, String)> = sqlx::query_as(PRIMARY_KEYS_SQL)
        .bind(schema)
        .fetch_all(pool)
        .await?;
    let fks: Vec<(String, String, String, String)> = sqlx::query_as(FOREIGN_KEYS_SQL)
        .bind(schema)
        .fetch_all(pool)
        .await?;

    assemble(schema, &columns, &pks, &fks)
}

/// Pure assembly step, split from the queries so it can be exercised
/// without a database.
pub(crate) fn assemble(
    schema: &str,
    columns: &[(String, String, String, String, bool, bool, bool)],
    pks: &[(String, String)],
    fks: &[(String, String, String, String)],
) -> Result<ReflectedModel, ReflectError> {
    let mut table_order: Vec<String> = Vec::new();
    let mut cols_by_table: HashMap<&str, Vec<ColumnInfo>> = HashMap::new();
    for (table, column, udt, udt_schema, user_defined, nullable, has_default) in columns {
        if !cols_by_table.contains_key(table.as_str()) {
            table_order.push(table.clone());
        }
        cols_by_table.entry(table.as_str()).or_default().push(ColumnInfo {
            name: column.clone(),
            pk_type: None,
            nullable: *nullable,
            has_default: *has_default,
            udt: udt.clone(),
            pg_type: cast_type(udt, udt_schema, *user_defined),
        });
    }

    let mut pks_by_table: HashMap<&str, Vec<&str>> = HashMap::new();
    for (table, column) in pks {
        pks_by_table.entry(table.as_str()).or_default().push(column.as_str());
    }

    let mut tables = Vec::new();
    for table_name in &table_order {
        let Some(pk_columns) = pks_by_table.get(table_name.as_str()) else {
            tracing::warn!(table = %table_name, "no primary key; table not exposed");
            continue;
        };
        let mut cols = cols_by_table.remove(table_name.as_str()).unwrap_or_default();
        let pk_col = cols
            .iter()
            .find(|c| c.name == *pk_columns[0])
            .ok_or_else(|| ReflectError::OrphanPrimaryKey {
                table: table_name.clone(),
                column: pk_columns[0].to_string(),
            })?;
        let pk_type = classify_pk(pk_col.pg_type.as_deref(), &pk_col.name, columns, table_name);
        for c in cols.iter_mut() {
            if pk_columns.contains(&c.name.as_str()) {
                c.pk_type = Some(pk_type.clone());
            }
        }
        tables.push(ReflectedTable {
            schema_name: schema.to_string(),
            table_name: table_name.clone(),
            path_segment: table_name.clone(),
            pk_columns: pk_columns.iter().map(|s| s.to_string()).collect(),
            pk_type,
            columns: cols,
            relations: Vec::new(),
        });
    }

    attach_relations(&mut tables, fks);
    Ok(ReflectedModel::new(tables))
}

/// Turn each foreign key into a pair of relations: to_one on the owning
/// table, to_many on the referenced one. Relations touching unmapped
/// (key-less) tables are dropped.
fn attach_relations(tables: &mut [ReflectedTable], fks: &[(String, String, String, String)]) {
    let mapped: HashMap<String, String> = tables
        .iter()
        .map(|t| (t.table_name.clone(), t.path_segment.clone()))
        .collect();

    for (from_table, from_col, to_table, to_col) in fks {
        if !mapped.contains_key(from_table) || !mapped.contains_key(to_table) {
            continue;
        }
        if let Some(t) = tables.iter_mut().find(|t| &t.table_name == from_table) {
            let name = unique_name(&t.relations, to_one_name(from_col, to_table), from_col);
            t.relations.push(RelationSpec {
                name,
                kind: RelationKind::ToOne,
                related_path: mapped[to_table].clone(),
                our_key: from_col.clone(),
                their_key: to_col.clone(),
            });
        }
        if let Some(t) = tables.iter_mut().find(|t| &t.table_name == to_table) {
            let name = unique_name(&t.relations, mapped[from_table].clone(), from_col);
            t.relations.push(RelationSpec {
                name,
                kind: RelationKind::ToMany,
                related_path: mapped[from_table].clone(),
                our_key: to_col.clone(),
                their_key: from_col.clone(),
            });
        }
    }
}

/// Rel name for a to_one link: the FK column minus a trailing `_id`
/// ("artist_id" -> "artist"), falling back to the referenced table.
fn to_one_name(fk_column: &str, referenced_table: &str) -> String {
    match fk_column.strip_suffix("_id") {
        Some(base) if !base.is_empty() => base.to_string(),
        _ => referenced_table.to_string(),
    }
}

fn unique_name(existing: &[RelationSpec], candidate: String, discriminator: &str) -> String {
    if existing.iter().any(|r| r.name == candidate) {
        format!("{}_{}", candidate, discriminator)
    } else {
        candidate
    }
}

/// Cast type carried on the column when values travel as JSON strings or
/// need a select-side cast: date/time types, uuid, numeric, json, and
/// user-defined types (enums), the latter schema-qualified.
fn cast_type(udt: &str, udt_schema: &str, user_defined: bool) -> Option<String> {
    if user_defined {
        return Some(format!("{}.{}", udt_schema, udt));
    }
    match udt {
        "timestamptz" | "timestamp" | "date" | "time" | "timetz" | "uuid" | "numeric"
        | "json" | "jsonb" => Some(udt.to_string()),
        _ => None,
    }
}

/// Classify the primary key type for path-id parsing. The cast type covers
/// uuid; integer and text keys carry no cast, so look their udt up again.
fn classify_pk(
    cast: Option<&str>,
    pk_name: &str,
    columns: &[(String, String, String, String, bool, bool, bool)],
    table: &str,
) -> PkType {
    if cast == Some("uuid") {
        return PkType::Uuid;
    }
    let udt = columns
        .iter()
        .find(|(t, c, ..)| t.as_str() == table && c.as_str() == pk_name)
        .map(|(_, _, udt, ..)| udt.as_str())
        .unwrap_or("");
    match udt {
        "int8" => PkType::BigInt,
        "int2" | "int4" => PkType::Int,
        _ => PkType::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type ColRow = (String, String, String, String, bool, bool, bool);

    fn col(table: &str, name: &str, udt: &str, has_default: bool) -> ColRow {
        (
            table.into(),
            name.into(),
            udt.into(),
            "pg_catalog".into(),
            false,
            false,
            has_default,
        )
    }

    fn chinook() -> (Vec<ColRow>, Vec<(String, String)>, Vec<(String, String, String, String)>) {
        let columns = vec![
            col("album", "album_id", "int4", true),
            col("album", "title", "varchar", false),
            col("album", "artist_id", "int4", false),
            col("artist", "artist_id", "int4", true),
            col("artist", "name", "varchar", false),
            col("dangling", "note", "text", false),
        ];
        let pks = vec![
            ("album".to_string(), "album_id".to_string()),
            ("artist".to_string(), "artist_id".to_string()),
        ];
        let fks = vec![(
            "album".to_string(),
            "artist_id".to_string(),
            "artist".to_string(),
            "artist_id".to_string(),
        )];
        (columns, pks, fks)
    }

    #[test]
    fn keyed_tables_become_resources_and_keyless_are_skipped() {
        let (columns, pks, fks) = chinook();
        let model = assemble("public", &columns, &pks, &fks).unwrap();
        assert_eq!(model.len(), 2);
        assert!(model.table_by_path("album").is_some());
        assert!(model.table_by_path("dangling").is_none());
    }

    #[test]
    fn foreign_keys_produce_relations_in_both_directions() {
        let (columns, pks, fks) = chinook();
        let model = assemble("public", &columns, &pks, &fks).unwrap();

        let album = model.table_by_path("album").unwrap();
        assert_eq!(album.relations.len(), 1);
        let rel = &album.relations[0];
        assert_eq!(rel.kind, RelationKind::ToOne);
        assert_eq!(rel.name, "artist");
        assert_eq!(rel.related_path, "artist");
        assert_eq!(rel.our_key, "artist_id");

        let artist = model.table_by_path("artist").unwrap();
        assert_eq!(artist.relations.len(), 1);
        let rel = &artist.relations[0];
        assert_eq!(rel.kind, RelationKind::ToMany);
        assert_eq!(rel.name, "album");
        assert_eq!(rel.their_key, "artist_id");
    }

    #[test]
    fn pk_classification_follows_udt() {
        let (columns, pks, fks) = chinook();
        let model = assemble("public", &columns, &pks, &fks).unwrap();
        assert_eq!(model.table_by_path("album").unwrap().pk_type, PkType::Int);

        let columns = vec![col("doc", "id", "uuid", true)];
        let pks = vec![("doc".to_string(), "id".to_string())];
        let model = assemble("public", &columns, &pks, &[]).unwrap();
        assert_eq!(model.table_by_path("doc").unwrap().pk_type, PkType::Uuid);
    }

    #[test]
    fn user_defined_types_carry_a_qualified_cast() {
        let mut status = col("order", "status", "order_status", false);
        status.3 = "public".into();
        status.4 = true;
        let columns = vec![col("order", "id", "int8", true), status];
        let pks = vec![("order".to_string(), "id".to_string())];
        let model = assemble("public", &columns, &pks, &[]).unwrap();
        let table = model.table_by_path("order").unwrap();
        assert_eq!(
            table.column("status").unwrap().pg_type.as_deref(),
            Some("public.order_status")
        );
        assert_eq!(table.pk_type, PkType::BigInt);
    }

    #[test]
    fn duplicate_relation_names_get_a_discriminator() {
        let columns = vec![
            col("message", "id", "int8", true),
            col("message", "sender_id", "int8", false),
            col("message", "recipient_id", "int8", false),
            col("user", "id", "int8", true),
        ];
        let pks = vec![
            ("message".to_string(), "id".to_string()),
            ("user".to_string(), "id".to_string()),
        ];
        let fks = vec![
            ("message".to_string(), "sender_id".to_string(), "user".to_string(), "id".to_string()),
            ("message".to_string(), "recipient_id".to_string(), "user".to_string(), "id".to_string()),
        ];
        let model = assemble("public", &columns, &pks, &fks).unwrap();

        let message = model.table_by_path("message").unwrap();
        let names: Vec<_> = message.relations.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["sender", "recipient"]);

        let user = model.table_by_path("user").unwrap();
        let names: Vec<_> = user.relations.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["message", "message_recipient_id"]);
    }

    #[test]
    fn missing_pk_column_is_an_error() {
        let columns = vec![col("broken", "note", "text", false)];
        let pks = vec![("broken".to_string(), "id".to_string())];
        let err = assemble("public", &columns, &pks, &[]).unwrap_err();
        assert!(matches!(err, ReflectError::OrphanPrimaryKey { .. }));
    }
}
