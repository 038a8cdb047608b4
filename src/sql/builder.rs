//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from a reflected table.

use crate::reflect::ReflectedTable;
use serde_json::Value;
use std::collections::HashMap;

/// Quote an identifier for PostgreSQL. Names come from the catalog, so this
/// only has to survive embedded quotes.
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(table: &ReflectedTable) -> String {
    format!("{}.{}", quoted(&table.schema_name), quoted(&table.table_name))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// SELECT list: each column as-is, except enums (schema-qualified types)
/// and numeric, selected as ::text so rows decode uniformly.
fn select_column_list(table: &ReflectedTable) -> String {
    table
        .columns
        .iter()
        .map(|c| {
            let q = quoted(&c.name);
            match c.pg_type.as_deref() {
                Some(t) if t.contains('.') || t == "numeric" => format!("{}::text", q),
                _ => q,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Placeholder for a bound value, cast to the column's type when one is
/// recorded (e.g. `$1::timestamptz` so a JSON string binds correctly).
fn placeholder(table: &ReflectedTable, column: &str, param_num: usize) -> String {
    match table.column(column).and_then(|c| c.pg_type.as_deref()) {
        Some(t) => format!("${}::{}", param_num, t),
        None => format!("${}", param_num),
    }
}

/// SELECT by primary key (single-column keys only). Caller binds the id as
/// the sole param.
pub fn select_by_id(table: &ReflectedTable, pk: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(table),
        qualified_table(table),
        quoted(pk),
        placeholder(table, pk, 1)
    );
    q
}

/// SELECT list with exact-match filters, ORDER BY primary key, LIMIT/OFFSET.
/// Filters for columns the table does not have are ignored.
pub fn select_list(
    table: &ReflectedTable,
    filters: &[(String, Value)],
    limit: u32,
    offset: u32,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    for (col, val) in filters {
        if table.column(col).is_none() {
            continue;
        }
        let n = q.push_param(val.clone());
        where_parts.push(format!("{} = {}", quoted(col), placeholder(table, col, n)));
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    let order_by = table
        .pk_columns
        .iter()
        .map(|c| quoted(c))
        .collect::<Vec<_>>()
        .join(", ");
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT {} OFFSET {}",
        select_column_list(table),
        qualified_table(table),
        where_clause,
        order_by,
        limit,
        offset
    );
    q
}

/// INSERT from a JSON body. Keys that are not columns are ignored. Columns
/// with a database default are omitted when the body has no value for them,
/// so generated keys and timestamps apply; nullable columns without a value
/// are omitted too. What remains either binds a value or lets the database
/// reject the row. An empty column list becomes DEFAULT VALUES. Returns the
/// created row.
pub fn insert(table: &ReflectedTable, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut values = Vec::new();
    for c in &table.columns {
        let val = match body.get(&c.name) {
            Some(v) => v.clone(),
            None if c.has_default || c.nullable => continue,
            None => Value::Null,
        };
        let n = q.push_param(val);
        cols.push(quoted(&c.name));
        values.push(placeholder(table, &c.name, n));
    }
    let returning = select_column_list(table);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", qualified_table(table), returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            qualified_table(table),
            cols.join(", "),
            values.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by primary key: SET only body keys that are real columns, never
/// the key itself. A body with nothing to set degrades to a SELECT by id so
/// the handler still gets the row back (or a 404).
pub fn update(table: &ReflectedTable, pk: &str, id: &Value, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in &table.columns {
        if c.name == pk {
            continue;
        }
        let Some(v) = body.get(&c.name) else { continue };
        let n = q.push_param(v.clone());
        sets.push(format!("{} = {}", quoted(&c.name), placeholder(table, &c.name, n)));
    }
    if sets.is_empty() {
        return select_by_id_with_param(table, pk, id);
    }
    let id_param = q.push_param(id.clone());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        qualified_table(table),
        sets.join(", "),
        quoted(pk),
        placeholder(table, pk, id_param),
        select_column_list(table)
    );
    q
}

fn select_by_id_with_param(table: &ReflectedTable, pk: &str, id: &Value) -> QueryBuf {
    let mut q = select_by_id(table, pk);
    q.params.push(id.clone());
    q
}

/// DELETE by primary key, RETURNING the row so the caller can distinguish
/// deleted from absent. Caller binds the id as the sole param.
pub fn delete(table: &ReflectedTable, pk: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        qualified_table(table),
        quoted(pk),
        placeholder(table, pk, 1),
        select_column_list(table)
    );
    q
}
