//! SIREN rendering: class/properties/entities/links/actions.

use crate::hypermedia::{
    collection_href, item_href, relation_links, Adapter, Page, SIREN_MEDIA_TYPE,
};
use crate::reflect::{ColumnInfo, ReflectedModel, ReflectedTable};
use serde_json::{json, Value};

pub struct SirenAdapter;

impl Adapter for SirenAdapter {
    fn media_type(&self) -> &'static str {
        SIREN_MEDIA_TYPE
    }

    fn item(&self, table: &ReflectedTable, row: &Value) -> Value {
        let mut body = json!({
            "class": [table.path_segment],
            "properties": row,
            "entities": related_entities(table, row),
        });
        let mut links = vec![];
        let mut actions = vec![];
        if let Some(href) = item_href(table, row) {
            links.push(json!({ "rel": ["self"], "href": href }));
            actions.push(json!({
                "name": format!("update-{}", table.path_segment),
                "method": "PATCH",
                "href": href,
                "type": "application/json",
                "fields": action_fields(table),
            }));
            actions.push(json!({
                "name": format!("delete-{}", table.path_segment),
                "method": "DELETE",
                "href": href,
            }));
        }
        body["links"] = Value::Array(links);
        body["actions"] = Value::Array(actions);
        body
    }

    fn collection(&self, table: &ReflectedTable, rows: &[Value], page: &Page) -> Value {
        let entities: Vec<Value> = rows
            .iter()
            .map(|row| {
                let mut entity = self.item(table, row);
                entity["rel"] = json!(["item"]);
                entity
            })
            .collect();
        let mut links = vec![json!({ "rel": ["self"], "href": page.self_href(table) })];
        if let Some(next) = page.next_href(table) {
            links.push(json!({ "rel": ["next"], "href": next }));
        }
        if let Some(prev) = page.prev_href(table) {
            links.push(json!({ "rel": ["prev"], "href": prev }));
        }
        json!({
            "class": [table.path_segment, "collection"],
            "properties": { "count": rows.len() },
            "entities": entities,
            "links": links,
            "actions": [{
                "name": format!("create-{}", table.path_segment),
                "method": "POST",
                "href": collection_href(table),
                "type": "application/json",
                "fields": action_fields(table),
            }],
        })
    }

    fn index(&self, model: &ReflectedModel) -> Value {
        let entities: Vec<Value> = model
            .tables
            .iter()
            .map(|table| {
                json!({
                    "class": [table.path_segment],
                    "rel": ["collection"],
                    "href": collection_href(table),
                })
            })
            .collect();
        json!({
            "class": ["index"],
            "entities": entities,
            "links": [{ "rel": ["self"], "href": "/" }],
        })
    }
}

/// Related resources as linked sub-entities.
fn related_entities(table: &ReflectedTable, row: &Value) -> Vec<Value> {
    relation_links(table, row)
        .into_iter()
        .map(|link| {
            json!({
                "class": [link_class(table, &link.rel)],
                "rel": [link.rel],
                "href": link.href,
            })
        })
        .collect()
}

fn link_class(table: &ReflectedTable, rel_name: &str) -> String {
    table
        .relations
        .iter()
        .find(|r| r.name == rel_name)
        .map(|r| r.related_path.clone())
        .unwrap_or_else(|| rel_name.to_string())
}

/// Form fields for create/update actions: every non-key column, typed the
/// way HTML inputs are.
fn action_fields(table: &ReflectedTable) -> Vec<Value> {
    table
        .columns
        .iter()
        .filter(|c| !c.is_pk())
        .map(|c| json!({ "name": c.name, "type": field_type(c) }))
        .collect()
}

fn field_type(column: &ColumnInfo) -> &'static str {
    match column.udt.as_str() {
        "int2" | "int4" | "int8" | "float4" | "float8" | "numeric" => "number",
        "bool" => "checkbox",
        "date" => "date",
        _ => "text",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypermedia::fixtures::{album, artist};
    use crate::reflect::ReflectedModel;
    use serde_json::json;

    #[test]
    fn item_has_the_full_siren_shape() {
        let row = json!({"album_id": 7, "title": "Aja", "artist_id": 3});
        let body = SirenAdapter.item(&album(), &row);
        assert_eq!(body["class"], json!(["album"]));
        assert_eq!(body["properties"], row);
        assert_eq!(
            body["entities"],
            json!([{ "class": ["artist"], "rel": ["artist"], "href": "/artist/3/" }])
        );
        assert_eq!(body["links"], json!([{ "rel": ["self"], "href": "/album/7/" }]));

        let actions = body["actions"].as_array().unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0]["name"], "update-album");
        assert_eq!(actions[0]["method"], "PATCH");
        assert_eq!(
            actions[0]["fields"],
            json!([
                { "name": "title", "type": "text" },
                { "name": "artist_id", "type": "number" },
            ])
        );
        assert_eq!(actions[1]["name"], "delete-album");
    }

    #[test]
    fn composite_key_items_render_without_self_or_actions() {
        let mut table = album();
        table.pk_columns.push("disc".into());
        let row = json!({"album_id": 7, "title": "Aja", "artist_id": 3});
        let body = SirenAdapter.item(&table, &row);
        assert_eq!(body["links"], json!([]));
        assert_eq!(body["actions"], json!([]));
    }

    #[test]
    fn collection_embeds_items_and_offers_create() {
        let rows = vec![
            json!({"artist_id": 1, "name": "Steely Dan"}),
            json!({"artist_id": 2, "name": "Weather Report"}),
        ];
        let page = Page {
            limit: 2,
            offset: 0,
            returned: 2,
            filters: Vec::new(),
        };
        let body = SirenAdapter.collection(&artist(), &rows, &page);
        assert_eq!(body["class"], json!(["artist", "collection"]));
        assert_eq!(body["properties"]["count"], 2);

        let entities = body["entities"].as_array().unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0]["rel"], json!(["item"]));
        assert_eq!(
            entities[0]["entities"],
            json!([{ "class": ["album"], "rel": ["album"], "href": "/album/?artist_id=1" }])
        );

        let links = body["links"].as_array().unwrap();
        assert_eq!(links[0]["rel"], json!(["self"]));
        // full page: next offered, no prev at offset 0
        assert_eq!(links[1]["rel"], json!(["next"]));
        assert_eq!(links.len(), 2);

        assert_eq!(body["actions"][0]["name"], "create-artist");
        assert_eq!(body["actions"][0]["href"], "/artist/");
    }

    #[test]
    fn index_lists_every_resource_as_a_collection_entity() {
        let model = ReflectedModel::new(vec![album(), artist()]);
        let body = SirenAdapter.index(&model);
        assert_eq!(body["class"], json!(["index"]));
        let entities = body["entities"].as_array().unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0]["href"], "/album/");
        assert_eq!(entities[1]["rel"], json!(["collection"]));
    }
}
