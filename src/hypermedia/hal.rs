//! HAL rendering: row fields at the top level, `_links` for navigation,
//! `_embedded` for collection members.

use crate::hypermedia::{
    collection_href, item_href, relation_links, Adapter, Page, HAL_MEDIA_TYPE,
};
use crate::reflect::{ReflectedModel, ReflectedTable};
use serde_json::{json, Map, Value};

pub struct HalAdapter;

impl Adapter for HalAdapter {
    fn media_type(&self) -> &'static str {
        HAL_MEDIA_TYPE
    }

    fn item(&self, table: &ReflectedTable, row: &Value) -> Value {
        let mut body = match row {
            Value::Object(map) => map.clone(),
            other => {
                let mut m = Map::new();
                m.insert("value".into(), other.clone());
                m
            }
        };
        body.insert("_links".into(), Value::Object(links_object(table, row)));
        Value::Object(body)
    }

    fn collection(&self, table: &ReflectedTable, rows: &[Value], page: &Page) -> Value {
        let mut links = Map::new();
        links.insert("self".into(), json!({ "href": page.self_href(table) }));
        if let Some(next) = page.next_href(table) {
            links.insert("next".into(), json!({ "href": next }));
        }
        if let Some(prev) = page.prev_href(table) {
            links.insert("prev".into(), json!({ "href": prev }));
        }
        let items: Vec<Value> = rows.iter().map(|r| self.item(table, r)).collect();
        let mut embedded = Map::new();
        embedded.insert(table.path_segment.clone(), Value::Array(items));
        json!({
            "_links": links,
            "_embedded": embedded,
        })
    }

    fn index(&self, model: &ReflectedModel) -> Value {
        let mut links = Map::new();
        links.insert("self".into(), json!({ "href": "/" }));
        for table in &model.tables {
            links.insert(
                table.path_segment.clone(),
                json!({ "href": collection_href(table) }),
            );
        }
        json!({ "_links": links })
    }
}

fn links_object(table: &ReflectedTable, row: &Value) -> Map<String, Value> {
    let mut links = Map::new();
    if let Some(href) = item_href(table, row) {
        links.insert("self".into(), json!({ "href": href }));
    }
    for link in relation_links(table, row) {
        links.insert(link.rel, json!({ "href": link.href }));
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypermedia::fixtures::{album, artist};
    use crate::reflect::ReflectedModel;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn item_carries_fields_and_links() {
        let row = json!({"album_id": 7, "title": "Aja", "artist_id": 3});
        let body = HalAdapter.item(&album(), &row);
        assert_eq!(
            body,
            json!({
                "album_id": 7,
                "title": "Aja",
                "artist_id": 3,
                "_links": {
                    "self": { "href": "/album/7/" },
                    "artist": { "href": "/artist/3/" },
                }
            })
        );
    }

    #[test]
    fn collection_embeds_items_under_the_resource_name() {
        let rows = vec![json!({"album_id": 7, "title": "Aja", "artist_id": 3})];
        let page = Page {
            limit: 100,
            offset: 0,
            returned: 1,
            filters: Vec::new(),
        };
        let body = HalAdapter.collection(&album(), &rows, &page);
        assert_eq!(body["_links"]["self"]["href"], "/album/?limit=100&offset=0");
        assert!(body["_links"].get("next").is_none());
        let embedded = body["_embedded"]["album"].as_array().unwrap();
        assert_eq!(embedded.len(), 1);
        assert_eq!(embedded[0]["_links"]["self"]["href"], "/album/7/");
    }

    #[test]
    fn index_links_every_resource() {
        let model = ReflectedModel::new(vec![album(), artist()]);
        let body = HalAdapter.index(&model);
        assert_eq!(body["_links"]["self"]["href"], "/");
        assert_eq!(body["_links"]["album"]["href"], "/album/");
        assert_eq!(body["_links"]["artist"]["href"], "/artist/");
    }
}
