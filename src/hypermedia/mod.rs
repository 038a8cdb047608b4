//! Hypermedia response adapters and content negotiation.
//!
//! Two formats are always registered: SIREN first (which makes it the
//! default for clients that do not negotiate) and HAL second. Both render
//! from the same link set derived from the reflected relations.

mod hal;
mod siren;

pub use hal::HalAdapter;
pub use siren::SirenAdapter;

use crate::reflect::{ReflectedModel, ReflectedTable, RelationKind};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::Value;

/// Characters escaped in path segments and query values of generated links.
const COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'&')
    .add(b'=')
    .add(b'%')
    .add(b'/')
    .add(b'+');

pub const SIREN_MEDIA_TYPE: &str = "application/vnd.siren+json";
pub const HAL_MEDIA_TYPE: &str = "application/hal+json";

/// One outgoing link: rel name plus href.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

/// Pagination window of a list response, used to derive next/prev links.
#[derive(Clone, Debug)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
    pub returned: usize,
    /// Exact-match filters echoed into pagination links.
    pub filters: Vec<(String, String)>,
}

impl Page {
    fn href_at(&self, table: &ReflectedTable, offset: u32) -> String {
        let mut href = collection_href(table);
        href.push('?');
        for (k, v) in &self.filters {
            href.push_str(&format!(
                "{}={}&",
                utf8_percent_encode(k, COMPONENT),
                utf8_percent_encode(v, COMPONENT)
            ));
        }
        href.push_str(&format!("limit={}&offset={}", self.limit, offset));
        href
    }

    pub fn self_href(&self, table: &ReflectedTable) -> String {
        self.href_at(table, self.offset)
    }

    /// Present when the page came back full, so there may be more.
    pub fn next_href(&self, table: &ReflectedTable) -> Option<String> {
        if self.returned as u64 == u64::from(self.limit) && self.limit > 0 {
            Some(self.href_at(table, self.offset.saturating_add(self.limit)))
        } else {
            None
        }
    }

    pub fn prev_href(&self, table: &ReflectedTable) -> Option<String> {
        if self.offset > 0 {
            Some(self.href_at(table, self.offset.saturating_sub(self.limit)))
        } else {
            None
        }
    }
}

/// A hypermedia response format. Adapters are stateless renderers from a
/// reflected table plus row JSON to a response body.
pub trait Adapter: Send + Sync {
    fn media_type(&self) -> &'static str;
    /// A single row.
    fn item(&self, table: &ReflectedTable, row: &Value) -> Value;
    /// A page of rows.
    fn collection(&self, table: &ReflectedTable, rows: &[Value], page: &Page) -> Value;
    /// The API entry point: one link per resource.
    fn index(&self, model: &ReflectedModel) -> Value;
}

/// The registered adapters, in registration order; the first one is the
/// default when negotiation matches nothing.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn Adapter>>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        AdapterRegistry {
            adapters: vec![Box::new(SirenAdapter), Box::new(HalAdapter)],
        }
    }
}

impl AdapterRegistry {
    /// Pick the adapter for an Accept header. Media ranges are tried in
    /// header order against registered media types; wildcard, absent, or
    /// unrecognized values fall back to the default adapter.
    pub fn negotiate(&self, accept: Option<&str>) -> &dyn Adapter {
        if let Some(accept) = accept {
            for range in accept.split(',') {
                let mime = range.split(';').next().unwrap_or("").trim();
                for adapter in &self.adapters {
                    if mime.eq_ignore_ascii_case(adapter.media_type()) {
                        return adapter.as_ref();
                    }
                }
            }
        }
        self.adapters[0].as_ref()
    }

    pub fn media_types(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.media_type()).collect()
    }
}

pub fn collection_href(table: &ReflectedTable) -> String {
    format!("/{}/", table.path_segment)
}

/// Self href of a row: `/{segment}/{pk}/`. None when the key is composite
/// or the row carries no usable key value.
pub fn item_href(table: &ReflectedTable, row: &Value) -> Option<String> {
    let pk = table.single_pk()?;
    let id = path_value(row.get(pk)?)?;
    Some(format!(
        "/{}/{}/",
        table.path_segment,
        utf8_percent_encode(&id, COMPONENT)
    ))
}

/// Links to related resources derived from foreign keys: to_one links point
/// at the related item, to_many links at a filtered list. Rows with a null
/// key emit no link.
pub fn relation_links(table: &ReflectedTable, row: &Value) -> Vec<Link> {
    let mut links = Vec::new();
    for rel in &table.relations {
        let Some(value) = row.get(&rel.our_key).and_then(path_value) else {
            continue;
        };
        let href = match rel.kind {
            RelationKind::ToOne => format!(
                "/{}/{}/",
                rel.related_path,
                utf8_percent_encode(&value, COMPONENT)
            ),
            RelationKind::ToMany => format!(
                "/{}/?{}={}",
                rel.related_path,
                utf8_percent_encode(&rel.their_key, COMPONENT),
                utf8_percent_encode(&value, COMPONENT)
            ),
        };
        links.push(Link {
            rel: rel.name.clone(),
            href,
        });
    }
    links
}

fn path_value(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
