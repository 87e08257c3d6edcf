use serde::Deserialize;
use serde_json::{Map, Value};

use crate::model::Entry;

#[derive(Deserialize, Debug, Default)]
pub struct EntryCollection {
    #[serde(default)]
    pub items: Vec<RawEntry>,
    #[serde(default)]
    pub includes: Includes,
    pub total: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Includes {
    #[serde(rename = "Entry", default)]
    pub entry: Vec<RawEntry>,
}

#[derive(Deserialize, Debug)]
pub struct RawEntry {
    pub sys: RawSys,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub metadata: Option<RawMetadata>,
}

#[derive(Deserialize, Debug)]
pub struct RawSys {
    pub id: String,
    #[serde(rename = "type")]
    pub typ: Option<String>,
    #[serde(rename = "archivedAt")]
    pub archived_at: Option<String>,
    #[serde(rename = "contentType")]
    pub content_type: Option<RawLink>,
}

#[derive(Deserialize, Debug)]
pub struct RawLink {
    pub sys: RawLinkSys,
}

#[derive(Deserialize, Debug)]
pub struct RawLinkSys {
    pub id: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct RawMetadata {
    #[serde(default)]
    pub tags: Vec<Value>,
}

impl RawEntry {
    pub fn is_entry(&self) -> bool {
        self.sys.typ.as_deref().map_or(true, |t| t == "Entry")
    }
}

impl From<RawEntry> for Entry {
    fn from(raw: RawEntry) -> Self {
        Entry {
            id: raw.sys.id,
            content_type: raw.sys.content_type.map(|link| link.sys.id),
            archived_at: raw.sys.archived_at,
            tags: raw.metadata.map(|m| m.tags).unwrap_or_default(),
            fields: raw.fields,
        }
    }
}
