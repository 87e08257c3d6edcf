use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

pub const UNTITLED: &str = "Untitled";

/// One content item as delivered by the source, frozen for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub content_type: Option<String>,
    pub archived_at: Option<String>,
    #[serde(default)]
    pub tags: Vec<Value>,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Entry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content_type: None,
            archived_at: None,
            tags: Vec::new(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn with_title(self, title: &str) -> Self {
        self.with_field("title", Value::String(title.to_string()))
    }

    /// Point `field` at another entry using the source's link shape.
    pub fn with_link(self, field: &str, target_id: &str) -> Self {
        self.with_field(
            field,
            serde_json::json!({ "sys": { "type": "Link", "linkType": "Entry", "id": target_id } }),
        )
    }

    pub fn with_tag(mut self, tag: Value) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn with_archived_at(mut self, at: &str) -> Self {
        self.archived_at = Some(at.to_string());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Non-blank string field.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn title(&self) -> &str {
        self.str_field("title").unwrap_or(UNTITLED)
    }

    pub fn slug(&self) -> Option<&str> {
        self.str_field("slug")
    }

    /// Id of the entry referenced by the link stored in `field`, if any.
    pub fn link_id(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)?
            .get("sys")?
            .get("id")?
            .as_str()
            .filter(|id| !id.is_empty())
    }

    pub fn has_downstream_id(&self) -> bool {
        self.fields
            .get("magentoId")
            .map(|v| !v.is_null())
            .unwrap_or(false)
    }
}

/// Side-loaded entries keyed by id, accumulated across all fetched pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct References {
    by_id: HashMap<String, Entry>,
}

impl References {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: Entry) {
        self.by_id.insert(entry.id.clone(), entry);
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Extend<Entry> for References {
    fn extend<I: IntoIterator<Item = Entry>>(&mut self, iter: I) {
        for entry in iter {
            self.insert(entry);
        }
    }
}

impl FromIterator<Entry> for References {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        let mut refs = References::new();
        refs.extend(iter);
        refs
    }
}

/// What the downstream did with a page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Created,
    Updated,
    Recreated,
    Unknown,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Created => "created",
            Action::Updated => "updated",
            Action::Recreated => "recreated",
            Action::Unknown => "unknown",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "created" => Action::Created,
            "updated" => Action::Updated,
            "recreated" => Action::Recreated,
            _ => Action::Unknown,
        }
    }
}

/// Final outcome of submitting one entry (after any retries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub entry_id: String,
    pub title: String,
    pub path: String,
    pub success: bool,
    pub action: Action,
    pub message: Option<String>,
    pub identifier: Option<String>,
    pub error: Option<String>,
    pub http_status: Option<u16>,
    pub retry_exhausted: bool,
    pub attempts: u32,
}

impl SubmissionResult {
    pub(crate) fn pending(entry: &Entry, path: &str) -> Self {
        Self {
            entry_id: entry.id.clone(),
            title: entry.title().to_string(),
            path: path.to_string(),
            success: false,
            action: Action::Unknown,
            message: None,
            identifier: None,
            error: None,
            http_status: None,
            retry_exhausted: false,
            attempts: 0,
        }
    }

    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or("Unknown error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn title_defaults_when_missing_or_blank() {
        assert_eq!(Entry::new("a").title(), UNTITLED);
        assert_eq!(Entry::new("a").with_title("  ").title(), UNTITLED);
        assert_eq!(Entry::new("a").with_title("Roses").title(), "Roses");
    }

    #[test]
    fn link_id_reads_sys_id() {
        let entry = Entry::new("faq-1").with_link("faqCategory", "cat-9");
        assert_eq!(entry.link_id("faqCategory"), Some("cat-9"));
        assert_eq!(entry.link_id("parent"), None);

        let broken = Entry::new("faq-2").with_field("faqCategory", json!({ "sys": {} }));
        assert_eq!(broken.link_id("faqCategory"), None);
    }

    #[test]
    fn action_labels_are_case_insensitive() {
        assert_eq!(Action::from_label("Created"), Action::Created);
        assert_eq!(Action::from_label("recreated"), Action::Recreated);
        assert_eq!(Action::from_label("processed"), Action::Unknown);
        assert_eq!(Action::Updated.as_str(), "updated");
    }

    #[test]
    fn downstream_id_hint() {
        assert!(!Entry::new("a").has_downstream_id());
        assert!(Entry::new("a")
            .with_field("magentoId", json!(42))
            .has_downstream_id());
    }
}
