//! Entry-kind descriptors.
//!
//! A descriptor captures everything that differs between content types: the
//! source query shape, which filters apply, how relationships are resolved and
//! which downstream endpoint receives the entry.
use serde::{Deserialize, Serialize};

use crate::model::Entry;

/// Selects between the short and the long submission timeout.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    #[default]
    Simple,
    Complex,
}

/// Link field used to derive a routing key from a related entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relationship {
    pub field: String,
    /// Literal prefix of the related entry's `frontendUrl`, e.g. `/garden-guide/`.
    #[serde(default)]
    pub url_prefix: Option<String>,
    /// Literal suffix of the related entry's `frontendUrl`, e.g. `/faqs`.
    #[serde(default)]
    pub url_suffix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryKind {
    pub name: String,
    pub content_type: String,
    /// Link depth requested from the source (`include` parameter).
    #[serde(default)]
    pub include: u8,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub select: Option<String>,
    /// Only entries with a truthy `renderPage` field are synced.
    #[serde(default)]
    pub render_flag: bool,
    #[serde(default)]
    pub relationship: Option<Relationship>,
    /// Link field pointing at a parent of the same kind; used for log context only.
    #[serde(default)]
    pub parent_field: Option<String>,
    /// Endpoint template with an `{id}` placeholder.
    pub legacy_path: String,
    /// Endpoint template with `{key}` and `{slug}` placeholders.
    #[serde(default)]
    pub structured_path: Option<String>,
    #[serde(default)]
    pub complexity: Complexity,
}

/// Position of an entry within a parent/child hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hierarchy {
    pub parent_id: Option<String>,
}

impl Hierarchy {
    pub fn level(&self) -> &'static str {
        if self.parent_id.is_some() {
            "subcategory"
        } else {
            "top-level"
        }
    }
}

impl EntryKind {
    pub fn article() -> Self {
        Self {
            name: "article".into(),
            content_type: "article".into(),
            include: 0,
            order: None,
            select: Some("sys,metadata,fields.title,fields.slug,fields.magentoId".into()),
            render_flag: false,
            relationship: None,
            parent_field: None,
            legacy_path: "render-and-submit/{id}".into(),
            structured_path: None,
            complexity: Complexity::Simple,
        }
    }

    pub fn recipe() -> Self {
        Self {
            name: "recipe".into(),
            content_type: "recipe".into(),
            include: 2,
            order: None,
            select: None,
            render_flag: false,
            relationship: None,
            parent_field: None,
            legacy_path: "render-and-submit-recipe/{id}".into(),
            structured_path: None,
            complexity: Complexity::Simple,
        }
    }

    pub fn category() -> Self {
        Self {
            name: "category".into(),
            content_type: "category".into(),
            include: 1,
            order: Some("fields.title".into()),
            select: None,
            render_flag: true,
            relationship: None,
            parent_field: Some("parent".into()),
            legacy_path: "render-and-submit-category/{id}".into(),
            structured_path: None,
            complexity: Complexity::Complex,
        }
    }

    pub fn faq() -> Self {
        Self {
            name: "faq".into(),
            content_type: "faq".into(),
            include: 2,
            order: None,
            select: None,
            render_flag: false,
            relationship: Some(Relationship {
                field: "faqCategory".into(),
                url_prefix: Some("/garden-guide/".into()),
                url_suffix: Some("/faqs".into()),
            }),
            parent_field: None,
            legacy_path: "render-and-submit-faq/{id}".into(),
            structured_path: Some("render-and-submit-garden-guide/{key}/faqs/{slug}".into()),
            complexity: Complexity::Complex,
        }
    }

    /// Downstream path for `entry`. The structured form is used only when a
    /// routing key was resolved and the kind defines one.
    pub fn target_path(&self, entry: &Entry, routing_key: Option<&str>) -> String {
        match (routing_key, self.structured_path.as_deref()) {
            (Some(key), Some(template)) => {
                let slug = entry
                    .slug()
                    .map(str::to_string)
                    .unwrap_or_else(|| entry.id.to_lowercase());
                template.replace("{key}", key).replace("{slug}", &slug)
            }
            _ => self.legacy_path.replace("{id}", &entry.id),
        }
    }

    pub fn hierarchy(&self, entry: &Entry) -> Option<Hierarchy> {
        let field = self.parent_field.as_deref()?;
        Some(Hierarchy {
            parent_id: entry.link_id(field).map(str::to_string),
        })
    }

    /// Problems with a descriptor, as human-readable messages.
    pub fn problems(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.name.trim().is_empty() {
            out.push("kind name must be non-empty".to_string());
        }
        if self.content_type.trim().is_empty() {
            out.push(format!("kind '{}': content_type must be non-empty", self.name));
        }
        if !self.legacy_path.contains("{id}") {
            out.push(format!("kind '{}': legacy_path must contain {{id}}", self.name));
        }
        if let Some(template) = &self.structured_path {
            if !template.contains("{key}") {
                out.push(format!("kind '{}': structured_path must contain {{key}}", self.name));
            }
            if self.relationship.is_none() {
                out.push(format!(
                    "kind '{}': structured_path requires a relationship",
                    self.name
                ));
            }
        }
        out
    }
}

pub fn builtin_kinds() -> Vec<EntryKind> {
    vec![
        EntryKind::article(),
        EntryKind::recipe(),
        EntryKind::category(),
        EntryKind::faq(),
    ]
}

pub fn find_kind<'a>(kinds: &'a [EntryKind], name: &str) -> Option<&'a EntryKind> {
    kinds.iter().find(|k| k.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_path_without_key() {
        let entry = Entry::new("4xYz");
        assert_eq!(EntryKind::faq().target_path(&entry, None), "render-and-submit-faq/4xYz");
        assert_eq!(EntryKind::article().target_path(&entry, None), "render-and-submit/4xYz");
    }

    #[test]
    fn structured_path_uses_slug_or_lowercased_id() {
        let kind = EntryKind::faq();
        let with_slug = Entry::new("4xYz").with_field("slug", json!("when-to-prune"));
        assert_eq!(
            kind.target_path(&with_slug, Some("roses")),
            "render-and-submit-garden-guide/roses/faqs/when-to-prune"
        );
        let without_slug = Entry::new("4xYz");
        assert_eq!(
            kind.target_path(&without_slug, Some("roses")),
            "render-and-submit-garden-guide/roses/faqs/4xyz"
        );
    }

    #[test]
    fn key_ignored_for_kinds_without_structured_path() {
        let entry = Entry::new("cat-1");
        assert_eq!(
            EntryKind::category().target_path(&entry, Some("ignored")),
            "render-and-submit-category/cat-1"
        );
    }

    #[test]
    fn hierarchy_levels() {
        let kind = EntryKind::category();
        let top = kind.hierarchy(&Entry::new("c1")).unwrap();
        assert_eq!(top.level(), "top-level");
        let sub = kind.hierarchy(&Entry::new("c2").with_link("parent", "c1")).unwrap();
        assert_eq!(sub.parent_id.as_deref(), Some("c1"));
        assert_eq!(sub.level(), "subcategory");
        assert!(EntryKind::faq().hierarchy(&Entry::new("f")).is_none());
    }

    #[test]
    fn builtins_are_valid_and_findable() {
        let kinds = builtin_kinds();
        assert!(kinds.iter().all(|k| k.problems().is_empty()));
        assert_eq!(find_kind(&kinds, "FAQ").map(|k| k.content_type.as_str()), Some("faq"));
        assert!(find_kind(&kinds, "product").is_none());
    }

    #[test]
    fn problems_flag_broken_templates() {
        let mut kind = EntryKind::faq();
        kind.legacy_path = "render-and-submit-faq".into();
        kind.relationship = None;
        let problems = kind.problems();
        assert_eq!(problems.len(), 2);
    }
}
