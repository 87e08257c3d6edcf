//! Routing-key resolution through side-loaded related entries.
use crate::kind::Relationship;
use crate::model::{Entry, References};

/// Derive the routing key for `entry` from the entry its relationship links to.
///
/// Returns `None` whenever the link or the linked entry is missing; callers
/// then fall back to the legacy identifier path.
pub fn resolve_routing_key(
    entry: &Entry,
    relationship: &Relationship,
    references: &References,
) -> Option<String> {
    let linked_id = entry.link_id(&relationship.field)?;
    let linked = references.get(linked_id)?;

    if let Some(slug) = linked.slug() {
        return Some(slug.to_string());
    }

    if let Some(slug) = linked
        .str_field("frontendUrl")
        .and_then(|url| slug_from_url(url, relationship))
    {
        return Some(slug);
    }

    linked
        .str_field("title")
        .map(slugify)
        .filter(|s| !s.is_empty())
}

fn slug_from_url(url: &str, relationship: &Relationship) -> Option<String> {
    let prefix = relationship.url_prefix.as_deref()?;
    let suffix = relationship.url_suffix.as_deref().unwrap_or("");
    let middle = url.strip_prefix(prefix)?.strip_suffix(suffix)?;
    middle
        .split('/')
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Lower-case and replace spaces and slashes with hyphens.
pub fn slugify(title: &str) -> String {
    title.to_lowercase().replace([' ', '/'], "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::EntryKind;
    use serde_json::json;

    fn faq_relationship() -> Relationship {
        EntryKind::faq().relationship.unwrap()
    }

    fn faq() -> Entry {
        Entry::new("faq-1").with_link("faqCategory", "cat-1")
    }

    #[test]
    fn no_link_field_yields_none() {
        let refs = References::new();
        assert_eq!(resolve_routing_key(&Entry::new("faq"), &faq_relationship(), &refs), None);
    }

    #[test]
    fn missing_reference_yields_none() {
        let refs: References = vec![Entry::new("cat-2").with_field("slug", json!("roses"))]
            .into_iter()
            .collect();
        assert_eq!(resolve_routing_key(&faq(), &faq_relationship(), &refs), None);
    }

    #[test]
    fn explicit_slug_preferred() {
        let refs: References = vec![Entry::new("cat-1")
            .with_field("slug", json!("roses"))
            .with_field("frontendUrl", json!("/garden-guide/other/faqs"))
            .with_title("Something Else")]
        .into_iter()
        .collect();
        assert_eq!(
            resolve_routing_key(&faq(), &faq_relationship(), &refs).as_deref(),
            Some("roses")
        );
    }

    #[test]
    fn frontend_url_pattern() {
        let refs: References = vec![Entry::new("cat-1")
            .with_field("frontendUrl", json!("/garden-guide/fruit-trees/faqs"))
            .with_title("Fruit Trees")]
        .into_iter()
        .collect();
        assert_eq!(
            resolve_routing_key(&faq(), &faq_relationship(), &refs).as_deref(),
            Some("fruit-trees")
        );
    }

    #[test]
    fn unmatched_url_falls_through_to_title() {
        let refs: References = vec![Entry::new("cat-1")
            .with_field("frontendUrl", json!("/blog/fruit-trees"))
            .with_title("Lawn / Turf Care")]
        .into_iter()
        .collect();
        assert_eq!(
            resolve_routing_key(&faq(), &faq_relationship(), &refs).as_deref(),
            Some("lawn---turf-care")
        );
    }

    #[test]
    fn nothing_usable_yields_none() {
        let refs: References = vec![Entry::new("cat-1")].into_iter().collect();
        assert_eq!(resolve_routing_key(&faq(), &faq_relationship(), &refs), None);
    }

    #[test]
    fn resolution_is_deterministic() {
        let refs: References = vec![Entry::new("cat-1").with_title("Herbs")]
            .into_iter()
            .collect();
        let first = resolve_routing_key(&faq(), &faq_relationship(), &refs);
        let second = resolve_routing_key(&faq(), &faq_relationship(), &refs);
        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some("herbs"));
    }
}
