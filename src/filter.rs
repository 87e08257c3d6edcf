//! Eligibility checks applied to every fetched entry.
use serde_json::Value;

use crate::model::Entry;

const ARCHIVED_TAG: &str = "archived";

/// True when the source marks the entry archived, either via `sys.archivedAt`
/// or an `archived` tag (structured tag link or bare string, case-insensitive).
pub fn is_archived(entry: &Entry) -> bool {
    if entry
        .archived_at
        .as_deref()
        .is_some_and(|at| !at.is_empty())
    {
        return true;
    }
    entry.tags.iter().any(is_archived_tag)
}

fn is_archived_tag(tag: &Value) -> bool {
    match tag {
        Value::Object(_) => tag
            .get("sys")
            .and_then(|sys| sys.get("id"))
            .and_then(Value::as_str)
            == Some(ARCHIVED_TAG),
        Value::String(s) => s.eq_ignore_ascii_case(ARCHIVED_TAG),
        _ => false,
    }
}

/// True when the entry should be rendered: always with `ignore_flag`,
/// otherwise only if `fields.renderPage` is truthy.
pub fn is_renderable(entry: &Entry, ignore_flag: bool) -> bool {
    ignore_flag || entry.field("renderPage").is_some_and(truthy)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Why an entry was left out of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    Archived,
    NotRenderable,
}

/// Combined filter: archived entries are excluded before the render flag is considered.
pub fn check(entry: &Entry, honour_render_flag: bool, ignore_flag: bool) -> Result<(), Skip> {
    if is_archived(entry) {
        return Err(Skip::Archived);
    }
    if honour_render_flag && !is_renderable(entry, ignore_flag) {
        return Err(Skip::NotRenderable);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn archived_at_wins_without_tags() {
        let entry = Entry::new("a").with_archived_at("2024-05-01T10:00:00Z");
        assert!(is_archived(&entry));
    }

    #[test]
    fn archived_structured_tag() {
        let entry = Entry::new("a").with_tag(json!({ "sys": { "id": "archived", "type": "Link" } }));
        assert!(is_archived(&entry));
    }

    #[test]
    fn archived_bare_string_tag_any_case() {
        assert!(is_archived(&Entry::new("a").with_tag(json!("Archived"))));
        assert!(is_archived(&Entry::new("a").with_tag(json!("ARCHIVED"))));
    }

    #[test]
    fn not_archived_otherwise() {
        assert!(!is_archived(&Entry::new("a")));
        let entry = Entry::new("a")
            .with_tag(json!({ "sys": { "id": "featured" } }))
            .with_tag(json!("archive"))
            .with_tag(json!(7));
        assert!(!is_archived(&entry));
        assert!(!is_archived(&Entry::new("a").with_archived_at("")));
    }

    #[test]
    fn render_flag_is_ignored_when_requested() {
        let off = Entry::new("a").with_field("renderPage", json!(false));
        assert!(is_renderable(&off, true));
        assert!(is_renderable(&Entry::new("b"), true));
    }

    #[test]
    fn render_flag_matches_field() {
        assert!(is_renderable(&Entry::new("a").with_field("renderPage", json!(true)), false));
        assert!(!is_renderable(&Entry::new("a").with_field("renderPage", json!(false)), false));
        assert!(!is_renderable(&Entry::new("a"), false));
        assert!(!is_renderable(&Entry::new("a").with_field("renderPage", json!(null)), false));
    }

    #[test]
    fn archived_excluded_even_when_renderable() {
        let entry = Entry::new("a")
            .with_field("renderPage", json!(true))
            .with_tag(json!("archived"));
        assert_eq!(check(&entry, true, true), Err(Skip::Archived));
        assert_eq!(check(&entry, false, false), Err(Skip::Archived));
    }

    #[test]
    fn check_skips_render_flag_for_kinds_without_it() {
        assert_eq!(check(&Entry::new("a"), false, false), Ok(()));
        assert_eq!(check(&Entry::new("a"), true, false), Err(Skip::NotRenderable));
    }
}
