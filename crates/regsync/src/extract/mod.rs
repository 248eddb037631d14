//! Marked-fragment extraction from rendered course pages.
//!
//! Course "about" pages carry a marker attribute on the elements whose text
//! belongs to the course record. Extraction produces a flat mapping from
//! marker value to the ordered, whitespace-trimmed text fragments found
//! inside each marked element, nested tags included. Everything unmarked is
//! ignored; malformed markup is handled best-effort by the HTML5 parser.

pub mod teachers;

pub use teachers::{extract_teacher_blocks, RawTeacher};

use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Attribute marking an element for extraction; its value names the field.
pub const MARKER_ATTR: &str = "data-scos";

static MARKED_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-scos]").unwrap());

/// Extracts all marked fragments from an HTML document.
///
/// A marker appearing on several elements appends fragments in document
/// order. A marked element nested inside another marked element does not
/// open its own capture: its text belongs to the outer marker.
pub fn extract_marked_fragments(html: &str) -> HashMap<String, Vec<String>> {
    let document = Html::parse_document(html);
    let mut data: HashMap<String, Vec<String>> = HashMap::new();

    for element in document.select(&MARKED_SELECTOR) {
        if has_marked_ancestor(&element) {
            continue;
        }
        let Some(marker) = element.value().attr(MARKER_ATTR) else {
            continue;
        };
        let fragments = data.entry(marker.to_string()).or_default();
        for text in element.text() {
            let text = text.trim();
            if !text.is_empty() {
                fragments.push(text.to_string());
            }
        }
    }

    data
}

fn has_marked_ancestor(element: &ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().attr(MARKER_ATTR).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_marked_element() {
        let data = extract_marked_fragments(r#"<div data-scos="title">Intro to X</div>"#);
        assert_eq!(data.get("title"), Some(&vec!["Intro to X".to_string()]));
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_nested_tags_contribute_fragments() {
        let html = r#"
            <div data-scos="description">
                <p>First paragraph.</p>
                <p>Second <b>bold</b> paragraph.</p>
            </div>
        "#;
        let data = extract_marked_fragments(html);
        assert_eq!(
            data.get("description"),
            Some(&vec![
                "First paragraph.".to_string(),
                "Second".to_string(),
                "bold".to_string(),
                "paragraph.".to_string(),
            ])
        );
    }

    #[test]
    fn test_repeated_marker_appends_in_order() {
        let html = r#"
            <li data-scos="requirements">Basic algebra</li>
            <li data-scos="requirements">English reading</li>
        "#;
        let data = extract_marked_fragments(html);
        assert_eq!(
            data.get("requirements"),
            Some(&vec![
                "Basic algebra".to_string(),
                "English reading".to_string()
            ])
        );
    }

    #[test]
    fn test_nested_marker_belongs_to_outer() {
        let html = r#"
            <div data-scos="content">
                Outer text
                <span data-scos="title">Inner title</span>
            </div>
        "#;
        let data = extract_marked_fragments(html);
        assert_eq!(
            data.get("content"),
            Some(&vec!["Outer text".to_string(), "Inner title".to_string()])
        );
        assert!(!data.contains_key("title"));
    }

    #[test]
    fn test_unmarked_and_whitespace_ignored() {
        let html = r#"
            <div>Plain content</div>
            <div data-scos="competences">   </div>
        "#;
        let data = extract_marked_fragments(html);
        assert!(data.get("competences").map_or(true, Vec::is_empty));
        assert_eq!(data.values().flatten().count(), 0);
    }

    #[test]
    fn test_unclosed_tag_is_best_effort() {
        // The HTML5 parser recovers from a missing close tag; trailing
        // content stays inside the marked element rather than aborting.
        let html = r#"<div data-scos="results"><p>Able to solve equations"#;
        let data = extract_marked_fragments(html);
        assert_eq!(
            data.get("results"),
            Some(&vec!["Able to solve equations".to_string()])
        );
    }
}
