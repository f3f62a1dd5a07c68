use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// The fields extracted from a single course page, whitespace-normalized.
#[derive(Debug, Clone, Default)]
pub struct CoursePage {
    pub code: String,
    pub url: String,
    pub title: String,
    pub prereq_raw: String,
    pub incompat_raw: String,
    pub units_raw: String,
    pub summary: String,
}

fn selector(cell: &OnceLock<Selector>, css: &str) -> &Selector {
    cell.get_or_init(|| Selector::parse(css).expect("static selector is valid"))
}

fn text_of(doc: &Html, css: &str) -> Option<String> {
    let sel = Selector::parse(css).ok()?;
    doc.select(&sel).next().map(collapsed_text)
}

fn collapsed_text(el: ElementRef) -> String {
    crate::normalize::collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

const PREREQ_IDS: &[&str] = &[
    "course-prerequisite",
    "course-prerequisites",
    "course-prequisite",
    "course-recommended-prerequisite",
    "course-recommended-prerequisites",
    "course-recommended-prequisite",
];

const INCOMPAT_IDS: &[&str] = &["course-incompatible", "course-incompatable"];

fn first_matching_id(doc: &Html, ids: &[&str]) -> Option<String> {
    for tag in ["div", "p", "section"] {
        for id in ids {
            if let Some(text) = text_of(doc, &format!("{tag}#{id}")) {
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}

fn fallback_prereq_by_prefix(doc: &Html) -> Option<String> {
    static ANY: OnceLock<Selector> = OnceLock::new();
    let sel = selector(&ANY, "[id]");
    doc.select(sel)
        .find(|el| {
            el.value()
                .id()
                .map(|id| id.starts_with("course-pre") && id.contains("requisite"))
                .unwrap_or(false)
        })
        .map(collapsed_text)
}

/// Tertiary fallback: a heading whose own text contains "prerequisite", followed by the
/// next sibling element's text. Pages that spell out "Prerequisite" in a heading rather
/// than tagging a dedicated id still yield prereq text this way.
fn fallback_prereq_by_heading(doc: &Html) -> Option<String> {
    static HEADINGS: OnceLock<Selector> = OnceLock::new();
    let sel = selector(&HEADINGS, "h1, h2, h3, h4, h5, h6, dt, strong, b");

    for heading in doc.select(sel) {
        if !collapsed_text(heading).to_lowercase().contains("prerequisite") {
            continue;
        }
        for sibling in heading.next_siblings() {
            if let Some(el) = ElementRef::wrap(sibling) {
                let text = collapsed_text(el);
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}

fn title_text(doc: &Html) -> String {
    text_of(doc, "#course-title")
        .or_else(|| text_of(doc, "h1"))
        .unwrap_or_default()
}

/// Extracts a `CoursePage` from raw HTML. Individual missing fields are left empty
/// rather than treated as a hard error; only a completely unrecognized layout should be
/// surfaced as `CrawlError::ParseEmpty` by the caller.
pub fn parse_course_page(code: &str, url: &str, html: &str) -> CoursePage {
    let doc = Html::parse_document(html);

    let prereq_raw = first_matching_id(&doc, PREREQ_IDS)
        .or_else(|| fallback_prereq_by_prefix(&doc))
        .or_else(|| fallback_prereq_by_heading(&doc))
        .unwrap_or_default();
    let incompat_raw = first_matching_id(&doc, INCOMPAT_IDS).unwrap_or_default();
    let units_raw = text_of(&doc, "#course-units").unwrap_or_default();
    let summary = text_of(&doc, "#course-summary").unwrap_or_default();

    CoursePage {
        code: code.to_string(),
        url: url.to_string(),
        title: title_text(&doc),
        prereq_raw,
        incompat_raw,
        units_raw,
        summary,
    }
}

/// Parses a search-results page, extracting every embedded course code.
pub fn extract_course_codes(html: &str) -> Vec<String> {
    static LINKS: OnceLock<Selector> = OnceLock::new();
    let doc = Html::parse_document(html);
    let sel = selector(&LINKS, "a[href]");

    let mut codes = Vec::new();
    for el in doc.select(sel) {
        if let Some(href) = el.value().attr("href") {
            for candidate in crate::normalize::extract_codes_from_text(href) {
                codes.push(candidate);
            }
        }
        for candidate in crate::normalize::extract_codes_from_text(&collapsed_text(el)) {
            codes.push(candidate);
        }
    }
    codes.sort();
    codes.dedup();
    codes
}

impl CoursePage {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.prereq_raw.is_empty()
            && self.incompat_raw.is_empty()
            && self.summary.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fields_from_simple_page() {
        let html = r#"
            <html><body>
              <h1 id="course-title">Introduction to Software Engineering</h1>
              <div id="course-prerequisite">Prerequisite:   CSSE1001  and MATH1051</div>
              <div id="course-incompatible">CSSE7030</div>
              <p id="course-units">2</p>
              <p id="course-summary">An intro course.</p>
            </body></html>
        "#;
        let page = parse_course_page("CSSE2002", "https://example.test/CSSE2002", html);
        assert_eq!(page.title, "Introduction to Software Engineering");
        assert!(page.prereq_raw.contains("CSSE1001"));
        assert_eq!(page.incompat_raw, "CSSE7030");
        assert_eq!(page.units_raw, "2");
        assert!(!page.is_empty());
    }

    #[test]
    fn falls_back_on_prefixed_id() {
        let html = r#"<html><body><p id="course-pre-other-requisite">MATH1051</p></body></html>"#;
        let page = parse_course_page("MATH1052", "u", html);
        assert_eq!(page.prereq_raw, "MATH1051");
    }

    #[test]
    fn falls_back_on_heading_sibling() {
        let html = r#"<html><body><h3>Prerequisite</h3><p>CSSE1001 and MATH1051</p></body></html>"#;
        let page = parse_course_page("CSSE2002", "u", html);
        assert_eq!(page.prereq_raw, "CSSE1001 and MATH1051");
    }
}
