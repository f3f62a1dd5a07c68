use crate::util::is_course_code;
use regex::Regex;
use std::sync::OnceLock;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Collapses any run of whitespace to a single space and trims the ends.
pub fn collapse_whitespace(s: &str) -> String {
    whitespace_re().replace_all(s, " ").trim().to_string()
}

fn code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z]{4}\d{4}[A-Z]?\b").unwrap())
}

/// Every course-code-shaped substring of `text`, in order of appearance, validated
/// against [`is_course_code`].
pub fn extract_codes_from_text(text: &str) -> Vec<String> {
    code_re()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|c| is_course_code(c))
        .collect()
}

fn prereq_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*prerequisites?\s*:\s*").unwrap())
}

fn coreq_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)co-?requisites?\s*:").unwrap())
}

fn and_or_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\band\s*/\s*or\b|\band/or\b").unwrap())
}

fn comma_or_re() -> &'static Regex {
    // `X or Y, Z` -> `(X or Y) and Z`  /  `X or Y and ...` -> `(X or Y) and ...`
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b([A-Z]{4}\d{4}[A-Z]?(?:\s+or\s+[A-Z]{4}\d{4}[A-Z]?)+)\s*(,|\band\b)",
        )
        .unwrap()
    })
}

/// Canonicalizes prerequisite/co-requisite prose per the normalizer rules:
/// whitespace collapse, label stripping, bracket/operator regularization, and the
/// comma/or precedence rewrite. Idempotent: re-normalizing already-normalized text
/// returns the same string.
pub fn normalize(raw: &str) -> String {
    let mut s = collapse_whitespace(raw);

    s = prereq_label_re().replace(&s, "").trim().to_string();
    s = coreq_label_re().replace_all(&s, "Co-requisite:").to_string();

    s = s.replace('[', "(").replace(']', ")");
    s = and_or_re().replace_all(&s, "or").to_string();
    s = s.replace('+', " and ").replace('&', " and ");
    s = collapse_whitespace(&s);

    // `X or Y, Z` / `X or Y and Z` -> `(X or Y) and Z`. Must run before bracket
    // spacing below: the regex relies on an un-padded `)` blocking a match against
    // text that is already parenthesized, which only holds on un-padded parens.
    s = comma_or_re()
        .replace_all(&s, |caps: &regex::Captures| format!("({}) and", &caps[1]))
        .to_string();

    // Comma/bracket spacing runs last, after every transformation that can introduce
    // one, so normalizing an already-normalized string reproduces the same spacing
    // (idempotent: padding an already-padded separator and collapsing the resulting
    // double space is a no-op).
    s = s.replace('(', " ( ").replace(')', " ) ").replace(',', " , ");
    collapse_whitespace(&s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace() {
        assert_eq!(collapse_whitespace("  a   b\n\tc  "), "a b c");
    }

    #[test]
    fn strips_prereq_label() {
        assert_eq!(normalize("Prerequisite: CSSE1001"), "CSSE1001");
    }

    #[test]
    fn is_idempotent() {
        let samples = [
            "Prerequisite: CSSE1001 and MATH1051",
            "CSSE1001 or CSSE1000, MATH1051",
            "CSSE2002. Co-requisite: MATH2000",
            "MATH1051 and/or STAT1301",
        ];
        for s in samples {
            let once = normalize(s);
            let twice = normalize(&once);
            assert_eq!(once, twice, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn rewrites_comma_or_precedence() {
        let out = normalize("CSSE1001 or CSSE1000, MATH1051");
        assert_eq!(out, "( CSSE1001 or CSSE1000 ) and MATH1051");
    }

    #[test]
    fn pads_commas() {
        assert_eq!(normalize("MATH1051,MATH1052"), "MATH1051 , MATH1052");
    }

    #[test]
    fn extracts_codes() {
        let codes = extract_codes_from_text("See CSSE1001 and math1051 or MATH1051A.");
        assert_eq!(codes, vec!["CSSE1001".to_string(), "MATH1051A".to_string()]);
    }
}
