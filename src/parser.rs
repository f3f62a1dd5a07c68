use crate::ast::Node;
use crate::error::CrawlError;
use crate::normalize::{extract_codes_from_text, normalize};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// The prereq/coreq halves of a single course's requisite text, plus the raw source.
#[derive(Debug, Clone, Default)]
pub struct RequisiteBundle {
    pub prereq: Option<Node>,
    pub coreq: Option<Node>,
    pub raw: String,
}

fn coreq_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)co-?requisite\s*:\s*").unwrap())
}

fn clause_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.;]\s+").unwrap())
}

/// Parses a raw prerequisite string into a [`RequisiteBundle`]. See the clause-level
/// dispatch strategies in [`parse_clause`] for how each sentence is interpreted. Every
/// `COURSE` reference to a level-7 code is stripped before the bundle is returned, so no
/// AST that leaves this function can violate the level-7 exclusion invariant.
pub fn parse_requisite(raw: &str) -> RequisiteBundle {
    let normalized = normalize(raw);
    let (prereq_part, coreq_part) = split_coreq(&normalized);

    RequisiteBundle {
        prereq: parse_part(&prereq_part).and_then(Node::exclude_level_7),
        coreq: coreq_part
            .as_deref()
            .and_then(parse_part)
            .and_then(Node::exclude_level_7),
        raw: raw.to_string(),
    }
}

/// Parses incompatibility text into a `NONE_OF` node, or `None` if no course codes are
/// present (or only level-7 codes are present).
pub fn parse_incompatibility(raw: &str) -> Option<Node> {
    let normalized = normalize(raw);
    let codes = extract_codes_from_text(&normalized);
    if codes.is_empty() {
        None
    } else {
        Node::none_of(codes.into_iter().map(Node::course).collect()).exclude_level_7()
    }
}

fn split_coreq(normalized: &str) -> (String, Option<String>) {
    if let Some(m) = coreq_split_re().find(normalized) {
        let prereq = normalized[..m.start()].trim().to_string();
        let coreq = normalized[m.end()..].trim().to_string();
        (prereq, if coreq.is_empty() { None } else { Some(coreq) })
    } else {
        (normalized.to_string(), None)
    }
}

fn parse_part(part: &str) -> Option<Node> {
    let clauses: Vec<Node> = clause_split_re()
        .split(part.trim())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .filter_map(parse_clause)
        .collect();

    match clauses.len() {
        0 => None,
        1 => clauses.into_iter().next(),
        _ => Some(Node::and(clauses)),
    }
}

/// Dispatches a single clause through the ordered strategies. Order is load-bearing:
/// boolean-over-courses must be tried before units-from, since units-from clauses often
/// contain both codes and `and`.
fn parse_clause(clause: &str) -> Option<Node> {
    parse_boolean_over_courses(clause)
        .or_else(|| parse_units_from(clause))
        .or_else(|| parse_credits_at_level(clause))
        .or_else(|| parse_enrolled(clause))
        .or_else(|| parse_permission(clause))
        .or_else(|| parse_textual_cue(clause))
        .or_else(|| parse_codes_only(clause))
        .or_else(|| {
            let err = CrawlError::UnparsedClause { clause: clause.to_string() };
            debug!("{err}");
            Some(Node::Text { text: clause.to_string() })
        })
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Code(String),
    And,
    Or,
    LParen,
    RParen,
}

fn tokenize_boolean(clause: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    for word in clause.split_whitespace() {
        let leading = word.chars().take_while(|c| *c == '(').count();
        let trailing = word.chars().rev().take_while(|c| *c == ')').count();
        let core = &word[leading..word.len() - trailing];
        let trimmed = core.trim_matches(|c: char| !c.is_alphanumeric());

        tokens.extend(std::iter::repeat(Token::LParen).take(leading));
        match trimmed {
            "and" | "AND" => tokens.push(Token::And),
            "or" | "OR" => tokens.push(Token::Or),
            _ if crate::util::is_course_code(trimmed) => tokens.push(Token::Code(trimmed.to_string())),
            _ => {}
        }
        tokens.extend(std::iter::repeat(Token::RParen).take(trailing));
    }
    tokens
}

/// Shunting-yard parse of `tokens` into a boolean AST over course codes, with `OR=1 <
/// AND=2` precedence, left-associative. Returns `None` on any malformed sequence
/// (consecutive operators, empty parens, unbalanced parens).
fn parse_boolean_over_courses(clause: &str) -> Option<Node> {
    let tokens = tokenize_boolean(clause);
    let has_code = tokens.iter().any(|t| matches!(t, Token::Code(_)));
    let has_op = tokens.iter().any(|t| matches!(t, Token::And | Token::Or));
    if !has_code || !has_op {
        return None;
    }

    let mut output: Vec<Node> = Vec::new();
    let mut ops: Vec<Token> = Vec::new();
    let mut expect_operand = true;

    fn precedence(t: &Token) -> u8 {
        match t {
            Token::Or => 1,
            Token::And => 2,
            _ => 0,
        }
    }

    fn apply(ops: &mut Vec<Token>, output: &mut Vec<Node>) -> Option<()> {
        let op = ops.pop()?;
        let rhs = output.pop()?;
        let lhs = output.pop()?;
        let combined = match op {
            Token::And => Node::and(vec![lhs, rhs]),
            Token::Or => Node::or(vec![lhs, rhs]),
            _ => return None,
        };
        output.push(combined);
        Some(())
    }

    for tok in tokens {
        match tok {
            Token::Code(_) => {
                if !expect_operand {
                    return None;
                }
                output.push(Node::course(if let Token::Code(c) = tok { c } else { unreachable!() }));
                expect_operand = false;
            }
            Token::And | Token::Or => {
                if expect_operand {
                    return None;
                }
                while let Some(top) = ops.last() {
                    if matches!(top, Token::And | Token::Or) && precedence(top) >= precedence(&tok) {
                        apply(&mut ops, &mut output)?;
                    } else {
                        break;
                    }
                }
                ops.push(tok);
                expect_operand = true;
            }
            Token::LParen => {
                if !expect_operand {
                    return None;
                }
                ops.push(Token::LParen);
            }
            Token::RParen => {
                let mut found = false;
                while let Some(top) = ops.last() {
                    if matches!(top, Token::LParen) {
                        ops.pop();
                        found = true;
                        break;
                    }
                    apply(&mut ops, &mut output)?;
                }
                if !found {
                    return None;
                }
                if expect_operand {
                    // empty parens: "( )"
                    return None;
                }
            }
        }
    }

    if expect_operand {
        return None;
    }
    while !ops.is_empty() {
        if matches!(ops.last(), Some(Token::LParen)) {
            return None;
        }
        apply(&mut ops, &mut output)?;
    }

    if output.len() == 1 {
        output.pop()
    } else {
        None
    }
}

fn units_from_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*units?\s+from\s+(.+)").unwrap())
}

fn parse_units_from(clause: &str) -> Option<Node> {
    let caps = units_from_re().captures(clause)?;
    let n: u32 = caps[1].parse().ok()?;
    let mut courses = extract_codes_from_text(&caps[2]);
    courses.sort();
    courses.dedup();
    if courses.is_empty() {
        return None;
    }
    Some(Node::UnitsFrom { min_units: n, courses })
}

fn credits_at_level_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)at\s+least\s+(\d+)\s*units?.*?level\s+(\d+)").unwrap()
    })
}

fn parse_credits_at_level(clause: &str) -> Option<Node> {
    let caps = credits_at_level_re().captures(clause)?;
    Some(Node::CreditsAtLevel {
        min_units: caps[1].parse().ok()?,
        level: caps[2].parse().ok()?,
    })
}

fn enrolled_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)enrol(?:l)?(?:ment|ed)?\s+in\s+(.+)").unwrap())
}

fn parse_enrolled(clause: &str) -> Option<Node> {
    let caps = enrolled_re().captures(clause)?;
    let program = caps[1].trim().trim_end_matches('.').to_string();
    if program.is_empty() {
        None
    } else {
        Some(Node::Enrolled { program })
    }
}

fn permission_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)permission\s+of\s+(?:the\s+)?(course\s+coordinator|head\s+of\s+school)").unwrap())
}

fn parse_permission(clause: &str) -> Option<Node> {
    let caps = permission_re().captures(clause)?;
    let who = if caps[1].to_lowercase().contains("coordinator") {
        "course coordinator"
    } else {
        "head of school"
    };
    Some(Node::Permission { who: who.to_string() })
}

fn parse_textual_cue(clause: &str) -> Option<Node> {
    let lower = clause.to_lowercase();
    let codes: Vec<Node> = extract_codes_from_text(clause).into_iter().map(Node::course).collect();
    if codes.is_empty() {
        return None;
    }
    if lower.contains("one of") || lower.contains("any of") || lower.contains("either") {
        Some(Node::n_of(1, codes))
    } else if lower.contains("both of") {
        Some(Node::n_of(2, codes))
    } else if lower.contains(" or ") {
        Some(Node::or(codes))
    } else if lower.contains(" and ") {
        Some(Node::and(codes))
    } else {
        None
    }
}

fn parse_codes_only(clause: &str) -> Option<Node> {
    let codes: Vec<Node> = extract_codes_from_text(clause).into_iter().map(Node::course).collect();
    if codes.is_empty() {
        None
    } else {
        Some(Node::and(codes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_simple_conjunction() {
        let bundle = parse_requisite("Prerequisite: CSSE1001 and MATH1051");
        assert_eq!(
            bundle.prereq,
            Some(Node::and(vec![Node::course("CSSE1001"), Node::course("MATH1051")]))
        );
    }

    #[test]
    fn scenario_comma_or_precedence() {
        let bundle = parse_requisite("CSSE1001 or CSSE1000, MATH1051");
        let expected = Node::and(vec![
            Node::n_of(1, vec![Node::course("CSSE1001"), Node::course("CSSE1000")]),
            Node::course("MATH1051"),
        ]);
        assert_eq!(bundle.prereq, Some(expected));
    }

    #[test]
    fn scenario_units_from() {
        let bundle = parse_requisite("2 units from MATH1051, MATH1052, STAT1301");
        assert_eq!(
            bundle.prereq,
            Some(Node::UnitsFrom {
                min_units: 2,
                courses: vec!["MATH1051".into(), "MATH1052".into(), "STAT1301".into()],
            })
        );
    }

    #[test]
    fn scenario_coreq_split() {
        let bundle = parse_requisite("Prerequisite: CSSE2002. Co-requisite: MATH2000");
        assert_eq!(bundle.prereq, Some(Node::course("CSSE2002")));
        assert_eq!(bundle.coreq, Some(Node::course("MATH2000")));
    }

    #[test]
    fn scenario_incompatibility_pair() {
        let node = parse_incompatibility("CSSE2002, CSSE1001").unwrap();
        assert_eq!(
            node,
            Node::none_of(vec![Node::course("CSSE2002"), Node::course("CSSE1001")])
        );
    }

    #[test]
    fn incompatibility_strips_level_7_codes() {
        let node = parse_incompatibility("CSSE7030, CSSE1001").unwrap();
        assert_eq!(node, Node::none_of(vec![Node::course("CSSE1001")]));
    }

    #[test]
    fn requisite_strips_level_7_codes() {
        let bundle = parse_requisite("Prerequisite: CSSE1001 and CSSE7030");
        assert_eq!(bundle.prereq, Some(Node::course("CSSE1001")));
    }

    #[test]
    fn malformed_boolean_falls_through_to_text() {
        let bundle = parse_requisite("and and CSSE1001");
        // consecutive operators reject the boolean strategy; codes-only strategy wins.
        assert_eq!(bundle.prereq, Some(Node::course("CSSE1001")));
    }

    #[test]
    fn unparseable_prose_becomes_text() {
        let bundle = parse_requisite("Departmental approval required.");
        assert!(matches!(bundle.prereq, Some(Node::Text { .. })));
    }
}
