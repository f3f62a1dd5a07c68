use serde::{Deserialize, Serialize};

/// The requisite logical expression tree. Serializes with an internally-tagged `op`
/// discriminator so downstream JSON consumers see the same heterogeneous-map shape the
/// catalog tooling has always used (`{"op": "AND", "args": [...]}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum Node {
    #[serde(rename = "COURSE")]
    Course { code: String },
    #[serde(rename = "AND")]
    And { args: Vec<Node> },
    #[serde(rename = "OR")]
    Or { args: Vec<Node> },
    #[serde(rename = "N_OF")]
    NOf { n: usize, args: Vec<Node> },
    #[serde(rename = "UNITS_FROM")]
    UnitsFrom {
        min_units: u32,
        courses: Vec<String>,
    },
    #[serde(rename = "CREDITS_AT_LEVEL")]
    CreditsAtLevel { min_units: u32, level: u32 },
    #[serde(rename = "ENROLLED")]
    Enrolled { program: String },
    #[serde(rename = "PERMISSION")]
    Permission { who: String },
    #[serde(rename = "NONE_OF")]
    NoneOf { args: Vec<Node> },
    #[serde(rename = "TEXT")]
    Text { text: String },
}

impl Node {
    pub fn course(code: impl Into<String>) -> Node {
        Node::Course { code: code.into() }
    }

    /// Builds an `AND`, flattening nested `AND` children and deduplicating `COURSE`
    /// leaves by code. A single surviving child collapses to that child.
    pub fn and(args: Vec<Node>) -> Node {
        let flat = flatten(args, |n| matches!(n, Node::And { .. }));
        collapse_singleton(Node::And { args: dedup_courses(flat) })
    }

    /// Builds an `OR`, canonically rewritten to `N_OF(1, ...)` per the AST invariant
    /// that `OR` is never represented directly.
    pub fn or(args: Vec<Node>) -> Node {
        let flat = flatten(args, |n| matches!(n, Node::Or { .. } | Node::NOf { n: 1, .. }));
        Node::n_of(1, flat)
    }

    pub fn n_of(n: usize, args: Vec<Node>) -> Node {
        let flat = flatten(args, |node| matches!(node, Node::NOf { n: child_n, .. } if *child_n == n));
        let deduped = dedup_courses(flat);
        if n == 1 {
            collapse_singleton(Node::NOf { n, args: deduped })
        } else {
            Node::NOf { n, args: deduped }
        }
    }

    pub fn none_of(args: Vec<Node>) -> Node {
        Node::NoneOf {
            args: dedup_courses(args),
        }
    }

    /// Recursively collects every `COURSE` code referenced anywhere in the tree,
    /// including the course lists of `UNITS_FROM` nodes.
    pub fn referenced_codes(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_codes(&mut out);
        out.sort();
        out.dedup();
        out
    }

    fn collect_codes(&self, out: &mut Vec<String>) {
        match self {
            Node::Course { code } => out.push(code.clone()),
            Node::And { args } | Node::Or { args } | Node::NoneOf { args } => {
                for a in args {
                    a.collect_codes(out);
                }
            }
            Node::NOf { args, .. } => {
                for a in args {
                    a.collect_codes(out);
                }
            }
            Node::UnitsFrom { courses, .. } => out.extend(courses.iter().cloned()),
            Node::CreditsAtLevel { .. }
            | Node::Enrolled { .. }
            | Node::Permission { .. }
            | Node::Text { .. } => {}
        }
    }

    /// Removes every `COURSE` reference (and `UNITS_FROM` course-list entry) to a
    /// level-7 code. Structural nodes that become empty collapse away.
    pub fn exclude_level_7(self) -> Option<Node> {
        use crate::util::is_level_7;
        match self {
            Node::Course { code } if is_level_7(&code) => None,
            Node::Course { .. } => Some(self),
            Node::And { args } => rebuild(args, Node::and),
            Node::Or { args } => rebuild(args, Node::or),
            Node::NOf { n, args } => rebuild(args, move |a| Node::n_of(n, a)),
            Node::NoneOf { args } => rebuild(args, Node::none_of),
            Node::UnitsFrom { min_units, courses } => {
                let filtered: Vec<String> = courses.into_iter().filter(|c| !is_level_7(c)).collect();
                if filtered.is_empty() {
                    None
                } else {
                    Some(Node::UnitsFrom { min_units, courses: filtered })
                }
            }
            other => Some(other),
        }
    }
}

fn rebuild(args: Vec<Node>, build: impl Fn(Vec<Node>) -> Node) -> Option<Node> {
    let filtered: Vec<Node> = args.into_iter().filter_map(Node::exclude_level_7).collect();
    if filtered.is_empty() {
        None
    } else {
        Some(build(filtered))
    }
}

fn flatten(args: Vec<Node>, is_same_op: impl Fn(&Node) -> bool) -> Vec<Node> {
    let mut out = Vec::with_capacity(args.len());
    for a in args {
        if is_same_op(&a) {
            let children = match a {
                Node::And { args } | Node::Or { args } | Node::NoneOf { args } => args,
                Node::NOf { args, .. } => args,
                other => vec![other],
            };
            out.extend(children);
        } else {
            out.push(a);
        }
    }
    out
}

fn dedup_courses(args: Vec<Node>) -> Vec<Node> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(args.len());
    for a in args {
        match &a {
            Node::Course { code } => {
                if seen.insert(code.clone()) {
                    out.push(a);
                }
            }
            _ => out.push(a),
        }
    }
    out
}

fn collapse_singleton(node: Node) -> Node {
    match node {
        Node::And { mut args } if args.len() == 1 => args.remove(0),
        Node::NOf { args, .. } if args.len() == 1 => args.into_iter().next().unwrap(),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_flattens_nested_and() {
        let a = Node::course("A");
        let b = Node::course("B");
        let c = Node::course("C");
        let nested = Node::and(vec![Node::and(vec![a.clone(), b.clone()]), c.clone()]);
        assert_eq!(nested, Node::And { args: vec![a, b, c] });
    }

    #[test]
    fn and_dedups_duplicate_courses() {
        let a = Node::course("A");
        let result = Node::and(vec![a.clone(), a.clone(), Node::course("B")]);
        assert_eq!(result, Node::And { args: vec![a, Node::course("B")] });
    }

    #[test]
    fn or_rewrites_to_n_of_one() {
        let result = Node::or(vec![Node::course("A"), Node::course("B")]);
        assert_eq!(
            result,
            Node::NOf { n: 1, args: vec![Node::course("A"), Node::course("B")] }
        );
    }

    #[test]
    fn referenced_codes_collects_units_from() {
        let node = Node::and(vec![
            Node::course("A"),
            Node::UnitsFrom { min_units: 2, courses: vec!["B".into(), "C".into()] },
        ]);
        assert_eq!(node.referenced_codes(), vec!["A", "B", "C"]);
    }

    #[test]
    fn excludes_level_7_courses() {
        let node = Node::and(vec![Node::course("CSSE1001"), Node::course("CSSE7030")]);
        let filtered = node.exclude_level_7().unwrap();
        assert_eq!(filtered, Node::course("CSSE1001"));
    }

    #[test]
    fn excluding_level_7_can_empty_a_node() {
        let node = Node::course("CSSE7030");
        assert_eq!(node.exclude_level_7(), None);
    }
}
