use coursegraph::analyze::analyze;
use coursegraph::ast::Node;
use coursegraph::graph::CourseGraph;
use coursegraph::parser::{parse_incompatibility, parse_requisite};

#[test]
fn parses_and_ranks_a_small_catalog() {
    let courses = [
        ("CSSE1001", "Prerequisite: none"),
        ("CSSE2002", "Prerequisite: CSSE1001"),
        ("CSSE3002", "Prerequisite: CSSE2002 and MATH1051"),
        ("MATH1051", "Prerequisite: none"),
    ];

    let mut edges = Vec::new();
    for (code, raw) in courses {
        let bundle = parse_requisite(raw);
        if let Some(node) = bundle.prereq {
            for prereq in node.referenced_codes() {
                edges.push((code.to_string(), prereq));
            }
        }
    }

    let graph = CourseGraph::build(&edges);
    let (ranks, topo) = analyze(&graph);

    let order_of = |c: &str| topo.iter().find(|t| t.course == c).unwrap().order;
    assert!(order_of("CSSE1001") < order_of("CSSE2002"));
    assert!(order_of("CSSE2002") < order_of("CSSE3002"));
    assert!(order_of("MATH1051") < order_of("CSSE3002"));

    let csse3002 = ranks.iter().find(|r| r.course == "CSSE3002").unwrap();
    assert_eq!(csse3002.level, 2);
}

#[test]
fn level_7_courses_never_appear_in_the_graph() {
    let bundle = parse_requisite("Prerequisite: CSSE1001 and CSSE7030");
    let referenced = bundle.prereq.unwrap().referenced_codes();
    let edges: Vec<(String, String)> = referenced
        .into_iter()
        .filter(|c| !coursegraph::util::is_level_7(c))
        .map(|p| ("CSSE8888".to_string(), p))
        .collect();

    let graph = CourseGraph::build(&edges);
    assert!(!graph.index_of.contains_key("CSSE7030"));
}

#[test]
fn incompatibility_pairs_round_trip_through_the_ast() {
    let node = parse_incompatibility("CSSE1001, CSSE1000").unwrap();
    assert_eq!(
        node,
        Node::none_of(vec![Node::course("CSSE1001"), Node::course("CSSE1000")])
    );
}
