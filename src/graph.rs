use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// A directed prerequisite graph: edge `prereq -> course` means `prereq` must be
/// completed before `course`. Level-7 nodes never enter the graph.
pub struct CourseGraph {
    pub graph: DiGraph<String, ()>,
    pub index_of: HashMap<String, NodeIndex>,
}

impl CourseGraph {
    /// Builds a graph from a deduplicated `(course, prereq)` edge set. Self-loops
    /// (`course == prereq`) and level-7 endpoints are dropped.
    pub fn build(edges: &[(String, String)]) -> Self {
        let mut graph = DiGraph::new();
        let mut index_of: HashMap<String, NodeIndex> = HashMap::new();

        let mut node_index = |graph: &mut DiGraph<String, ()>, index_of: &mut HashMap<String, NodeIndex>, code: &str| -> NodeIndex {
            *index_of
                .entry(code.to_string())
                .or_insert_with(|| graph.add_node(code.to_string()))
        };

        for (course, prereq) in edges {
            if course == prereq || crate::util::is_level_7(course) || crate::util::is_level_7(prereq) {
                continue;
            }
            let p = node_index(&mut graph, &mut index_of, prereq);
            let c = node_index(&mut graph, &mut index_of, course);
            if !graph.contains_edge(p, c) {
                graph.add_edge(p, c, ());
            }
        }

        Self { graph, index_of }
    }
}

/// An unordered incompatibility graph, one undirected edge per conflict pair.
pub struct ConflictGraph {
    pub graph: petgraph::graph::UnGraph<String, ()>,
    pub index_of: HashMap<String, NodeIndex>,
}

impl ConflictGraph {
    pub fn build(pairs: &[(String, String)]) -> Self {
        let mut graph = petgraph::graph::UnGraph::new_undirected();
        let mut index_of: HashMap<String, NodeIndex> = HashMap::new();

        for (a, b) in pairs {
            if a == b || crate::util::is_level_7(a) || crate::util::is_level_7(b) {
                continue;
            }
            let ia = *index_of.entry(a.clone()).or_insert_with(|| graph.add_node(a.clone()));
            let ib = *index_of.entry(b.clone()).or_insert_with(|| graph.add_node(b.clone()));
            if !graph.contains_edge(ia, ib) {
                graph.add_edge(ia, ib, ());
            }
        }

        Self { graph, index_of }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_drops_self_loops() {
        let g = CourseGraph::build(&[("A".into(), "A".into()), ("B".into(), "A".into())]);
        assert_eq!(g.graph.edge_count(), 1);
    }

    #[test]
    fn build_excludes_level_7() {
        let g = CourseGraph::build(&[("CSSE1001".into(), "CSSE7030".into())]);
        assert_eq!(g.graph.edge_count(), 0);
        assert!(g.graph.node_count() == 0 || !g.index_of.contains_key("CSSE7030"));
    }
}
