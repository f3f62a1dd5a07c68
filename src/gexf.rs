use crate::analyze::Ranking;
use crate::graph::{ConflictGraph, CourseGraph};
use crate::page::CoursePage;
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Writes the directed prereq graph as GEXF, the format named by the original crawl
/// tooling's own output-file header. Node attributes carry everything the ranking and
/// topological tables computed (component I), plus page metadata and incompatibility
/// counts.
pub fn write_prereq_gexf(
    path: impl AsRef<Path>,
    graph: &CourseGraph,
    ranks: &[Ranking],
    pages: &HashMap<String, CoursePage>,
    incompat_counts: &HashMap<String, (usize, Vec<String>)>,
) -> std::io::Result<()> {
    let rank_by_course: HashMap<&str, &Ranking> =
        ranks.iter().map(|r| (r.course.as_str(), r)).collect();

    let mut out = std::fs::File::create(path)?;
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(out, r#"<gexf xmlns="http://gexf.net/1.3" version="1.3">"#)?;
    writeln!(out, r#"  <graph mode="static" defaultedgetype="directed">"#)?;
    writeln!(out, r#"    <attributes class="node">"#)?;
    for (id, title, attr_type) in [
        ("0", "title", "string"),
        ("1", "url", "string"),
        ("2", "level", "integer"),
        ("3", "indegree", "integer"),
        ("4", "outdegree", "integer"),
        ("5", "pagerank", "double"),
        ("6", "scc_id", "integer"),
        ("7", "scc_size", "integer"),
        ("8", "incompat_count", "integer"),
        ("9", "incompat_with", "string"),
    ] {
        writeln!(out, r#"      <attribute id="{id}" title="{title}" type="{attr_type}"/>"#)?;
    }
    writeln!(out, "    </attributes>")?;
    writeln!(out, r#"    <attributes class="edge">"#)?;
    writeln!(out, r#"      <attribute id="0" title="relation" type="string"/>"#)?;
    writeln!(out, "    </attributes>")?;

    writeln!(out, "    <nodes>")?;
    for node in graph.graph.node_indices() {
        let code = &graph.graph[node];
        let rank = rank_by_course.get(code.as_str());
        let page = pages.get(code);
        let (incompat_count, incompat_with) = incompat_counts
            .get(code)
            .cloned()
            .unwrap_or((0, Vec::new()));

        writeln!(out, r#"      <node id="{0}" label="{0}">"#, escape(code))?;
        writeln!(out, "        <attvalues>")?;
        writeln!(out, r#"          <attvalue for="0" value="{}"/>"#, escape(page.map(|p| p.title.as_str()).unwrap_or("")))?;
        writeln!(out, r#"          <attvalue for="1" value="{}"/>"#, escape(page.map(|p| p.url.as_str()).unwrap_or("")))?;
        writeln!(out, r#"          <attvalue for="2" value="{}"/>"#, rank.map(|r| r.level).unwrap_or(0))?;
        writeln!(out, r#"          <attvalue for="3" value="{}"/>"#, rank.map(|r| r.in_degree).unwrap_or(0))?;
        writeln!(out, r#"          <attvalue for="4" value="{}"/>"#, rank.map(|r| r.out_degree).unwrap_or(0))?;
        writeln!(out, r#"          <attvalue for="5" value="{}"/>"#, rank.map(|r| r.pagerank).unwrap_or(0.0))?;
        writeln!(out, r#"          <attvalue for="6" value="{}"/>"#, rank.map(|r| r.scc_id).unwrap_or(0))?;
        writeln!(out, r#"          <attvalue for="7" value="{}"/>"#, rank.map(|r| r.scc_size).unwrap_or(1))?;
        writeln!(out, r#"          <attvalue for="8" value="{incompat_count}"/>"#)?;
        writeln!(out, r#"          <attvalue for="9" value="{}"/>"#, escape(&incompat_with.join(";")))?;
        writeln!(out, "        </attvalues>")?;
        writeln!(out, "      </node>")?;
    }
    writeln!(out, "    </nodes>")?;

    writeln!(out, "    <edges>")?;
    for (i, edge) in graph.graph.edge_references().enumerate() {
        writeln!(
            out,
            r#"      <edge id="{i}" source="{}" target="{}" label="prereq">"#,
            escape(&graph.graph[edge.source()]),
            escape(&graph.graph[edge.target()])
        )?;
        writeln!(out, r#"        <attvalues>"#)?;
        writeln!(out, r#"          <attvalue for="0" value="prereq"/>"#)?;
        writeln!(out, r#"        </attvalues>"#)?;
        writeln!(out, "      </edge>")?;
    }
    writeln!(out, "    </edges>")?;
    writeln!(out, "  </graph>")?;
    writeln!(out, "</gexf>")?;
    Ok(())
}

/// Writes the undirected incompatibility graph as GEXF, with each node's connected
/// component index stored as `incompat_component`.
pub fn write_incompat_gexf(path: impl AsRef<Path>, graph: &ConflictGraph) -> std::io::Result<()> {
    let components = connected_components(graph);

    let mut out = std::fs::File::create(path)?;
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(out, r#"<gexf xmlns="http://gexf.net/1.3" version="1.3">"#)?;
    writeln!(out, r#"  <graph mode="static" defaultedgetype="undirected">"#)?;
    writeln!(out, r#"    <attributes class="node">"#)?;
    writeln!(out, r#"      <attribute id="0" title="incompat_component" type="integer"/>"#)?;
    writeln!(out, "    </attributes>")?;
    writeln!(out, r#"    <attributes class="edge">"#)?;
    writeln!(out, r#"      <attribute id="0" title="relation" type="string"/>"#)?;
    writeln!(out, "    </attributes>")?;

    writeln!(out, "    <nodes>")?;
    for node in graph.graph.node_indices() {
        let code = &graph.graph[node];
        writeln!(out, r#"      <node id="{0}" label="{0}">"#, escape(code))?;
        writeln!(out, "        <attvalues>")?;
        writeln!(
            out,
            r#"          <attvalue for="0" value="{}"/>"#,
            components.get(&node).copied().unwrap_or(0)
        )?;
        writeln!(out, "        </attvalues>")?;
        writeln!(out, "      </node>")?;
    }
    writeln!(out, "    </nodes>")?;

    writeln!(out, "    <edges>")?;
    for (i, edge) in graph.graph.edge_references().enumerate() {
        writeln!(
            out,
            r#"      <edge id="{i}" source="{}" target="{}" label="incompat">"#,
            escape(&graph.graph[edge.source()]),
            escape(&graph.graph[edge.target()])
        )?;
        writeln!(out, r#"        <attvalues>"#)?;
        writeln!(out, r#"          <attvalue for="0" value="incompat"/>"#)?;
        writeln!(out, r#"        </attvalues>"#)?;
        writeln!(out, "      </edge>")?;
    }
    writeln!(out, "    </edges>")?;
    writeln!(out, "  </graph>")?;
    writeln!(out, "</gexf>")?;
    Ok(())
}

fn connected_components(graph: &ConflictGraph) -> HashMap<petgraph::graph::NodeIndex, usize> {
    let mut component_of = HashMap::new();
    let mut next_id = 0usize;
    for start in graph.graph.node_indices() {
        if component_of.contains_key(&start) {
            continue;
        }
        let mut stack = vec![start];
        component_of.insert(start, next_id);
        while let Some(n) = stack.pop() {
            for neighbor in graph.graph.neighbors(n) {
                if !component_of.contains_key(&neighbor) {
                    component_of.insert(neighbor, next_id);
                    stack.push(neighbor);
                }
            }
        }
        next_id += 1;
    }
    component_of
}
