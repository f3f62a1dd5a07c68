use crate::graph::CourseGraph;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub course: String,
    pub level: u32,
    pub in_degree: usize,
    pub out_degree: usize,
    pub pagerank: f64,
    pub scc_id: usize,
    pub scc_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopoEntry {
    pub course: String,
    pub order: usize,
}

const DAMPING: f64 = 0.85;
const MAX_ITERS: usize = 100;
const CONVERGENCE: f64 = 1e-9;

/// Full graph analysis: SCC condensation, longest-path levels, per-node degree, and
/// PageRank, followed by a flattened topological order. Returns `(ranks, topo)` already
/// sorted per the spec's ordering rules.
pub fn analyze(cg: &CourseGraph) -> (Vec<Ranking>, Vec<TopoEntry>) {
    let g = &cg.graph;
    let sccs = petgraph::algo::tarjan_scc(g);

    let mut scc_id_of: HashMap<NodeIndex, usize> = HashMap::new();
    for (id, members) in sccs.iter().enumerate() {
        for &n in members {
            scc_id_of.insert(n, id);
        }
    }

    let k = sccs.len();
    let mut condensation_edges: HashSet<(usize, usize)> = HashSet::new();
    for edge in g.edge_references() {
        let (a, b) = (scc_id_of[&edge.source()], scc_id_of[&edge.target()]);
        if a != b {
            condensation_edges.insert((a, b));
        }
    }

    let mut cg_preds: Vec<Vec<usize>> = vec![Vec::new(); k];
    let mut cg_succs: Vec<Vec<usize>> = vec![Vec::new(); k];
    for &(a, b) in &condensation_edges {
        cg_succs[a].push(b);
        cg_preds[b].push(a);
    }

    let topo_scc_order = topo_sort_condensation(k, &cg_succs);

    let mut scc_level = vec![0u32; k];
    for &scc in &topo_scc_order {
        let level = cg_preds[scc]
            .iter()
            .map(|&p| scc_level[p] + 1)
            .max()
            .unwrap_or(0);
        scc_level[scc] = level;
    }

    let pagerank = compute_pagerank(g);

    let mut ranks: Vec<Ranking> = g
        .node_indices()
        .map(|n| {
            let scc = scc_id_of[&n];
            Ranking {
                course: g[n].clone(),
                level: scc_level[scc],
                in_degree: g.edges_directed(n, Direction::Incoming).count(),
                out_degree: g.edges_directed(n, Direction::Outgoing).count(),
                pagerank: *pagerank.get(&n).unwrap_or(&0.0),
                scc_id: scc,
                scc_size: sccs[scc].len(),
            }
        })
        .collect();

    ranks.sort_by(|a, b| {
        a.level
            .cmp(&b.level)
            .then(b.pagerank.partial_cmp(&a.pagerank).unwrap_or(std::cmp::Ordering::Equal))
            .then(a.course.cmp(&b.course))
    });

    let mut topo = Vec::with_capacity(g.node_count());
    for &scc in &topo_scc_order {
        let mut members: Vec<&NodeIndex> = sccs[scc].iter().collect();
        members.sort_by_key(|n| &g[**n]);
        for n in members {
            topo.push(g[*n].clone());
        }
    }
    let topo = topo
        .into_iter()
        .enumerate()
        .map(|(order, course)| TopoEntry { course, order })
        .collect();

    (ranks, topo)
}

fn topo_sort_condensation(k: usize, succs: &[Vec<usize>]) -> Vec<usize> {
    let mut indegree = vec![0usize; k];
    for adj in succs {
        for &t in adj {
            indegree[t] += 1;
        }
    }
    let mut queue: std::collections::VecDeque<usize> = (0..k).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(k);
    while let Some(n) = queue.pop_front() {
        order.push(n);
        for &t in &succs[n] {
            indegree[t] -= 1;
            if indegree[t] == 0 {
                queue.push_back(t);
            }
        }
    }
    order
}

fn compute_pagerank(g: &petgraph::graph::DiGraph<String, ()>) -> HashMap<NodeIndex, f64> {
    let n = g.node_count();
    if n == 0 {
        return HashMap::new();
    }
    let base = 1.0 / n as f64;
    let mut rank: HashMap<NodeIndex, f64> = g.node_indices().map(|i| (i, base)).collect();

    let out_degree: HashMap<NodeIndex, usize> = g
        .node_indices()
        .map(|i| (i, g.edges_directed(i, Direction::Outgoing).count()))
        .collect();

    for _ in 0..MAX_ITERS {
        let dangling_mass: f64 = g
            .node_indices()
            .filter(|i| out_degree[i] == 0)
            .map(|i| rank[&i])
            .sum();

        let mut next: HashMap<NodeIndex, f64> = g
            .node_indices()
            .map(|i| (i, (1.0 - DAMPING) * base + DAMPING * dangling_mass * base))
            .collect();

        for edge in g.edge_references() {
            let src = edge.source();
            let deg = out_degree[&src];
            if deg > 0 {
                *next.get_mut(&edge.target()).unwrap() += DAMPING * rank[&src] / deg as f64;
            }
        }

        let delta: f64 = g.node_indices().map(|i| (next[&i] - rank[&i]).abs()).sum();
        rank = next;
        if delta < CONVERGENCE {
            break;
        }
    }

    if rank.values().any(|v| !v.is_finite()) {
        return g.node_indices().map(|i| (i, 0.0)).collect();
    }

    rank
}

/// Writes the ranks table, already sorted by `analyze`.
pub fn write_ranks_csv(path: impl AsRef<std::path::Path>, ranks: &[Ranking]) -> std::io::Result<()> {
    use std::io::Write;
    let mut out = std::fs::File::create(path)?;
    writeln!(out, "course,level,in_degree,out_degree,pagerank,scc_id,scc_size")?;
    for r in ranks {
        writeln!(
            out,
            "{},{},{},{},{},{},{}",
            r.course, r.level, r.in_degree, r.out_degree, r.pagerank, r.scc_id, r.scc_size
        )?;
    }
    Ok(())
}

/// Writes the flattened topological order table.
pub fn write_topo_csv(path: impl AsRef<std::path::Path>, topo: &[TopoEntry]) -> std::io::Result<()> {
    use std::io::Write;
    let mut out = std::fs::File::create(path)?;
    writeln!(out, "course,order")?;
    for t in topo {
        writeln!(out, "{},{}", t.course, t.order)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CourseGraph;

    #[test]
    fn scenario_cycle_forms_one_scc() {
        let cg = CourseGraph::build(&[
            ("B".into(), "A".into()),
            ("C".into(), "B".into()),
            ("A".into(), "C".into()),
        ]);
        let (ranks, topo) = analyze(&cg);
        assert_eq!(ranks.len(), 3);
        assert!(ranks.iter().all(|r| r.scc_size == 3));
        assert!(ranks.iter().all(|r| r.level == ranks[0].level));
        let order: Vec<&str> = topo.iter().map(|t| t.course.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn topological_consistency_across_sccs() {
        let cg = CourseGraph::build(&[("B".into(), "A".into()), ("C".into(), "B".into())]);
        let (_, topo) = analyze(&cg);
        let order_of = |c: &str| topo.iter().find(|t| t.course == c).unwrap().order;
        assert!(order_of("A") < order_of("B"));
        assert!(order_of("B") < order_of("C"));
    }

    #[test]
    fn ranks_sorted_by_level_then_pagerank_then_course() {
        let cg = CourseGraph::build(&[("B".into(), "A".into()), ("C".into(), "A".into())]);
        let (ranks, _) = analyze(&cg);
        for w in ranks.windows(2) {
            assert!(
                w[0].level < w[1].level
                    || (w[0].level == w[1].level && w[0].pagerank >= w[1].pagerank)
            );
        }
    }
}
