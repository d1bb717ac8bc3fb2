//! Cycle basis of the transmission network, used to impose Kirchhoff's voltage law.
//!
//! The network is treated as an undirected multigraph with zones as nodes and lines as edges. A
//! spanning forest is found by breadth-first search and every line not in the forest closes
//! exactly one fundamental cycle, so there are `E - V + C` cycles for a network with `E` lines,
//! `V` zones and `C` connected components. Two parallel lines between the same pair of zones form
//! a cycle of their own.
use super::{TransmissionLine, TransmissionLineID};
use crate::temporal::PeriodID;
use crate::zone::ZoneID;
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet, VecDeque};

/// One step around a cycle: traversing a line from one zone to another
#[derive(Debug, Clone, PartialEq)]
pub struct CycleHop {
    /// The line traversed
    pub line: TransmissionLineID,
    /// The zone the hop starts at
    pub from: ZoneID,
    /// The zone the hop ends at
    pub to: ZoneID,
}

/// A closed loop of lines in the network for a given period
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    /// The period the cycle was found for
    pub period: PeriodID,
    /// Index of the cycle within its period
    pub id: usize,
    /// The hops around the cycle. Each hop ends where the next one starts and the last hop ends
    /// where the first started.
    pub hops: Vec<CycleHop>,
}

impl Cycle {
    /// The zones visited by the cycle, in order
    pub fn zones(&self) -> impl Iterator<Item = &ZoneID> {
        self.hops.iter().map(|hop| &hop.from)
    }

    /// The lines in the cycle with their signed incidences.
    ///
    /// The incidence is +1 where the cycle traverses a line in its declared direction and -1
    /// where it traverses it in reverse.
    pub fn incidences<'a>(
        &'a self,
        lines: &'a IndexMap<TransmissionLineID, &TransmissionLine>,
    ) -> impl Iterator<Item = Result<(&'a TransmissionLine, f64)>> + 'a {
        self.hops.iter().map(move |hop| {
            let line = lines
                .get(&hop.line)
                .with_context(|| format!("Unknown transmission line {} in cycle", hop.line))?;
            Ok((*line, incidence(line, &hop.from, &hop.to)?))
        })
    }
}

/// The signed incidence of a line for a hop from `from` to `to`.
///
/// # Returns
///
/// +1 if the line runs from `from` to `to`, -1 if it runs the other way, or an error if it does
/// not connect the two zones.
pub fn incidence(line: &TransmissionLine, from: &ZoneID, to: &ZoneID) -> Result<f64> {
    if line.zone_from == *from && line.zone_to == *to {
        Ok(1.0)
    } else if line.zone_from == *to && line.zone_to == *from {
        Ok(-1.0)
    } else {
        bail!(
            "Transmission line {} does not connect zones {from} and {to}",
            line.id
        )
    }
}

/// Find a cycle basis for the network formed by the given lines.
///
/// # Arguments
///
/// * `period` - The period the lines are operational in
/// * `lines` - The lines in the network
///
/// # Returns
///
/// One cycle per line not in the breadth-first spanning forest, or an error if any line connects
/// a zone to itself.
pub fn find_cycles(period: PeriodID, lines: &[&TransmissionLine]) -> Result<Vec<Cycle>> {
    let mut graph: UnGraph<ZoneID, usize> = UnGraph::new_undirected();
    let mut nodes: IndexMap<ZoneID, NodeIndex> = IndexMap::new();
    for (idx, line) in lines.iter().enumerate() {
        ensure!(
            line.zone_from != line.zone_to,
            "Transmission line {} connects zone {} to itself",
            line.id,
            line.zone_from
        );

        let mut node_for = |zone: &ZoneID| {
            *nodes
                .entry(zone.clone())
                .or_insert_with(|| graph.add_node(zone.clone()))
        };
        let from = node_for(&line.zone_from);
        let to = node_for(&line.zone_to);
        graph.add_edge(from, to, idx);
    }

    let forest = SpanningForest::new(&graph, nodes.values().copied());
    let mut cycles = Vec::new();
    for edge in graph.edge_indices() {
        if forest.tree_edges.contains(&edge) {
            continue;
        }

        let (a, b) = graph
            .edge_endpoints(edge)
            .context("Transmission network edge has no endpoints")?;
        let nodes_and_edges = forest.close_cycle(a, b, edge);
        let hops = nodes_and_edges
            .into_iter()
            .map(|(from, to, edge)| CycleHop {
                line: lines[graph[edge]].id.clone(),
                from: graph[from].clone(),
                to: graph[to].clone(),
            })
            .collect();
        cycles.push(Cycle {
            period,
            id: cycles.len(),
            hops,
        });
    }

    Ok(cycles)
}

/// A breadth-first spanning forest of a graph
struct SpanningForest {
    /// The parent of each non-root node and the edge connecting them
    parent: HashMap<NodeIndex, (NodeIndex, EdgeIndex)>,
    /// Distance of each node from the root of its tree
    depth: HashMap<NodeIndex, usize>,
    tree_edges: HashSet<EdgeIndex>,
}

impl SpanningForest {
    fn new(graph: &UnGraph<ZoneID, usize>, roots: impl Iterator<Item = NodeIndex>) -> Self {
        let mut forest = Self {
            parent: HashMap::new(),
            depth: HashMap::new(),
            tree_edges: HashSet::new(),
        };

        for root in roots {
            if forest.depth.contains_key(&root) {
                continue;
            }

            forest.depth.insert(root, 0);
            let mut queue = VecDeque::from([root]);
            while let Some(node) = queue.pop_front() {
                let depth = forest.depth[&node];

                // Sort the edges so the forest does not depend on petgraph's iteration order
                let mut edges = graph.edges(node).map(|edge| edge.id()).collect::<Vec<_>>();
                edges.sort_unstable();
                for edge in edges {
                    let Some((x, y)) = graph.edge_endpoints(edge) else {
                        continue;
                    };
                    let other = if x == node { y } else { x };
                    if forest.depth.contains_key(&other) {
                        continue;
                    }

                    forest.depth.insert(other, depth + 1);
                    forest.parent.insert(other, (node, edge));
                    forest.tree_edges.insert(edge);
                    queue.push_back(other);
                }
            }
        }

        forest
    }

    /// The hops of the cycle closed by the non-tree edge from `a` to `b`.
    ///
    /// The cycle goes from `a` to `b` along the edge, up the tree from `b` to the common
    /// ancestor of `a` and `b`, then down the tree to `a`.
    fn close_cycle(
        &self,
        a: NodeIndex,
        b: NodeIndex,
        edge: EdgeIndex,
    ) -> Vec<(NodeIndex, NodeIndex, EdgeIndex)> {
        let mut up_from_a = Vec::new();
        let mut up_from_b = Vec::new();
        let (mut x, mut y) = (a, b);
        while x != y {
            if self.depth[&x] >= self.depth[&y] {
                let (parent, edge) = self.parent[&x];
                up_from_a.push((x, parent, edge));
                x = parent;
            } else {
                let (parent, edge) = self.parent[&y];
                up_from_b.push((y, parent, edge));
                y = parent;
            }
        }

        let mut hops = vec![(a, b, edge)];
        hops.extend(up_from_b);
        hops.extend(
            up_from_a
                .into_iter()
                .rev()
                .map(|(child, parent, edge)| (parent, child, edge)),
        );

        hops
    }
}
