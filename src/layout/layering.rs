//! 分层: 在 "流向" 图上做最长路径分层, 容忍环.
use std::collections::BTreeSet;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::net::core::ExecutableGraph;
use crate::net::ids::NodeId;
use crate::net::token::Token;

/// Place → transition for every argument edge, transition → place for
/// every return edge. Node `i` is the `i`-th declared node.
pub fn direction_graph<T: Token>(graph: &ExecutableGraph<T>) -> DiGraph<NodeId, ()> {
    let order = graph.declaration_order();
    let mut flow = DiGraph::with_capacity(order.len(), graph.argument_edges().len());
    let mut index_of = std::collections::HashMap::with_capacity(order.len());
    for &node in order {
        index_of.insert(node, flow.add_node(node));
    }
    for edge in graph.argument_edges() {
        flow.add_edge(
            index_of[&NodeId::from(edge.place)],
            index_of[&NodeId::from(edge.transition)],
            (),
        );
    }
    for edge in graph.return_edges() {
        flow.add_edge(
            index_of[&NodeId::from(edge.transition)],
            index_of[&NodeId::from(edge.place)],
            (),
        );
    }
    flow
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layering {
    /// Layer of each node, indexed like the direction graph.
    pub layer_of: Vec<usize>,
    /// Edges pointing into a node that was placed before its source; they
    /// are drawn upwards and reversed for crossing reduction.
    pub back_edges: Vec<(usize, usize)>,
}

impl Layering {
    pub fn layer_count(&self) -> usize {
        self.layer_of.iter().max().map_or(0, |&max| max + 1)
    }

    /// Edges oriented downwards, with flat edges dropped.
    pub fn downward_edges(&self, flow: &DiGraph<NodeId, ()>) -> Vec<(usize, usize)> {
        flow.edge_indices()
            .filter_map(|edge| flow.edge_endpoints(edge))
            .map(|(from, to)| (from.index(), to.index()))
            .filter_map(|(from, to)| {
                match self.layer_of[from].cmp(&self.layer_of[to]) {
                    std::cmp::Ordering::Less => Some((from, to)),
                    std::cmp::Ordering::Greater => Some((to, from)),
                    std::cmp::Ordering::Equal => None,
                }
            })
            .collect()
    }
}

/// Kahn-style longest-path layering.
///
/// Sources go to layer 0 and every other node one below its deepest placed
/// predecessor. When only cycles remain, the unplaced node with the fewest
/// unplaced predecessors is placed anyway (ties go to the earlier declared
/// node), and its still-unplaced incoming edges become back edges.
pub fn assign_layers(flow: &DiGraph<NodeId, ()>) -> Layering {
    let n = flow.node_count();
    let mut layer_of = vec![0usize; n];
    let mut placed = vec![false; n];
    let mut waiting: Vec<usize> = (0..n)
        .map(|i| {
            flow.neighbors_directed(NodeIndex::new(i), Direction::Incoming)
                .count()
        })
        .collect();
    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| waiting[i] == 0).collect();
    let mut back_edges = Vec::new();

    for _ in 0..n {
        let node = match ready.pop_first() {
            Some(node) => node,
            None => {
                let Some(forced) = (0..n)
                    .filter(|&i| !placed[i])
                    .min_by_key(|&i| (waiting[i], i))
                else {
                    break;
                };
                log::trace!("breaking cycle at node {}", forced);
                forced
            }
        };

        let index = NodeIndex::new(node);
        let mut layer = 0;
        for pred in flow.neighbors_directed(index, Direction::Incoming) {
            let pred = pred.index();
            if placed[pred] {
                layer = layer.max(layer_of[pred] + 1);
            } else {
                back_edges.push((pred, node));
            }
        }
        layer_of[node] = layer;
        placed[node] = true;

        for succ in flow.neighbors_directed(index, Direction::Outgoing) {
            let succ = succ.index();
            if placed[succ] {
                continue;
            }
            waiting[succ] -= 1;
            if waiting[succ] == 0 {
                ready.insert(succ);
            }
        }
    }

    back_edges.sort_unstable();
    Layering {
        layer_of,
        back_edges,
    }
}
