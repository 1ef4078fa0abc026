//! 可执行图: 库所/变迁存储区、弧索引、可发生集以及连通性诊断.
use std::collections::HashMap;
use std::fmt::{self, Write as FmtWrite};
use std::fs;
use std::path::Path;

use crate::net::ids::{NodeId, PlaceId, TransitionId};
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::structure::{ArgumentEdge, Place, ReturnEdge, Transition};
use crate::net::token::Token;

/// Connectivity report for a constructed graph.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticReport {
    /// Places with no edge at all.
    pub isolated_places: Vec<(PlaceId, String)>,
    /// Transitions with no edge at all.
    pub isolated_transitions: Vec<(TransitionId, String)>,
    pub warnings: Vec<String>,
    pub total_places: usize,
    pub total_transitions: usize,
}

impl DiagnosticReport {
    pub fn has_issues(&self) -> bool {
        !self.isolated_places.is_empty()
            || !self.isolated_transitions.is_empty()
            || !self.warnings.is_empty()
    }
}

/// A constructed token-flow graph.
///
/// Structure is fixed after [`construct_graph`](crate::net::construct_graph);
/// only token sequences change afterwards, and only through the engine.
#[derive(Clone)]
pub struct ExecutableGraph<T: Token> {
    pub(crate) places: IndexVec<PlaceId, Place<T>>,
    pub(crate) transitions: IndexVec<TransitionId, Transition<T>>,
    pub(crate) argument_edges: Vec<ArgumentEdge>,
    pub(crate) return_edges: Vec<ReturnEdge>,
    /// Places and transitions interleaved in declaration order.
    pub(crate) order: Vec<NodeId>,
    pub(crate) names: HashMap<String, NodeId>,
    /// Per transition: indices into `argument_edges`, declaration order.
    pub(crate) inputs: IndexVec<TransitionId, Vec<usize>>,
    pub(crate) outputs: IndexVec<TransitionId, Vec<PlaceId>>,
}

impl<T: Token> fmt::Debug for ExecutableGraph<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutableGraph")
            .field("places", &self.places)
            .field("transitions", &self.transitions)
            .field("argument_edges", &self.argument_edges)
            .field("return_edges", &self.return_edges)
            .finish()
    }
}

impl<T: Token> ExecutableGraph<T> {
    pub fn places(&self) -> &IndexVec<PlaceId, Place<T>> {
        &self.places
    }

    pub fn transitions(&self) -> &IndexVec<TransitionId, Transition<T>> {
        &self.transitions
    }

    pub fn place(&self, place: PlaceId) -> &Place<T> {
        &self.places[place]
    }

    pub fn transition(&self, transition: TransitionId) -> &Transition<T> {
        &self.transitions[transition]
    }

    pub fn argument_edges(&self) -> &[ArgumentEdge] {
        &self.argument_edges
    }

    pub fn return_edges(&self) -> &[ReturnEdge] {
        &self.return_edges
    }

    pub fn declaration_order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn node(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn place_id(&self, name: &str) -> Option<PlaceId> {
        self.node(name).and_then(NodeId::as_place)
    }

    pub fn transition_id(&self, name: &str) -> Option<TransitionId> {
        self.node(name).and_then(NodeId::as_transition)
    }

    pub fn node_name(&self, node: NodeId) -> &str {
        match node {
            NodeId::Place(place) => &self.places[place].name,
            NodeId::Transition(transition) => &self.transitions[transition].name,
        }
    }

    /// Argument edges feeding `transition`, in declaration order.
    pub fn inputs_of(&self, transition: TransitionId) -> impl Iterator<Item = &ArgumentEdge> {
        self.inputs[transition]
            .iter()
            .map(|&edge| &self.argument_edges[edge])
    }

    /// Return-edge targets of `transition`, in declaration order.
    pub fn outputs_of(&self, transition: TransitionId) -> &[PlaceId] {
        &self.outputs[transition]
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    /// Tokens held by `name`, or `None` if no such place exists.
    pub fn tokens(&self, name: &str) -> Option<&[T]> {
        self.place_id(name).map(|place| self.places[place].tokens())
    }

    pub fn total_tokens(&self) -> usize {
        self.places.iter().map(Place::len).sum()
    }

    /// A transition is enabled when it has at least one argument edge and
    /// every source place holds a token. Transitions without inputs never
    /// fire.
    pub fn is_enabled(&self, transition: TransitionId) -> bool {
        let Some(inputs) = self.inputs.get(transition) else {
            return false;
        };
        !inputs.is_empty()
            && inputs
                .iter()
                .all(|&edge| !self.places[self.argument_edges[edge].place].is_empty())
    }

    /// Enabled transitions in declaration order.
    pub fn enabled_transitions(&self) -> Vec<TransitionId> {
        self.transitions
            .indices()
            .filter(|&transition| self.is_enabled(transition))
            .collect()
    }

    pub(crate) fn place_mut(&mut self, place: PlaceId) -> &mut Place<T> {
        &mut self.places[place]
    }

    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let _ = writeln!(&mut dot, "digraph TokenFlow {{");
        let _ = writeln!(&mut dot, "    rankdir=TB;");
        let _ = writeln!(&mut dot, "    node [fontname=\"Helvetica\"];");

        for (place_id, place) in self.places.iter_enumerated() {
            let label = format!(
                "{}\\n{}\\n{} tokens",
                escape_label(&place.name),
                place.declared,
                place.len()
            );
            let _ = writeln!(
                &mut dot,
                "    place_{} [label=\"{}\", shape=circle, style=filled, fillcolor=\"#e3f2fd\"];",
                place_id.index(),
                label
            );
        }

        for (transition_id, transition) in self.transitions.iter_enumerated() {
            let _ = writeln!(
                &mut dot,
                "    trans_{} [label=\"{}\", shape=box, style=filled, fillcolor=\"#ffe0b2\"];",
                transition_id.index(),
                escape_label(&transition.name)
            );
        }

        for edge in &self.argument_edges {
            let _ = writeln!(
                &mut dot,
                "    place_{} -> trans_{} [label=\"{}\"];",
                edge.place.index(),
                edge.transition.index(),
                escape_label(&edge.argument)
            );
        }

        for edge in &self.return_edges {
            let _ = writeln!(
                &mut dot,
                "    trans_{} -> place_{};",
                edge.transition.index(),
                edge.place.index()
            );
        }

        let _ = writeln!(&mut dot, "}}");
        dot
    }

    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_dot())
    }

    /// 诊断信息: 孤立节点、无输入变迁与无法获得令牌的空库所.
    pub fn diagnose_connectivity(&self) -> DiagnosticReport {
        let mut isolated_places = Vec::new();
        let mut isolated_transitions = Vec::new();
        let mut warnings = Vec::new();

        for (place_id, place) in self.places.iter_enumerated() {
            let feeds = self.argument_edges.iter().any(|e| e.place == place_id);
            let fed = self.return_edges.iter().any(|e| e.place == place_id);

            if !feeds && !fed {
                isolated_places.push((place_id, place.name.clone()));
            } else if !fed && place.is_empty() {
                warnings.push(format!(
                    "place '{}' has no incoming return edge and no tokens, so it never holds one",
                    place.name
                ));
            }
        }

        for (transition_id, transition) in self.transitions.iter_enumerated() {
            let has_inputs = !self.inputs[transition_id].is_empty();
            let has_outputs = !self.outputs[transition_id].is_empty();

            if !has_inputs && !has_outputs && !transition.has_distribution() {
                isolated_transitions.push((transition_id, transition.name.clone()));
            } else if !has_inputs {
                warnings.push(format!(
                    "transition '{}' has no argument edges and can never fire",
                    transition.name
                ));
            } else if !has_outputs && !transition.has_distribution() {
                warnings.push(format!(
                    "transition '{}' has no return edges; its results are discarded",
                    transition.name
                ));
            }
        }

        DiagnosticReport {
            isolated_places,
            isolated_transitions,
            warnings,
            total_places: self.places_len(),
            total_transitions: self.transitions_len(),
        }
    }

    pub fn log_diagnostics(&self) {
        let report = self.diagnose_connectivity();

        if !report.has_issues() {
            log::info!(
                "connectivity check passed: {} places, {} transitions",
                report.total_places,
                report.total_transitions
            );
            return;
        }

        for (id, name) in &report.isolated_places {
            log::warn!("isolated place [{}] {}", id.index(), name);
        }
        for (id, name) in &report.isolated_transitions {
            log::warn!("isolated transition [{}] {}", id.index(), name);
        }
        for warning in &report.warnings {
            log::warn!("{}", warning);
        }
    }
}

fn escape_label(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use crate::net::builder::{GraphSpec, construct_graph};
    use crate::net::token::ScalarKind;

    fn pipeline(input: Vec<i64>) -> crate::net::ExecutableGraph<i64> {
        construct_graph(vec![
            GraphSpec::place("Input", ScalarKind::Int, input),
            GraphSpec::argument("Input", "Process", "x"),
            GraphSpec::transition("Process", ["x"], |args| Ok(*args.get("x")?)),
            GraphSpec::output("Process", "Output"),
            GraphSpec::place("Output", ScalarKind::Int, vec![]),
        ])
        .unwrap()
    }

    #[test]
    fn enabled_depends_on_input_tokens() {
        let graph = pipeline(vec![1]);
        let process = graph.transition_id("Process").unwrap();
        assert!(graph.is_enabled(process));
        assert_eq!(graph.enabled_transitions(), vec![process]);

        let empty = pipeline(vec![]);
        assert!(empty.enabled_transitions().is_empty());
    }

    #[test]
    fn transition_without_inputs_is_never_enabled() {
        let graph = construct_graph(vec![
            GraphSpec::transition("Source", Vec::<String>::new(), |_| Ok(1i64)),
            GraphSpec::output("Source", "Sink"),
            GraphSpec::place("Sink", ScalarKind::Int, vec![]),
        ])
        .unwrap();
        assert!(graph.enabled_transitions().is_empty());
        let report = graph.diagnose_connectivity();
        assert!(report.warnings.iter().any(|w| w.contains("can never fire")));
    }

    #[test]
    fn dot_export_labels_arguments() {
        let dot = pipeline(vec![1, 2]).to_dot();
        assert!(dot.starts_with("digraph TokenFlow {"));
        assert!(dot.contains("place_0 -> trans_0 [label=\"x\"];"));
        assert!(dot.contains("trans_0 -> place_1;"));
        assert!(dot.contains("2 tokens"));
    }

    #[test]
    fn dot_file_creates_missing_directories() {
        let dir = std::env::temp_dir().join(format!("petriflow-dot-{}", std::process::id()));
        let path = dir.join("nested").join("pipeline.dot");
        let graph = pipeline(vec![1]);
        graph.write_dot(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), graph.to_dot());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn isolated_place_is_reported() {
        let graph = construct_graph(vec![
            GraphSpec::place("Lonely", ScalarKind::Int, vec![1i64]),
            GraphSpec::place("Input", ScalarKind::Int, vec![1]),
            GraphSpec::argument("Input", "Drop", "x"),
            GraphSpec::transition("Drop", ["x"], |args| Ok(*args.get("x")?)),
        ])
        .unwrap();
        let report = graph.diagnose_connectivity();
        assert!(report.has_issues());
        assert_eq!(report.isolated_places.len(), 1);
        assert_eq!(report.isolated_places[0].1, "Lonely");
        assert!(report.warnings.iter().any(|w| w.contains("discarded")));
    }
}
