//! 声明式构图: 先登记节点, 再解析弧, 全部校验通过后才产出图.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;

use crate::net::core::ExecutableGraph;
use crate::net::ids::{NodeId, PlaceId, TransitionId};
use crate::net::index_vec::IndexVec;
use crate::net::structure::{
    ArgumentEdge, Bindings, Distribution, DistributionFn, Place, ReturnEdge, Transition,
    TransitionFn,
};
use crate::net::token::Token;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphConstructionError {
    #[error("name `{0}` is already used by another place or transition")]
    DuplicateName(String),
    #[error("edge references undeclared place `{0}`")]
    UnknownPlace(String),
    #[error("edge references undeclared transition `{0}`")]
    UnknownTransition(String),
    #[error("transition `{transition}` declares parameters {expected:?} but its argument edges bind {found:?}")]
    ParameterMismatch {
        transition: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("transition `{transition}` has more than one argument edge for `{argument}`")]
    DuplicateArgument { transition: String, argument: String },
    #[error("place `{place}` feeds more than one parameter of transition `{transition}`")]
    PlaceFeedsParameterTwice { place: String, transition: String },
    #[error("return edge `{transition}` -> `{place}` is declared twice")]
    DuplicateReturnEdge { transition: String, place: String },
    #[error("initial token #{index} of place `{place}` is not assignable to `{declared}`")]
    TokenType {
        place: String,
        index: usize,
        declared: String,
    },
}

/// One declarative node or edge.
pub enum GraphSpec<T: Token> {
    Place {
        name: String,
        declared: T::Kind,
        tokens: Vec<T>,
    },
    Transition {
        name: String,
        params: Vec<String>,
        function: TransitionFn<T>,
        distribution: Option<DistributionFn<T>>,
    },
    Argument {
        place: String,
        transition: String,
        argument: String,
    },
    Return {
        transition: String,
        place: String,
    },
}

impl<T: Token> GraphSpec<T> {
    pub fn place(name: impl Into<String>, declared: T::Kind, tokens: Vec<T>) -> Self {
        GraphSpec::Place {
            name: name.into(),
            declared,
            tokens,
        }
    }

    /// A transition whose result is broadcast to every return-edge target.
    pub fn transition<P, F>(name: impl Into<String>, params: P, function: F) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        F: Fn(&Bindings<T>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        GraphSpec::Transition {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            function: Arc::new(function),
            distribution: None,
        }
    }

    /// A transition whose result is routed by `distribution`.
    pub fn routed_transition<P, F, D>(
        name: impl Into<String>,
        params: P,
        function: F,
        distribution: D,
    ) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        F: Fn(&Bindings<T>) -> anyhow::Result<T> + Send + Sync + 'static,
        D: Fn(T) -> anyhow::Result<Distribution<T>> + Send + Sync + 'static,
    {
        GraphSpec::Transition {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            function: Arc::new(function),
            distribution: Some(Arc::new(distribution)),
        }
    }

    pub fn argument(
        place: impl Into<String>,
        transition: impl Into<String>,
        argument: impl Into<String>,
    ) -> Self {
        GraphSpec::Argument {
            place: place.into(),
            transition: transition.into(),
            argument: argument.into(),
        }
    }

    pub fn output(transition: impl Into<String>, place: impl Into<String>) -> Self {
        GraphSpec::Return {
            transition: transition.into(),
            place: place.into(),
        }
    }
}

/// Builds a graph from node and edge declarations given in any order.
///
/// Nodes are registered first, edges resolved second, so an edge may be
/// declared before the nodes it references. Places and transitions iterate
/// in declaration order afterwards.
pub fn construct_graph<T, I>(specs: I) -> Result<ExecutableGraph<T>, GraphConstructionError>
where
    T: Token,
    I: IntoIterator<Item = GraphSpec<T>>,
{
    let mut places: IndexVec<PlaceId, Place<T>> = IndexVec::new();
    let mut transitions: IndexVec<TransitionId, Transition<T>> = IndexVec::new();
    let mut order = Vec::new();
    let mut names: HashMap<String, NodeId> = HashMap::new();
    let mut pending_arguments = Vec::new();
    let mut pending_returns = Vec::new();

    for spec in specs {
        match spec {
            GraphSpec::Place {
                name,
                declared,
                tokens,
            } => {
                if names.contains_key(&name) {
                    return Err(GraphConstructionError::DuplicateName(name));
                }
                if let Some(index) = tokens.iter().position(|t| !t.is_assignable_to(declared)) {
                    return Err(GraphConstructionError::TokenType {
                        place: name,
                        index,
                        declared: declared.to_string(),
                    });
                }
                let mut place = Place::new(name.clone(), declared);
                place.tokens = tokens;
                let id = places.push(place);
                names.insert(name, NodeId::Place(id));
                order.push(NodeId::Place(id));
            }
            GraphSpec::Transition {
                name,
                params,
                function,
                distribution,
            } => {
                if names.contains_key(&name) {
                    return Err(GraphConstructionError::DuplicateName(name));
                }
                let id = transitions.push(Transition {
                    name: name.clone(),
                    params,
                    function,
                    distribution,
                });
                names.insert(name, NodeId::Transition(id));
                order.push(NodeId::Transition(id));
            }
            GraphSpec::Argument {
                place,
                transition,
                argument,
            } => pending_arguments.push((place, transition, argument)),
            GraphSpec::Return { transition, place } => pending_returns.push((transition, place)),
        }
    }

    let resolve_place = |name: &str| match names.get(name) {
        Some(NodeId::Place(id)) => Ok(*id),
        _ => Err(GraphConstructionError::UnknownPlace(name.to_owned())),
    };
    let resolve_transition = |name: &str| match names.get(name) {
        Some(NodeId::Transition(id)) => Ok(*id),
        _ => Err(GraphConstructionError::UnknownTransition(name.to_owned())),
    };

    let mut inputs: IndexVec<TransitionId, Vec<usize>> =
        transitions.iter().map(|_| Vec::new()).collect();
    let mut argument_edges: Vec<ArgumentEdge> = Vec::with_capacity(pending_arguments.len());
    for (place_name, transition_name, argument) in pending_arguments {
        let place = resolve_place(&place_name)?;
        let transition = resolve_transition(&transition_name)?;
        for &existing in &inputs[transition] {
            let edge: &ArgumentEdge = &argument_edges[existing];
            if edge.argument == argument {
                return Err(GraphConstructionError::DuplicateArgument {
                    transition: transition_name,
                    argument,
                });
            }
            if edge.place == place {
                return Err(GraphConstructionError::PlaceFeedsParameterTwice {
                    place: place_name,
                    transition: transition_name,
                });
            }
        }
        inputs[transition].push(argument_edges.len());
        argument_edges.push(ArgumentEdge {
            place,
            transition,
            argument,
        });
    }

    let mut outputs: IndexVec<TransitionId, Vec<PlaceId>> =
        transitions.iter().map(|_| Vec::new()).collect();
    let mut return_edges = Vec::with_capacity(pending_returns.len());
    for (transition_name, place_name) in pending_returns {
        let transition = resolve_transition(&transition_name)?;
        let place = resolve_place(&place_name)?;
        if outputs[transition].contains(&place) {
            return Err(GraphConstructionError::DuplicateReturnEdge {
                transition: transition_name,
                place: place_name,
            });
        }
        outputs[transition].push(place);
        return_edges.push(ReturnEdge { transition, place });
    }

    for (id, transition) in transitions.iter_enumerated() {
        let bound: HashSet<&str> = inputs[id]
            .iter()
            .map(|&edge| argument_edges[edge].argument.as_str())
            .collect();
        let declared: HashSet<&str> = transition.params.iter().map(String::as_str).collect();
        if bound != declared || declared.len() != transition.params.len() {
            let mut found: Vec<String> = bound.into_iter().map(str::to_owned).collect();
            found.sort();
            return Err(GraphConstructionError::ParameterMismatch {
                transition: transition.name.clone(),
                expected: transition.params.clone(),
                found,
            });
        }
    }

    log::debug!(
        "constructed graph: {} places, {} transitions, {} argument edges, {} return edges",
        places.len(),
        transitions.len(),
        argument_edges.len(),
        return_edges.len()
    );

    Ok(ExecutableGraph {
        places,
        transitions,
        argument_edges,
        return_edges,
        order,
        names,
        inputs,
        outputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::token::ScalarKind;

    fn identity(name: &str) -> GraphSpec<i64> {
        GraphSpec::transition(name, ["x"], |args| Ok(*args.get("x")?))
    }

    #[test]
    fn edges_may_precede_their_nodes() {
        let graph = construct_graph(vec![
            GraphSpec::argument("Input", "Process", "x"),
            GraphSpec::output("Process", "Output"),
            GraphSpec::place("Input", ScalarKind::Int, vec![1, 2, 3]),
            identity("Process"),
            GraphSpec::place("Output", ScalarKind::Int, vec![]),
        ])
        .unwrap();

        let names: Vec<_> = graph
            .declaration_order()
            .iter()
            .map(|&node| graph.node_name(node).to_owned())
            .collect();
        assert_eq!(names, vec!["Input", "Process", "Output"]);
        assert_eq!(graph.tokens("Input"), Some(&[1, 2, 3][..]));
        let process = graph.transition_id("Process").unwrap();
        assert_eq!(graph.outputs_of(process), &[graph.place_id("Output").unwrap()]);
    }

    #[test]
    fn place_and_transition_share_a_namespace() {
        let err = construct_graph(vec![
            GraphSpec::place("Node", ScalarKind::Int, vec![]),
            identity("Node"),
        ])
        .unwrap_err();
        assert_eq!(err, GraphConstructionError::DuplicateName("Node".into()));
    }

    #[test]
    fn dangling_references_fail() {
        let err = construct_graph(vec![
            GraphSpec::place("Input", ScalarKind::Int, vec![]),
            identity("Process"),
            GraphSpec::argument("Input", "Process", "x"),
            GraphSpec::output("Process", "Missing"),
        ])
        .unwrap_err();
        assert_eq!(err, GraphConstructionError::UnknownPlace("Missing".into()));

        let err = construct_graph(vec![
            GraphSpec::place("Input", ScalarKind::Int, Vec::<i64>::new()),
            GraphSpec::argument("Input", "Nowhere", "x"),
        ])
        .unwrap_err();
        assert_eq!(err, GraphConstructionError::UnknownTransition("Nowhere".into()));
    }

    #[test]
    fn transition_name_is_not_a_place() {
        let err = construct_graph(vec![
            GraphSpec::place("Input", ScalarKind::Int, vec![]),
            identity("Process"),
            GraphSpec::argument("Input", "Process", "x"),
            GraphSpec::output("Process", "Process"),
        ])
        .unwrap_err();
        assert_eq!(err, GraphConstructionError::UnknownPlace("Process".into()));
    }

    #[test]
    fn parameter_names_must_match_edges() {
        let err = construct_graph(vec![
            GraphSpec::place("Input", ScalarKind::Int, vec![]),
            identity("Process"),
            GraphSpec::argument("Input", "Process", "y"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            GraphConstructionError::ParameterMismatch {
                transition: "Process".into(),
                expected: vec!["x".into()],
                found: vec!["y".into()],
            }
        );
    }

    #[test]
    fn missing_argument_edge_is_a_mismatch() {
        let err = construct_graph(vec![
            GraphSpec::place("A", ScalarKind::Int, vec![]),
            GraphSpec::transition("Combine", ["a", "b"], |args: &Bindings<i64>| {
                Ok(args.get("a")? + args.get("b")?)
            }),
            GraphSpec::argument("A", "Combine", "a"),
        ])
        .unwrap_err();
        assert!(matches!(err, GraphConstructionError::ParameterMismatch { .. }));
    }

    #[test]
    fn a_place_feeds_one_parameter_per_transition() {
        let err = construct_graph(vec![
            GraphSpec::place("A", ScalarKind::Int, vec![]),
            GraphSpec::transition("Combine", ["a", "b"], |args: &Bindings<i64>| {
                Ok(args.get("a")? + args.get("b")?)
            }),
            GraphSpec::argument("A", "Combine", "a"),
            GraphSpec::argument("A", "Combine", "b"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            GraphConstructionError::PlaceFeedsParameterTwice {
                place: "A".into(),
                transition: "Combine".into(),
            }
        );
    }

    #[test]
    fn duplicate_argument_and_return_edges() {
        let err = construct_graph(vec![
            GraphSpec::place("A", ScalarKind::Int, vec![]),
            GraphSpec::place("B", ScalarKind::Int, vec![]),
            identity("Process"),
            GraphSpec::argument("A", "Process", "x"),
            GraphSpec::argument("B", "Process", "x"),
        ])
        .unwrap_err();
        assert!(matches!(err, GraphConstructionError::DuplicateArgument { .. }));

        let err = construct_graph(vec![
            GraphSpec::place("A", ScalarKind::Int, vec![]),
            identity("Process"),
            GraphSpec::argument("A", "Process", "x"),
            GraphSpec::output("Process", "A"),
            GraphSpec::output("Process", "A"),
        ])
        .unwrap_err();
        assert!(matches!(err, GraphConstructionError::DuplicateReturnEdge { .. }));
    }

    #[test]
    fn initial_tokens_are_type_checked() {
        let err = construct_graph(vec![GraphSpec::<String>::place(
            "Words",
            ScalarKind::Int,
            vec!["a".to_string()],
        )])
        .unwrap_err();
        assert_eq!(
            err,
            GraphConstructionError::TokenType {
                place: "Words".into(),
                index: 0,
                declared: "int".into(),
            }
        );
    }
}
