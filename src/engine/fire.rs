//! 运行时: 单个变迁的发生语义 (取令牌 → 计算 → 分发), 失败时回滚.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::core::ExecutableGraph;
use crate::net::ids::{PlaceId, TransitionId};
use crate::net::structure::{Bindings, Transition};
use crate::net::token::Token;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("transition {0:?} is out of bounds")]
    OutOfBounds(TransitionId),
    #[error("transition `{transition}` is not enabled: input place `{place}` is empty")]
    NotEnabled { transition: String, place: String },
    #[error("transition `{transition}` routed a token to unknown place `{place}`")]
    UnknownOutputPlace { transition: String, place: String },
    #[error("transition `{transition}` failed")]
    TransitionFailed {
        transition: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("distribution function of `{transition}` failed")]
    DistributionFailed {
        transition: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("token produced by `{transition}` is not assignable to place `{place}` ({declared})")]
    TokenType {
        transition: String,
        place: String,
        declared: String,
    },
    #[error(
        "transition `{transition}` would copy its result into {targets} places while token copying is disallowed"
    )]
    TokenCopyingDisallowed { transition: String, targets: usize },
    #[error("graph lock poisoned by a panicking writer")]
    LockPoisoned,
}

/// Caller policy applied to a single firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirePolicy {
    /// When false, a broadcast that would duplicate one result into several
    /// places is refused; every production must come from an explicit
    /// distribution function.
    pub allow_token_copying: bool,
}

impl Default for FirePolicy {
    fn default() -> Self {
        Self {
            allow_token_copying: true,
        }
    }
}

impl FirePolicy {
    /// Whether `transition` can fire under this policy at all, ignoring
    /// tokens.
    pub fn permits<T: Token>(&self, graph: &ExecutableGraph<T>, transition: TransitionId) -> bool {
        self.allow_token_copying
            || graph.transition(transition).has_distribution()
            || graph.outputs_of(transition).len() <= 1
    }
}

/// Result of a successful firing.
#[derive(Debug, Clone, PartialEq)]
pub struct FireOutcome<T> {
    pub transition: TransitionId,
    pub name: String,
    /// `(source place, token)` in argument-edge order.
    pub consumed: Vec<(PlaceId, T)>,
    /// `(destination place, token)` in append order.
    pub produced: Vec<(PlaceId, T)>,
}

pub fn fire<T: Token>(
    graph: &mut ExecutableGraph<T>,
    transition: TransitionId,
) -> Result<FireOutcome<T>, EngineError> {
    fire_with(graph, transition, FirePolicy::default())
}

/// Fires `transition` atomically.
///
/// Inputs are popped from the end of each source place, the function runs,
/// the result is distributed. If any step fails the popped tokens are put
/// back and nothing is produced, so the graph is unchanged on `Err`.
pub fn fire_with<T: Token>(
    graph: &mut ExecutableGraph<T>,
    transition: TransitionId,
    policy: FirePolicy,
) -> Result<FireOutcome<T>, EngineError> {
    let Some(node) = graph.transitions().get(transition).cloned() else {
        return Err(EngineError::OutOfBounds(transition));
    };

    let sources: Vec<(String, PlaceId)> = graph
        .inputs_of(transition)
        .map(|edge| (edge.argument.clone(), edge.place))
        .collect();
    if sources.is_empty() {
        return Err(EngineError::NotEnabled {
            transition: node.name,
            place: String::new(),
        });
    }
    if let Some((_, empty)) = sources.iter().find(|(_, place)| graph.place(*place).is_empty()) {
        return Err(EngineError::NotEnabled {
            transition: node.name,
            place: graph.place(*empty).name.clone(),
        });
    }
    if !policy.permits(graph, transition) {
        return Err(EngineError::TokenCopyingDisallowed {
            transition: node.name,
            targets: graph.outputs_of(transition).len(),
        });
    }

    let mut bindings = Bindings::new();
    for (param, place) in &sources {
        match graph.place_mut(*place).tokens.pop() {
            Some(token) => bindings.bind(param, *place, token),
            None => {
                restore(graph, bindings);
                return Err(EngineError::NotEnabled {
                    transition: node.name,
                    place: graph.place(*place).name.clone(),
                });
            }
        }
    }

    let result = match node.call(&bindings) {
        Ok(result) => result,
        Err(source) => {
            restore(graph, bindings);
            log::debug!("transition `{}` failed, inputs restored", node.name);
            return Err(EngineError::TransitionFailed {
                transition: node.name,
                source,
            });
        }
    };

    let produced = match plan_production(graph, transition, &node, result) {
        Ok(produced) => produced,
        Err(err) => {
            restore(graph, bindings);
            log::debug!("distribution of `{}` rejected: {}", node.name, err);
            return Err(err);
        }
    };

    for (place, token) in &produced {
        graph.place_mut(*place).tokens.push(token.clone());
    }

    log::debug!(
        "fired `{}`: consumed {}, produced {}",
        node.name,
        bindings.len(),
        produced.len()
    );

    Ok(FireOutcome {
        transition,
        name: node.name,
        consumed: bindings
            .into_entries()
            .into_iter()
            .map(|binding| (binding.place, binding.token))
            .collect(),
        produced,
    })
}

/// Destinations for `result`: the explicit distribution if the transition
/// has one, otherwise a copy for every return-edge target.
///
/// Does not touch the graph; every destination is resolved and type checked
/// before the caller appends anything.
pub(crate) fn plan_production<T: Token>(
    graph: &ExecutableGraph<T>,
    transition: TransitionId,
    node: &Transition<T>,
    result: T,
) -> Result<Vec<(PlaceId, T)>, EngineError> {
    let mut produced = Vec::new();

    match &node.distribution {
        Some(distribute) => {
            let distribution = distribute(result).map_err(|source| {
                EngineError::DistributionFailed {
                    transition: node.name.clone(),
                    source,
                }
            })?;
            for (name, tokens) in distribution.into_routes() {
                let place = graph
                    .place_id(&name)
                    .ok_or_else(|| EngineError::UnknownOutputPlace {
                        transition: node.name.clone(),
                        place: name.clone(),
                    })?;
                for token in tokens {
                    check_assignable(graph, node, place, &token)?;
                    produced.push((place, token));
                }
            }
        }
        None => {
            let targets = graph.outputs_of(transition);
            if targets.is_empty() {
                log::trace!("`{}` has no return edges, result discarded", node.name);
            }
            for &place in targets {
                check_assignable(graph, node, place, &result)?;
                produced.push((place, result.clone()));
            }
        }
    }

    Ok(produced)
}

fn check_assignable<T: Token>(
    graph: &ExecutableGraph<T>,
    node: &Transition<T>,
    place: PlaceId,
    token: &T,
) -> Result<(), EngineError> {
    let target = graph.place(place);
    if target.accepts(token) {
        Ok(())
    } else {
        Err(EngineError::TokenType {
            transition: node.name.clone(),
            place: target.name.clone(),
            declared: target.declared.to_string(),
        })
    }
}

fn restore<T: Token>(graph: &mut ExecutableGraph<T>, bindings: Bindings<T>) {
    for binding in bindings.into_entries().into_iter().rev() {
        graph.place_mut(binding.place).tokens.push(binding.token);
    }
}

impl<T> FireOutcome<T> {
    pub fn produced_into(&self, place: PlaceId) -> impl Iterator<Item = &T> {
        self.produced
            .iter()
            .filter(move |(target, _)| *target == place)
            .map(|(_, token)| token)
    }
}
