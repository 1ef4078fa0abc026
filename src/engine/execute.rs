//! 重复发生: 选择策略、次数上限与协作式取消.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::engine::fire::{EngineError, FireOutcome, FirePolicy, fire_with};
use crate::net::core::ExecutableGraph;
use crate::net::ids::TransitionId;
use crate::net::token::Token;

/// Picks one transition out of the viable ones (declaration order).
pub trait FireSelector {
    fn select(&mut self, candidates: &[TransitionId]) -> Option<TransitionId>;
}

/// Fixed tie-break: the last viable transition in declaration order.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastEnabled;

impl FireSelector for LastEnabled {
    fn select(&mut self, candidates: &[TransitionId]) -> Option<TransitionId> {
        candidates.last().copied()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FirstEnabled;

impl FireSelector for FirstEnabled {
    fn select(&mut self, candidates: &[TransitionId]) -> Option<TransitionId> {
        candidates.first().copied()
    }
}

/// Uniform choice from a seeded generator; the same seed replays the same run.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl FireSelector for SeededRandom {
    fn select(&mut self, candidates: &[TransitionId]) -> Option<TransitionId> {
        if candidates.is_empty() {
            return None;
        }
        Some(candidates[self.rng.random_range(0..candidates.len())])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorKind {
    #[default]
    Last,
    First,
    Random,
}

impl SelectorKind {
    pub fn build(self, seed: u64) -> Box<dyn FireSelector + Send> {
        match self {
            SelectorKind::Last => Box::new(LastEnabled),
            SelectorKind::First => Box::new(FirstEnabled),
            SelectorKind::Random => Box::new(SeededRandom::new(seed)),
        }
    }
}

/// Shared stop request, checked between firings.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteOptions {
    pub max_transitions: Option<usize>,
    pub allow_token_copying: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            max_transitions: None,
            allow_token_copying: true,
        }
    }
}

impl ExecuteOptions {
    pub fn policy(&self) -> FirePolicy {
        FirePolicy {
            allow_token_copying: self.allow_token_copying,
        }
    }

    pub fn limit_reached(&self, fired: usize) -> bool {
        self.max_transitions.is_some_and(|max| fired >= max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// No viable transition is left.
    Exhausted,
    LimitReached,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteReport {
    pub fired: usize,
    pub stop: StopReason,
}

/// Enabled transitions the policy lets fire, in declaration order.
pub fn viable_transitions<T: Token>(
    graph: &ExecutableGraph<T>,
    policy: FirePolicy,
) -> Vec<TransitionId> {
    graph
        .enabled_transitions()
        .into_iter()
        .filter(|&transition| policy.permits(graph, transition))
        .collect()
}

/// Selects and fires one transition; `Ok(None)` when nothing is viable.
pub fn step<T: Token>(
    graph: &mut ExecutableGraph<T>,
    policy: FirePolicy,
    selector: &mut dyn FireSelector,
) -> Result<Option<FireOutcome<T>>, EngineError> {
    let candidates = viable_transitions(graph, policy);
    match selector.select(&candidates) {
        Some(transition) => fire_with(graph, transition, policy).map(Some),
        None => Ok(None),
    }
}

/// Fires with the last-enabled tie-break until nothing is viable or
/// `max_transitions` is reached. Returns the number fired.
pub fn execute<T: Token>(
    graph: &mut ExecutableGraph<T>,
    max_transitions: Option<usize>,
    allow_token_copying: bool,
) -> Result<usize, EngineError> {
    let options = ExecuteOptions {
        max_transitions,
        allow_token_copying,
    };
    execute_with(graph, &options, &mut LastEnabled, &CancelFlag::new()).map(|report| report.fired)
}

pub fn execute_with<T: Token>(
    graph: &mut ExecutableGraph<T>,
    options: &ExecuteOptions,
    selector: &mut dyn FireSelector,
    cancel: &CancelFlag,
) -> Result<ExecuteReport, EngineError> {
    let policy = options.policy();
    let mut fired = 0;

    let stop = loop {
        if options.limit_reached(fired) {
            break StopReason::LimitReached;
        }
        if cancel.is_cancelled() {
            break StopReason::Cancelled;
        }
        match step(graph, policy, selector) {
            Ok(Some(_)) => fired += 1,
            Ok(None) => break StopReason::Exhausted,
            Err(err) => {
                log::warn!("execution stopped after {} firings: {}", fired, err);
                return Err(err);
            }
        }
    };

    log::info!("execution finished: {} fired ({:?})", fired, stop);
    Ok(ExecuteReport { fired, stop })
}
