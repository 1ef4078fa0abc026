//! 多线程共享的图: 读写锁 + 代数计数, 供渲染线程与执行线程并发访问.
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::engine::execute::{
    CancelFlag, ExecuteOptions, ExecuteReport, FireSelector, StopReason, step,
};
use crate::engine::fire::{EngineError, FireOutcome, FirePolicy, fire_with};
use crate::net::core::ExecutableGraph;
use crate::net::ids::TransitionId;
use crate::net::token::Token;

struct Inner<T: Token> {
    graph: ExecutableGraph<T>,
    /// Bumped on every mutation, so observers can tell whether what they
    /// read is still current.
    generation: u64,
}

/// A graph behind a lock. Readers see it either before or after a firing,
/// never in between.
pub struct SharedGraph<T: Token> {
    inner: Arc<RwLock<Inner<T>>>,
}

impl<T: Token> Clone for SharedGraph<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Read access together with the generation it was taken at.
pub struct GraphView<'a, T: Token> {
    guard: RwLockReadGuard<'a, Inner<T>>,
}

impl<T: Token> GraphView<'_, T> {
    pub fn graph(&self) -> &ExecutableGraph<T> {
        &self.guard.graph
    }

    pub fn generation(&self) -> u64 {
        self.guard.generation
    }
}

impl<T: Token> SharedGraph<T> {
    pub fn new(graph: ExecutableGraph<T>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                graph,
                generation: 0,
            })),
        }
    }

    fn read_guard(&self) -> Result<RwLockReadGuard<'_, Inner<T>>, EngineError> {
        self.inner.read().map_err(|_| EngineError::LockPoisoned)
    }

    fn write_guard(&self) -> Result<RwLockWriteGuard<'_, Inner<T>>, EngineError> {
        self.inner.write().map_err(|_| EngineError::LockPoisoned)
    }

    pub fn read(&self) -> Result<GraphView<'_, T>, EngineError> {
        Ok(GraphView {
            guard: self.read_guard()?,
        })
    }

    pub fn generation(&self) -> Result<u64, EngineError> {
        Ok(self.read_guard()?.generation)
    }

    /// Copy of the current graph, for work that must not hold the lock.
    pub fn clone_graph(&self) -> Result<ExecutableGraph<T>, EngineError> {
        Ok(self.read_guard()?.graph.clone())
    }

    pub fn fire(
        &self,
        transition: TransitionId,
        policy: FirePolicy,
    ) -> Result<FireOutcome<T>, EngineError> {
        let mut inner = self.write_guard()?;
        let outcome = fire_with(&mut inner.graph, transition, policy)?;
        inner.generation += 1;
        Ok(outcome)
    }

    /// Fires only if nothing changed since `generation` was observed.
    /// `Ok(None)` means the caller's view is stale.
    pub fn fire_if_current(
        &self,
        generation: u64,
        transition: TransitionId,
        policy: FirePolicy,
    ) -> Result<Option<FireOutcome<T>>, EngineError> {
        let mut inner = self.write_guard()?;
        if inner.generation != generation {
            log::debug!(
                "skipping {:?}: graph moved from generation {} to {}",
                transition,
                generation,
                inner.generation
            );
            return Ok(None);
        }
        let outcome = fire_with(&mut inner.graph, transition, policy)?;
        inner.generation += 1;
        Ok(Some(outcome))
    }

    /// Same loop as [`crate::engine::execute_with`], taking the write lock
    /// once per firing so readers can interleave.
    pub fn execute(
        &self,
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
            let mut inner = self.write_guard()?;
            match step(&mut inner.graph, policy, selector)? {
                Some(_) => {
                    inner.generation += 1;
                    fired += 1;
                }
                None => break StopReason::Exhausted,
            }
        };
        Ok(ExecuteReport { fired, stop })
    }

    /// Replaces the whole graph, e.g. to restart a demo.
    pub fn reset(&self, graph: ExecutableGraph<T>) -> Result<(), EngineError> {
        let mut inner = self.write_guard()?;
        inner.graph = graph;
        inner.generation += 1;
        log::info!("graph reset (generation {})", inner.generation);
        Ok(())
    }
}
