//! # 执行引擎
//!
//! 只有本模块会修改令牌. 单次发生是原子的: 要么完整地消费并产出,
//! 要么失败且图保持不变.

pub mod execute;
pub mod fire;
pub mod shared;

pub use execute::{
    CancelFlag, ExecuteOptions, ExecuteReport, FireSelector, FirstEnabled, LastEnabled,
    SeededRandom, SelectorKind, StopReason, execute, execute_with, step, viable_transitions,
};
pub use fire::{EngineError, FireOutcome, FirePolicy, fire, fire_with};
pub use shared::{GraphView, SharedGraph};

use crate::net::core::ExecutableGraph;
use crate::net::ids::TransitionId;
use crate::net::token::Token;

pub fn is_enabled<T: Token>(graph: &ExecutableGraph<T>, transition: TransitionId) -> bool {
    graph.is_enabled(transition)
}

/// Enabled transitions in declaration order.
pub fn get_enabled_transitions<T: Token>(graph: &ExecutableGraph<T>) -> Vec<TransitionId> {
    graph.enabled_transitions()
}
