//! 令牌流图: 图模型、执行引擎、动画预演与分层布局.

pub mod animation;
pub mod config;
pub mod demos;
pub mod engine;
pub mod layout;
pub mod net;
pub mod options;
pub mod runner;
pub mod view;

pub use animation::{AnimationPlan, Color, TokenPalette, predict_fire};
pub use engine::{
    EngineError, FireOutcome, SharedGraph, execute, fire, get_enabled_transitions, is_enabled,
};
pub use layout::{Positions, layout, token_offset};
pub use net::{ExecutableGraph, GraphConstructionError, GraphSpec, Token, construct_graph};
pub use view::RenderableGraph;
