//! # 动画预演
//!
//! 只读地复现执行引擎的发生规则 (LIFO 取令牌, 同样的分发策略), 把结果
//! 转成带屏幕坐标与颜色的 [`AnimationPlan`], 供前端播放.

pub mod color;
pub mod predict;

pub use color::{Color, Colored, DefaultPalette, NativePalette, TokenPalette};
pub use predict::{
    AnimationKind, AnimationPlan, InputToken, OutputToken, Point, PredictError, PredictOptions,
    predict_fire, predict_fire_with, token_id,
};
