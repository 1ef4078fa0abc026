//! 两个参考图: 彩球工厂与字符串/长度配对. 令牌类型自带调色板.

pub mod coloured_balls;
pub mod match_up;
