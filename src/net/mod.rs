//! # 令牌流图模型
//!
//! 库所 (place) 持有有序令牌序列, 变迁 (transition) 是纯函数:
//! 按参数名从输入库所各取一个令牌, 产出结果并分发到输出库所.
//!
//! * 库所按 LIFO 使用: 新令牌追加到末尾, 发生时总是取末尾令牌;
//! * 变迁 **可发生** 当且仅当它至少有一条参数弧, 且每条参数弧的源库所非空;
//! * 未设置分发函数时, 结果复制到所有返回弧目标库所 (广播语义).
//!
//! 图由一组声明一次性构造 ([`construct_graph`]), 构造时完成全部名称解析与
//! 校验; 之后弧只保存句柄, 只有执行引擎会修改令牌.
//!
//! ## 示例
//!
//! ```rust
//! use petriflow::net::*;
//!
//! let graph = construct_graph(vec![
//!     GraphSpec::place("Input", ScalarKind::Int, vec![1i64, 2, 3]),
//!     GraphSpec::argument("Input", "Process", "x"),
//!     GraphSpec::transition("Process", ["x"], |args| Ok(*args.get("x")? * 2)),
//!     GraphSpec::output("Process", "Output"),
//!     GraphSpec::place("Output", ScalarKind::Int, vec![]),
//! ])
//! .unwrap();
//!
//! let process = graph.transition_id("Process").unwrap();
//! assert_eq!(graph.enabled_transitions(), vec![process]);
//! assert_eq!(graph.place(graph.place_id("Input").unwrap()).top(), Some(&3));
//! ```

pub mod builder;
pub mod core;
pub mod ids;
pub mod index_vec;
pub mod io;
pub mod structure;
pub mod token;

pub use builder::{GraphConstructionError, GraphSpec, construct_graph};
pub use self::core::{DiagnosticReport, ExecutableGraph};
pub use ids::{NodeId, PlaceId, TransitionId};
pub use index_vec::{Idx, IndexVec};
pub use io::{GraphSnapshot, IoError};
pub use structure::{
    ArgumentEdge, Binding, BindingError, Bindings, Distribution, Place, ReturnEdge, Transition,
};
pub use token::{JsonKind, ScalarKind, Token};
