//! 节奏化自动运行: 预演 → 等待动画 → 在图未变化时发生.
//!
//! 引擎本身没有挂起点; 等待只发生在两次发生之间, 且不持有任何锁.
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::animation::color::TokenPalette;
use crate::animation::predict::{AnimationPlan, PredictError, PredictOptions, predict_fire_with};
use crate::engine::execute::{
    CancelFlag, ExecuteOptions, ExecuteReport, FireSelector, StopReason, viable_transitions,
};
use crate::engine::fire::EngineError;
use crate::engine::shared::SharedGraph;
use crate::layout::{DEFAULT_TOKEN_RADIUS, Positions};
use crate::net::token::Token;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Predict(#[from] PredictError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// About to fire; play this before the next event arrives.
    Preview(AnimationPlan),
    Fired {
        transition: String,
        consumed: usize,
        produced: usize,
        generation: u64,
    },
    /// The graph changed while the preview was playing; nothing fired.
    Stale { transition: String },
}

pub struct PacedRunner<T: Token, P> {
    graph: SharedGraph<T>,
    positions: Positions,
    palette: P,
    options: ExecuteOptions,
    step_delay: Duration,
    token_radius: f64,
}

impl<T, P> PacedRunner<T, P>
where
    T: Token,
    P: TokenPalette<T>,
{
    pub fn new(graph: SharedGraph<T>, positions: Positions, palette: P) -> Self {
        Self {
            graph,
            positions,
            palette,
            options: ExecuteOptions::default(),
            step_delay: Duration::from_millis(500),
            token_radius: DEFAULT_TOKEN_RADIUS,
        }
    }

    pub fn with_options(mut self, options: ExecuteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    pub fn with_token_radius(mut self, token_radius: f64) -> Self {
        self.token_radius = token_radius;
        self
    }

    pub fn graph(&self) -> &SharedGraph<T> {
        &self.graph
    }

    /// Runs until nothing is viable, the firing limit is hit or `cancel`
    /// is raised. A closed event channel counts as cancellation. The first
    /// error ends the run; the graph is left as it was before that firing.
    pub async fn run(
        &self,
        selector: &mut dyn FireSelector,
        cancel: &CancelFlag,
        events: mpsc::Sender<RunEvent>,
    ) -> Result<ExecuteReport, RunError> {
        let policy = self.options.policy();
        let predict = PredictOptions {
            policy,
            token_radius: self.token_radius,
        };
        let mut fired = 0;

        let stop = loop {
            if self.options.limit_reached(fired) {
                break StopReason::LimitReached;
            }
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            let (transition, generation, plan) = {
                let view = self.graph.read()?;
                let candidates = viable_transitions(view.graph(), policy);
                let Some(transition) = selector.select(&candidates) else {
                    break StopReason::Exhausted;
                };
                let plan = predict_fire_with(
                    view.graph(),
                    transition,
                    &self.positions,
                    &self.palette,
                    predict,
                )?;
                (transition, view.generation(), plan)
            };

            let name = plan.transition.clone();
            if events.send(RunEvent::Preview(plan)).await.is_err() {
                log::debug!("event receiver dropped, stopping run");
                break StopReason::Cancelled;
            }
            tokio::time::sleep(self.step_delay).await;
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            let event = match self.graph.fire_if_current(generation, transition, policy)? {
                Some(outcome) => {
                    fired += 1;
                    RunEvent::Fired {
                        transition: outcome.name,
                        consumed: outcome.consumed.len(),
                        produced: outcome.produced.len(),
                        generation: generation + 1,
                    }
                }
                None => RunEvent::Stale { transition: name },
            };
            if events.send(event).await.is_err() {
                break StopReason::Cancelled;
            }
        };

        log::info!("paced run finished: {} fired ({:?})", fired, stop);
        Ok(ExecuteReport { fired, stop })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::color::DefaultPalette;
    use crate::engine::execute::LastEnabled;
    use crate::engine::fire::FirePolicy;
    use crate::layout::layout;
    use crate::net::builder::{GraphSpec, construct_graph};
    use crate::net::core::ExecutableGraph;
    use crate::net::token::ScalarKind;

    fn pipeline(input: Vec<i64>) -> ExecutableGraph<i64> {
        construct_graph(vec![
            GraphSpec::place("Input", ScalarKind::Int, input),
            GraphSpec::argument("Input", "Process", "x"),
            GraphSpec::transition("Process", ["x"], |args| Ok(args.get("x")? * 10)),
            GraphSpec::output("Process", "Output"),
            GraphSpec::place("Output", ScalarKind::Int, vec![]),
        ])
        .unwrap()
    }

    fn runner(graph: ExecutableGraph<i64>) -> PacedRunner<i64, DefaultPalette> {
        let positions = layout(&graph, 60.0);
        PacedRunner::new(SharedGraph::new(graph), positions, DefaultPalette)
            .with_step_delay(Duration::from_millis(1))
    }

    async fn collect(mut rx: mpsc::Receiver<RunEvent>) -> Vec<RunEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn previews_each_firing_before_it_happens() {
        let runner = runner(pipeline(vec![1, 2]));
        let (tx, rx) = mpsc::channel(16);
        let cancel = CancelFlag::new();
        let mut selector = LastEnabled;
        let (report, events) = tokio::join!(runner.run(&mut selector, &cancel, tx), collect(rx));

        let report = report.unwrap();
        assert_eq!(report.fired, 2);
        assert_eq!(report.stop, StopReason::Exhausted);
        assert_eq!(events.len(), 4);
        match &events[0] {
            RunEvent::Preview(plan) => assert_eq!(plan.input_tokens[0].id, "token-Input-1"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(&events[1], RunEvent::Fired { generation: 1, .. }));
        let graph = runner.graph().clone_graph().unwrap();
        assert_eq!(graph.tokens("Output"), Some(&[20, 10][..]));
    }

    #[tokio::test]
    async fn respects_the_firing_limit() {
        let runner = runner(pipeline(vec![1, 2, 3])).with_options(ExecuteOptions {
            max_transitions: Some(1),
            allow_token_copying: true,
        });
        let (tx, rx) = mpsc::channel(16);
        let cancel = CancelFlag::new();
        let mut selector = LastEnabled;
        let (report, _) = tokio::join!(runner.run(&mut selector, &cancel, tx), collect(rx));
        assert_eq!(report.unwrap().stop, StopReason::LimitReached);
        assert_eq!(runner.graph().generation().unwrap(), 1);
    }

    #[tokio::test]
    async fn cancelled_run_fires_nothing_more() {
        let runner = runner(pipeline(vec![1, 2, 3]));
        let cancel = CancelFlag::new();
        cancel.cancel();
        let (tx, rx) = mpsc::channel(16);
        let mut selector = LastEnabled;
        let (report, events) = tokio::join!(runner.run(&mut selector, &cancel, tx), collect(rx));
        assert_eq!(report.unwrap().stop, StopReason::Cancelled);
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn outside_change_during_preview_skips_the_firing() {
        let runner = runner(pipeline(vec![1, 2])).with_step_delay(Duration::from_millis(20));
        let shared = runner.graph().clone();
        let process = shared.read().unwrap().graph().transition_id("Process").unwrap();
        let (tx, mut rx) = mpsc::channel(16);

        let interfere = async {
            let mut events = Vec::new();
            let mut interfered = false;
            while let Some(event) = rx.recv().await {
                if matches!(event, RunEvent::Preview(_)) && !interfered {
                    shared.fire(process, FirePolicy::default()).unwrap();
                    interfered = true;
                }
                events.push(event);
            }
            events
        };
        let cancel = CancelFlag::new();
        let mut selector = LastEnabled;
        let (report, events) = tokio::join!(runner.run(&mut selector, &cancel, tx), interfere);

        assert_eq!(report.unwrap().fired, 1);
        assert!(matches!(&events[1], RunEvent::Stale { transition } if transition == "Process"));
        assert_eq!(shared.clone_graph().unwrap().tokens("Output"), Some(&[20, 10][..]));
    }

    #[tokio::test]
    async fn transition_failure_ends_the_run() {
        let graph = construct_graph(vec![
            GraphSpec::place("Input", ScalarKind::Int, vec![1i64]),
            GraphSpec::argument("Input", "Fail", "x"),
            GraphSpec::transition("Fail", ["x"], |_| anyhow::bail!("boom")),
        ])
        .unwrap();
        let runner = runner(graph);
        let (tx, rx) = mpsc::channel(16);
        let cancel = CancelFlag::new();
        let mut selector = LastEnabled;
        let (report, _) = tokio::join!(runner.run(&mut selector, &cancel, tx), collect(rx));
        assert!(matches!(report, Err(RunError::Predict(PredictError::Engine(_)))));
        assert_eq!(runner.graph().clone_graph().unwrap().tokens("Input"), Some(&[1][..]));
    }
}
