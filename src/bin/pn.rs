use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::mpsc;

use petriflow::animation::{NativePalette, TokenPalette};
use petriflow::config::FlowConfig;
use petriflow::demos::{coloured_balls, match_up};
use petriflow::engine::{CancelFlag, SharedGraph, execute_with};
use petriflow::layout::layout_with;
use petriflow::net::io::{to_json_string, to_ron_string, write_json, write_ron};
use petriflow::net::{ExecutableGraph, Token};
use petriflow::options::{DemoKind, Options, OutputFormat};
use petriflow::runner::{PacedRunner, RunEvent};
use petriflow::view::RenderableGraph;

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var("PN_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PN_LOG")
            .write_style("PN_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    let mut flags = shellwords::split(&std::env::var("PN_FLAGS").unwrap_or_default())
        .context("PN_FLAGS has mismatched quotes")?;
    flags.extend(std::env::args().skip(1));
    let options = Options::parse_from_args(&flags)?;
    log::debug!("PN options: {:?}", options);

    let mut config = FlowConfig::load_from_file(&options.config)?;
    options.apply(&mut config);

    match options.demo {
        DemoKind::ColouredBalls => {
            let graph = coloured_balls::create_initial_graph()?;
            run_demo(graph, NativePalette, &options, &config).await
        }
        DemoKind::MatchUp => {
            let graph = match_up::create_initial_graph()?;
            run_demo(graph, NativePalette, &options, &config).await
        }
    }
}

async fn run_demo<T, P>(
    mut graph: ExecutableGraph<T>,
    palette: P,
    options: &Options,
    config: &FlowConfig,
) -> Result<()>
where
    T: Token + Serialize,
    P: TokenPalette<T>,
{
    graph.log_diagnostics();
    match &options.dot {
        Some(Some(path)) => {
            graph
                .write_dot(path)
                .with_context(|| format!("cannot write {}", path))?;
            log::info!("graph written to {}", path);
            return Ok(());
        }
        Some(None) => {
            println!("{}", graph.to_dot());
            return Ok(());
        }
        None => {}
    }

    let positions = layout_with(&graph, config.run.margin, &config.layout);
    let view = RenderableGraph::build_with(&graph, &positions, &palette, &config.layout)?;
    println!("{}", serde_json::to_string(&view)?);

    let mut selector = config.run.selector.build(config.run.seed);
    let cancel = CancelFlag::new();

    if options.animate {
        let runner = PacedRunner::new(SharedGraph::new(graph), positions, palette)
            .with_options(config.run.execute_options())
            .with_step_delay(config.run.step_delay())
            .with_token_radius(config.layout.token_radius);
        let (tx, mut rx) = mpsc::channel(16);
        let print = async {
            while let Some(event) = rx.recv().await {
                match event {
                    RunEvent::Preview(plan) => println!("{}", plan.to_json()?),
                    RunEvent::Fired {
                        transition,
                        generation,
                        ..
                    } => log::info!("fired `{}` (generation {})", transition, generation),
                    RunEvent::Stale { transition } => {
                        log::warn!("preview of `{}` went stale", transition)
                    }
                }
            }
            Ok::<_, serde_json::Error>(())
        };
        let (report, printed) = tokio::join!(runner.run(&mut *selector, &cancel, tx), print);
        printed?;
        let report = report?;
        println!("fired {} transitions ({:?})", report.fired, report.stop);
        graph = runner.graph().clone_graph()?;
    } else {
        let report = execute_with(
            &mut graph,
            &config.run.execute_options(),
            &mut *selector,
            &cancel,
        )?;
        println!("fired {} transitions ({:?})", report.fired, report.stop);
    }

    let snapshot = graph.snapshot();
    let rendered = match options.format {
        OutputFormat::Json => to_json_string(&snapshot)?,
        OutputFormat::Ron => to_ron_string(&snapshot)?,
    };
    println!("{}", rendered);

    if let Some(path) = &options.snapshot {
        match options.format {
            OutputFormat::Json => write_json(path, &snapshot)?,
            OutputFormat::Ron => write_ron(path, &snapshot)?,
        }
        log::info!("snapshot written to {}", path);
    }
    Ok(())
}
