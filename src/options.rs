//! Parsing Options.
//! `pn <demo> [--max N] [--no-copy] [--format json|ron] [--dot [FILE]] [--snapshot FILE]
//!     [--config FILE] [--animate]`;
//! extra flags may also come from the `PN_FLAGS` environment variable.

use anyhow::{Result, anyhow};
use clap::{Arg, ArgAction, Command};

use crate::config::FlowConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoKind {
    ColouredBalls,
    MatchUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Ron,
}

const STDOUT: &str = "-";

fn make_options_parser() -> Command {
    Command::new("pn")
        .no_binary_name(true)
        .version("v0.1.0")
        .about("Runs a token-flow demo graph")
        .arg(
            Arg::new("demo")
                .help("Which demo graph to build")
                .required(true)
                .value_parser(["balls", "match-up"]),
        )
        .arg(
            Arg::new("max")
                .short('m')
                .long("max")
                .value_name("N")
                .help("Stop after N firings")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("no-copy")
                .long("no-copy")
                .help("Refuse to duplicate a result into several places")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .help("Snapshot format")
                .default_value("json")
                .value_parser(["json", "ron"]),
        )
        .arg(
            Arg::new("dot")
                .long("dot")
                .value_name("FILE")
                .help("Write the graph in Graphviz format (to stdout without FILE) and exit")
                .num_args(0..=1)
                .default_missing_value(STDOUT),
        )
        .arg(
            Arg::new("snapshot")
                .short('s')
                .long("snapshot")
                .value_name("FILE")
                .help("Also write the final snapshot to FILE"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to the TOML configuration")
                .default_value("pn.toml"),
        )
        .arg(
            Arg::new("animate")
                .short('a')
                .long("animate")
                .help("Run with pacing and print every animation plan")
                .action(ArgAction::SetTrue),
        )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub demo: DemoKind,
    pub max_transitions: Option<usize>,
    pub no_copy: bool,
    pub format: OutputFormat,
    /// Graphviz output; `None` means stdout.
    pub dot: Option<Option<String>>,
    pub snapshot: Option<String>,
    pub config: String,
    pub animate: bool,
}

impl Options {
    pub fn parse_from_str(s: &str) -> Result<Self> {
        let flags = shellwords::split(s)?;
        Self::parse_from_args(&flags)
    }

    pub fn parse_from_args(flags: &[String]) -> Result<Self> {
        let app = make_options_parser();
        let matches = app.try_get_matches_from(flags.iter())?;
        let demo = match matches.get_one::<String>("demo").map(String::as_str) {
            Some("balls") => DemoKind::ColouredBalls,
            Some("match-up") => DemoKind::MatchUp,
            other => return Err(anyhow!("unsupported demo {:?}", other)),
        };
        let format = match matches.get_one::<String>("format").map(String::as_str) {
            Some("ron") => OutputFormat::Ron,
            _ => OutputFormat::Json,
        };
        let config = matches
            .get_one::<String>("config")
            .cloned()
            .unwrap_or_default();

        Ok(Options {
            demo,
            max_transitions: matches.get_one::<usize>("max").copied(),
            no_copy: matches.get_flag("no-copy"),
            format,
            dot: matches
                .get_one::<String>("dot")
                .map(|path| (path != STDOUT).then(|| path.clone())),
            snapshot: matches.get_one::<String>("snapshot").cloned(),
            config,
            animate: matches.get_flag("animate"),
        })
    }

    /// Command-line values win over the configuration file.
    pub fn apply(&self, config: &mut FlowConfig) {
        if self.max_transitions.is_some() {
            config.run.max_transitions = self.max_transitions;
        }
        if self.no_copy {
            config.run.allow_token_copying = false;
        }
    }
}
