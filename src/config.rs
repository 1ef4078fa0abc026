use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::engine::execute::{ExecuteOptions, SelectorKind};
use crate::layout::{DEFAULT_MARGIN, LayoutConfig};

/// `pn.toml`: a `[layout]` and a `[run]` table, both optional.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct FlowConfig {
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RunConfig {
    #[serde(default)]
    pub max_transitions: Option<usize>,
    #[serde(default = "default_allow_token_copying")]
    pub allow_token_copying: bool,
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    #[serde(default)]
    pub selector: SelectorKind,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_margin")]
    pub margin: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_transitions: None,
            allow_token_copying: default_allow_token_copying(),
            step_delay_ms: default_step_delay_ms(),
            selector: SelectorKind::default(),
            seed: 0,
            margin: default_margin(),
        }
    }
}

impl RunConfig {
    pub fn execute_options(&self) -> ExecuteOptions {
        ExecuteOptions {
            max_transitions: self.max_transitions,
            allow_token_copying: self.allow_token_copying,
        }
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

impl FlowConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

fn default_allow_token_copying() -> bool {
    true
}

fn default_step_delay_ms() -> u64 {
    800
}

fn default_margin() -> f64 {
    DEFAULT_MARGIN
}
