//! Optional TOML configuration layered beneath command-line flags.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use virus_smash_system_autoplay::Config as AutoplayConfig;

/// Contents of a configuration file. Every section and key is optional.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub(crate) session: SessionSection,
    pub(crate) autoplay: AutoplayConfig,
    pub(crate) simulation: SimulationSection,
    pub(crate) report: ReportSection,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SessionSection {
    /// Seed of the spawn stream; drawn at random when absent.
    pub(crate) seed: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SimulationSection {
    /// Length of a simulated frame in milliseconds.
    pub(crate) tick_ms: u64,
    /// Hard stop for headless runs, in simulated seconds.
    pub(crate) max_secs: u64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            tick_ms: 50,
            max_secs: 300,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ReportSection {
    /// JSON-lines file that receives finished scores.
    pub(crate) scores_path: Option<PathBuf>,
}

impl FileConfig {
    /// Loads the file at `path`, or the defaults when no path is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid virus smash configuration")
    }
}
