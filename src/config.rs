// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use url::Url;

pub const DEFAULT_CASES_URL: &str =
    "https://raw.githubusercontent.com/nytimes/covid-19-data/master/us-states.csv";
pub const DEFAULT_POPULATION_URL: &str =
    "https://raw.githubusercontent.com/jakevdp/data-USstates/master/state-population.csv";

/// Everything a run needs to know up front. Every field has a default so an
/// empty (or absent) YAML file reproduces the stock run.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub cases_url: String,
    pub population_url: String,
    /// Local lookup of state name → two-letter code. Relative paths are
    /// resolved against the working directory.
    pub state_codes_path: PathBuf,
    /// Length of the trailing average over daily new cases.
    pub window_days: usize,
    pub output_html: PathBuf,
    pub open_viewer: bool,
    pub chart: ChartConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartConfig {
    pub title: String,
    pub height: u32,
    pub low_color: String,
    pub high_color: String,
    pub legend_title: String,
    /// Per-frame duration during playback. Kept tiny on purpose: the stock
    /// plotly pacing is several hundred ms.
    pub frame_duration_ms: u32,
    pub transition_duration_ms: u32,
    pub plotly_js_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cases_url: DEFAULT_CASES_URL.to_string(),
            population_url: DEFAULT_POPULATION_URL.to_string(),
            state_codes_path: PathBuf::from("csvData.csv"),
            window_days: 7,
            output_html: PathBuf::from("covid_map.html"),
            open_viewer: true,
            chart: ChartConfig::default(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: "Cases per Capita by State".to_string(),
            height: 600,
            low_color: "yellow".to_string(),
            high_color: "red".to_string(),
            legend_title: "Cases per Capita".to_string(),
            frame_duration_ms: 1,
            transition_duration_ms: 1,
            plotly_js_url: "https://cdn.plot.ly/plotly-2.35.2.min.js".to_string(),
        }
    }
}

impl Config {
    /// Read a YAML config file. Missing keys fall back to defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let cfg = Self::from_yaml_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        // serde_yaml treats an empty document as unit, not an empty map
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Self = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values that would only blow up later in the pipeline.
    pub fn validate(&self) -> Result<()> {
        self.cases_url()?;
        self.population_url()?;
        if self.window_days == 0 {
            anyhow::bail!("window_days must be at least 1");
        }
        Ok(())
    }

    pub fn cases_url(&self) -> Result<Url> {
        Url::parse(&self.cases_url).with_context(|| format!("parsing cases_url {}", self.cases_url))
    }

    pub fn population_url(&self) -> Result<Url> {
        Url::parse(&self.population_url)
            .with_context(|| format!("parsing population_url {}", self.population_url))
    }

    /// `state_codes_path` made absolute against the current working directory.
    pub fn resolved_state_codes_path(&self) -> Result<PathBuf> {
        if self.state_codes_path.is_absolute() {
            return Ok(self.state_codes_path.clone());
        }
        let cwd = std::env::current_dir().context("reading current working directory")?;
        Ok(cwd.join(&self.state_codes_path))
    }
}
