//! Command line of the `e2e` scenario runner
//!
//! The runner is a `harness = false` test target, so `cargo test` hands it
//! libtest arguments as well: positional name filters and flags such as
//! `--exact`, `--skip <name>` or `--nocapture`. Filters select scenarios by
//! their `suite/scenario` name; the remaining libtest flags are accepted and
//! ignored.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{EngineKind, HarnessConfig};
use crate::error::E2eResult;
use crate::playwright::Browser;
use crate::spec::NameFilter;

#[derive(Parser, Debug)]
#[command(name = "farmplot-e2e")]
#[command(about = "E2E scenarios for the farm plot creation form")]
pub struct RunnerArgs {
    /// Path to scenario suites directory
    #[arg(short, long, env = "FARMPLOT_E2E_SCENARIOS")]
    pub scenarios: Option<PathBuf>,

    /// Run only scenarios matching this tag
    #[arg(short, long, env = "FARMPLOT_E2E_TAG")]
    pub tag: Option<String>,

    /// Run only a specific scenario, `name` or `suite/name`
    #[arg(short, long, env = "FARMPLOT_E2E_NAME")]
    pub name: Option<String>,

    /// Engine that executes scenarios
    #[arg(long, value_enum, env = "FARMPLOT_E2E_ENGINE")]
    pub engine: Option<EngineKind>,

    /// Harness configuration file
    #[arg(long, env = "FARMPLOT_E2E_CONFIG", default_value = "e2e.toml")]
    pub config: PathBuf,

    /// Scenarios run concurrently
    #[arg(long, env = "FARMPLOT_E2E_WORKERS")]
    pub workers: Option<usize>,

    /// Origin of the app under test
    #[arg(long, env = "FARMPLOT_E2E_BASE_URL")]
    pub base_url: Option<String>,

    /// Browser to use with the playwright engine
    #[arg(long, value_enum, env = "FARMPLOT_E2E_BROWSER")]
    pub browser: Option<Browser>,

    /// Run the browser headless
    #[arg(long, env = "FARMPLOT_E2E_HEADLESS")]
    pub headless: Option<bool>,

    /// Output directory for results
    #[arg(short, long, env = "FARMPLOT_E2E_OUTPUT")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub libtest: LibtestArgs,
}

/// Arguments `cargo test` passes to every test target
#[derive(clap::Args, Debug, Default)]
pub struct LibtestArgs {
    /// Scenario name filters
    #[arg(hide = true)]
    pub filters: Vec<String>,

    #[arg(long, hide = true)]
    pub exact: bool,

    #[arg(long, hide = true)]
    pub skip: Vec<String>,

    /// Print scenario names instead of running them
    #[arg(long, hide = true)]
    pub list: bool,

    /// Run only ignored tests; no scenario is ever ignored
    #[arg(long, hide = true)]
    pub ignored: bool,

    #[arg(long, hide = true)]
    pub include_ignored: bool,

    #[arg(long, hide = true)]
    pub nocapture: bool,

    #[arg(long, hide = true)]
    pub show_output: bool,

    #[arg(short, long, hide = true)]
    pub quiet: bool,

    #[arg(long, hide = true)]
    pub report_time: bool,

    #[arg(long, hide = true)]
    pub shuffle: bool,

    #[arg(long, hide = true)]
    pub shuffle_seed: Option<String>,

    #[arg(long, hide = true)]
    pub test_threads: Option<String>,

    #[arg(long, hide = true)]
    pub color: Option<String>,

    #[arg(long, hide = true)]
    pub format: Option<String>,

    #[arg(long, hide = true)]
    pub logfile: Option<String>,

    #[arg(short = 'Z', hide = true)]
    pub unstable: Vec<String>,
}

impl LibtestArgs {
    pub fn name_filter(&self) -> NameFilter {
        NameFilter {
            include: self.filters.clone(),
            skip: self.skip.clone(),
            exact: self.exact,
        }
    }
}

impl RunnerArgs {
    /// Configuration file values, overridden by whatever was given
    pub fn to_config(&self) -> E2eResult<HarnessConfig> {
        let mut config = HarnessConfig::load(&self.config)?;

        if let Some(scenarios) = &self.scenarios {
            config.scenarios_dir = scenarios.clone();
        }
        if let Some(engine) = self.engine {
            config.engine = engine;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(browser) = self.browser {
            config.playwright.browser = browser;
        }
        if let Some(headless) = self.headless {
            config.playwright.headless = headless;
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        Ok(config)
    }
}
