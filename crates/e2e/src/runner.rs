//! Main test runner: loads suites, fans scenarios out to an engine, reports

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::config::{EngineKind, HarnessConfig};
use crate::engine::{Engine, ScenarioResult, SimulatedEngine};
use crate::error::{E2eError, E2eResult};
use crate::playwright::PlaywrightEngine;
use crate::spec::{NameFilter, Scenario, ScenarioSuite};

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl TestSuiteResult {
    pub fn from_results(results: Vec<ScenarioResult>, duration_ms: u64) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            skipped: 0,
            duration_ms,
            results,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: Arc<HarnessConfig>,
    engine: Arc<dyn Engine>,
}

impl TestRunner {
    /// Create a runner with the engine the configuration names
    pub fn new(config: HarnessConfig) -> E2eResult<Self> {
        let config = Arc::new(config);
        let engine: Arc<dyn Engine> = match config.engine {
            EngineKind::Sim => Arc::new(SimulatedEngine::new(Arc::clone(&config))),
            EngineKind::Playwright => Arc::new(PlaywrightEngine::new(Arc::clone(&config))?),
        };
        Ok(Self { config, engine })
    }

    pub fn with_engine(config: HarnessConfig, engine: Arc<dyn Engine>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
        }
    }

    /// Run all scenarios in the scenarios directory
    pub async fn run_all(&self) -> E2eResult<TestSuiteResult> {
        let suites = ScenarioSuite::load_all(&self.config.scenarios_dir)?;
        Ok(self.run_suites(&suites).await)
    }

    /// Run scenarios matching a tag
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<TestSuiteResult> {
        let suites = ScenarioSuite::load_all(&self.config.scenarios_dir)?;
        let filtered = ScenarioSuite::filter_by_tag(&suites, tag);
        Ok(self.run_suites(&filtered).await)
    }

    /// Run the scenarios carrying `tag` (when given) whose names pass `filter`
    pub async fn run_selected(&self, tag: Option<&str>, filter: &NameFilter) -> E2eResult<TestSuiteResult> {
        let suites = self.select(tag, filter)?;
        Ok(self.run_suites(&suites).await)
    }

    /// `suite/scenario` names that [`TestRunner::run_selected`] would run
    pub fn list(&self, tag: Option<&str>, filter: &NameFilter) -> E2eResult<Vec<String>> {
        Ok(self
            .select(tag, filter)?
            .iter()
            .flat_map(|suite| {
                suite
                    .scenarios
                    .iter()
                    .map(move |scenario| ScenarioResult::qualified_name(suite, scenario))
            })
            .collect())
    }

    fn select(&self, tag: Option<&str>, filter: &NameFilter) -> E2eResult<Vec<ScenarioSuite>> {
        let mut suites = ScenarioSuite::load_all(&self.config.scenarios_dir)?;
        if let Some(tag) = tag {
            suites = ScenarioSuite::filter_by_tag(&suites, tag);
        }
        if !filter.is_empty() {
            suites = ScenarioSuite::filter_by_name(&suites, filter);
        }
        Ok(suites)
    }

    /// Run one scenario, by its own name or as `suite/scenario`
    pub async fn run_test(&self, name: &str) -> E2eResult<ScenarioResult> {
        let suites = ScenarioSuite::load_all(&self.config.scenarios_dir)?;
        let (suite, scenario) = suites
            .iter()
            .flat_map(|suite| suite.scenarios.iter().map(move |scenario| (suite, scenario)))
            .find(|(suite, scenario)| {
                scenario.name == name || ScenarioResult::qualified_name(suite, scenario) == name
            })
            .ok_or_else(|| E2eError::SpecParse(format!("Test not found: {}", name)))?;

        Ok(self.run_scenario(suite, scenario).await)
    }

    /// Run every scenario of the given suites, `workers` at a time.
    /// Results keep suite order.
    pub async fn run_suites(&self, suites: &[ScenarioSuite]) -> TestSuiteResult {
        let start = Instant::now();
        let jobs: Vec<(&ScenarioSuite, &Scenario)> = suites
            .iter()
            .flat_map(|suite| suite.scenarios.iter().map(move |scenario| (suite, scenario)))
            .collect();

        info!(
            "Running {} scenario(s) on the {} engine...",
            jobs.len(),
            self.engine.name()
        );

        let results: Vec<ScenarioResult> = stream::iter(jobs)
            .map(|(suite, scenario)| self.run_scenario(suite, scenario))
            .buffered(self.config.workers.max(1))
            .collect()
            .await;

        let summary = TestSuiteResult::from_results(results, start.elapsed().as_millis() as u64);

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            summary.passed, summary.failed, summary.skipped, summary.duration_ms
        );
        summary
    }

    /// Run one scenario; a harness error fails only that scenario
    async fn run_scenario(&self, suite: &ScenarioSuite, scenario: &Scenario) -> ScenarioResult {
        let result = match self.engine.run_scenario(suite, scenario).await {
            Ok(result) => result,
            Err(e) => ScenarioResult::aborted(ScenarioResult::qualified_name(suite, scenario), &e),
        };

        if result.success {
            info!("✓ {} ({} ms)", result.name, result.duration_ms);
        } else {
            error!(
                "✗ {} - {}",
                result.name,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
        result
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
