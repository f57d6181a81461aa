//! Scenario execution engines

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};
use crate::expect::{Expect, ExpectConfig};
use crate::mock::RouteMock;
use crate::page::Page;
use crate::sim::SimulatedPage;
use crate::spec::{Instruction, Scenario, ScenarioSuite};

/// Result of executing a scenario step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// `suite/scenario`
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
}

impl ScenarioResult {
    pub fn qualified_name(suite: &ScenarioSuite, scenario: &Scenario) -> String {
        format!("{}/{}", suite.name, scenario.name)
    }

    /// A scenario that could not run at all
    pub fn aborted(name: String, error: &E2eError) -> Self {
        Self {
            name,
            success: false,
            duration_ms: 0,
            steps: vec![],
            error: Some(error.to_string()),
        }
    }
}

/// Something that can execute a scenario against the form
#[async_trait]
pub trait Engine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run_scenario(
        &self,
        suite: &ScenarioSuite,
        scenario: &Scenario,
    ) -> E2eResult<ScenarioResult>;
}

/// Time a step and capture its error instead of propagating it
pub async fn timed_step<F>(step_name: String, step: F) -> StepResult
where
    F: Future<Output = E2eResult<()>>,
{
    let start = Instant::now();
    debug!("Executing step: {}", step_name);

    let result = step.await;
    let duration_ms = start.elapsed().as_millis() as u64;

    StepResult {
        success: result.is_ok(),
        step_name,
        duration_ms,
        error: result.err().map(|e| e.to_string()),
    }
}

/// Run one lowered instruction against a page
pub async fn execute(page: &dyn Page, instruction: &Instruction, expect: ExpectConfig) -> E2eResult<()> {
    match instruction {
        Instruction::Act(action) => action.perform(page).await,
        Instruction::Expect(expectation) => {
            Expect::new(page, &expectation.selector, expect)
                .check(&expectation.condition)
                .await
        }
        Instruction::Log(message) => {
            info!("[TEST LOG] {}", message);
            Ok(())
        }
    }
}

/// Runs scenarios on a fresh [`SimulatedPage`] each
pub struct SimulatedEngine {
    config: Arc<HarnessConfig>,
}

impl SimulatedEngine {
    pub fn new(config: Arc<HarnessConfig>) -> Self {
        Self { config }
    }

    /// Auth, routes, then navigation, in the order a browser test sets up
    async fn prepare(
        &self,
        page: &SimulatedPage,
        suite: &ScenarioSuite,
        scenario: &Scenario,
    ) -> E2eResult<Vec<Arc<RouteMock>>> {
        if let Some(auth) = suite.seeded_auth(&self.config.auth) {
            auth.install(page).await?;
        }

        let mut mocks = Vec::new();
        for route in &scenario.routes {
            let pattern = route.pattern.as_deref().unwrap_or(&self.config.route_pattern);
            let mock = Arc::new(RouteMock::new(pattern, route.response.clone())?);
            page.route(Arc::clone(&mock)).await?;
            mocks.push(mock);
        }
        Ok(mocks)
    }
}

#[async_trait]
impl Engine for SimulatedEngine {
    fn name(&self) -> &'static str {
        "sim"
    }

    async fn run_scenario(
        &self,
        suite: &ScenarioSuite,
        scenario: &Scenario,
    ) -> E2eResult<ScenarioResult> {
        let start = Instant::now();
        let name = ScenarioResult::qualified_name(suite, scenario);
        debug!("Running scenario: {}", name);

        let page = SimulatedPage::new(self.config.sim_config());
        let mocks = self.prepare(&page, suite, scenario).await?;
        let expect = self.config.expect();

        let url = self.config.form_url(suite.url.as_deref());
        let mut steps = vec![timed_step(format!("navigate:{}", url), page.goto(&url)).await];
        let mut scenario_error = steps[0].error.clone();

        if scenario_error.is_none() {
            for instruction in scenario.instructions(&self.config.locators) {
                let result = timed_step(instruction.name(), execute(&page, &instruction, expect)).await;
                let failed = !result.success;
                if failed {
                    scenario_error = result.error.clone();
                }
                steps.push(result);
                if failed {
                    break; // Stop on first failure
                }
            }
        }

        // An unanswered request is the usual cause of a timed out assertion
        if let Some(error) = scenario_error.as_mut() {
            let unrouted = page.unrouted_requests();
            if !unrouted.is_empty() {
                error.push_str(&format!("; {}", E2eError::UnroutedRequest(unrouted.join(", "))));
            }
            for mock in &mocks {
                if let Err(e) = mock.assert_hit() {
                    error.push_str(&format!("; {}", e));
                }
            }
        }

        Ok(ScenarioResult {
            name,
            success: scenario_error.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            error: scenario_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthPrecondition;

    fn engine() -> SimulatedEngine {
        let mut config = HarnessConfig::default();
        config.expect_timeout_ms = 300;
        config.simulation.response_latency_ms = 5;
        SimulatedEngine::new(Arc::new(config))
    }

    #[tokio::test]
    async fn test_passing_scenario() {
        let suite = ScenarioSuite::from_yaml(
            r#"
name: creation
scenarios:
  - name: single-plot
    routes:
      - response: { kind: echo_created }
    steps:
      - action: submit
        plot: { name: North Field, cropType: Wheat, hectares: 25.5 }
      - action: expect_created
        plot: { name: North Field, cropType: Wheat, hectares: 25.5 }
        exact_hectares: true
"#,
        )
        .unwrap();

        let result = engine().run_scenario(&suite, &suite.scenarios[0]).await.unwrap();
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.name, "creation/single-plot");
        assert_eq!(result.steps[0].step_name, "navigate:https://farm-management-app.com/plots/create");
    }

    #[tokio::test]
    async fn test_unmatched_route_is_reported() {
        let suite = ScenarioSuite::from_yaml(
            r##"
name: creation
scenarios:
  - name: wrong-glob
    routes:
      - pattern: "/api/farm-plots"
        response: { kind: echo_created }
    steps:
      - action: submit
        plot: { name: North Field, cropType: Wheat, hectares: 25.5 }
      - action: assert
        selector: "#success-message"
        visible: true
      - action: log
        message: never reached
"##,
        )
        .unwrap();

        let result = engine().run_scenario(&suite, &suite.scenarios[0]).await.unwrap();
        assert!(!result.success);

        let last = result.steps.last().unwrap();
        assert_eq!(last.step_name, "expect:#success-message");
        assert!(!last.success);

        let error = result.error.unwrap();
        assert!(error.contains("Timeout"), "{}", error);
        assert!(error.contains("https://farm-management-app.com/api/farm-plots"), "{}", error);
        assert!(error.contains("never hit"), "{}", error);
    }

    #[tokio::test]
    async fn test_configured_auth_is_seeded() {
        let yaml = r#"
name: creation
scenarios:
  - name: single-plot
    routes:
      - response: { kind: echo_created }
    steps:
      - action: submit
        plot: { name: North Field, cropType: Wheat, hectares: 25.5 }
"#;
        let suite = ScenarioSuite::from_yaml(yaml).unwrap();

        // an empty token is not a login, so the form never renders
        let mut config = HarnessConfig::default();
        config.auth = AuthPrecondition::new("", Default::default());
        let engine = SimulatedEngine::new(Arc::new(config));

        let result = engine.run_scenario(&suite, &suite.scenarios[0]).await.unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("#plot-name"));

        // a suite's own auth wins over the configured one
        let suite = ScenarioSuite {
            auth: Some(AuthPrecondition::default()),
            ..suite
        };
        let result = engine.run_scenario(&suite, &suite.scenarios[0]).await.unwrap();
        assert!(result.success, "{:?}", result.error);
    }
}
