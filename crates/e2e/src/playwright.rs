//! Playwright browser automation
//!
//! A scenario is compiled into one Node script: launch, auth init script,
//! routes, navigation, then every lowered instruction wrapped in a `step`
//! helper that prints a JSON event per step. The script's stdout is read
//! back into [`StepResult`]s.

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

use crate::auth::AuthPrecondition;
use crate::config::HarnessConfig;
use crate::engine::{Engine, ScenarioResult, StepResult};
use crate::error::{E2eError, E2eResult};
use crate::expect::{Condition, Expectation};
use crate::mock::{IdStrategy, MockResponse, JSON_CONTENT_TYPE};
use crate::page::PageAction;
use crate::spec::{Instruction, Scenario, ScenarioSuite, Viewport};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,

    /// `node_modules` holding `playwright` and `@playwright/test`, exported
    /// as `NODE_PATH`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_modules: Option<PathBuf>,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            node_modules: None,
        }
    }
}

/// JS string literal for arbitrary text
fn js_str(text: &str) -> String {
    serde_json::Value::from(text).to_string()
}

/// Builds the Node script for one scenario
pub struct ScriptBuilder<'a> {
    browser: Browser,
    headless: bool,
    viewport: Viewport,
    timeout: Duration,
    auth: Option<&'a AuthPrecondition>,
    routes: Vec<(&'a str, &'a MockResponse)>,
    url: String,
}

impl<'a> ScriptBuilder<'a> {
    pub fn new(config: &PlaywrightConfig, url: impl Into<String>) -> Self {
        Self {
            browser: config.browser,
            headless: config.headless,
            viewport: Viewport {
                width: 1280,
                height: 720,
            },
            timeout: Duration::from_secs(5),
            auth: None,
            routes: Vec::new(),
            url: url.into(),
        }
    }

    pub fn viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Timeout applied to every expectation
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn auth(mut self, auth: &'a AuthPrecondition) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn route(mut self, pattern: &'a str, response: &'a MockResponse) -> Self {
        self.routes.push((pattern, response));
        self
    }

    /// Script for a scenario with the harness settings applied
    pub fn for_scenario(
        config: &HarnessConfig,
        suite: &ScenarioSuite,
        scenario: &Scenario,
    ) -> E2eResult<String> {
        let mut builder = ScriptBuilder::new(&config.playwright, config.form_url(suite.url.as_deref()))
            .viewport(suite.viewport)
            .timeout(config.expect().timeout);

        if let Some(auth) = suite.seeded_auth(&config.auth) {
            builder = builder.auth(auth);
        }
        for route in &scenario.routes {
            let pattern = route.pattern.as_deref().unwrap_or(&config.route_pattern);
            builder = builder.route(pattern, &route.response);
        }

        builder.build(&scenario.instructions(&config.locators))
    }

    /// Build the Playwright script for a set of instructions
    pub fn build(&self, instructions: &[Instruction]) -> E2eResult<String> {
        let mut script = String::new();

        // Header
        script.push_str(&format!(
            r#"
const {{ chromium, firefox, webkit }} = require('playwright');
const {{ expect }} = require('@playwright/test');

const step = async (name, body) => {{
  const started = Date.now();
  try {{
    await body();
    console.log(JSON.stringify({{ e2e_step: name, success: true, duration_ms: Date.now() - started }}));
  }} catch (error) {{
    console.log(JSON.stringify({{ e2e_step: name, success: false, duration_ms: Date.now() - started, error: error.message }}));
    throw error;
  }}
}};

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();

  try {{
"#,
            browser = self.browser.as_str(),
            headless = self.headless,
            width = self.viewport.width,
            height = self.viewport.height,
        ));

        if let Some(auth) = self.auth {
            script.push_str("    ");
            script.push_str(&auth.to_init_script()?);
            script.push('\n');
        }

        for (index, (pattern, response)) in self.routes.iter().enumerate() {
            script.push_str(&route_to_js(index, pattern, response)?);
        }

        let navigate = format!("navigate:{}", self.url);
        script.push_str(&format!(
            "\n    await step({}, async () => {{ await page.goto({}); }});\n",
            js_str(&navigate),
            js_str(&self.url)
        ));

        for instruction in instructions {
            script.push_str(&format!(
                "    await step({}, async () => {{ {} }});\n",
                js_str(&instruction.name()),
                self.instruction_to_js(instruction)
            ));
        }

        // Footer
        script.push_str(
            r#"
    console.log(JSON.stringify({ success: true }));
  } catch (error) {
    console.error(JSON.stringify({ success: false, error: error.message, stack: error.stack }));
    process.exit(1);
  } finally {
    await browser.close();
  }
})();
"#,
        );

        Ok(script)
    }

    fn instruction_to_js(&self, instruction: &Instruction) -> String {
        match instruction {
            Instruction::Act(PageAction::Fill { selector, value }) => {
                format!("await page.fill({}, {});", js_str(selector), js_str(value))
            }
            Instruction::Act(PageAction::Select { selector, value }) => {
                format!("await page.selectOption({}, {});", js_str(selector), js_str(value))
            }
            Instruction::Act(PageAction::Click { selector }) => {
                format!("await page.click({});", js_str(selector))
            }
            Instruction::Expect(expectation) => self.expectation_to_js(expectation),
            Instruction::Log(message) => format!("console.error('[TEST]', {});", js_str(message)),
        }
    }

    fn expectation_to_js(&self, expectation: &Expectation) -> String {
        let locator = format!("expect(page.locator({}))", js_str(&expectation.selector));
        let options = format!("{{ timeout: {} }}", self.timeout.as_millis());

        let matcher = match &expectation.condition {
            Condition::Visible => format!("toBeVisible({})", options),
            Condition::Hidden => format!("toBeHidden({})", options),
            Condition::ContainsText(text) => format!("toContainText({}, {})", js_str(text), options),
            Condition::NotContainsText(text) => {
                format!("not.toContainText({}, {})", js_str(text), options)
            }
            Condition::ClassMatches(pattern) => {
                format!("toHaveClass(new RegExp({}), {})", js_str(pattern), options)
            }
            Condition::Disabled => format!("toBeDisabled({})", options),
            Condition::Enabled => format!("toBeEnabled({})", options),
        };
        format!("await {}.{};", locator, matcher)
    }
}

fn route_to_js(index: usize, pattern: &str, response: &MockResponse) -> E2eResult<String> {
    let body = match response {
        MockResponse::EchoCreated { ids } => {
            let (setup, id) = match ids {
                IdStrategy::Random { below } => {
                    (String::new(), format!("Math.floor(Math.random() * {})", below))
                }
                IdStrategy::Sequential { start } => (
                    format!("    let nextId{} = {};\n", index, start),
                    format!("nextId{}++", index),
                ),
            };
            return Ok(format!(
                r#"{setup}    await page.route({pattern}, async (route) => {{
      const data = route.request().postDataJSON();
      const farmPlot = {{ id: {id}, ...data, createdAt: new Date().toISOString() }};
      await route.fulfill({{ status: 201, contentType: {content_type}, body: JSON.stringify({{ success: true, farmPlot }}) }});
    }});
"#,
                setup = setup,
                pattern = js_str(pattern),
                id = id,
                content_type = js_str(JSON_CONTENT_TYPE),
            ));
        }
        fixed => fixed.fixed_fulfillment().unwrap_or_else(|| {
            Err(E2eError::Playwright("response depends on the request".to_string()))
        })?,
    };

    Ok(format!(
        r#"    await page.route({pattern}, async (route) => {{
      await route.fulfill({{ status: {status}, contentType: {content_type}, body: {body} }});
    }});
"#,
        pattern = js_str(pattern),
        status = body.status,
        content_type = js_str(&body.content_type),
        body = js_str(&body.body),
    ))
}

/// Per-step event printed by the generated script
#[derive(Debug, Deserialize)]
struct StepEvent {
    e2e_step: String,
    success: bool,
    duration_ms: u64,
    #[serde(default)]
    error: Option<String>,
}

/// Read step events back from the script's stdout
pub fn parse_step_events(stdout: &str) -> Vec<StepResult> {
    stdout
        .lines()
        .filter(|line| line.starts_with('{'))
        .filter_map(|line| serde_json::from_str::<StepEvent>(line).ok())
        .map(|event| StepResult {
            success: event.success,
            step_name: event.e2e_step,
            duration_ms: event.duration_ms,
            error: event.error,
        })
        .collect()
}

/// Output of one `node` run
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs scenarios in a real browser via Node and Playwright
pub struct PlaywrightEngine {
    config: Arc<HarnessConfig>,
}

impl PlaywrightEngine {
    pub fn new(config: Arc<HarnessConfig>) -> E2eResult<Self> {
        // Verify playwright is installed
        Self::check_playwright_installed()?;
        Ok(Self { config })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    pub fn script_for(&self, suite: &ScenarioSuite, scenario: &Scenario) -> E2eResult<String> {
        ScriptBuilder::for_scenario(&self.config, suite, scenario)
    }

    /// Execute the full script via Node
    pub async fn run_script(&self, script: &str) -> E2eResult<ScriptOutput> {
        // Write script to temp file
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("scenario.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let mut command = TokioCommand::new("node");
        command.arg(&script_path).current_dir(temp_dir.path());
        if let Some(node_modules) = &self.config.playwright.node_modules {
            command.env("NODE_PATH", node_modules);
        }
        let output = command.output().await?;

        Ok(ScriptOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[async_trait]
impl Engine for PlaywrightEngine {
    fn name(&self) -> &'static str {
        "playwright"
    }

    async fn run_scenario(
        &self,
        suite: &ScenarioSuite,
        scenario: &Scenario,
    ) -> E2eResult<ScenarioResult> {
        let start = Instant::now();
        let script = self.script_for(suite, scenario)?;
        let output = self.run_script(&script).await?;
        let steps = parse_step_events(&output.stdout);

        let error = if output.success {
            None
        } else {
            let failed_step = steps.iter().rev().find(|s| !s.success);
            match failed_step.and_then(|s| s.error.clone()) {
                Some(error) => Some(error),
                None => {
                    warn!("Playwright exited before any step failed");
                    Some(
                        E2eError::Playwright(format!(
                            "Script failed:\nstdout: {}\nstderr: {}",
                            output.stdout, output.stderr
                        ))
                        .to_string(),
                    )
                }
            }
        };

        Ok(ScenarioResult {
            name: ScenarioResult::qualified_name(suite, scenario),
            success: error.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            error,
        })
    }
}
