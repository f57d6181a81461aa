//! Declarative YAML scenario suites
//!
//! A suite groups scenarios that share auth state and the page they open.
//! High level steps (`submit`, `expect_created`, ...) are lowered into
//! primitive [`Instruction`]s so every engine runs exactly the same
//! interactions and checks.

use farmplot_common::{FarmPlotSubmission, Field};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::auth::AuthPrecondition;
use crate::error::{E2eError, E2eResult};
use crate::expect::{Condition, Expectation};
use crate::glob::UrlGlob;
use crate::mock::MockResponse;
use crate::outcome::OutcomeAssertions;
use crate::page::PageAction;
use crate::sequencer::{FormLocators, FormSequencer};

/// A suite of scenarios parsed from one YAML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSuite {
    /// Unique name for this suite
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering; apply to every scenario in the suite
    #[serde(default)]
    pub tags: Vec<String>,

    /// Storage seeded before each scenario's navigation; the configured
    /// auth state when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthPrecondition>,

    /// Skip seeding auth state
    #[serde(default)]
    pub anonymous: bool,

    /// Page to open, absolute or relative to the base URL; defaults to the form
    #[serde(default)]
    pub url: Option<String>,

    /// Viewport size for the browser
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    pub scenarios: Vec<Scenario>,
}

fn default_viewport() -> Viewport {
    Viewport {
        width: 1280,
        height: 720,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// One independent scenario: its mocks and its steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Interceptions installed before navigation, later entries win
    #[serde(default)]
    pub routes: Vec<RouteSpec>,

    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSpec {
    /// URL glob; the configured endpoint pattern when absent
    #[serde(default)]
    pub pattern: Option<String>,
    pub response: MockResponse,
}

/// A single step of a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioStep {
    Fill {
        selector: String,
        value: String,
    },

    Select {
        selector: String,
        value: String,
    },

    Click {
        selector: String,
    },

    /// Fill the whole form and click create
    Submit {
        plot: FarmPlotSubmission,
    },

    /// Submit each plot, waiting for the success message in between
    SubmitAll {
        plots: Vec<FarmPlotSubmission>,
    },

    /// Assert something about an element
    Assert {
        selector: String,
        #[serde(default)]
        visible: Option<bool>,
        #[serde(default)]
        text_contains: Option<String>,
        #[serde(default)]
        text_not_contains: Option<String>,
        #[serde(default)]
        class_matches: Option<String>,
        #[serde(default)]
        disabled: Option<bool>,
    },

    ExpectCreated {
        plot: FarmPlotSubmission,
        /// Also check the summary does not show a rounded area
        #[serde(default)]
        exact_hectares: bool,
    },

    ExpectAggregate {
        plots: Vec<FarmPlotSubmission>,
    },

    ExpectRejected {
        field: Field,
        message: String,
        #[serde(default)]
        submit_disabled: bool,
    },

    /// Log a message (for debugging)
    Log {
        message: String,
    },
}

/// Primitive unit both engines execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Act(PageAction),
    Expect(Expectation),
    Log(String),
}

impl Instruction {
    pub fn name(&self) -> String {
        match self {
            Instruction::Act(action) => action.name(),
            Instruction::Expect(expectation) => expectation.name(),
            Instruction::Log(message) => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }
}

impl ScenarioStep {
    fn lower(&self, sequencer: &FormSequencer, outcomes: &OutcomeAssertions) -> Vec<Instruction> {
        let expect_all = |expectations: Vec<Expectation>| {
            expectations.into_iter().map(Instruction::Expect).collect::<Vec<_>>()
        };

        match self {
            ScenarioStep::Fill { selector, value } => {
                vec![Instruction::Act(PageAction::fill(selector, value.clone()))]
            }
            ScenarioStep::Select { selector, value } => {
                vec![Instruction::Act(PageAction::select(selector, value.clone()))]
            }
            ScenarioStep::Click { selector } => vec![Instruction::Act(PageAction::click(selector))],
            ScenarioStep::Submit { plot } => sequencer
                .actions(plot)
                .into_iter()
                .map(Instruction::Act)
                .collect(),
            ScenarioStep::SubmitAll { plots } => {
                let success = &sequencer.locators().success_message;
                plots
                    .iter()
                    .flat_map(|plot| {
                        sequencer
                            .actions(plot)
                            .into_iter()
                            .map(Instruction::Act)
                            .chain(std::iter::once(Instruction::Expect(Expectation::new(
                                success,
                                Condition::Visible,
                            ))))
                    })
                    .collect()
            }
            ScenarioStep::Assert {
                selector,
                visible,
                text_contains,
                text_not_contains,
                class_matches,
                disabled,
            } => {
                let mut conditions = Vec::new();
                if let Some(visible) = visible {
                    conditions.push(if *visible { Condition::Visible } else { Condition::Hidden });
                }
                if let Some(text) = text_contains {
                    conditions.push(Condition::ContainsText(text.clone()));
                }
                if let Some(text) = text_not_contains {
                    conditions.push(Condition::NotContainsText(text.clone()));
                }
                if let Some(pattern) = class_matches {
                    conditions.push(Condition::ClassMatches(pattern.clone()));
                }
                if let Some(disabled) = disabled {
                    conditions.push(if *disabled { Condition::Disabled } else { Condition::Enabled });
                }
                conditions
                    .into_iter()
                    .map(|condition| Instruction::Expect(Expectation::new(selector, condition)))
                    .collect()
            }
            ScenarioStep::ExpectCreated {
                plot,
                exact_hectares,
            } => {
                let mut expectations = outcomes.created(plot);
                if let (true, Some(hectares)) = (*exact_hectares, plot.hectares) {
                    expectations.extend(outcomes.exact_hectares(hectares));
                }
                expect_all(expectations)
            }
            ScenarioStep::ExpectAggregate { plots } => expect_all(outcomes.aggregate(plots)),
            ScenarioStep::ExpectRejected {
                field,
                message,
                submit_disabled,
            } => {
                let mut expectations = outcomes.rejected(*field, message);
                if *submit_disabled {
                    expectations.push(outcomes.submit_disabled());
                }
                expect_all(expectations)
            }
            ScenarioStep::Log { message } => vec![Instruction::Log(message.clone())],
        }
    }
}

impl Scenario {
    /// Expand the steps against the given form locators
    pub fn instructions(&self, locators: &FormLocators) -> Vec<Instruction> {
        let sequencer = FormSequencer::new(locators.clone());
        let outcomes = OutcomeAssertions::new(locators.clone());

        self.steps
            .iter()
            .flat_map(|step| step.lower(&sequencer, &outcomes))
            .collect()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Name filter with libtest semantics: substring matches unless `exact`,
/// any include passes, any skip rejects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameFilter {
    pub include: Vec<String>,
    pub skip: Vec<String>,
    pub exact: bool,
}

impl NameFilter {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.skip.is_empty()
    }

    pub fn matches(&self, name: &str) -> bool {
        let hit = |pattern: &String| {
            if self.exact {
                name == pattern
            } else {
                name.contains(pattern.as_str())
            }
        };
        (self.include.is_empty() || self.include.iter().any(hit)) && !self.skip.iter().any(hit)
    }
}

impl ScenarioSuite {
    /// Parse a suite from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let suite: Self = serde_yaml::from_str(yaml)?;
        suite.validate()?;
        Ok(suite)
    }

    /// Parse a suite from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all suites from a directory, in file name order
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut suites = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            suites.push(Self::from_file(entry.path())?);
        }

        Ok(suites)
    }

    /// Keep the suites or scenarios carrying a tag; a tagged suite keeps
    /// all its scenarios
    pub fn filter_by_tag(suites: &[Self], tag: &str) -> Vec<Self> {
        suites
            .iter()
            .filter_map(|suite| {
                if suite.tags.iter().any(|t| t == tag) {
                    return Some(suite.clone());
                }
                let scenarios: Vec<Scenario> = suite
                    .scenarios
                    .iter()
                    .filter(|s| s.has_tag(tag))
                    .cloned()
                    .collect();
                (!scenarios.is_empty()).then(|| ScenarioSuite {
                    scenarios,
                    ..suite.clone()
                })
            })
            .collect()
    }

    /// Keep the scenarios whose `suite/scenario` name passes the filter
    pub fn filter_by_name(suites: &[Self], filter: &NameFilter) -> Vec<Self> {
        suites
            .iter()
            .filter_map(|suite| {
                let scenarios: Vec<Scenario> = suite
                    .scenarios
                    .iter()
                    .filter(|s| filter.matches(&format!("{}/{}", suite.name, s.name)))
                    .cloned()
                    .collect();
                (!scenarios.is_empty()).then(|| ScenarioSuite {
                    scenarios,
                    ..suite.clone()
                })
            })
            .collect()
    }

    /// Auth state to seed before navigation, `None` for anonymous suites
    pub fn seeded_auth<'a>(&'a self, configured: &'a AuthPrecondition) -> Option<&'a AuthPrecondition> {
        if self.anonymous {
            None
        } else {
            Some(self.auth.as_ref().unwrap_or(configured))
        }
    }

    fn validate(&self) -> E2eResult<()> {
        if self.scenarios.is_empty() {
            return Err(E2eError::SpecParse(format!("suite '{}' has no scenarios", self.name)));
        }

        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            if !seen.insert(scenario.name.as_str()) {
                return Err(E2eError::SpecParse(format!(
                    "suite '{}' has two scenarios named '{}'",
                    self.name, scenario.name
                )));
            }
            for route in &scenario.routes {
                if let Some(pattern) = &route.pattern {
                    UrlGlob::new(pattern)?;
                }
            }
        }
        Ok(())
    }
}
