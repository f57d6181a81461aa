//! Farm plot form E2E harness
//!
//! This crate drives the farm plot creation form end to end with a faked
//! backend:
//! - Seeds a fake logged-in user into browser storage
//! - Intercepts `**/api/farm-plots` and answers with canned envelopes
//! - Fills and submits the form from typed submissions
//! - Asserts the rendered success or validation outcome, polling with a timeout
//!
//! Scenarios run either on the in-process simulated page or in a real
//! browser through a generated Playwright script.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── ScenarioSuite::load_all(dir) -> [ScenarioSuite]      │
//! │    ├── Engine::run_scenario(suite, scenario)                │
//! │    │     ├── SimulatedEngine  (sim::SimulatedPage)          │
//! │    │     └── PlaywrightEngine (node + playwright)           │
//! │    └── write_results() -> test-results.json                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioSuite (YAML)                                       │
//! │    ├── name, tags, auth, url, viewport                      │
//! │    └── scenarios: [Scenario]                                │
//! │          ├── routes: [{ pattern?, response }]               │
//! │          └── steps: [ScenarioStep]                          │
//! │                ├── fill / select / click                    │
//! │                ├── submit { plot } / submit_all { plots }   │
//! │                ├── assert { selector, visible?, ... }       │
//! │                ├── expect_created / expect_aggregate        │
//! │                └── expect_rejected { field, message }       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod expect;
pub mod glob;
pub mod mock;
pub mod outcome;
pub mod page;
pub mod playwright;
pub mod runner;
pub mod sequencer;
pub mod sim;
pub mod spec;

pub use auth::AuthPrecondition;
pub use config::{EngineKind, HarnessConfig};
pub use engine::{Engine, ScenarioResult, SimulatedEngine, StepResult};
pub use error::{E2eError, E2eResult};
pub use expect::{expect, Condition, Expect, ExpectConfig, Expectation};
pub use glob::{UrlGlob, FARM_PLOTS_PATTERN};
pub use mock::{Fulfillment, InterceptedRequest, MockResponse, RouteHandler, RouteMock};
pub use outcome::OutcomeAssertions;
pub use page::{ElementState, Page, PageAction};
pub use runner::{TestRunner, TestSuiteResult};
pub use sequencer::{FormLocators, FormSequencer};
pub use sim::{SimConfig, SimulatedPage};
pub use spec::{NameFilter, Scenario, ScenarioStep, ScenarioSuite};
