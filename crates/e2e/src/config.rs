//! Harness configuration

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::AuthPrecondition;
use crate::error::E2eResult;
use crate::expect::ExpectConfig;
use crate::glob::FARM_PLOTS_PATTERN;
use crate::playwright::PlaywrightConfig;
use crate::sequencer::FormLocators;
use crate::sim::SimConfig;

/// Which engine executes scenarios
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// In-process page model, no browser needed
    #[default]
    Sim,
    /// Real browser through a generated Playwright script
    Playwright,
}

/// Harness configuration, loaded from TOML and overridden by CLI flags
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Origin of the app under test
    pub base_url: String,

    /// Path of the plot creation page
    pub form_path: String,

    /// Path the form POSTs to
    pub api_path: String,

    /// Glob routes use when a scenario does not name one
    pub route_pattern: String,

    pub engine: EngineKind,

    /// Scenarios run concurrently, each on its own page
    pub workers: usize,

    pub expect_timeout_ms: u64,

    pub poll_interval_ms: u64,

    /// Directory searched for `*.yaml` suites
    pub scenarios_dir: PathBuf,

    /// Where `test-results.json` is written
    pub output_dir: PathBuf,

    pub locators: FormLocators,

    /// Auth state seeded unless a suite is anonymous
    pub auth: AuthPrecondition,

    pub simulation: SimulationConfig,

    pub playwright: PlaywrightConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "https://farm-management-app.com".to_string(),
            form_path: "/plots/create".to_string(),
            api_path: "/api/farm-plots".to_string(),
            route_pattern: FARM_PLOTS_PATTERN.to_string(),
            engine: EngineKind::Sim,
            workers: 4,
            expect_timeout_ms: 5000,
            poll_interval_ms: 50,
            scenarios_dir: PathBuf::from("tests/scenarios"),
            output_dir: PathBuf::from("test-results"),
            locators: FormLocators::default(),
            auth: AuthPrecondition::default(),
            simulation: SimulationConfig::default(),
            playwright: PlaywrightConfig::default(),
        }
    }
}

/// Simulated engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Delay before a mocked response renders
    pub response_latency_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            response_latency_ms: 20,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> E2eResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Page a suite opens: its own URL (absolute, or a path on the base
    /// URL) or the creation form
    pub fn form_url(&self, suite_url: Option<&str>) -> String {
        let path = match suite_url {
            Some(url) if url.contains("://") => return url.to_string(),
            Some(path) => path,
            None => &self.form_path,
        };
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    pub fn expect(&self) -> ExpectConfig {
        ExpectConfig {
            timeout: Duration::from_millis(self.expect_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    pub fn sim_config(&self) -> SimConfig {
        SimConfig {
            response_latency: Duration::from_millis(self.simulation.response_latency_ms),
            form_path: self.form_path.clone(),
            api_path: self.api_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playwright::Browser;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.engine, EngineKind::Sim);
        assert_eq!(config.route_pattern, "**/api/farm-plots");
        assert_eq!(config.expect().timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("e2e.toml");

        let mut config = HarnessConfig::default();
        config.workers = 1;
        config.engine = EngineKind::Playwright;
        config.playwright.browser = Browser::Firefox;
        config.locators.create_button = "#submit".to_string();
        config.save(&path).unwrap();

        let loaded = HarnessConfig::load(&path).unwrap();
        assert_eq!(loaded.workers, 1);
        assert_eq!(loaded.engine, EngineKind::Playwright);
        assert_eq!(loaded.playwright.browser, Browser::Firefox);
        assert_eq!(loaded.locators.create_button, "#submit");
        assert_eq!(loaded.auth, AuthPrecondition::default());
    }

    #[test]
    fn test_partial_file() {
        let config: HarnessConfig = toml::from_str(
            r#"
base_url = "http://localhost:3000/"

[simulation]
response_latency_ms = 0
"#,
        )
        .unwrap();

        assert_eq!(config.form_url(None), "http://localhost:3000/plots/create");
        assert_eq!(config.sim_config().response_latency, Duration::ZERO);
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn test_form_url_override() {
        let config = HarnessConfig::default();
        assert_eq!(
            config.form_url(Some("/plots/create?draft=1")),
            "https://farm-management-app.com/plots/create?draft=1"
        );
        assert_eq!(
            config.form_url(Some("http://staging.local/plots/create")),
            "http://staging.local/plots/create"
        );
    }
}
