//! Web-first assertions: poll an element until a condition holds or time runs out

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::page::{ElementState, Page};

/// Timing shared by every assertion in a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ExpectConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// What must be true of an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Condition {
    Visible,
    /// Absent or not visible
    Hidden,
    ContainsText(String),
    /// Absent, or present without the text
    NotContainsText(String),
    /// Regex searched in the space-joined class attribute
    ClassMatches(String),
    Disabled,
    Enabled,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Visible => write!(f, "to be visible"),
            Condition::Hidden => write!(f, "not to be visible"),
            Condition::ContainsText(text) => write!(f, "to contain text {:?}", text),
            Condition::NotContainsText(text) => write!(f, "not to contain text {:?}", text),
            Condition::ClassMatches(pattern) => write!(f, "to have class /{}/", pattern),
            Condition::Disabled => write!(f, "to be disabled"),
            Condition::Enabled => write!(f, "to be enabled"),
        }
    }
}

/// A condition bound to a selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    pub selector: String,
    pub condition: Condition,
}

impl Expectation {
    pub fn new(selector: &str, condition: Condition) -> Self {
        Self {
            selector: selector.to_string(),
            condition,
        }
    }

    pub fn name(&self) -> String {
        format!("expect:{}", self.selector)
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expect({}) {}", self.selector, self.condition)
    }
}

/// A condition with its regex compiled once for the whole polling loop
struct Matcher<'a> {
    condition: &'a Condition,
    class_pattern: Option<Regex>,
}

impl<'a> Matcher<'a> {
    fn new(condition: &'a Condition) -> E2eResult<Self> {
        let class_pattern = match condition {
            Condition::ClassMatches(pattern) => Some(Regex::new(pattern)?),
            _ => None,
        };
        Ok(Self {
            condition,
            class_pattern,
        })
    }

    fn holds(&self, state: Option<&ElementState>) -> bool {
        match (self.condition, state) {
            (Condition::Visible, Some(s)) => s.visible,
            (Condition::Hidden, Some(s)) => !s.visible,
            (Condition::Hidden, None) => true,
            (Condition::ContainsText(text), Some(s)) => s.text.contains(text.as_str()),
            (Condition::NotContainsText(text), Some(s)) => !s.text.contains(text.as_str()),
            (Condition::NotContainsText(_), None) => true,
            (Condition::ClassMatches(_), Some(s)) => self
                .class_pattern
                .as_ref()
                .map(|re| re.is_match(&s.class_attribute()))
                .unwrap_or(false),
            (Condition::Disabled, Some(s)) => s.disabled,
            (Condition::Enabled, Some(s)) => !s.disabled,
            (_, None) => false,
        }
    }
}

/// Assertion builder over one locator
pub struct Expect<'p> {
    page: &'p dyn Page,
    selector: String,
    config: ExpectConfig,
}

/// Start an assertion with default timing
pub fn expect<'p>(page: &'p dyn Page, selector: &str) -> Expect<'p> {
    Expect::new(page, selector, ExpectConfig::default())
}

impl<'p> Expect<'p> {
    pub fn new(page: &'p dyn Page, selector: &str, config: ExpectConfig) -> Self {
        Self {
            page,
            selector: selector.to_string(),
            config,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub async fn to_be_visible(&self) -> E2eResult<()> {
        self.check(&Condition::Visible).await
    }

    pub async fn not_to_be_visible(&self) -> E2eResult<()> {
        self.check(&Condition::Hidden).await
    }

    pub async fn to_contain_text(&self, text: &str) -> E2eResult<()> {
        self.check(&Condition::ContainsText(text.to_string())).await
    }

    pub async fn not_to_contain_text(&self, text: &str) -> E2eResult<()> {
        self.check(&Condition::NotContainsText(text.to_string())).await
    }

    pub async fn to_have_class(&self, pattern: &str) -> E2eResult<()> {
        self.check(&Condition::ClassMatches(pattern.to_string())).await
    }

    pub async fn to_be_disabled(&self) -> E2eResult<()> {
        self.check(&Condition::Disabled).await
    }

    pub async fn to_be_enabled(&self) -> E2eResult<()> {
        self.check(&Condition::Enabled).await
    }

    /// Poll until the condition holds; a timeout is a hard failure
    pub async fn check(&self, condition: &Condition) -> E2eResult<()> {
        let matcher = Matcher::new(condition)?;
        let deadline = Instant::now() + self.config.timeout;

        loop {
            let state = self.page.element(&self.selector).await?;
            if matcher.holds(state.as_ref()) {
                debug!("expect({}) {} passed", self.selector, condition);
                return Ok(());
            }

            if Instant::now() >= deadline {
                let seen = match state {
                    Some(s) => format!(
                        "visible={}, disabled={}, class={:?}, text={:?}",
                        s.visible,
                        s.disabled,
                        s.class_attribute(),
                        s.text
                    ),
                    None => "no matching element".to_string(),
                };
                return Err(E2eError::Timeout {
                    what: format!("expect({}) {}; last seen: {}", self.selector, condition, seen),
                    timeout_ms: self.config.timeout.as_millis() as u64,
                });
            }

            sleep(self.config.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn element(visible: bool, text: &str, classes: &[&str], disabled: bool) -> ElementState {
        ElementState {
            visible,
            text: text.to_string(),
            value: String::new(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            disabled,
        }
    }

    fn holds(condition: Condition, state: Option<ElementState>) -> bool {
        Matcher::new(&condition).unwrap().holds(state.as_ref())
    }

    #[test_case(Condition::Visible, None, false ; "visible needs element")]
    #[test_case(Condition::Hidden, None, true ; "missing counts as hidden")]
    #[test_case(Condition::NotContainsText("x".into()), None, true ; "missing has no text")]
    #[test_case(Condition::ContainsText("x".into()), None, false ; "contains needs element")]
    #[test_case(Condition::Disabled, None, false ; "disabled needs element")]
    fn test_missing_element(condition: Condition, state: Option<ElementState>, expected: bool) {
        assert_eq!(holds(condition, state), expected);
    }

    #[test]
    fn test_text_conditions() {
        let summary = element(true, "Decimal Field · Wheat · 12.75 hectares", &[], false);
        assert!(holds(Condition::ContainsText("12.75 hectares".into()), Some(summary.clone())));
        assert!(holds(Condition::NotContainsText("13 hectares".into()), Some(summary.clone())));
        assert!(holds(Condition::NotContainsText("12 hectares".into()), Some(summary)));
    }

    #[test]
    fn test_class_pattern_searches_attribute() {
        let input = element(true, "", &["form-input", "error"], false);
        assert!(holds(Condition::ClassMatches("error|invalid".into()), Some(input)));

        let clean = element(true, "", &["form-input"], false);
        assert!(!holds(Condition::ClassMatches("error|invalid".into()), Some(clean)));
    }

    #[test]
    fn test_bad_class_pattern_is_an_error() {
        assert!(matches!(
            Matcher::new(&Condition::ClassMatches("(".into())),
            Err(E2eError::Regex(_))
        ));
    }

    #[test]
    fn test_display() {
        let expectation = Expectation::new("#hectares", Condition::ClassMatches("error|invalid".into()));
        assert_eq!(expectation.to_string(), "expect(#hectares) to have class /error|invalid/");
    }
}
