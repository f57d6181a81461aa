//! URL glob patterns with Playwright's matching rules
//!
//! - `**` between slashes (or at either end) spans any number of path segments
//! - `*`, and `**` inside a segment, match within one segment
//! - `?` is a literal character, as in current Playwright
//! - `{a,b}` matches either alternative
//! - `\` escapes the next character; everything else is literal
//!
//! The glob is anchored to the whole URL, query string included.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{E2eError, E2eResult};

/// Default pattern for the plot creation endpoint
pub const FARM_PLOTS_PATTERN: &str = "**/api/farm-plots";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UrlGlob {
    pattern: String,
    regex: Regex,
}

impl UrlGlob {
    pub fn new(pattern: &str) -> E2eResult<Self> {
        let source = glob_to_regex(pattern)?;
        let regex = Regex::new(&source).map_err(|e| E2eError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl PartialEq for UrlGlob {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl fmt::Display for UrlGlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl TryFrom<String> for UrlGlob {
    type Error = E2eError;

    fn try_from(pattern: String) -> E2eResult<Self> {
        Self::new(&pattern)
    }
}

impl From<UrlGlob> for String {
    fn from(glob: UrlGlob) -> Self {
        glob.pattern
    }
}

fn glob_to_regex(glob: &str) -> E2eResult<String> {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::from("^");
    let mut in_group = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' if i + 1 < chars.len() => {
                i += 1;
                out.push_str(&regex::escape(&chars[i].to_string()));
            }
            '*' => {
                let before = if i == 0 { None } else { Some(chars[i - 1]) };
                let mut stars = 1;
                while i + 1 < chars.len() && chars[i + 1] == '*' {
                    stars += 1;
                    i += 1;
                }
                let after = chars.get(i + 1).copied();
                let at_boundary = |c: Option<char>| c.is_none() || c == Some('/');

                if stars > 1 && at_boundary(before) && at_boundary(after) {
                    out.push_str("((?:[^/]*(?:/|$))*)");
                    // the deep token consumes its trailing slash
                    if after.is_some() {
                        i += 1;
                    }
                } else {
                    out.push_str("([^/]*)");
                }
            }
            '{' => {
                if in_group {
                    return Err(invalid(glob, "nested '{' groups are not supported"));
                }
                in_group = true;
                out.push('(');
            }
            '}' if in_group => {
                in_group = false;
                out.push(')');
            }
            ',' if in_group => out.push('|'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
        i += 1;
    }

    if in_group {
        return Err(invalid(glob, "unclosed '{' group"));
    }

    out.push('$');
    Ok(out)
}

fn invalid(pattern: &str, reason: &str) -> E2eError {
    E2eError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}
