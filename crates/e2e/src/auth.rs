//! Logged-in state seeded into browser storage before navigation

use farmplot_common::UserProfile;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::E2eResult;
use crate::page::Page;

pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const USER_KEY: &str = "user";

/// Fake bearer token and profile the app reads to consider the user logged in.
///
/// Nothing checks the token; the app only needs it to be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPrecondition {
    #[serde(default = "default_token")]
    pub token: String,
    #[serde(default)]
    pub user: UserProfile,
}

fn default_token() -> String {
    "fake-jwt-token-12345".to_string()
}

impl Default for AuthPrecondition {
    fn default() -> Self {
        Self {
            token: default_token(),
            user: UserProfile::default(),
        }
    }
}

impl AuthPrecondition {
    pub fn new(token: impl Into<String>, user: UserProfile) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    /// The two storage entries, in write order
    pub fn storage_entries(&self) -> E2eResult<Vec<(String, String)>> {
        Ok(vec![
            (AUTH_TOKEN_KEY.to_string(), self.token.clone()),
            (USER_KEY.to_string(), serde_json::to_string(&self.user)?),
        ])
    }

    /// Seed the page; re-applied on every navigation the page makes
    pub async fn install(&self, page: &dyn Page) -> E2eResult<()> {
        debug!("Seeding auth state for user {}", self.user.email);
        page.add_init_storage(self.storage_entries()?).await
    }

    /// Playwright statement that seeds local storage on every navigation
    pub fn to_init_script(&self) -> E2eResult<String> {
        let entries = serde_json::to_string(&self.storage_entries()?)?;
        Ok(format!(
            "await page.addInitScript((entries) => {{ for (const [key, value] of entries) localStorage.setItem(key, value); }}, {});",
            entries
        ))
    }
}
