//! In-process browser engine
//!
//! [`SimulatedPage`] models one browser context showing the farm plot
//! creation form: local storage with init entries re-applied on every
//! navigation, a route table consulted for every outgoing request, and the
//! page's own submit/render behaviour from [`app`]. Responses land on a
//! spawned task after `response_latency`, so assertions have to poll the
//! same way they would against a real browser.

pub mod app;
pub mod dom;

use async_trait::async_trait;
use farmplot_common::UserProfile;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::auth::{AUTH_TOKEN_KEY, USER_KEY};
use crate::error::{E2eError, E2eResult};
use crate::mock::{InterceptedRequest, RouteMock, JSON_CONTENT_TYPE};
use crate::page::{ElementState, Page};
use app::{FormApp, FormPhase};
use dom::Element;

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Delay between a request being routed and its response rendering
    pub response_latency: Duration,
    pub form_path: String,
    pub api_path: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            response_latency: Duration::from_millis(20),
            form_path: "/plots/create".to_string(),
            api_path: "/api/farm-plots".to_string(),
        }
    }
}

#[derive(Debug)]
struct PageState {
    url: String,
    storage: BTreeMap<String, String>,
    init_storage: Vec<(String, String)>,
    routes: Vec<Arc<RouteMock>>,
    app: Option<FormApp>,
    requests: Vec<InterceptedRequest>,
    unrouted: Vec<String>,
    /// Bumped on every goto; responses for an older document are dropped
    navigation: u64,
}

impl PageState {
    fn is_authenticated(&self) -> bool {
        let has_token = self
            .storage
            .get(AUTH_TOKEN_KEY)
            .map(|token| !token.is_empty())
            .unwrap_or(false);
        let has_user = self
            .storage
            .get(USER_KEY)
            .map(|user| serde_json::from_str::<UserProfile>(user).is_ok())
            .unwrap_or(false);
        has_token && has_user
    }

    fn app_mut(&mut self, selector: &str) -> E2eResult<&mut FormApp> {
        self.app
            .as_mut()
            .ok_or_else(|| E2eError::ElementNotFound(selector.to_string()))
    }

    fn submit_request(&self, api_path: &str, body: String) -> E2eResult<InterceptedRequest> {
        let (origin, _) = split_url(&self.url)?;

        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), JSON_CONTENT_TYPE.to_string());
        if let Some(token) = self.storage.get(AUTH_TOKEN_KEY) {
            headers.insert("authorization".to_string(), format!("Bearer {}", token));
        }

        Ok(InterceptedRequest {
            method: "POST".to_string(),
            url: format!("{}{}", origin, api_path),
            headers,
            post_data: Some(body),
        })
    }
}

/// Origin and path of an absolute URL, query and fragment dropped
fn split_url(url: &str) -> E2eResult<(&str, &str)> {
    let authority = url
        .find("://")
        .map(|i| i + 3)
        .ok_or_else(|| E2eError::Navigation(format!("not an absolute URL: {}", url)))?;
    let path_start = url[authority..]
        .find('/')
        .map(|i| authority + i)
        .unwrap_or(url.len());

    let path = url[path_start..].split(['?', '#']).next().unwrap_or_default();
    Ok((&url[..path_start], if path.is_empty() { "/" } else { path }))
}

/// One isolated browser context on the simulated engine
#[derive(Clone)]
pub struct SimulatedPage {
    config: Arc<SimConfig>,
    state: Arc<Mutex<PageState>>,
}

impl Default for SimulatedPage {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl SimulatedPage {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(PageState {
                url: "about:blank".to_string(),
                storage: BTreeMap::new(),
                init_storage: Vec::new(),
                routes: Vec::new(),
                app: None,
                requests: Vec::new(),
                unrouted: Vec::new(),
                navigation: 0,
            })),
        }
    }

    /// URLs of requests no route answered; they stay pending forever
    pub fn unrouted_requests(&self) -> Vec<String> {
        self.state.lock().unrouted.clone()
    }

    /// Every request the page sent, routed or not
    pub fn requests(&self) -> Vec<InterceptedRequest> {
        self.state.lock().requests.clone()
    }

    pub fn storage_item(&self, key: &str) -> Option<String> {
        self.state.lock().storage.get(key).cloned()
    }

    /// Submit cycle phase of the loaded form, `None` before navigation
    pub fn phase(&self) -> Option<FormPhase> {
        self.state.lock().app.as_ref().map(FormApp::phase)
    }
}

#[async_trait]
impl Page for SimulatedPage {
    async fn add_init_storage(&self, entries: Vec<(String, String)>) -> E2eResult<()> {
        self.state.lock().init_storage.extend(entries);
        Ok(())
    }

    async fn route(&self, mock: Arc<RouteMock>) -> E2eResult<()> {
        debug!("Routing {}", mock.pattern());
        self.state.lock().routes.push(mock);
        Ok(())
    }

    async fn goto(&self, url: &str) -> E2eResult<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        state.navigation += 1;
        for (key, value) in &state.init_storage {
            state.storage.insert(key.clone(), value.clone());
        }

        let (origin, path) = split_url(url)?;
        if path == self.config.form_path {
            if state.is_authenticated() {
                debug!("Loaded {}", url);
                state.url = url.to_string();
                state.app = Some(FormApp::creation_form());
            } else {
                info!("No auth state in storage, redirecting {} to login", url);
                state.url = format!("{}{}", origin, LOGIN_PATH);
                state.app = Some(FormApp::login_page());
            }
        } else if path == LOGIN_PATH {
            state.url = url.to_string();
            state.app = Some(FormApp::login_page());
        } else {
            return Err(E2eError::Navigation(format!("404 for {}", url)));
        }
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> E2eResult<()> {
        self.state.lock().app_mut(selector)?.fill(selector, value)
    }

    async fn select_option(&self, selector: &str, value: &str) -> E2eResult<()> {
        self.state.lock().app_mut(selector)?.select(selector, value)
    }

    async fn click(&self, selector: &str) -> E2eResult<()> {
        let (route, request, navigation) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            let Some(body) = state.app_mut(selector)?.click(selector)? else {
                return Ok(());
            };
            let request = state.submit_request(&self.config.api_path, body)?;
            state.requests.push(request.clone());

            // most recently registered route wins
            let route = state.routes.iter().rev().find(|r| r.matches(&request.url)).cloned();
            let Some(route) = route else {
                warn!(
                    "{} {} matched no route and will never be answered",
                    request.method, request.url
                );
                state.unrouted.push(request.url.clone());
                return Ok(());
            };
            (route, request, state.navigation)
        };

        let fulfillment = route.handle(&request)?;
        let state = Arc::clone(&self.state);
        let latency = self.config.response_latency;

        tokio::spawn(async move {
            tokio::time::sleep(latency).await;

            let mut state = state.lock();
            if state.navigation != navigation {
                debug!("Page navigated away, dropping response to {}", request.url);
                return;
            }
            if let Some(app) = state.app.as_mut() {
                app.apply_response(&fulfillment);
            }
        });
        Ok(())
    }

    async fn element(&self, selector: &str) -> E2eResult<Option<ElementState>> {
        let state = self.state.lock();
        let Some(app) = state.app.as_ref() else {
            return Ok(None);
        };
        Ok(app.document().query(selector)?.map(Element::state))
    }

    fn url(&self) -> String {
        self.state.lock().url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthPrecondition;
    use crate::mock::MockResponse;
    use farmplot_common::Field;

    const FORM_URL: &str = "https://farm-management-app.com/plots/create";

    #[test]
    fn test_split_url() {
        assert_eq!(
            split_url("https://farm-management-app.com/plots/create?x=1").unwrap(),
            ("https://farm-management-app.com", "/plots/create")
        );
        assert_eq!(
            split_url("http://localhost:3000").unwrap(),
            ("http://localhost:3000", "/")
        );
        assert!(split_url("/plots/create").is_err());
    }

    #[tokio::test]
    async fn test_goto_without_auth_lands_on_login() {
        let page = SimulatedPage::default();
        page.goto(FORM_URL).await.unwrap();

        assert_eq!(page.url(), "https://farm-management-app.com/login");
        assert!(page.element("#plot-name").await.unwrap().is_none());
        assert!(page.element("#login-form").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_init_storage_applied_on_navigation() {
        let page = SimulatedPage::default();
        AuthPrecondition::default().install(&page).await.unwrap();
        assert_eq!(page.storage_item(AUTH_TOKEN_KEY), None);

        page.goto(FORM_URL).await.unwrap();
        assert_eq!(page.url(), FORM_URL);
        assert_eq!(page.storage_item(AUTH_TOKEN_KEY).as_deref(), Some("fake-jwt-token-12345"));
        assert_eq!(page.phase(), Some(FormPhase::Idle));
    }

    #[tokio::test]
    async fn test_later_route_takes_precedence() {
        let page = SimulatedPage::new(SimConfig {
            response_latency: Duration::ZERO,
            ..Default::default()
        });
        AuthPrecondition::default().install(&page).await.unwrap();

        let first = Arc::new(RouteMock::new("**/api/farm-plots", MockResponse::echo_created()).unwrap());
        let second = Arc::new(
            RouteMock::new("**/api/*", MockResponse::rejected(Field::Name, "Farm plot name is required")).unwrap(),
        );
        page.route(Arc::clone(&first)).await.unwrap();
        page.route(Arc::clone(&second)).await.unwrap();

        page.goto(FORM_URL).await.unwrap();
        page.fill("#plot-name", "").await.unwrap();
        page.click("#create-btn").await.unwrap();

        assert_eq!(first.hits(), 0);
        assert_eq!(second.hits(), 1);

        let requests = page.requests();
        let request = &requests[0];
        assert_eq!(request.url, "https://farm-management-app.com/api/farm-plots");
        assert_eq!(
            request.headers.get("authorization").map(String::as_str),
            Some("Bearer fake-jwt-token-12345")
        );
    }
}
