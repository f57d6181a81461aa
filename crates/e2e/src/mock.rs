//! Network interception: canned responses for the plot creation endpoint

use chrono::Utc;
use farmplot_common::{ApiEnvelope, FarmPlot, FarmPlotSubmission, Field, FieldErrors};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::glob::UrlGlob;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A request caught by a route before it reaches the network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptedRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub post_data: Option<String>,
}

impl InterceptedRequest {
    pub fn post_data_json<T: DeserializeOwned>(&self) -> E2eResult<T> {
        let body = self.post_data.as_deref().ok_or_else(|| {
            E2eError::RouteHandler(format!("{} {} has no body", self.method, self.url))
        })?;
        Ok(serde_json::from_str(body)?)
    }
}

/// Response handed back in place of the real server's
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fulfillment {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl Fulfillment {
    pub fn json<T: Serialize>(status: u16, body: &T) -> E2eResult<Self> {
        Ok(Self {
            status,
            content_type: JSON_CONTENT_TYPE.to_string(),
            body: serde_json::to_string(body)?,
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Programmatic response construction, for cases the declarative
/// [`MockResponse`] does not cover
pub trait RouteHandler: Send + Sync {
    fn fulfill(&self, request: &InterceptedRequest) -> E2eResult<Fulfillment>;
}

impl<F> RouteHandler for F
where
    F: Fn(&InterceptedRequest) -> E2eResult<Fulfillment> + Send + Sync,
{
    fn fulfill(&self, request: &InterceptedRequest) -> E2eResult<Fulfillment> {
        self(request)
    }
}

/// How echoed plots get their ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum IdStrategy {
    /// Uniform in `0..below`
    Random {
        #[serde(default = "default_id_bound")]
        below: u64,
    },
    /// `start`, `start + 1`, ... per request served
    Sequential { start: u64 },
}

fn default_id_bound() -> u64 {
    1000
}

impl Default for IdStrategy {
    fn default() -> Self {
        IdStrategy::Random {
            below: default_id_bound(),
        }
    }
}

fn default_created_status() -> u16 {
    201
}

fn default_rejected_status() -> u16 {
    400
}

/// Declarative response, usable from scenario files and compilable to
/// Playwright
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MockResponse {
    /// Arbitrary JSON body
    Fulfill {
        #[serde(default = "default_created_status")]
        status: u16,
        body: serde_json::Value,
    },
    /// Success envelope with a fixed plot
    Created { farm_plot: FarmPlot },
    /// Failure envelope
    Rejected {
        #[serde(default = "default_rejected_status")]
        status: u16,
        errors: FieldErrors,
    },
    /// Success envelope built from the request body, with a fresh id and
    /// the current time
    EchoCreated {
        #[serde(default)]
        ids: IdStrategy,
    },
}

impl MockResponse {
    pub fn created(farm_plot: FarmPlot) -> Self {
        MockResponse::Created { farm_plot }
    }

    pub fn rejected(field: Field, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.key().to_string(), message.into());
        MockResponse::Rejected {
            status: default_rejected_status(),
            errors,
        }
    }

    pub fn echo_created() -> Self {
        MockResponse::EchoCreated {
            ids: IdStrategy::default(),
        }
    }

    /// The response when it does not depend on the request, `None` for echoes
    pub fn fixed_fulfillment(&self) -> Option<E2eResult<Fulfillment>> {
        match self {
            MockResponse::Fulfill { status, body } => Some(Fulfillment::json(*status, body)),
            MockResponse::Created { farm_plot } => Some(Fulfillment::json(
                default_created_status(),
                &ApiEnvelope::created(farm_plot.clone()),
            )),
            MockResponse::Rejected { status, errors } => Some(Fulfillment::json(
                *status,
                &ApiEnvelope::rejected(errors.clone()),
            )),
            MockResponse::EchoCreated { .. } => None,
        }
    }

    /// Build the response to the `sequence`-th request served by this mock
    pub fn respond(&self, request: &InterceptedRequest, sequence: u64) -> E2eResult<Fulfillment> {
        match self {
            MockResponse::EchoCreated { ids } => echo(request, ids, sequence),
            fixed => fixed.fixed_fulfillment().unwrap_or_else(|| {
                Err(E2eError::RouteHandler("response depends on the request".to_string()))
            }),
        }
    }
}

fn echo(request: &InterceptedRequest, ids: &IdStrategy, sequence: u64) -> E2eResult<Fulfillment> {
    let submission: FarmPlotSubmission = request.post_data_json()?;
    let id = match ids {
        IdStrategy::Random { below } => rand::thread_rng().gen_range(0..(*below).max(1)),
        IdStrategy::Sequential { start } => start + sequence,
    };
    let farm_plot = FarmPlot::from_submission(id, &submission, Utc::now())
        .map_err(|e| E2eError::RouteHandler(e.to_string()))?;

    Fulfillment::json(default_created_status(), &ApiEnvelope::created(farm_plot))
}

enum Handler {
    Declarative(MockResponse),
    Custom(Arc<dyn RouteHandler>),
}

/// An installed interception: pattern, response source and hit counter
pub struct RouteMock {
    pattern: UrlGlob,
    handler: Handler,
    hits: AtomicU64,
}

impl RouteMock {
    pub fn new(pattern: &str, response: MockResponse) -> E2eResult<Self> {
        Ok(Self {
            pattern: UrlGlob::new(pattern)?,
            handler: Handler::Declarative(response),
            hits: AtomicU64::new(0),
        })
    }

    pub fn with_handler(pattern: &str, handler: impl RouteHandler + 'static) -> E2eResult<Self> {
        Ok(Self {
            pattern: UrlGlob::new(pattern)?,
            handler: Handler::Custom(Arc::new(handler)),
            hits: AtomicU64::new(0),
        })
    }

    pub fn pattern(&self) -> &UrlGlob {
        &self.pattern
    }

    /// The declarative response, `None` for programmatic handlers
    pub fn response(&self) -> Option<&MockResponse> {
        match &self.handler {
            Handler::Declarative(response) => Some(response),
            Handler::Custom(_) => None,
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        self.pattern.matches(url)
    }

    pub fn handle(&self, request: &InterceptedRequest) -> E2eResult<Fulfillment> {
        let sequence = self.hits.fetch_add(1, Ordering::SeqCst);
        debug!(
            "Route {} fulfilling {} {} (hit {})",
            self.pattern,
            request.method,
            request.url,
            sequence + 1
        );

        match &self.handler {
            Handler::Declarative(response) => response.respond(request, sequence),
            Handler::Custom(handler) => handler.fulfill(request),
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::SeqCst)
    }

    /// Fails when no request ever matched, the usual sign of a wrong glob
    pub fn assert_hit(&self) -> E2eResult<()> {
        if self.hits() == 0 {
            return Err(E2eError::AssertionFailed(format!(
                "route {} was never hit; check the URL glob",
                self.pattern
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for RouteMock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMock")
            .field("pattern", &self.pattern.as_str())
            .field("response", &self.response())
            .field("hits", &self.hits())
            .finish()
    }
}
