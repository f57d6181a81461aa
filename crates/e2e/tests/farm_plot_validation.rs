//! Farm plot creation with invalid inputs
//!
//! Each scenario mocks the create endpoint with the failure envelope the
//! backend would send and checks how the form surfaces it.

use std::sync::Arc;

use farmplot_common::validation::{HECTARES_NOT_POSITIVE, NAME_REQUIRED};
use farmplot_common::{CropType, FarmPlot, FarmPlotSubmission, Field, Hectares};
use farmplot_e2e::sim::app::FormPhase;
use farmplot_e2e::{
    expect, AuthPrecondition, Expect, ExpectConfig, Expectation, FormSequencer, MockResponse,
    OutcomeAssertions, Page, RouteMock, SimulatedPage, FARM_PLOTS_PATTERN,
};
use test_case::test_case;

const FORM_URL: &str = "https://farm-management-app.com/plots/create";

fn plot(name: &str, hectares: f64) -> FarmPlotSubmission {
    FarmPlotSubmission::new(name, CropType::Wheat, Hectares::new(hectares).unwrap())
}

async fn open_form(response: MockResponse) -> SimulatedPage {
    let page = SimulatedPage::default();
    AuthPrecondition::default().install(&page).await.unwrap();
    page.route(Arc::new(RouteMock::new(FARM_PLOTS_PATTERN, response).unwrap()))
        .await
        .unwrap();
    page.goto(FORM_URL).await.unwrap();
    page
}

async fn assert_all(page: &SimulatedPage, expectations: Vec<Expectation>) {
    for expectation in expectations {
        Expect::new(page, &expectation.selector, ExpectConfig::default())
            .check(&expectation.condition)
            .await
            .unwrap_or_else(|e| panic!("{}: {}", expectation, e));
    }
}

/// Failure envelope with the errors the backend reports for a submission
fn server_rejection(submission: &FarmPlotSubmission) -> MockResponse {
    let errors = submission.validate();
    assert!(!errors.is_empty(), "{:?} should be invalid", submission);
    MockResponse::Rejected { status: 400, errors }
}

#[tokio::test]
async fn rejects_an_empty_name() {
    let nameless = plot("", 25.0);
    let page = open_form(server_rejection(&nameless)).await;

    FormSequencer::default().submit(&page, &nameless).await.unwrap();

    assert_all(&page, OutcomeAssertions::default().rejected(Field::Name, NAME_REQUIRED)).await;
    assert_eq!(page.phase(), Some(FormPhase::Failed));
}

#[test_case(-10.0 ; "negative")]
#[test_case(0.0 ; "zero")]
#[tokio::test]
async fn rejects_non_positive_hectares(hectares: f64) {
    let submission = plot("Test Plot", hectares);
    let page = open_form(MockResponse::rejected(Field::Hectares, HECTARES_NOT_POSITIVE)).await;

    FormSequencer::default().submit(&page, &submission).await.unwrap();

    assert_all(
        &page,
        OutcomeAssertions::default().rejected(Field::Hectares, HECTARES_NOT_POSITIVE),
    )
    .await;
    assert!(!page.element("#success-message").await.unwrap().unwrap().visible);
}

#[tokio::test]
async fn zero_hectares_disables_submit() {
    let page = open_form(server_rejection(&plot("Test Plot", 0.0))).await;
    let outcomes = OutcomeAssertions::default();

    FormSequencer::default().submit(&page, &plot("Test Plot", 0.0)).await.unwrap();

    expect(&page, "#hectares").to_have_class("error|invalid").await.unwrap();
    assert_all(&page, vec![outcomes.submit_disabled()]).await;
    assert!(page.click("#create-btn").await.is_err());

    // correcting the value lifts the block
    page.fill("#hectares", "5").await.unwrap();
    expect(&page, "#create-btn").to_be_enabled().await.unwrap();
}

#[tokio::test]
async fn accepts_valid_farm_plot_data() {
    let valid = FarmPlotSubmission::new("Valid Plot", CropType::Corn, Hectares::new(50.5).unwrap());
    let farm_plot = FarmPlot::from_submission(789, &valid, "2024-01-15T12:00:00Z".parse().unwrap()).unwrap();
    let page = open_form(MockResponse::created(farm_plot)).await;

    FormSequencer::default().submit(&page, &valid).await.unwrap();

    assert_all(&page, OutcomeAssertions::default().created(&valid)).await;
    expect(&page, "#plot-summary").to_contain_text("50.5 hectares").await.unwrap();
    assert_eq!(page.phase(), Some(FormPhase::Succeeded));
}
