//! Behaviour of the plot creation page: input handling, the submit request,
//! and rendering of the API's answer

use farmplot_common::validation;
use farmplot_common::{ApiEnvelope, CropType, FarmPlot, FarmPlotSubmission, Field, FieldErrors, Hectares};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};
use crate::mock::Fulfillment;
use crate::outcome::{hectares_label, plots_created_label, SUCCESS_PHRASE};
use crate::sim::dom::{element_id, Document, Element, ElementKind};

pub mod ids {
    pub const PLOT_NAME: &str = "plot-name";
    pub const CROP_TYPE: &str = "crop-type";
    pub const HECTARES: &str = "hectares";
    pub const CREATE_BUTTON: &str = "create-btn";
    pub const SUCCESS_MESSAGE: &str = "success-message";
    pub const ERROR_MESSAGE: &str = "error-message";
    pub const PLOT_SUMMARY: &str = "plot-summary";
    pub const PLOTS_LIST: &str = "plots-list";
    pub const TOTAL_HECTARES: &str = "total-hectares";
    pub const LOGIN_FORM: &str = "login-form";
}

const ERROR_CLASS: &str = "error";

/// Where the form is in its submit cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormPhase {
    Idle,
    Filled,
    Submitted,
    Succeeded,
    Failed,
}

fn input_id(field: Field) -> &'static str {
    match field {
        Field::Name => ids::PLOT_NAME,
        Field::CropType => ids::CROP_TYPE,
        Field::Hectares => ids::HECTARES,
    }
}

fn field_for_input(id: &str) -> Option<Field> {
    Field::ALL.iter().copied().find(|&field| input_id(field) == id)
}

/// A loaded page: either the creation form or the login screen it
/// redirects to
#[derive(Debug, Clone)]
pub struct FormApp {
    doc: Document,
    phase: FormPhase,
    plots: Vec<FarmPlot>,
    flagged: BTreeSet<Field>,
}

impl FormApp {
    pub fn creation_form() -> Self {
        let mut doc = Document::default();
        doc.insert(ids::PLOT_NAME, Element::new(ElementKind::TextInput).with_class("form-input"));
        doc.insert(
            ids::CROP_TYPE,
            Element::new(ElementKind::Select {
                options: CropType::ALL.iter().map(|c| c.as_str().to_string()).collect(),
            })
            .with_class("form-input"),
        );
        doc.insert(ids::HECTARES, Element::new(ElementKind::NumberInput).with_class("form-input"));
        doc.insert(ids::CREATE_BUTTON, Element::new(ElementKind::Button).with_text("Create plot"));

        for region in [
            ids::SUCCESS_MESSAGE,
            ids::ERROR_MESSAGE,
            ids::PLOT_SUMMARY,
            ids::PLOTS_LIST,
            ids::TOTAL_HECTARES,
        ] {
            doc.insert(region, Element::new(ElementKind::Region).hidden());
        }

        Self {
            doc,
            phase: FormPhase::Idle,
            plots: Vec::new(),
            flagged: BTreeSet::new(),
        }
    }

    pub fn login_page() -> Self {
        let mut doc = Document::default();
        doc.insert(
            ids::LOGIN_FORM,
            Element::new(ElementKind::Region).with_text("Please sign in to manage your farm plots"),
        );

        Self {
            doc,
            phase: FormPhase::Idle,
            plots: Vec::new(),
            flagged: BTreeSet::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn plots(&self) -> &[FarmPlot] {
        &self.plots
    }

    fn element_mut(&mut self, selector: &str) -> E2eResult<&mut Element> {
        let id = element_id(selector)?;
        self.doc
            .get_mut(id)
            .ok_or_else(|| E2eError::ElementNotFound(selector.to_string()))
    }

    fn show(&mut self, id: &str, text: String) {
        if let Some(element) = self.doc.get_mut(id) {
            element.show(text);
        }
    }

    fn hide(&mut self, id: &str) {
        if let Some(element) = self.doc.get_mut(id) {
            element.hide();
        }
    }

    fn set_error_class(&mut self, id: &str, on: bool) {
        if let Some(element) = self.doc.get_mut(id) {
            element.set_class(ERROR_CLASS, on);
        }
    }

    pub fn fill(&mut self, selector: &str, value: &str) -> E2eResult<()> {
        let element = self.element_mut(selector)?;
        match element.kind {
            ElementKind::TextInput => {}
            ElementKind::NumberInput => {
                if !value.is_empty() && value.parse::<Hectares>().is_err() {
                    return Err(E2eError::action(
                        selector,
                        format!("cannot type {:?} into a number input", value),
                    ));
                }
            }
            _ => return Err(E2eError::action(selector, "element is not an input")),
        }
        if element.disabled {
            return Err(E2eError::action(selector, "element is disabled"));
        }
        element.value = value.to_string();

        self.input_changed(element_id(selector)?);
        Ok(())
    }

    pub fn select(&mut self, selector: &str, value: &str) -> E2eResult<()> {
        let element = self.element_mut(selector)?;
        let ElementKind::Select { options } = &element.kind else {
            return Err(E2eError::action(selector, "element is not a <select>"));
        };
        if !options.iter().any(|option| option == value) {
            return Err(E2eError::action(
                selector,
                format!("no option {:?} among {:?}", value, options),
            ));
        }
        element.value = value.to_string();

        self.input_changed(element_id(selector)?);
        Ok(())
    }

    fn input_changed(&mut self, id: &str) {
        if let Some(field) = field_for_input(id) {
            if self.flagged.remove(&field) {
                self.set_error_class(id, false);
            }
            self.refresh_submit_state();
        }
        if matches!(self.phase, FormPhase::Idle | FormPhase::Succeeded | FormPhase::Failed) {
            self.phase = FormPhase::Filled;
        }
    }

    /// The submission the inputs currently describe
    pub fn current_submission(&self) -> FarmPlotSubmission {
        let value = |id: &str| self.doc.get(id).map(|e| e.value.clone()).unwrap_or_default();

        FarmPlotSubmission {
            name: value(ids::PLOT_NAME),
            crop_type: value(ids::CROP_TYPE).parse().ok(),
            hectares: value(ids::HECTARES).parse().ok(),
        }
    }

    /// Handle a click. Returns the JSON body to POST when the click submits
    /// the form.
    pub fn click(&mut self, selector: &str) -> E2eResult<Option<String>> {
        let element = self.element_mut(selector)?;
        if element.disabled {
            return Err(E2eError::action(selector, "element is disabled"));
        }
        if element_id(selector)? != ids::CREATE_BUTTON {
            debug!("Click on {} has no effect", selector);
            return Ok(None);
        }

        self.hide(ids::SUCCESS_MESSAGE);
        self.hide(ids::ERROR_MESSAGE);
        self.phase = FormPhase::Submitted;

        let body = serde_json::to_string(&self.current_submission())?;
        Ok(Some(body))
    }

    /// Render the API's answer to the last submit
    pub fn apply_response(&mut self, fulfillment: &Fulfillment) {
        match (fulfillment.is_success(), ApiEnvelope::from_json(&fulfillment.body)) {
            (true, Ok(ApiEnvelope::Created { farm_plot, .. })) => self.render_created(farm_plot),
            (false, Ok(ApiEnvelope::Rejected { errors, .. })) => self.render_rejected(&errors),
            (_, decoded) => {
                warn!(
                    "Unexpected response (status {}): {:?}",
                    fulfillment.status,
                    decoded.err()
                );
                self.render_failure(
                    format!("Unexpected response from server (status {})", fulfillment.status),
                    BTreeSet::new(),
                );
            }
        }
    }

    fn render_created(&mut self, plot: FarmPlot) {
        let summary = format!(
            "{} · {} · {}",
            plot.name,
            plot.crop_type,
            hectares_label(plot.hectares)
        );
        self.plots.push(plot);

        let mut listing = plots_created_label(self.plots.len());
        for p in &self.plots {
            listing.push_str(&format!("\n{}: {}, {}", p.name, p.crop_type, hectares_label(p.hectares)));
        }
        let total = Hectares::total(self.plots.iter().map(|p| &p.hectares));

        self.hide(ids::ERROR_MESSAGE);
        self.show(ids::SUCCESS_MESSAGE, SUCCESS_PHRASE.to_string());
        self.show(ids::PLOT_SUMMARY, summary);
        self.show(ids::PLOTS_LIST, listing);
        self.show(ids::TOTAL_HECTARES, hectares_label(total));

        self.set_flagged(BTreeSet::new());
        self.phase = FormPhase::Succeeded;
    }

    fn render_rejected(&mut self, errors: &FieldErrors) {
        let message = errors.values().cloned().collect::<Vec<_>>().join("\n");
        let flagged = errors.keys().filter_map(|key| Field::from_key(key)).collect();
        self.render_failure(message, flagged);
    }

    fn render_failure(&mut self, message: String, flagged: BTreeSet<Field>) {
        self.hide(ids::SUCCESS_MESSAGE);
        self.hide(ids::PLOT_SUMMARY);
        self.show(ids::ERROR_MESSAGE, message);

        self.set_flagged(flagged);
        self.phase = FormPhase::Failed;
    }

    fn set_flagged(&mut self, flagged: BTreeSet<Field>) {
        for field in Field::ALL {
            self.set_error_class(input_id(field), flagged.contains(&field));
        }
        self.flagged = flagged;
        self.refresh_submit_state();
    }

    /// Submit stays disabled while a flagged input still breaks its rule
    fn refresh_submit_state(&mut self) {
        let current = self.current_submission();
        let blocked = self
            .flagged
            .iter()
            .any(|&field| validation::field_error(field, &current).is_some());
        if let Some(button) = self.doc.get_mut(ids::CREATE_BUTTON) {
            button.disabled = blocked;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn created(name: &str, crop: CropType, hectares: f64) -> Fulfillment {
        let plot = FarmPlot {
            id: 1,
            name: name.to_string(),
            crop_type: crop,
            hectares: Hectares::new(hectares).unwrap(),
            created_at: Utc::now(),
        };
        Fulfillment::json(201, &ApiEnvelope::created(plot)).unwrap()
    }

    fn rejected(field: Field, message: &str) -> Fulfillment {
        Fulfillment::json(400, &ApiEnvelope::rejected_field(field, message)).unwrap()
    }

    fn text(app: &FormApp, id: &str) -> String {
        app.document().get(id).unwrap().text.clone()
    }

    #[test]
    fn test_submit_body_reflects_inputs() {
        let mut app = FormApp::creation_form();
        app.fill("#plot-name", "North Field").unwrap();
        app.select("#crop-type", "Wheat").unwrap();
        app.fill("#hectares", "25.5").unwrap();
        assert_eq!(app.phase(), FormPhase::Filled);

        let body = app.click("#create-btn").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["name"], "North Field");
        assert_eq!(value["cropType"], "Wheat");
        assert_eq!(value["hectares"], 25.5);
        assert_eq!(app.phase(), FormPhase::Submitted);
    }

    #[test]
    fn test_number_input_rejects_text() {
        let mut app = FormApp::creation_form();
        assert!(app.fill("#hectares", "lots").is_err());
        assert!(app.fill("#hectares", "-10").is_ok());
        assert!(app.select("#crop-type", "Quinoa").is_err());
        assert!(matches!(
            app.fill("#missing", "x"),
            Err(E2eError::ElementNotFound(_))
        ));
    }

    #[test]
    fn test_created_renders_summary_list_and_total() {
        let mut app = FormApp::creation_form();
        app.apply_response(&created("South Field", CropType::Corn, 100.0));
        app.apply_response(&created("East Field", CropType::Soybeans, 50.5));

        assert_eq!(app.phase(), FormPhase::Succeeded);
        assert_eq!(text(&app, ids::SUCCESS_MESSAGE), SUCCESS_PHRASE);
        assert_eq!(text(&app, ids::PLOT_SUMMARY), "East Field · Soybeans · 50.5 hectares");
        assert!(text(&app, ids::PLOTS_LIST).starts_with("2 farm plots created"));
        assert_eq!(text(&app, ids::TOTAL_HECTARES), "150.5 hectares");

        let names: Vec<&str> = app.plots().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["South Field", "East Field"]);
    }

    #[test]
    fn test_rejected_zero_hectares_disables_submit() {
        let mut app = FormApp::creation_form();
        app.fill("#plot-name", "Test Plot").unwrap();
        app.select("#crop-type", "Wheat").unwrap();
        app.fill("#hectares", "0").unwrap();
        app.click("#create-btn").unwrap();
        app.apply_response(&rejected(Field::Hectares, validation::HECTARES_NOT_POSITIVE));

        let hectares = app.document().get(ids::HECTARES).unwrap();
        assert!(hectares.classes.contains("error"));
        assert!(app.document().get(ids::CREATE_BUTTON).unwrap().disabled);
        assert!(!app.document().get(ids::SUCCESS_MESSAGE).unwrap().visible);
        assert!(app.click("#create-btn").is_err());
        assert!(app.plots().is_empty());

        // fixing the value clears the flag and re-enables submit
        app.fill("#hectares", "5").unwrap();
        assert!(!app.document().get(ids::HECTARES).unwrap().classes.contains("error"));
        assert!(!app.document().get(ids::CREATE_BUTTON).unwrap().disabled);
    }

    #[test]
    fn test_unexpected_body_shows_generic_error() {
        let mut app = FormApp::creation_form();
        let fulfillment = Fulfillment::json(500, &serde_json::json!({"oops": true})).unwrap();
        app.apply_response(&fulfillment);

        assert_eq!(app.phase(), FormPhase::Failed);
        assert!(text(&app, ids::ERROR_MESSAGE).contains("status 500"));
    }
}
