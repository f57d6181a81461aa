//! Turns a farm plot submission into form interactions

use farmplot_common::{FarmPlotSubmission, Field};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::E2eResult;
use crate::expect::{Expect, ExpectConfig};
use crate::page::{Page, PageAction};

/// Selectors of the creation form and its result regions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormLocators {
    pub plot_name: String,
    pub crop_type: String,
    pub hectares: String,
    pub create_button: String,
    pub success_message: String,
    pub error_message: String,
    pub plot_summary: String,
    pub plots_list: String,
    pub total_hectares: String,
}

impl Default for FormLocators {
    fn default() -> Self {
        Self {
            plot_name: "#plot-name".to_string(),
            crop_type: "#crop-type".to_string(),
            hectares: "#hectares".to_string(),
            create_button: "#create-btn".to_string(),
            success_message: "#success-message".to_string(),
            error_message: "#error-message".to_string(),
            plot_summary: "#plot-summary".to_string(),
            plots_list: "#plots-list".to_string(),
            total_hectares: "#total-hectares".to_string(),
        }
    }
}

impl FormLocators {
    /// Input that carries a field's value and its error styling
    pub fn input_for(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.plot_name,
            Field::CropType => &self.crop_type,
            Field::Hectares => &self.hectares,
        }
    }
}

/// Drives the creation form. Knows nothing about the outcome.
#[derive(Debug, Clone, Default)]
pub struct FormSequencer {
    locators: FormLocators,
}

impl FormSequencer {
    pub fn new(locators: FormLocators) -> Self {
        Self { locators }
    }

    pub fn locators(&self) -> &FormLocators {
        &self.locators
    }

    /// Name, crop type, hectares, then submit. A missing crop type leaves
    /// the select untouched.
    pub fn actions(&self, submission: &FarmPlotSubmission) -> Vec<PageAction> {
        let mut actions = vec![PageAction::fill(&self.locators.plot_name, submission.name.clone())];
        if let Some(crop_type) = submission.crop_type {
            actions.push(PageAction::select(&self.locators.crop_type, crop_type.as_str()));
        }
        actions.push(PageAction::fill(&self.locators.hectares, submission.hectares_text()));
        actions.push(PageAction::click(&self.locators.create_button));
        actions
    }

    pub async fn submit(&self, page: &dyn Page, submission: &FarmPlotSubmission) -> E2eResult<()> {
        debug!("Submitting plot {:?}", submission.name);
        for action in self.actions(submission) {
            action.perform(page).await?;
        }
        Ok(())
    }

    /// Submit each plot in order, waiting for the success message before
    /// moving to the next one
    pub async fn submit_all(
        &self,
        page: &dyn Page,
        plots: &[FarmPlotSubmission],
        expect: ExpectConfig,
    ) -> E2eResult<()> {
        for plot in plots {
            self.submit(page, plot).await?;
            Expect::new(page, &self.locators.success_message, expect)
                .to_be_visible()
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farmplot_common::{CropType, Hectares};

    #[test]
    fn test_actions_in_form_order() {
        let sequencer = FormSequencer::default();
        let plot = FarmPlotSubmission::new("North Field", CropType::Wheat, Hectares::new(25.5).unwrap());

        assert_eq!(
            sequencer.actions(&plot),
            vec![
                PageAction::fill("#plot-name", "North Field"),
                PageAction::select("#crop-type", "Wheat"),
                PageAction::fill("#hectares", "25.5"),
                PageAction::click("#create-btn"),
            ]
        );
    }

    #[test]
    fn test_missing_crop_type_skips_select() {
        let sequencer = FormSequencer::default();
        let plot = FarmPlotSubmission {
            name: "Bare Field".to_string(),
            crop_type: None,
            hectares: None,
        };

        let names: Vec<String> = sequencer.actions(&plot).iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["fill:#plot-name", "fill:#hectares", "click:#create-btn"]);
    }

    #[test]
    fn test_custom_locators() {
        let locators = FormLocators {
            create_button: "#submit".to_string(),
            ..Default::default()
        };
        let plot = FarmPlotSubmission::new("A", CropType::Corn, Hectares::new(1.0).unwrap());
        let actions = FormSequencer::new(locators).actions(&plot);
        assert_eq!(actions.last(), Some(&PageAction::click("#submit")));
    }
}
