//! Expected end states of a submission: created, aggregated, or rejected

use farmplot_common::{CropType, FarmPlotSubmission, Field, Hectares};

use crate::expect::{Condition, Expectation};
use crate::sequencer::FormLocators;

/// Fixed confirmation shown after a plot is created
pub const SUCCESS_PHRASE: &str = "Farm plot created successfully";

/// Class pattern an input must match once the server flags it
pub const ERROR_CLASS_PATTERN: &str = "error|invalid";

/// `"12.75 hectares"`
pub fn hectares_label(hectares: Hectares) -> String {
    format!("{} hectares", hectares)
}

/// `"1 farm plot created"`, `"3 farm plots created"`
pub fn plots_created_label(count: usize) -> String {
    if count == 1 {
        "1 farm plot created".to_string()
    } else {
        format!("{} farm plots created", count)
    }
}

/// Builds the expectation lists for each outcome shape
#[derive(Debug, Clone, Default)]
pub struct OutcomeAssertions {
    locators: FormLocators,
}

impl OutcomeAssertions {
    pub fn new(locators: FormLocators) -> Self {
        Self { locators }
    }

    fn at(&self, selector: &str, condition: Condition) -> Expectation {
        Expectation::new(selector, condition)
    }

    /// Success message shown, no error, summary mirrors the plot
    pub fn created(&self, plot: &FarmPlotSubmission) -> Vec<Expectation> {
        let l = &self.locators;
        let mut expectations = vec![
            self.at(&l.success_message, Condition::Visible),
            self.at(&l.success_message, Condition::ContainsText(SUCCESS_PHRASE.to_string())),
            self.at(&l.error_message, Condition::Hidden),
            self.at(&l.plot_summary, Condition::ContainsText(plot.name.clone())),
        ];
        if let Some(crop_type) = plot.crop_type {
            expectations.push(self.at(
                &l.plot_summary,
                Condition::ContainsText(crop_type.as_str().to_string()),
            ));
        }
        if let Some(hectares) = plot.hectares {
            expectations.push(self.at(
                &l.plot_summary,
                Condition::ContainsText(hectares_label(hectares)),
            ));
        }
        expectations
    }

    /// The summary shows the exact value, neither neighbouring whole number
    pub fn exact_hectares(&self, hectares: Hectares) -> Vec<Expectation> {
        let summary = &self.locators.plot_summary;
        let mut expectations = vec![self.at(summary, Condition::ContainsText(hectares_label(hectares)))];

        let value = hectares.value();
        if value.fract() != 0.0 {
            for rounded in [value.floor(), value.ceil()] {
                if let Ok(rounded) = Hectares::new(rounded) {
                    expectations.push(self.at(
                        summary,
                        Condition::NotContainsText(hectares_label(rounded)),
                    ));
                }
            }
        }
        expectations
    }

    /// Count, every crop type, and the summed area across all plots
    pub fn aggregate(&self, plots: &[FarmPlotSubmission]) -> Vec<Expectation> {
        let l = &self.locators;
        let mut expectations = vec![self.at(
            &l.plots_list,
            Condition::ContainsText(plots_created_label(plots.len())),
        )];

        let mut crops: Vec<CropType> = Vec::new();
        for crop in plots.iter().filter_map(|p| p.crop_type) {
            if !crops.contains(&crop) {
                crops.push(crop);
            }
        }
        for crop in crops {
            expectations.push(self.at(&l.plots_list, Condition::ContainsText(crop.as_str().to_string())));
        }

        let total = Hectares::total(plots.iter().filter_map(|p| p.hectares.as_ref()));
        expectations.push(self.at(&l.total_hectares, Condition::ContainsText(hectares_label(total))));
        expectations
    }

    /// Error message shown verbatim, nothing created, the input flagged
    pub fn rejected(&self, field: Field, message: &str) -> Vec<Expectation> {
        let l = &self.locators;
        vec![
            self.at(&l.error_message, Condition::Visible),
            self.at(&l.error_message, Condition::ContainsText(message.to_string())),
            self.at(&l.success_message, Condition::Hidden),
            self.at(&l.plot_summary, Condition::Hidden),
            self.at(
                l.input_for(field),
                Condition::ClassMatches(ERROR_CLASS_PATTERN.to_string()),
            ),
        ]
    }

    pub fn submit_disabled(&self) -> Expectation {
        self.at(&self.locators.create_button, Condition::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plot(name: &str, crop: CropType, hectares: f64) -> FarmPlotSubmission {
        FarmPlotSubmission::new(name, crop, Hectares::new(hectares).unwrap())
    }

    fn texts(expectations: &[Expectation], selector: &str) -> Vec<String> {
        expectations
            .iter()
            .filter(|e| e.selector == selector)
            .filter_map(|e| match &e.condition {
                Condition::ContainsText(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_labels() {
        assert_eq!(plots_created_label(1), "1 farm plot created");
        assert_eq!(plots_created_label(3), "3 farm plots created");
        assert_eq!(hectares_label(Hectares::new(50.5).unwrap()), "50.5 hectares");
    }

    #[test]
    fn test_aggregate_of_three_plots() {
        let plots = vec![
            plot("South Field", CropType::Corn, 100.0),
            plot("East Field", CropType::Soybeans, 50.5),
            plot("West Field", CropType::Wheat, 75.0),
        ];
        let expectations = OutcomeAssertions::default().aggregate(&plots);

        assert_eq!(
            texts(&expectations, "#plots-list"),
            vec!["3 farm plots created", "Corn", "Soybeans", "Wheat"]
        );
        assert_eq!(texts(&expectations, "#total-hectares"), vec!["225.5 hectares"]);
    }

    #[test]
    fn test_exact_hectares_excludes_rounded_neighbours() {
        let expectations = OutcomeAssertions::default().exact_hectares(Hectares::new(12.75).unwrap());
        assert_eq!(
            expectations,
            vec![
                Expectation::new("#plot-summary", Condition::ContainsText("12.75 hectares".into())),
                Expectation::new("#plot-summary", Condition::NotContainsText("12 hectares".into())),
                Expectation::new("#plot-summary", Condition::NotContainsText("13 hectares".into())),
            ]
        );

        let whole = OutcomeAssertions::default().exact_hectares(Hectares::new(75.0).unwrap());
        assert_eq!(whole.len(), 1);
    }

    #[test]
    fn test_rejected_flags_the_field_input() {
        let expectations = OutcomeAssertions::default()
            .rejected(Field::Hectares, "Hectares must be greater than 0");
        assert!(expectations.contains(&Expectation::new(
            "#hectares",
            Condition::ClassMatches("error|invalid".into())
        )));
        assert!(expectations.contains(&Expectation::new("#success-message", Condition::Hidden)));
    }
}
