//! Core types for farm plot submissions and the plot creation API

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Field name → human readable message, as carried by a failure envelope
pub type FieldErrors = BTreeMap<String, String>;

/// Crop types offered by the creation form's select box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CropType {
    Wheat,
    Corn,
    Soybeans,
    Rice,
    Barley,
    Cotton,
}

impl CropType {
    pub const ALL: [CropType; 6] = [
        CropType::Wheat,
        CropType::Corn,
        CropType::Soybeans,
        CropType::Rice,
        CropType::Barley,
        CropType::Cotton,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CropType::Wheat => "Wheat",
            CropType::Corn => "Corn",
            CropType::Soybeans => "Soybeans",
            CropType::Rice => "Rice",
            CropType::Barley => "Barley",
            CropType::Cotton => "Cotton",
        }
    }
}

impl fmt::Display for CropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CropType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|crop| crop.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownCropType(s.to_string()))
    }
}

/// Plot area in hectares.
///
/// Rendering uses the shortest literal that round-trips, so `12.75` shows as
/// `12.75` and `100.0` as `100`. Values are never rounded for display.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Hectares(f64);

impl Hectares {
    /// Wrap a finite value. Zero and negative areas are representable so
    /// that invalid submissions can be built; see [`Hectares::is_positive`].
    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() {
            Ok(Self(value))
        } else {
            Err(Error::InvalidHectares(value.to_string()))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0.0
    }

    /// Sum areas without binary floating point artifacts.
    ///
    /// Each value is re-read from its shortest decimal literal into a `Decimal`, so
    /// `100 + 50.5 + 75` renders `225.5` and `0.1 + 0.2` renders `0.3`.
    /// Falls back to a plain `f64` sum when a literal overflows `Decimal`.
    pub fn total<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a Hectares>,
    {
        let mut exact = Some(Decimal::ZERO);
        let mut float = 0.0;

        for value in values {
            float += value.0;
            exact = exact.and_then(|acc| {
                Decimal::from_str(&value.0.to_string())
                    .ok()
                    .and_then(|d| acc.checked_add(d))
            });
        }

        exact
            .and_then(|sum| sum.normalize().to_string().parse::<f64>().ok())
            .map(Self)
            .unwrap_or(Self(float))
    }
}

impl TryFrom<f64> for Hectares {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Hectares> for f64 {
    fn from(value: Hectares) -> Self {
        value.0
    }
}

/// Renders like JavaScript's `Number#toString`, which is what the page shows:
/// plain decimals from `1e-6` up to `1e21`, exponent form outside that range.
impl fmt::Display for Hectares {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.abs();
        // -0.0 renders as "-0" otherwise
        if self.0 == 0.0 {
            f.write_str("0")
        } else if abs < 1e-6 || abs >= 1e21 {
            let exponent = format!("{:e}", self.0);
            match exponent.split_once('e') {
                Some((mantissa, exp)) if !exp.starts_with('-') => write!(f, "{}e+{}", mantissa, exp),
                _ => f.write_str(&exponent),
            }
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for Hectares {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidHectares(s.to_string()))?;
        Self::new(value)
    }
}

/// Form fields that the backend can report errors against
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Name,
    CropType,
    Hectares,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Name, Field::CropType, Field::Hectares];

    /// Key used in the failure envelope's `errors` map
    pub fn key(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::CropType => "cropType",
            Field::Hectares => "hectares",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.key() == key)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A farm plot as typed into the creation form.
///
/// Crop type and hectares are optional so that incomplete or invalid
/// submissions can be driven through the form as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmPlotSubmission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub crop_type: Option<CropType>,
    #[serde(default)]
    pub hectares: Option<Hectares>,
}

impl FarmPlotSubmission {
    pub fn new(name: impl Into<String>, crop_type: CropType, hectares: Hectares) -> Self {
        Self {
            name: name.into(),
            crop_type: Some(crop_type),
            hectares: Some(hectares),
        }
    }

    /// Text typed into the hectares input
    pub fn hectares_text(&self) -> String {
        self.hectares.map(|h| h.to_string()).unwrap_or_default()
    }

    /// Errors the backend reports for this submission
    pub fn validate(&self) -> FieldErrors {
        crate::validation::validate(self)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// A created farm plot as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmPlot {
    pub id: u64,
    pub name: String,
    pub crop_type: CropType,
    pub hectares: Hectares,
    pub created_at: DateTime<Utc>,
}

impl FarmPlot {
    /// Build the record the API would return for a submission
    pub fn from_submission(
        id: u64,
        submission: &FarmPlotSubmission,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let crop_type = submission
            .crop_type
            .ok_or_else(|| Error::missing(Field::CropType.key()))?;
        let hectares = submission
            .hectares
            .ok_or_else(|| Error::missing(Field::Hectares.key()))?;

        Ok(Self {
            id,
            name: submission.name.clone(),
            crop_type,
            hectares,
            created_at,
        })
    }
}

/// Top-level body returned by `POST /api/farm-plots`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiEnvelope {
    Created {
        success: bool,
        #[serde(rename = "farmPlot")]
        farm_plot: FarmPlot,
    },
    Rejected {
        success: bool,
        errors: FieldErrors,
    },
}

impl ApiEnvelope {
    pub fn created(farm_plot: FarmPlot) -> Self {
        ApiEnvelope::Created {
            success: true,
            farm_plot,
        }
    }

    pub fn rejected(errors: FieldErrors) -> Self {
        ApiEnvelope::Rejected {
            success: false,
            errors,
        }
    }

    pub fn rejected_field(field: Field, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.key().to_string(), message.into());
        Self::rejected(errors)
    }

    /// Decode a response body, checking the `success` flag against its shape
    pub fn from_json(body: &str) -> Result<Self> {
        let envelope: Self = serde_json::from_str(body)?;
        match &envelope {
            ApiEnvelope::Created { success: false, .. } => Err(Error::Envelope(
                "farmPlot present but success is false".to_string(),
            )),
            ApiEnvelope::Rejected { success: true, .. } => Err(Error::Envelope(
                "errors present but success is true".to_string(),
            )),
            _ => Ok(envelope),
        }
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiEnvelope::Created { .. })
    }
}

/// Profile stored next to the auth token in browser storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub name: String,
    pub email: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            id: 1,
            name: "Test Farmer".to_string(),
            email: "farmer@test.com".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn ha(value: f64) -> Hectares {
        Hectares::new(value).unwrap()
    }

    #[test_case(25.5, "25.5")]
    #[test_case(12.75, "12.75")]
    #[test_case(100.0, "100")]
    #[test_case(-10.0, "-10")]
    #[test_case(-0.0, "0")]
    #[test_case(0.1, "0.1")]
    #[test_case(0.000001, "0.000001" ; "smallest plain decimal")]
    #[test_case(0.0000001, "1e-7" ; "below plain range")]
    #[test_case(0.00000015, "1.5e-7" ; "fractional mantissa")]
    #[test_case(1e20, "100000000000000000000" ; "largest plain decimal")]
    #[test_case(1.5e21, "1.5e+21" ; "above plain range")]
    fn test_hectares_display_keeps_precision(value: f64, expected: &str) {
        assert_eq!(ha(value).to_string(), expected);
    }

    #[test]
    fn test_hectares_rejects_non_finite() {
        assert!(Hectares::new(f64::NAN).is_err());
        assert!(Hectares::new(f64::INFINITY).is_err());
        assert!("inf".parse::<Hectares>().is_err());
        assert!("abc".parse::<Hectares>().is_err());
    }

    #[test]
    fn test_hectares_total_of_three_plots() {
        let plots = [ha(100.0), ha(50.5), ha(75.0)];
        assert_eq!(Hectares::total(&plots).to_string(), "225.5");
    }

    #[test]
    fn test_hectares_total_has_no_float_artifacts() {
        let plots = [ha(0.1), ha(0.2)];
        assert_eq!(Hectares::total(&plots).to_string(), "0.3");

        let halves = [ha(0.5), ha(0.5)];
        assert_eq!(Hectares::total(&halves).to_string(), "1");

        assert_eq!(Hectares::total(std::iter::empty()).to_string(), "0");
    }

    #[test]
    fn test_crop_type_parse() {
        assert_eq!("wheat".parse::<CropType>().unwrap(), CropType::Wheat);
        assert_eq!(" Soybeans ".parse::<CropType>().unwrap(), CropType::Soybeans);
        assert!(matches!(
            "Quinoa".parse::<CropType>(),
            Err(Error::UnknownCropType(_))
        ));
    }

    #[test]
    fn test_decode_created_envelope() {
        let body = r#"{
            "success": true,
            "farmPlot": {
                "id": 123,
                "name": "North Field",
                "cropType": "Wheat",
                "hectares": 25.5,
                "createdAt": "2024-01-15T10:30:00Z"
            }
        }"#;

        let envelope = ApiEnvelope::from_json(body).unwrap();
        match envelope {
            ApiEnvelope::Created { farm_plot, .. } => {
                assert_eq!(farm_plot.id, 123);
                assert_eq!(farm_plot.crop_type, CropType::Wheat);
                assert_eq!(farm_plot.hectares.to_string(), "25.5");
            }
            other => panic!("expected created envelope, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejected_envelope() {
        let body = r#"{"success": false, "errors": {"name": "Farm plot name is required"}}"#;
        let envelope = ApiEnvelope::from_json(body).unwrap();
        assert!(!envelope.is_success());
        assert_eq!(
            envelope,
            ApiEnvelope::rejected_field(Field::Name, "Farm plot name is required")
        );
    }

    #[test]
    fn test_envelope_flag_must_match_shape() {
        let body = r#"{"success": true, "errors": {"hectares": "bad"}}"#;
        assert!(matches!(
            ApiEnvelope::from_json(body),
            Err(Error::Envelope(_))
        ));
    }

    #[test]
    fn test_created_envelope_wire_shape() {
        let created_at = DateTime::parse_from_rfc3339("2024-01-15T11:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let submission = FarmPlotSubmission::new("Decimal Field", CropType::Wheat, ha(12.75));
        let plot = FarmPlot::from_submission(456, &submission, created_at).unwrap();
        let value = ApiEnvelope::created(plot).to_value().unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["farmPlot"]["cropType"], "Wheat");
        assert_eq!(value["farmPlot"]["hectares"], 12.75);
        assert_eq!(value["farmPlot"]["createdAt"], "2024-01-15T11:00:00Z");
    }

    #[test]
    fn test_submission_wire_shape_and_missing_fields() {
        let submission: FarmPlotSubmission =
            serde_json::from_str(r#"{"name": "", "hectares": 25}"#).unwrap();
        assert_eq!(submission.crop_type, None);
        assert_eq!(submission.hectares_text(), "25");

        let err = FarmPlot::from_submission(1, &submission, Utc::now()).unwrap_err();
        assert!(matches!(err, Error::InvalidField { ref field, .. } if field == "cropType"));
    }
}
