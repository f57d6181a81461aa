//! Field rules and the messages the plot creation API reports for them

use crate::types::{CropType, FarmPlotSubmission, Field, FieldErrors, Hectares};

pub const NAME_REQUIRED: &str = "Farm plot name is required";
pub const CROP_TYPE_REQUIRED: &str = "Crop type is required";
pub const HECTARES_NOT_POSITIVE: &str = "Hectares must be greater than 0";

pub fn name_error(name: &str) -> Option<&'static str> {
    if name.trim().is_empty() {
        Some(NAME_REQUIRED)
    } else {
        None
    }
}

pub fn crop_type_error(crop_type: Option<CropType>) -> Option<&'static str> {
    match crop_type {
        Some(_) => None,
        None => Some(CROP_TYPE_REQUIRED),
    }
}

/// The bound is exclusive: zero is as invalid as a negative area.
pub fn hectares_error(hectares: Option<Hectares>) -> Option<&'static str> {
    match hectares {
        Some(h) if h.is_positive() => None,
        _ => Some(HECTARES_NOT_POSITIVE),
    }
}

/// Message for a single field, if it violates its rule
pub fn field_error(field: Field, submission: &FarmPlotSubmission) -> Option<&'static str> {
    match field {
        Field::Name => name_error(&submission.name),
        Field::CropType => crop_type_error(submission.crop_type),
        Field::Hectares => hectares_error(submission.hectares),
    }
}

pub fn validate(submission: &FarmPlotSubmission) -> FieldErrors {
    Field::ALL
        .iter()
        .filter_map(|&field| {
            field_error(field, submission)
                .map(|message| (field.key().to_string(), message.to_string()))
        })
        .collect()
}
