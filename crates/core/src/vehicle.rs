//! Closed vehicle-type vocabulary.
//!
//! Every persisted accident record carries exactly one of these labels.
//! Labels arrive from two places: a manual form field on upload, and the
//! free-text answer of the vehicle classifier. The former is validated
//! strictly, the latter is matched leniently by [`match_vehicle_label`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Car,
    Truck,
    Bus,
    Bike,
    Auto,
    Other,
}

/// The vocabulary in matching priority order.
///
/// [`match_vehicle_label`] returns the first entry found in a classifier
/// response, so the order here decides ties such as "a car behind a bus".
pub const VEHICLE_TYPES: [VehicleType; 6] = [
    VehicleType::Car,
    VehicleType::Truck,
    VehicleType::Bus,
    VehicleType::Bike,
    VehicleType::Auto,
    VehicleType::Other,
];

impl VehicleType {
    /// Catch-all label used when nothing better is known.
    pub const DEFAULT: VehicleType = VehicleType::Other;

    pub fn as_str(self) -> &'static str {
        match self {
            VehicleType::Car => "car",
            VehicleType::Truck => "truck",
            VehicleType::Bus => "bus",
            VehicleType::Bike => "bike",
            VehicleType::Auto => "auto",
            VehicleType::Other => "other",
        }
    }

    /// Parse an exact vocabulary member, ignoring case and surrounding
    /// whitespace. Returns `None` for anything outside the vocabulary.
    pub fn parse_label(label: &str) -> Option<Self> {
        let label = label.trim();
        VEHICLE_TYPES
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_label(s).ok_or_else(|| CoreError::Validation(invalid_vehicle_type_message()))
    }
}

/// Comma-separated vocabulary, e.g. for error messages.
pub fn valid_vehicle_types() -> String {
    VEHICLE_TYPES
        .iter()
        .map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Message returned to clients that submit a label outside the vocabulary.
pub fn invalid_vehicle_type_message() -> String {
    format!(
        "Invalid vehicle type. Valid types are: {}",
        valid_vehicle_types()
    )
}

/// Pick a vocabulary label out of free classifier text.
///
/// This is a containment match, not a parse: the text is lowercased and the
/// first vocabulary word (in [`VEHICLE_TYPES`] order) appearing anywhere in
/// it wins. Text mentioning none of them maps to [`VehicleType::DEFAULT`].
pub fn match_vehicle_label(text: &str) -> VehicleType {
    let text = text.to_lowercase();
    VEHICLE_TYPES
        .into_iter()
        .find(|v| text.contains(v.as_str()))
        .unwrap_or(VehicleType::DEFAULT)
}
