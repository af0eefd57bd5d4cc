use serde::Serialize;

use super::domain::PropertyData;

/// Input-contract failures; the only error a scoring call can surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyValidationError {
    #[error("property is missing a BIN")]
    MissingBin,
    #[error("BIN '{0}' must be a 7 digit building identification number")]
    MalformedBin(String),
    #[error("property is missing a borough")]
    MissingBorough,
    #[error("unrecognized borough '{0}'")]
    UnknownBorough(String),
}

/// The five NYC boroughs, as encoded by the city registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Borough {
    Manhattan,
    Bronx,
    Brooklyn,
    Queens,
    StatenIsland,
}

impl Borough {
    /// Accepts names, common abbreviations and the numeric borough codes used by DOB and HPD.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();

        match normalized.as_str() {
            "1" | "MN" | "MANHATTAN" | "NEW YORK" => Some(Self::Manhattan),
            "2" | "BX" | "BRONX" | "THE BRONX" => Some(Self::Bronx),
            "3" | "BK" | "BKLYN" | "BROOKLYN" => Some(Self::Brooklyn),
            "4" | "QN" | "QNS" | "QUEENS" => Some(Self::Queens),
            "5" | "SI" | "STATEN ISLAND" | "RICHMOND" => Some(Self::StatenIsland),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Borough::Manhattan => 1,
            Borough::Bronx => 2,
            Borough::Brooklyn => 3,
            Borough::Queens => 4,
            Borough::StatenIsland => 5,
        }
    }
}

/// Fail fast on missing identity rather than scoring an unidentifiable building.
pub fn validate_property(property: &PropertyData) -> Result<Borough, PropertyValidationError> {
    let bin = property.bin.trim();
    if bin.is_empty() {
        return Err(PropertyValidationError::MissingBin);
    }
    if bin.len() != 7 || !bin.chars().all(|c| c.is_ascii_digit()) {
        return Err(PropertyValidationError::MalformedBin(bin.to_string()));
    }

    let borough = property.borough.trim();
    if borough.is_empty() {
        return Err(PropertyValidationError::MissingBorough);
    }

    Borough::parse(borough)
        .ok_or_else(|| PropertyValidationError::UnknownBorough(borough.to_string()))
}
