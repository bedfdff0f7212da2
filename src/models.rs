use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A rentable car listing with its canonical pricing schema. All field
/// normalization happens here at the serde boundary, never inside the
/// pricing logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub name: String,
    pub pricing: BasePricing,
    #[serde(default)]
    pub seasonal_pricing: Vec<SeasonalPricingEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasePricing {
    pub daily: f64,
    pub weekly: Option<f64>,
    pub monthly: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "EUR".to_string()
}

/// A named, date-bounded override of a listing's rates. Dates are kept as
/// the admin-entered strings and parsed when matching; boundaries are
/// inclusive. Seasonal entries never carry their own currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalPricingEntry {
    pub name: String,
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
    pub daily: Option<f64>,
    pub weekly: Option<f64>,
    pub monthly: Option<f64>,
}

/// The price in force for a listing on a specific date, all tiers filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectivePricing {
    pub daily: f64,
    pub weekly: f64,
    pub monthly: f64,
    pub currency: String,
    /// Name of the seasonal entry that supplied the overrides, if any.
    pub source_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AddOnCounts {
    #[serde(default)]
    pub child_seat: u32,
    #[serde(default)]
    pub extra_driver: u32,
    #[serde(default)]
    pub young_driver_package: u32,
}

impl AddOnCounts {
    /// Counts outside the booking form's caps are clamped, not rejected.
    pub fn clamped(&self) -> AddOnCounts {
        AddOnCounts {
            child_seat: self.child_seat.min(3),
            extra_driver: self.extra_driver.min(1),
            young_driver_package: self.young_driver_package.min(1),
        }
    }
}

/// A booking request as it arrives from the booking form. Dates are optional
/// so an incomplete form is representable and can be rejected explicitly.
#[derive(Debug, Clone, Default)]
pub struct RentalRequest {
    pub pickup_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub add_ons: AddOnCounts,
}

/// Parse an admin-entered date. The admin console displays day/month/year;
/// ISO dates are accepted as well.
pub fn parse_display_date(text: &str) -> Result<NaiveDate> {
    for format in ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Ok(date);
        }
    }
    anyhow::bail!("Unrecognized date: {}", text)
}

pub fn load_listings(path: &Path) -> Result<Vec<Listing>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read listings file {}", path.display()))?;
    let listings: Vec<Listing> =
        serde_json::from_str(&text).context("Failed to parse listings file")?;
    Ok(listings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_display_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        assert_eq!(parse_display_date("01/06/2026").unwrap(), expected);
        assert_eq!(parse_display_date("01-06-2026").unwrap(), expected);
        assert_eq!(parse_display_date("2026-06-01").unwrap(), expected);

        assert!(parse_display_date("June 1st").is_err());
        assert!(parse_display_date("32/01/2026").is_err());
    }

    #[test]
    fn test_listing_deserialization() {
        let json = r#"
        {
            "id": "fiat-egea",
            "name": "Fiat Egea 1.4",
            "pricing": { "daily": 38.0, "weekly": 240.0 },
            "seasonal_pricing": [
                { "name": "Summer", "startDate": "01/06/2026", "endDate": "31/08/2026", "daily": 55.0 }
            ]
        }
        "#;
        let listing: Listing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.pricing.currency, "EUR"); // default
        assert_eq!(listing.pricing.weekly, Some(240.0));
        assert!(listing.pricing.monthly.is_none());
        assert_eq!(listing.seasonal_pricing[0].name, "Summer");
        assert_eq!(listing.seasonal_pricing[0].start_date, "01/06/2026");
        assert!(listing.seasonal_pricing[0].weekly.is_none());
    }

    #[test]
    fn test_listing_without_seasonal_pricing() {
        let json = r#"{ "id": "x", "name": "X", "pricing": { "daily": 30.0, "currency": "TRY" } }"#;
        let listing: Listing = serde_json::from_str(json).unwrap();
        assert!(listing.seasonal_pricing.is_empty());
        assert_eq!(listing.pricing.currency, "TRY");
    }

    #[test]
    fn test_add_on_counts_clamped() {
        let counts = AddOnCounts {
            child_seat: 7,
            extra_driver: 2,
            young_driver_package: 5,
        };
        let clamped = counts.clamped();
        assert_eq!(clamped.child_seat, 3);
        assert_eq!(clamped.extra_driver, 1);
        assert_eq!(clamped.young_driver_package, 1);
    }

    #[test]
    fn test_load_listings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"[{{ "id": "a", "name": "A", "pricing": {{ "daily": 40.0 }} }}]"#
        )
        .unwrap();

        let listings = load_listings(&path).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].id, "a");

        assert!(load_listings(&dir.path().join("missing.json")).is_err());
    }
}
