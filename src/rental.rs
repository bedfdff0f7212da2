use chrono::NaiveDate;
use thiserror::Error;

use crate::currencies::{convert_currency, RateTable};
use crate::models::{AddOnCounts, EffectivePricing, Listing, RentalRequest};
use crate::pricing::resolve_effective_pricing;

/// Fixed EUR-per-day add-on rates from the booking form.
pub const CHILD_SEAT_RATE_EUR: f64 = 5.0;
pub const EXTRA_DRIVER_RATE_EUR: f64 = 8.0;
pub const YOUNG_DRIVER_PACKAGE_RATE_EUR: f64 = 10.0;

/// An incomplete or inconsistent rental request. Returned instead of a
/// silent zero so callers can surface the problem.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuoteError {
    #[error("pickup and return dates are both required")]
    MissingDates,
    #[error("return date {return_date} must be after pickup date {pickup_date}")]
    InvalidDateRange {
        pickup_date: NaiveDate,
        return_date: NaiveDate,
    },
}

/// A fully computed rental quote. All amounts are EUR; display conversion
/// happens at the engine layer.
#[derive(Debug, Clone)]
pub struct RentalQuote {
    pub days: i64,
    pub pricing: EffectivePricing,
    pub car_cost_eur: f64,
    pub add_ons_cost_eur: f64,
    pub total_eur: f64,
}

/// Whole-day rental duration, always at least 1.
pub fn compute_days(pickup: NaiveDate, return_date: NaiveDate) -> Result<i64, QuoteError> {
    if return_date <= pickup {
        return Err(QuoteError::InvalidDateRange {
            pickup_date: pickup,
            return_date,
        });
    }
    Ok((return_date - pickup).num_days().max(1))
}

/// Tiered billing: whole weeks at the weekly rate, remaining days at the
/// daily rate. Rates are converted to EUR first when the listing's base
/// currency differs.
pub fn compute_car_rental_cost(pricing: &EffectivePricing, days: i64, table: &RateTable) -> f64 {
    let daily_eur = convert_currency(pricing.daily, &pricing.currency, "EUR", table);
    let weekly_eur = convert_currency(pricing.weekly, &pricing.currency, "EUR", table);

    let weeks = days / 7;
    let remainder = days % 7;
    weeks as f64 * weekly_eur + remainder as f64 * daily_eur
}

/// Add-on total in EUR: per-day unit rates times clamped counts times days.
pub fn compute_add_ons_cost(add_ons: &AddOnCounts, days: i64) -> f64 {
    let counts = add_ons.clamped();
    let per_day = counts.child_seat as f64 * CHILD_SEAT_RATE_EUR
        + counts.extra_driver as f64 * EXTRA_DRIVER_RATE_EUR
        + counts.young_driver_package as f64 * YOUNG_DRIVER_PACKAGE_RATE_EUR;
    per_day * days as f64
}

/// Compute the grand total for a booking. Seasonal pricing is resolved on
/// the pickup date.
pub fn compute_rental_total(
    listing: &Listing,
    request: &RentalRequest,
    table: &RateTable,
) -> Result<RentalQuote, QuoteError> {
    let (pickup, return_date) = match (request.pickup_date, request.return_date) {
        (Some(pickup), Some(return_date)) => (pickup, return_date),
        _ => return Err(QuoteError::MissingDates),
    };

    let days = compute_days(pickup, return_date)?;
    let pricing = resolve_effective_pricing(listing, pickup);
    let car_cost_eur = compute_car_rental_cost(&pricing, days, table);
    let add_ons_cost_eur = compute_add_ons_cost(&request.add_ons, days);

    Ok(RentalQuote {
        days,
        pricing,
        car_cost_eur,
        add_ons_cost_eur,
        total_eur: car_cost_eur + add_ons_cost_eur,
    })
}
