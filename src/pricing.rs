use chrono::NaiveDate;

use crate::models::{parse_display_date, EffectivePricing, Listing, SeasonalPricingEntry};

/// Resolve the price in force for a listing on a given date.
///
/// Seasonal entries whose inclusive [start, end] window contains the date
/// override the base pricing. When several windows overlap, the narrowest
/// window wins; equal widths are broken in favor of the entry listed last
/// (the one added most recently in the admin console). Entries with
/// unparsable dates are skipped with a warning and never abort resolution.
///
/// The returned pricing is always in the listing's base currency.
pub fn resolve_effective_pricing(listing: &Listing, on_date: NaiveDate) -> EffectivePricing {
    let mut matching: Vec<(usize, i64, &SeasonalPricingEntry)> = Vec::new();

    for (index, entry) in listing.seasonal_pricing.iter().enumerate() {
        let parsed = (
            parse_display_date(&entry.start_date),
            parse_display_date(&entry.end_date),
        );
        match parsed {
            (Ok(start), Ok(end)) => {
                if start <= on_date && on_date <= end {
                    matching.push((index, (end - start).num_days(), entry));
                }
            }
            _ => {
                eprintln!(
                    "⚠️  Warning: seasonal entry '{}' on listing {} has unparsable dates, skipping",
                    entry.name, listing.id
                );
            }
        }
    }

    // Narrowest window first; among equal widths the highest index wins.
    matching.sort_by_key(|(index, width, _)| (*width, std::cmp::Reverse(*index)));

    let base = &listing.pricing;
    match matching.first() {
        None => {
            let daily = base.daily;
            EffectivePricing {
                daily,
                weekly: base.weekly.unwrap_or(daily * 7.0),
                monthly: base.monthly.unwrap_or(daily * 30.0),
                currency: base.currency.clone(),
                source_name: None,
            }
        }
        Some((_, _, entry)) => {
            // Tier fallback: override, then base, then derivation from the
            // effective daily rate.
            let daily = entry.daily.unwrap_or(base.daily);
            EffectivePricing {
                daily,
                weekly: entry.weekly.or(base.weekly).unwrap_or(daily * 7.0),
                monthly: entry.monthly.or(base.monthly).unwrap_or(daily * 30.0),
                currency: base.currency.clone(),
                source_name: Some(entry.name.clone()),
            }
        }
    }
}
