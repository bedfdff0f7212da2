// SPDX-FileCopyrightText: 2026 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Result;
use sqlx::sqlite::SqlitePool;
use std::collections::HashMap;

/// EUR-relative rate table: currency code -> units per EUR.
pub type RateTable = HashMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Currency {
    pub code: &'static str,
    pub display_name: &'static str,
    pub symbol: &'static str,
    pub decimals: u32,
}

/// The currencies the site offers for display. EUR first, it is the pivot
/// and the fallback for everything unknown.
pub const SUPPORTED_CURRENCIES: &[Currency] = &[
    Currency {
        code: "EUR",
        display_name: "Euro",
        symbol: "€",
        decimals: 2,
    },
    Currency {
        code: "USD",
        display_name: "US Dollar",
        symbol: "$",
        decimals: 2,
    },
    Currency {
        code: "TRY",
        display_name: "Turkish Lira",
        symbol: "₺",
        decimals: 0,
    },
];

pub fn currency_info(code: &str) -> Option<&'static Currency> {
    SUPPORTED_CURRENCIES.iter().find(|c| c.code == code)
}

pub fn eur() -> &'static Currency {
    &SUPPORTED_CURRENCIES[0]
}

/// Hard-coded fallback used before the first successful refresh.
pub fn default_rate_table() -> RateTable {
    let mut table = RateTable::new();
    table.insert("EUR".to_string(), 1.0);
    table.insert("USD".to_string(), 1.14);
    table.insert("TRY".to_string(), 37.5);
    table
}

fn round_to_decimals(amount: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (amount * factor).round() / factor
}

/// Look up a currency's EUR-relative rate. Unknown codes and non-positive
/// rates are treated as EUR-equivalent (rate 1.0) rather than failing.
fn rate_for(code: &str, table: &RateTable) -> f64 {
    match table.get(code) {
        Some(&rate) if rate > 0.0 => rate,
        Some(&rate) => {
            eprintln!(
                "⚠️  Warning: non-positive rate {} for {}, treating as EUR",
                rate, code
            );
            1.0
        }
        None => {
            eprintln!("⚠️  Warning: no exchange rate for {}, treating as EUR", code);
            1.0
        }
    }
}

/// Convert an amount between two currency codes by pivoting through EUR.
/// The result is rounded half-up at the target currency's decimal count.
pub fn convert_currency(
    amount: f64,
    from_currency: &str,
    to_currency: &str,
    table: &RateTable,
) -> f64 {
    if amount <= 0.0 {
        return 0.0;
    }
    if from_currency == to_currency {
        return amount;
    }

    let eur_amount = if from_currency == "EUR" {
        amount
    } else {
        amount / rate_for(from_currency, table)
    };

    let result = if to_currency == "EUR" {
        eur_amount
    } else {
        eur_amount * rate_for(to_currency, table)
    };

    let decimals = currency_info(to_currency).map_or(eur().decimals, |c| c.decimals);
    round_to_decimals(result, decimals)
}

/// Render an amount as `{symbol}{amount}` with the currency's fixed decimal
/// count. No thousands grouping, `.` as decimal point, so output does not
/// depend on the user's locale.
pub fn format_price(amount: f64, currency_code: &str) -> String {
    let currency = match currency_info(currency_code) {
        Some(c) => c,
        None => {
            eprintln!(
                "⚠️  Warning: unknown display currency {}, formatting as EUR",
                currency_code
            );
            eur()
        }
    };
    let rounded = round_to_decimals(amount, currency.decimals);
    format!(
        "{}{:.*}",
        currency.symbol,
        currency.decimals as usize,
        rounded
    )
}

pub fn convert_and_format(
    amount: f64,
    from_currency: &str,
    to_currency: &str,
    table: &RateTable,
) -> String {
    format_price(
        convert_currency(amount, from_currency, to_currency, table),
        to_currency,
    )
}

/// Replace the persisted rate snapshot wholesale with the given table.
pub async fn save_rate_snapshot(
    pool: &SqlitePool,
    table: &RateTable,
    fetched_at: i64,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM rate_snapshots")
        .execute(&mut *tx)
        .await?;

    for (code, rate) in table {
        sqlx::query(
            r#"
            INSERT INTO rate_snapshots (code, rate, fetched_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(code)
        .bind(rate)
        .bind(fetched_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Load the last persisted rate table, if any.
pub async fn load_rate_snapshot(pool: &SqlitePool) -> Result<Option<RateTable>> {
    let records = sqlx::query_as::<_, (String, f64)>(
        r#"
        SELECT code, rate
        FROM rate_snapshots
        ORDER BY code
        "#,
    )
    .fetch_all(pool)
    .await?;

    if records.is_empty() {
        return Ok(None);
    }

    Ok(Some(records.into_iter().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_conversion() {
        let table = default_rate_table();
        for currency in SUPPORTED_CURRENCIES {
            let result = convert_currency(123.45, currency.code, currency.code, &table);
            assert_relative_eq!(result, 123.45, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_eur_pivot_scenario() {
        let table = default_rate_table();

        let usd = convert_currency(100.0, "EUR", "USD", &table);
        assert_relative_eq!(usd, 114.0, epsilon = 0.001);

        // TRY rounds to whole units
        let try_amount = convert_currency(100.0, "EUR", "TRY", &table);
        assert_relative_eq!(try_amount, 3750.0, epsilon = 0.001);

        // USD -> TRY pivots through EUR
        let cross = convert_currency(114.0, "USD", "TRY", &table);
        assert_relative_eq!(cross, 3750.0, epsilon = 1.0);
    }

    #[test]
    fn test_round_trip_within_rounding_tolerance() {
        let table = default_rate_table();
        let there = convert_currency(100.0, "EUR", "USD", &table);
        let back = convert_currency(there, "USD", "EUR", &table);
        assert_relative_eq!(back, 100.0, epsilon = 0.01);
    }

    #[test]
    fn test_non_positive_amounts_convert_to_zero() {
        let table = default_rate_table();
        assert_eq!(convert_currency(0.0, "EUR", "USD", &table), 0.0);
        assert_eq!(convert_currency(-5.0, "EUR", "USD", &table), 0.0);
    }

    #[test]
    fn test_missing_code_treated_as_eur() {
        let table = default_rate_table();
        // Unknown source currency gets rate 1.0, so this behaves like EUR -> USD
        let result = convert_currency(100.0, "GBP", "USD", &table);
        assert_relative_eq!(result, 114.0, epsilon = 0.001);
    }

    #[test]
    fn test_zero_rate_treated_as_eur() {
        let mut table = default_rate_table();
        table.insert("USD".to_string(), 0.0);
        let result = convert_currency(100.0, "USD", "EUR", &table);
        assert_relative_eq!(result, 100.0, epsilon = 0.001);
    }

    #[test]
    fn test_format_price_fixed_decimals() {
        assert_eq!(format_price(1050.0, "TRY"), "₺1050");
        assert_eq!(format_price(10.004, "EUR"), "€10.00");
        assert_eq!(format_price(10.006, "EUR"), "€10.01");
        assert_eq!(format_price(1234.5, "USD"), "$1234.50");
    }

    #[test]
    fn test_format_price_unknown_code_falls_back_to_eur() {
        assert_eq!(format_price(9.5, "GBP"), "€9.50");
    }

    #[test]
    fn test_convert_and_format() {
        let table = default_rate_table();
        assert_eq!(convert_and_format(100.0, "EUR", "USD", &table), "$114.00");
        assert_eq!(convert_and_format(100.0, "EUR", "TRY", &table), "₺3750");
    }

    #[test]
    fn test_currency_registry() {
        assert_eq!(currency_info("TRY").unwrap().decimals, 0);
        assert_eq!(currency_info("EUR").unwrap().symbol, "€");
        assert!(currency_info("GBP").is_none());
        assert_eq!(eur().code, "EUR");
    }

    #[tokio::test]
    async fn test_rate_snapshot_round_trip() -> Result<()> {
        let pool = db::create_test_pool().await?;

        assert!(load_rate_snapshot(&pool).await?.is_none());

        let table = default_rate_table();
        save_rate_snapshot(&pool, &table, 1767225600).await?;

        let loaded = load_rate_snapshot(&pool).await?.unwrap();
        assert_eq!(loaded, table);

        // A second save replaces the snapshot wholesale
        let mut newer = default_rate_table();
        newer.insert("USD".to_string(), 1.20);
        newer.remove("TRY");
        save_rate_snapshot(&pool, &newer, 1767225700).await?;

        let loaded = load_rate_snapshot(&pool).await?.unwrap();
        assert_eq!(loaded, newer);
        assert!(!loaded.contains_key("TRY"));

        Ok(())
    }
}
