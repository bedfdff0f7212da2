use anyhow::Result;
use chrono::{Local, NaiveDate};
use sqlx::sqlite::SqlitePool;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::currencies::{
    convert_and_format, convert_currency, currency_info, eur, format_price, save_rate_snapshot,
    Currency, SUPPORTED_CURRENCIES,
};
use crate::db;
use crate::models::{EffectivePricing, Listing, RentalRequest};
use crate::pricing::resolve_effective_pricing;
use crate::rates::ExchangeRateStore;
use crate::rental::{compute_rental_total, QuoteError, RentalQuote};

pub const DISPLAY_CURRENCY_KEY: &str = "display_currency";

/// The one engine instance the rest of the application talks to. Built once
/// at startup and passed by reference, there is no ambient global state.
pub struct PricingEngine {
    store: Arc<ExchangeRateStore>,
    pool: SqlitePool,
    display_currency: RwLock<String>,
}

impl PricingEngine {
    /// Load the persisted display-currency preference and build the engine.
    /// A missing or unsupported saved code falls back to EUR.
    pub async fn new(store: Arc<ExchangeRateStore>, pool: SqlitePool) -> Result<Self> {
        let display_currency = match db::get_setting(&pool, DISPLAY_CURRENCY_KEY).await? {
            Some(code) if currency_info(&code).is_some() => code,
            Some(code) => {
                eprintln!(
                    "⚠️  Warning: saved display currency {} is not supported, using EUR",
                    code
                );
                eur().code.to_string()
            }
            None => eur().code.to_string(),
        };

        Ok(Self {
            store,
            pool,
            display_currency: RwLock::new(display_currency),
        })
    }

    pub fn display_currency(&self) -> String {
        self.display_currency.read().unwrap().clone()
    }

    /// Change and persist the preferred display currency.
    pub async fn set_display_currency(&self, code: &str) -> Result<()> {
        if currency_info(code).is_none() {
            anyhow::bail!("Unsupported display currency: {}", code);
        }
        db::set_setting(&self.pool, DISPLAY_CURRENCY_KEY, code).await?;
        *self.display_currency.write().unwrap() = code.to_string();
        Ok(())
    }

    pub fn supported_currencies(&self) -> &'static [Currency] {
        SUPPORTED_CURRENCIES
    }

    pub fn current_currency_info(&self) -> &'static Currency {
        currency_info(&self.display_currency()).unwrap_or_else(eur)
    }

    /// Convert an amount; the target defaults to the display currency.
    pub fn convert_amount(&self, amount: f64, from: &str, to: Option<&str>) -> f64 {
        let table = self.store.current_table();
        let to = to.map_or_else(|| self.display_currency(), str::to_string);
        convert_currency(amount, from, &to, &table)
    }

    /// Format an amount; the currency defaults to the display currency.
    pub fn format_price(&self, amount: f64, currency: Option<&str>) -> String {
        let currency = currency.map_or_else(|| self.display_currency(), str::to_string);
        format_price(amount, &currency)
    }

    pub fn convert_and_format_price(&self, amount: f64, from: &str, to: Option<&str>) -> String {
        let to = to.map_or_else(|| self.display_currency(), str::to_string);
        convert_and_format(amount, from, &to, &self.store.current_table())
    }

    pub fn resolve_effective_pricing(&self, listing: &Listing, date: NaiveDate) -> EffectivePricing {
        resolve_effective_pricing(listing, date)
    }

    pub fn compute_rental_total(
        &self,
        listing: &Listing,
        request: &RentalRequest,
    ) -> Result<RentalQuote, QuoteError> {
        compute_rental_total(listing, request, &self.store.current_table())
    }

    pub fn rate_store(&self) -> &ExchangeRateStore {
        &self.store
    }

    /// Manual refresh trigger. When a new table is applied the snapshot is
    /// persisted so a restart starts from the last-good rates. Persistence
    /// problems are logged, never fatal.
    pub async fn refresh_rates(&self) -> bool {
        let applied = self.store.refresh().await;
        if applied {
            let table = self.store.current_table();
            if let Err(e) =
                save_rate_snapshot(&self.pool, &table, Local::now().timestamp()).await
            {
                eprintln!("⚠️  Warning: failed to persist rate snapshot: {}", e);
            }
        }
        applied
    }

    /// Periodic refresh loop. The first tick fires immediately.
    pub async fn run_refresh_loop(self: Arc<Self>, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if self.refresh_rates().await {
                println!(
                    "✅ Exchange rates updated at {}",
                    Local::now().format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
    }

    pub fn spawn_refresh_task(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run_refresh_loop(every))
    }
}
