// SPDX-FileCopyrightText: 2026 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

mod api;
mod config;
mod currencies;
mod db;
mod engine;
mod models;
mod pricing;
mod rates;
mod rental;

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::api::RateSourceClient;
use crate::engine::PricingEngine;
use crate::models::{parse_display_date, AddOnCounts, Listing, RentalRequest};
use crate::rates::ExchangeRateStore;

#[derive(Parser)]
#[command(name = "carrates", about = "Currency conversion and rental pricing console")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the current exchange rate table
    Rates,
    /// Fetch a fresh rate table from the rate source
    Refresh,
    /// Export the current rate table to a timestamped CSV under output/
    ExportRates,
    /// List the supported display currencies
    Currencies,
    /// Set the preferred display currency
    SetCurrency { code: String },
    /// Show each listing's effective prices on a date (defaults to today)
    Prices {
        #[arg(long)]
        date: Option<String>,
    },
    /// Quote a rental booking
    Quote {
        /// Listing id from the listings file
        #[arg(long)]
        listing: String,
        /// Pickup date (dd/mm/yyyy or yyyy-mm-dd)
        #[arg(long)]
        pickup: String,
        /// Return date (dd/mm/yyyy or yyyy-mm-dd)
        #[arg(long = "return")]
        return_date: String,
        #[arg(long, default_value_t = 0)]
        child_seats: u32,
        #[arg(long, default_value_t = 0)]
        extra_drivers: u32,
        #[arg(long, default_value_t = 0)]
        young_driver: u32,
        /// Display currency for this quote (defaults to the saved preference)
        #[arg(long)]
        currency: Option<String>,
    },
    /// Run the periodic refresh loop, printing applied updates
    Watch,
    /// Write a default config.toml next to the manifest
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let cli = Cli::parse();

    if matches!(cli.command, Command::InitConfig) {
        config::save_config(&config::Config::default())?;
        println!("✅ Default config.toml written");
        return Ok(());
    }

    let config = config::load_config().unwrap_or_default();

    let pool = db::create_db_pool(&config.database_url).await?;
    let client = RateSourceClient::new(config.rate_api_url.clone());

    // Seed from the last persisted snapshot so a restart does not regress
    // to the hard-coded defaults.
    let store = match currencies::load_rate_snapshot(&pool).await? {
        Some(snapshot) => ExchangeRateStore::with_table(client, snapshot),
        None => ExchangeRateStore::new(client),
    };
    let engine = Arc::new(PricingEngine::new(Arc::new(store), pool).await?);

    match cli.command {
        Command::Rates => show_rates(&engine),
        Command::Refresh => {
            if engine.refresh_rates().await {
                println!("✅ Exchange rates updated");
            } else {
                println!("⚠️  Refresh failed, still using the last-good table");
            }
            show_rates(&engine);
        }
        Command::ExportRates => export_rates_csv(&engine)?,
        Command::Currencies => {
            let current = engine.display_currency();
            for currency in engine.supported_currencies() {
                let marker = if currency.code == current { " (current)" } else { "" };
                println!(
                    "{} {} - {}{}",
                    currency.code, currency.symbol, currency.display_name, marker
                );
            }
        }
        Command::SetCurrency { code } => {
            engine.set_display_currency(&code).await?;
            println!("✅ Display currency set to {}", code);
        }
        Command::Prices { date } => {
            let on_date = match date {
                Some(text) => parse_display_date(&text)?,
                None => Local::now().date_naive(),
            };
            let listings = models::load_listings(Path::new(&config.listings_path))?;
            show_prices(&engine, &listings, on_date);
        }
        Command::Quote {
            listing,
            pickup,
            return_date,
            child_seats,
            extra_drivers,
            young_driver,
            currency,
        } => {
            let listings = models::load_listings(Path::new(&config.listings_path))?;
            let found = listings
                .iter()
                .find(|l| l.id == listing)
                .ok_or_else(|| anyhow::anyhow!("No listing with id {}", listing))?;

            let request = RentalRequest {
                pickup_date: Some(parse_display_date(&pickup)?),
                return_date: Some(parse_display_date(&return_date)?),
                add_ons: AddOnCounts {
                    child_seat: child_seats,
                    extra_driver: extra_drivers,
                    young_driver_package: young_driver,
                },
            };

            show_quote(&engine, found, &request, currency.as_deref())?;
        }
        Command::Watch => {
            println!(
                "Watching exchange rates every {}s, Ctrl-C to stop",
                config.refresh_interval_secs
            );
            let handle =
                engine.spawn_refresh_task(Duration::from_secs(config.refresh_interval_secs));
            handle.await?;
        }
        // Handled before the engine is built
        Command::InitConfig => unreachable!(),
    }

    Ok(())
}

fn show_rates(engine: &PricingEngine) {
    let table = engine.rate_store().current_table();
    let mut codes: Vec<_> = table.keys().collect();
    codes.sort();

    println!("Rates per EUR:");
    for code in codes {
        println!("  {} {}", code, table[code]);
    }
    match engine.rate_store().last_updated() {
        Some(at) => println!("Last updated: {}", at.format("%Y-%m-%d %H:%M:%S")),
        None => println!("Last updated: never (using stored or default rates)"),
    }
    if engine.rate_store().has_error() {
        println!("⚠️  Last refresh failed");
    }
}

fn export_rates_csv(engine: &PricingEngine) -> Result<()> {
    let output_dir = PathBuf::from("output");
    std::fs::create_dir_all(&output_dir)?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let csv_path = output_dir.join(format!("exchange_rates_{}.csv", timestamp));
    let mut writer = csv::Writer::from_path(&csv_path)?;

    writer.write_record(["Code", "Name", "Rate (per EUR)"])?;

    let table = engine.rate_store().current_table();
    let mut codes: Vec<_> = table.keys().collect();
    codes.sort();
    for code in codes {
        let name = currencies::currency_info(code).map_or("", |c| c.display_name);
        let rate = table[code].to_string();
        writer.write_record([code.as_str(), name, rate.as_str()])?;
    }
    writer.flush()?;

    println!("✅ CSV file created at: {}", csv_path.display());
    Ok(())
}

fn show_prices(engine: &PricingEngine, listings: &[Listing], on_date: chrono::NaiveDate) {
    println!("Effective prices on {}:", on_date.format("%d/%m/%Y"));
    for listing in listings {
        let pricing = engine.resolve_effective_pricing(listing, on_date);
        let season = pricing.source_name.as_deref().unwrap_or("base pricing");
        println!(
            "  {} - {}/day, {}/week ({})",
            listing.name,
            engine.convert_and_format_price(pricing.daily, &pricing.currency, None),
            engine.convert_and_format_price(pricing.weekly, &pricing.currency, None),
            season
        );
    }
}

fn show_quote(
    engine: &PricingEngine,
    listing: &Listing,
    request: &RentalRequest,
    currency: Option<&str>,
) -> Result<()> {
    let quote = engine.compute_rental_total(listing, request)?;
    let season = quote.pricing.source_name.as_deref().unwrap_or("base pricing");

    println!("Quote for {} ({})", listing.name, listing.id);
    println!(
        "  {} days ({} week(s) + {} day(s)), {}",
        quote.days,
        quote.days / 7,
        quote.days % 7,
        season
    );
    println!(
        "  Car rental: {}",
        engine.convert_and_format_price(quote.car_cost_eur, "EUR", currency)
    );
    println!(
        "  Add-ons:    {}",
        engine.convert_and_format_price(quote.add_ons_cost_eur, "EUR", currency)
    );
    println!(
        "  Total:      {}",
        engine.convert_and_format_price(quote.total_eur, "EUR", currency)
    );
    Ok(())
}
