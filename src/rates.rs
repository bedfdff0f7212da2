// SPDX-FileCopyrightText: 2026 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Result;
use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use crate::api::RateSourceClient;
use crate::currencies::{default_rate_table, RateTable};

/// Owns the current EUR-pivot rate table. The table is replaced wholesale
/// on every applied refresh and is always readable, whatever the state of
/// the rate source.
pub struct ExchangeRateStore {
    client: RateSourceClient,
    table: RwLock<RateTable>,
    last_updated: RwLock<Option<DateTime<Local>>>,
    is_loading: AtomicBool,
    has_error: AtomicBool,
    // Sequence guard: refreshes are tagged on issue and a response is only
    // applied when it is newer than the last applied one, so a slow stale
    // response can never overwrite fresher data.
    issued_seq: AtomicU64,
    applied_seq: AtomicU64,
}

/// A candidate table must quote EUR at exactly 1, it is the pivot.
pub fn table_is_valid(table: &RateTable) -> bool {
    table.get("EUR").map_or(false, |&rate| (rate - 1.0).abs() < 1e-9)
}

impl ExchangeRateStore {
    pub fn new(client: RateSourceClient) -> Self {
        Self::with_table(client, default_rate_table())
    }

    /// Build a store seeded with a previously persisted table. An invalid
    /// seed falls back to the hard-coded defaults.
    pub fn with_table(client: RateSourceClient, table: RateTable) -> Self {
        let table = if table_is_valid(&table) {
            table
        } else {
            eprintln!("⚠️  Warning: seed rate table has no EUR=1 pivot, using defaults");
            default_rate_table()
        };
        Self {
            client,
            table: RwLock::new(table),
            last_updated: RwLock::new(None),
            is_loading: AtomicBool::new(false),
            has_error: AtomicBool::new(false),
            issued_seq: AtomicU64::new(0),
            applied_seq: AtomicU64::new(0),
        }
    }

    /// Fetch a fresh table from the rate source. Failures are non-fatal:
    /// the current table stays in place and `has_error` is raised. Returns
    /// whether a new table was applied.
    pub async fn refresh(&self) -> bool {
        let seq = self.issued_seq.fetch_add(1, Ordering::SeqCst) + 1;

        self.is_loading.store(true, Ordering::SeqCst);
        let outcome = self.client.fetch_rates().await;
        self.is_loading.store(false, Ordering::SeqCst);

        self.apply_fetched(seq, outcome)
    }

    /// Apply the outcome of a tagged fetch. Split from `refresh` so the
    /// sequence and validation rules are testable without a live source.
    fn apply_fetched(&self, seq: u64, outcome: Result<RateTable>) -> bool {
        match outcome {
            Ok(table) if !table_is_valid(&table) => {
                eprintln!("⚠️  Warning: rate source returned a table without EUR=1, keeping current rates");
                self.has_error.store(true, Ordering::SeqCst);
                false
            }
            Ok(table) => {
                // Check-and-swap under the write lock so two responses
                // cannot interleave between the check and the store.
                let mut current = self.table.write().unwrap();
                if seq <= self.applied_seq.load(Ordering::SeqCst) {
                    // A newer response already landed
                    return false;
                }
                *current = table;
                self.applied_seq.store(seq, Ordering::SeqCst);
                drop(current);

                *self.last_updated.write().unwrap() = Some(Local::now());
                self.has_error.store(false, Ordering::SeqCst);
                true
            }
            Err(e) => {
                eprintln!("⚠️  Warning: rate refresh failed, keeping current rates: {}", e);
                self.has_error.store(true, Ordering::SeqCst);
                false
            }
        }
    }

    pub fn current_table(&self) -> RateTable {
        self.table.read().unwrap().clone()
    }

    pub fn last_updated(&self) -> Option<DateTime<Local>> {
        *self.last_updated.read().unwrap()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    pub fn has_error(&self) -> bool {
        self.has_error.load(Ordering::SeqCst)
    }
}
