// table-level orchestration: ordered mapping, stats, cooperative cancellation
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::engine::MappingEngine;
use crate::core::types::{ComponentMapping, ComponentRecord, ConfidenceBand, TableConfig};
use crate::error::ResolutionFailure;

/// Shared cancellation flag, polled between records.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableStats {
    pub total: usize,
    pub resolved: usize,
    pub fell_back: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub elapsed: Duration,
}

impl TableStats {
    fn record(&mut self, mapping: &ComponentMapping, fell_back: bool) {
        self.total += 1;
        if fell_back {
            self.fell_back += 1;
        } else {
            self.resolved += 1;
        }
        match mapping.confidence_band() {
            ConfidenceBand::High => self.high += 1,
            ConfidenceBand::Medium => self.medium += 1,
            ConfidenceBand::Low => self.low += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableMapping {
    pub table: String,
    /// One entry per processed record, in input order.
    pub mappings: Vec<ComponentMapping>,
    /// (record index, reason) for every record that got the fallback mapping.
    pub failures: Vec<(usize, ResolutionFailure)>,
    pub stats: TableStats,
    pub cancelled: bool,
}

/// A table as handed over by the source reader.
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub name: String,
    pub config: TableConfig,
    pub records: Vec<ComponentRecord>,
}

impl SourceTable {
    pub fn new(name: &str, config: TableConfig, records: Vec<ComponentRecord>) -> Self {
        Self { name: name.to_string(), config, records }
    }
}

impl MappingEngine {
    pub fn map_table(
        &self,
        table: &str,
        records: &[ComponentRecord],
        config: &TableConfig,
        cancel: &CancelToken,
    ) -> TableMapping {
        self.map_table_with_progress(table, records, config, cancel, |_, _| {})
    }

    /// Like [`MappingEngine::map_table`], calling `progress(done, total)` after each record.
    /// Cancellation is checked before each record, so the result holds exactly
    /// the records finished before the flag was seen.
    pub fn map_table_with_progress<P>(
        &self,
        table: &str,
        records: &[ComponentRecord],
        config: &TableConfig,
        cancel: &CancelToken,
        mut progress: P,
    ) -> TableMapping
    where
        P: FnMut(usize, usize),
    {
        let started = Instant::now();
        let total = records.len();
        info!(table, records = total, "mapping table");

        let mut out = TableMapping {
            table: table.to_string(),
            mappings: Vec::with_capacity(total),
            failures: Vec::new(),
            stats: TableStats::default(),
            cancelled: false,
        };

        for (idx, record) in records.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(table, done = idx, total, "table mapping cancelled");
                out.cancelled = true;
                break;
            }

            let outcome = self.map_record(record, config);
            let fell_back = outcome.is_fallback();
            if let Some(reason) = outcome.failure() {
                out.failures.push((idx, reason.clone()));
            }
            let mapping = outcome.into_mapping();

            if mapping.confidence >= 0.8 {
                debug!(table, confidence = mapping.confidence, raw = %mapping.raw_symbol, canonical = %mapping.canonical_symbol, "high confidence mapping");
            } else if mapping.confidence <= 0.3 {
                warn!(table, confidence = mapping.confidence, raw = %mapping.raw_symbol, canonical = %mapping.canonical_symbol, "low confidence mapping");
            }

            out.stats.record(&mapping, fell_back);
            out.mappings.push(mapping);
            progress(idx + 1, total);
        }

        out.stats.elapsed = started.elapsed();
        info!(
            table,
            mapped = out.stats.total,
            high = out.stats.high,
            medium = out.stats.medium,
            low = out.stats.low,
            fell_back = out.stats.fell_back,
            "table mapped"
        );
        out
    }

    /// Map every enabled table in order. Stops (without starting further tables)
    /// once `cancel` is set; the interrupted table is returned partially.
    pub fn map_tables(&self, tables: &[SourceTable], cancel: &CancelToken) -> Vec<TableMapping> {
        let mut out = Vec::new();
        for t in tables {
            if !t.config.enabled {
                info!(table = %t.name, "table disabled, skipping");
                continue;
            }
            if cancel.is_cancelled() {
                break;
            }
            out.push(self.map_table(&t.name, &t.records, &t.config, cancel));
        }
        out
    }

    /// Same result as [`MappingEngine::map_tables`] (including order), one scoped
    /// thread per enabled table.
    pub fn map_tables_parallel(&self, tables: &[SourceTable], cancel: &CancelToken) -> Vec<TableMapping> {
        thread::scope(|scope| {
            let handles: Vec<_> = tables
                .iter()
                .filter(|t| {
                    if !t.config.enabled {
                        info!(table = %t.name, "table disabled, skipping");
                    }
                    t.config.enabled
                })
                .map(|t| {
                    let handle = scope.spawn(move || self.map_table(&t.name, &t.records, &t.config, cancel));
                    (t, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(t, handle)| {
                    //map_record catches its own panics, so a worker only dies on a bug here
                    handle.join().unwrap_or_else(|_| {
                        warn!(table = %t.name, "table worker panicked");
                        TableMapping {
                            table: t.name.clone(),
                            mappings: Vec::new(),
                            failures: Vec::new(),
                            stats: TableStats::default(),
                            cancelled: true,
                        }
                    })
                })
                .collect()
        })
    }
}
