// component rows, committed in batches
use rusqlite::params;
use serde::Serialize;
use tracing::{info, warn};

use crate::core::table::TableMapping;
use crate::core::types::ComponentMapping;
use crate::error::StoreError;
use crate::store::{CategoryIds, Materializer};

const INSERT_COMPONENT: &str = "
INSERT INTO components (
    symbol, footprint, reference, value, description, keywords,
    manufacturer, mpn, datasheet, supplier, spn, package,
    voltage, current, power, tolerance, temperature,
    category_id, confidence, original_raw_symbol, original_raw_footprint,
    category, subcategory
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaterializeStats {
    pub inserted: usize,
    pub failed: usize,
    /// (table, index within the table) of every row that did not persist
    pub failed_rows: Vec<(String, usize)>,
}

impl MaterializeStats {
    pub fn failure_rate(&self) -> f64 {
        let total = self.inserted + self.failed;
        if total == 0 { 0.0 } else { self.failed as f64 / total as f64 }
    }
}

/// Search keywords for one row: classifier keywords, then description words
/// longer than two characters, then manufacturer and package. Lower-cased, first
/// occurrence kept.
pub fn row_keywords(mapping: &ComponentMapping) -> String {
    let description = mapping.field("Description").unwrap_or("");
    let words = description
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(str::trim)
        .filter(|w| w.chars().count() > 2);

    let mut out: Vec<String> = Vec::new();
    let candidates = mapping
        .keywords
        .iter()
        .map(String::as_str)
        .chain(words)
        .chain(mapping.field("Manufacturer"))
        .chain(mapping.field("Package"));
    for k in candidates {
        let k = k.to_lowercase();
        if !k.is_empty() && !out.contains(&k) {
            out.push(k);
        }
    }
    out.join(" ")
}

impl Materializer {
    fn insert_component(&self, mapping: &ComponentMapping, category_id: i64) -> rusqlite::Result<()> {
        let f = |name: &str| mapping.field(name).unwrap_or("");
        let mut stmt = self.conn.prepare_cached(INSERT_COMPONENT)?;
        stmt.execute(params![
            mapping.canonical_symbol,
            mapping.canonical_footprint,
            mapping.field("Reference").unwrap_or("U"),
            f("Value"),
            f("Description"),
            row_keywords(mapping),
            f("Manufacturer"),
            f("MPN"),
            f("Datasheet"),
            f("Supplier"),
            f("SPN"),
            f("Package"),
            f("Voltage"),
            f("Current"),
            f("Power"),
            f("Tolerance"),
            f("Temperature"),
            category_id,
            mapping.confidence,
            mapping.raw_symbol,
            mapping.raw_footprint,
            mapping.category,
            mapping.subcategory,
        ])?;
        Ok(())
    }

    /// Write one row per mapping. A row that fails is counted and logged; the
    /// batch carries on. Commits every `batch_size` rows and once at the end.
    pub fn materialize(&self, tables: &[TableMapping], ids: &CategoryIds) -> Result<MaterializeStats, StoreError> {
        let batch_size = self.config.batch_size.max(1);
        let total: usize = tables.iter().map(|t| t.mappings.len()).sum();
        info!(total, batch_size, "populating components table");

        let mut stats = MaterializeStats::default();
        let mut tx = self.conn.unchecked_transaction()?;
        let mut pending = 0usize;

        for t in tables {
            let mut added = 0usize;
            for (idx, mapping) in t.mappings.iter().enumerate() {
                match self.insert_component(mapping, ids.id_for(mapping)) {
                    Ok(()) => {
                        stats.inserted += 1;
                        added += 1;
                    }
                    Err(source) => {
                        let e = StoreError::Materialization {
                            table: t.table.clone(),
                            raw_symbol: mapping.raw_symbol.clone(),
                            source,
                        };
                        warn!(error = %e, "component not inserted");
                        stats.failed += 1;
                        stats.failed_rows.push((t.table.clone(), idx));
                    }
                }

                pending += 1;
                if pending == batch_size {
                    tx.commit()?;
                    tx = self.conn.unchecked_transaction()?;
                    pending = 0;
                }
            }
            info!(table = %t.table, added, "components added");
        }
        tx.commit()?;

        info!(inserted = stats.inserted, "populated components");
        if stats.failed > 0 {
            warn!(failed = stats.failed, rate = stats.failure_rate(), "some components were not inserted");
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::core::table::TableStats;
    use crate::core::types::Provenance;
    use std::collections::BTreeMap;

    fn mk_mapping(raw: &str, category: &str, fields: &[(&str, &str)]) -> ComponentMapping {
        ComponentMapping {
            raw_symbol: raw.to_string(),
            raw_footprint: "0603".to_string(),
            canonical_symbol: "Device:R".to_string(),
            canonical_footprint: "Resistor_SMD:R_0603_1608Metric".to_string(),
            symbol_provenance: Provenance::Keyword,
            footprint_provenance: Provenance::Keyword,
            confidence: 0.8,
            fields: fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<BTreeMap<_, _>>(),
            category: category.to_string(),
            subcategory: "General".to_string(),
            keywords: vec!["resistor".to_string()],
        }
    }

    fn mk_table(name: &str, mappings: Vec<ComponentMapping>) -> TableMapping {
        TableMapping { table: name.to_string(), mappings, failures: Vec::new(), stats: TableStats::default(), cancelled: false }
    }

    fn mk_store(batch_size: usize) -> Materializer {
        let store = Materializer::open_in_memory(StoreConfig { batch_size, ..StoreConfig::default() }).unwrap();
        store.create_schema().unwrap();
        store
    }

    fn rows(store: &Materializer) -> i64 {
        store.connection().query_row("SELECT COUNT(*) FROM components", [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn keywords_are_deduplicated_in_order() {
        let m = mk_mapping("R1", "Passive", &[
            ("Description", "Resistor, 10k, thick film resistor"),
            ("Manufacturer", "Yageo"),
            ("Package", "0603"),
        ]);
        assert_eq!(row_keywords(&m), "resistor 10k thick film yageo 0603");
    }

    #[test]
    fn rows_land_with_category_ids() {
        let store = mk_store(2);
        let tables = vec![mk_table("res", vec![
            mk_mapping("R1", "Passive", &[("Description", "10k resistor"), ("MPN", "RC0603")]),
            mk_mapping("R2", "Passive", &[]),
            mk_mapping("R3", "", &[]),
        ])];
        let ids = store.populate_categories(&tables).unwrap();
        let stats = store.materialize(&tables, &ids).unwrap();

        assert_eq!(stats.inserted, 3);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.failure_rate(), 0.0);
        assert_eq!(rows(&store), 3);

        let (mpn, reference, cat): (String, String, i64) = store
            .connection()
            .query_row("SELECT mpn, reference, category_id FROM components WHERE original_raw_symbol = 'R1'", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .unwrap();
        assert_eq!(mpn, "RC0603");
        assert_eq!(reference, "U");
        assert_eq!(Some(cat), ids.get("Passive"));

        let uncategorized: i64 = store
            .connection()
            .query_row("SELECT category_id FROM components WHERE original_raw_symbol = 'R3'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(uncategorized, ids.uncategorized());
    }

    #[test]
    fn failing_row_is_counted_not_fatal() {
        let store = mk_store(1);
        store
            .connection()
            .execute_batch(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON components
                 WHEN NEW.mpn = 'BAD' BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let tables = vec![mk_table("t", vec![
            mk_mapping("A", "X", &[("MPN", "OK1")]),
            mk_mapping("B", "X", &[("MPN", "BAD")]),
            mk_mapping("C", "X", &[("MPN", "OK2")]),
        ])];
        let ids = store.populate_categories(&tables).unwrap();
        let stats = store.materialize(&tables, &ids).unwrap();

        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.failed_rows, vec![("t".to_string(), 1)]);
        assert!((stats.failure_rate() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(rows(&store), 2);
    }
}
