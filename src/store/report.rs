// migration report: confidence histogram, unresolved references, recommendations
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::table::TableMapping;
use crate::core::types::{ConfidenceBand, Provenance};
use crate::error::ReportError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub total_tables: usize,
    pub total_components: usize,
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDetail {
    pub component_count: usize,
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
    pub missing_symbols: Vec<String>,
    pub missing_footprints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: usize,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub migration_summary: MigrationSummary,
    pub table_details: BTreeMap<String, TableDetail>,
    pub issues: Vec<Issue>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

//empty raw names carry nothing to map, so they are not listed
fn push_unique(list: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

pub fn generate_report(tables: &[TableMapping]) -> MigrationReport {
    info!("generating migration report");
    let mut summary = MigrationSummary { total_tables: tables.len(), ..MigrationSummary::default() };
    let mut details: BTreeMap<String, TableDetail> = BTreeMap::new();
    let mut fell_back = 0usize;

    for t in tables {
        //a repeated table name folds into the earlier detail
        if details.contains_key(&t.table) {
            warn!(table = %t.table, "table name appears more than once, merging its details");
        }
        let d = details.entry(t.table.clone()).or_default();
        d.component_count += t.mappings.len();

        for m in &t.mappings {
            match m.confidence_band() {
                ConfidenceBand::High => d.high_confidence += 1,
                ConfidenceBand::Medium => d.medium_confidence += 1,
                ConfidenceBand::Low => d.low_confidence += 1,
            }
            if m.symbol_provenance == Provenance::Fallback {
                push_unique(&mut d.missing_symbols, &m.raw_symbol);
            }
            if m.footprint_provenance == Provenance::Fallback {
                push_unique(&mut d.missing_footprints, &m.raw_footprint);
            }
        }

        fell_back += t.failures.len();

        info!(
            table = %t.table,
            components = d.component_count,
            high = d.high_confidence,
            medium = d.medium_confidence,
            low = d.low_confidence,
            "table statistics"
        );
        if !d.missing_symbols.is_empty() {
            warn!(table = %t.table, count = d.missing_symbols.len(), "missing symbols");
        }
        if !d.missing_footprints.is_empty() {
            warn!(table = %t.table, count = d.missing_footprints.len(), "missing footprints");
        }
    }

    for d in details.values() {
        summary.total_components += d.component_count;
        summary.high_confidence += d.high_confidence;
        summary.medium_confidence += d.medium_confidence;
        summary.low_confidence += d.low_confidence;
    }

    let missing_symbols: usize = details.values().map(|d: &TableDetail| d.missing_symbols.len()).sum();
    let missing_footprints: usize = details.values().map(|d: &TableDetail| d.missing_footprints.len()).sum();

    let mut issues = Vec::new();
    let mut recommendations = Vec::new();
    let mut flag = |kind: &str, count: usize, description: &str, advice: String| {
        if count > 0 {
            issues.push(Issue { kind: kind.to_string(), count, description: description.to_string() });
            recommendations.push(advice);
        }
    };

    let low = summary.low_confidence;
    flag("low_confidence", low, "Components with low confidence mapping", format!("Review {low} low-confidence mappings manually"));
    flag(
        "missing_symbols",
        missing_symbols,
        "Vendor symbols without a specific canonical mapping",
        format!("Create custom symbol mappings for {missing_symbols} missing symbols"),
    );
    flag(
        "missing_footprints",
        missing_footprints,
        "Vendor footprints without a specific canonical mapping",
        format!("Create custom footprint mappings for {missing_footprints} missing footprints"),
    );
    flag(
        "resolution_failures",
        fell_back,
        "Components that fell back after an internal resolution failure",
        format!("Inspect {fell_back} components that could not be resolved normally"),
    );

    MigrationReport {
        migration_summary: summary,
        table_details: details,
        issues,
        recommendations,
        generated_at: Utc::now(),
    }
}

impl MigrationReport {
    pub fn write(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ReportError::Io { path: path.to_path_buf(), source })?;
        info!(path = %path.display(), "wrote migration report");
        Ok(())
    }

    pub fn summary_text(&self) -> String {
        let s = &self.migration_summary;
        let pct = |n: usize| n as f64 / s.total_components.max(1) as f64 * 100.0;
        format!(
            "Migration Summary:\n\
             - Total Components: {}\n\
             - High Confidence: {} ({:.1}%)\n\
             - Medium Confidence: {} ({:.1}%)\n\
             - Low Confidence: {} ({:.1}%)\n",
            s.total_components,
            s.high_confidence,
            pct(s.high_confidence),
            s.medium_confidence,
            pct(s.medium_confidence),
            s.low_confidence,
            pct(s.low_confidence),
        )
    }
}
