// one record in, one mapping out; never fails
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{error, warn};

use crate::core::engine::MappingEngine;
use crate::core::fields::minimal_fields;
use crate::core::types::{
    ComponentKind, ComponentMapping, ComponentRecord, MappingOutcome, Provenance, RecordText, TableConfig,
};
use crate::error::ResolutionFailure;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

//what every produced mapping must satisfy before it leaves the engine
fn validate(mapping: &ComponentMapping) -> Result<(), ResolutionFailure> {
    if mapping.canonical_symbol.trim().is_empty() {
        return Err(ResolutionFailure::EmptyCanonical { what: "symbol" });
    }
    if mapping.canonical_footprint.trim().is_empty() {
        return Err(ResolutionFailure::EmptyCanonical { what: "footprint" });
    }
    if !mapping.confidence.is_finite() || !(0.0..=1.0).contains(&mapping.confidence) {
        return Err(ResolutionFailure::InvalidConfidence(mapping.confidence));
    }
    Ok(())
}

impl MappingEngine {
    /// Map one record. Total: any failure inside the resolvers (including a panic)
    /// becomes `MappingOutcome::FellBack` carrying the generic mapping.
    pub fn map_record(&self, record: &ComponentRecord, table: &TableConfig) -> MappingOutcome {
        self.map_record_with(record, table, |engine, record, table| engine.try_map_record(record, table))
    }

    /// [`MappingEngine::map_record`] with the resolution step supplied by the caller.
    /// The outcome is validated and fallback-wrapped exactly like the built-in path.
    pub fn map_record_with<F>(&self, record: &ComponentRecord, table: &TableConfig, resolve: F) -> MappingOutcome
    where
        F: FnOnce(&Self, &ComponentRecord, &TableConfig) -> Result<ComponentMapping, ResolutionFailure>,
    {
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| resolve(self, record, table)));

        let reason = match attempt {
            Ok(Ok(mapping)) => match validate(&mapping) {
                Ok(()) => return MappingOutcome::Resolved(mapping),
                Err(reason) => reason,
            },
            Ok(Err(reason)) => reason,
            Err(payload) => ResolutionFailure::Panicked { stage: "map_record", message: panic_message(payload.as_ref()) },
        };

        error!(
            raw_symbol = %record.get_string(&table.symbol_field, ""),
            %reason,
            "record mapping failed, using fallback"
        );
        MappingOutcome::FellBack { mapping: self.fallback_mapping(record, table), reason }
    }

    /// The normal resolution path: both resolvers, fields, category, confidence.
    pub fn try_map_record(&self, record: &ComponentRecord, table: &TableConfig) -> Result<ComponentMapping, ResolutionFailure> {
        let raw_symbol = record.get_string(&table.symbol_field, "");
        let raw_footprint = record.get_string(&table.footprint_field, "");
        let text = RecordText::of(record, table);

        let symbol = self.resolve_symbol(&raw_symbol, &text);
        let footprint = self.resolve_footprint(&raw_footprint, &text);
        let fields = self.map_fields(record, table);
        let class = self.classify(record, table);
        let confidence = self.score(&symbol, &footprint, &text);

        let mapping = ComponentMapping {
            raw_symbol,
            raw_footprint,
            canonical_symbol: symbol.canonical,
            canonical_footprint: footprint.canonical,
            symbol_provenance: symbol.provenance,
            footprint_provenance: footprint.provenance,
            confidence,
            fields,
            category: class.category,
            subcategory: class.subcategory,
            keywords: class.keywords,
        };
        validate(&mapping)?;
        Ok(mapping)
    }

    /// Generic `Device:U` on the generic footprint, confidence 0. Field mapping is
    /// retried; if that also blows up the minimal field set is used.
    pub fn fallback_mapping(&self, record: &ComponentRecord, table: &TableConfig) -> ComponentMapping {
        let fields = panic::catch_unwind(AssertUnwindSafe(|| self.map_fields(record, table))).unwrap_or_else(|_| {
            warn!("field mapping failed on fallback path");
            minimal_fields(&table.description_of(record))
        });

        ComponentMapping {
            raw_symbol: record.get_string(&table.symbol_field, ""),
            raw_footprint: record.get_string(&table.footprint_field, ""),
            canonical_symbol: ComponentKind::Generic.generic_symbol().to_string(),
            canonical_footprint: ComponentKind::Generic.generic_footprint().to_string(),
            symbol_provenance: Provenance::Fallback,
            footprint_provenance: Provenance::Fallback,
            confidence: 0.0,
            fields,
            category: "Uncategorized".to_string(),
            subcategory: "General".to_string(),
            keywords: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::RuleStore;

    fn mk_record(symbol: &str, footprint: &str, description: &str) -> ComponentRecord {
        ComponentRecord::new()
            .with("Symbol", symbol)
            .with("Footprint", footprint)
            .with("Description", description)
    }

    ///empty rule tables, a resistor described in plain words.
    ///expected: generic resistor symbol, an 0603 footprint, medium-ish confidence.
    #[test]
    fn resistor_with_empty_rules() {
        let e = MappingEngine::new(RuleStore::new());
        let out = e.map_record(&mk_record("RES", "0603", "10k Ohm Resistor"), &TableConfig::default());

        assert!(!out.is_fallback());
        let m = out.mapping();
        assert_eq!(m.canonical_symbol, "Device:R");
        assert!(m.canonical_footprint.contains("0603"));
        assert!((0.5..=0.9).contains(&m.confidence), "{}", m.confidence);
        assert_eq!(m.field("Reference"), Some("R"));
    }

    ///exact rules for both sides.
    ///expected: those exact canonicals, confidence >= 0.8.
    #[test]
    fn exact_rules_win() {
        let mut store = RuleStore::new();
        store.add_symbol_rule("RES", "Custom:R").unwrap();
        store.add_footprint_rule("0603", "Custom:0603").unwrap();
        let e = MappingEngine::new(store);

        let m = e.map_record(&mk_record("RES", "0603", "10k Ohm Resistor"), &TableConfig::default()).into_mapping();
        assert_eq!(m.canonical_symbol, "Custom:R");
        assert_eq!(m.canonical_footprint, "Custom:0603");
        assert_eq!(m.symbol_provenance, Provenance::Exact);
        assert!(m.confidence >= 0.8);
    }

    #[test]
    fn table_config_field_names_are_honoured() {
        let e = MappingEngine::default();
        let table = TableConfig {
            symbol_field: "Library Ref".to_string(),
            footprint_field: "Footprint Ref".to_string(),
            description_field: "Comment".to_string(),
            ..TableConfig::default()
        };
        let rec = ComponentRecord::new()
            .with("Library Ref", "CAP")
            .with("Footprint Ref", "0805")
            .with("Comment", "100nF capacitor");

        let m = e.map_record(&rec, &table).into_mapping();
        assert_eq!(m.raw_symbol, "CAP");
        assert_eq!(m.raw_footprint, "0805");
        assert_eq!(m.canonical_symbol, "Device:C");
        assert_eq!(m.canonical_footprint, "Capacitor_SMD:C_0805_2012Metric");
    }

    #[test]
    fn empty_record_still_maps() {
        let e = MappingEngine::default();
        let m = e.map_record(&ComponentRecord::new(), &TableConfig::default()).into_mapping();
        assert_eq!(m.canonical_symbol, "Device:U");
        assert!(!m.canonical_footprint.is_empty());
        assert!((0.0..=1.0).contains(&m.confidence));
    }

    #[test]
    fn panic_in_resolution_falls_back() {
        let e = MappingEngine::default();
        let rec = mk_record("RES", "0603", "10k Ohm Resistor");

        let out = e.map_record_with(&rec, &TableConfig::default(), |_, _, _| panic!("boom"));
        assert!(out.is_fallback());
        assert!(matches!(out.failure(), Some(ResolutionFailure::Panicked { message, .. }) if message == "boom"));

        let m = out.mapping();
        assert_eq!(m.canonical_symbol, "Device:U");
        assert_eq!(m.canonical_footprint, "Package_SO:SOIC-8_3.9x4.9mm_P1.27mm");
        assert_eq!(m.confidence, 0.0);
        assert_eq!(m.raw_symbol, "RES");
        //best-effort fields still come through
        assert_eq!(m.field("Reference"), Some("R"));
    }

    #[test]
    fn invalid_mapping_is_rejected() {
        let e = MappingEngine::default();
        let rec = mk_record("RES", "0603", "resistor");
        let table = TableConfig::default();

        let out = e.map_record_with(&rec, &table, |engine, r, t| {
            let mut m = engine.try_map_record(r, t)?;
            m.confidence = f64::NAN;
            Ok(m)
        });
        assert!(matches!(out.failure(), Some(ResolutionFailure::InvalidConfidence(_))));

        let out = e.map_record_with(&rec, &table, |_, _, _| Err(ResolutionFailure::EmptyCanonical { what: "symbol" }));
        assert!(out.is_fallback());
        assert_eq!(out.mapping().confidence, 0.0);
    }
}
