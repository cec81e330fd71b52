// footprint resolution: exact -> pattern -> package size per component type -> fuzzy -> fallback
use tracing::{debug, warn};

use crate::core::engine::MappingEngine;
use crate::core::similarity::best_match;
use crate::core::symbol::context_key;
use crate::core::types::{ComponentKind, Provenance, RecordText, Resolution};

const R_0603: &str = "Resistor_SMD:R_0603_1608Metric";
const C_0603: &str = "Capacitor_SMD:C_0603_1608Metric";
const R_0805: &str = "Resistor_SMD:R_0805_2012Metric";
const C_0805: &str = "Capacitor_SMD:C_0805_2012Metric";
const SOT_23: &str = "Package_TO_SOT_SMD:SOT-23";
const SOIC_8: &str = "Package_SO:SOIC-8_3.9x4.9mm_P1.27mm";
const SOIC_16: &str = "Package_SO:SOIC-16_3.9x9.9mm_P1.27mm";

/// Well-known package names embedded in a raw footprint string.
/// Resistor is assumed for bare chip sizes without a hint.
fn package_heuristic(raw: &str) -> Option<&'static str> {
    let lower = raw.to_lowercase();
    let chip = |r: &'static str, c: &'static str| {
        if lower.contains("res") {
            r
        } else if lower.contains("cap") {
            c
        } else {
            r
        }
    };

    if lower.contains("0603") {
        Some(chip(R_0603, C_0603))
    } else if lower.contains("0805") {
        Some(chip(R_0805, C_0805))
    } else if lower.contains("sot23") || lower.contains("sot-23") {
        Some(SOT_23)
    } else if lower.contains("soic") {
        if lower.contains('8') {
            Some(SOIC_8)
        } else if lower.contains("16") {
            Some(SOIC_16)
        } else {
            Some(SOIC_8)
        }
    } else {
        None
    }
}

impl MappingEngine {
    /// Resolve a raw footprint reference. Never fails; see [`MappingEngine::resolve_symbol`]
    /// for the shape of the chain.
    pub fn resolve_footprint(&self, raw_footprint: &str, text: &RecordText) -> Resolution {
        let raw = raw_footprint.trim();

        if !raw.is_empty() {
            if let Some(hit) = self.rules.cached_footprint(raw) {
                return hit;
            }
            if let Some(r) = self.exact_footprint(raw).or_else(|| self.pattern_footprint(raw)) {
                debug!(raw, canonical = %r.canonical, provenance = %r.provenance, "footprint resolved");
                self.rules.remember_footprint(raw, &r);
                return r;
            }
        }

        //the size table answer depends on what the description says the part is
        let package = self.packages.extract(raw, text.package.as_deref(), &text.description);
        if let Some(package) = package.as_deref() {
            let key = context_key(raw, &[package, &text.description]);
            if let Some(hit) = self.rules.cached_footprint(&key) {
                return hit;
            }
            if let Some(r) = self.package_footprint(package, text) {
                debug!(raw, package, canonical = %r.canonical, "footprint resolved by package size");
                self.rules.remember_footprint(&key, &r);
                return r;
            }
        }

        if !raw.is_empty() {
            if let Some(r) = self.fuzzy_footprint(raw) {
                debug!(raw, canonical = %r.canonical, "footprint resolved by similarity");
                return r;
            }
        }

        let fallback = self.fallback_footprint(text);
        warn!(raw, fallback = %fallback.canonical, "no footprint mapping found, using fallback");
        fallback
    }

    fn exact_footprint(&self, raw: &str) -> Option<Resolution> {
        self.rules
            .footprints()
            .exact(raw)
            .map(|c| Resolution::new(c, Provenance::Exact))
    }

    fn pattern_footprint(&self, raw: &str) -> Option<Resolution> {
        self.rules
            .footprints()
            .first_pattern(raw)
            .map(|rule| Resolution::new(rule.canonical.as_str(), Provenance::Pattern))
    }

    //every type recognised in the description gets a chance; a type whose
    //table lacks this size doesn't stop the scan
    fn package_footprint(&self, package: &str, text: &RecordText) -> Option<Resolution> {
        self.rules
            .component_types()
            .iter()
            .filter(|t| t.matches(&text.description))
            .find_map(|t| t.footprint_for(package))
            .map(|fp| Resolution::new(fp, Provenance::Keyword))
    }

    /// Every canonical footprint the engine knows about: rule targets, then the
    /// catalogue size tables, then the generic footprints.
    pub fn footprint_catalogue(&self) -> Vec<&str> {
        let mut names = self.rules.footprints().canonical_names();
        let extra = self
            .rules
            .component_types()
            .iter()
            .flat_map(|t| t.footprints())
            .chain(ComponentKind::ALL.iter().map(|k| k.generic_footprint()));
        for name in extra {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    fn fuzzy_footprint(&self, raw: &str) -> Option<Resolution> {
        if let Some(fp) = package_heuristic(raw) {
            return Some(Resolution::new(fp, Provenance::Fuzzy));
        }
        let catalogue = self.footprint_catalogue();
        best_match(raw, &catalogue, self.fuzzy_threshold).map(|(c, _)| Resolution::new(c, Provenance::Fuzzy))
    }

    fn fallback_footprint(&self, text: &RecordText) -> Resolution {
        let kind = ComponentKind::guess(&text.haystack());
        Resolution::new(kind.generic_footprint(), Provenance::Fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::RuleStore;

    fn mk_engine(rules: &[(&str, &str)]) -> MappingEngine {
        let mut store = RuleStore::new();
        for (k, v) in rules {
            store.add_footprint_rule(k, v).unwrap();
        }
        MappingEngine::new(store)
    }

    fn mk_text(description: &str, package: Option<&str>) -> RecordText {
        RecordText {
            description: description.to_string(),
            value: String::new(),
            package: package.map(str::to_string),
        }
    }

    #[test]
    fn exact_and_pattern_rules() {
        let e = mk_engine(&[("0603", "Custom:0603"), ("SOT*", "Custom:SOT")]);
        let text = mk_text("10k resistor", None);

        assert_eq!(e.resolve_footprint("0603", &text), Resolution::new("Custom:0603", Provenance::Exact));
        assert_eq!(e.resolve_footprint("Lib:0603", &text).canonical, "Custom:0603");
        assert_eq!(e.resolve_footprint("SOT-23", &text), Resolution::new("Custom:SOT", Provenance::Pattern));
    }

    #[test]
    fn package_size_picks_table_of_described_type() {
        let e = mk_engine(&[]);
        let r = e.resolve_footprint("0603", &mk_text("10k Ohm Resistor", None));
        assert_eq!(r, Resolution::new(R_0603, Provenance::Keyword));

        let c = e.resolve_footprint("0603", &mk_text("100nF capacitor", None));
        assert_eq!(c, Resolution::new(C_0603, Provenance::Keyword));
    }

    #[test]
    fn package_attribute_is_consulted() {
        let e = mk_engine(&[]);
        let r = e.resolve_footprint("CUSTOM_PAD", &mk_text("ceramic capacitor", Some("1206")));
        assert_eq!(r.canonical, "Capacitor_SMD:C_1206_3216Metric");
        assert_eq!(r.provenance, Provenance::Keyword);
    }

    #[test]
    fn type_without_that_size_falls_through_to_next_type() {
        //transistors match first but have no SOIC-8 row, ics do
        let e = mk_engine(&[]);
        let r = e.resolve_footprint("SOIC-8", &mk_text("mosfet driver ic", None));
        assert_eq!(r, Resolution::new(SOIC_8, Provenance::Keyword));
    }

    #[test]
    fn heuristics_before_similarity() {
        let e = mk_engine(&[]);
        let blank = RecordText::default();
        assert_eq!(e.resolve_footprint("CAP_0805_HAND", &blank), Resolution::new(C_0805, Provenance::Fuzzy));
        assert_eq!(e.resolve_footprint("XX0603", &blank).canonical, R_0603);
        assert_eq!(e.resolve_footprint("sot23_npn", &blank).canonical, SOT_23);
        assert_eq!(e.resolve_footprint("SOIC16W", &blank).canonical, SOIC_16);
        assert_eq!(e.resolve_footprint("SOIC_N", &blank).canonical, SOIC_8);
    }

    #[test]
    fn similarity_against_catalogue() {
        let e = mk_engine(&[]);
        let r = e.resolve_footprint("D_SMA", &RecordText::default());
        assert_eq!(r, Resolution::new("Diode_SMD:D_SMA", Provenance::Fuzzy));
    }

    #[test]
    fn fallback_uses_kind_guess() {
        let e = mk_engine(&[]);
        let r = e.resolve_footprint("ZZZZZZZZ", &mk_text("signal diode", None));
        assert_eq!(r, Resolution::new("Diode_SMD:D_SOD-123", Provenance::Fallback));

        let r = e.resolve_footprint("", &mk_text("", None));
        assert_eq!(r, Resolution::new(SOIC_8, Provenance::Fallback));
    }

    #[test]
    fn keyword_cache_is_keyed_by_description() {
        let e = mk_engine(&[]);
        let r = e.resolve_footprint("0805", &mk_text("resistor", None));
        let c = e.resolve_footprint("0805", &mk_text("capacitor", None));
        assert_eq!(r.canonical, R_0805);
        assert_eq!(c.canonical, C_0805);
        //raw key itself was never cached by the keyword step
        assert!(e.rules().cached_footprint("0805").is_none());
    }
}
