// symbol resolution: exact -> pattern -> component type -> fuzzy -> fallback
use tracing::{debug, warn};

use crate::core::engine::MappingEngine;
use crate::core::similarity::best_match;
use crate::core::types::{ComponentKind, Provenance, RecordText, Resolution};

/// Cache key for resolutions that depend on the record text as well as the raw name.
pub(crate) fn context_key(raw: &str, parts: &[&str]) -> String {
    let mut key = raw.to_string();
    for part in parts {
        key.push('\u{1f}');
        key.push_str(&part.to_lowercase());
    }
    key
}

impl MappingEngine {
    /// Resolve a raw symbol reference. Never fails: the last step always produces
    /// one of the generic `Device:*` symbols.
    pub fn resolve_symbol(&self, raw_symbol: &str, text: &RecordText) -> Resolution {
        let raw = raw_symbol.trim();

        if !raw.is_empty() {
            if let Some(hit) = self.rules.cached_symbol(raw) {
                return hit;
            }
            if let Some(r) = self.exact_symbol(raw).or_else(|| self.pattern_symbol(raw)) {
                debug!(raw, canonical = %r.canonical, provenance = %r.provenance, "symbol resolved");
                self.rules.remember_symbol(raw, &r);
                return r;
            }
        }

        let key = context_key(raw, &[&text.description, &text.value]);
        if let Some(hit) = self.rules.cached_symbol(&key) {
            return hit;
        }
        if let Some(r) = self.keyword_symbol(text) {
            debug!(raw, canonical = %r.canonical, "symbol resolved by component type");
            self.rules.remember_symbol(&key, &r);
            return r;
        }

        if !raw.is_empty() {
            if let Some(r) = self.fuzzy_symbol(raw) {
                debug!(raw, canonical = %r.canonical, "symbol resolved by similarity");
                return r;
            }
        }

        let fallback = self.fallback_symbol(text);
        warn!(raw, fallback = %fallback.canonical, "no symbol mapping found, using fallback");
        fallback
    }

    //1. direct table, raw then without library qualifier
    fn exact_symbol(&self, raw: &str) -> Option<Resolution> {
        self.rules
            .symbols()
            .exact(raw)
            .map(|c| Resolution::new(c, Provenance::Exact))
    }

    //2. first glob that matches
    fn pattern_symbol(&self, raw: &str) -> Option<Resolution> {
        self.rules
            .symbols()
            .first_pattern(raw)
            .map(|rule| Resolution::new(rule.canonical.as_str(), Provenance::Pattern))
    }

    //3. component-type catalogue against description or value
    fn keyword_symbol(&self, text: &RecordText) -> Option<Resolution> {
        self.rules
            .component_types()
            .iter()
            .find(|t| t.matches(&text.description) || t.matches(&text.value))
            .map(|t| Resolution::new(t.symbol.as_str(), Provenance::Keyword))
    }

    /// Every canonical symbol the engine knows about, in a stable order:
    /// rule targets, then catalogue symbols, then the generic symbols.
    pub fn symbol_catalogue(&self) -> Vec<&str> {
        let mut names = self.rules.symbols().canonical_names();
        let extra = self
            .rules
            .component_types()
            .iter()
            .map(|t| t.symbol.as_str())
            .chain(ComponentKind::ALL.iter().map(|k| k.generic_symbol()));
        for name in extra {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    //4. similarity against the catalogue
    fn fuzzy_symbol(&self, raw: &str) -> Option<Resolution> {
        let catalogue = self.symbol_catalogue();
        best_match(raw, &catalogue, self.fuzzy_threshold).map(|(c, _)| Resolution::new(c, Provenance::Fuzzy))
    }

    //5. keyword guess over description + value
    fn fallback_symbol(&self, text: &RecordText) -> Resolution {
        let kind = ComponentKind::guess(&text.haystack());
        Resolution::new(kind.generic_symbol(), Provenance::Fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::{ComponentType, RuleStore};

    fn mk_engine(rules: &[(&str, &str)]) -> MappingEngine {
        let mut store = RuleStore::new();
        for (k, v) in rules {
            store.add_symbol_rule(k, v).unwrap();
        }
        MappingEngine::new(store)
    }

    #[test]
    fn exact_beats_everything() {
        let e = mk_engine(&[("RES", "Custom:R"), ("RES*", "Custom:Other")]);
        let r = e.resolve_symbol("RES", &RecordText::from_description("10k Ohm Resistor"));
        assert_eq!(r, Resolution::new("Custom:R", Provenance::Exact));
    }

    #[test]
    fn exact_after_library_prefix_strip() {
        let e = mk_engine(&[("RES", "Custom:R")]);
        let r = e.resolve_symbol("Passives:RES", &RecordText::default());
        assert_eq!(r.provenance, Provenance::Exact);
        assert_eq!(r.canonical, "Custom:R");
    }

    #[test]
    fn literal_bracket_name_is_an_exact_rule() {
        let e = mk_engine(&[("CONN[2]", "Custom:Conn2")]);

        let r = e.resolve_symbol("CONN[2]", &RecordText::default());
        assert_eq!(r, Resolution::new("Custom:Conn2", Provenance::Exact));

        //no glob class: a different vendor name is not swept up
        let other = e.resolve_symbol("CONN2", &RecordText::default());
        assert_ne!(other.provenance, Provenance::Pattern);
        assert_ne!(other.provenance, Provenance::Exact);
    }

    #[test]
    fn first_matching_pattern_wins() {
        let e = mk_engine(&[("RES_*", "Custom:R_Small"), ("RES*", "Custom:R")]);
        let r = e.resolve_symbol("RES_0603", &RecordText::default());
        assert_eq!(r, Resolution::new("Custom:R_Small", Provenance::Pattern));
    }

    #[test]
    fn component_type_from_description_and_value() {
        let e = mk_engine(&[]);
        let r = e.resolve_symbol("Unknown", &RecordText::from_description("A 10k resistor"));
        assert_eq!(r, Resolution::new("Device:R", Provenance::Keyword));

        let text = RecordText { value: "100nF capacitor".to_string(), ..RecordText::default() };
        let r = e.resolve_symbol("Unknown", &text);
        assert_eq!(r, Resolution::new("Device:C", Provenance::Keyword));
    }

    #[test]
    fn fuzzy_match_above_threshold() {
        let e = mk_engine(&[("LED_RED", "Device:LED")]);
        //empty text so the component-type step can't fire first
        let r = e.resolve_symbol("Led", &RecordText::default());
        assert_eq!(r, Resolution::new("Device:LED", Provenance::Fuzzy));
    }

    #[test]
    fn fallback_is_generic_and_keyword_driven() {
        let mut store = RuleStore::new();
        store.set_component_types(Vec::<ComponentType>::new());
        let e = MappingEngine::new(store);

        let r = e.resolve_symbol("ZZZZZZZZ", &RecordText::from_description("Schottky diode"));
        assert_eq!(r, Resolution::new("Device:D", Provenance::Fallback));

        let r = e.resolve_symbol("ZZZZZZZZ", &RecordText::from_description("op amp"));
        assert_eq!(r, Resolution::new("Device:U", Provenance::Fallback));
    }

    #[test]
    fn empty_raw_symbol_still_resolves() {
        let e = mk_engine(&[]);
        let r = e.resolve_symbol("   ", &RecordText::from_description("ceramic capacitor"));
        assert_eq!(r.canonical, "Device:C");
        assert!(!r.canonical.is_empty());
    }

    #[test]
    fn resolution_is_memoized_and_deterministic() {
        let e = mk_engine(&[("RES*", "Custom:R")]);
        let text = RecordText::from_description("thick film resistor");

        let first = e.resolve_symbol("RES10K", &text);
        assert_eq!(e.rules().cached_symbol("RES10K"), Some(first.clone()));
        let second = e.resolve_symbol("RES10K", &text);
        assert_eq!(first, second);

        let a = e.resolve_symbol("X1", &text);
        let b = e.resolve_symbol("X1", &text);
        assert_eq!(a, b);
        assert_eq!(a.provenance, Provenance::Keyword);
    }

    #[test]
    fn keyword_cache_is_keyed_by_text_too() {
        //same raw name, different descriptions -> different answers
        let e = mk_engine(&[]);
        let r = e.resolve_symbol("GENERIC", &RecordText::from_description("resistor"));
        let c = e.resolve_symbol("GENERIC", &RecordText::from_description("capacitor"));
        assert_eq!(r.canonical, "Device:R");
        assert_eq!(c.canonical, "Device:C");
    }
}
