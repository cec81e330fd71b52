// rule tables consulted during resolution
//
// Everything order-sensitive (glob patterns, component types, category rules,
// field renames) is a Vec and is scanned front to back: first match wins.
use std::collections::BTreeMap;

use dashmap::DashMap;
use glob::Pattern;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::core::types::Resolution;
use crate::error::RuleLoadError;

/// Only a `*` makes a rule key a pattern; `?` and `[` are common in literal
/// vendor names. Inside a pattern key they keep their glob meaning.
pub fn is_glob(key: &str) -> bool {
    key.contains('*')
}

/// `Lib:Name` / `Lib\Name` -> `Name`. Returns the input when there's no qualifier.
pub fn strip_library_prefix(raw: &str) -> &str {
    let after_colon = raw.split_once(':').map_or(raw, |(_, rest)| rest);
    after_colon.rsplit_once('\\').map_or(after_colon, |(_, rest)| rest)
}

#[derive(Debug, Clone)]
pub struct GlobRule {
    pub pattern: Pattern,
    pub canonical: String,
}

impl GlobRule {
    pub fn source(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Exact table + ordered pattern list, the shape shared by symbols and footprints.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    exact: BTreeMap<String, String>,
    patterns: Vec<GlobRule>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    //a key containing glob metacharacters becomes a pattern rule, anything else is exact.
    //re-inserting an existing pattern replaces its target but keeps its position.
    pub fn insert(&mut self, key: &str, canonical: &str) -> Result<(), RuleLoadError> {
        let canonical = canonical.trim();
        if canonical.is_empty() {
            return Err(RuleLoadError::EmptyCanonical { key: key.to_string() });
        }

        if !is_glob(key) {
            self.exact.insert(key.to_string(), canonical.to_string());
            return Ok(());
        }

        let pattern = Pattern::new(key).map_err(|source| RuleLoadError::Pattern {
            pattern: key.to_string(),
            source,
        })?;

        match self.patterns.iter_mut().find(|r| r.source() == key) {
            Some(existing) => existing.canonical = canonical.to_string(),
            None => self.patterns.push(GlobRule { pattern, canonical: canonical.to_string() }),
        }
        Ok(())
    }

    /// Direct lookup on the raw value, then on the value without its library qualifier.
    pub fn exact(&self, raw: &str) -> Option<&str> {
        if let Some(hit) = self.exact.get(raw) {
            return Some(hit.as_str());
        }
        let stripped = strip_library_prefix(raw);
        if stripped != raw {
            return self.exact.get(stripped).map(String::as_str);
        }
        None
    }

    pub fn first_pattern(&self, raw: &str) -> Option<&GlobRule> {
        self.patterns.iter().find(|r| r.pattern.matches(raw))
    }

    /// Every canonical target, exact table first then patterns, without duplicates.
    pub fn canonical_names(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for name in self.exact.values().chain(self.patterns.iter().map(|r| &r.canonical)) {
            if !out.contains(&name.as_str()) {
                out.push(name);
            }
        }
        out
    }

    pub fn exact_len(&self) -> usize {
        self.exact.len()
    }

    pub fn pattern_len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.patterns.is_empty()
    }
}

/// One entry of the component-type catalogue: a canonical symbol, the regexes
/// that recognise the type in description text, and its package -> footprint table.
#[derive(Debug, Clone)]
pub struct ComponentType {
    pub name: String,
    pub symbol: String,
    symbol_patterns: Vec<Regex>,
    footprints: Vec<(String, String)>,
}

impl ComponentType {
    pub fn new<P, F>(name: &str, symbol: &str, patterns: P, footprints: F) -> Result<Self, RuleLoadError>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        F: IntoIterator<Item = (String, String)>,
    {
        if symbol.trim().is_empty() {
            return Err(RuleLoadError::EmptyCanonical { key: name.to_string() });
        }

        let symbol_patterns = patterns
            .into_iter()
            .map(|p| {
                RegexBuilder::new(p.as_ref())
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| RuleLoadError::Regex { pattern: p.as_ref().to_string(), source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.to_string(),
            symbol: symbol.trim().to_string(),
            symbol_patterns,
            footprints: footprints.into_iter().collect(),
        })
    }

    pub fn matches(&self, text: &str) -> bool {
        self.symbol_patterns.iter().any(|re| re.is_match(text))
    }

    pub fn footprint_for(&self, package: &str) -> Option<&str> {
        self.footprints
            .iter()
            .find(|(size, _)| size.eq_ignore_ascii_case(package))
            .map(|(_, fp)| fp.as_str())
    }

    pub fn footprints(&self) -> impl Iterator<Item = &str> + '_ {
        self.footprints.iter().map(|(_, fp)| fp.as_str())
    }
}

fn uncategorized() -> String {
    "Uncategorized".to_string()
}

fn general() -> String {
    "General".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub pattern: String,
    #[serde(default = "uncategorized")]
    pub category: String,
    #[serde(default = "general")]
    pub subcategory: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(pattern: &str, category: &str, subcategory: &str, keywords: &[&str]) -> Self {
        Self {
            pattern: pattern.to_string(),
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

//category globs are matched against lower-cased text, so they are compiled lower-cased
#[derive(Debug, Clone)]
pub struct CompiledCategoryRule {
    pub rule: CategoryRule,
    glob: Pattern,
}

impl CompiledCategoryRule {
    pub fn compile(rule: CategoryRule) -> Result<Self, RuleLoadError> {
        let lowered = rule.pattern.to_lowercase();
        let glob = Pattern::new(&lowered)
            .map_err(|source| RuleLoadError::Pattern { pattern: rule.pattern.clone(), source })?;
        Ok(Self { rule, glob })
    }

    pub fn matches(&self, lowercase_text: &str) -> bool {
        !self.rule.pattern.is_empty() && self.glob.matches(lowercase_text)
    }
}

pub const DEFAULT_FIELD_RENAMES: [(&str, &str); 21] = [
    ("Part Number", "MPN"),
    ("Manufacturer", "Manufacturer"),
    ("Manufacturer Part Number", "MPN"),
    ("Description", "Description"),
    ("Value", "Value"),
    ("Footprint", "Footprint"),
    ("Datasheet", "Datasheet"),
    ("Supplier", "Supplier"),
    ("Supplier Part Number", "SPN"),
    ("Package", "Package"),
    ("Voltage", "Voltage"),
    ("Current", "Current"),
    ("Power", "Power"),
    ("Tolerance", "Tolerance"),
    ("Temperature", "Temperature"),
    ("Library Name", "Library"),
    ("Comment", "Comment"),
    ("ComponentLink1Description", "Link1_Desc"),
    ("ComponentLink1URL", "Link1_URL"),
    ("ComponentLink2Description", "Link2_Desc"),
    ("ComponentLink2URL", "Link2_URL"),
];

fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
    entries.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
}

/// Built-in catalogue, in scan order.
pub fn builtin_component_types() -> Vec<ComponentType> {
    let specs: Vec<(&str, &str, Vec<&str>, Vec<(String, String)>)> = vec![
        (
            "resistors",
            "Device:R",
            vec![r".*resistor.*", r".*res.*"],
            pairs(&[
                ("0201", "Resistor_SMD:R_0201_0603Metric"),
                ("0402", "Resistor_SMD:R_0402_1005Metric"),
                ("0603", "Resistor_SMD:R_0603_1608Metric"),
                ("0805", "Resistor_SMD:R_0805_2012Metric"),
                ("1206", "Resistor_SMD:R_1206_3216Metric"),
                ("1210", "Resistor_SMD:R_1210_3225Metric"),
                ("2010", "Resistor_SMD:R_2010_5025Metric"),
                ("2512", "Resistor_SMD:R_2512_6332Metric"),
            ]),
        ),
        (
            "capacitors",
            "Device:C",
            vec![r".*capacitor.*", r".*cap.*"],
            pairs(&[
                ("0201", "Capacitor_SMD:C_0201_0603Metric"),
                ("0402", "Capacitor_SMD:C_0402_1005Metric"),
                ("0603", "Capacitor_SMD:C_0603_1608Metric"),
                ("0805", "Capacitor_SMD:C_0805_2012Metric"),
                ("1206", "Capacitor_SMD:C_1206_3216Metric"),
                ("1210", "Capacitor_SMD:C_1210_3225Metric"),
                ("1812", "Capacitor_SMD:C_1812_4532Metric"),
                ("2220", "Capacitor_SMD:C_2220_5650Metric"),
            ]),
        ),
        (
            "inductors",
            "Device:L",
            vec![r".*inductor.*", r".*ind.*"],
            pairs(&[
                ("0603", "Inductor_SMD:L_0603_1608Metric"),
                ("0805", "Inductor_SMD:L_0805_2012Metric"),
                ("1206", "Inductor_SMD:L_1206_3216Metric"),
                ("1210", "Inductor_SMD:L_1210_3225Metric"),
                ("1812", "Inductor_SMD:L_1812_4532Metric"),
                ("2220", "Inductor_SMD:L_2220_5650Metric"),
            ]),
        ),
        (
            "diodes",
            "Device:D",
            vec![r".*diode.*"],
            pairs(&[
                ("SOD-123", "Diode_SMD:D_SOD-123"),
                ("SOD-323", "Diode_SMD:D_SOD-323"),
                ("SOD-523", "Diode_SMD:D_SOD-523"),
                ("SMA", "Diode_SMD:D_SMA"),
                ("SMB", "Diode_SMD:D_SMB"),
                ("SMC", "Diode_SMD:D_SMC"),
            ]),
        ),
        (
            "transistors",
            "Device:Q_NPN_BCE",
            vec![r".*transistor.*", r".*mosfet.*", r".*fet.*", r".*bjt.*"],
            pairs(&[
                ("SOT-23", "Package_TO_SOT_SMD:SOT-23"),
                ("SOT-23-3", "Package_TO_SOT_SMD:SOT-23"),
                ("SOT-23-5", "Package_TO_SOT_SMD:SOT-23-5"),
                ("SOT-23-6", "Package_TO_SOT_SMD:SOT-23-6"),
                ("SOT-223", "Package_TO_SOT_SMD:SOT-223"),
                ("TO-252", "Package_TO_SOT_SMD:TO-252-3_TabPin2"),
                ("DPAK", "Package_TO_SOT_SMD:TO-252-3_TabPin2"),
            ]),
        ),
        (
            "ics",
            "Device:U",
            vec![r".*ic.*", r".*integrated circuit.*", r".*microcontroller.*", r".*processor.*"],
            pairs(&[
                ("SOIC-8", "Package_SO:SOIC-8_3.9x4.9mm_P1.27mm"),
                ("SOIC-16", "Package_SO:SOIC-16_3.9x9.9mm_P1.27mm"),
                ("TSSOP-8", "Package_SO:TSSOP-8_4.4x3mm_P0.65mm"),
                ("TSSOP-16", "Package_SO:TSSOP-16_4.4x5mm_P0.65mm"),
                ("QFN-20", "Package_DFN_QFN:QFN-20-1EP_4x4mm_P0.5mm_EP2.5x2.5mm"),
                ("QFN-24", "Package_DFN_QFN:QFN-24-1EP_4x4mm_P0.5mm_EP2.6x2.6mm"),
                ("LQFP-32", "Package_QFP:LQFP-32_7x7mm_P0.8mm"),
                ("LQFP-48", "Package_QFP:LQFP-48_7x7mm_P0.5mm"),
                ("LQFP-64", "Package_QFP:LQFP-64_10x10mm_P0.5mm"),
                ("LQFP-100", "Package_QFP:LQFP-100_14x14mm_P0.5mm"),
            ]),
        ),
    ];

    specs
        .into_iter()
        .filter_map(|(name, symbol, patterns, footprints)| {
            match ComponentType::new(name, symbol, patterns, footprints) {
                Ok(t) => Some(t),
                Err(e) => {
                    error!("built-in component type {name} rejected: {e}");
                    None
                }
            }
        })
        .collect()
}

/// Lookup tables for one engine instance plus its memoization caches.
///
/// The tables are only changed through `&mut self` (i.e. before a run starts);
/// every mutation clears the caches. During a run the caches are the only
/// shared mutable state and are write-once per key.
#[derive(Debug)]
pub struct RuleStore {
    symbols: RuleTable,
    footprints: RuleTable,
    component_types: Vec<ComponentType>,
    category_rules: Vec<CompiledCategoryRule>,
    field_renames: Vec<(String, String)>,
    symbol_cache: DashMap<String, Resolution>,
    footprint_cache: DashMap<String, Resolution>,
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleStore {
    /// Built-in defaults: empty symbol/footprint/category tables, the default
    /// field renames and the built-in component-type catalogue.
    pub fn new() -> Self {
        Self {
            symbols: RuleTable::new(),
            footprints: RuleTable::new(),
            component_types: builtin_component_types(),
            category_rules: Vec::new(),
            field_renames: pairs(&DEFAULT_FIELD_RENAMES),
            symbol_cache: DashMap::new(),
            footprint_cache: DashMap::new(),
        }
    }

    pub fn add_symbol_rule(&mut self, key: &str, canonical: &str) -> Result<(), RuleLoadError> {
        self.symbols.insert(key, canonical)?;
        self.clear_caches();
        Ok(())
    }

    pub fn add_footprint_rule(&mut self, key: &str, canonical: &str) -> Result<(), RuleLoadError> {
        self.footprints.insert(key, canonical)?;
        self.clear_caches();
        Ok(())
    }

    pub fn add_category_rule(&mut self, rule: CategoryRule) -> Result<(), RuleLoadError> {
        self.category_rules.push(CompiledCategoryRule::compile(rule)?);
        Ok(())
    }

    pub fn extend_category_rules(&mut self, rules: Vec<CompiledCategoryRule>) {
        self.category_rules.extend(rules);
    }

    pub fn set_component_types(&mut self, types: Vec<ComponentType>) {
        self.component_types = types;
        self.clear_caches();
    }

    //an existing vendor name keeps its slot, new ones go to the end
    pub fn add_field_rename(&mut self, vendor: &str, canonical: &str) {
        match self.field_renames.iter_mut().find(|(v, _)| v == vendor) {
            Some(entry) => entry.1 = canonical.to_string(),
            None => self.field_renames.push((vendor.to_string(), canonical.to_string())),
        }
    }

    pub fn symbols(&self) -> &RuleTable {
        &self.symbols
    }

    pub fn footprints(&self) -> &RuleTable {
        &self.footprints
    }

    pub fn component_types(&self) -> &[ComponentType] {
        &self.component_types
    }

    pub fn category_rules(&self) -> &[CompiledCategoryRule] {
        &self.category_rules
    }

    pub fn field_renames(&self) -> &[(String, String)] {
        &self.field_renames
    }

    pub fn cached_symbol(&self, key: &str) -> Option<Resolution> {
        self.symbol_cache.get(key).map(|r| r.value().clone())
    }

    pub fn cached_footprint(&self, key: &str) -> Option<Resolution> {
        self.footprint_cache.get(key).map(|r| r.value().clone())
    }

    //first writer wins; a racing writer computed the same value anyway
    pub fn remember_symbol(&self, key: &str, resolution: &Resolution) {
        debug_assert!(resolution.provenance.is_cacheable());
        self.symbol_cache.entry(key.to_string()).or_insert_with(|| resolution.clone());
    }

    pub fn remember_footprint(&self, key: &str, resolution: &Resolution) {
        debug_assert!(resolution.provenance.is_cacheable());
        self.footprint_cache.entry(key.to_string()).or_insert_with(|| resolution.clone());
    }

    pub fn cache_len(&self) -> (usize, usize) {
        (self.symbol_cache.len(), self.footprint_cache.len())
    }

    pub fn clear_caches(&self) {
        if !self.symbol_cache.is_empty() || !self.footprint_cache.is_empty() {
            debug!("clearing resolution caches");
        }
        self.symbol_cache.clear();
        self.footprint_cache.clear();
    }
}
