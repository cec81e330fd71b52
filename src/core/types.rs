// records in, mappings out
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ResolutionFailure;

/// One vendor row: attribute name -> optional string value.
///
/// Values are only ever read through [`ComponentRecord::get_string`] /
/// [`ComponentRecord::get`], so a missing attribute, a NULL and an empty
/// string all look the same to the resolvers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentRecord {
    attributes: BTreeMap<String, Option<String>>,
}

impl ComponentRecord {
    pub fn new() -> Self {
        Self::default()
    }

    //builder used all over the tests and by callers assembling rows by hand
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), Some(value.into()));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        self.attributes.insert(name.into(), value);
    }

    /// Non-empty (after trim) value of `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(|v| v.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn get_string(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or(default).to_string()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for ComponentRecord {
    fn from_iter<I: IntoIterator<Item = (K, Option<String>)>>(iter: I) -> Self {
        Self {
            attributes: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Table descriptor handed over by the source reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub enabled: bool,
    pub key_field: String,
    pub symbol_field: String,
    pub footprint_field: String,
    pub description_field: String,
    pub user_where: String,
    pub custom_fields: Vec<String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_field: "ID".to_string(),
            symbol_field: "Symbol".to_string(),
            footprint_field: "Footprint".to_string(),
            description_field: "Description".to_string(),
            user_where: String::new(),
            custom_fields: Vec::new(),
        }
    }
}

impl TableConfig {
    pub fn description_of(&self, record: &ComponentRecord) -> String {
        record.get_string(&self.description_field, "")
    }
}

/// The free-text parts of a record the heuristics look at, read once per record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordText {
    pub description: String,
    pub value: String,
    pub package: Option<String>,
}

impl RecordText {
    pub fn of(record: &ComponentRecord, table: &TableConfig) -> Self {
        Self {
            description: table.description_of(record),
            value: record.get_string("Value", ""),
            package: record.get("Package").map(str::to_string),
        }
    }

    pub fn from_description(description: &str) -> Self {
        Self { description: description.to_string(), ..Self::default() }
    }

    /// Lower-cased "description value", the haystack for kind guesses.
    pub fn haystack(&self) -> String {
        format!("{} {}", self.description, self.value).to_lowercase()
    }
}

/// Which strategy produced a canonical symbol/footprint.
///
/// Declaration order is strength order: `Exact` is the most trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Exact,
    Pattern,
    Keyword,
    Fuzzy,
    Fallback,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Exact => "exact",
            Provenance::Pattern => "pattern",
            Provenance::Keyword => "keyword",
            Provenance::Fuzzy => "fuzzy",
            Provenance::Fallback => "fallback",
        }
    }

    /// Exact, pattern and keyword hits are memoized; fuzzy/fallback are recomputed.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Provenance::Exact | Provenance::Pattern | Provenance::Keyword)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub canonical: String,
    pub provenance: Provenance,
}

impl Resolution {
    pub fn new(canonical: impl Into<String>, provenance: Provenance) -> Self {
        Self { canonical: canonical.into(), provenance }
    }
}

/// Coarse component family used by every keyword heuristic in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Resistor,
    Capacitor,
    Inductor,
    Diode,
    Transistor,
    Generic,
}

impl ComponentKind {
    /// Priority order of the keyword scan. `Generic` is never scanned for.
    pub const SCAN_ORDER: [ComponentKind; 5] = [
        ComponentKind::Resistor,
        ComponentKind::Capacitor,
        ComponentKind::Inductor,
        ComponentKind::Diode,
        ComponentKind::Transistor,
    ];

    pub const ALL: [ComponentKind; 6] = [
        ComponentKind::Resistor,
        ComponentKind::Capacitor,
        ComponentKind::Inductor,
        ComponentKind::Diode,
        ComponentKind::Transistor,
        ComponentKind::Generic,
    ];

    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            ComponentKind::Resistor => &["resistor", "res", "ohm"],
            ComponentKind::Capacitor => &["capacitor", "cap", "farad"],
            ComponentKind::Inductor => &["inductor", "ind", "henry"],
            ComponentKind::Diode => &["diode", "rectifier"],
            ComponentKind::Transistor => &["transistor", "mosfet", "fet", "bjt"],
            ComponentKind::Generic => &[],
        }
    }

    /// First kind (in scan order) whose keywords occur in `text`; `Generic` otherwise.
    pub fn guess(text: &str) -> ComponentKind {
        let text = text.to_lowercase();
        Self::SCAN_ORDER
            .into_iter()
            .find(|kind| kind.matches_lowercase(&text))
            .unwrap_or(ComponentKind::Generic)
    }

    pub fn matches(&self, text: &str) -> bool {
        self.matches_lowercase(&text.to_lowercase())
    }

    fn matches_lowercase(&self, text: &str) -> bool {
        self.keywords().iter().any(|k| text.contains(*k))
    }

    pub fn generic_symbol(&self) -> &'static str {
        match self {
            ComponentKind::Resistor => "Device:R",
            ComponentKind::Capacitor => "Device:C",
            ComponentKind::Inductor => "Device:L",
            ComponentKind::Diode => "Device:D",
            ComponentKind::Transistor => "Device:Q_NMOS_GSD",
            ComponentKind::Generic => "Device:U",
        }
    }

    pub fn generic_footprint(&self) -> &'static str {
        match self {
            ComponentKind::Resistor => "Resistor_SMD:R_0603_1608Metric",
            ComponentKind::Capacitor => "Capacitor_SMD:C_0603_1608Metric",
            ComponentKind::Inductor => "Inductor_SMD:L_0603_1608Metric",
            ComponentKind::Diode => "Diode_SMD:D_SOD-123",
            ComponentKind::Transistor => "Package_TO_SOT_SMD:SOT-23",
            ComponentKind::Generic => "Package_SO:SOIC-8_3.9x4.9mm_P1.27mm",
        }
    }

    pub fn reference_prefix(&self) -> &'static str {
        match self {
            ComponentKind::Resistor => "R",
            ComponentKind::Capacitor => "C",
            ComponentKind::Inductor => "L",
            ComponentKind::Diode => "D",
            ComponentKind::Transistor => "Q",
            ComponentKind::Generic => "U",
        }
    }

    /// Reverse of [`ComponentKind::generic_symbol`].
    pub fn from_generic_symbol(symbol: &str) -> Option<ComponentKind> {
        Self::ALL.into_iter().find(|k| k.generic_symbol() == symbol)
    }
}

/// Resolved output for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMapping {
    pub raw_symbol: String,
    pub raw_footprint: String,
    pub canonical_symbol: String,
    pub canonical_footprint: String,
    pub symbol_provenance: Provenance,
    pub footprint_provenance: Provenance,
    pub confidence: f64,
    pub fields: BTreeMap<String, String>,
    pub category: String,
    pub subcategory: String,
    pub keywords: Vec<String>,
}

impl ComponentMapping {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn confidence_band(&self) -> ConfidenceBand {
        ConfidenceBand::of(self.confidence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    //high: > 0.8, medium: [0.5, 0.8], low: < 0.5
    pub fn of(confidence: f64) -> ConfidenceBand {
        if confidence > 0.8 {
            ConfidenceBand::High
        } else if confidence >= 0.5 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }
}

/// What `map_record` hands back: either a clean resolution or the fallback
/// mapping together with the reason the normal path was abandoned.
#[derive(Debug, Clone)]
pub enum MappingOutcome {
    Resolved(ComponentMapping),
    FellBack {
        mapping: ComponentMapping,
        reason: ResolutionFailure,
    },
}

impl MappingOutcome {
    pub fn mapping(&self) -> &ComponentMapping {
        match self {
            MappingOutcome::Resolved(m) => m,
            MappingOutcome::FellBack { mapping, .. } => mapping,
        }
    }

    pub fn into_mapping(self) -> ComponentMapping {
        match self {
            MappingOutcome::Resolved(m) => m,
            MappingOutcome::FellBack { mapping, .. } => mapping,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, MappingOutcome::FellBack { .. })
    }

    pub fn failure(&self) -> Option<&ResolutionFailure> {
        match self {
            MappingOutcome::Resolved(_) => None,
            MappingOutcome::FellBack { reason, .. } => Some(reason),
        }
    }
}
