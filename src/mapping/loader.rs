/*
Rule files:

    symbol / footprint mapping : { "<raw or glob>": "<canonical>", ... }
    category mapping           : [ { pattern, category, subcategory, keywords }, ... ]
    component types            : { "<name>": { symbol, symbol_patterns, footprints: { size: fp } }, ... }

Format is picked by extension: .toon (toon-format) or .json (serde_json).
Object key order is kept; it is the first-match order for globs and types.

A file is validated as a whole before anything from it is applied, so a bad
file never leaves the store half-updated.
*/
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;

use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::core::rules::{CategoryRule, CompiledCategoryRule, ComponentType, RuleStore, RuleTable};
use crate::error::RuleLoadError;

/// A JSON/TOON object deserialized as its entries in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((k, v)) = access.next_entry::<String, V>()? {
            entries.push((k, v));
        }
        Ok(OrderedMap(entries))
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComponentTypeEntry {
    #[serde(alias = "kicad_symbol")]
    pub symbol: String,
    #[serde(default)]
    pub symbol_patterns: Vec<String>,
    #[serde(default, alias = "common_footprints")]
    pub footprints: OrderedMap<String>,
}

enum Format {
    Toon,
    Json,
}

fn format_of(path: &Path) -> Result<Format, RuleLoadError> {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("toon") => Ok(Format::Toon),
        Some("json") => Ok(Format::Json),
        _ => Err(RuleLoadError::UnsupportedFormat { path: path.to_path_buf() }),
    }
}

pub fn read_rule_file<T: DeserializeOwned>(path: &Path) -> Result<T, RuleLoadError> {
    let format = format_of(path)?;
    let text = fs::read_to_string(path).map_err(|source| RuleLoadError::Io { path: path.to_path_buf(), source })?;
    let malformed = |message: String| RuleLoadError::Malformed { path: path.to_path_buf(), message };

    match format {
        Format::Toon => toon_format::decode_default(&text).map_err(|e| malformed(e.to_string())),
        Format::Json => serde_json::from_str(&text).map_err(|e| malformed(e.to_string())),
    }
}

/// Symbol or footprint rules, in file order. Every key and target is checked
/// against a scratch table first.
pub fn load_pair_rules(path: &Path) -> Result<Vec<(String, String)>, RuleLoadError> {
    let OrderedMap(pairs) = read_rule_file::<OrderedMap<String>>(path)?;
    let mut scratch = RuleTable::new();
    for (key, canonical) in &pairs {
        scratch.insert(key, canonical)?;
    }
    Ok(pairs)
}

pub fn load_category_rules(path: &Path) -> Result<Vec<CompiledCategoryRule>, RuleLoadError> {
    let rules: Vec<CategoryRule> = read_rule_file(path)?;
    rules.into_iter().map(CompiledCategoryRule::compile).collect()
}

pub fn load_component_types(path: &Path) -> Result<Vec<ComponentType>, RuleLoadError> {
    let OrderedMap(entries) = read_rule_file::<OrderedMap<ComponentTypeEntry>>(path)?;
    entries
        .into_iter()
        .map(|(name, entry)| ComponentType::new(&name, &entry.symbol, &entry.symbol_patterns, entry.footprints.0))
        .collect()
}

//load, and on failure log + keep whatever the store already has
fn load_or_skip<T>(what: &str, path: &Path, load: impl FnOnce(&Path) -> Result<T, RuleLoadError>) -> Option<T> {
    match load(path) {
        Ok(v) => Some(v),
        Err(RuleLoadError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "{what} file not found, skipping");
            None
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "skipping {what} file");
            None
        }
    }
}

impl RuleStore {
    /// Built-in defaults plus everything the config points at. Never fails:
    /// a file that doesn't load is logged and ignored.
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut store = RuleStore::new();

        if let Some(path) = &config.symbol_mapping_file {
            if let Some(pairs) = load_or_skip("symbol mapping", path, load_pair_rules) {
                let n = pairs.len();
                for (key, canonical) in pairs {
                    //validated above
                    if let Err(e) = store.add_symbol_rule(&key, &canonical) {
                        error!(key = %key, error = %e, "symbol rule rejected");
                    }
                }
                info!(count = n, "loaded custom symbol mappings");
            }
        }

        if let Some(path) = &config.footprint_mapping_file {
            if let Some(pairs) = load_or_skip("footprint mapping", path, load_pair_rules) {
                let n = pairs.len();
                for (key, canonical) in pairs {
                    if let Err(e) = store.add_footprint_rule(&key, &canonical) {
                        error!(key = %key, error = %e, "footprint rule rejected");
                    }
                }
                info!(count = n, "loaded custom footprint mappings");
            }
        }

        if let Some(path) = &config.category_mapping_file {
            if let Some(rules) = load_or_skip("category mapping", path, load_category_rules) {
                info!(count = rules.len(), "loaded category mapping rules");
                store.extend_category_rules(rules);
            }
        }

        if let Some(path) = &config.component_type_mapping_file {
            if let Some(types) = load_or_skip("component type mapping", path, load_component_types) {
                info!(count = types.len(), "loaded component type mappings");
                store.set_component_types(types);
            }
        }

        for (vendor, canonical) in &config.field_mappings {
            store.add_field_rename(vendor, canonical);
        }

        store
    }
}
