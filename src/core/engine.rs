// the mapping engine: rule store + extractor + knobs.
// behaviour lives in impl blocks next to each concern (symbol.rs, footprint.rs, ...)
use crate::config::{DEFAULT_FUZZY_THRESHOLD, EngineConfig};
use crate::core::package::PackageSizeExtractor;
use crate::core::rules::RuleStore;

pub struct MappingEngine {
    pub(crate) rules: RuleStore,
    pub(crate) packages: PackageSizeExtractor,
    pub(crate) fuzzy_threshold: f64,
}

impl Default for MappingEngine {
    fn default() -> Self {
        Self::new(RuleStore::new())
    }
}

impl MappingEngine {
    pub fn new(rules: RuleStore) -> Self {
        Self {
            rules,
            packages: PackageSizeExtractor::new(),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }

    /// Built-in defaults overlaid with whatever rule files `config` names.
    /// Broken files are logged and skipped, never fatal.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(RuleStore::from_config(config)).with_fuzzy_threshold(config.fuzzy_threshold)
    }

    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    //mutation between runs only; RuleStore clears its caches on every change
    pub fn rules_mut(&mut self) -> &mut RuleStore {
        &mut self.rules
    }

    pub fn fuzzy_threshold(&self) -> f64 {
        self.fuzzy_threshold
    }
}
