//! Engine and store settings.
//!
//! Reading these from disk is the caller's job; both structs deserialize with
//! serde and fall back to defaults field by field.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.6;
pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub symbol_mapping_file: Option<PathBuf>,
    pub footprint_mapping_file: Option<PathBuf>,
    pub category_mapping_file: Option<PathBuf>,
    pub component_type_mapping_file: Option<PathBuf>,
    /// vendor field name -> canonical field name, merged over the defaults
    pub field_mappings: BTreeMap<String, String>,
    pub fuzzy_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbol_mapping_file: None,
            footprint_mapping_file: None,
            category_mapping_file: None,
            component_type_mapping_file: None,
            field_mappings: BTreeMap::new(),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_name: String,
    pub dblib_name: String,
    pub report_name: String,
    pub library_name: String,
    pub library_description: String,
    pub batch_size: usize,
    pub custom_categories: Vec<CustomCategory>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_name: "components.db".to_string(),
            dblib_name: "components.kicad_dbl".to_string(),
            report_name: "migration_report.json".to_string(),
            library_name: "Migrated Component Library".to_string(),
            library_description: "Components migrated from a vendor database library".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            custom_categories: Vec::new(),
        }
    }
}
