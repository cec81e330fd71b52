// category hierarchy + name -> id assignment
use std::collections::BTreeMap;

use rusqlite::{OptionalExtension, params};
use tracing::{debug, info, warn};

use crate::core::table::TableMapping;
use crate::core::types::ComponentMapping;
use crate::error::StoreError;
use crate::store::Materializer;

pub const UNCATEGORIZED: &str = "Uncategorized";

pub const DEFAULT_CATEGORIES: [(&str, &str); 19] = [
    ("Resistors", "Resistive components"),
    ("Capacitors", "Capacitive components"),
    ("Inductors", "Inductive components"),
    ("Diodes", "Diode components"),
    ("Transistors", "Transistor components"),
    ("Integrated Circuits", "IC components"),
    ("Connectors", "Connector components"),
    ("Mechanical", "Mechanical components"),
    ("Crystals & Oscillators", "Timing components"),
    ("Sensors", "Sensor components"),
    ("Power Management", "Power management ICs"),
    ("Microcontrollers", "Microcontroller units"),
    ("Memory", "Memory components"),
    ("Analog", "Analog components"),
    ("Digital", "Digital components"),
    ("RF", "RF components"),
    ("Optoelectronics", "Optical components"),
    ("Test Points", "Test and measurement"),
    (UNCATEGORIZED, "Uncategorized components"),
];

/// Category name -> row id, always containing [`UNCATEGORIZED`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryIds {
    ids: BTreeMap<String, i64>,
    uncategorized: i64,
}

impl CategoryIds {
    pub fn new(ids: BTreeMap<String, i64>) -> Result<Self, StoreError> {
        let uncategorized = *ids
            .get(UNCATEGORIZED)
            .ok_or_else(|| StoreError::MissingCategory(UNCATEGORIZED.to_string()))?;
        Ok(Self { ids, uncategorized })
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.ids.get(name).copied()
    }

    pub fn uncategorized(&self) -> i64 {
        self.uncategorized
    }

    /// Exact match on the mapping's category, else Uncategorized.
    pub fn id_for(&self, mapping: &ComponentMapping) -> i64 {
        self.get(&mapping.category).unwrap_or(self.uncategorized)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.ids.keys().map(String::as_str)
    }
}

struct CategorySpec {
    name: String,
    description: String,
    parent: Option<String>,
}

impl Materializer {
    //defaults, then custom categories (same name replaces in place), then whatever
    //the classifier produced that isn't there yet
    fn category_specs(&self, tables: &[TableMapping]) -> Vec<CategorySpec> {
        let mut specs: Vec<CategorySpec> = DEFAULT_CATEGORIES
            .iter()
            .map(|(name, description)| CategorySpec {
                name: name.to_string(),
                description: description.to_string(),
                parent: None,
            })
            .collect();

        for custom in &self.config.custom_categories {
            let spec = CategorySpec {
                name: custom.name.clone(),
                description: custom.description.clone(),
                parent: custom.parent.clone(),
            };
            match specs.iter_mut().find(|s| s.name == custom.name) {
                Some(existing) => *existing = spec,
                None => specs.push(spec),
            }
        }
        if !self.config.custom_categories.is_empty() {
            info!(count = self.config.custom_categories.len(), "added custom categories");
        }

        for m in tables.iter().flat_map(|t| &t.mappings) {
            let name = m.category.trim();
            if !name.is_empty() && !specs.iter().any(|s| s.name == name) {
                specs.push(CategorySpec { name: name.to_string(), description: String::new(), parent: None });
            }
        }
        specs
    }

    /// Insert the category hierarchy and return the name -> id map. A category
    /// that fails to insert is skipped; a missing Uncategorized entry is an error.
    pub fn populate_categories(&self, tables: &[TableMapping]) -> Result<CategoryIds, StoreError> {
        info!("populating component categories");
        let specs = self.category_specs(tables);
        let tx = self.conn.unchecked_transaction()?;
        let mut ids = BTreeMap::new();

        for spec in &specs {
            let inserted = tx
                .execute(
                    "INSERT OR IGNORE INTO categories (name, description) VALUES (?1, ?2)",
                    params![spec.name, spec.description],
                )
                .and_then(|_| {
                    tx.query_row("SELECT id FROM categories WHERE name = ?1", params![spec.name], |r| r.get::<_, i64>(0))
                });
            match inserted {
                Ok(id) => {
                    debug!(name = %spec.name, id, "category added");
                    ids.insert(spec.name.clone(), id);
                }
                Err(e) => warn!(name = %spec.name, error = %e, "category not added"),
            }
        }

        for spec in &specs {
            let Some(parent) = &spec.parent else { continue };
            let parent_id: Option<i64> = tx
                .query_row("SELECT id FROM categories WHERE name = ?1", params![parent], |r| r.get(0))
                .optional()?;
            match parent_id {
                Some(pid) => {
                    tx.execute("UPDATE categories SET parent_id = ?1 WHERE name = ?2", params![pid, spec.name])?;
                }
                None => warn!(name = %spec.name, parent = %parent, "parent category not found"),
            }
        }

        tx.commit()?;
        let ids = CategoryIds::new(ids)?;
        info!(count = ids.len(), "populated categories");
        Ok(ids)
    }
}
