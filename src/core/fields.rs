// vendor attribute names -> canonical field names
use std::collections::BTreeMap;

use crate::core::engine::MappingEngine;
use crate::core::types::{ComponentKind, ComponentRecord, TableConfig};

/// What a record gets when field mapping itself could not run.
pub fn minimal_fields(description: &str) -> BTreeMap<String, String> {
    let value = if description.trim().is_empty() { "Unknown" } else { description.trim() };
    BTreeMap::from([
        ("Reference".to_string(), "U".to_string()),
        ("Value".to_string(), value.to_string()),
    ])
}

impl MappingEngine {
    /// Renamed, non-empty fields of `record`, plus a synthesized Value and Reference
    /// when the record has none.
    pub fn map_fields(&self, record: &ComponentRecord, table: &TableConfig) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();

        //renames run in order, so two vendor names sharing a target: the later one wins
        for (vendor, canonical) in self.rules.field_renames() {
            if let Some(value) = record.get(vendor) {
                fields.insert(canonical.clone(), value.to_string());
            }
        }

        for name in &table.custom_fields {
            if fields.contains_key(name) {
                continue;
            }
            if let Some(value) = record.get(name) {
                fields.insert(name.clone(), value.to_string());
            }
        }

        let description = fields
            .get("Description")
            .cloned()
            .unwrap_or_else(|| table.description_of(record));

        if !fields.contains_key("Value") && !description.is_empty() {
            fields.insert("Value".to_string(), description.clone());
        }

        if !fields.contains_key("Reference") {
            let prefix = ComponentKind::guess(&description).reference_prefix();
            fields.insert("Reference".to_string(), prefix.to_string());
        }

        fields
    }
}
