// category classification: ordered rules, then a keyword heuristic
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::engine::MappingEngine;
use crate::core::types::{ComponentKind, ComponentRecord, TableConfig};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub subcategory: String,
    pub keywords: Vec<String>,
}

impl Classification {
    pub fn new(category: &str, subcategory: &str, keywords: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn uncategorized() -> Self {
        Self::new("Uncategorized", "General", &["component"])
    }
}

const IC_TERMS: [&str; 3] = ["ic", "integrated", "chip"];

//used when no category rule matched
fn heuristic(match_text: &str) -> Classification {
    match ComponentKind::guess(match_text) {
        ComponentKind::Resistor => Classification::new("Passive Components", "Resistors", &["resistor", "resistance", "ohm"]),
        ComponentKind::Capacitor => {
            Classification::new("Passive Components", "Capacitors", &["capacitor", "capacitance", "farad"])
        }
        ComponentKind::Inductor => Classification::new("Passive Components", "Inductors", &["inductor", "inductance", "henry"]),
        ComponentKind::Diode => Classification::new("Semiconductor", "Diodes", &["diode", "rectifier"]),
        ComponentKind::Transistor => Classification::new("Semiconductor", "Transistors", &["transistor", "fet", "mosfet"]),
        ComponentKind::Generic if IC_TERMS.iter().any(|t| match_text.contains(t)) => {
            Classification::new("Integrated Circuits", "General", &["ic", "chip"])
        }
        ComponentKind::Generic => Classification::uncategorized(),
    }
}

impl MappingEngine {
    /// Lower-cased "name description symbol footprint" string the category globs run against.
    pub fn match_text(record: &ComponentRecord, table: &TableConfig) -> String {
        format!(
            "{} {} {} {}",
            record.get_string("Name", ""),
            table.description_of(record),
            record.get_string(&table.symbol_field, ""),
            record.get_string(&table.footprint_field, ""),
        )
        .to_lowercase()
    }

    pub fn classify(&self, record: &ComponentRecord, table: &TableConfig) -> Classification {
        let text = Self::match_text(record, table);

        if let Some(hit) = self.rules.category_rules().iter().find(|r| r.matches(&text)) {
            debug!(pattern = %hit.rule.pattern, category = %hit.rule.category, "category rule matched");
            return Classification {
                category: hit.rule.category.clone(),
                subcategory: hit.rule.subcategory.clone(),
                keywords: hit.rule.keywords.clone(),
            };
        }

        heuristic(&text)
    }
}
