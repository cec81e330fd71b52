pub mod loader;

pub use loader::{OrderedMap, load_category_rules, load_component_types, load_pair_rules, read_rule_file};
