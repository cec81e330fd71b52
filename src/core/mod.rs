pub mod classify;
pub mod confidence;
pub mod engine;
pub mod fields;
pub mod footprint;
pub mod mapping;
pub mod package;
pub mod rules;
pub mod similarity;
pub mod symbol;
pub mod table;
pub mod types;
