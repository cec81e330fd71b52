//! Resolve vendor component records to canonical symbols and footprints,
//! classify them, score them, and materialize the result into SQLite.

pub mod config;
pub mod core;
pub mod error;
pub mod mapping;
pub mod store;

pub use crate::config::{CustomCategory, EngineConfig, StoreConfig};
pub use crate::core::classify::Classification;
pub use crate::core::engine::MappingEngine;
pub use crate::core::rules::{CategoryRule, ComponentType, RuleStore};
pub use crate::core::table::{CancelToken, SourceTable, TableMapping, TableStats};
pub use crate::core::types::{
    ComponentKind, ComponentMapping, ComponentRecord, ConfidenceBand, MappingOutcome, Provenance, RecordText,
    Resolution, TableConfig,
};
pub use crate::error::{ReportError, ResolutionFailure, RuleLoadError, StoreError};
pub use crate::store::Materializer;
