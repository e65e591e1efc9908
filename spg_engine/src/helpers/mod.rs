pub mod field_mapping;
pub mod signature;

pub use field_mapping::{FieldMapping, FieldMappings, NormalizedEvent, NormalizationError, SettledRule, SettledSource};
pub use signature::{compute_signature, verify_signature};
