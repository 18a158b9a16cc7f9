//! CLI stage implementations for the `catalog` binary.

pub mod context;
pub mod discover_cmd;
pub mod doctor;
pub mod enrich_cmd;
pub mod mirror_cmd;
pub mod publish_cmd;
pub mod thumbs_cmd;
pub mod validate_cmd;

pub use context::StageContext;
