//! CSL-JSON item modeling and sanitization
//!
//! This crate turns raw, possibly nonconformant bibliographic metadata
//! into schema-conformant CSL items:
//! - [`CslItem`]: a thin wrapper over one CSL-JSON mapping
//! - Type vocabulary correction and id inference/standardization
//! - Note field "cheater syntax" for out-of-schema metadata
//! - Date-parts conversion helpers
//! - Schema-driven pruning that deletes exactly the offending values

pub mod date;
pub mod item;
pub mod note;
pub mod prune;
pub mod schema;

pub use date::{date_parts_to_string, date_to_date_parts};
pub use item::{CslItem, CslItemError};
pub use prune::{remove_schema_errors, validate, PathStep, Violation, ViolationKind};
pub use schema::{JsonType, Schema, CSL_ITEM_SCHEMA};
