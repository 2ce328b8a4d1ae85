// ABOUTME: Core types, traits, and utilities for Ecflow
// ABOUTME: Foundational package providing the shared change-management vocabulary

pub mod constants;
pub mod pagination;
pub mod types;
pub mod utils;
pub mod validation;

// Re-export main types
pub use types::{EntityRef, EntityType, ParseEntityTypeError, Priority};

// Re-export constants
pub use constants::{default_database_path, ecflow_dir, DEFAULT_ACTIVITY_LIMIT, MAX_ACTIVITY_LIMIT};

// Re-export utilities
pub use utils::generate_id;

// Re-export validation
pub use validation::{ValidationError, Validator};
