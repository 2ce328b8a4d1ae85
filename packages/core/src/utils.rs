// ABOUTME: Shared utility functions for Ecflow
// ABOUTME: Prefixed identifier generation

/// Generate a unique row id with a readable prefix, e.g. `ecr-V1StGXR8_Z5jdHi6B-myT`
pub fn generate_id(prefix: &str) -> String {
    format!("{}-{}", prefix, nanoid::nanoid!())
}
