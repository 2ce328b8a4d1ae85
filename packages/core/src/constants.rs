use std::env;
use std::path::PathBuf;

/// Number of activity entries returned when the caller does not ask for a size
pub const DEFAULT_ACTIVITY_LIMIT: i64 = 10;

/// Upper bound for the activity feed size
pub const MAX_ACTIVITY_LIMIT: i64 = 100;

/// Maximum length of entity titles
pub const MAX_TITLE_LENGTH: usize = 255;

/// Get the path to the Ecflow directory (~/.ecflow)
pub fn ecflow_dir() -> PathBuf {
    // First try HOME environment variable (useful for tests)
    if let Ok(home) = env::var("HOME") {
        PathBuf::from(home).join(".ecflow")
    } else {
        dirs::home_dir()
            .unwrap_or_else(env::temp_dir)
            .join(".ecflow")
    }
}

/// Get the path to the default database file (~/.ecflow/ecflow.db)
pub fn default_database_path() -> PathBuf {
    ecflow_dir().join("ecflow.db")
}
