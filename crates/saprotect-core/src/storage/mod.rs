pub mod models;
pub mod queries;
pub mod sqlite;

pub use queries::{Remediation, UpsertOutcome};
pub use sqlite::Database;
