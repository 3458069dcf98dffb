pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod progress;
pub mod remediation;
pub mod report;
pub mod scanner;
pub mod state;
pub mod storage;

pub use config::AppConfig;
pub use engine::{ScanEngine, ScanFailure, ScanResult, TargetScan};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
pub use remediation::{RemediationEngine, RemediationResult};
pub use state::{Resolution, Status};
pub use storage::Database;
