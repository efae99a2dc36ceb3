// Library exports for the composewatch binary and integration tests
//
// The binary entrypoint in main.rs only wires configuration, logging and
// output around the scanner exposed here

pub mod config;
pub mod metrics;
pub mod models;
pub mod policy;
pub mod reference;
pub mod registry;
pub mod report;
pub mod scanner;

// Re-export commonly used types
pub use config::{Cli, ComposewatchConfig};
pub use models::{ImageReference, Registry, ScanEntry, StatusCounts, StatusKind, UpdateStatus};
pub use policy::UpdateEvaluator;
pub use registry::{RegistryClient, RegistryClients};
pub use report::{ReportAggregator, ScanReport};
pub use scanner::{ImageOccurrence, ScanError, Scanner};
