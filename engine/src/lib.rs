//! Scan orchestration and deanonymization correlation.

pub mod correlation;
pub mod scanner;

pub use correlation::{CorrelationEngine, CorrelationRule};
pub use scanner::{ProtocolScanner, ScanConfig, ScanError, Scanner, ScannerRegistry};
