// Core engine: discovery, retention, transfer, deletion and audit

pub mod audit;
pub mod config;
pub mod deletion;
pub mod events;
pub mod layout;
pub mod metrics;
pub mod publish;
pub mod retention;
pub mod template;
pub mod transfer;

// Re-export commonly used items
pub use config::Config;
pub use deletion::{CleanupStats, VersionCleaner};
pub use events::{EventSink, WorkerEvent};
pub use layout::{ProductionLayout, ShotContext};
pub use retention::{DeletionPlan, RetentionAnalyzer, RetentionPolicy, ScanMode};
pub use transfer::{TransferBatch, TransferJob, TransferMode, TransferOrchestrator};
