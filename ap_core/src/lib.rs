pub mod engine;
pub mod error;
pub mod observer;
pub mod orchestrator;
pub mod progress;

pub use engine::{CacheEngine, PackageInfo, UpgradablePackage, upgradable_packages};
pub use error::Error;
pub use observer::{
    AcquireProgress, MediaPrompt, ObserverState, OperationItem, ProgressSink,
    UpdateProgressObserver,
};
pub use orchestrator::{RefreshReport, UpdateOrchestrator};
pub use progress::{PercentageValue, ProgressSample, normalize};

/// Payload sent once when a refresh finishes.
pub const SUCCEEDED_SENTINEL: &str = "FN_OVERRIDE_SUCCESSFUL";
/// Payload sent once when a refresh aborts.
pub const FAILED_SENTINEL: &str = "FN_OVERRIDE_FAILED";
