//! Status publication: the externally observable snapshot and the
//! time-remaining estimate.

mod estimator;
mod publisher;
mod types;

pub use estimator::ThroughputEstimator;
pub use publisher::{StatusHandle, StatusPublisher};
pub use types::{AppState, PixAiAccount, Settings};
