pub mod cleanup;
pub mod dispatcher;
pub mod normalizer;
pub mod ownership;

pub use cleanup::CleanupSweep;
pub use dispatcher::{DispatchSummary, NotificationDispatcher};
