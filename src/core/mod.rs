pub mod actions;
pub mod applier;
pub mod engine;
pub mod filter;
pub mod reconciler;

pub use actions::{FailureKind, PathFailure};
pub use applier::{WatchApplier, WatchEvent};
pub use engine::{run_watch_loop, MirrorEngine, MirrorReport, WatchHandle};
pub use filter::PathFilter;
pub use reconciler::{MirrorStats, Reconciler};
