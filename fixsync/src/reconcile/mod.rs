//! Reconciliation loop.
//!
//! A [`Reconciler`] owns the tracked fix package set and the latest
//! distribution descriptors. Each pass resolves the current version,
//! runs the three discovery calls one after another, diffs the fix
//! packages against the download directory by [`ArchiveKey`], and, when
//! automation is enabled, downloads new packages, repackages them and
//! fetches missing distribution images.
//!
//! [`SchedulerHandle`] drives passes from a background thread on a fixed
//! interval.
//!
//! [`ArchiveKey`]: crate::archive::ArchiveKey

mod reconciler;
mod scheduler;
mod state;
mod tracker;

pub use reconciler::{PipelineParts, Reconciler};
pub use scheduler::SchedulerHandle;
pub use state::{FixEntry, FixState, LoopState, LoopStatus, PassOutcome};
pub use tracker::FixTracker;
