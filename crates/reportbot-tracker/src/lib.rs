//! # ReportBot Tracker
//!
//! Everything between "a file arrived" and "the participant is done":
//!
//! ```text
//! DocumentIntake::receive
//!   ├── validate work item, format, size
//!   ├── store <participant>/<work>/report.<ext>
//!   └── WatcherRegistry::start ──► watch (retry job)
//!                                    ├── evaluate directory
//!                                    ├── complete → stop silently
//!                                    └── incomplete → Notifier::send(status)
//! ```

pub mod completion;
pub mod intake;
pub mod stats;
pub mod text;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use completion::{evaluate, evaluate_dir, CompletionStatus};
pub use intake::{DocumentIntake, IntakeOutcome};
pub use stats::WorkProgress;
pub use watcher::{watch, WatcherRegistry};
