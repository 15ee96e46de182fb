//! # ReportBot Scheduler
//!
//! Fire-and-forget retry jobs on tokio timers.
//!
//! ## Architecture
//! ```text
//! schedule(policy, check) ──spawn──► task
//!   ├── sleep unit × 1 → check → done? stop
//!   ├── sleep unit × 2 → check → error? log, keep going
//!   ├── ...
//!   └── sleep unit × N → check → expire silently
//! RetryHandle ── cancel() / is_finished() / join()
//! ```
//! Jobs share nothing; any number of them may run at once.

pub mod retry;

pub use retry::{schedule, Attempt, RetryHandle, RetryOutcome, RetryPolicy};
