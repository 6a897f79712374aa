//! Core pipeline: snapshot, match, terminate, audit, report

pub mod audit;
pub mod error;
pub mod matcher;
pub mod outcome;
pub mod pipeline;
pub mod report;
pub mod session;
pub mod snapshot;
pub mod terminator;

pub use error::ArgumentError;
pub use matcher::{MatchCriteria, QueryMatcher};
pub use outcome::{AlreadyGonePolicy, KillMode, TerminationOutcome};
pub use pipeline::{run_kill, KillRequest};
pub use report::{Report, Status};
pub use session::{SessionRecord, Snapshot};
