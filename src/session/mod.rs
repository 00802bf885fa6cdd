// Session exports
pub mod orchestrator;
pub mod review;

pub use orchestrator::{
    SearchError, SearchLimits, SearchOutcome, SearchStatus, SessionSnapshot, TrialSearchOrchestrator,
};
pub use review::{Direction, ReviewProgress, ReviewQueue};
