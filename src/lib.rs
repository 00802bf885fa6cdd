//! Trial Match - clinical trial matching client
//!
//! Filters trial search results against a user's declared allergies, scores
//! the survivors against their health profile and serves them one at a time
//! for accept/reject review.

pub mod config;
pub mod core;
pub mod models;
pub mod services;
pub mod session;

// Re-export commonly used types
pub use crate::core::{calculate_match_score, filter_allergens, Ranker};
pub use crate::models::{ScoringWeights, SearchKey, Trial, UserProfile};
pub use crate::services::{MemoryStore, ProfileStore, TrialApiClient, TrialSearch};
pub use crate::session::{Direction, SearchError, SearchOutcome, SearchStatus, TrialSearchOrchestrator};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let ranked = Ranker::default().rank(&[], &UserProfile::default());
        assert!(ranked.is_empty());
    }
}
