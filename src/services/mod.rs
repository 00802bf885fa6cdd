// Service exports
pub mod store;
pub mod trials_api;

pub use store::{FileStore, MemoryStore, ProfileStore, StoreError, ACCEPTED_TRIALS_KEY, PROFILE_KEY};
pub use trials_api::{HealthCheck, TrialApiClient, TrialApiError, TrialSearch};
