// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AgeRange, Compensation, GeoPoint, ScoringWeights, SearchKey, Substance, Trial, TrialLocation,
    UserProfile,
};
pub use requests::{city_term, SearchOptions, SearchQuery};
pub use responses::{ErrorResponse, HealthStatus};
