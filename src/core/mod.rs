// Core algorithm exports
pub mod allergy;
pub mod distance;
pub mod ranking;
pub mod scoring;

pub use allergy::filter_allergens;
pub use distance::{haversine_miles, nearest_site_distance};
pub use ranking::Ranker;
pub use scoring::calculate_match_score;
