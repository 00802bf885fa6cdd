use serde::{Deserialize, Serialize};

use crate::models::domain::UserProfile;

/// Server-side hints passed along with a trial search
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    #[serde(rename = "maxDistance", skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<u32>,
    #[serde(rename = "limit", skip_serializing_if = "Option::is_none")]
    pub result_cap: Option<usize>,
}

/// A single query against the search collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub condition: String,
    pub city: String,
    pub options: SearchOptions,
}

impl SearchQuery {
    /// Build a query for `condition` near the profile's home city
    pub fn for_profile(profile: &UserProfile, condition: &str, result_cap: usize) -> Self {
        Self {
            condition: condition.to_string(),
            city: city_term(&profile.location).to_string(),
            options: SearchOptions {
                max_distance: Some(profile.max_travel_distance),
                result_cap: Some(result_cap),
            },
        }
    }
}

/// City portion of a location string ("Boston, MA" -> "Boston")
pub fn city_term(location: &str) -> &str {
    location.split(',').next().unwrap_or_default().trim()
}
