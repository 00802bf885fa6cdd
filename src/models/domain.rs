use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

/// Age bounds applied when a trial's age range is missing or unparsable
pub const DEFAULT_MIN_AGE: i64 = 0;
pub const DEFAULT_MAX_AGE: i64 = 999;

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// User health profile
///
/// Owned by the presentation layer and the profile store; the matching core
/// only reads it. The first condition is the primary search term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UserProfile {
    #[serde(rename = "medicalConditions", alias = "conditions", default)]
    #[validate(custom(function = "validate_primary_condition"))]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub age: u32,
    /// Free-form home location, e.g. "Boston, MA"
    #[serde(default)]
    #[validate(custom(function = "validate_not_blank"))]
    pub location: String,
    /// Maximum travel distance in miles
    #[serde(rename = "maxTravelDistance", default = "default_max_travel_distance")]
    pub max_travel_distance: u32,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(rename = "minCompensation", default)]
    pub min_compensation: Option<f64>,
    /// Geocoded home location, when the presentation layer has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<GeoPoint>,
}

fn default_max_travel_distance() -> u32 { 50 }

fn validate_primary_condition(conditions: &[String]) -> Result<(), ValidationError> {
    match conditions.first() {
        Some(primary) if !primary.trim().is_empty() => Ok(()),
        _ => Err(ValidationError::new("missing_condition")),
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

impl UserProfile {
    /// Primary (first) condition, used as the main search term
    pub fn primary_condition(&self) -> Option<&str> {
        self.conditions.first().map(|c| c.trim()).filter(|c| !c.is_empty())
    }

    /// Second declared condition, falling back to the primary one
    pub fn secondary_condition(&self) -> Option<&str> {
        self.conditions
            .get(1)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .or_else(|| self.primary_condition())
    }

    /// Preferred minimum compensation, only when it is a positive amount
    pub fn preferred_compensation(&self) -> Option<f64> {
        self.min_compensation.filter(|amount| *amount > 0.0)
    }

    /// Fingerprint of the fields that influence search results
    pub fn search_key(&self) -> SearchKey {
        SearchKey {
            conditions: self.conditions.clone(),
            location: self.location.clone(),
            allergies: self.allergies.clone(),
            max_travel_distance: self.max_travel_distance,
        }
    }
}

/// Equality key over the profile fields relevant to searching.
///
/// Profiles with equal keys are the same search, whatever their identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchKey {
    pub conditions: Vec<String>,
    pub location: String,
    pub allergies: Vec<String>,
    pub max_travel_distance: u32,
}

/// Free-form eligibility age bounds, e.g. `{"min": "18 Years", "max": "N/A"}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgeRange {
    #[serde(default, deserialize_with = "lenient_string")]
    pub min: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub max: String,
}

impl AgeRange {
    /// Parsed `(min, max)` bounds, defaulting to the widest plausible range
    pub fn bounds(&self) -> (i64, i64) {
        (
            parse_leading_int(&self.min).unwrap_or(DEFAULT_MIN_AGE),
            parse_leading_int(&self.max).unwrap_or(DEFAULT_MAX_AGE),
        )
    }
}

/// Parse the leading integer of a string ("18 Years" -> 18, "N/A" -> None)
pub fn parse_leading_int(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let digits_start = usize::from(trimmed.starts_with(['-', '+']));
    let digits_len = trimmed[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();

    if digits_len == 0 {
        return None;
    }

    trimmed[..digits_start + digits_len].parse().ok()
}

/// One trial site
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialLocation {
    #[serde(default, deserialize_with = "lenient_string")]
    pub facility: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub country: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub zip: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Pre-computed distance from the user, in miles
    #[serde(default)]
    pub distance: Option<f64>,
}

impl TrialLocation {
    pub fn coordinates(&self) -> Option<GeoPoint> {
        Some(GeoPoint {
            latitude: self.latitude?,
            longitude: self.longitude?,
        })
    }
}

/// Participant compensation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Compensation {
    #[serde(rename = "has_compensation", alias = "hasCompensation", default)]
    pub has_compensation: bool,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

/// Substance administered by a trial (drug, biological, supplement)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Substance {
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
}

/// Clinical trial record as returned by the search backend
///
/// Records come from an untrusted source, so every field is defaulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default = "default_gender", deserialize_with = "lenient_gender")]
    pub gender: String,
    #[serde(rename = "age_range", alias = "ageRange", default)]
    pub age_range: AgeRange,
    #[serde(default)]
    pub locations: Vec<TrialLocation>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(rename = "eligibilityCriteria", default, deserialize_with = "lenient_string")]
    pub eligibility_criteria: String,
    #[serde(default)]
    pub compensation: Option<Compensation>,
    #[serde(rename = "substancesUsed", default)]
    pub substances_used: Vec<Substance>,
    /// Distance to the nearest site, in miles
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(rename = "matchScore", default, skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f64>,
}

impl Trial {
    /// Copy of this trial carrying the given match score
    pub fn with_match_score(&self, score: f64) -> Trial {
        Trial {
            match_score: Some(score),
            ..self.clone()
        }
    }
}

fn default_gender() -> String { "All".to_string() }

fn lenient_gender<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let gender = lenient_string(deserializer)?;
    if gender.trim().is_empty() {
        Ok(default_gender())
    } else {
        Ok(gender)
    }
}

/// Accept strings, numbers and nulls where a string is expected
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// Scoring weights, in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub condition: f64,
    pub gender: f64,
    pub age: f64,
    pub proximity: f64,
    pub compensation: f64,
    /// Minimum proximity points for any site within travel range
    pub proximity_floor: f64,
    /// Cap on compensation points when the amount is below the preference
    pub compensation_partial_cap: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            condition: 50.0,
            gender: 15.0,
            age: 15.0,
            proximity: 20.0,
            compensation: 10.0,
            proximity_floor: 5.0,
            compensation_partial_cap: 9.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("18 Years"), Some(18));
        assert_eq!(parse_leading_int("  65"), Some(65));
        assert_eq!(parse_leading_int("N/A"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("-"), None);
    }

    #[test]
    fn test_age_range_defaults() {
        let range = AgeRange { min: "".to_string(), max: "N/A".to_string() };
        assert_eq!(range.bounds(), (0, 999));

        let range = AgeRange { min: "18 Years".to_string(), max: "75 Years".to_string() };
        assert_eq!(range.bounds(), (18, 75));
    }

    #[test]
    fn test_trial_deserializes_partial_record() {
        let json = serde_json::json!({
            "id": "NCT0001",
            "gender": "",
            "age_range": { "min": 18, "max": null },
            "locations": [{ "city": "Boston", "zip": 2115 }],
            "substancesUsed": [{ "type": "Drug", "name": "Metformin" }]
        });

        let trial: Trial = serde_json::from_value(json).unwrap();

        assert_eq!(trial.id, "NCT0001");
        assert_eq!(trial.gender, "All");
        assert_eq!(trial.age_range.bounds(), (18, 999));
        assert_eq!(trial.locations[0].zip, "2115");
        assert_eq!(trial.substances_used[0].kind, "Drug");
        assert!(trial.compensation.is_none());
        assert!(trial.match_score.is_none());
    }

    #[test]
    fn test_search_key_ignores_unrelated_fields() {
        let profile = UserProfile {
            conditions: vec!["Diabetes".to_string()],
            location: "Boston, MA".to_string(),
            age: 40,
            ..Default::default()
        };
        let mut older = profile.clone();
        older.age = 41;
        older.gender = "female".to_string();

        assert_eq!(profile.search_key(), older.search_key());

        older.allergies.push("peanut".to_string());
        assert_ne!(profile.search_key(), older.search_key());
    }

    #[test]
    fn test_profile_validation() {
        let mut profile = UserProfile {
            conditions: vec!["Asthma".to_string()],
            location: "Chicago, IL".to_string(),
            ..Default::default()
        };
        assert!(profile.validate().is_ok());

        profile.location = "   ".to_string();
        assert!(profile.validate().is_err());

        profile.location = "Chicago".to_string();
        profile.conditions = vec![" ".to_string()];
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_secondary_condition_falls_back_to_primary() {
        let mut profile = UserProfile {
            conditions: vec!["Asthma".to_string()],
            ..Default::default()
        };
        assert_eq!(profile.secondary_condition(), Some("Asthma"));

        profile.conditions.push("COPD".to_string());
        assert_eq!(profile.secondary_condition(), Some("COPD"));
    }
}
