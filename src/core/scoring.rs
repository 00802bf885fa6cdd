use crate::core::distance::nearest_site_distance;
use crate::models::{ScoringWeights, Trial, UserProfile};

/// Calculate a normalized match score (0-1) between a profile and a trial
///
/// Scoring formula (points earned / points applicable):
/// ```text
/// condition overlap      50   always applicable
/// gender eligibility     15   always applicable
/// age eligibility        15   always applicable
/// site proximity         20   always applicable, earned only with a distance
/// compensation           10   applicable only with a preferred minimum
/// ```
///
/// Malformed trial fields never fail scoring; they fall back to defaults.
pub fn calculate_match_score(
    profile: &UserProfile,
    trial: &Trial,
    weights: &ScoringWeights,
) -> f64 {
    let mut earned = 0.0;
    let mut possible = 0.0;

    possible += weights.condition;
    if conditions_overlap(&profile.conditions, &trial.conditions) {
        earned += weights.condition;
    }

    possible += weights.gender;
    if gender_eligible(&trial.gender, &profile.gender) {
        earned += weights.gender;
    }

    possible += weights.age;
    if age_eligible(trial, profile.age) {
        earned += weights.age;
    }

    possible += weights.proximity;
    if let Some(distance) = nearest_site_distance(trial, profile.coordinates) {
        earned += proximity_points(distance, profile.max_travel_distance, weights);
    }

    if let Some(preferred) = profile.preferred_compensation() {
        possible += weights.compensation;
        earned += compensation_points(trial, preferred, weights);
    }

    if possible <= 0.0 {
        return 0.0;
    }

    (earned / possible).clamp(0.0, 1.0)
}

/// Any profile condition and trial condition contain one another (case-insensitive)
#[inline]
fn conditions_overlap(profile_conditions: &[String], trial_conditions: &[String]) -> bool {
    let wanted: Vec<String> = profile_conditions.iter().map(|c| c.to_lowercase()).collect();

    trial_conditions.iter().any(|trial_condition| {
        let trial_condition = trial_condition.to_lowercase();
        wanted.iter().any(|condition| {
            trial_condition.contains(condition.as_str()) || condition.contains(trial_condition.as_str())
        })
    })
}

/// "All", "Both" or the profile's gender as a substring
#[inline]
fn gender_eligible(trial_gender: &str, profile_gender: &str) -> bool {
    let trial_gender = trial_gender.to_lowercase();
    trial_gender == "all"
        || trial_gender.contains("both")
        || trial_gender.contains(&profile_gender.to_lowercase())
}

#[inline]
fn age_eligible(trial: &Trial, age: u32) -> bool {
    let (min, max) = trial.age_range.bounds();
    let age = i64::from(age);
    age >= min && age <= max
}

/// Proximity points: a floor for any in-range site, scaling up as distance shrinks
#[inline]
fn proximity_points(distance: f64, max_travel_distance: u32, weights: &ScoringWeights) -> f64 {
    let max = f64::from(max_travel_distance);
    if distance > max {
        return 0.0;
    }
    if max <= 0.0 {
        // Only a zero distance is within a zero travel range
        return weights.proximity;
    }

    let scaled = weights.proximity * (1.0 - distance / max);
    scaled.max(weights.proximity_floor).min(weights.proximity)
}

#[inline]
fn compensation_points(trial: &Trial, preferred: f64, weights: &ScoringWeights) -> f64 {
    let Some(compensation) = trial.compensation.as_ref() else {
        return 0.0;
    };
    let amount = compensation.amount.filter(|a| a.is_finite()).unwrap_or(0.0).max(0.0);

    if compensation.has_compensation && amount >= preferred {
        return weights.compensation;
    }

    (weights.compensation * amount / preferred).min(weights.compensation_partial_cap)
}
