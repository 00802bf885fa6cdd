use std::cmp::Ordering;

use crate::core::{allergy::filter_allergens, scoring::calculate_match_score};
use crate::models::{ScoringWeights, Trial, UserProfile};

/// Ranking pipeline - allergy filter, scoring, then a stable descending sort
///
/// # Pipeline Stages
/// 1. Allergy filtering
/// 2. Scoring (each survivor is copied with its `match_score` set)
/// 3. Stable sort by score, highest first; equal scores keep input order
#[derive(Debug, Clone)]
pub struct Ranker {
    weights: ScoringWeights,
}

impl Ranker {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn with_default_weights() -> Self {
        Self {
            weights: ScoringWeights::default(),
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Rank trials for a profile
    ///
    /// The input slice and its trials are left untouched; the returned list
    /// holds scored copies.
    pub fn rank(&self, trials: &[Trial], profile: &UserProfile) -> Vec<Trial> {
        let mut ranked: Vec<Trial> = filter_allergens(trials, &profile.allergies)
            .into_iter()
            .map(|trial| {
                let score = calculate_match_score(profile, trial, &self.weights);
                trial.with_match_score(score)
            })
            .collect();

        // `sort_by` is stable
        ranked.sort_by(|a, b| {
            b.match_score
                .partial_cmp(&a.match_score)
                .unwrap_or(Ordering::Equal)
        });

        tracing::debug!("Ranked {} of {} trials", ranked.len(), trials.len());

        ranked
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self::with_default_weights()
    }
}
