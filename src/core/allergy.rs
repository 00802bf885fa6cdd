use crate::models::Trial;

/// Drop trials that disclose a substance or criterion matching a declared allergen
///
/// Matching is a substring heuristic, not clinical ingredient matching:
/// - a substance is unsafe when its lower-cased name contains an allergen
///   ("peanut" catches "Peanut Extract", "peanuts" does not);
/// - eligibility text is unsafe when it contains "allergy to <allergen>" or
///   "allergic to <allergen>".
///
/// Survivors keep their input order. Trials are borrowed, never modified.
pub fn filter_allergens<'a>(trials: &'a [Trial], allergies: &[String]) -> Vec<&'a Trial> {
    let allergens = normalize_allergens(allergies);
    if allergens.is_empty() {
        return trials.iter().collect();
    }

    let kept: Vec<&Trial> = trials
        .iter()
        .filter(|trial| !contains_allergen(trial, &allergens))
        .collect();

    tracing::debug!(
        "Allergy filter kept {} of {} trials ({} allergens)",
        kept.len(),
        trials.len(),
        allergens.len()
    );

    kept
}

/// Lower-cased, trimmed allergens; blank entries are dropped
fn normalize_allergens(allergies: &[String]) -> Vec<String> {
    allergies
        .iter()
        .map(|a| a.trim().to_lowercase())
        .filter(|a| !a.is_empty())
        .collect()
}

#[inline]
fn contains_allergen(trial: &Trial, allergens: &[String]) -> bool {
    let substance_names: Vec<String> = trial
        .substances_used
        .iter()
        .map(|s| s.name.to_lowercase())
        .collect();

    if substance_names
        .iter()
        .any(|name| allergens.iter().any(|allergen| name.contains(allergen.as_str())))
    {
        return true;
    }

    if trial.eligibility_criteria.is_empty() {
        return false;
    }

    let criteria = trial.eligibility_criteria.to_lowercase();
    allergens.iter().any(|allergen| {
        criteria.contains(&format!("allergy to {}", allergen))
            || criteria.contains(&format!("allergic to {}", allergen))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Substance;

    fn trial_with_substance(id: &str, name: &str) -> Trial {
        Trial {
            id: id.to_string(),
            substances_used: vec![Substance {
                kind: "Drug".to_string(),
                name: name.to_string(),
            }],
            ..Default::default()
        }
    }

    fn trial_with_criteria(id: &str, criteria: &str) -> Trial {
        Trial {
            id: id.to_string(),
            eligibility_criteria: criteria.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_allergies_keeps_everything() {
        let trials = vec![
            trial_with_substance("1", "Peanut Extract"),
            trial_with_criteria("2", "Known allergy to penicillin"),
        ];

        let kept = filter_allergens(&trials, &[]);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].id, "1");
        assert_eq!(kept[1].id, "2");
    }

    #[test]
    fn test_substance_substring_match() {
        let trials = vec![trial_with_substance("1", "Peanut Extract")];

        assert!(filter_allergens(&trials, &["peanut".to_string()]).is_empty());
        assert_eq!(filter_allergens(&trials, &["peanuts".to_string()]).len(), 1);
    }

    #[test]
    fn test_allergen_is_normalized() {
        let trials = vec![trial_with_substance("1", "Amoxicillin-Clavulanate")];

        let kept = filter_allergens(&trials, &["  AMOXICILLIN ".to_string()]);

        assert!(kept.is_empty());
    }

    #[test]
    fn test_blank_allergens_are_ignored() {
        let trials = vec![
            trial_with_substance("1", "Saline"),
            trial_with_criteria("2", "Known allergy to penicillin"),
            trial_with_substance("3", "Peanut Oil"),
        ];

        let ids: Vec<&str> = filter_allergens(&trials, &["peanut".to_string(), " ".to_string()])
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);

        let kept = filter_allergens(&trials, &["".to_string(), "  ".to_string()]);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_criteria_phrases() {
        let trials = vec![
            trial_with_criteria("1", "Exclusion: Allergy to Penicillin"),
            trial_with_criteria("2", "Patients allergic to latex are excluded"),
            trial_with_criteria("3", "Penicillin-naive participants"),
        ];

        let kept = filter_allergens(&trials, &["penicillin".to_string(), "latex".to_string()]);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "3");
    }

    #[test]
    fn test_missing_fields_pass_through() {
        let trials = vec![Trial {
            id: "bare".to_string(),
            ..Default::default()
        }];

        let kept = filter_allergens(&trials, &["peanut".to_string()]);

        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_order_preserved() {
        let trials = vec![
            trial_with_substance("a", "Saline"),
            trial_with_substance("b", "Peanut Oil"),
            trial_with_substance("c", "Insulin"),
            trial_with_substance("d", "Metformin"),
        ];

        let ids: Vec<&str> = filter_allergens(&trials, &["peanut".to_string()])
            .iter()
            .map(|t| t.id.as_str())
            .collect();

        assert_eq!(ids, vec!["a", "c", "d"]);
    }
}
