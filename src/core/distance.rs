use crate::models::{GeoPoint, Trial};

/// Earth's radius in miles
const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Calculate the Haversine distance between two points in miles
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in miles, rounded to one decimal place
#[inline]
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    (EARTH_RADIUS_MILES * c * 10.0).round() / 10.0
}

/// Distance from the user to the trial's nearest site, if known
///
/// Resolution order: the trial-level distance, the smallest per-site
/// distance, then haversine from `origin` to sites that carry coordinates.
pub fn nearest_site_distance(trial: &Trial, origin: Option<GeoPoint>) -> Option<f64> {
    if let Some(distance) = trial.distance.filter(|d| d.is_finite()) {
        return Some(distance);
    }

    let precomputed = trial
        .locations
        .iter()
        .filter_map(|loc| loc.distance)
        .filter(|d| d.is_finite())
        .reduce(f64::min);
    if precomputed.is_some() {
        return precomputed;
    }

    let origin = origin?;
    trial
        .locations
        .iter()
        .filter_map(|loc| loc.coordinates())
        .map(|site| haversine_miles(origin.latitude, origin.longitude, site.latitude, site.longitude))
        .reduce(f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrialLocation;

    fn site(distance: Option<f64>, coords: Option<(f64, f64)>) -> TrialLocation {
        TrialLocation {
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            distance,
            ..Default::default()
        }
    }

    #[test]
    fn test_haversine_miles() {
        // San Francisco to Los Angeles is roughly 347 miles
        let distance = haversine_miles(37.7749, -122.4194, 34.0522, -118.2437);
        assert!((distance - 347.0).abs() < 5.0, "Distance should be ~347mi, got {}", distance);

        assert_eq!(haversine_miles(42.3601, -71.0589, 42.3601, -71.0589), 0.0);
    }

    #[test]
    fn test_trial_level_distance_wins() {
        let trial = Trial {
            distance: Some(12.5),
            locations: vec![site(Some(3.0), None)],
            ..Default::default()
        };

        assert_eq!(nearest_site_distance(&trial, None), Some(12.5));
    }

    #[test]
    fn test_minimum_site_distance() {
        let trial = Trial {
            locations: vec![site(Some(30.0), None), site(None, None), site(Some(8.2), None)],
            ..Default::default()
        };

        assert_eq!(nearest_site_distance(&trial, None), Some(8.2));
    }

    #[test]
    fn test_haversine_fallback_needs_origin() {
        let trial = Trial {
            locations: vec![site(None, Some((37.7799, -121.9780)))],
            ..Default::default()
        };

        assert_eq!(nearest_site_distance(&trial, None), None);

        let origin = GeoPoint { latitude: 37.7749, longitude: -122.4194 };
        let distance = nearest_site_distance(&trial, Some(origin)).unwrap();
        assert!(distance > 20.0 && distance < 30.0);
    }

    #[test]
    fn test_no_distance_information() {
        let trial = Trial {
            locations: vec![site(None, None)],
            ..Default::default()
        };

        assert_eq!(nearest_site_distance(&trial, None), None);
    }
}
