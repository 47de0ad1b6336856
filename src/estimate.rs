//! Trip emissions, fuel volume and GHG classification for a resolved vehicle.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::data::model::VehicleRecord;

/// Kilometres per statute mile.
pub const KM_PER_MILE: f64 = 1.60934;
/// `235.21 / mpg` converts US miles-per-gallon to litres per 100 km.
pub const MPG_TO_L_PER_100KM: f64 = 235.21;
/// Shortest trip the calculator accepts, in kilometres.
pub const MIN_DISTANCE_KM: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimateError {
    #[error("trip distance must be a number of at least 1 km, got {0}")]
    InvalidDistance(f64),
}

// ---------------------------------------------------------------------------
// TripDistance – validated at the boundary
// ---------------------------------------------------------------------------

/// A trip length in kilometres, at least [`MIN_DISTANCE_KM`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct TripDistance(f64);

impl TripDistance {
    pub fn new(km: f64) -> Result<Self, EstimateError> {
        if km.is_finite() && km >= MIN_DISTANCE_KM {
            Ok(Self(km))
        } else {
            Err(EstimateError::InvalidDistance(km))
        }
    }

    /// Clamp user input into range; non-finite input becomes the minimum.
    pub fn clamped(km: f64) -> Self {
        if km.is_finite() {
            Self(km.max(MIN_DISTANCE_KM))
        } else {
            Self(MIN_DISTANCE_KM)
        }
    }

    pub fn km(self) -> f64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// GHG bucket
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhgBucket {
    High,
    Medium,
    Low,
    Unavailable,
}

impl GhgBucket {
    /// `>= 8` high, `5..8` medium, `< 5` low. Missing or non-positive scores
    /// are unavailable.
    pub fn classify(score: Option<f64>) -> Self {
        match score {
            Some(s) if s.is_finite() && s > 0.0 => {
                if s >= 8.0 {
                    GhgBucket::High
                } else if s >= 5.0 {
                    GhgBucket::Medium
                } else {
                    GhgBucket::Low
                }
            }
            _ => GhgBucket::Unavailable,
        }
    }
}

impl fmt::Display for GhgBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GhgBucket::High => "high",
            GhgBucket::Medium => "medium",
            GhgBucket::Low => "low",
            GhgBucket::Unavailable => "unavailable",
        })
    }
}

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

/// Which derived figure a record could not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Metric {
    Co2,
    Fuel,
    Ghg,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimationResult {
    pub distance_km: f64,
    pub co2_g_per_km: Option<f64>,
    pub co2_kg: Option<f64>,
    pub liters_per_100km: Option<f64>,
    pub fuel_liters: Option<f64>,
    pub ghg_bucket: GhgBucket,
}

impl EstimationResult {
    /// Metrics reported as unavailable.
    pub fn missing_metrics(&self) -> Vec<Metric> {
        let mut missing = Vec::new();
        if self.co2_kg.is_none() {
            missing.push(Metric::Co2);
        }
        if self.fuel_liters.is_none() {
            missing.push(Metric::Fuel);
        }
        if self.ghg_bucket == GhgBucket::Unavailable {
            missing.push(Metric::Ghg);
        }
        missing
    }
}

/// A metric as the estimator uses it: missing, non-finite and non-positive
/// figures are all unavailable.
pub fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Grams per kilometre from grams per mile.
pub fn co2_per_km(co2_per_mile: f64) -> f64 {
    co2_per_mile / KM_PER_MILE
}

/// Total trip emissions in kilograms.
pub fn co2_kg(co2_per_mile: f64, distance: TripDistance) -> f64 {
    co2_per_km(co2_per_mile) * distance.km() / 1000.0
}

pub fn liters_per_100km(mpg: f64) -> f64 {
    MPG_TO_L_PER_100KM / mpg
}

pub fn fuel_liters(mpg: f64, distance: TripDistance) -> f64 {
    liters_per_100km(mpg) * distance.km() / 100.0
}

/// Derive every metric the record supports for a trip of `distance`.
pub fn estimate(record: &VehicleRecord, distance: TripDistance) -> EstimationResult {
    let co2 = positive(record.co2_tailpipe_gpm);
    let mpg = positive(record.combined_mpg);

    let result = EstimationResult {
        distance_km: distance.km(),
        co2_g_per_km: co2.map(co2_per_km),
        co2_kg: co2.map(|g| co2_kg(g, distance)),
        liters_per_100km: mpg.map(liters_per_100km),
        fuel_liters: mpg.map(|m| fuel_liters(m, distance)),
        ghg_bucket: GhgBucket::classify(record.ghg_score),
    };

    let missing = result.missing_metrics();
    if !missing.is_empty() {
        log::debug!("{}: unavailable metrics {missing:?}", record.summary());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    fn vehicle(co2: Option<f64>, mpg: Option<f64>, ghg: Option<f64>) -> VehicleRecord {
        VehicleRecord {
            co2_tailpipe_gpm: co2,
            combined_mpg: mpg,
            ghg_score: ghg,
            ..VehicleRecord::new("Toyota", "Petrol", "Corolla")
        }
    }

    fn km(d: f64) -> TripDistance {
        TripDistance::new(d).unwrap()
    }

    #[test]
    fn co2_for_300_g_per_mile_over_100_km() {
        let result = estimate(&vehicle(Some(300.0), None, None), km(100.0));
        let co2 = result.co2_kg.unwrap();
        assert!(close(co2, 18.64, 0.005), "got {co2}");
        assert_eq!(co2, (300.0 / 1.60934 * 100.0) / 1000.0);
        assert!(close(result.co2_g_per_km.unwrap(), 186.41, 0.01));
    }

    #[test]
    fn fuel_for_30_mpg_over_100_km() {
        let result = estimate(&vehicle(Some(300.0), Some(30.0), None), km(100.0));
        assert!(close(result.liters_per_100km.unwrap(), 7.840, 0.001));
        assert!(close(result.fuel_liters.unwrap(), 7.84, 0.005));
    }

    #[test]
    fn zero_co2_is_unavailable_not_zero() {
        let result = estimate(&vehicle(Some(0.0), Some(120.0), Some(10.0)), km(50.0));
        assert_eq!(result.co2_kg, None);
        assert_eq!(result.co2_g_per_km, None);
        // Other metrics are still computed.
        assert!(result.fuel_liters.is_some());
        assert_eq!(result.ghg_bucket, GhgBucket::High);
        assert_eq!(result.missing_metrics(), vec![Metric::Co2]);
    }

    #[test]
    fn only_positive_finite_metrics_are_usable() {
        assert_eq!(positive(Some(250.0)), Some(250.0));
        assert_eq!(positive(Some(0.0)), None);
        assert_eq!(positive(Some(-1.0)), None);
        assert_eq!(positive(Some(f64::NAN)), None);
        assert_eq!(positive(None), None);
    }

    #[test]
    fn missing_inputs_mark_each_metric() {
        let result = estimate(&vehicle(None, Some(-3.0), None), km(10.0));
        assert_eq!(result.missing_metrics(), vec![Metric::Co2, Metric::Fuel, Metric::Ghg]);
    }

    #[test]
    fn ghg_bucket_boundaries() {
        assert_eq!(GhgBucket::classify(Some(8.0)), GhgBucket::High);
        assert_eq!(GhgBucket::classify(Some(10.0)), GhgBucket::High);
        assert_eq!(GhgBucket::classify(Some(7.99)), GhgBucket::Medium);
        assert_eq!(GhgBucket::classify(Some(5.0)), GhgBucket::Medium);
        assert_eq!(GhgBucket::classify(Some(4.0)), GhgBucket::Low);
        assert_eq!(GhgBucket::classify(Some(1.0)), GhgBucket::Low);
        assert_eq!(GhgBucket::classify(Some(0.0)), GhgBucket::Unavailable);
        assert_eq!(GhgBucket::classify(Some(-1.0)), GhgBucket::Unavailable);
        assert_eq!(GhgBucket::classify(None), GhgBucket::Unavailable);
    }

    #[test]
    fn distance_is_validated_at_the_boundary() {
        assert!(TripDistance::new(1.0).is_ok());
        assert_eq!(TripDistance::new(0.0), Err(EstimateError::InvalidDistance(0.0)));
        assert!(TripDistance::new(-5.0).is_err());
        assert!(TripDistance::new(0.5).is_err());
        assert!(TripDistance::new(f64::NAN).is_err());
        assert_eq!(TripDistance::clamped(-20.0).km(), 1.0);
        assert_eq!(TripDistance::clamped(f64::INFINITY).km(), 1.0);
        assert_eq!(TripDistance::clamped(42.5).km(), 42.5);
    }

    #[test]
    fn emissions_scale_linearly_with_distance() {
        let car = vehicle(Some(250.0), Some(40.0), Some(6.0));
        let short = estimate(&car, km(10.0));
        let long = estimate(&car, km(20.0));
        assert!(close(long.co2_kg.unwrap(), 2.0 * short.co2_kg.unwrap(), 1e-12));
        assert!(close(long.fuel_liters.unwrap(), 2.0 * short.fuel_liters.unwrap(), 1e-12));
        assert_eq!(short.ghg_bucket, GhgBucket::Medium);
    }
}
