use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::geo::haversine_miles;
use crate::models::driver::{DriverProfile, PayRange};
use crate::models::preference::CarrierPreference;
use crate::models::score::{FactorScore, MatchScore, ScoreBreakdown};

/// Neutral score when every soft weight is zero.
const NEUTRAL_SCORE: f64 = 50.0;

/// Pure and deterministic: identical inputs always yield an identical score
/// and breakdown.
pub fn compute_score(
    driver: &DriverProfile,
    pref: &CarrierPreference,
    cfg: &EngineConfig,
    now: DateTime<Utc>,
) -> MatchScore {
    let breakdown = ScoreBreakdown {
        location: FactorScore {
            subscore: location_score(driver, pref),
            weight: pref.weights.location,
        },
        experience: FactorScore {
            subscore: experience_score(driver.years_experience, pref.target_experience_years),
            weight: pref.weights.experience,
        },
        pay: FactorScore {
            subscore: pay_score(&driver.desired_pay, &pref.offered_pay),
            weight: pref.weights.pay,
        },
        home_time: FactorScore {
            subscore: home_time_score(driver, pref, cfg.partial_home_time_credit),
            weight: pref.weights.home_time,
        },
    };

    let score = weighted_total(&breakdown);
    let rationale = rationale(&breakdown);

    MatchScore {
        carrier_id: pref.carrier_id,
        driver_id: driver.id,
        preference_version: pref.version,
        score,
        breakdown,
        rationale,
        computed_at: now,
    }
}

/// Weights are renormalized, so a single non-zero weight still yields a
/// score in [0,100].
pub fn weighted_total(breakdown: &ScoreBreakdown) -> f64 {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;

    for factor in breakdown.factors() {
        if factor.weight > 0.0 {
            weighted += factor.subscore * factor.weight;
            total_weight += factor.weight;
        }
    }

    if total_weight <= 0.0 {
        return NEUTRAL_SCORE;
    }

    100.0 * weighted / total_weight
}

/// Soft fallback when the radius is advisory; with an enforced radius the
/// matcher has already excluded anyone who would floor at zero.
fn location_score(driver: &DriverProfile, pref: &CarrierPreference) -> f64 {
    if pref.radius_miles <= 0.0 {
        return 0.0;
    }
    let distance = haversine_miles(&driver.location, &pref.base);
    (1.0 - distance / pref.radius_miles).max(0.0)
}

/// Saturating ramp toward the target; exceeding it does not penalize.
fn experience_score(years: u32, target: u32) -> f64 {
    if target == 0 {
        return 1.0;
    }
    (years as f64 / target as f64).min(1.0)
}

fn pay_score(desired: &PayRange, offered: &PayRange) -> f64 {
    let desired_mid = desired.midpoint();
    let offered_mid = offered.midpoint();
    let denom = desired_mid.max(offered_mid);
    if denom <= 0.0 {
        return 1.0;
    }
    (1.0 - (desired_mid - offered_mid).abs() / denom).max(0.0)
}

fn home_time_score(driver: &DriverProfile, pref: &CarrierPreference, partial: f64) -> f64 {
    if driver.home_time == pref.home_time {
        1.0
    } else if driver.home_time.is_compatible_with(pref.home_time) {
        partial
    } else {
        0.0
    }
}

/// Human-readable explanation derived purely from the breakdown. Only
/// factors the carrier actually weighted are mentioned.
fn rationale(breakdown: &ScoreBreakdown) -> Vec<String> {
    let mut notes = Vec::new();

    if breakdown.pay.weight > 0.0 {
        if breakdown.pay.subscore >= 0.9 {
            notes.push("Pay expectations line up with the offered range.".to_string());
        } else if breakdown.pay.subscore < 0.4 {
            notes.push("Offered pay is far from the driver's desired range.".to_string());
        }
    }

    if breakdown.location.weight > 0.0 {
        if breakdown.location.subscore >= 0.95 {
            notes.push("Driver is based in the immediate service area.".to_string());
        } else if breakdown.location.subscore >= 0.7 {
            notes.push("Driver is within comfortable commuting range.".to_string());
        }
    }

    if breakdown.experience.weight > 0.0 && breakdown.experience.subscore >= 1.0 {
        notes.push("Meets the target experience level.".to_string());
    }

    if breakdown.home_time.weight > 0.0 && breakdown.home_time.subscore >= 1.0 {
        notes.push("Home-time preference matches exactly.".to_string());
    }

    notes
}

/// Total order: score descending, then experience descending, then driver id
/// ascending. No nondeterministic tie survival across repeated calls.
pub fn rank_matches(mut scored: Vec<(DriverProfile, MatchScore)>) -> Vec<(DriverProfile, MatchScore)> {
    scored.sort_by(|a, b| {
        b.1.score
            .total_cmp(&a.1.score)
            .then_with(|| b.0.years_experience.cmp(&a.0.years_experience))
            .then_with(|| a.0.id.cmp(&b.0.id))
    });
    scored
}
