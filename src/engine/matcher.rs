use crate::geo::haversine_miles;
use crate::models::driver::DriverProfile;
use crate::models::preference::CarrierPreference;

/// Applies the carrier's hard constraints as an AND-conjunction. The
/// returned iterator is lazy and restartable, so callers can cap evaluation
/// cost on large pools or abandon a scan mid-way at no cost.
pub fn filter<'a, I>(pool: I, pref: &'a CarrierPreference) -> impl Iterator<Item = DriverProfile> + 'a
where
    I: Iterator<Item = DriverProfile> + 'a,
{
    pool.filter(move |driver| passes_hard_constraints(driver, pref))
}

/// Pure function of profile + preference, no side effects.
pub fn passes_hard_constraints(driver: &DriverProfile, pref: &CarrierPreference) -> bool {
    let hard = &pref.hard;

    if hard.require_available && !driver.available {
        return false;
    }

    if let Some(required) = hard.required_cdl_class {
        if driver.cdl_class < required {
            return false;
        }
    }

    if !hard
        .required_equipment
        .iter()
        .all(|eq| driver.equipment.contains(eq))
    {
        return false;
    }

    if let Some(max) = hard.max_violation_class {
        if driver.violation_class > max {
            return false;
        }
    }

    if let Some(max) = hard.max_violation_count {
        if driver.violation_count > max {
            return false;
        }
    }

    if let Some(min) = hard.min_experience_years {
        if driver.years_experience < min {
            return false;
        }
    }

    if hard.enforce_radius {
        let distance = haversine_miles(&driver.location, &pref.base);
        if distance > pref.radius_miles {
            return false;
        }
    }

    true
}
