use crate::models::{Baseline, EntryRequest, EntryType, Equivalents};

/// lbs CO₂ per mile driven.
pub const EF_MILE: f64 = 0.9;
/// lbs CO₂ per minute of hot shower.
pub const EF_SHOWER_MINUTE: f64 = 0.05;
/// lbs CO₂ per single-use plastic bottle.
pub const EF_BOTTLE: f64 = 0.1;
/// lbs CO₂ per takeout meal (packaging and delivery).
pub const EF_TAKEOUT_MEAL: f64 = 2.0;
/// lbs CO₂ per laundry load (wash and dry).
pub const EF_LAUNDRY_LOAD: f64 = 2.4;

/// lbs CO₂ one tree sequesters in a year.
const TREE_LBS_PER_YEAR: f64 = 48.0;

/// Habit values for one submission, independent of how they were submitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct HabitValues {
    pub miles: f64,
    pub shower_minutes: f64,
    pub plastic_bottles: f64,
    pub takeout_meals: f64,
    pub laundry_loads: f64,
}

impl From<&EntryRequest> for HabitValues {
    fn from(request: &EntryRequest) -> Self {
        Self {
            miles: request.miles,
            shower_minutes: request.shower_minutes,
            plastic_bottles: request.plastic_bottles,
            takeout_meals: request.takeout_meals,
            laundry_loads: request.laundry_loads,
        }
    }
}

/// Estimated lbs of CO₂ saved against `baseline`.
///
/// Each category contributes `max(baseline - value, 0) * factor`, so using more
/// than the baseline never produces a negative figure. Weekly entries also count
/// takeout and laundry; laundry is scaled to a daily equivalent.
pub fn compute_savings(entry_type: EntryType, values: &HabitValues, baseline: &Baseline) -> f64 {
    let mut saved = reduction(baseline.miles, values.miles) * EF_MILE
        + reduction(baseline.shower_minutes, values.shower_minutes) * EF_SHOWER_MINUTE
        + reduction(baseline.plastic_bottles, values.plastic_bottles) * EF_BOTTLE;

    if entry_type == EntryType::Weekly {
        saved += reduction(baseline.takeout_meals, values.takeout_meals) * EF_TAKEOUT_MEAL;
        saved += reduction(baseline.laundry_loads, values.laundry_loads) * EF_LAUNDRY_LOAD / 7.0;
    }

    saved
}

pub fn equivalents(co2_lbs: f64) -> Equivalents {
    if co2_lbs <= 0.0 {
        return Equivalents {
            trees: 0.0,
            car_miles: 0.0,
            plastic_bottles: 0.0,
        };
    }

    Equivalents {
        trees: co2_lbs / TREE_LBS_PER_YEAR,
        car_miles: co2_lbs / EF_MILE,
        plastic_bottles: co2_lbs / EF_BOTTLE,
    }
}

fn reduction(baseline: f64, value: f64) -> f64 {
    (baseline - value).max(0.0)
}
