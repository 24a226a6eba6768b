//! Capacity-tranche costs: labor, capital and building scale with the number of
//! coating lines needed, then spread over the area produced that year.

use serde::{Deserialize, Serialize};

use crate::{check_non_negative, check_positive, CostError, CostResult, INFLATION_2015_TO_2022};

/// One roll-to-roll coating line and the plant it sits in.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LineParameters {
    pub line_speed_cm_per_min: f64,
    pub web_width_cm: f64,
    pub hours_per_day: f64,
    pub days_per_year: f64,
    pub utilisation: f64,
    pub workers_per_line: f64,
    /// Eurostat hourly labour cost.
    pub labor_eur_per_hour: f64,
    pub capital_eur_per_line: f64,
    pub amortisation_years: f64,
    pub floor_space_eur_per_m2: f64,
    pub footprint_m2_per_line: f64,
}

impl Default for LineParameters {
    fn default() -> Self {
        Self {
            line_speed_cm_per_min: 50.0,
            web_width_cm: 109.0,
            hours_per_day: 16.0,
            days_per_year: 250.0,
            utilisation: 0.9,
            workers_per_line: 2.0,
            labor_eur_per_hour: 29.1,
            capital_eur_per_line: 1_000_000.0 * INFLATION_2015_TO_2022,
            amortisation_years: 15.0,
            floor_space_eur_per_m2: 81.63,
            footprint_m2_per_line: 88.2,
        }
    }
}

/// Per-m2 costs of the lines needed for one production volume.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrancheCosts {
    pub lines: u32,
    pub labor: f64,
    pub capital: f64,
    pub building: f64,
}

/// Lines needed to coat `required_area_m2` per year; never fewer than one.
pub fn lines_required(required_area_m2: f64, capacity_m2_per_year: f64) -> u32 {
    ((required_area_m2 / capacity_m2_per_year).ceil() as u32).max(1)
}

impl LineParameters {
    pub fn validate(&self) -> CostResult<()> {
        check_positive("line speed", self.line_speed_cm_per_min)?;
        check_positive("web width", self.web_width_cm)?;
        check_positive("hours per day", self.hours_per_day)?;
        check_positive("days per year", self.days_per_year)?;
        check_positive("utilisation", self.utilisation)?;
        check_positive("amortisation period", self.amortisation_years)?;
        check_non_negative("workers per line", self.workers_per_line)?;
        check_non_negative("labor rate", self.labor_eur_per_hour)?;
        check_non_negative("capital per line", self.capital_eur_per_line)?;
        check_non_negative("floor space cost", self.floor_space_eur_per_m2)?;
        check_non_negative("plant footprint", self.footprint_m2_per_line)?;
        Ok(())
    }

    /// Coated area one line delivers per year (m2).
    pub fn capacity_m2_per_year(&self) -> f64 {
        self.line_speed_cm_per_min
            * self.web_width_cm
            * 60.0
            * self.hours_per_day
            * 1e-4
            * self.days_per_year
            * self.utilisation
    }

    pub fn labor_eur_per_line_year(&self) -> f64 {
        self.workers_per_line * self.labor_eur_per_hour * self.hours_per_day * self.days_per_year
    }

    pub fn capital_eur_per_line_year(&self) -> f64 {
        self.capital_eur_per_line / self.amortisation_years
    }

    pub fn building_eur_per_line(&self) -> f64 {
        self.floor_space_eur_per_m2 * self.footprint_m2_per_line
    }

    pub fn costs_per_m2(&self, required_area_m2: f64) -> CostResult<TrancheCosts> {
        if !required_area_m2.is_finite() || required_area_m2 <= 0.0 {
            return Err(CostError::InvalidParameter(format!(
                "required area must be positive and finite, got {required_area_m2}"
            )));
        }
        let lines = lines_required(required_area_m2, self.capacity_m2_per_year());
        let n = lines as f64;
        Ok(TrancheCosts {
            lines,
            labor: n * self.labor_eur_per_line_year() / required_area_m2,
            capital: n * self.capital_eur_per_line_year() / required_area_m2,
            building: n * self.building_eur_per_line() / required_area_m2,
        })
    }
}
