//! Piecewise-linear membrane price as a function of annual production volume.
//!
//! Each breakpoint opens a segment that runs until the next breakpoint. A volume that
//! lands exactly on a breakpoint takes the breakpoint's listed cost; anything strictly
//! inside a segment is read off the segment's line. Volumes outside the table are errors.

use serde::{Deserialize, Serialize};

use crate::{check_volume, CostError, CostResult};

/// Lowest membrane price in the reference table (EUR/m2).
pub const MEMBRANE_MIN_EUR_PER_M2: f64 = 159.81;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Breakpoint {
    pub units_per_year: f64,
    pub cost_eur_per_m2: f64,
    /// Cost change per extra unit/year until the next breakpoint.
    pub slope: f64,
}

impl Breakpoint {
    pub const fn new(units_per_year: f64, cost_eur_per_m2: f64, slope: f64) -> Self {
        Self {
            units_per_year,
            cost_eur_per_m2,
            slope,
        }
    }

    fn line_at(&self, units_per_year: f64) -> f64 {
        self.slope * units_per_year + (self.cost_eur_per_m2 - self.slope * self.units_per_year)
    }
}

/// Reference price table, scaled from the small-batch membrane price `cost_max`.
pub fn reference_breakpoints(cost_max: f64) -> Vec<Breakpoint> {
    vec![
        Breakpoint::new(10.0, cost_max, -0.710266667),
        Breakpoint::new(100.0, 0.8 * cost_max, -0.050507852),
        Breakpoint::new(1000.0, 0.822222222 * 0.8 * cost_max, -0.002579389),
        Breakpoint::new(20000.0, 0.822222222 * 0.8 * 0.766891892 * cost_max, 0.0),
    ]
}

#[derive(Clone, Debug, PartialEq)]
pub struct MembraneCurve {
    breakpoints: Vec<Breakpoint>,
}

impl MembraneCurve {
    pub fn new(breakpoints: Vec<Breakpoint>) -> CostResult<Self> {
        if breakpoints.is_empty() {
            return Err(CostError::EmptyBreakpoints);
        }
        for (index, bp) in breakpoints.iter().enumerate() {
            let finite = bp.units_per_year.is_finite()
                && bp.cost_eur_per_m2.is_finite()
                && bp.slope.is_finite();
            if !finite || bp.units_per_year <= 0.0 {
                return Err(CostError::InvalidParameter(format!(
                    "membrane breakpoint {index} is not a positive finite volume with finite cost"
                )));
            }
            if index > 0 && bp.units_per_year <= breakpoints[index - 1].units_per_year {
                return Err(CostError::UnsortedBreakpoints {
                    index,
                    units_per_year: bp.units_per_year,
                });
            }
        }
        Ok(Self { breakpoints })
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    /// Lowest and highest volume the table prices.
    pub fn span(&self) -> (f64, f64) {
        let first = self.breakpoints[0].units_per_year;
        let last = self.breakpoints[self.breakpoints.len() - 1].units_per_year;
        (first, last)
    }

    pub fn check_coverage(&self, first: f64, last: f64) -> CostResult<()> {
        let (min, max) = self.span();
        for units_per_year in [first, last] {
            if units_per_year < min || units_per_year > max {
                return Err(CostError::UncoveredVolume {
                    units_per_year,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }

    pub fn cost_at(&self, units_per_year: f64) -> CostResult<f64> {
        let v = check_volume(units_per_year)?;
        let (min, max) = self.span();
        let uncovered = CostError::UncoveredVolume {
            units_per_year: v,
            min,
            max,
        };

        // Number of breakpoints at or below v; the last of them opens v's segment.
        let idx = self.breakpoints.partition_point(|bp| bp.units_per_year <= v);
        if idx == 0 {
            return Err(uncovered);
        }
        let bp = &self.breakpoints[idx - 1];
        if bp.units_per_year == v {
            return Ok(bp.cost_eur_per_m2);
        }
        if idx == self.breakpoints.len() {
            return Err(uncovered);
        }
        Ok(bp.line_at(v))
    }
}
