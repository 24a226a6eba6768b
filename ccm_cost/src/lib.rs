//! Production cost model for catalyst-coated membranes (CCMs) in electrolyzer stacks.

pub mod cell;
pub mod membrane;
pub mod tranche;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cell::{CellParameters, CellSpec};
pub use membrane::{reference_breakpoints, Breakpoint, MembraneCurve, MEMBRANE_MIN_EUR_PER_M2};
pub use tranche::{lines_required, LineParameters, TrancheCosts};

/// Adjusts 2015 USD figures to 2022 EUR (inflation and exchange rate).
pub const INFLATION_2015_TO_2022: f64 = 1.252 / 1.0554;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CostError {
    #[error("production volume must be positive and finite, got {0}")]
    InvalidVolume(f64),
    #[error("invalid production sweep: {0}")]
    InvalidSweep(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("membrane breakpoint table is empty")]
    EmptyBreakpoints,
    #[error("membrane breakpoints must be strictly ascending (breakpoint {index} at {units_per_year} units/year)")]
    UnsortedBreakpoints { index: usize, units_per_year: f64 },
    #[error("no membrane breakpoint segment covers {units_per_year} units/year (table spans {min}..={max})")]
    UncoveredVolume {
        units_per_year: f64,
        min: f64,
        max: f64,
    },
}

pub type CostResult<T> = Result<T, CostError>;

pub(crate) fn check_volume(units_per_year: f64) -> CostResult<f64> {
    if units_per_year.is_finite() && units_per_year > 0.0 {
        Ok(units_per_year)
    } else {
        Err(CostError::InvalidVolume(units_per_year))
    }
}

pub(crate) fn check_positive(name: &str, value: f64) -> CostResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(CostError::InvalidParameter(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

pub(crate) fn check_non_negative(name: &str, value: f64) -> CostResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(CostError::InvalidParameter(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}

/// Annual production volumes (units/year) the model is evaluated at.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductionSweep {
    pub start: u32,
    pub end: u32,
    pub step: u32,
}

impl Default for ProductionSweep {
    fn default() -> Self {
        Self {
            start: 10,
            end: 1500,
            step: 1,
        }
    }
}

impl ProductionSweep {
    pub fn new(start: u32, end: u32, step: u32) -> CostResult<Self> {
        let sweep = Self { start, end, step };
        sweep.validate()?;
        Ok(sweep)
    }

    pub fn validate(&self) -> CostResult<()> {
        if self.start == 0 {
            return Err(CostError::InvalidSweep(
                "sweep must start at 1 unit/year or more".into(),
            ));
        }
        if self.step == 0 {
            return Err(CostError::InvalidSweep("step must be at least 1".into()));
        }
        if self.start > self.end {
            return Err(CostError::InvalidSweep(format!(
                "start {} is past end {}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        if self.step == 0 || self.start > self.end {
            return 0;
        }
        ((self.end - self.start) / self.step) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first(&self) -> f64 {
        self.start as f64
    }

    /// Last sample actually visited, which is `end` only when the step divides the range.
    pub fn last(&self) -> f64 {
        let steps = self.len().saturating_sub(1) as u32;
        (self.start + steps * self.step) as f64
    }

    pub fn units(&self) -> Array1<f64> {
        if self.is_empty() {
            return Array1::zeros(0);
        }
        (self.start..=self.end)
            .step_by(self.step as usize)
            .map(|u| u as f64)
            .collect()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CostCategory {
    Membrane,
    CatalystIonomer,
    DirectLabor,
    Capital,
    Energy,
    Building,
    Maintenance,
}

impl CostCategory {
    /// Stacking order used by the breakdown charts.
    pub const ALL: [CostCategory; 7] = [
        CostCategory::Membrane,
        CostCategory::CatalystIonomer,
        CostCategory::DirectLabor,
        CostCategory::Capital,
        CostCategory::Energy,
        CostCategory::Building,
        CostCategory::Maintenance,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CostCategory::Membrane => "Membrane",
            CostCategory::CatalystIonomer => "Catalyst & Ionomer",
            CostCategory::DirectLabor => "Direct Labor",
            CostCategory::Capital => "Capital",
            CostCategory::Energy => "Energy",
            CostCategory::Building => "Building",
            CostCategory::Maintenance => "Maintenance",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            CostCategory::Membrane => "membrane",
            CostCategory::CatalystIonomer => "catalyst_ionomer",
            CostCategory::DirectLabor => "direct_labor",
            CostCategory::Capital => "capital",
            CostCategory::Energy => "energy",
            CostCategory::Building => "building",
            CostCategory::Maintenance => "maintenance",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum CostUnit {
    EurPerSquareMetre,
    EurPerKilowatt,
}

impl CostUnit {
    pub fn label(&self) -> &'static str {
        match self {
            CostUnit::EurPerSquareMetre => "EUR/m2",
            CostUnit::EurPerKilowatt => "EUR/kW",
        }
    }
}

/// Catalyst and ionomer loading. Prices are EUR/kg, loading is g/m2.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CatalystParameters {
    pub loading_g_per_m2: f64,
    pub nico2o4_eur_per_kg: f64,
    pub nife2o4_eur_per_kg: f64,
    pub ionomer_eur_per_kg: f64,
    /// Ionomer mass per unit catalyst mass.
    pub ionomer_to_catalyst: f64,
}

impl Default for CatalystParameters {
    fn default() -> Self {
        Self {
            // plevova2022, 10.1016/j.jpowsour.2022.231476
            loading_g_per_m2: 25.0,
            nico2o4_eur_per_kg: 1109.75 * 2.0,
            nife2o4_eur_per_kg: 731.91 * 2.0,
            ionomer_eur_per_kg: 2.90e3,
            ionomer_to_catalyst: 7.0 / 93.0,
        }
    }
}

impl CatalystParameters {
    pub fn validate(&self) -> CostResult<()> {
        check_non_negative("catalyst loading", self.loading_g_per_m2)?;
        check_non_negative("NiCo2O4 price", self.nico2o4_eur_per_kg)?;
        check_non_negative("NiFe2O4 price", self.nife2o4_eur_per_kg)?;
        check_non_negative("ionomer price", self.ionomer_eur_per_kg)?;
        check_non_negative("ionomer ratio", self.ionomer_to_catalyst)?;
        Ok(())
    }

    /// Both electrodes carry the loading, so the ionomer term sees twice the catalyst mass.
    pub fn cost_per_m2(&self) -> f64 {
        let loading_kg = self.loading_g_per_m2 * 1e-3;
        loading_kg * (self.nico2o4_eur_per_kg + self.nife2o4_eur_per_kg)
            + 2.0 * loading_kg * self.ionomer_to_catalyst * self.ionomer_eur_per_kg
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EnergyParameters {
    /// Consumption per m2 before dividing by the yearly volume (mayyas2019).
    pub kwh_per_m2: f64,
    pub eur_per_kwh: f64,
}

impl Default for EnergyParameters {
    fn default() -> Self {
        Self {
            kwh_per_m2: 227.0,
            eur_per_kwh: 9.97,
        }
    }
}

impl EnergyParameters {
    pub fn cost_at_unit_volume(&self) -> f64 {
        self.kwh_per_m2 * self.eur_per_kwh
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceParameters {
    pub eur_per_m2: f64,
    /// Maintained area as a multiple of one stack's cell area.
    pub stack_area_factor: f64,
    pub price_adjustment: f64,
}

impl Default for MaintenanceParameters {
    fn default() -> Self {
        Self {
            eur_per_m2: 22.5,
            stack_area_factor: 10.0,
            price_adjustment: INFLATION_2015_TO_2022,
        }
    }
}

impl MaintenanceParameters {
    pub fn validate(&self) -> CostResult<()> {
        check_positive("maintenance rate", self.eur_per_m2)?;
        check_positive("maintained stack area factor", self.stack_area_factor)?;
        check_positive("maintenance price adjustment", self.price_adjustment)?;
        Ok(())
    }

    /// Yearly maintenance budget in EUR for a stack of the given cell area.
    pub fn budget(&self, stack_area_m2: f64) -> f64 {
        self.eur_per_m2 * (stack_area_m2 * self.stack_area_factor) * self.price_adjustment
    }
}

/// The embedded parameter set. There is no file or flag that overrides it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CostParameters {
    pub cell: CellParameters,
    pub membrane: Vec<Breakpoint>,
    pub catalyst: CatalystParameters,
    pub line: LineParameters,
    pub energy: EnergyParameters,
    pub maintenance: MaintenanceParameters,
}

impl Default for CostParameters {
    fn default() -> Self {
        Self {
            cell: CellParameters::default(),
            membrane: reference_breakpoints(2.0 * MEMBRANE_MIN_EUR_PER_M2),
            catalyst: CatalystParameters::default(),
            line: LineParameters::default(),
            energy: EnergyParameters::default(),
            maintenance: MaintenanceParameters::default(),
        }
    }
}

/// Every category cost (EUR/m2) at one production volume.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CostBreakdown {
    pub units_per_year: f64,
    pub required_area_m2: f64,
    pub lines: u32,
    pub membrane: f64,
    pub catalyst_ionomer: f64,
    pub direct_labor: f64,
    pub capital: f64,
    pub energy: f64,
    pub building: f64,
    pub maintenance: f64,
}

impl CostBreakdown {
    pub fn get(&self, category: CostCategory) -> f64 {
        match category {
            CostCategory::Membrane => self.membrane,
            CostCategory::CatalystIonomer => self.catalyst_ionomer,
            CostCategory::DirectLabor => self.direct_labor,
            CostCategory::Capital => self.capital,
            CostCategory::Energy => self.energy,
            CostCategory::Building => self.building,
            CostCategory::Maintenance => self.maintenance,
        }
    }

    pub fn total(&self) -> f64 {
        CostCategory::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

/// Parameters validated once and ready to price any production volume.
#[derive(Clone, Debug)]
pub struct CostModel {
    params: CostParameters,
    cell: CellSpec,
    membrane: MembraneCurve,
}

impl CostModel {
    pub fn new(params: CostParameters) -> CostResult<Self> {
        let cell = CellSpec::new(&params.cell)?;
        let membrane = MembraneCurve::new(params.membrane.clone())?;
        params.catalyst.validate()?;
        params.line.validate()?;
        check_positive("energy consumption", params.energy.kwh_per_m2)?;
        check_positive("energy price", params.energy.eur_per_kwh)?;
        params.maintenance.validate()?;
        Ok(Self {
            params,
            cell,
            membrane,
        })
    }

    pub fn params(&self) -> &CostParameters {
        &self.params
    }

    pub fn cell(&self) -> &CellSpec {
        &self.cell
    }

    pub fn membrane(&self) -> &MembraneCurve {
        &self.membrane
    }

    /// CCM area needed per year to build `units_per_year` stacks.
    pub fn required_area(&self, units_per_year: f64) -> CostResult<f64> {
        Ok(check_volume(units_per_year)? * self.cell.stack_area_m2)
    }

    pub fn membrane_cost(&self, units_per_year: f64) -> CostResult<f64> {
        self.membrane.cost_at(units_per_year)
    }

    pub fn catalyst_cost(&self) -> f64 {
        self.params.catalyst.cost_per_m2()
    }

    pub fn tranche_costs(&self, units_per_year: f64) -> CostResult<TrancheCosts> {
        let area = self.required_area(units_per_year)?;
        self.params.line.costs_per_m2(area)
    }

    pub fn energy_cost(&self, units_per_year: f64) -> CostResult<f64> {
        Ok(self.params.energy.cost_at_unit_volume() / check_volume(units_per_year)?)
    }

    pub fn maintenance_cost(&self, units_per_year: f64) -> CostResult<f64> {
        let area = self.required_area(units_per_year)?;
        Ok(self.params.maintenance.budget(self.cell.stack_area_m2) / area)
    }

    pub fn breakdown(&self, units_per_year: f64) -> CostResult<CostBreakdown> {
        let required_area_m2 = self.required_area(units_per_year)?;
        let tranche = self.params.line.costs_per_m2(required_area_m2)?;
        Ok(CostBreakdown {
            units_per_year,
            required_area_m2,
            lines: tranche.lines,
            membrane: self.membrane_cost(units_per_year)?,
            catalyst_ionomer: self.catalyst_cost(),
            direct_labor: tranche.labor,
            capital: tranche.capital,
            energy: self.energy_cost(units_per_year)?,
            building: tranche.building,
            maintenance: self.maintenance_cost(units_per_year)?,
        })
    }

    /// Evaluate every category over the sweep. Fails before evaluating anything if the
    /// membrane table does not span the sweep.
    pub fn evaluate(&self, sweep: &ProductionSweep) -> CostResult<CostCurves> {
        sweep.validate()?;
        self.membrane.check_coverage(sweep.first(), sweep.last())?;

        let units = sweep.units();
        let n = units.len();
        let mut curves = CostCurves {
            unit: CostUnit::EurPerSquareMetre,
            units: units.clone(),
            required_area_m2: Array1::zeros(n),
            lines: Vec::with_capacity(n),
            membrane: Array1::zeros(n),
            catalyst_ionomer: Array1::zeros(n),
            direct_labor: Array1::zeros(n),
            capital: Array1::zeros(n),
            energy: Array1::zeros(n),
            building: Array1::zeros(n),
            maintenance: Array1::zeros(n),
            total: Array1::zeros(n),
            stack_area_per_kw: self.cell.stack_area_per_kw,
        };

        for (i, &volume) in units.iter().enumerate() {
            let row = self.breakdown(volume)?;
            curves.required_area_m2[i] = row.required_area_m2;
            curves.lines.push(row.lines);
            curves.membrane[i] = row.membrane;
            curves.catalyst_ionomer[i] = row.catalyst_ionomer;
            curves.direct_labor[i] = row.direct_labor;
            curves.capital[i] = row.capital;
            curves.energy[i] = row.energy;
            curves.building[i] = row.building;
            curves.maintenance[i] = row.maintenance;
        }
        curves.total = curves.sum_categories();
        Ok(curves)
    }
}

/// Build the model from `params` and evaluate it over `sweep`.
pub fn compute_cost_curves(
    params: &CostParameters,
    sweep: &ProductionSweep,
) -> CostResult<CostCurves> {
    CostModel::new(params.clone())?.evaluate(sweep)
}

/// Index-aligned cost curves; entry `i` of every array belongs to `units[i]`.
#[derive(Clone, Debug)]
pub struct CostCurves {
    pub unit: CostUnit,
    pub units: Array1<f64>,
    pub required_area_m2: Array1<f64>,
    pub lines: Vec<u32>,
    pub membrane: Array1<f64>,
    pub catalyst_ionomer: Array1<f64>,
    pub direct_labor: Array1<f64>,
    pub capital: Array1<f64>,
    pub energy: Array1<f64>,
    pub building: Array1<f64>,
    pub maintenance: Array1<f64>,
    pub total: Array1<f64>,
    pub stack_area_per_kw: f64,
}

impl CostCurves {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn category(&self, category: CostCategory) -> &Array1<f64> {
        match category {
            CostCategory::Membrane => &self.membrane,
            CostCategory::CatalystIonomer => &self.catalyst_ionomer,
            CostCategory::DirectLabor => &self.direct_labor,
            CostCategory::Capital => &self.capital,
            CostCategory::Energy => &self.energy,
            CostCategory::Building => &self.building,
            CostCategory::Maintenance => &self.maintenance,
        }
    }

    fn sum_categories(&self) -> Array1<f64> {
        let mut total: Array1<f64> = Array1::zeros(self.len());
        for category in CostCategory::ALL {
            total += self.category(category);
        }
        total
    }

    /// Running sums in `CostCategory::ALL` order. The last layer equals `total`.
    pub fn cumulative(&self) -> Vec<Array1<f64>> {
        let mut layers = Vec::with_capacity(CostCategory::ALL.len());
        let mut running: Array1<f64> = Array1::zeros(self.len());
        for category in CostCategory::ALL {
            running += self.category(category);
            layers.push(running.clone());
        }
        layers
    }

    /// Rescale EUR/m2 curves to EUR/kW using the stack's cell area per kW.
    pub fn per_kw(&self) -> CostCurves {
        if self.unit == CostUnit::EurPerKilowatt {
            return self.clone();
        }
        let k = self.stack_area_per_kw;
        CostCurves {
            unit: CostUnit::EurPerKilowatt,
            units: self.units.clone(),
            required_area_m2: self.required_area_m2.clone(),
            lines: self.lines.clone(),
            membrane: &self.membrane * k,
            catalyst_ionomer: &self.catalyst_ionomer * k,
            direct_labor: &self.direct_labor * k,
            capital: &self.capital * k,
            energy: &self.energy * k,
            building: &self.building * k,
            maintenance: &self.maintenance * k,
            total: &self.total * k,
            stack_area_per_kw: k,
        }
    }

    pub fn row(&self, index: usize) -> Option<CostBreakdown> {
        if index >= self.len() {
            return None;
        }
        Some(CostBreakdown {
            units_per_year: self.units[index],
            required_area_m2: self.required_area_m2[index],
            lines: self.lines[index],
            membrane: self.membrane[index],
            catalyst_ionomer: self.catalyst_ionomer[index],
            direct_labor: self.direct_labor[index],
            capital: self.capital[index],
            energy: self.energy[index],
            building: self.building[index],
            maintenance: self.maintenance[index],
        })
    }

    pub fn at(&self, units_per_year: f64) -> Option<CostBreakdown> {
        let index = self.units.iter().position(|&u| u == units_per_year)?;
        self.row(index)
    }

    pub fn rows(&self) -> impl Iterator<Item = CostBreakdown> + '_ {
        (0..self.len()).filter_map(move |i| self.row(i))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CategorySummary {
    pub category: CostCategory,
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub first: f64,
    pub last: f64,
}

/// Serializable snapshot of one model run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CostReport {
    pub cell: CellSpec,
    pub parameters: CostParameters,
    pub sweep: ProductionSweep,
    pub unit: CostUnit,
    pub categories: Vec<CategorySummary>,
    pub total_first: f64,
    pub total_last: f64,
    pub total_first_per_kw: f64,
    pub total_last_per_kw: f64,
    pub max_lines: u32,
}

impl CostReport {
    pub fn new(model: &CostModel, sweep: &ProductionSweep, curves: &CostCurves) -> Self {
        let first = |a: &Array1<f64>| a.first().copied().unwrap_or(0.0);
        let last = |a: &Array1<f64>| a.last().copied().unwrap_or(0.0);
        let categories = CostCategory::ALL
            .iter()
            .map(|&category| {
                let curve = curves.category(category);
                CategorySummary {
                    category,
                    label: category.label().to_string(),
                    min: curve.iter().copied().fold(f64::INFINITY, f64::min),
                    max: curve.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    first: first(curve),
                    last: last(curve),
                }
            })
            .collect();
        let per_kw = curves.per_kw();
        Self {
            cell: model.cell().clone(),
            parameters: model.params().clone(),
            sweep: *sweep,
            unit: curves.unit,
            categories,
            total_first: first(&curves.total),
            total_last: last(&curves.total),
            total_first_per_kw: first(&per_kw.total),
            total_last_per_kw: last(&per_kw.total),
            max_lines: curves.lines.iter().copied().max().unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_curves() -> CostCurves {
        compute_cost_curves(&CostParameters::default(), &ProductionSweep::default())
            .expect("default model evaluates")
    }

    #[test]
    fn test_default_sweep_shape() {
        let sweep = ProductionSweep::default();
        assert_eq!(sweep.len(), 1491);
        assert_eq!(sweep.first(), 10.0);
        assert_eq!(sweep.last(), 1500.0);
        let units = sweep.units();
        assert_eq!(units.len(), 1491);
        assert_eq!(units[0], 10.0);
        assert_eq!(units[1490], 1500.0);
    }

    #[test]
    fn test_sweep_last_respects_step() {
        let sweep = ProductionSweep::new(10, 25, 4).unwrap();
        assert_eq!(sweep.units().to_vec(), vec![10.0, 14.0, 18.0, 22.0]);
        assert_eq!(sweep.last(), 22.0);
    }

    #[test]
    fn test_sweep_validation() {
        assert!(matches!(
            ProductionSweep::new(0, 10, 1),
            Err(CostError::InvalidSweep(_))
        ));
        assert!(matches!(
            ProductionSweep::new(5, 10, 0),
            Err(CostError::InvalidSweep(_))
        ));
        assert!(matches!(
            ProductionSweep::new(11, 10, 1),
            Err(CostError::InvalidSweep(_))
        ));
    }

    #[test]
    fn test_curves_are_index_aligned() {
        let curves = default_curves();
        let n = curves.units.len();
        assert_eq!(curves.lines.len(), n);
        for category in CostCategory::ALL {
            assert_eq!(curves.category(category).len(), n);
        }
        assert_eq!(curves.total.len(), n);
    }

    #[test]
    fn test_total_is_sum_of_categories() {
        let curves = default_curves();
        for (i, row) in curves.rows().enumerate() {
            let sum = row.membrane
                + row.catalyst_ionomer
                + row.direct_labor
                + row.capital
                + row.energy
                + row.building
                + row.maintenance;
            assert_eq!(curves.total[i], sum);
        }
    }

    #[test]
    fn test_catalyst_cost_matches_loading() {
        let expected = 0.025 * (2219.5 + 1463.82) + 0.05 * (7.0 / 93.0) * 2900.0;
        let curves = default_curves();
        assert!(curves
            .catalyst_ionomer
            .iter()
            .all(|&c| (c - expected).abs() < 1e-9));
        assert!((expected - 102.996_978).abs() < 1e-5);
    }

    #[test]
    fn test_membrane_scenarios() {
        let model = CostModel::new(CostParameters::default()).unwrap();
        let max = 2.0 * MEMBRANE_MIN_EUR_PER_M2;
        assert_eq!(model.membrane_cost(10.0).unwrap(), max);
        assert_eq!(
            model.membrane_cost(1000.0).unwrap(),
            0.822222222 * 0.8 * max
        );
        assert_eq!(
            model.membrane_cost(20000.0).unwrap(),
            0.822222222 * 0.8 * 0.766891892 * max
        );
    }

    #[test]
    fn test_energy_and_maintenance_fall_with_volume() {
        let curves = default_curves();
        for w in curves.energy.windows(2) {
            assert!(w[1] < w[0]);
        }
        for w in curves.maintenance.windows(2) {
            assert!(w[1] < w[0]);
        }
        assert!((curves.energy[0] - 227.0 * 9.97 / 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_sweep_fits_one_line() {
        let curves = default_curves();
        assert!(curves.lines.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_zero_volume_rejected() {
        let model = CostModel::new(CostParameters::default()).unwrap();
        assert_eq!(
            model.breakdown(0.0).unwrap_err(),
            CostError::InvalidVolume(0.0)
        );
        assert!(matches!(
            model.energy_cost(-5.0),
            Err(CostError::InvalidVolume(_))
        ));
        assert!(matches!(
            model.maintenance_cost(f64::NAN),
            Err(CostError::InvalidVolume(_))
        ));
    }

    #[test]
    fn test_uncovered_sweep_fails_fast() {
        let mut params = CostParameters::default();
        params.membrane.truncate(3);
        let err = compute_cost_curves(&params, &ProductionSweep::default()).unwrap_err();
        assert!(matches!(err, CostError::UncoveredVolume { .. }));
    }

    #[test]
    fn test_per_kw_rescales_every_curve() {
        let curves = default_curves();
        let per_kw = curves.per_kw();
        let k = curves.stack_area_per_kw;
        assert_eq!(per_kw.unit, CostUnit::EurPerKilowatt);
        for category in CostCategory::ALL {
            let a = curves.category(category);
            let b = per_kw.category(category);
            for (x, y) in a.iter().zip(b.iter()) {
                assert!((x * k - y).abs() < 1e-12);
            }
        }
        assert_eq!(per_kw.units, curves.units);
        let again = per_kw.per_kw();
        assert_eq!(again.total, per_kw.total);
    }

    #[test]
    fn test_cumulative_top_layer_is_total() {
        let curves = default_curves();
        let layers = curves.cumulative();
        assert_eq!(layers.len(), 7);
        let top = layers.last().unwrap();
        for (a, b) in top.iter().zip(curves.total.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
        for pair in layers.windows(2) {
            assert!(pair[0].iter().zip(pair[1].iter()).all(|(lo, hi)| lo <= hi));
        }
    }

    #[test]
    fn test_at_and_row_lookup() {
        let curves = default_curves();
        let row = curves.at(100.0).unwrap();
        assert_eq!(row.units_per_year, 100.0);
        assert!((row.total() - curves.total[90]).abs() < 1e-9);
        assert!(curves.at(5.0).is_none());
        assert!(curves.row(curves.len()).is_none());
    }

    #[test]
    fn test_negative_catalyst_and_maintenance_rejected() {
        let mut params = CostParameters::default();
        params.catalyst.loading_g_per_m2 = -25.0;
        assert!(matches!(
            CostModel::new(params),
            Err(CostError::InvalidParameter(_))
        ));

        let mut params = CostParameters::default();
        params.maintenance.stack_area_factor = -10.0;
        assert!(matches!(
            CostModel::new(params),
            Err(CostError::InvalidParameter(_))
        ));

        let mut params = CostParameters::default();
        params.maintenance.price_adjustment = 0.0;
        assert!(matches!(
            CostModel::new(params),
            Err(CostError::InvalidParameter(_))
        ));

        let mut params = CostParameters::default();
        params.catalyst.ionomer_eur_per_kg = f64::NAN;
        assert!(CostModel::new(params).is_err());
    }

    #[test]
    fn test_report_per_kw_totals_ignore_input_unit() {
        let model = CostModel::new(CostParameters::default()).unwrap();
        let sweep = ProductionSweep::new(10, 50, 1).unwrap();
        let curves = model.evaluate(&sweep).unwrap();
        let from_m2 = CostReport::new(&model, &sweep, &curves);
        let from_kw = CostReport::new(&model, &sweep, &curves.per_kw());
        assert_eq!(from_kw.unit, CostUnit::EurPerKilowatt);
        assert_eq!(from_kw.total_first_per_kw, from_m2.total_first_per_kw);
        assert_eq!(from_kw.total_last_per_kw, from_m2.total_last_per_kw);
        assert_eq!(from_kw.total_first, from_kw.total_first_per_kw);
        assert!(
            (from_m2.total_first_per_kw - from_m2.total_first * curves.stack_area_per_kw).abs()
                < 1e-9
        );
    }

    #[test]
    fn test_report_summarises_sweep_ends() {
        let model = CostModel::new(CostParameters::default()).unwrap();
        let sweep = ProductionSweep::default();
        let curves = model.evaluate(&sweep).unwrap();
        let report = CostReport::new(&model, &sweep, &curves);
        assert_eq!(report.categories.len(), 7);
        assert_eq!(report.total_first, curves.total[0]);
        assert_eq!(report.total_last, curves.total[curves.len() - 1]);
        assert_eq!(report.max_lines, 1);
        let membrane = &report.categories[0];
        assert_eq!(membrane.label, "Membrane");
        assert_eq!(membrane.max, 2.0 * MEMBRANE_MIN_EUR_PER_M2);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["cell"]["cell_count"], 621);
        assert_eq!(json["sweep"]["end"], 1500);
    }
}
