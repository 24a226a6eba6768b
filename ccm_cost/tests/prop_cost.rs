//! Property-based tests for the CCM cost model using proptest.
//!
//! Covers: category bounds over the reference sweep, membrane continuity,
//! tranche sawtooth shape, inverse-volume curves and aggregation.

use ccm_cost::{
    compute_cost_curves, CostCategory, CostModel, CostParameters, LineParameters,
    ProductionSweep,
};
use proptest::prelude::*;

fn model() -> CostModel {
    CostModel::new(CostParameters::default()).expect("default parameters are valid")
}

/// Default plant with a line small enough that the reference sweep spans several tranches.
fn small_line_params() -> CostParameters {
    CostParameters {
        line: LineParameters {
            line_speed_cm_per_min: 5.0,
            ..LineParameters::default()
        },
        ..CostParameters::default()
    }
}

// ── Reference sweep bounds ───────────────────────────────────────────

proptest! {
    /// Every category is finite and non-negative anywhere in [10, 1500].
    #[test]
    fn categories_finite_and_non_negative(v in 10u32..=1500) {
        let row = model().breakdown(v as f64).unwrap();
        for category in CostCategory::ALL {
            let value = row.get(category);
            prop_assert!(value.is_finite(), "{} = {}", category.label(), value);
            prop_assert!(value >= 0.0, "{} = {}", category.label(), value);
        }
    }

    /// Energy and maintenance fall strictly as volume grows.
    #[test]
    fn energy_and_maintenance_strictly_decrease(v in 10u32..1500, dv in 1u32..200) {
        let m = model();
        let lo = v as f64;
        let hi = (v + dv) as f64;
        prop_assert!(m.energy_cost(hi).unwrap() < m.energy_cost(lo).unwrap());
        prop_assert!(m.maintenance_cost(hi).unwrap() < m.maintenance_cost(lo).unwrap());
    }

    /// Membrane price never rises with volume over the reference table.
    #[test]
    fn membrane_non_increasing(v in 10u32..1500) {
        let m = model();
        let a = m.membrane_cost(v as f64).unwrap();
        let b = m.membrane_cost((v + 1) as f64).unwrap();
        prop_assert!(b <= a + 1e-9, "membrane rose from {} to {} at {}", a, b, v);
    }

    /// Stepping up to a breakpoint from just below lands within rounding of its literal cost.
    #[test]
    fn membrane_continuous_at_breakpoints(eps in 1e-6f64..1e-3) {
        let m = model();
        for bp in m.membrane().breakpoints().iter().skip(1) {
            let near = m.membrane_cost(bp.units_per_year - eps).unwrap();
            prop_assert!((near - bp.cost_eur_per_m2).abs() < 1e-3,
                "jump at {}: {} vs {}", bp.units_per_year, near, bp.cost_eur_per_m2);
        }
    }
}

// ── Capacity tranches ────────────────────────────────────────────────

proptest! {
    /// Line count never decreases and changes only where required area crosses a
    /// multiple of line capacity.
    #[test]
    fn lines_follow_capacity_multiples(v in 10u32..1499) {
        let m = CostModel::new(small_line_params()).unwrap();
        let cap = m.params().line.capacity_m2_per_year();
        let a = m.tranche_costs(v as f64).unwrap();
        let b = m.tranche_costs((v + 1) as f64).unwrap();
        prop_assert!(b.lines >= a.lines);

        let area_a = m.required_area(v as f64).unwrap();
        let area_b = m.required_area((v + 1) as f64).unwrap();
        let crossed = (area_a / cap).ceil() != (area_b / cap).ceil();
        if b.lines > a.lines {
            prop_assert!(crossed);
            prop_assert!(b.labor > a.labor);
            prop_assert!(b.capital > a.capital);
            prop_assert!(b.building > a.building);
        } else {
            prop_assert!(b.labor < a.labor);
            prop_assert!(b.capital < a.capital);
            prop_assert!(b.building < a.building);
        }
    }

    /// Total is the exact element-wise sum of the seven categories for any sub-sweep.
    #[test]
    fn total_is_exact_sum(start in 10u32..1400, len in 1u32..100, step in 1u32..5) {
        let sweep = ProductionSweep::new(start, start + len, step).unwrap();
        let curves = compute_cost_curves(&small_line_params(), &sweep).unwrap();
        prop_assert_eq!(curves.len(), sweep.len());
        for i in 0..curves.len() {
            let sum = curves.membrane[i]
                + curves.catalyst_ionomer[i]
                + curves.direct_labor[i]
                + curves.capital[i]
                + curves.energy[i]
                + curves.building[i]
                + curves.maintenance[i];
            prop_assert_eq!(curves.total[i], sum);
        }
    }
}

#[test]
fn small_line_sweep_spans_several_tranches() {
    let curves = compute_cost_curves(&small_line_params(), &ProductionSweep::default()).unwrap();
    let max_lines = curves.lines.iter().copied().max().unwrap();
    assert!(max_lines >= 5, "only {max_lines} lines");
    for w in curves.lines.windows(2) {
        assert!(w[1] >= w[0]);
    }
}

#[test]
fn capacity_boundary_matches_ceil() {
    let m = model();
    let cap = m.params().line.capacity_m2_per_year();
    let stack = m.cell().stack_area_m2;
    let boundary = (cap / stack).floor();
    assert_eq!(m.tranche_costs(boundary).unwrap().lines, 1);
    assert_eq!(m.tranche_costs(boundary + 1.0).unwrap().lines, 2);
}
