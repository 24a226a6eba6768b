//! Functional specification of one electrolyzer cell and the stack built from it.

use serde::{Deserialize, Serialize};

use crate::{check_positive, CostResult};

const CM2_PER_M2: f64 = 1e4;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CellParameters {
    pub voltage_v: f64,
    pub current_density_a_per_m2: f64,
    pub total_area_m2: f64,
    /// Share of the cell area that is electrochemically active.
    pub active_fraction: f64,
    pub stack_power_w: f64,
}

impl Default for CellParameters {
    fn default() -> Self {
        Self {
            voltage_v: 2.2673,
            current_density_a_per_m2: 1.0 / 1e-4,
            total_area_m2: 781.61 / CM2_PER_M2,
            active_fraction: 0.91,
            stack_power_w: 1e6,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CellSpec {
    pub voltage_v: f64,
    pub current_density_a_per_m2: f64,
    pub power_density_w_per_m2: f64,
    pub total_area_m2: f64,
    pub active_area_m2: f64,
    pub stack_power_w: f64,
    pub cell_count: u32,
    /// Total cell area of one stack.
    pub stack_area_m2: f64,
    pub stack_area_per_kw: f64,
}

impl CellSpec {
    pub fn new(params: &CellParameters) -> CostResult<Self> {
        let voltage_v = check_positive("cell voltage", params.voltage_v)?;
        let current_density = check_positive("current density", params.current_density_a_per_m2)?;
        let total_area_m2 = check_positive("cell area", params.total_area_m2)?;
        let active_fraction = check_positive("active fraction", params.active_fraction)?;
        let stack_power_w = check_positive("stack power", params.stack_power_w)?;

        let power_density_w_per_m2 = voltage_v * current_density;
        let active_area_m2 = total_area_m2 * active_fraction;
        let cell_count = (stack_power_w / (power_density_w_per_m2 * active_area_m2)).ceil() as u32;
        let stack_area_m2 = cell_count as f64 * total_area_m2;

        Ok(Self {
            voltage_v,
            current_density_a_per_m2: current_density,
            power_density_w_per_m2,
            total_area_m2,
            active_area_m2,
            stack_power_w,
            cell_count,
            stack_area_m2,
            stack_area_per_kw: stack_area_m2 / (stack_power_w * 1e-3),
        })
    }

    pub fn summary(&self) -> String {
        let rule = "-".repeat(62);
        let mut out = String::new();
        out.push_str(&rule);
        out.push('\n');
        out.push_str("Functional Specification of Electrolyzer Cell \n\n");
        out.push_str(&format!("Cell Voltage: {:.2} V\n", self.voltage_v));
        out.push_str(&format!(
            "Current Density: {:.2} A/cm2\n",
            self.current_density_a_per_m2 / CM2_PER_M2
        ));
        out.push_str(&format!(
            "Active Cell Area: {:.2} cm2\n",
            self.active_area_m2 * CM2_PER_M2
        ));
        out.push_str(&format!("Rated Stack Power: {:.2} W\n", self.stack_power_w));
        out.push_str(&format!("Number of Cells: {}\n", self.cell_count));
        out.push_str(&format!(
            "Cell Area in {} MW Stack: {:.2} cm2\n",
            self.stack_power_w / 1e6,
            self.stack_area_m2 * CM2_PER_M2
        ));
        out.push_str(&rule);
        out.push('\n');
        out
    }
}
