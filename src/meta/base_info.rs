//! Per-base metadata catalog.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field name → enabled flag. New names default to enabled.
pub type FieldCatalog = BTreeMap<String, bool>;

/// A `Family_t` node of a base.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyInfo {
    pub name: String,
    /// Carries a `FamilyBC_t` child.
    pub is_bc: bool,
}

/// Lightweight summary of one `CGNSBase_t`: everything needed to plan a
/// read without touching coordinates or field values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseInfo {
    pub name: String,
    pub cell_dim: usize,
    pub phys_dim: usize,
    pub zone_names: Vec<String>,
    /// Time values in stored (increasing) order. A single `0.0` when the
    /// file carries no time information.
    pub times: Vec<f64>,
    /// Iteration numbers parallel to `times`, when stored.
    pub iterations: Vec<i64>,
    /// `false` when `times` was synthesized.
    pub has_time: bool,
    pub reference_state: BTreeMap<String, f64>,
    pub families: Vec<FamilyInfo>,
    /// Fields of the first zone only; other zones are assumed to match.
    pub point_fields: FieldCatalog,
    pub cell_fields: FieldCatalog,
    /// First zone names its grid per step through `GridCoordinatesPointers`.
    pub grid_pointers: bool,
    /// First zone names its solutions per step through `FlowSolution*Pointers`.
    pub solution_pointers: bool,
}

impl BaseInfo {
    pub fn zone_count(&self) -> usize {
        self.zone_names.len()
    }

    /// Index of the last stored time not exceeding `t`, clamped to the
    /// stored range.
    pub fn step_for_time(&self, t: f64) -> usize {
        self.times.iter().rposition(|&v| v <= t).unwrap_or(0)
    }

    /// Time values sorted and de-duplicated.
    pub fn sorted_times(&self) -> Vec<f64> {
        let mut t = self.times.clone();
        t.sort_by(f64::total_cmp);
        t.dedup();
        t
    }

    /// Enable or disable a point field; unknown names are ignored.
    pub fn set_point_field(&mut self, name: &str, enabled: bool) -> bool {
        set_flag(&mut self.point_fields, name, enabled)
    }

    pub fn set_cell_field(&mut self, name: &str, enabled: bool) -> bool {
        set_flag(&mut self.cell_fields, name, enabled)
    }
}

fn set_flag(catalog: &mut FieldCatalog, name: &str, enabled: bool) -> bool {
    match catalog.get_mut(name) {
        Some(flag) => {
            *flag = enabled;
            true
        }
        None => false,
    }
}
