//! Field selection, vector reassembly and `FlowSolution_t` reads.
//!
//! Components stored as `<name>X`, `<name>Y`, `<name>Z` are merged into one
//! vector field `<name>` only when the set is complete for the physical
//! dimension, every component has the same storage type, and no scalar
//! named `<name>` exists. Otherwise they stay independent scalars.

use crate::mesh::{ArrayData, Attributes, FieldArray, Mesh};
use crate::mesh_error::CgnsError;
use crate::node::{CgnsFile, DataType, Label, NodeRef};
use crate::zone::{IndexWindow, ReadWarning, read_data_array, read_rind};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which fields to load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelection {
    /// Load every field regardless of `enabled`.
    pub all: bool,
    pub enabled: BTreeSet<String>,
}

impl Default for FieldSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl FieldSelection {
    pub fn all() -> Self {
        Self {
            all: true,
            enabled: BTreeSet::new(),
        }
    }

    pub fn none() -> Self {
        Self {
            all: false,
            enabled: BTreeSet::new(),
        }
    }

    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            all: false,
            enabled: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.all || self.enabled.contains(name)
    }
}

/// A field as presented to callers: a scalar array or a reassembled
/// vector of component arrays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldGroup {
    Scalar(String),
    Vector { name: String, components: Vec<String> },
}

impl FieldGroup {
    pub fn name(&self) -> &str {
        match self {
            FieldGroup::Scalar(n) => n,
            FieldGroup::Vector { name, .. } => name,
        }
    }
}

const SUFFIXES: [char; 3] = ['X', 'Y', 'Z'];

/// Group stored arrays into fields. Order follows the first appearance of
/// each field's first array.
pub fn group_components(arrays: &[(String, DataType)], phys_dim: usize) -> Vec<FieldGroup> {
    let lookup = |n: &str| arrays.iter().find(|(a, _)| a == n).map(|(_, t)| *t);
    let needed = phys_dim.clamp(2, 3);
    let mut vectors: Vec<(String, Vec<String>)> = Vec::new();
    for (name, _) in arrays {
        let Some(base) = name.strip_suffix('X') else {
            continue;
        };
        if base.is_empty() || lookup(base).is_some() {
            continue;
        }
        let comps: Vec<String> = SUFFIXES
            .iter()
            .map(|s| format!("{base}{s}"))
            .take_while(|c| lookup(c.as_str()).is_some())
            .collect();
        if comps.len() < needed {
            continue;
        }
        let first = lookup(comps[0].as_str());
        if comps.iter().any(|c| lookup(c.as_str()) != first) {
            continue;
        }
        vectors.push((base.to_string(), comps));
    }
    let mut out = Vec::new();
    let mut emitted: BTreeSet<&str> = BTreeSet::new();
    for (name, _) in arrays {
        match vectors.iter().find(|(_, comps)| comps.contains(name)) {
            Some((base, comps)) => {
                if emitted.insert(base.as_str()) {
                    out.push(FieldGroup::Vector {
                        name: base.clone(),
                        components: comps.clone(),
                    });
                }
            }
            None => out.push(FieldGroup::Scalar(name.clone())),
        }
    }
    out
}

/// Data location of a solution node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    Vertex,
    CellCenter,
}

/// Location declared under `node`; `Vertex` when absent.
pub fn read_location(file: &CgnsFile, node: &NodeRef<'_>) -> Result<Location, CgnsError> {
    let Some(loc) = file.try_find_first_child(node, &Label::GridLocation, None)? else {
        return Ok(Location::Vertex);
    };
    match file.read_string(&loc)?.as_str() {
        "Vertex" => Ok(Location::Vertex),
        "CellCenter" => Ok(Location::CellCenter),
        other => Err(CgnsError::Parse(format!(
            "unsupported grid location `{other}` on `{}`",
            node.name()
        ))),
    }
}

/// Stored arrays under `solution` with their declared types.
pub fn list_arrays(
    file: &CgnsFile,
    solution: &NodeRef<'_>,
) -> Result<Vec<(String, DataType)>, CgnsError> {
    file.children_with_label(solution, &Label::DataArray)?
        .iter()
        .map(|n| Ok((n.name().to_string(), file.data_type(n)?)))
        .collect()
}

fn read_component(
    file: &CgnsFile,
    solution: &NodeRef<'_>,
    name: &str,
    window: &IndexWindow,
) -> Result<ArrayData, CgnsError> {
    let node = file.find_first_child(solution, &Label::DataArray, Some(name))?;
    window.extract_data(&read_data_array(file, &node)?)
}

/// Read the selected fields of one solution node through `window`.
pub fn read_fields(
    file: &CgnsFile,
    solution: &NodeRef<'_>,
    window: &IndexWindow,
    selection: &FieldSelection,
    phys_dim: usize,
    zone: &str,
    warnings: &mut Vec<ReadWarning>,
) -> Result<Vec<FieldArray>, CgnsError> {
    let arrays = list_arrays(file, solution)?;
    let mut out = Vec::new();
    for group in group_components(&arrays, phys_dim) {
        if !selection.is_selected(group.name()) {
            continue;
        }
        match group {
            FieldGroup::Scalar(name) => match read_component(file, solution, &name, window) {
                Ok(data) => out.push(FieldArray::scalar(name, data)),
                Err(e) => ReadWarning::record(warnings, zone, &name, e),
            },
            FieldGroup::Vector { name, components } => {
                let mut parts = Vec::with_capacity(components.len());
                let mut failed = false;
                for c in &components {
                    match read_component(file, solution, c, window) {
                        Ok(d) => parts.push((c.clone(), d)),
                        Err(e) => {
                            ReadWarning::record(warnings, zone, c, e);
                            failed = true;
                        }
                    }
                }
                if failed {
                    // keep whatever components did load
                    out.extend(parts.into_iter().map(|(c, d)| FieldArray::scalar(c, d)));
                    continue;
                }
                let width = parts.len();
                let data: Vec<ArrayData> = parts.into_iter().map(|(_, d)| d).collect();
                match ArrayData::interleave(&data).and_then(|d| FieldArray::new(&name, width, d)) {
                    Ok(f) => out.push(f),
                    Err(e) => ReadWarning::record(warnings, zone, &name, e),
                }
            }
        }
    }
    Ok(out)
}

/// Point and cell extents of a zone, before rind.
pub struct SolutionWindows {
    pub points: [usize; 3],
    pub cells: [usize; 3],
}

/// Attach the selected fields of every solution to `mesh`. With the
/// pointer convention only the solutions named in `only` are read.
pub fn attach_solutions(
    file: &CgnsFile,
    zone: &NodeRef<'_>,
    mesh: &mut Mesh,
    windows: &SolutionWindows,
    request: &crate::zone::ReadRequest,
    only: Option<&[String]>,
    warnings: &mut Vec<ReadWarning>,
) -> Result<(), CgnsError> {
    let zone_name = zone.name().to_string();
    let solutions = file.children_with_label(zone, &Label::FlowSolution)?;
    for name in only.unwrap_or_default() {
        if !solutions.iter().any(|s| s.name() == name) {
            ReadWarning::record(warnings, &zone_name, name, "pointer names a missing solution");
        }
    }
    for sol in solutions
        .iter()
        .filter(|s| only.is_none_or(|names| names.iter().any(|n| n == s.name())))
    {
        let location = match read_location(file, sol) {
            Ok(l) => l,
            Err(e) => {
                ReadWarning::record(warnings, &zone_name, sol.name(), e);
                continue;
            }
        };
        let (count, selection) = match location {
            Location::Vertex => (windows.points, &request.point_fields),
            Location::CellCenter => (windows.cells, &request.cell_fields),
        };
        if !selection.all && selection.enabled.is_empty() {
            continue;
        }
        let window = IndexWindow::new(count, read_rind(file, sol)?);
        let fields = read_fields(
            file,
            sol,
            &window,
            selection,
            request.phys_dim,
            &zone_name,
            warnings,
        )?;
        let target: &mut Attributes = match location {
            Location::Vertex => mesh.point_data_mut(),
            Location::CellCenter => mesh.cell_data_mut(),
        };
        for f in fields {
            if target.contains(&f.name) {
                ReadWarning::record(warnings, &zone_name, &f.name, "duplicate field name");
                continue;
            }
            debug!("zone {zone_name}: {:?} field {} ({} comps)", location, f.name, f.components);
            target.insert(f);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrays(listed: &[(&str, DataType)]) -> Vec<(String, DataType)> {
        listed.iter().map(|(n, t)| (n.to_string(), *t)).collect()
    }

    #[test]
    fn complete_component_sets_become_vectors() {
        let a = arrays(&[
            ("Pressure", DataType::Float64),
            ("VelocityX", DataType::Float64),
            ("VelocityY", DataType::Float64),
            ("VelocityZ", DataType::Float64),
        ]);
        let g = group_components(&a, 3);
        assert_eq!(
            g,
            vec![
                FieldGroup::Scalar("Pressure".into()),
                FieldGroup::Vector {
                    name: "Velocity".into(),
                    components: vec!["VelocityX".into(), "VelocityY".into(), "VelocityZ".into()],
                },
            ]
        );
    }

    #[test]
    fn incomplete_mixed_or_shadowed_sets_stay_scalar() {
        let missing_z = arrays(&[("VX", DataType::Float64), ("VY", DataType::Float64)]);
        assert!(group_components(&missing_z, 3)
            .iter()
            .all(|g| matches!(g, FieldGroup::Scalar(_))));
        assert_eq!(group_components(&missing_z, 2).len(), 1);

        let mixed = arrays(&[
            ("VX", DataType::Float64),
            ("VY", DataType::Float32),
            ("VZ", DataType::Float64),
        ]);
        assert_eq!(group_components(&mixed, 3).len(), 3);

        let shadowed = arrays(&[
            ("V", DataType::Float64),
            ("VX", DataType::Float64),
            ("VY", DataType::Float64),
            ("VZ", DataType::Float64),
        ]);
        assert_eq!(group_components(&shadowed, 3).len(), 4);
    }

    #[test]
    fn selection_modes() {
        assert!(FieldSelection::all().is_selected("anything"));
        assert!(!FieldSelection::none().is_selected("p"));
        let s = FieldSelection::only(["p"]);
        assert!(s.is_selected("p") && !s.is_selected("q"));
    }
}
