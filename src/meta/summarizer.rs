//! One-pass walk from the root to a [`BaseInfo`] per base.
//!
//! Only small nodes are read: base dimensions, families, iterative data,
//! reference state and the array listing of the first zone's solutions.

use crate::meta::base_info::{BaseInfo, FamilyInfo, FieldCatalog};
use crate::mesh_error::CgnsError;
use crate::node::{CgnsFile, Label, NodeRef};
use crate::zone::fields::{Location, group_components, list_arrays, read_location};
use crate::zone::{is_solution_pointer, read_data_array};
use log::{debug, warn};

/// Summaries of every base in `file`, in stored order.
pub fn summarize(file: &CgnsFile) -> Result<Vec<BaseInfo>, CgnsError> {
    let root = file.root()?;
    let bases = file.children_with_label(&root, &Label::Base)?;
    if bases.is_empty() {
        return Err(CgnsError::Parse(format!(
            "{}: no CGNSBase_t node",
            file.path().display()
        )));
    }
    bases.iter().map(|b| summarize_base(file, b)).collect()
}

/// Summary of one base.
pub fn summarize_base(file: &CgnsFile, base: &NodeRef<'_>) -> Result<BaseInfo, CgnsError> {
    let dims = file.read_index_array(base)?;
    let [cell_dim, phys_dim] = dims[..] else {
        return Err(CgnsError::Parse(format!(
            "base `{}` has {} dimension values",
            base.name(),
            dims.len()
        )));
    };
    let mut info = BaseInfo {
        name: base.name().to_string(),
        cell_dim: cell_dim.max(0) as usize,
        phys_dim: phys_dim.max(0) as usize,
        ..Default::default()
    };

    for fam in file.children_with_label(base, &Label::Family)? {
        let is_bc = file
            .try_find_first_child(&fam, &Label::FamilyBC, None)?
            .is_some();
        info.families.push(FamilyInfo {
            name: fam.name().to_string(),
            is_bc,
        });
    }

    read_times(file, base, &mut info)?;

    if let Some(rs) = file.try_find_first_child(base, &Label::ReferenceState, None)? {
        for arr in file.children_with_label(&rs, &Label::DataArray)? {
            match file.read_real_scalar(&arr) {
                Ok(v) => {
                    info.reference_state.insert(arr.name().to_string(), v);
                }
                Err(e) => debug!("reference state `{}` skipped: {e}", arr.name()),
            }
        }
    }

    let zones = file.children_with_label(base, &Label::Zone)?;
    info.zone_names = zones.iter().map(|z| z.name().to_string()).collect();
    if let Some(first) = zones.first() {
        read_catalogs(file, first, &mut info)?;
    }
    debug!(
        "base {}: dims {}/{}, {} zones, {} steps, {} point / {} cell fields",
        info.name,
        info.cell_dim,
        info.phys_dim,
        info.zone_count(),
        info.times.len(),
        info.point_fields.len(),
        info.cell_fields.len()
    );
    Ok(info)
}

fn read_times(file: &CgnsFile, base: &NodeRef<'_>, info: &mut BaseInfo) -> Result<(), CgnsError> {
    if let Some(bid) = file.try_find_first_child(base, &Label::BaseIterativeData, None)? {
        if let Some(t) = file.try_find_first_child(&bid, &Label::DataArray, Some("TimeValues"))? {
            info.times = read_data_array(file, &t)?.to_f64_vec();
        }
        if let Some(it) =
            file.try_find_first_child(&bid, &Label::DataArray, Some("IterationValues"))?
        {
            info.iterations = file.read_index_array(&it)?;
        }
        if info.times.is_empty() && !info.iterations.is_empty() {
            info.times = info.iterations.iter().map(|&i| i as f64).collect();
        }
    }
    info.has_time = !info.times.is_empty();
    if !info.has_time {
        info.times = vec![0.0];
    } else if info.times.windows(2).any(|w| w[1] < w[0]) {
        warn!("base `{}`: time values are not increasing", info.name);
    }
    Ok(())
}

fn read_catalogs(
    file: &CgnsFile,
    zone: &NodeRef<'_>,
    info: &mut BaseInfo,
) -> Result<(), CgnsError> {
    if let Some(zid) = file.try_find_first_child(zone, &Label::ZoneIterativeData, None)? {
        for arr in file.children_with_label(&zid, &Label::DataArray)? {
            info.grid_pointers |= arr.name() == "GridCoordinatesPointers";
            info.solution_pointers |= is_solution_pointer(arr.name());
        }
    }
    for sol in file.children_with_label(zone, &Label::FlowSolution)? {
        let location = match read_location(file, &sol) {
            Ok(l) => l,
            Err(e) => {
                debug!("solution `{}` not cataloged: {e}", sol.name());
                continue;
            }
        };
        let groups = group_components(&list_arrays(file, &sol)?, info.phys_dim);
        let catalog: &mut FieldCatalog = match location {
            Location::Vertex => &mut info.point_fields,
            Location::CellCenter => &mut info.cell_fields,
        };
        for group in groups {
            catalog.entry(group.name().to_string()).or_insert(true);
        }
    }
    Ok(())
}
