//! Unstructured zones: explicit element sections.
//!
//! Interior cells come from every section whose first element id lies
//! within the zone's declared cell count, in element-id order. A zone
//! with NFACE sections is polyhedral: its cells are the NFACE elements,
//! resolved through the NGON faces, and any other section is boundary.

use crate::mesh::{CellArray, Mesh, UnstructuredGrid};
use crate::mesh_error::CgnsError;
use crate::node::{CgnsFile, Label, NodeRef};
use crate::zone::elements::{ElementType, Section, push_polyhedra, read_section};
use crate::zone::fields::{SolutionWindows, attach_solutions};
use crate::zone::{
    IS_PATCH_FIELD, IndexWindow, ReadRequest, ReadWarning, ZoneOutput, grid_node, patches,
    read_coordinates, read_family, read_rind, resolve_pointers,
};
use log::debug;

/// `(points, cells)` declared in the `Zone_t` payload.
pub fn zone_sizes(file: &CgnsFile, zone: &NodeRef<'_>) -> Result<(usize, usize), CgnsError> {
    let sizes = file.read_index_array(zone)?;
    match sizes[..] {
        [np, nc, ..] if np >= 0 && nc >= 0 => Ok((np as usize, nc as usize)),
        _ => Err(CgnsError::Parse(format!(
            "unstructured zone `{}` has sizes {sizes:?}",
            zone.name()
        ))),
    }
}

/// Split sections into interior cells and boundary patches.
struct SectionPlan<'s> {
    interior: Vec<&'s Section>,
    ngons: Vec<&'s Section>,
    nfaces: Vec<&'s Section>,
    boundary: Vec<&'s Section>,
}

fn plan(sections: &[Section], interior_cells: i64) -> SectionPlan<'_> {
    let ngons: Vec<&Section> = sections
        .iter()
        .filter(|s| s.element_type == ElementType::NGon)
        .collect();
    let mut nfaces: Vec<&Section> = sections
        .iter()
        .filter(|s| s.element_type == ElementType::NFace)
        .collect();
    nfaces.sort_by_key(|s| s.start);
    let polyhedral = !nfaces.is_empty();
    let mut interior = Vec::new();
    let mut boundary = Vec::new();
    for s in sections {
        match s.element_type {
            ElementType::NFace => {}
            ElementType::NGon if polyhedral => {}
            _ if polyhedral || s.is_boundary(interior_cells) => boundary.push(s),
            _ => interior.push(s),
        }
    }
    interior.sort_by_key(|s| s.start);
    SectionPlan {
        interior,
        ngons,
        nfaces,
        boundary,
    }
}

/// Materialize an unstructured zone.
pub fn read_unstructured_zone(
    file: &CgnsFile,
    zone: &NodeRef<'_>,
    request: &ReadRequest,
) -> Result<ZoneOutput, CgnsError> {
    let zone_name = zone.name().to_string();
    let (npts, ncells) = zone_sizes(file, zone)?;
    let pointers = resolve_pointers(file, zone, request.step)?;
    let grid = grid_node(file, zone, pointers.grid.as_deref())?;
    let rind = read_rind(file, &grid)?;
    let points = read_coordinates(
        file,
        &grid,
        &IndexWindow::new([npts, 1, 1], rind),
        request.precision,
    )?;
    drop(grid);

    let mut warnings = Vec::new();
    let mut sections = Vec::new();
    for node in file.children_with_label(zone, &Label::Elements)? {
        match read_section(file, &node) {
            Ok(s) => sections.push(s),
            Err(e) => ReadWarning::record(&mut warnings, &zone_name, node.name(), e),
        }
    }
    let layout = plan(&sections, ncells as i64);
    let mut cells = CellArray::new();
    for s in &layout.interior {
        let mut part = CellArray::new();
        match s.push_cells(&mut part, npts) {
            Ok(()) => cells.append(&part, 0),
            Err(e) => ReadWarning::record(&mut warnings, &zone_name, &s.name, e),
        }
    }
    for s in &layout.nfaces {
        let mut part = CellArray::new();
        match push_polyhedra(s, &layout.ngons, npts, &mut part) {
            Ok(()) => cells.append(&part, 0),
            Err(e) => ReadWarning::record(&mut warnings, &zone_name, &s.name, e),
        }
    }
    if cells.len() != ncells {
        ReadWarning::record(
            &mut warnings,
            &zone_name,
            "cells",
            format!("zone declares {ncells} cells, sections provide {}", cells.len()),
        );
    }

    let mut ug = UnstructuredGrid::new(points, cells);
    ug.family = read_family(file, zone)?;
    let cell_count = ug.num_cells();
    let mut mesh = Mesh::Unstructured(ug);
    attach_solutions(
        file,
        zone,
        &mut mesh,
        &SolutionWindows {
            points: [npts, 1, 1],
            cells: [cell_count, 1, 1],
        },
        request,
        pointers.solutions.as_deref(),
        &mut warnings,
    )?;

    let mut patch_list = Vec::new();
    if request.load_patches {
        if let Mesh::Unstructured(g) = &mesh {
            for s in &layout.boundary {
                match patches::section_patch(s, g) {
                    Ok(p) => patch_list.push((s.name.clone(), p)),
                    Err(e) => ReadWarning::record(&mut warnings, &zone_name, &s.name, e),
                }
            }
        }
        mesh.mark_cells(IS_PATCH_FIELD, 0);
    }
    debug!(
        "unstructured zone {zone_name}: {npts} points, {cell_count} cells, {} sections ({} boundary)",
        sections.len(),
        layout.boundary.len()
    );
    Ok(ZoneOutput {
        name: zone_name,
        mesh,
        patches: patch_list,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(t: ElementType, start: i64, end: i64) -> Section {
        Section {
            name: format!("{t:?}{start}"),
            element_type: t,
            start,
            end,
            connectivity: Vec::new(),
            offsets: None,
        }
    }

    #[test]
    fn boundary_sections_are_split_off() {
        let secs = vec![s(ElementType::Quad4, 5, 8), s(ElementType::Hexa8, 1, 4)];
        let p = plan(&secs, 4);
        assert_eq!(p.interior.len(), 1);
        assert_eq!(p.interior[0].element_type, ElementType::Hexa8);
        assert_eq!(p.boundary.len(), 1);
    }

    #[test]
    fn polyhedral_zone_ignores_face_numbering() {
        let secs = vec![
            s(ElementType::NGon, 1, 11),
            s(ElementType::NFace, 12, 13),
            s(ElementType::Quad4, 14, 15),
        ];
        let p = plan(&secs, 2);
        assert!(p.interior.is_empty());
        assert_eq!(p.ngons.len(), 1);
        assert_eq!(p.nfaces.len(), 1);
        assert_eq!(p.boundary.len(), 1);
    }
}
