//! Structured zones: implicit i-fastest grids.

use crate::mesh::{Mesh, StructuredGrid};
use crate::mesh_error::CgnsError;
use crate::node::{CgnsFile, NodeRef};
use crate::zone::fields::{SolutionWindows, attach_solutions};
use crate::zone::{
    IS_PATCH_FIELD, IndexWindow, ReadRequest, ZoneOutput, grid_node, patches, read_coordinates,
    read_family, read_rind, resolve_pointers,
};
use log::debug;

/// Vertex extent of a structured zone from its `Zone_t` payload
/// (`[vertex sizes, cell sizes, boundary sizes]`, one row per index
/// direction). Unused directions are 1.
pub fn vertex_extent(file: &CgnsFile, zone: &NodeRef<'_>) -> Result<[usize; 3], CgnsError> {
    let sizes = file.read_index_array(zone)?;
    let index_dim = sizes.len() / 3;
    if index_dim == 0 || index_dim > 3 || sizes.len() != 3 * index_dim {
        return Err(CgnsError::Parse(format!(
            "structured zone `{}` has {} size values",
            zone.name(),
            sizes.len()
        )));
    }
    let mut extent = [1usize; 3];
    for (d, slot) in extent.iter_mut().take(index_dim).enumerate() {
        *slot = usize::try_from(sizes[d])
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| {
                CgnsError::Parse(format!("zone `{}`: bad extent {}", zone.name(), sizes[d]))
            })?;
    }
    Ok(extent)
}

/// Materialize a structured zone.
pub fn read_structured_zone(
    file: &CgnsFile,
    zone: &NodeRef<'_>,
    request: &ReadRequest,
) -> Result<ZoneOutput, CgnsError> {
    let extent = vertex_extent(file, zone)?;
    let pointers = resolve_pointers(file, zone, request.step)?;
    let grid = grid_node(file, zone, pointers.grid.as_deref())?;
    let window = IndexWindow::new(extent, read_rind(file, &grid)?);
    let points = read_coordinates(file, &grid, &window, request.precision)?;
    drop(grid);

    let mut sg = StructuredGrid::new(extent, points)?;
    sg.family = read_family(file, zone)?;
    let cells = sg.cell_extent();
    let mut mesh = Mesh::Structured(sg);
    let mut warnings = Vec::new();
    attach_solutions(
        file,
        zone,
        &mut mesh,
        &SolutionWindows {
            points: extent,
            cells,
        },
        request,
        pointers.solutions.as_deref(),
        &mut warnings,
    )?;

    let mut patch_list = Vec::new();
    if request.load_patches {
        if let Mesh::Structured(g) = &mesh {
            patch_list = patches::structured_patches(file, zone, g, &mut warnings)?;
        }
        mesh.mark_cells(IS_PATCH_FIELD, 0);
    }
    debug!(
        "structured zone {}: extent {:?}, {} point / {} cell fields",
        zone.name(),
        extent,
        mesh.point_data().len(),
        mesh.cell_data().len()
    );
    Ok(ZoneOutput {
        name: zone.name().to_string(),
        mesh,
        patches: patch_list,
        warnings,
    })
}
