//! Boundary patches: structured `BC_t` point ranges and unstructured
//! boundary sections, each as its own small mesh carrying the
//! [`IS_PATCH_FIELD`] marker.

use crate::mesh::{
    Attributes, CellArray, FieldArray, Mesh, Points, StructuredGrid, UnstructuredGrid,
};
use crate::mesh_error::CgnsError;
use crate::node::{CgnsFile, Label, NodeRef};
use crate::zone::{IS_PATCH_FIELD, ReadWarning, Section, read_family};
use hashbrown::HashMap;

/// Copy the tuples `ids` of every array in `src`.
fn gather_attributes(src: &Attributes, ids: &[usize]) -> Result<Attributes, CgnsError> {
    let mut out = Attributes::new();
    for a in src.iter() {
        let mut data = a.data.empty_like();
        for &i in ids {
            data.push_tuple_from(&a.data, i, a.components)?;
        }
        out.insert(FieldArray::new(a.name.clone(), a.components, data)?);
    }
    Ok(out)
}

fn gather_points(points: &Points, ids: &[usize]) -> Result<Points, CgnsError> {
    let mut data = points.data().empty_like();
    for &i in ids {
        data.push_tuple_from(points.data(), i, 3)?;
    }
    Points::new(data)
}

/// Inclusive 1-based `[lo.., hi..]` range to 0-based per-direction bounds.
fn point_range(raw: &[i64], extent: [usize; 3]) -> Result<[(usize, usize); 3], CgnsError> {
    let index_dim = raw.len() / 2;
    if index_dim == 0 || index_dim > 3 || raw.len() != 2 * index_dim {
        return Err(CgnsError::Parse(format!(
            "PointRange has {} values",
            raw.len()
        )));
    }
    let mut out = [(0usize, 0usize); 3];
    for d in 0..index_dim {
        let (lo, hi) = (raw[d].min(raw[d + index_dim]), raw[d].max(raw[d + index_dim]));
        if lo < 1 || hi as usize > extent[d] {
            return Err(CgnsError::Parse(format!(
                "PointRange {lo}..{hi} outside 1..{} in direction {d}",
                extent[d]
            )));
        }
        out[d] = (lo as usize - 1, hi as usize - 1);
    }
    Ok(out)
}

/// Sub-grid of `grid` covering the inclusive 0-based `range`.
pub fn structured_subgrid(
    grid: &StructuredGrid,
    range: [(usize, usize); 3],
) -> Result<StructuredGrid, CgnsError> {
    let extent = range.map(|(lo, hi)| hi - lo + 1);
    let mut ids = Vec::with_capacity(extent.iter().product());
    for k in range[2].0..=range[2].1 {
        for j in range[1].0..=range[1].1 {
            for i in range[0].0..=range[0].1 {
                ids.push(grid.point_index(i, j, k));
            }
        }
    }
    let mut sub = StructuredGrid::new(extent, gather_points(&grid.points, &ids)?)?;
    sub.point_data = gather_attributes(&grid.point_data, &ids)?;
    sub.family = grid.family.clone();
    Ok(sub)
}

/// One patch per `BC_t` node with a `PointRange` under the zone's
/// `ZoneBC_t`. A bad BC is skipped with a warning.
pub fn structured_patches(
    file: &CgnsFile,
    zone: &NodeRef<'_>,
    grid: &StructuredGrid,
    warnings: &mut Vec<ReadWarning>,
) -> Result<Vec<(String, Mesh)>, CgnsError> {
    let Some(zbc) = file.try_find_first_child(zone, &Label::ZoneBC, None)? else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for bc in file.children_with_label(&zbc, &Label::BC)? {
        let patch = (|| -> Result<Mesh, CgnsError> {
            let pr = file.find_first_child(&bc, &Label::IndexRange, Some("PointRange"))?;
            let range = point_range(&file.read_index_array(&pr)?, grid.extent)?;
            let mut sub = structured_subgrid(grid, range)?;
            if let Some(fam) = read_family(file, &bc)? {
                sub.family = Some(fam);
            }
            let mut mesh = Mesh::Structured(sub);
            mesh.mark_cells(IS_PATCH_FIELD, 1);
            Ok(mesh)
        })();
        match patch {
            Ok(m) => out.push((bc.name().to_string(), m)),
            Err(e) => ReadWarning::record(warnings, zone.name(), bc.name(), e),
        }
    }
    Ok(out)
}

/// Boundary section as a compact unstructured mesh over the points it
/// references, with the interior's point fields carried along.
pub fn section_patch(section: &Section, interior: &UnstructuredGrid) -> Result<Mesh, CgnsError> {
    let mut cells = CellArray::new();
    section.push_cells(&mut cells, interior.num_points())?;
    let mut local: HashMap<i64, i64> = HashMap::new();
    let mut ids = Vec::new();
    for &p in cells.connectivity() {
        local.entry(p).or_insert_with(|| {
            ids.push(p as usize);
            ids.len() as i64 - 1
        });
    }
    cells.remap_points(|p| local.get(&p).copied().unwrap_or(p));
    let mut g = UnstructuredGrid::new(gather_points(&interior.points, &ids)?, cells);
    g.point_data = gather_attributes(&interior.point_data, &ids)?;
    g.family = interior.family.clone();
    let mut mesh = Mesh::Unstructured(g);
    mesh.mark_cells(IS_PATCH_FIELD, 1);
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_invariants::DebugInvariants;
    use crate::mesh::ArrayData;
    use crate::zone::ElementType;

    fn grid() -> StructuredGrid {
        let mut pts = Vec::new();
        for k in 0..3 {
            for j in 0..3 {
                for i in 0..3 {
                    pts.push([i as f64, j as f64, k as f64]);
                }
            }
        }
        let mut g = StructuredGrid::new([3, 3, 3], Points::from_f64(&pts)).unwrap();
        g.point_data.insert(FieldArray::scalar(
            "id",
            ArrayData::I32((0..27).collect()),
        ));
        g
    }

    #[test]
    fn point_range_selects_face() {
        let g = grid();
        let range = point_range(&[1, 1, 1, 1, 3, 3], g.extent).unwrap();
        let sub = structured_subgrid(&g, range).unwrap();
        assert_eq!(sub.extent, [1, 3, 3]);
        assert_eq!(sub.num_cells(), 4);
        assert_eq!(
            sub.point_data.get("id").unwrap().data,
            ArrayData::I32(vec![0, 3, 6, 9, 12, 15, 18, 21, 24])
        );
        assert!(point_range(&[0, 1, 1, 1, 3, 3], g.extent).is_err());
    }

    #[test]
    fn boundary_section_is_compacted() {
        let pts = Points::from_f64(&[[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]);
        let interior = UnstructuredGrid::new(pts, CellArray::new());
        let s = Section {
            name: "wall".into(),
            element_type: ElementType::Bar2,
            start: 2,
            end: 2,
            connectivity: vec![3, 4],
            offsets: None,
        };
        let patch = section_patch(&s, &interior).unwrap();
        assert_eq!(patch.num_points(), 2);
        assert_eq!(patch.num_cells(), 1);
        assert!(patch.cell_data().contains(IS_PATCH_FIELD));
        patch.validate_invariants().unwrap();
    }
}
