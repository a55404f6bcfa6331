//! Appending mesh pieces into one unstructured block.
//!
//! Used by the parallel writer to fuse per-rank pieces of the same logical
//! block. With point merging on, points with bit-identical coordinates are
//! stored once; their point data comes from the first piece that
//! contributed them. Only arrays present in every piece with the same
//! width and storage type survive the append.

use crate::mesh::array::{ArrayData, Attributes, FieldArray, Precision};
use crate::mesh::cell_type::CellType;
use crate::mesh::grid::{CellArray, Mesh, Points, StructuredGrid, UnstructuredGrid};
use crate::mesh_error::CgnsError;
use hashbrown::HashMap;
use log::debug;

/// Convert a structured block into hexahedra, quads or segments.
pub fn structured_to_unstructured(grid: &StructuredGrid) -> UnstructuredGrid {
    let [ni, nj, nk] = grid.extent;
    let mut cells = CellArray::new();
    let active: Vec<usize> = (0..3).filter(|&d| grid.extent[d] > 1).collect();
    let id = |i: usize, j: usize, k: usize| grid.point_index(i, j, k) as i64;
    match active.len() {
        3 => {
            for k in 0..nk - 1 {
                for j in 0..nj - 1 {
                    for i in 0..ni - 1 {
                        cells.push(
                            CellType::Hexahedron,
                            &[
                                id(i, j, k),
                                id(i + 1, j, k),
                                id(i + 1, j + 1, k),
                                id(i, j + 1, k),
                                id(i, j, k + 1),
                                id(i + 1, j, k + 1),
                                id(i + 1, j + 1, k + 1),
                                id(i, j + 1, k + 1),
                            ],
                        );
                    }
                }
            }
        }
        2 => {
            let (a, b) = (active[0], active[1]);
            let at = |u: usize, v: usize| {
                let mut ijk = [0usize; 3];
                ijk[a] = u;
                ijk[b] = v;
                id(ijk[0], ijk[1], ijk[2])
            };
            for v in 0..grid.extent[b] - 1 {
                for u in 0..grid.extent[a] - 1 {
                    cells.push(
                        CellType::Quadrilateral,
                        &[at(u, v), at(u + 1, v), at(u + 1, v + 1), at(u, v + 1)],
                    );
                }
            }
        }
        1 => {
            for u in 0..grid.extent[active[0]] - 1 {
                cells.push(CellType::Segment, &[u as i64, u as i64 + 1]);
            }
        }
        _ => {}
    }
    let mut out = UnstructuredGrid::new(grid.points.clone(), cells);
    out.point_data = grid.point_data.clone();
    out.cell_data = grid.cell_data.clone();
    out.family = grid.family.clone();
    out
}

fn as_unstructured(mesh: &Mesh) -> std::borrow::Cow<'_, UnstructuredGrid> {
    match mesh {
        Mesh::Unstructured(g) => std::borrow::Cow::Borrowed(g),
        Mesh::Structured(g) => std::borrow::Cow::Owned(structured_to_unstructured(g)),
    }
}

/// Names of arrays that every attribute set carries with the same width
/// and storage type.
fn common_arrays(sets: &[&Attributes]) -> Vec<String> {
    let Some(first) = sets.first() else {
        return Vec::new();
    };
    first
        .iter()
        .filter(|a| {
            sets.iter().all(|s| {
                s.get(&a.name)
                    .is_some_and(|b| b.components == a.components && b.data.same_kind(&a.data))
            })
        })
        .map(|a| a.name.clone())
        .collect()
}

fn coord_key(p: [f64; 3]) -> [u64; 3] {
    // +0.0 and -0.0 are the same point
    p.map(|c| if c == 0.0 { 0 } else { c.to_bits() })
}

/// Append `pieces` into one unstructured grid.
///
/// A single piece is returned unchanged (structured stays structured).
pub fn append_meshes(pieces: &[&Mesh], merge_points: bool) -> Result<Mesh, CgnsError> {
    match pieces {
        [] => {
            return Err(CgnsError::InvalidMesh("nothing to append".into()));
        }
        [only] => return Ok((*only).clone()),
        _ => {}
    }
    let grids: Vec<_> = pieces.iter().map(|m| as_unstructured(m)).collect();
    let precision = if grids
        .iter()
        .all(|g| g.points.precision() == Precision::Single)
    {
        Precision::Single
    } else {
        Precision::Double
    };

    let point_sets: Vec<&Attributes> = grids.iter().map(|g| &g.point_data).collect();
    let cell_sets: Vec<&Attributes> = grids.iter().map(|g| &g.cell_data).collect();
    let point_names = common_arrays(&point_sets);
    let cell_names = common_arrays(&cell_sets);

    let mut xyz: Vec<f64> = Vec::new();
    let mut point_arrays: Vec<FieldArray> = point_names
        .iter()
        .filter_map(|n| point_sets[0].get(n))
        .map(|a| FieldArray {
            name: a.name.clone(),
            components: a.components,
            data: a.data.empty_like(),
        })
        .collect();
    let mut cells = CellArray::new();
    let mut seen: HashMap<[u64; 3], i64> = HashMap::new();
    let mut total_in = 0usize;

    for g in &grids {
        total_in += g.num_points();
        let mut local_to_global = Vec::with_capacity(g.num_points());
        for i in 0..g.num_points() {
            let p = g.points.get(i).unwrap_or([0.0; 3]);
            let next = (xyz.len() / 3) as i64;
            let gid = if merge_points {
                *seen.entry(coord_key(p)).or_insert(next)
            } else {
                next
            };
            if gid == next {
                xyz.extend_from_slice(&p);
                for out in &mut point_arrays {
                    if let Some(src) = g.point_data.get(&out.name) {
                        out.data.push_tuple_from(&src.data, i, out.components)?;
                    }
                }
            }
            local_to_global.push(gid);
        }
        let mut piece_cells = g.cells.clone();
        piece_cells.remap_points(|p| local_to_global.get(p as usize).copied().unwrap_or(p));
        cells.append(&piece_cells, 0);
    }

    let mut out = UnstructuredGrid::new(
        Points::new(ArrayData::F64(xyz).with_precision(precision))?,
        cells,
    );
    for a in point_arrays {
        out.point_data.insert(a);
    }
    for name in &cell_names {
        let mut merged: Option<FieldArray> = None;
        for g in &grids {
            if let Some(src) = g.cell_data.get(name) {
                match merged.as_mut() {
                    Some(m) => m.data.extend_from(&src.data)?,
                    None => merged = Some(src.clone()),
                }
            }
        }
        if let Some(m) = merged {
            out.cell_data.insert(m);
        }
    }
    out.family = grids.iter().find_map(|g| g.family.clone());
    debug!(
        "appended {} pieces: {} -> {} points, {} cells",
        grids.len(),
        total_in,
        out.num_points(),
        out.num_cells()
    );
    Ok(Mesh::Unstructured(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_invariants::DebugInvariants;

    fn quad_strip(x0: f64) -> Mesh {
        let pts = Points::from_f64(&[
            [x0, 0.0, 0.0],
            [x0 + 1.0, 0.0, 0.0],
            [x0 + 1.0, 1.0, 0.0],
            [x0, 1.0, 0.0],
        ]);
        let mut cells = CellArray::new();
        cells.push(CellType::Quadrilateral, &[0, 1, 2, 3]);
        let mut g = UnstructuredGrid::new(pts, cells);
        g.point_data.insert(FieldArray::scalar(
            "p",
            ArrayData::F64(vec![x0, x0 + 1.0, x0 + 1.0, x0]),
        ));
        g.cell_data
            .insert(FieldArray::scalar("c", ArrayData::I32(vec![x0 as i32])));
        g.cell_data
            .insert(FieldArray::scalar("only_here", ArrayData::I32(vec![1])));
        Mesh::Unstructured(g)
    }

    #[test]
    fn shared_edge_points_merge() {
        let a = quad_strip(0.0);
        let mut b = quad_strip(1.0);
        if let Mesh::Unstructured(g) = &mut b {
            g.cell_data.remove("only_here");
        }
        let merged = append_meshes(&[&a, &b], true).unwrap();
        assert_eq!(merged.num_points(), 6);
        assert_eq!(merged.num_cells(), 2);
        merged.validate_invariants().unwrap();
        assert_eq!(merged.point_data().get("p").unwrap().tuples(), 6);
        assert_eq!(merged.cell_data().names(), vec!["c"]);
    }

    #[test]
    fn no_merge_keeps_duplicates() {
        let merged = append_meshes(&[&quad_strip(0.0), &quad_strip(1.0)], false).unwrap();
        assert_eq!(merged.num_points(), 8);
    }

    #[test]
    fn structured_grid_converts_to_hexes() {
        let mut pts = Vec::new();
        for k in 0..2 {
            for j in 0..3 {
                for i in 0..2 {
                    pts.push([i as f64, j as f64, k as f64]);
                }
            }
        }
        let g = StructuredGrid::new([2, 3, 2], Points::from_f64(&pts)).unwrap();
        let u = structured_to_unstructured(&g);
        assert_eq!(u.num_cells(), 2);
        assert!(u.cells.types().iter().all(|&t| t == CellType::Hexahedron));
        u.validate_invariants().unwrap();
    }
}
