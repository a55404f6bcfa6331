#![allow(dead_code)]
use cgns_sieve::algs::communicator::LocalComm;
use cgns_sieve::mesh::{
    ArrayData, Block, CellArray, CellType, FieldArray, Mesh, MultiBlock, Points, UnstructuredGrid,
};
use std::path::PathBuf;

/// Fresh, empty scratch directory unique to `name`.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("cgns-sieve-tests")
        .join(format!("{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Run `f` on `size` thread ranks and collect results in rank order.
pub fn run_ranks<T: Send>(size: usize, f: impl Fn(LocalComm) -> T + Sync) -> Vec<T> {
    let comms = LocalComm::universe(size);
    std::thread::scope(|s| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|c| {
                let f = &f;
                s.spawn(move || f(c))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

/// `n x n x n` points on the unit lattice as an unstructured hex grid,
/// x offset by `x0`. Carries `pressure` and `velocity` on points,
/// `density` and `momentum` on cells.
pub fn hex_grid(n: usize, x0: f64) -> UnstructuredGrid {
    let mut pts = Vec::with_capacity(n * n * n);
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                pts.push([x0 + i as f64, j as f64, k as f64]);
            }
        }
    }
    let id = |i: usize, j: usize, k: usize| (i + n * (j + n * k)) as i64;
    let mut cells = CellArray::new();
    for k in 0..n - 1 {
        for j in 0..n - 1 {
            for i in 0..n - 1 {
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
    let npts = pts.len();
    let ncells = cells.len();
    let mut g = UnstructuredGrid::new(Points::from_f64(&pts), cells);
    g.point_data.insert(FieldArray::scalar(
        "pressure",
        ArrayData::F64(pts.iter().map(|p| p[0] + 2.0 * p[1]).collect()),
    ));
    g.point_data.insert(
        FieldArray::new(
            "velocity",
            3,
            ArrayData::F64(pts.iter().flatten().map(|v| v * 0.5).collect()),
        )
        .unwrap(),
    );
    g.cell_data.insert(FieldArray::scalar(
        "density",
        ArrayData::F64((0..ncells).map(|c| 1.0 + c as f64).collect()),
    ));
    g.cell_data.insert(
        FieldArray::new(
            "momentum",
            3,
            ArrayData::F64((0..3 * ncells).map(|v| v as f64 * 0.25).collect()),
        )
        .unwrap(),
    );
    assert_eq!(npts, n * n * n);
    g
}

/// Two disjoint unit cubes stored as polyhedra: 16 points, 2 cells.
pub fn two_polyhedra() -> UnstructuredGrid {
    let mut pts = Vec::new();
    let mut cells = CellArray::new();
    for c in 0..2 {
        let x0 = 2.0 * c as f64;
        let b = (8 * c) as i64;
        for k in 0..2 {
            for j in 0..2 {
                for i in 0..2 {
                    pts.push([x0 + i as f64, j as f64, k as f64]);
                }
            }
        }
        cells.push_polyhedron(&[
            vec![b, b + 2, b + 3, b + 1],
            vec![b + 4, b + 5, b + 7, b + 6],
            vec![b, b + 1, b + 5, b + 4],
            vec![b + 2, b + 6, b + 7, b + 3],
            vec![b, b + 4, b + 6, b + 2],
            vec![b + 1, b + 3, b + 7, b + 5],
        ]);
    }
    UnstructuredGrid::new(Points::from_f64(&pts), cells)
}

/// A row of `len` unit quads starting at `x0`, with a `cell_id` cell field.
pub fn quad_strip(x0: usize, len: usize) -> UnstructuredGrid {
    let mut pts = Vec::new();
    for j in 0..2 {
        for i in 0..=len {
            pts.push([(x0 + i) as f64, j as f64, 0.0]);
        }
    }
    let row = (len + 1) as i64;
    let mut cells = CellArray::new();
    for i in 0..len as i64 {
        cells.push(CellType::Quadrilateral, &[i, i + 1, row + i + 1, row + i]);
    }
    let mut g = UnstructuredGrid::new(Points::from_f64(&pts), cells);
    g.cell_data.insert(FieldArray::scalar(
        "cell_id",
        ArrayData::I32((0..len as i32).map(|i| x0 as i32 + i).collect()),
    ));
    g
}

/// A one-group tree `{ base: { zone: mesh } }`.
pub fn single_zone_tree(base: &str, zone: &str, mesh: UnstructuredGrid) -> Block {
    let mut zones = MultiBlock::new();
    zones.push(zone, Block::mesh(Mesh::Unstructured(mesh)));
    let mut root = MultiBlock::new();
    root.push(base, Block::Group(zones));
    Block::Group(root)
}

/// The unstructured leaf at `base/zone` of a reader tree.
pub fn zone_mesh<'a>(tree: &'a MultiBlock, base: &str, zone: &str) -> &'a UnstructuredGrid {
    match tree
        .get(base)
        .and_then(Block::as_group)
        .and_then(|g| g.get(zone))
        .and_then(Block::as_mesh)
    {
        Some(Mesh::Unstructured(g)) => g,
        other => panic!("no unstructured zone at {base}/{zone}: {other:?}"),
    }
}
