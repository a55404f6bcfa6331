mod util;

use cgns_sieve::io::{CgnsReader, CgnsWriter, ReaderOptions, WriterOptions};
use cgns_sieve::mesh::{
    ArrayData, Block, CellType, Mesh, Points, Precision, StructuredGrid, FieldArray,
};
use cgns_sieve::zone::FieldSelection;
use serial_test::serial;
use util::{hex_grid, scratch_dir, single_zone_tree, two_polyhedra, zone_mesh};

fn read_all(path: &std::path::Path) -> cgns_sieve::io::ReadOutput {
    let mut reader = CgnsReader::new(path);
    reader.request_information().unwrap();
    reader.request_data().unwrap()
}

#[test]
#[serial]
fn hex_grid_of_ten_round_trips() {
    let dir = scratch_dir("hex10");
    let path = dir.join("hex.cgns");
    let grid = hex_grid(10, 0.0);
    CgnsWriter::default()
        .write(&path, &single_zone_tree("Base", "blk", grid.clone()))
        .unwrap();

    let out = read_all(&path);
    assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    let g = zone_mesh(&out.tree, "Base", "blk");
    assert_eq!(g.num_points(), 1000);
    assert_eq!(g.num_cells(), 729);
    assert!(g.cells.types().iter().all(|&t| t == CellType::Hexahedron));
    assert_eq!(g.point_data.len(), 2);
    assert_eq!(g.cell_data.len(), 2);

    for (read, written) in [
        (&g.point_data, &grid.point_data),
        (&g.cell_data, &grid.cell_data),
    ] {
        for w in written.iter() {
            let r = read.get(&w.name).unwrap();
            assert_eq!(r.components, w.components, "{}", w.name);
            assert_eq!(r.tuples(), w.tuples(), "{}", w.name);
            assert_eq!(r.data, w.data, "{}", w.name);
        }
    }
    assert_eq!(g.points, grid.points);
    assert_eq!(g.cells.points(728), grid.cells.points(728));
}

#[test]
#[serial]
fn polyhedral_mesh_round_trips() {
    let dir = scratch_dir("polyhedra");
    let path = dir.join("poly.cgns");
    CgnsWriter::default()
        .write(&path, &single_zone_tree("Base", "cubes", two_polyhedra()))
        .unwrap();

    let out = read_all(&path);
    let g = zone_mesh(&out.tree, "Base", "cubes");
    assert_eq!(g.num_points(), 16);
    assert_eq!(g.num_cells(), 2);
    for c in 0..2 {
        assert_eq!(g.cells.cell_type(c), Some(CellType::Polyhedron));
        let faces = g.cells.polyhedron_faces(c).unwrap();
        assert_eq!(faces.len(), 6);
        assert!(faces.iter().all(|f| f.len() == 4));
        assert_eq!(g.cells.points(c).unwrap().len(), 8);
    }
}

#[test]
#[serial]
fn field_selection_limits_loaded_arrays() {
    let dir = scratch_dir("selection");
    let path = dir.join("sel.cgns");
    CgnsWriter::default()
        .write(&path, &single_zone_tree("Base", "blk", hex_grid(3, 0.0)))
        .unwrap();

    let mut reader = CgnsReader::new(&path);
    reader.set_point_fields(FieldSelection::only(["velocity"]));
    reader.set_cell_fields(FieldSelection::none());
    let info = reader.request_information().unwrap();
    let base = &info.bases[0];
    assert_eq!(base.point_fields.get("velocity"), Some(&true));
    assert_eq!(base.point_fields.get("pressure"), Some(&false));
    assert_eq!(base.cell_fields.get("density"), Some(&false));

    let out = reader.request_data().unwrap();
    let g = zone_mesh(&out.tree, "Base", "blk");
    assert_eq!(g.point_data.names(), vec!["velocity"]);
    assert_eq!(g.point_data.get("velocity").unwrap().components, 3);
    assert!(g.cell_data.is_empty());
}

#[test]
#[serial]
fn single_precision_request_narrows_coordinates() {
    let dir = scratch_dir("precision");
    let path = dir.join("p.cgns");
    CgnsWriter::default()
        .write(&path, &single_zone_tree("Base", "blk", hex_grid(2, 0.0)))
        .unwrap();

    let mut reader = CgnsReader::new(&path);
    reader.set_precision(Precision::Single);
    reader.request_information().unwrap();
    let out = reader.request_data().unwrap();
    let g = zone_mesh(&out.tree, "Base", "blk");
    assert_eq!(g.points.precision(), Precision::Single);
    assert_eq!(g.points.get(7), Some([1.0, 1.0, 1.0]));
}

#[test]
#[serial]
fn structured_zone_round_trips_with_rindless_fields() {
    let dir = scratch_dir("structured");
    let path = dir.join("s.cgns");
    let extent = [4, 3, 2];
    let mut xyz = Vec::new();
    for k in 0..extent[2] {
        for j in 0..extent[1] {
            for i in 0..extent[0] {
                xyz.push([i as f64, j as f64, k as f64]);
            }
        }
    }
    let mut sg = StructuredGrid::new(extent, Points::from_f64(&xyz)).unwrap();
    sg.point_data.insert(FieldArray::scalar(
        "T",
        ArrayData::F64((0..24).map(f64::from).collect()),
    ));
    sg.cell_data.insert(FieldArray::scalar(
        "vol",
        ArrayData::F64(vec![1.0; 6]),
    ));
    let writer = CgnsWriter::new(WriterOptions {
        time_value: Some(0.5),
        ..Default::default()
    });
    writer.write(&path, &Block::mesh(Mesh::Structured(sg.clone()))).unwrap();

    let mut reader = CgnsReader::new(&path);
    let info = reader.request_information().unwrap();
    assert_eq!(info.times, vec![0.5]);
    reader.request_update_extent(0.5, 0, 1);
    let out = reader.request_data().unwrap();
    let base = out.tree.get("Base").and_then(Block::as_group).unwrap();
    let Some(Mesh::Structured(read)) = base.get("Zone").and_then(Block::as_mesh) else {
        panic!("expected a structured zone");
    };
    assert_eq!(read.extent, extent);
    assert_eq!(read.num_cells(), 6);
    assert_eq!(read.point_data.get("T"), sg.point_data.get("T"));
    assert_eq!(read.cell_data.get("vol"), sg.cell_data.get("vol"));
}

#[test]
#[serial]
fn patches_group_interior_and_boundary() {
    let dir = scratch_dir("patches");
    let path = dir.join("p.cgns");
    CgnsWriter::default()
        .write(&path, &single_zone_tree("Base", "blk", hex_grid(2, 0.0)))
        .unwrap();

    let mut reader = CgnsReader::with_comm(
        cgns_sieve::algs::NoComm,
        vec![path.clone()],
    );
    reader.set_options(ReaderOptions {
        load_patches: true,
        ..Default::default()
    });
    reader.request_information().unwrap();
    let out = reader.request_data().unwrap();
    let zone = out
        .tree
        .get("Base")
        .and_then(Block::as_group)
        .and_then(|b| b.get("blk"))
        .and_then(Block::as_group)
        .unwrap();
    assert_eq!(zone.names(), vec!["Internal", "Patches"]);
    let interior = zone.get("Internal").and_then(Block::as_mesh).unwrap();
    assert_eq!(
        interior.cell_data().get("ispatch").map(|a| &a.data),
        Some(&ArrayData::U8(vec![0]))
    );
}
