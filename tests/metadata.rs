mod util;

use cgns_sieve::io::{CgnsWriter, WriterOptions};
use cgns_sieve::meta::CgnsMetadata;
use cgns_sieve::mesh::{Block, Mesh, MultiBlock};
use cgns_sieve::mesh_error::CgnsError;
use serial_test::serial;
use std::collections::BTreeMap;
use util::{hex_grid, quad_strip, scratch_dir, single_zone_tree};

#[test]
#[serial]
fn reparse_of_same_path_skips_the_filesystem() {
    let dir = scratch_dir("meta-idempotent");
    let path = dir.join("m.cgns");
    CgnsWriter::default()
        .write(&path, &single_zone_tree("Base", "blk", hex_grid(2, 0.0)))
        .unwrap();

    let mut meta = CgnsMetadata::new();
    assert!(meta.parse(&path).unwrap());
    let first = meta.bases().to_vec();

    // a second parse must not touch the file
    std::fs::remove_file(&path).unwrap();
    assert!(!meta.parse(&path).unwrap());
    assert_eq!(meta.bases(), &first[..]);

    meta.force_reparse();
    assert!(matches!(meta.parse(&path), Err(CgnsError::Io(_))));
    assert_eq!(meta.bases(), &first[..], "failed parse keeps the old summary");
}

#[test]
#[serial]
fn summary_lists_bases_fields_and_reference_state() {
    let dir = scratch_dir("meta-summary");
    let path = dir.join("m.cgns");
    let mut wing = MultiBlock::new();
    wing.push("a", Block::mesh(Mesh::Unstructured(hex_grid(2, 0.0))));
    wing.push("b", Block::mesh(Mesh::Unstructured(hex_grid(2, 5.0))));
    let mut flap = MultiBlock::new();
    flap.push("strip", Block::mesh(Mesh::Unstructured(quad_strip(0, 3))));
    let mut root = MultiBlock::new();
    root.push("Wing", Block::Group(wing));
    root.push("Flap", Block::Group(flap));

    let writer = CgnsWriter::new(WriterOptions {
        time_value: Some(2.5),
        iteration: 40,
        reference_state: BTreeMap::from([("Mach".to_string(), 0.8)]),
        ..Default::default()
    });
    writer.write(&path, &Block::Group(root)).unwrap();

    let mut meta = CgnsMetadata::new();
    meta.parse(&path).unwrap();
    let names: Vec<&str> = meta.bases().iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["Wing", "Flap"]);

    let wing = meta.base("Wing").unwrap();
    assert_eq!(wing.zone_names, vec!["a", "b"]);
    assert_eq!((wing.cell_dim, wing.phys_dim), (3, 3));
    assert_eq!(wing.times, vec![2.5]);
    assert_eq!(wing.iterations, vec![40]);
    assert!(wing.has_time && wing.grid_pointers && wing.solution_pointers);
    assert_eq!(wing.reference_state.get("Mach"), Some(&0.8));
    let point: Vec<&str> = wing.point_fields.keys().map(String::as_str).collect();
    assert_eq!(point, vec!["pressure", "velocity"]);
    let cell: Vec<&str> = wing.cell_fields.keys().map(String::as_str).collect();
    assert_eq!(cell, vec!["density", "momentum"]);

    let flap = meta.base("Flap").unwrap();
    assert_eq!(flap.cell_dim, 2);
    assert!(flap.point_fields.is_empty());
    assert!(flap.cell_fields.contains_key("cell_id"));
    assert_eq!(meta.times(), vec![2.5]);
}

#[test]
#[serial]
fn file_without_time_gets_one_synthetic_step() {
    let dir = scratch_dir("meta-notime");
    let path = dir.join("m.cgns");
    CgnsWriter::default()
        .write(&path, &single_zone_tree("Base", "blk", quad_strip(0, 2)))
        .unwrap();
    let mut meta = CgnsMetadata::new();
    meta.parse(&path).unwrap();
    let base = &meta.bases()[0];
    assert!(!base.has_time);
    assert_eq!(base.times, vec![0.0]);
    assert!(!meta.has_time());
}
