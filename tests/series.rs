mod util;

use cgns_sieve::algs::communicator::NoComm;
use cgns_sieve::io::{CgnsReader, CgnsWriter, WriterOptions};
use cgns_sieve::mesh::{Block, MultiBlock};
use cgns_sieve::series::{FileSeries, SeriesKind};
use serial_test::serial;
use std::path::PathBuf;
use util::{quad_strip, run_ranks, scratch_dir, single_zone_tree, zone_mesh};

fn write_at(path: &PathBuf, time: f64, block: &Block) {
    CgnsWriter::new(WriterOptions {
        time_value: Some(time),
        ..Default::default()
    })
    .write(path, block)
    .unwrap();
}

#[test]
#[serial]
fn increasing_times_form_a_temporal_series() {
    let dir = scratch_dir("series-temporal");
    let paths: Vec<PathBuf> = (0..3).map(|i| dir.join(format!("step{i}.cgns"))).collect();
    for (i, p) in paths.iter().enumerate() {
        write_at(p, i as f64, &single_zone_tree("Base", "blk", quad_strip(i, 1 + i)));
    }

    let series = FileSeries::scan(&paths, false, 64).unwrap();
    assert_eq!(series.kind(), SeriesKind::Temporal);
    assert_eq!(series.times(), &[0.0, 1.0, 2.0]);
    for t in [0.0, 1.0, 1.7, 2.0, 40.0] {
        assert_eq!(series.active_files(t, 0, 1).len(), 1, "time {t}");
    }

    let mut reader = CgnsReader::with_comm(NoComm, paths.clone());
    let info = reader.request_information().unwrap();
    assert_eq!(info.kind, SeriesKind::Temporal);
    assert_eq!(info.times, vec![0.0, 1.0, 2.0]);
    reader.request_update_extent(1.7, 0, 1);
    let out = reader.request_data().unwrap();
    assert_eq!(out.time, 1.0);
    // step1 holds a strip of two quads
    assert_eq!(zone_mesh(&out.tree, "Base", "blk").num_cells(), 2);
}

#[test]
#[serial]
fn ignore_time_orders_files_by_position() {
    let dir = scratch_dir("series-ordinal");
    let paths: Vec<PathBuf> = (0..2).map(|i| dir.join(format!("f{i}.cgns"))).collect();
    // times deliberately decreasing
    write_at(&paths[0], 9.0, &single_zone_tree("Base", "blk", quad_strip(0, 1)));
    write_at(&paths[1], 3.0, &single_zone_tree("Base", "blk", quad_strip(0, 4)));

    let mut reader = CgnsReader::with_comm(NoComm, paths);
    reader.set_ignore_time(true);
    let info = reader.request_information().unwrap();
    assert_eq!(info.times, vec![0.0, 1.0]);
    reader.request_update_extent(1.0, 0, 1);
    let out = reader.request_data().unwrap();
    assert_eq!(zone_mesh(&out.tree, "Base", "blk").num_cells(), 4);
}

fn partitioned_files(name: &str) -> Vec<PathBuf> {
    let dir = scratch_dir(name);
    (0..2)
        .map(|i| {
            let p = dir.join(format!("piece{i}.cgns"));
            write_at(
                &p,
                0.5,
                &single_zone_tree("Base", &format!("wing_proc-{i}"), quad_strip(3 * i, 3)),
            );
            p
        })
        .collect()
}

#[test]
#[serial]
fn zone_suffixes_with_equal_times_are_partitioned() {
    let paths = partitioned_files("series-partitioned");
    let series = FileSeries::scan(&paths, false, 64).unwrap();
    assert!(series.is_partitioned());
    assert_eq!(series.times(), &[0.5]);
    assert_eq!(series.active_files(0.5, 0, 1).len(), 2);

    // one process reads both fragments into one sub-group
    let mut reader = CgnsReader::with_comm(NoComm, paths);
    reader.request_information().unwrap();
    let out = reader.request_data().unwrap();
    let wing = out
        .tree
        .get("Base")
        .and_then(Block::as_group)
        .and_then(|b| b.get("wing"))
        .and_then(Block::as_group)
        .unwrap();
    assert_eq!(wing.names(), vec!["wing_proc-0", "wing_proc-1"]);
    assert!(wing.iter().all(|(_, b)| b.as_mesh().is_some()));
}

#[test]
#[serial]
fn partitioned_read_gives_ranks_identical_shapes() {
    let paths = partitioned_files("series-partitioned-ranks");
    let trees: Vec<MultiBlock> = run_ranks(2, |comm| {
        let mut reader = CgnsReader::with_comm(comm, paths.clone());
        reader.request_information().unwrap();
        reader.request_data().unwrap().tree
    });
    assert_eq!(trees[0].shape(), trees[1].shape());
    for tree in &trees {
        // each rank reads one file; the single slot becomes the zone itself
        let base = tree.get("Base").and_then(Block::as_group).unwrap();
        assert_eq!(base.names(), vec!["wing"]);
        assert!(base.get("wing").and_then(Block::as_mesh).is_some());
    }
    let ids: Vec<_> = trees
        .iter()
        .map(|t| zone_mesh(t, "Base", "wing").cell_data.get("cell_id").unwrap().data.clone())
        .collect();
    assert_ne!(ids[0], ids[1]);
}
