mod util;

use cgns_sieve::algs::{Communicator, barrier};
use cgns_sieve::io::{CgnsReader, CgnsWriter, WriterOptions, write_parallel};
use cgns_sieve::mesh::{Block, Mesh, MultiBlock};
use cgns_sieve::partition::{FragmentCollector, reassemble};
use cgns_sieve::zone::{INTERNAL_BLOCK, PATCHES_BLOCK};
use serial_test::serial;
use util::{quad_strip, run_ranks, scratch_dir, single_zone_tree, zone_mesh};

fn leaf() -> Block {
    Block::mesh(Mesh::Unstructured(quad_strip(0, 1)))
}

#[test]
fn reconciliation_pads_missing_zones_on_every_rank() {
    let zones: [&[&str]; 3] = [&["X", "Y"], &["X"], &["X", "Y", "Z"]];
    let trees = run_ranks(3, |comm| {
        let mut c = FragmentCollector::new();
        for z in zones[comm.rank()] {
            c.add("Base", z, 0, leaf());
        }
        reassemble(&comm, c).unwrap()
    });
    for tree in &trees {
        let base = tree.get("Base").and_then(Block::as_group).unwrap();
        assert_eq!(base.names(), vec!["X", "Y", "Z"]);
        assert_eq!(tree.shape(), trees[0].shape());
    }
    let empty = |rank: usize, zone: &str| {
        trees[rank]
            .get("Base")
            .and_then(Block::as_group)
            .and_then(|b| b.get(zone))
            .is_some_and(Block::is_empty)
    };
    assert!(!empty(0, "Y") && empty(0, "Z"));
    assert!(empty(1, "Y") && empty(1, "Z"));
    assert!(!empty(2, "Z"));
}

#[test]
fn fragment_counts_are_padded_to_the_maximum() {
    let trees = run_ranks(2, |comm| {
        let mut c = FragmentCollector::new();
        if comm.rank() == 0 {
            c.add("Base", "blk_proc-0", 0, leaf());
            c.add("Base", "blk_proc-1", 1, leaf());
        } else {
            c.add("Base", "blk_proc-2", 2, leaf());
        }
        reassemble(&comm, c).unwrap()
    });
    assert_eq!(trees[0].shape(), trees[1].shape());
    let slots = |t: &MultiBlock| {
        t.get("Base")
            .and_then(Block::as_group)
            .and_then(|b| b.get("blk"))
            .and_then(Block::as_group)
            .map(|g| g.iter().map(|(_, b)| !b.is_empty()).collect::<Vec<_>>())
            .unwrap()
    };
    assert_eq!(slots(&trees[0]), vec![true, true]);
    assert_eq!(slots(&trees[1]), vec![true, false]);
}

#[test]
#[serial]
fn zones_of_one_file_are_dealt_out_to_ranks() {
    let dir = scratch_dir("distributed-zones");
    let path = dir.join("three.cgns");
    let mut zones = MultiBlock::new();
    for (i, name) in ["a", "b", "c"].iter().enumerate() {
        zones.push(*name, Block::mesh(Mesh::Unstructured(quad_strip(0, i + 1))));
    }
    let mut root = MultiBlock::new();
    root.push("Base", Block::Group(zones));
    CgnsWriter::default().write(&path, &Block::Group(root)).unwrap();

    let trees = run_ranks(2, |comm| {
        let mut reader = CgnsReader::with_comm(comm, vec![path.clone()]);
        reader.request_information().unwrap();
        reader.request_data().unwrap().tree
    });
    assert_eq!(trees[0].shape(), trees[1].shape());
    let owned = |t: &MultiBlock| -> Vec<String> {
        let base = t.get("Base").and_then(Block::as_group).unwrap();
        base.iter()
            .filter(|(_, b)| !b.is_empty())
            .map(|(n, _)| n.to_string())
            .collect()
    };
    // rank 0 gets [0, 1), rank 1 gets [1, 3)
    assert_eq!(owned(&trees[0]), vec!["a"]);
    assert_eq!(owned(&trees[1]), vec!["b", "c"]);
}

#[test]
#[serial]
fn two_rank_write_merges_shared_boundary_points() {
    let dir = scratch_dir("parallel-write");
    let path = dir.join("merged.cgns");
    let results = run_ranks(2, |comm| {
        let rank = comm.rank();
        // rank 0 covers x in [0, 2], rank 1 covers x in [2, 5]
        let local = if rank == 0 {
            single_zone_tree("Base", "strip", quad_strip(0, 2))
        } else {
            single_zone_tree("Base", "strip", quad_strip(2, 3))
        };
        write_parallel(&comm, &CgnsWriter::default(), &path, &local)
    });
    assert!(results.iter().all(Result::is_ok), "{results:?}");

    let mut reader = CgnsReader::new(&path);
    reader.request_information().unwrap();
    let out = reader.request_data().unwrap();
    let g = zone_mesh(&out.tree, "Base", "strip");
    // 6 + 8 points with the two at x = 2 shared
    assert_eq!(g.num_points(), 12);
    assert_eq!(g.num_cells(), 5);
    assert_eq!(g.cell_data.get("cell_id").unwrap().tuples(), 5);
}

#[test]
#[serial]
fn mismatched_shapes_fail_on_every_rank() {
    let dir = scratch_dir("parallel-write-mismatch");
    let path = dir.join("bad.cgns");
    let results = run_ranks(2, |comm| {
        let rank = comm.rank();
        let local = if rank == 0 {
            single_zone_tree("Base", "strip", quad_strip(0, 1))
        } else {
            single_zone_tree("Other", "strip", quad_strip(0, 1))
        };
        write_parallel(&comm, &CgnsWriter::default(), &path, &local)
    });
    assert!(results.iter().all(Result::is_err));
    assert!(!path.exists());
}

#[test]
#[serial]
fn patch_groups_have_one_shape_on_every_rank() {
    let dir = scratch_dir("distributed-patches");
    let path = dir.join("two.cgns");
    let out = dir.join("rewritten.cgns");
    let mut zones = MultiBlock::new();
    zones.push("a", Block::mesh(Mesh::Unstructured(quad_strip(0, 1))));
    zones.push("b", Block::mesh(Mesh::Unstructured(quad_strip(0, 2))));
    let mut root = MultiBlock::new();
    root.push("Base", Block::Group(zones));
    CgnsWriter::default().write(&path, &Block::Group(root)).unwrap();

    let trees = run_ranks(2, |comm| {
        let mut reader = CgnsReader::with_comm(comm.clone(), vec![path.clone()]);
        reader.set_load_patches(true);
        reader.request_information().unwrap();
        let tree = reader.request_data().unwrap().tree;
        let written = write_parallel(&comm, &CgnsWriter::default(), &out, &Block::Group(tree.clone()));
        (tree, written)
    });
    assert!(trees.iter().all(|(_, w)| w.is_ok()), "{trees:?}");
    assert_eq!(trees[0].0.shape(), trees[1].0.shape());

    // rank 1 does not own `a` but still holds its zone group
    let a = trees[1]
        .0
        .get("Base")
        .and_then(Block::as_group)
        .and_then(|b| b.get("a"))
        .and_then(Block::as_group)
        .unwrap();
    assert!(a.get(INTERNAL_BLOCK).is_some_and(Block::is_empty));
    assert!(a.get(PATCHES_BLOCK).and_then(Block::as_group).is_some());

    let mut reader = CgnsReader::new(&out);
    reader.request_information().unwrap();
    let back = reader.request_data().unwrap().tree;
    let cells: Vec<usize> = back.leaves().iter().map(|(_, m)| m.num_cells()).collect();
    assert_eq!(cells, vec![1, 2]);
}

#[test]
#[serial]
fn unreadable_piece_fails_every_rank() {
    let dir = scratch_dir("partitioned-unreadable");
    let paths: Vec<_> = (0..2)
        .map(|i| {
            let p = dir.join(format!("piece{i}.cgns"));
            let writer = CgnsWriter::new(WriterOptions {
                time_value: Some(0.5),
                ..Default::default()
            });
            writer
                .write(
                    &p,
                    &single_zone_tree("Base", &format!("wing_proc-{i}"), quad_strip(3 * i, 3)),
                )
                .unwrap();
            p
        })
        .collect();

    let results = run_ranks(2, |comm| {
        let mut reader = CgnsReader::with_comm(comm.clone(), paths.clone());
        reader.request_information().unwrap();
        barrier(&comm)?;
        if comm.rank() == 0 {
            std::fs::write(&paths[1], b"not a cgns file").unwrap();
        }
        barrier(&comm)?;
        reader.request_data().map(|out| out.tree)
    });
    assert!(results.iter().all(Result::is_err), "{results:?}");
}
