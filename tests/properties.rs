use cgns_sieve::node::DataType;
use cgns_sieve::partition::{fragment_name, split_partition_suffix};
use cgns_sieve::series::{FileSeries, SeriesFile, SeriesKind};
use cgns_sieve::zone::{FieldGroup, group_components};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

proptest! {
    #[test]
    fn suffix_split_recovers_name_and_index(name in "[a-z][a-z0-9_]{0,12}", n in 0usize..100_000) {
        let full = fragment_name(&name, n);
        prop_assert_eq!(split_partition_suffix(&full), (name.as_str(), Some(n)));
    }

    #[test]
    fn names_without_numeric_tail_are_untouched(name in "[a-z_-]{0,16}") {
        prop_assert_eq!(split_partition_suffix(&name), (name.as_str(), None));
    }

    #[test]
    fn grouping_keeps_every_array_exactly_once(
        arrays in prop::collection::btree_map("[A-C]{1,2}[XYZ]?", prop::bool::ANY, 0..12),
        phys_dim in 2usize..=3,
    ) {
        let listed: Vec<(String, DataType)> = arrays
            .iter()
            .map(|(n, wide)| (n.clone(), if *wide { DataType::Float64 } else { DataType::Float32 }))
            .collect();
        let groups = group_components(&listed, phys_dim);
        let mut seen = Vec::new();
        for g in &groups {
            match g {
                FieldGroup::Scalar(n) => seen.push(n.clone()),
                FieldGroup::Vector { components, .. } => {
                    let types: BTreeSet<_> = components
                        .iter()
                        .map(|c| arrays[c])
                        .collect();
                    prop_assert_eq!(types.len(), 1);
                    prop_assert!(components.len() >= phys_dim);
                    seen.extend(components.iter().cloned());
                }
            }
        }
        seen.sort();
        let expected: Vec<String> = arrays.keys().cloned().collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn temporal_times_are_sorted_and_unique(
        steps in prop::collection::vec(prop::collection::vec(0u8..20, 1..4), 1..5),
    ) {
        let files: Vec<SeriesFile> = steps
            .iter()
            .enumerate()
            .map(|(i, ts)| {
                let mut times: Vec<f64> = ts.iter().map(|&t| f64::from(t) + i as f64 * 100.0).collect();
                times.sort_by(f64::total_cmp);
                times.dedup();
                SeriesFile { path: PathBuf::from(format!("f{i}")), times, has_time: true, marker: None }
            })
            .collect();
        let all: BTreeMap<u64, f64> = files
            .iter()
            .flat_map(|f| f.times.iter().map(|t| (t.to_bits(), *t)))
            .collect();
        let series = FileSeries::from_files(files, false);
        prop_assert_eq!(series.kind(), SeriesKind::Temporal);
        prop_assert!(series.times().windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(series.times().len(), all.len());
        for &t in series.times() {
            prop_assert_eq!(series.active_files(t, 0, 1).len(), 1);
        }
    }
}
