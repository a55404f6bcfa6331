//! Temporal versus partitioned classification of a file list.

use crate::partition::split_partition_suffix;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the files of a series relate to each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesKind {
    /// One file per time step (or group of steps); one file is active.
    Temporal,
    /// Every file holds a piece of the same domain; all are active.
    Partitioned,
}

/// Partition index carried by the file stem, e.g. `flow_proc-3.cgns`.
pub fn file_partition_marker(path: &Path) -> Option<usize> {
    let stem = path.file_stem()?.to_str()?;
    split_partition_suffix(stem).1
}

/// Partition index shared by a file's zone names, if all suffixed zones
/// agree on one.
pub fn zone_partition_marker<'a>(zones: impl IntoIterator<Item = &'a str>) -> Option<usize> {
    let mut found = None;
    for z in zones {
        if let (_, Some(n)) = split_partition_suffix(z) {
            match found {
                None => found = Some(n),
                Some(m) if m != n => return None,
                Some(_) => {}
            }
        }
    }
    found
}

/// What classification needs to know about one file.
#[derive(Clone, Debug, PartialEq)]
pub struct FileTimes<'a> {
    pub times: &'a [f64],
    pub has_time: bool,
    pub marker: Option<usize>,
}

/// Decide the series kind.
///
/// More than one file is partitioned when every file carries a distinct
/// partition marker and the files agree on their times (or times are
/// ignored), or when no file carries a marker but all files store the
/// same real times. Anything else is temporal.
pub fn classify(files: &[FileTimes<'_>], ignore_time: bool) -> SeriesKind {
    if files.len() < 2 {
        return SeriesKind::Temporal;
    }
    let same_times = files.iter().all(|f| f.times == files[0].times);
    let mut markers: Vec<usize> = files.iter().filter_map(|f| f.marker).collect();
    if markers.len() == files.len() {
        markers.sort_unstable();
        markers.dedup();
        if markers.len() == files.len() && (ignore_time || same_times) {
            return SeriesKind::Partitioned;
        }
        return SeriesKind::Temporal;
    }
    if markers.is_empty() && !ignore_time && same_times && files.iter().all(|f| f.has_time) {
        return SeriesKind::Partitioned;
    }
    SeriesKind::Temporal
}

/// `true` when file ordinals replace stored times.
pub fn uses_ordinal_time(files: &[FileTimes<'_>], ignore_time: bool) -> bool {
    ignore_time || files.iter().any(|f| !f.has_time)
}
