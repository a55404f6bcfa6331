//! File-series manager.
//!
//! A reader may be pointed at several files. [`FileSeries`] records each
//! file's times and partition marker, decides whether the list is a time
//! series or a partitioned data set, and answers which files a piece must
//! read for a requested time. [`SeriesCache`] keeps the descriptor until
//! the file list or the reader's settings change.

pub mod classify;

pub use classify::{SeriesKind, classify, file_partition_marker, zone_partition_marker};

use crate::algs::collective::{TAG_SERIES, broadcast_bytes, is_serial};
use crate::algs::communicator::Communicator;
use crate::meta::CgnsMetadata;
use crate::mesh_error::CgnsError;
use classify::{FileTimes, uses_ordinal_time};
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Discovered facts about one file of a series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesFile {
    pub path: PathBuf,
    /// Stored times, sorted; `[0.0]` when the file has none.
    pub times: Vec<f64>,
    pub has_time: bool,
    /// Partition index from the file name or its zone names.
    pub marker: Option<usize>,
}

impl SeriesFile {
    /// Read the metadata of `path`.
    pub fn scan(path: &Path, handle_capacity: usize) -> Result<Self, CgnsError> {
        let mut meta = CgnsMetadata::with_handle_capacity(handle_capacity);
        meta.parse(path)?;
        let marker = file_partition_marker(path).or_else(|| {
            zone_partition_marker(
                meta.bases()
                    .iter()
                    .flat_map(|b| b.zone_names.iter().map(String::as_str)),
            )
        });
        Ok(Self {
            path: path.to_path_buf(),
            times: meta.times(),
            has_time: meta.has_time(),
            marker,
        })
    }
}

/// One file a piece has to read, and the time to look up inside it.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveFile {
    /// Position in the series.
    pub index: usize,
    pub path: PathBuf,
    /// In-file time to resolve steps with; `None` selects the first step.
    pub time: Option<f64>,
}

/// Classified file list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileSeries {
    files: Vec<SeriesFile>,
    kind: SeriesKind,
    ordinal: bool,
    times: Vec<f64>,
}

impl FileSeries {
    pub fn from_files(files: Vec<SeriesFile>, ignore_time: bool) -> Self {
        let views: Vec<FileTimes<'_>> = files
            .iter()
            .map(|f| FileTimes {
                times: &f.times,
                has_time: f.has_time,
                marker: f.marker,
            })
            .collect();
        let kind = classify(&views, ignore_time);
        let ordinal = uses_ordinal_time(&views, ignore_time);
        let times = match (kind, ordinal) {
            (SeriesKind::Temporal, true) => (0..files.len()).map(|i| i as f64).collect(),
            (SeriesKind::Temporal, false) => files
                .iter()
                .flat_map(|f| f.times.iter().copied())
                .sorted_by(f64::total_cmp)
                .dedup()
                .collect(),
            (SeriesKind::Partitioned, true) => vec![0.0],
            (SeriesKind::Partitioned, false) => {
                files.first().map(|f| f.times.clone()).unwrap_or_default()
            }
        };
        info!(
            "series of {} files: {:?}, {} time values{}",
            files.len(),
            kind,
            times.len(),
            if ordinal { " (file ordinals)" } else { "" }
        );
        Self {
            files,
            kind,
            ordinal,
            times,
        }
    }

    /// Scan every file and classify the list.
    pub fn scan(
        paths: &[PathBuf],
        ignore_time: bool,
        handle_capacity: usize,
    ) -> Result<Self, CgnsError> {
        if paths.is_empty() {
            return Err(CgnsError::Parse("empty file list".into()));
        }
        let files = paths
            .iter()
            .map(|p| SeriesFile::scan(p, handle_capacity))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_files(files, ignore_time))
    }

    /// Scan on rank 0 and share the descriptor. A scan failure on rank 0
    /// is reported on every rank.
    pub fn scan_collective<C: Communicator>(
        comm: &C,
        paths: &[PathBuf],
        ignore_time: bool,
        handle_capacity: usize,
    ) -> Result<Self, CgnsError> {
        if is_serial(comm) {
            return Self::scan(paths, ignore_time, handle_capacity);
        }
        let payload = if comm.rank() == 0 {
            let scanned: Result<Self, String> =
                Self::scan(paths, ignore_time, handle_capacity).map_err(|e| e.to_string());
            serde_json::to_vec(&scanned)?
        } else {
            Vec::new()
        };
        let bytes = broadcast_bytes(comm, 0, TAG_SERIES, payload)?;
        let scanned: Result<Self, String> = serde_json::from_slice(&bytes)?;
        scanned.map_err(CgnsError::Parse)
    }

    pub fn files(&self) -> &[SeriesFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn kind(&self) -> SeriesKind {
        self.kind
    }

    pub fn is_partitioned(&self) -> bool {
        self.kind == SeriesKind::Partitioned
    }

    /// `true` when file ordinals stand in for times.
    pub fn uses_ordinal_time(&self) -> bool {
        self.ordinal
    }

    /// Global time values, sorted.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// The largest global time not exceeding `t`, clamped to the range.
    pub fn resolve_time(&self, t: f64) -> f64 {
        match self.times.iter().rposition(|&v| v <= t) {
            Some(i) => self.times[i],
            None => self.times.first().copied().unwrap_or(0.0),
        }
    }

    /// Files `piece` of `npieces` reads at time `t`.
    ///
    /// Temporal series: the one file holding the resolved time (the last
    /// such file when several do), read by every piece. Partitioned
    /// series: a contiguous, balanced share of the files; pieces beyond
    /// the file count get none.
    pub fn active_files(&self, t: f64, piece: usize, npieces: usize) -> Vec<ActiveFile> {
        if self.files.is_empty() {
            return Vec::new();
        }
        let t = self.resolve_time(t);
        match self.kind {
            SeriesKind::Temporal => {
                let index = if self.ordinal {
                    (t.max(0.0) as usize).min(self.files.len() - 1)
                } else {
                    self.files
                        .iter()
                        .rposition(|f| f.times.contains(&t))
                        .unwrap_or(0)
                };
                debug!("time {t}: temporal file {index}");
                vec![ActiveFile {
                    index,
                    path: self.files[index].path.clone(),
                    time: (!self.ordinal).then_some(t),
                }]
            }
            SeriesKind::Partitioned => {
                let npieces = npieces.max(1);
                let n = self.files.len();
                let lo = piece * n / npieces;
                let hi = ((piece + 1) * n / npieces).min(n);
                (lo..hi)
                    .map(|index| ActiveFile {
                        index,
                        path: self.files[index].path.clone(),
                        time: (!self.ordinal).then_some(t),
                    })
                    .collect()
            }
        }
    }
}

/// Memoized [`FileSeries`], rebuilt when the file list, the time mode or
/// the caller's settings stamp changes.
#[derive(Debug, Default)]
pub struct SeriesCache {
    key: Option<(u64, Vec<PathBuf>, bool)>,
    series: Option<FileSeries>,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_scan<C: Communicator>(
        &mut self,
        comm: &C,
        stamp: u64,
        paths: &[PathBuf],
        ignore_time: bool,
        handle_capacity: usize,
    ) -> Result<&FileSeries, CgnsError> {
        let key = (stamp, paths.to_vec(), ignore_time);
        if self.key.as_ref() != Some(&key) || self.series.is_none() {
            let series = FileSeries::scan_collective(comm, paths, ignore_time, handle_capacity)?;
            self.series = Some(series);
            self.key = Some(key);
        } else {
            debug!("series descriptor for stamp {stamp} is current");
        }
        self.series
            .as_ref()
            .ok_or_else(|| CgnsError::Parse("series descriptor missing".into()))
    }

    pub fn invalidate(&mut self) {
        self.key = None;
        self.series = None;
    }
}
