//! Distributed CGNS reader.
//!
//! The reader follows a three-request pipeline:
//!
//! 1. [`CgnsReader::request_information`] scans the file list, classifies
//!    it as a time series or a partitioned data set, and summarizes the
//!    first file on rank 0 for every rank.
//! 2. [`CgnsReader::request_update_extent`] records the requested time and
//!    the piece this rank produces.
//! 3. [`CgnsReader::request_data`] materializes the piece as a
//!    [`MultiBlock`] with one group per base.
//!
//! Every rank receives a tree of the same shape. A single file's zones are
//! dealt out to pieces in contiguous ranges; a partitioned series deals out
//! whole files and stitches `_proc-N` fragments back under their zone.
//! Whatever a rank does not own is an [`Block::Empty`] slot, or a group of
//! them when the owner's slot is a group (zones with boundary patches).

use crate::algs::collective::{TAG_METADATA, TAG_READ_STATUS, broadcast_bytes, share_outcome};
use crate::algs::communicator::{Communicator, NoComm};
use crate::debug_invariants::DebugInvariants;
use crate::mesh::{Block, MultiBlock, Precision};
use crate::mesh_error::CgnsError;
use crate::meta::{BaseInfo, CgnsMetadata, summarize_base};
use crate::node::{CgnsFile, DEFAULT_HANDLE_CAPACITY, Label};
use crate::partition::{FragmentCollector, align_layouts, reassemble};
use crate::series::{ActiveFile, FileSeries, SeriesCache, SeriesKind};
use crate::zone::{FieldSelection, ReadRequest, ReadWarning, read_zone};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reader settings. Changing any of them through the reader invalidates
/// the memoized series descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    pub point_fields: FieldSelection,
    pub cell_fields: FieldSelection,
    /// Bases to load; unselected bases become empty groups.
    pub bases: FieldSelection,
    pub load_patches: bool,
    pub precision: Precision,
    /// Treat files as ordered steps regardless of stored times.
    pub ignore_time: bool,
    pub handle_capacity: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            point_fields: FieldSelection::all(),
            cell_fields: FieldSelection::all(),
            bases: FieldSelection::all(),
            load_patches: false,
            precision: Precision::Double,
            ignore_time: false,
            handle_capacity: DEFAULT_HANDLE_CAPACITY,
        }
    }
}

/// Result of [`CgnsReader::request_information`].
#[derive(Clone, Debug, PartialEq)]
pub struct ReaderInformation {
    pub kind: SeriesKind,
    pub file_count: usize,
    /// Time values the pipeline may request.
    pub times: Vec<f64>,
    /// Base summaries of the first file, with field flags reflecting the
    /// current selections.
    pub bases: Vec<BaseInfo>,
}

/// Time and piece requested downstream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateExtent {
    pub time: f64,
    pub piece: usize,
    pub pieces: usize,
}

/// One materialized piece.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadOutput {
    pub tree: MultiBlock,
    /// Time actually loaded after clamping to the available values.
    pub time: f64,
    pub warnings: Vec<ReadWarning>,
}

/// Reader over one file or a file series.
#[derive(Debug)]
pub struct CgnsReader<C: Communicator = NoComm> {
    comm: C,
    files: Vec<PathBuf>,
    options: ReaderOptions,
    stamp: u64,
    series: SeriesCache,
    metadata: CgnsMetadata,
    extent: Option<UpdateExtent>,
}

impl CgnsReader<NoComm> {
    /// Serial reader of a single file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_comm(NoComm, vec![path.into()])
    }
}

impl<C: Communicator> CgnsReader<C> {
    pub fn with_comm(comm: C, files: Vec<PathBuf>) -> Self {
        let options = ReaderOptions::default();
        Self {
            comm,
            files,
            metadata: CgnsMetadata::with_handle_capacity(options.handle_capacity),
            options,
            stamp: 0,
            series: SeriesCache::new(),
            extent: None,
        }
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Settings generation; bumped by every setter.
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    pub fn metadata(&self) -> &CgnsMetadata {
        &self.metadata
    }

    fn touch(&mut self) {
        self.stamp += 1;
    }

    pub fn set_files(&mut self, files: Vec<PathBuf>) {
        self.files = files;
        self.metadata.force_reparse();
        self.touch();
    }

    pub fn set_options(&mut self, options: ReaderOptions) {
        if options.handle_capacity != self.options.handle_capacity {
            self.metadata = CgnsMetadata::with_handle_capacity(options.handle_capacity);
        }
        self.options = options;
        self.touch();
    }

    pub fn set_point_fields(&mut self, selection: FieldSelection) {
        self.options.point_fields = selection;
        self.touch();
    }

    pub fn set_cell_fields(&mut self, selection: FieldSelection) {
        self.options.cell_fields = selection;
        self.touch();
    }

    pub fn set_load_patches(&mut self, on: bool) {
        self.options.load_patches = on;
        self.touch();
    }

    pub fn set_ignore_time(&mut self, on: bool) {
        self.options.ignore_time = on;
        self.touch();
    }

    pub fn set_precision(&mut self, precision: Precision) {
        self.options.precision = precision;
        self.touch();
    }

    fn series(&mut self) -> Result<&FileSeries, CgnsError> {
        self.series.get_or_scan(
            &self.comm,
            self.stamp,
            &self.files,
            self.options.ignore_time,
            self.options.handle_capacity,
        )
    }

    /// Summarize the first file on rank 0 and share it. Every rank sees
    /// the same outcome, error included.
    fn load_metadata(&mut self) -> Result<(), CgnsError> {
        let first = self
            .files
            .first()
            .cloned()
            .ok_or_else(|| CgnsError::Parse("empty file list".into()))?;
        let status = if self.comm.rank() == 0 {
            match self.metadata.parse(&first) {
                Ok(_) => Vec::new(),
                Err(e) => e.to_string().into_bytes(),
            }
        } else {
            Vec::new()
        };
        let status = broadcast_bytes(&self.comm, 0, TAG_METADATA.offset(8), status)?;
        if !status.is_empty() {
            return Err(CgnsError::Parse(String::from_utf8_lossy(&status).into_owned()));
        }
        self.metadata.broadcast(&self.comm, 0)?;
        let (points, cells) = (&self.options.point_fields, &self.options.cell_fields);
        for base in self.metadata.bases_mut() {
            for (name, flag) in base.point_fields.iter_mut() {
                *flag = points.is_selected(name);
            }
            for (name, flag) in base.cell_fields.iter_mut() {
                *flag = cells.is_selected(name);
            }
        }
        Ok(())
    }

    /// Scan and classify the files and summarize their structure.
    pub fn request_information(&mut self) -> Result<ReaderInformation, CgnsError> {
        let (kind, file_count, times) = {
            let s = self.series()?;
            (s.kind(), s.len(), s.times().to_vec())
        };
        self.load_metadata()?;
        info!(
            "rank {}: {} file(s), {:?}, {} time value(s)",
            self.comm.rank(),
            file_count,
            kind,
            times.len()
        );
        Ok(ReaderInformation {
            kind,
            file_count,
            times,
            bases: self.metadata.bases().to_vec(),
        })
    }

    /// Request `time` for `piece` of `pieces`.
    pub fn request_update_extent(&mut self, time: f64, piece: usize, pieces: usize) {
        self.extent = Some(UpdateExtent {
            time,
            piece,
            pieces: pieces.max(1),
        });
    }

    /// Current extent; defaults to the first time and this rank's piece.
    pub fn update_extent(&self) -> UpdateExtent {
        self.extent.unwrap_or(UpdateExtent {
            time: f64::NEG_INFINITY,
            piece: self.comm.rank(),
            pieces: self.comm.size().max(1),
        })
    }

    /// Materialize the requested piece.
    pub fn request_data(&mut self) -> Result<ReadOutput, CgnsError> {
        let extent = self.update_extent();
        let (partitioned, time, active) = {
            let s = self.series()?;
            (
                s.is_partitioned(),
                s.resolve_time(extent.time),
                s.active_files(extent.time, extent.piece, extent.pieces),
            )
        };
        // local reads are shared as a status before any collective so a
        // rank that cannot open its file fails every rank instead of
        // stalling them
        let mut warnings = Vec::new();
        let tree = if partitioned {
            let local = self.collect_fragments(&active, &mut warnings);
            let collector = share_outcome(&self.comm, TAG_READ_STATUS, local)?;
            reassemble(&self.comm, collector)?
        } else {
            let local = active
                .first()
                .ok_or_else(|| CgnsError::Parse("no active file".into()))
                .and_then(|file| self.read_distributed(file, extent, &mut warnings));
            let tree = share_outcome(&self.comm, TAG_READ_STATUS, local)?;
            align_layouts(&self.comm, tree)?
        };
        debug!(
            "rank {} piece {}/{}: {} leaves, {} warnings",
            self.comm.rank(),
            extent.piece,
            extent.pieces,
            tree.leaves().len(),
            warnings.len()
        );
        Ok(ReadOutput {
            tree,
            time,
            warnings,
        })
    }

    fn zone_request(&self, info: &BaseInfo, file: &ActiveFile) -> ReadRequest {
        ReadRequest {
            cell_dim: info.cell_dim,
            phys_dim: info.phys_dim,
            precision: self.options.precision,
            point_fields: self.options.point_fields.clone(),
            cell_fields: self.options.cell_fields.clone(),
            load_patches: self.options.load_patches,
            step: Some(file.time.map_or(0, |t| info.step_for_time(t))),
        }
    }

    /// One file: every base, zones dealt out to pieces in contiguous
    /// ranges.
    fn read_distributed(
        &self,
        active: &ActiveFile,
        extent: UpdateExtent,
        warnings: &mut Vec<ReadWarning>,
    ) -> Result<MultiBlock, CgnsError> {
        let file = CgnsFile::open_with_capacity(&active.path, self.options.handle_capacity)?;
        let root = file.root()?;
        let mut tree = MultiBlock::new();
        for base in file.children_with_label(&root, &Label::Base)? {
            let info = summarize_base(&file, &base)?;
            let zones = file.children_with_label(&base, &Label::Zone)?;
            let mut group = MultiBlock::new();
            if !self.options.bases.is_selected(base.name()) {
                tree.push(base.name(), Block::Group(group));
                continue;
            }
            let request = self.zone_request(&info, active);
            let n = zones.len();
            let lo = extent.piece * n / extent.pieces;
            let hi = ((extent.piece + 1) * n / extent.pieces).min(n);
            for (i, zone) in zones.iter().enumerate() {
                let block = if (lo..hi).contains(&i) {
                    read_zone_block(&file, zone, &request, warnings)
                } else {
                    Block::Empty
                };
                group.push(zone.name(), block);
            }
            tree.push(base.name(), Block::Group(group));
        }
        Ok(tree)
    }

    /// Partitioned series: read this piece's files into fragments.
    fn collect_fragments(
        &self,
        active: &[ActiveFile],
        warnings: &mut Vec<ReadWarning>,
    ) -> Result<FragmentCollector, CgnsError> {
        let mut collector = FragmentCollector::new();
        for base in self.metadata.bases() {
            collector.add_base(&base.name);
        }
        for af in active {
            let file = CgnsFile::open_with_capacity(&af.path, self.options.handle_capacity)?;
            let root = file.root()?;
            for base in file.children_with_label(&root, &Label::Base)? {
                collector.add_base(base.name());
                if !self.options.bases.is_selected(base.name()) {
                    continue;
                }
                let info = summarize_base(&file, &base)?;
                let request = self.zone_request(&info, af);
                for zone in file.children_with_label(&base, &Label::Zone)? {
                    let block = read_zone_block(&file, &zone, &request, warnings);
                    collector.add(base.name(), zone.name(), af.index, block);
                }
            }
        }
        Ok(collector)
    }
}

/// Read one zone. A zone that cannot be read, or reads into an invalid
/// mesh, becomes an empty slot plus a warning so the tree keeps its shape.
fn read_zone_block(
    file: &CgnsFile,
    zone: &crate::node::NodeRef<'_>,
    request: &ReadRequest,
    warnings: &mut Vec<ReadWarning>,
) -> Block {
    let out = read_zone(file, zone, request)
        .and_then(|out| out.mesh.validate_invariants().map(|()| out));
    match out {
        Ok(out) => {
            warnings.extend(out.warnings.iter().cloned());
            out.into_block(request.load_patches)
        }
        Err(e) => {
            ReadWarning::record(warnings, zone.name(), zone.name(), e);
            Block::Empty
        }
    }
}
