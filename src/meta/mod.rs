//! Metadata summarizer.
//!
//! [`CgnsMetadata`] holds the [`BaseInfo`] list of the last file it
//! parsed. Parsing the same path again is a no-op; the guard compares
//! paths only, so a file rewritten in place under the same name is not
//! noticed until [`CgnsMetadata::force_reparse`] is called.

pub mod base_info;
pub mod summarizer;

pub use base_info::{BaseInfo, FamilyInfo, FieldCatalog};
pub use summarizer::{summarize, summarize_base};

use crate::algs::collective::{TAG_METADATA, broadcast_bytes, is_serial};
use crate::algs::communicator::Communicator;
use crate::mesh_error::CgnsError;
use crate::node::{CgnsFile, DEFAULT_HANDLE_CAPACITY};
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Summaries of one file plus the guard that makes re-parsing idempotent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CgnsMetadata {
    last_parsed: Option<PathBuf>,
    bases: Vec<BaseInfo>,
    #[serde(skip, default = "default_capacity")]
    handle_capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_HANDLE_CAPACITY
}

impl Default for CgnsMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl CgnsMetadata {
    pub fn new() -> Self {
        Self::with_handle_capacity(DEFAULT_HANDLE_CAPACITY)
    }

    pub fn with_handle_capacity(capacity: usize) -> Self {
        Self {
            last_parsed: None,
            bases: Vec::new(),
            handle_capacity: capacity,
        }
    }

    /// Summarize `path` unless it is the path parsed last. Returns `true`
    /// when the file was actually read. On error the previous summary is
    /// kept.
    pub fn parse(&mut self, path: impl AsRef<Path>) -> Result<bool, CgnsError> {
        let path = path.as_ref();
        if self.last_parsed.as_deref() == Some(path) {
            debug!("metadata for {} is current", path.display());
            return Ok(false);
        }
        let file = CgnsFile::open_with_capacity(path, self.handle_capacity)?;
        let bases = summarize(&file)?;
        info!("parsed {}: {} bases", path.display(), bases.len());
        self.bases = bases;
        self.last_parsed = Some(path.to_path_buf());
        Ok(true)
    }

    /// Forget the guard so the next [`parse`](Self::parse) reads the file.
    pub fn force_reparse(&mut self) {
        self.last_parsed = None;
    }

    pub fn last_parsed(&self) -> Option<&Path> {
        self.last_parsed.as_deref()
    }

    pub fn bases(&self) -> &[BaseInfo] {
        &self.bases
    }

    pub fn bases_mut(&mut self) -> &mut [BaseInfo] {
        &mut self.bases
    }

    pub fn base(&self, name: &str) -> Option<&BaseInfo> {
        self.bases.iter().find(|b| b.name == name)
    }

    /// `true` when any base stores real time information.
    pub fn has_time(&self) -> bool {
        self.bases.iter().any(|b| b.has_time)
    }

    /// Time values of all bases, sorted and de-duplicated.
    pub fn times(&self) -> Vec<f64> {
        self.bases
            .iter()
            .flat_map(|b| b.times.iter().copied())
            .sorted_by(f64::total_cmp)
            .dedup()
            .collect()
    }

    /// Replace every rank's summary with `root`'s. Only `root` needs to
    /// have parsed a file.
    pub fn broadcast<C: Communicator>(&mut self, comm: &C, root: usize) -> Result<(), CgnsError> {
        if is_serial(comm) {
            return Ok(());
        }
        let payload = if comm.rank() == root {
            serde_json::to_vec(&*self)?
        } else {
            Vec::new()
        };
        let bytes = broadcast_bytes(comm, root, TAG_METADATA, payload)?;
        if comm.rank() != root {
            let received: CgnsMetadata = serde_json::from_slice(&bytes)?;
            self.last_parsed = received.last_parsed;
            self.bases = received.bases;
        }
        Ok(())
    }
}
