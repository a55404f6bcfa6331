//! Zone materializer: builds [`Mesh`] blocks from `Zone_t` nodes.
//!
//! Geometry is always read; fields only when the request selects them.
//! A failed field array or element section is skipped with a
//! [`ReadWarning`] so the rest of the zone still loads. Coordinate and
//! zone-header failures abort the zone.

pub mod elements;
pub mod fields;
pub mod patches;
pub mod structured;
pub mod unstructured;

pub use elements::{ElementType, Section};
pub use fields::{FieldGroup, FieldSelection, group_components};
pub use structured::read_structured_zone;
pub use unstructured::read_unstructured_zone;

use crate::mesh::{ArrayData, Block, Mesh, MultiBlock, Precision};
use crate::mesh_error::CgnsError;
use crate::node::{CgnsFile, Label, NodeRef};
use log::warn;
use serde::{Deserialize, Serialize};

/// Cell field marking patch cells (1) versus interior cells (0).
pub const IS_PATCH_FIELD: &str = "ispatch";
/// Name of the interior block when patches are loaded.
pub const INTERNAL_BLOCK: &str = "Internal";
/// Name of the patch group when patches are loaded.
pub const PATCHES_BLOCK: &str = "Patches";

/// What to materialize from one zone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadRequest {
    pub cell_dim: usize,
    pub phys_dim: usize,
    pub precision: Precision,
    pub point_fields: FieldSelection,
    pub cell_fields: FieldSelection,
    pub load_patches: bool,
    /// Time-step index used to resolve `ZoneIterativeData` pointers.
    pub step: Option<usize>,
}

/// A non-fatal problem met while reading a zone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadWarning {
    pub zone: String,
    pub item: String,
    pub reason: String,
}

impl ReadWarning {
    pub(crate) fn record(
        warnings: &mut Vec<ReadWarning>,
        zone: &str,
        item: &str,
        reason: impl std::fmt::Display,
    ) {
        warn!("zone `{zone}`: skipping `{item}`: {reason}");
        warnings.push(ReadWarning {
            zone: zone.to_string(),
            item: item.to_string(),
            reason: reason.to_string(),
        });
    }
}

/// One materialized zone.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneOutput {
    pub name: String,
    pub mesh: Mesh,
    /// Boundary patches, in file order. Empty unless patches were requested.
    pub patches: Vec<(String, Mesh)>,
    pub warnings: Vec<ReadWarning>,
}

impl ZoneOutput {
    /// The zone as a block. With patches loaded the zone becomes a group
    /// holding the interior mesh and a patch group.
    pub fn into_block(self, load_patches: bool) -> Block {
        if !load_patches {
            return Block::mesh(self.mesh);
        }
        let mut patches = MultiBlock::new();
        for (name, mesh) in self.patches {
            patches.push(name, Block::mesh(mesh));
        }
        let mut group = MultiBlock::new();
        group.push(INTERNAL_BLOCK, Block::mesh(self.mesh));
        group.push(PATCHES_BLOCK, Block::Group(patches));
        Block::Group(group)
    }
}

/// A box of stored array values to keep, in i-fastest order. Arrays carry
/// `lo`/`hi` ghost layers per direction (rind); the window drops them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexWindow {
    pub count: [usize; 3],
    pub rind: [usize; 6],
}

impl IndexWindow {
    pub fn new(count: [usize; 3], rind: [usize; 6]) -> Self {
        Self { count, rind }
    }

    pub fn plain(count: [usize; 3]) -> Self {
        Self::new(count, [0; 6])
    }

    fn stored(&self) -> [usize; 3] {
        [0, 1, 2].map(|d| self.count[d] + self.rind[2 * d] + self.rind[2 * d + 1])
    }

    /// Number of kept values.
    pub fn len(&self) -> usize {
        self.count.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep the interior of `src`, which must hold exactly the stored box.
    pub fn extract<T: Copy>(&self, src: &[T]) -> Result<Vec<T>, CgnsError> {
        let stored = self.stored();
        let expected: usize = stored.iter().product();
        if src.len() != expected {
            return Err(CgnsError::Parse(format!(
                "array holds {} values, expected {expected} ({:?} with rind {:?})",
                src.len(),
                self.count,
                self.rind
            )));
        }
        if self.rind.iter().all(|&r| r == 0) {
            return Ok(src.to_vec());
        }
        let mut out = Vec::with_capacity(self.len());
        for k in 0..self.count[2] {
            for j in 0..self.count[1] {
                let row = (k + self.rind[4]) * stored[0] * stored[1]
                    + (j + self.rind[2]) * stored[0]
                    + self.rind[0];
                out.extend_from_slice(&src[row..row + self.count[0]]);
            }
        }
        Ok(out)
    }

    /// [`extract`](Self::extract) over any array variant.
    pub fn extract_data(&self, data: &ArrayData) -> Result<ArrayData, CgnsError> {
        Ok(match data {
            ArrayData::F32(v) => ArrayData::F32(self.extract(v)?),
            ArrayData::F64(v) => ArrayData::F64(self.extract(v)?),
            ArrayData::I32(v) => ArrayData::I32(self.extract(v)?),
            ArrayData::I64(v) => ArrayData::I64(self.extract(v)?),
            ArrayData::U8(v) => ArrayData::U8(self.extract(v)?),
        })
    }
}

/// Rind planes of the first `Rind_t` child of `node`, as
/// `[ilo, ihi, jlo, jhi, klo, khi]`.
pub fn read_rind(file: &CgnsFile, node: &NodeRef<'_>) -> Result<[usize; 6], CgnsError> {
    let mut rind = [0usize; 6];
    if let Some(r) = file.try_find_first_child(node, &Label::Rind, None)? {
        for (slot, v) in rind.iter_mut().zip(file.read_index_array(&r)?) {
            *slot = usize::try_from(v)
                .map_err(|_| CgnsError::Parse(format!("negative rind on `{}`", node.name())))?;
        }
    }
    Ok(rind)
}

/// Typed payload of a `DataArray_t` node. Character and empty nodes are
/// not field data.
pub fn read_data_array(file: &CgnsFile, node: &NodeRef<'_>) -> Result<ArrayData, CgnsError> {
    use crate::node::DataType;
    Ok(match file.data_type(node)? {
        DataType::Float32 => ArrayData::F32(file.read_array(node)?),
        DataType::Float64 => ArrayData::F64(file.read_array(node)?),
        DataType::Int32 => ArrayData::I32(file.read_array(node)?),
        DataType::Int64 => ArrayData::I64(file.read_array(node)?),
        other => {
            return Err(CgnsError::DataTypeMismatch {
                node: node.name().to_string(),
                declared: other.code(),
                requested: "R4|R8|I4|I8",
            });
        }
    })
}

/// Grid and solutions named by the zone's iterative-data pointers for one
/// step. `None` means no pointer applies and every node is used.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepPointers {
    pub grid: Option<String>,
    /// Union of every `FlowSolution*Pointers` list (one per location).
    pub solutions: Option<Vec<String>>,
}

/// `true` for `FlowSolutionPointers` and per-location variants such as
/// `FlowSolutionCellCenterPointers`.
pub fn is_solution_pointer(name: &str) -> bool {
    name.starts_with("FlowSolution") && name.ends_with("Pointers")
}

pub fn resolve_pointers(
    file: &CgnsFile,
    zone: &NodeRef<'_>,
    step: Option<usize>,
) -> Result<StepPointers, CgnsError> {
    let mut out = StepPointers::default();
    let Some(step) = step else {
        return Ok(out);
    };
    let Some(zid) = file.try_find_first_child(zone, &Label::ZoneIterativeData, None)? else {
        return Ok(out);
    };
    let entry = |node: &NodeRef<'_>| -> Result<Option<String>, CgnsError> {
        let names = file.read_string_list(node)?;
        Ok(names
            .get(step)
            .filter(|n| !n.is_empty() && n.as_str() != "Null")
            .cloned())
    };
    for arr in file.children_with_label(&zid, &Label::DataArray)? {
        if arr.name() == "GridCoordinatesPointers" {
            out.grid = entry(&arr)?;
        } else if is_solution_pointer(arr.name()) {
            let list = out.solutions.get_or_insert_with(Vec::new);
            list.extend(entry(&arr)?);
        }
    }
    Ok(out)
}

/// Family name attached to `zone`, if any.
pub fn read_family(file: &CgnsFile, zone: &NodeRef<'_>) -> Result<Option<String>, CgnsError> {
    file.try_find_first_child(zone, &Label::FamilyName, None)?
        .map(|n| file.read_string(&n))
        .transpose()
}

/// Read coordinates `CoordinateX/Y/Z` under `grid` through `window`.
/// Missing components are zero-filled; at least `CoordinateX` must exist.
pub(crate) fn read_coordinates(
    file: &CgnsFile,
    grid: &NodeRef<'_>,
    window: &IndexWindow,
    precision: Precision,
) -> Result<crate::mesh::Points, CgnsError> {
    let mut axes = Vec::with_capacity(3);
    for (axis, name) in ["CoordinateX", "CoordinateY", "CoordinateZ"].iter().enumerate() {
        match file.try_find_first_child(grid, &Label::DataArray, Some(name))? {
            Some(node) => {
                let data = read_data_array(file, &node)?;
                axes.push(ArrayData::F64(window.extract(&data.to_f64_vec())?));
            }
            None if axis == 0 => {
                return Err(CgnsError::NotFound {
                    label: Label::DataArray.to_string(),
                    name: Some(name.to_string()),
                });
            }
            None => axes.push(ArrayData::F64(vec![0.0; window.len()])),
        }
    }
    crate::mesh::Points::new(ArrayData::interleave(&axes)?.with_precision(precision))
}

/// The `GridCoordinates_t` node to read: the pointer target when named,
/// otherwise `GridCoordinates`, otherwise the first one.
pub(crate) fn grid_node<'f>(
    file: &'f CgnsFile,
    zone: &NodeRef<'_>,
    pointer: Option<&str>,
) -> Result<NodeRef<'f>, CgnsError> {
    if let Some(name) = pointer
        && let Some(n) = file.try_find_first_child(zone, &Label::GridCoordinates, Some(name))?
    {
        return Ok(n);
    }
    if let Some(n) =
        file.try_find_first_child(zone, &Label::GridCoordinates, Some("GridCoordinates"))?
    {
        return Ok(n);
    }
    file.find_first_child(zone, &Label::GridCoordinates, None)
}

/// Zone kind from its `ZoneType_t` child.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneKind {
    Structured,
    Unstructured,
}

pub fn zone_kind(file: &CgnsFile, zone: &NodeRef<'_>) -> Result<ZoneKind, CgnsError> {
    let node = file.find_first_child(zone, &Label::ZoneType, None)?;
    match file.read_string(&node)?.as_str() {
        "Structured" => Ok(ZoneKind::Structured),
        "Unstructured" => Ok(ZoneKind::Unstructured),
        other => Err(CgnsError::Parse(format!(
            "zone `{}` has unsupported type `{other}`",
            zone.name()
        ))),
    }
}

/// Materialize `zone` according to its declared type.
pub fn read_zone(
    file: &CgnsFile,
    zone: &NodeRef<'_>,
    request: &ReadRequest,
) -> Result<ZoneOutput, CgnsError> {
    match zone_kind(file, zone)? {
        ZoneKind::Structured => read_structured_zone(file, zone, request),
        ZoneKind::Unstructured => read_unstructured_zone(file, zone, request),
    }
}
