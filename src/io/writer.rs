//! Serial CGNS writer.
//!
//! A composite tree maps onto bases and zones: meshes directly under the
//! root become zones of the default base, every top-level group becomes a
//! base whose zones are that group's leaves (nested paths joined with
//! `_`). Empty slots are skipped.
//!
//! Unstructured cells are written as one section: uniform when every cell
//! has the same fixed type, MIXED otherwise, NGON for polygon-only zones
//! and an NFACE/NGON pair for polyhedral zones (CGNS 4 offset layout).

use crate::mesh::{
    ArrayData, Attributes, Block, CellArray, CellType, Mesh, MultiBlock, Precision,
    StructuredGrid, UnstructuredGrid,
};
use crate::mesh_error::CgnsError;
use crate::node::tree::MAX_NAME_LEN;
use crate::node::{Label, NodeData, NodeId, NodeTree, codec};
use crate::zone::ElementType;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Name of the vertex solution node.
pub const VERTEX_SOLUTION: &str = "FlowSolution";
/// Name of the cell-centred solution node.
pub const CELL_SOLUTION: &str = "FlowSolutionCC";

/// Writer configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// Real storage precision; `None` keeps each array's own precision.
    pub precision: Option<Precision>,
    /// Base receiving meshes that sit directly under the root.
    pub base_name: String,
    /// Time value of the written step. Without it no iterative data is
    /// written.
    pub time_value: Option<f64>,
    pub iteration: i64,
    /// Write `ZoneIterativeData` pointers naming the grid and solutions.
    pub write_pointers: bool,
    pub reference_state: BTreeMap<String, f64>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            precision: None,
            base_name: "Base".to_string(),
            time_value: None,
            iteration: 0,
            write_pointers: true,
            reference_state: BTreeMap::new(),
        }
    }
}

/// Writes composite meshes to the node store.
#[derive(Clone, Debug, Default)]
pub struct CgnsWriter {
    options: WriterOptions,
}

/// A CGNS-safe node name: no `/`, at most [`MAX_NAME_LEN`] bytes.
pub fn node_name(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| if c == '/' { '_' } else { c })
        .collect();
    if out.is_empty() {
        out.push('_');
    }
    while out.len() > MAX_NAME_LEN {
        out.pop();
    }
    out
}

fn unique_name(raw: &str, taken: &mut BTreeSet<String>) -> String {
    let base = node_name(raw);
    let mut name = base.clone();
    let mut n = 1;
    while taken.contains(&name) {
        let suffix = format!(".{n}");
        let mut stem = base.clone();
        while stem.len() + suffix.len() > MAX_NAME_LEN {
            stem.pop();
        }
        name = format!("{stem}{suffix}");
        n += 1;
    }
    taken.insert(name.clone());
    name
}

/// Integer payload, `I4` when every value fits.
fn index_data(values: &[i64], dims: Vec<usize>) -> Result<NodeData, CgnsError> {
    if values.iter().all(|&v| i32::try_from(v).is_ok()) {
        let narrow: Vec<i32> = values.iter().map(|&v| v as i32).collect();
        NodeData::array(&narrow, dims)
    } else {
        NodeData::array(values, dims)
    }
}

fn array_data(
    data: &ArrayData,
    dims: Vec<usize>,
    precision: Option<Precision>,
) -> Result<NodeData, CgnsError> {
    let data = match precision {
        Some(p) => data.clone().with_precision(p),
        None => data.clone(),
    };
    match &data {
        ArrayData::F32(v) => NodeData::array(v, dims),
        ArrayData::F64(v) => NodeData::array(v, dims),
        ArrayData::I32(v) => NodeData::array(v, dims),
        ArrayData::I64(v) => NodeData::array(v, dims),
        ArrayData::U8(v) => {
            let widened: Vec<i32> = v.iter().map(|&x| i32::from(x)).collect();
            NodeData::array(&widened, dims)
        }
    }
}

/// Fixed-width character matrix `[32, n]`.
fn name_list(names: &[&str]) -> Result<NodeData, CgnsError> {
    let mut raw = vec![b' '; MAX_NAME_LEN * names.len()];
    for (slot, name) in raw.chunks_mut(MAX_NAME_LEN).zip(names) {
        let n = name.len().min(MAX_NAME_LEN);
        slot[..n].copy_from_slice(&name.as_bytes()[..n]);
    }
    NodeData::array(&raw, vec![MAX_NAME_LEN, names.len()])
}

/// Stored array names for a field of `components` values per tuple.
pub fn component_names(name: &str, components: usize) -> Vec<String> {
    match components {
        1 => vec![name.to_string()],
        2 | 3 => ["X", "Y", "Z"][..components]
            .iter()
            .map(|s| format!("{name}{s}"))
            .collect(),
        n => (0..n).map(|i| format!("{name}_{i}")).collect(),
    }
}

fn structured_index_dim(g: &StructuredGrid) -> usize {
    g.extent.iter().rposition(|&n| n > 1).map_or(1, |d| d + 1)
}

fn mesh_cell_dim(mesh: &Mesh) -> usize {
    match mesh {
        Mesh::Structured(g) => structured_index_dim(g),
        Mesh::Unstructured(g) => g
            .cells
            .types()
            .iter()
            .map(|t| usize::from(t.dimension()))
            .max()
            .unwrap_or(1)
            .max(1),
    }
}

type BaseLayout<'a> = Vec<(String, Vec<(String, &'a Mesh)>)>;

/// Group the leaves of `block` into bases.
fn layout<'a>(block: &'a Block, default_base: &str) -> BaseLayout<'a> {
    let mut bases: BaseLayout<'a> = Vec::new();
    match block {
        Block::Empty => {}
        Block::Mesh(m) => bases.push((default_base.to_string(), vec![("Zone".to_string(), &**m)])),
        Block::Group(g) => {
            let mut root_zones = Vec::new();
            for (name, child) in g.iter() {
                match child {
                    Block::Empty => {}
                    Block::Mesh(m) => root_zones.push((name.to_string(), &**m)),
                    Block::Group(sub) => {
                        let zones: Vec<(String, &Mesh)> = sub.leaves();
                        if !zones.is_empty() {
                            bases.push((name.to_string(), zones));
                        }
                    }
                }
            }
            if !root_zones.is_empty() {
                bases.insert(0, (default_base.to_string(), root_zones));
            }
        }
    }
    bases
}

impl CgnsWriter {
    pub fn new(options: WriterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Write `block` to `path`.
    pub fn write(&self, path: impl AsRef<Path>, block: &Block) -> Result<(), CgnsError> {
        let tree = self.to_tree(block)?;
        codec::save(&tree, path.as_ref())?;
        info!("wrote {} ({} nodes)", path.as_ref().display(), tree.len());
        Ok(())
    }

    /// Write one mesh as the single zone of the default base.
    pub fn write_mesh(&self, path: impl AsRef<Path>, mesh: &Mesh) -> Result<(), CgnsError> {
        self.write(path, &Block::mesh(mesh.clone()))
    }

    /// Write a composite tree.
    pub fn write_multiblock(
        &self,
        path: impl AsRef<Path>,
        tree: &MultiBlock,
    ) -> Result<(), CgnsError> {
        self.write(path, &Block::Group(tree.clone()))
    }

    /// Build the node tree for `block` without touching the filesystem.
    pub fn to_tree(&self, block: &Block) -> Result<NodeTree, CgnsError> {
        let mut tree = NodeTree::new();
        tree.add_child(
            tree.root(),
            "CGNSLibraryVersion",
            Label::LibraryVersion,
            NodeData::vector(&[4.2f32]),
        )?;
        let mut base_names = BTreeSet::new();
        for (base_name, zones) in layout(block, &self.options.base_name) {
            let name = unique_name(&base_name, &mut base_names);
            self.write_base(&mut tree, &name, &zones)?;
        }
        Ok(tree)
    }

    fn write_base(
        &self,
        tree: &mut NodeTree,
        name: &str,
        zones: &[(String, &Mesh)],
    ) -> Result<(), CgnsError> {
        let cell_dim = zones.iter().map(|(_, m)| mesh_cell_dim(m)).max().unwrap_or(1);
        let base = tree.add_child(
            tree.root(),
            name,
            Label::Base,
            NodeData::vector(&[cell_dim as i32, 3]),
        )?;
        let sim = if self.options.time_value.is_some() {
            "TimeAccurate"
        } else {
            "NonTimeAccurate"
        };
        tree.add_child(base, "SimulationType", Label::SimulationType, NodeData::text(sim))?;

        if let Some(t) = self.options.time_value {
            let bid = tree.add_child(
                base,
                "BaseIterativeData",
                Label::BaseIterativeData,
                NodeData::vector(&[1i32]),
            )?;
            tree.add_child(bid, "TimeValues", Label::DataArray, NodeData::vector(&[t]))?;
            tree.add_child(
                bid,
                "IterationValues",
                Label::DataArray,
                index_data(&[self.options.iteration], vec![1])?,
            )?;
        }
        if !self.options.reference_state.is_empty() {
            let rs = tree.add_child(base, "ReferenceState", Label::ReferenceState, NodeData::empty())?;
            for (k, v) in &self.options.reference_state {
                tree.add_child(rs, &node_name(k), Label::DataArray, NodeData::vector(&[*v]))?;
            }
        }

        let families: BTreeSet<&str> = zones.iter().filter_map(|(_, m)| m.family()).collect();
        for fam in families {
            tree.add_child(base, &node_name(fam), Label::Family, NodeData::empty())?;
        }

        let mut taken = BTreeSet::new();
        for (zone_name, mesh) in zones {
            let zname = unique_name(zone_name, &mut taken);
            self.write_zone(tree, base, &zname, mesh, cell_dim)?;
        }
        debug!("base {name}: {} zones, cell dim {cell_dim}", zones.len());
        Ok(())
    }

    fn write_zone(
        &self,
        tree: &mut NodeTree,
        base: NodeId,
        name: &str,
        mesh: &Mesh,
        cell_dim: usize,
    ) -> Result<(), CgnsError> {
        let precision = self.options.precision;
        let (sizes, zone_type, point_dims, cell_dims) = match mesh {
            Mesh::Structured(g) => {
                if g.extent[cell_dim..].iter().any(|&n| n > 1) {
                    return Err(CgnsError::InvalidMesh(format!(
                        "zone `{name}` extent {:?} exceeds base dimension {cell_dim}",
                        g.extent
                    )));
                }
                let pts: Vec<usize> = g.extent[..cell_dim].to_vec();
                let cells: Vec<usize> = g.cell_extent()[..cell_dim].to_vec();
                let mut sizes: Vec<i64> = pts.iter().map(|&n| n as i64).collect();
                sizes.extend(pts.iter().map(|&n| n.saturating_sub(1) as i64));
                sizes.extend(std::iter::repeat_n(0, cell_dim));
                (
                    index_data(&sizes, vec![cell_dim, 3])?,
                    "Structured",
                    pts,
                    cells,
                )
            }
            Mesh::Unstructured(g) => (
                index_data(&[g.num_points() as i64, g.num_cells() as i64, 0], vec![1, 3])?,
                "Unstructured",
                vec![g.num_points()],
                vec![g.num_cells()],
            ),
        };
        let zone = tree.add_child(base, name, Label::Zone, sizes)?;
        tree.add_child(zone, "ZoneType", Label::ZoneType, NodeData::text(zone_type))?;

        let gc = tree.add_child(zone, "GridCoordinates", Label::GridCoordinates, NodeData::empty())?;
        let coord_precision = precision.unwrap_or(mesh.points().precision());
        for (axis, cname) in ["CoordinateX", "CoordinateY", "CoordinateZ"].iter().enumerate() {
            let values = ArrayData::F64(mesh.points().component(axis));
            tree.add_child(
                gc,
                cname,
                Label::DataArray,
                array_data(&values, point_dims.clone(), Some(coord_precision))?,
            )?;
        }
        if let Some(fam) = mesh.family() {
            tree.add_child(zone, "FamilyName", Label::FamilyName, NodeData::text(&node_name(fam)))?;
        }
        if let Mesh::Unstructured(g) = mesh {
            write_sections(tree, zone, name, g)?;
        }

        let mut solutions = Vec::new();
        if self.write_solution(tree, zone, VERTEX_SOLUTION, "Vertex", mesh.point_data(), &point_dims)? {
            solutions.push(("FlowSolutionPointers", VERTEX_SOLUTION));
        }
        if self.write_solution(tree, zone, CELL_SOLUTION, "CellCenter", mesh.cell_data(), &cell_dims)? {
            solutions.push(("FlowSolutionCellCenterPointers", CELL_SOLUTION));
        }
        if self.options.time_value.is_some() && self.options.write_pointers {
            let zid = tree.add_child(zone, "ZoneIterativeData", Label::ZoneIterativeData, NodeData::empty())?;
            tree.add_child(
                zid,
                "GridCoordinatesPointers",
                Label::DataArray,
                name_list(&["GridCoordinates"])?,
            )?;
            for (ptr, sol) in solutions {
                tree.add_child(zid, ptr, Label::DataArray, name_list(&[sol])?)?;
            }
        }
        Ok(())
    }

    /// Returns `false` (and writes nothing) for an empty attribute set.
    fn write_solution(
        &self,
        tree: &mut NodeTree,
        zone: NodeId,
        name: &str,
        location: &str,
        attrs: &Attributes,
        dims: &[usize],
    ) -> Result<bool, CgnsError> {
        if attrs.is_empty() {
            return Ok(false);
        }
        let sol = tree.add_child(zone, name, Label::FlowSolution, NodeData::empty())?;
        tree.add_child(sol, "GridLocation", Label::GridLocation, NodeData::text(location))?;
        for field in attrs.iter() {
            let names = component_names(&field.name, field.components);
            for (c, stored) in names.iter().enumerate() {
                let values = field.data.component(c, field.components);
                tree.add_child(
                    sol,
                    &node_name(stored),
                    Label::DataArray,
                    array_data(&values, dims.to_vec(), self.options.precision)?,
                )?;
            }
        }
        Ok(true)
    }
}

fn one_based(pts: &[i64]) -> impl Iterator<Item = i64> + '_ {
    pts.iter().map(|p| p + 1)
}

fn add_section(
    tree: &mut NodeTree,
    zone: NodeId,
    name: &str,
    etype: ElementType,
    range: [i64; 2],
    connectivity: &[i64],
    offsets: Option<&[i64]>,
) -> Result<(), CgnsError> {
    let sec = tree.add_child(
        zone,
        name,
        Label::Elements,
        NodeData::vector(&[etype.code(), 0]),
    )?;
    tree.add_child(sec, "ElementRange", Label::IndexRange, index_data(&range, vec![2])?)?;
    if let Some(off) = offsets {
        tree.add_child(
            sec,
            "ElementStartOffset",
            Label::DataArray,
            index_data(off, vec![off.len()])?,
        )?;
    }
    tree.add_child(
        sec,
        "ElementConnectivity",
        Label::DataArray,
        index_data(connectivity, vec![connectivity.len()])?,
    )?;
    Ok(())
}

fn write_sections(
    tree: &mut NodeTree,
    zone: NodeId,
    zone_name: &str,
    grid: &UnstructuredGrid,
) -> Result<(), CgnsError> {
    let cells: &CellArray = &grid.cells;
    let n = cells.len();
    if n == 0 {
        return Ok(());
    }
    let types = cells.types();
    let count = |t: CellType| types.iter().filter(|&&x| x == t).count();
    let (polyhedra, polygons) = (count(CellType::Polyhedron), count(CellType::Polygon));
    if (polyhedra > 0 && polyhedra < n) || (polygons > 0 && polygons < n) {
        return Err(CgnsError::InvalidMesh(format!(
            "zone `{zone_name}` mixes polygonal or polyhedral cells with other types"
        )));
    }
    let n64 = n as i64;

    if polyhedra == n {
        let mut face_conn = Vec::new();
        let mut face_off = vec![0i64];
        let mut cell_conn = Vec::new();
        let mut cell_off = vec![0i64];
        let mut nfaces = 0i64;
        for cell in 0..n {
            for face in cells.polyhedron_faces(cell).unwrap_or_default() {
                face_conn.extend(one_based(face));
                face_off.push(face_conn.len() as i64);
                nfaces += 1;
                cell_conn.push(n64 + nfaces);
            }
            cell_off.push(cell_conn.len() as i64);
        }
        add_section(tree, zone, "NFaceElements", ElementType::NFace, [1, n64], &cell_conn, Some(&cell_off))?;
        add_section(
            tree,
            zone,
            "NGonElements",
            ElementType::NGon,
            [n64 + 1, n64 + nfaces],
            &face_conn,
            Some(&face_off),
        )?;
        return Ok(());
    }

    let mut conn = Vec::with_capacity(cells.connectivity().len() + n);
    let mut offsets = vec![0i64];
    let first = types[0];
    let uniform = types.iter().all(|&t| t == first);
    for cell in 0..n {
        let pts = cells.points(cell).unwrap_or_default();
        if !uniform {
            conn.push(i64::from(ElementType::from_cell_type(types[cell]).code()));
        }
        conn.extend(one_based(pts));
        offsets.push(conn.len() as i64);
    }
    match (uniform, first) {
        (true, CellType::Polygon) => {
            add_section(tree, zone, "NGonElements", ElementType::NGon, [1, n64], &conn, Some(&offsets))
        }
        (true, t) => add_section(
            tree,
            zone,
            "Elements",
            ElementType::from_cell_type(t),
            [1, n64],
            &conn,
            None,
        ),
        (false, _) => add_section(tree, zone, "Elements", ElementType::Mixed, [1, n64], &conn, Some(&offsets)),
    }
}
