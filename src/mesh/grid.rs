//! Structured and unstructured mesh blocks.

use crate::debug_invariants::DebugInvariants;
use crate::mesh::array::{ArrayData, Attributes, FieldArray, Precision};
use crate::mesh::cell_type::CellType;
use crate::mesh_error::CgnsError;
use serde::{Deserialize, Serialize};

/// Point coordinates, interleaved `x y z`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Points {
    data: ArrayData,
}

impl Points {
    /// Wrap interleaved coordinates. Only real arrays with a multiple of
    /// three values are accepted.
    pub fn new(data: ArrayData) -> Result<Self, CgnsError> {
        match &data {
            ArrayData::F32(v) if v.len() % 3 == 0 => Ok(Self { data }),
            ArrayData::F64(v) if v.len() % 3 == 0 => Ok(Self { data }),
            other => Err(CgnsError::InvalidMesh(format!(
                "points need real xyz triples, got {} {} values",
                other.len(),
                other.kind()
            ))),
        }
    }

    pub fn empty(precision: Precision) -> Self {
        let data = match precision {
            Precision::Single => ArrayData::F32(Vec::new()),
            Precision::Double => ArrayData::F64(Vec::new()),
        };
        Self { data }
    }

    pub fn from_f64(xyz: &[[f64; 3]]) -> Self {
        Self {
            data: ArrayData::F64(xyz.iter().flatten().copied().collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn precision(&self) -> Precision {
        match self.data {
            ArrayData::F32(_) => Precision::Single,
            _ => Precision::Double,
        }
    }

    /// Point `i` widened to `f64`.
    pub fn get(&self, i: usize) -> Option<[f64; 3]> {
        Some([
            self.data.get_f64(3 * i)?,
            self.data.get_f64(3 * i + 1)?,
            self.data.get_f64(3 * i + 2)?,
        ])
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn into_data(self) -> ArrayData {
        self.data
    }

    /// Single component (0 = x) for every point, widened to `f64`.
    pub fn component(&self, axis: usize) -> Vec<f64> {
        (0..self.len())
            .filter_map(|i| self.data.get_f64(3 * i + axis))
            .collect()
    }
}

/// A logically rectangular block of `extent[0] x extent[1] x extent[2]`
/// points, `i` fastest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructuredGrid {
    pub extent: [usize; 3],
    pub points: Points,
    pub point_data: Attributes,
    pub cell_data: Attributes,
    pub family: Option<String>,
}

impl StructuredGrid {
    pub fn new(extent: [usize; 3], points: Points) -> Result<Self, CgnsError> {
        let grid = Self {
            extent,
            points,
            point_data: Attributes::new(),
            cell_data: Attributes::new(),
            family: None,
        };
        grid.validate_invariants()?;
        Ok(grid)
    }

    pub fn num_points(&self) -> usize {
        self.extent.iter().product()
    }

    /// Cells per direction; directions with a single point contribute none.
    pub fn cell_extent(&self) -> [usize; 3] {
        self.extent.map(|n| n.saturating_sub(1).max(1))
    }

    pub fn num_cells(&self) -> usize {
        if self.num_points() == 0 || self.extent.iter().all(|&n| n <= 1) {
            return 0;
        }
        self.cell_extent().iter().product()
    }

    /// Linear point index of `(i, j, k)`.
    #[inline]
    pub fn point_index(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.extent[1] + j) * self.extent[0] + i
    }
}

impl DebugInvariants for StructuredGrid {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "StructuredGrid");
    }

    fn validate_invariants(&self) -> Result<(), CgnsError> {
        if self.points.len() != self.num_points() {
            return Err(CgnsError::InvalidMesh(format!(
                "extent {:?} needs {} points, have {}",
                self.extent,
                self.num_points(),
                self.points.len()
            )));
        }
        check_attributes(&self.point_data, self.num_points(), "point")?;
        check_attributes(&self.cell_data, self.num_cells(), "cell")
    }
}

/// Cells of an unstructured block.
///
/// `offsets` has one more entry than there are cells and indexes
/// `connectivity`. Polyhedra additionally own a face stream in `faces`
/// (`[nfaces, n0, p.., n1, p..]`) located through `face_offsets`; other
/// cells have an empty face range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellArray {
    types: Vec<CellType>,
    offsets: Vec<usize>,
    connectivity: Vec<i64>,
    face_offsets: Vec<usize>,
    faces: Vec<i64>,
}

impl Default for CellArray {
    fn default() -> Self {
        Self {
            types: Vec::new(),
            offsets: vec![0],
            connectivity: Vec::new(),
            face_offsets: vec![0],
            faces: Vec::new(),
        }
    }
}

impl CellArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Append a non-polyhedral cell with 0-based point ids.
    pub fn push(&mut self, cell_type: CellType, points: &[i64]) {
        self.types.push(cell_type);
        self.connectivity.extend_from_slice(points);
        self.offsets.push(self.connectivity.len());
        self.face_offsets.push(self.faces.len());
    }

    /// Append a polyhedron given as a list of faces (0-based point ids).
    /// The cell's point list is the set of face points in first-seen order.
    pub fn push_polyhedron(&mut self, faces: &[Vec<i64>]) {
        self.types.push(CellType::Polyhedron);
        let start = self.connectivity.len();
        for face in faces {
            for &p in face {
                if !self.connectivity[start..].contains(&p) {
                    self.connectivity.push(p);
                }
            }
        }
        self.offsets.push(self.connectivity.len());
        self.faces.push(faces.len() as i64);
        for face in faces {
            self.faces.push(face.len() as i64);
            self.faces.extend_from_slice(face);
        }
        self.face_offsets.push(self.faces.len());
    }

    pub fn cell_type(&self, cell: usize) -> Option<CellType> {
        self.types.get(cell).copied()
    }

    pub fn types(&self) -> &[CellType] {
        &self.types
    }

    /// Point ids of `cell`.
    pub fn points(&self, cell: usize) -> Option<&[i64]> {
        let (a, b) = (*self.offsets.get(cell)?, *self.offsets.get(cell + 1)?);
        self.connectivity.get(a..b)
    }

    /// Faces of polyhedron `cell`; `None` for other cell types.
    pub fn polyhedron_faces(&self, cell: usize) -> Option<Vec<&[i64]>> {
        if self.cell_type(cell)? != CellType::Polyhedron {
            return None;
        }
        let stream = self
            .faces
            .get(self.face_offsets[cell]..self.face_offsets[cell + 1])?;
        let (&nfaces, mut rest) = stream.split_first()?;
        let mut out = Vec::with_capacity(nfaces as usize);
        for _ in 0..nfaces {
            let (&n, tail) = rest.split_first()?;
            let (face, tail) = tail.split_at_checked(n as usize)?;
            out.push(face);
            rest = tail;
        }
        Some(out)
    }

    pub fn connectivity(&self) -> &[i64] {
        &self.connectivity
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Renumber every point id (connectivity and faces) through `map`.
    pub fn remap_points(&mut self, map: impl Fn(i64) -> i64) {
        for p in &mut self.connectivity {
            *p = map(*p);
        }
        for cell in 0..self.types.len() {
            if self.types[cell] != CellType::Polyhedron {
                continue;
            }
            let (a, b) = (self.face_offsets[cell], self.face_offsets[cell + 1]);
            let mut i = a + 1;
            while i < b {
                let n = self.faces[i] as usize;
                for p in &mut self.faces[i + 1..i + 1 + n] {
                    *p = map(*p);
                }
                i += n + 1;
            }
        }
    }

    /// Append all cells of `other`, shifting its point ids by `shift`.
    pub fn append(&mut self, other: &CellArray, shift: i64) {
        let base = self.len();
        for cell in 0..other.len() {
            let ct = other.types[cell];
            if ct == CellType::Polyhedron {
                let faces: Vec<Vec<i64>> = other
                    .polyhedron_faces(cell)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|f| f.iter().map(|p| p + shift).collect())
                    .collect();
                self.push_polyhedron(&faces);
            } else if let Some(pts) = other.points(cell) {
                let pts: Vec<i64> = pts.iter().map(|p| p + shift).collect();
                self.push(ct, &pts);
            }
        }
        debug_assert_eq!(self.len(), base + other.len());
    }
}

/// An unstructured block: explicit points and cells.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnstructuredGrid {
    pub points: Points,
    pub cells: CellArray,
    pub point_data: Attributes,
    pub cell_data: Attributes,
    pub family: Option<String>,
}

impl UnstructuredGrid {
    pub fn new(points: Points, cells: CellArray) -> Self {
        Self {
            points,
            cells,
            point_data: Attributes::new(),
            cell_data: Attributes::new(),
            family: None,
        }
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }
}

impl DebugInvariants for UnstructuredGrid {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "UnstructuredGrid");
    }

    fn validate_invariants(&self) -> Result<(), CgnsError> {
        let n = self.num_points() as i64;
        if self.cells.offsets.len() != self.cells.types.len() + 1
            || self.cells.face_offsets.len() != self.cells.types.len() + 1
        {
            return Err(CgnsError::InvalidMesh("cell offsets out of sync".into()));
        }
        if self.cells.offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(CgnsError::InvalidMesh("cell offsets not monotone".into()));
        }
        if let Some(bad) = self.cells.connectivity.iter().find(|&&p| p < 0 || p >= n) {
            return Err(CgnsError::InvalidMesh(format!(
                "connectivity references point {bad}, grid has {n}"
            )));
        }
        check_attributes(&self.point_data, self.num_points(), "point")?;
        check_attributes(&self.cell_data, self.num_cells(), "cell")
    }
}

fn check_attributes(attrs: &Attributes, tuples: usize, what: &str) -> Result<(), CgnsError> {
    for a in attrs.iter() {
        if a.tuples() != tuples {
            return Err(CgnsError::InvalidMesh(format!(
                "{what} array `{}` has {} tuples, expected {tuples}",
                a.name,
                a.tuples()
            )));
        }
    }
    Ok(())
}

/// One mesh block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Mesh {
    Structured(StructuredGrid),
    Unstructured(UnstructuredGrid),
}

impl Mesh {
    pub fn num_points(&self) -> usize {
        match self {
            Mesh::Structured(g) => g.num_points(),
            Mesh::Unstructured(g) => g.num_points(),
        }
    }

    pub fn num_cells(&self) -> usize {
        match self {
            Mesh::Structured(g) => g.num_cells(),
            Mesh::Unstructured(g) => g.num_cells(),
        }
    }

    pub fn points(&self) -> &Points {
        match self {
            Mesh::Structured(g) => &g.points,
            Mesh::Unstructured(g) => &g.points,
        }
    }

    pub fn point_data(&self) -> &Attributes {
        match self {
            Mesh::Structured(g) => &g.point_data,
            Mesh::Unstructured(g) => &g.point_data,
        }
    }

    pub fn cell_data(&self) -> &Attributes {
        match self {
            Mesh::Structured(g) => &g.cell_data,
            Mesh::Unstructured(g) => &g.cell_data,
        }
    }

    pub fn point_data_mut(&mut self) -> &mut Attributes {
        match self {
            Mesh::Structured(g) => &mut g.point_data,
            Mesh::Unstructured(g) => &mut g.point_data,
        }
    }

    pub fn cell_data_mut(&mut self) -> &mut Attributes {
        match self {
            Mesh::Structured(g) => &mut g.cell_data,
            Mesh::Unstructured(g) => &mut g.cell_data,
        }
    }

    pub fn family(&self) -> Option<&str> {
        match self {
            Mesh::Structured(g) => g.family.as_deref(),
            Mesh::Unstructured(g) => g.family.as_deref(),
        }
    }

    pub fn set_family(&mut self, family: Option<String>) {
        match self {
            Mesh::Structured(g) => g.family = family,
            Mesh::Unstructured(g) => g.family = family,
        }
    }

    /// Attach a constant `u8` marker array on cells.
    pub fn mark_cells(&mut self, name: &str, value: u8) {
        let n = self.num_cells();
        self.cell_data_mut()
            .insert(FieldArray::scalar(name, ArrayData::U8(vec![value; n])));
    }
}

impl DebugInvariants for Mesh {
    fn debug_assert_invariants(&self) {
        match self {
            Mesh::Structured(g) => g.debug_assert_invariants(),
            Mesh::Unstructured(g) => g.debug_assert_invariants(),
        }
    }

    fn validate_invariants(&self) -> Result<(), CgnsError> {
        match self {
            Mesh::Structured(g) => g.validate_invariants(),
            Mesh::Unstructured(g) => g.validate_invariants(),
        }
    }
}
