//! CGNS element types and `Elements_t` section decoding.

use crate::mesh::{CellArray, CellType};
use crate::mesh_error::CgnsError;
use crate::node::{CgnsFile, Label, NodeRef};
use log::trace;
use serde::{Deserialize, Serialize};

/// `ElementType_t` values used by mesh sections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ElementType {
    Node = 2,
    Bar2 = 3,
    Bar3 = 4,
    Tri3 = 5,
    Tri6 = 6,
    Quad4 = 7,
    Quad8 = 8,
    Quad9 = 9,
    Tetra4 = 10,
    Tetra10 = 11,
    Pyra5 = 12,
    Pyra14 = 13,
    Penta6 = 14,
    Penta15 = 15,
    Penta18 = 16,
    Hexa8 = 17,
    Hexa20 = 18,
    Hexa27 = 19,
    Mixed = 20,
    Pyra13 = 21,
    NGon = 22,
    NFace = 23,
}

const ALL: [ElementType; 22] = [
    ElementType::Node,
    ElementType::Bar2,
    ElementType::Bar3,
    ElementType::Tri3,
    ElementType::Tri6,
    ElementType::Quad4,
    ElementType::Quad8,
    ElementType::Quad9,
    ElementType::Tetra4,
    ElementType::Tetra10,
    ElementType::Pyra5,
    ElementType::Pyra14,
    ElementType::Penta6,
    ElementType::Penta15,
    ElementType::Penta18,
    ElementType::Hexa8,
    ElementType::Hexa20,
    ElementType::Hexa27,
    ElementType::Mixed,
    ElementType::Pyra13,
    ElementType::NGon,
    ElementType::NFace,
];

impl ElementType {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i64) -> Option<Self> {
        ALL.iter().copied().find(|t| i64::from(t.code()) == code)
    }

    /// Points per element; `None` for MIXED, NGON and NFACE.
    pub fn nodes_per_element(self) -> Option<usize> {
        self.cell_type().and_then(CellType::node_count)
    }

    /// Equivalent mesh cell type. NGON maps to polygons, NFACE to
    /// polyhedra, MIXED has none.
    pub fn cell_type(self) -> Option<CellType> {
        use ElementType::*;
        Some(match self {
            Node => CellType::Vertex,
            Bar2 => CellType::Segment,
            Bar3 => CellType::QuadraticSegment,
            Tri3 => CellType::Triangle,
            Tri6 => CellType::QuadraticTriangle,
            Quad4 => CellType::Quadrilateral,
            Quad8 => CellType::QuadraticQuadrilateral,
            Quad9 => CellType::BiquadraticQuadrilateral,
            Tetra4 => CellType::Tetrahedron,
            Tetra10 => CellType::QuadraticTetrahedron,
            Pyra5 => CellType::Pyramid,
            Pyra13 => CellType::QuadraticPyramid,
            Pyra14 => CellType::TriquadraticPyramid,
            Penta6 => CellType::Prism,
            Penta15 => CellType::QuadraticPrism,
            Penta18 => CellType::BiquadraticQuadraticPrism,
            Hexa8 => CellType::Hexahedron,
            Hexa20 => CellType::QuadraticHexahedron,
            Hexa27 => CellType::TriquadraticHexahedron,
            NGon => CellType::Polygon,
            NFace => CellType::Polyhedron,
            Mixed => return None,
        })
    }

    /// Element type used to store cells of `cell`.
    pub fn from_cell_type(cell: CellType) -> Self {
        use ElementType::*;
        match cell {
            CellType::Vertex => Node,
            CellType::Segment => Bar2,
            CellType::QuadraticSegment => Bar3,
            CellType::Triangle => Tri3,
            CellType::QuadraticTriangle => Tri6,
            CellType::Quadrilateral => Quad4,
            CellType::QuadraticQuadrilateral => Quad8,
            CellType::BiquadraticQuadrilateral => Quad9,
            CellType::Tetrahedron => Tetra4,
            CellType::QuadraticTetrahedron => Tetra10,
            CellType::Pyramid => Pyra5,
            CellType::QuadraticPyramid => Pyra13,
            CellType::TriquadraticPyramid => Pyra14,
            CellType::Prism => Penta6,
            CellType::QuadraticPrism => Penta15,
            CellType::BiquadraticQuadraticPrism => Penta18,
            CellType::Hexahedron => Hexa8,
            CellType::QuadraticHexahedron => Hexa20,
            CellType::TriquadraticHexahedron => Hexa27,
            CellType::Polygon => NGon,
            CellType::Polyhedron => NFace,
        }
    }
}

/// One decoded `Elements_t` node. Connectivity is kept as stored
/// (1-based); decoding into cells renumbers.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    pub name: String,
    pub element_type: ElementType,
    /// Inclusive element id range.
    pub start: i64,
    pub end: i64,
    pub connectivity: Vec<i64>,
    /// `ElementStartOffset`, when present.
    pub offsets: Option<Vec<i64>>,
}

impl Section {
    pub fn count(&self) -> usize {
        (self.end - self.start + 1).max(0) as usize
    }

    /// Starts past the zone's interior element count.
    pub fn is_boundary(&self, interior_cells: i64) -> bool {
        self.start > interior_cells
    }

    /// Per-element slices of the raw connectivity. Uniform sections use
    /// the fixed node count; MIXED/NGON/NFACE use offsets or, without
    /// them, inline counts. Legacy NGON/NFACE slices keep their count
    /// prefix.
    pub fn elements(&self) -> Result<Vec<&[i64]>, CgnsError> {
        let n = self.count();
        let conn = self.connectivity.as_slice();
        if let Some(npe) = self.element_type.nodes_per_element() {
            if conn.len() != npe * n {
                return Err(self.bad(format!(
                    "{} values for {n} elements of {npe} nodes",
                    conn.len()
                )));
            }
            return Ok(conn.chunks(npe.max(1)).collect());
        }
        if let Some(offsets) = &self.offsets {
            if offsets.len() != n + 1 {
                return Err(self.bad(format!("{} offsets for {n} elements", offsets.len())));
            }
            return offsets
                .windows(2)
                .map(|w| {
                    conn.get(w[0] as usize..w[1] as usize).ok_or_else(|| {
                        self.bad(format!("offset range {}..{} out of bounds", w[0], w[1]))
                    })
                })
                .collect();
        }
        let mut out = Vec::with_capacity(n);
        let mut rest = conn;
        for _ in 0..n {
            let &head = rest
                .first()
                .ok_or_else(|| self.bad("connectivity ends early".into()))?;
            let len = match self.element_type {
                ElementType::Mixed => {
                    let t = ElementType::from_code(head)
                        .ok_or_else(|| self.bad(format!("unknown element type {head}")))?;
                    1 + t
                        .nodes_per_element()
                        .ok_or_else(|| self.bad(format!("{t:?} inside a MIXED section")))?
                }
                _ => 1 + head.max(0) as usize,
            };
            let (elem, tail) = rest
                .split_at_checked(len)
                .ok_or_else(|| self.bad("connectivity ends early".into()))?;
            out.push(elem);
            rest = tail;
        }
        Ok(out)
    }

    /// Element slices with the legacy count prefix of NGON/NFACE removed.
    fn polygon_elements(&self) -> Result<Vec<&[i64]>, CgnsError> {
        let mut elems = self.elements()?;
        if self.offsets.is_none() {
            for e in &mut elems {
                *e = e.get(1..).unwrap_or_default();
            }
        }
        Ok(elems)
    }

    fn bad(&self, msg: String) -> CgnsError {
        CgnsError::Parse(format!("section `{}`: {msg}", self.name))
    }

    /// Append this section's cells to `cells` with 0-based point ids.
    /// Every id must address one of the zone's `npts` points. NFACE
    /// sections go through [`push_polyhedra`].
    pub fn push_cells(&self, cells: &mut CellArray, npts: usize) -> Result<(), CgnsError> {
        match self.element_type {
            ElementType::NFace => Err(self.bad("NFACE section needs its NGON faces".into())),
            ElementType::NGon => {
                for face in self.polygon_elements()? {
                    cells.push(CellType::Polygon, &self.zero_based(face, npts)?);
                }
                Ok(())
            }
            ElementType::Mixed => {
                for elem in self.elements()? {
                    let (&code, pts) = elem
                        .split_first()
                        .ok_or_else(|| self.bad("empty MIXED element".into()))?;
                    let ct = ElementType::from_code(code)
                        .and_then(ElementType::cell_type)
                        .ok_or_else(|| self.bad(format!("unsupported type {code} in MIXED")))?;
                    cells.push(ct, &self.zero_based(pts, npts)?);
                }
                Ok(())
            }
            t => {
                let ct = t
                    .cell_type()
                    .ok_or_else(|| self.bad(format!("unsupported element type {t:?}")))?;
                for elem in self.elements()? {
                    cells.push(ct, &self.zero_based(elem, npts)?);
                }
                Ok(())
            }
        }
    }

    /// 1-based stored ids to 0-based, rejecting ids outside `1..=npts`.
    fn zero_based(&self, pts: &[i64], npts: usize) -> Result<Vec<i64>, CgnsError> {
        pts.iter()
            .map(|&p| {
                p.checked_sub(1)
                    .filter(|&q| q >= 0 && (q as u64) < npts as u64)
                    .ok_or_else(|| self.bad(format!("point id {p} outside 1..={npts}")))
            })
            .collect()
    }
}

/// Resolve NFACE cells through the NGON faces of the same zone and append
/// them as polyhedra.
pub fn push_polyhedra(
    nface: &Section,
    ngons: &[&Section],
    npts: usize,
    cells: &mut CellArray,
) -> Result<(), CgnsError> {
    let mut face_table: Vec<(i64, Vec<&[i64]>)> = Vec::with_capacity(ngons.len());
    for s in ngons {
        face_table.push((s.start, s.polygon_elements()?));
    }
    let lookup = |id: i64| -> Option<&[i64]> {
        face_table.iter().find_map(|(start, faces)| {
            let local = id.checked_sub(*start)?;
            usize::try_from(local).ok().and_then(|l| faces.get(l).copied())
        })
    };
    for refs in nface.polygon_elements()? {
        let mut faces = Vec::with_capacity(refs.len());
        for &f in refs {
            // negative ids flag reversed orientation
            let face = f.checked_abs().and_then(lookup).ok_or_else(|| {
                CgnsError::Parse(format!(
                    "section `{}` references face {f} not present in any NGON section",
                    nface.name
                ))
            })?;
            let mut pts = nface.zero_based(face, npts)?;
            if f < 0 {
                pts.reverse();
            }
            faces.push(pts);
        }
        cells.push_polyhedron(&faces);
    }
    Ok(())
}

/// Read the `Elements_t` node `node`.
pub fn read_section(file: &CgnsFile, node: &NodeRef<'_>) -> Result<Section, CgnsError> {
    let header = file.read_index_array(node)?;
    let code = *header
        .first()
        .ok_or_else(|| CgnsError::Parse(format!("section `{}` has no type", node.name())))?;
    let element_type = ElementType::from_code(code).ok_or_else(|| {
        CgnsError::Parse(format!("section `{}`: unknown type {code}", node.name()))
    })?;
    let range = file.find_first_child(node, &Label::IndexRange, Some("ElementRange"))?;
    let bounds = file.read_index_array(&range)?;
    let [start, end] = bounds[..] else {
        return Err(CgnsError::Parse(format!(
            "section `{}`: ElementRange has {} values",
            node.name(),
            bounds.len()
        )));
    };
    let conn = file.find_first_child(node, &Label::DataArray, Some("ElementConnectivity"))?;
    let connectivity = file.read_index_array(&conn)?;
    let offsets = file
        .try_find_first_child(node, &Label::DataArray, Some("ElementStartOffset"))?
        .map(|n| file.read_index_array(&n))
        .transpose()?;
    trace!(
        "section {} {:?} [{start}, {end}] ({} values)",
        node.name(),
        element_type,
        connectivity.len()
    );
    Ok(Section {
        name: node.name().to_string(),
        element_type,
        start,
        end,
        connectivity,
        offsets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(
        t: ElementType,
        start: i64,
        end: i64,
        conn: Vec<i64>,
        offsets: Option<Vec<i64>>,
    ) -> Section {
        Section {
            name: "s".into(),
            element_type: t,
            start,
            end,
            connectivity: conn,
            offsets,
        }
    }

    #[test]
    fn codes_round_trip_and_node_counts() {
        for t in ALL {
            assert_eq!(ElementType::from_code(i64::from(t.code())), Some(t));
            if let Some(ct) = t.cell_type() {
                assert_eq!(ElementType::from_cell_type(ct), t);
            }
        }
        assert_eq!(ElementType::Hexa27.nodes_per_element(), Some(27));
        assert_eq!(ElementType::Pyra13.nodes_per_element(), Some(13));
        assert_eq!(ElementType::Mixed.nodes_per_element(), None);
        assert_eq!(ElementType::from_code(99), None);
    }

    #[test]
    fn uniform_connectivity_length_is_checked() {
        let s = section(ElementType::Tri3, 1, 2, vec![1, 2, 3, 2, 3, 4], None);
        let mut cells = CellArray::new();
        s.push_cells(&mut cells, 4).unwrap();
        assert_eq!(cells.points(1), Some(&[1, 2, 3][..]));
        let bad = section(ElementType::Tri3, 1, 2, vec![1, 2, 3, 2], None);
        assert!(bad.elements().is_err());
    }

    #[test]
    fn mixed_legacy_and_offset_layouts_agree() {
        let conn = vec![5, 1, 2, 3, 7, 1, 2, 3, 4];
        let legacy = section(ElementType::Mixed, 1, 2, conn.clone(), None);
        let modern = section(ElementType::Mixed, 1, 2, conn, Some(vec![0, 4, 9]));
        let (mut a, mut b) = (CellArray::new(), CellArray::new());
        legacy.push_cells(&mut a, 4).unwrap();
        modern.push_cells(&mut b, 4).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.types(), &[CellType::Triangle, CellType::Quadrilateral]);
    }

    #[test]
    fn nface_dereferences_ngon_faces() {
        // one tetrahedron: four triangular faces
        let ngon = section(
            ElementType::NGon,
            1,
            4,
            vec![1, 2, 3, 1, 2, 4, 2, 3, 4, 1, 3, 4],
            Some(vec![0, 3, 6, 9, 12]),
        );
        let nface = section(ElementType::NFace, 5, 5, vec![1, 2, -3, 4], Some(vec![0, 4]));
        let mut cells = CellArray::new();
        push_polyhedra(&nface, &[&ngon], 4, &mut cells).unwrap();
        assert_eq!(cells.len(), 1);
        let faces = cells.polyhedron_faces(0).unwrap();
        assert_eq!(faces[2], &[3, 2, 1]);
        assert_eq!(cells.points(0).unwrap().len(), 4);
    }

    #[test]
    fn legacy_ngon_uses_inline_counts() {
        let ngon = section(ElementType::NGon, 1, 2, vec![3, 1, 2, 3, 4, 1, 2, 3, 4], None);
        let mut cells = CellArray::new();
        ngon.push_cells(&mut cells, 4).unwrap();
        assert_eq!(cells.points(1), Some(&[0, 1, 2, 3][..]));
    }

    #[test]
    fn point_ids_outside_the_zone_are_rejected() {
        let s = section(ElementType::Tri3, 1, 1, vec![1, 2, 99], None);
        let mut cells = CellArray::new();
        assert!(matches!(s.push_cells(&mut cells, 3), Err(CgnsError::Parse(_))));
        let zero = section(ElementType::Tri3, 1, 1, vec![0, 1, 2], None);
        assert!(zero.push_cells(&mut cells, 3).is_err());
        let min = section(ElementType::Tri3, 1, 1, vec![i64::MIN, 1, 2], None);
        assert!(min.push_cells(&mut cells, 3).is_err());
    }

    #[test]
    fn extreme_face_ids_are_parse_errors() {
        let ngon = section(ElementType::NGon, 1, 1, vec![1, 2, 3], Some(vec![0, 3]));
        let nface = section(ElementType::NFace, 2, 2, vec![i64::MIN], Some(vec![0, 1]));
        let mut cells = CellArray::new();
        assert!(matches!(
            push_polyhedra(&nface, &[&ngon], 3, &mut cells),
            Err(CgnsError::Parse(_))
        ));
        let far = section(ElementType::NFace, 2, 2, vec![i64::MAX], Some(vec![0, 1]));
        assert!(push_polyhedra(&far, &[&ngon], 3, &mut cells).is_err());
    }

    #[test]
    fn boundary_sections_start_past_interior() {
        let s = section(ElementType::Quad4, 11, 12, vec![0; 8], None);
        assert!(s.is_boundary(10));
        assert!(!s.is_boundary(12));
    }
}
