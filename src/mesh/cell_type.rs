//! Cell type metadata for materialized cells.

use serde::{Deserialize, Serialize};

/// Cell types produced by the zone materializer.
///
/// Higher-order cells keep the node ordering they were stored with.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum CellType {
    /// 0D vertex.
    #[default]
    Vertex,
    /// 1D segment/edge.
    Segment,
    /// 3-node segment.
    QuadraticSegment,
    /// 2D simplex (triangle).
    Triangle,
    /// 6-node triangle.
    QuadraticTriangle,
    /// 2D tensor-product cell (quad).
    Quadrilateral,
    /// 8-node serendipity quad.
    QuadraticQuadrilateral,
    /// 9-node Lagrange quad.
    BiquadraticQuadrilateral,
    /// 3D simplex (tet).
    Tetrahedron,
    /// 10-node tet.
    QuadraticTetrahedron,
    /// 3D pyramid.
    Pyramid,
    /// 13-node pyramid.
    QuadraticPyramid,
    /// 14-node pyramid.
    TriquadraticPyramid,
    /// 3D wedge/prism.
    Prism,
    /// 15-node prism.
    QuadraticPrism,
    /// 18-node prism.
    BiquadraticQuadraticPrism,
    /// 3D tensor-product cell (hex).
    Hexahedron,
    /// 20-node hex.
    QuadraticHexahedron,
    /// 27-node hex.
    TriquadraticHexahedron,
    /// 2D polygon; vertex count comes from the cell offsets.
    Polygon,
    /// Generic polyhedron described by its faces.
    Polyhedron,
}

impl CellType {
    /// Returns the topological dimension of the cell.
    pub fn dimension(self) -> u8 {
        match self {
            CellType::Vertex => 0,
            CellType::Segment | CellType::QuadraticSegment => 1,
            CellType::Triangle
            | CellType::QuadraticTriangle
            | CellType::Quadrilateral
            | CellType::QuadraticQuadrilateral
            | CellType::BiquadraticQuadrilateral
            | CellType::Polygon => 2,
            _ => 3,
        }
    }

    /// Fixed node count, `None` for polygons and polyhedra.
    pub fn node_count(self) -> Option<usize> {
        Some(match self {
            CellType::Vertex => 1,
            CellType::Segment => 2,
            CellType::QuadraticSegment => 3,
            CellType::Triangle => 3,
            CellType::QuadraticTriangle => 6,
            CellType::Quadrilateral => 4,
            CellType::QuadraticQuadrilateral => 8,
            CellType::BiquadraticQuadrilateral => 9,
            CellType::Tetrahedron => 4,
            CellType::QuadraticTetrahedron => 10,
            CellType::Pyramid => 5,
            CellType::QuadraticPyramid => 13,
            CellType::TriquadraticPyramid => 14,
            CellType::Prism => 6,
            CellType::QuadraticPrism => 15,
            CellType::BiquadraticQuadraticPrism => 18,
            CellType::Hexahedron => 8,
            CellType::QuadraticHexahedron => 20,
            CellType::TriquadraticHexahedron => 27,
            CellType::Polygon | CellType::Polyhedron => return None,
        })
    }
}
