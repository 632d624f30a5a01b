//! Mesh elements and edges.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};

/// Maximum number of nodes over all supported topologies (hexahedron).
pub const MAX_ELEMENT_NODES: usize = 8;

/// Element topology.
///
/// The node orderings follow the hexahedral mesh-format convention: planar
/// elements are counter-clockwise, the hexahedron lists the bottom quad
/// (0-3) then the top quad (4-7), the prism lists the two triangles, and the
/// pyramid lists the base quad then the apex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ElementKind {
    /// Linear triangle (3 nodes, planar).
    Triangle,
    /// Bilinear quadrilateral (4 nodes, planar).
    Quadrilateral,
    /// Linear tetrahedron (4 nodes).
    Tetrahedron,
    /// Pyramid with quadrilateral base (5 nodes).
    Pyramid,
    /// Triangular prism (6 nodes).
    Prism,
    /// Trilinear hexahedron (8 nodes).
    Hexahedron,
}

impl ElementKind {
    /// Number of nodes for this topology.
    #[inline]
    #[must_use]
    pub const fn node_count(self) -> usize {
        match self {
            Self::Triangle => 3,
            Self::Quadrilateral | Self::Tetrahedron => 4,
            Self::Pyramid => 5,
            Self::Prism => 6,
            Self::Hexahedron => 8,
        }
    }

    /// Whether this topology spans a volume (3-D) rather than a plane.
    #[inline]
    #[must_use]
    pub const fn is_volume(self) -> bool {
        !matches!(self, Self::Triangle | Self::Quadrilateral)
    }
}

/// A mesh element: topology plus an ordered node list.
///
/// Elements are immutable once constructed; the node list is validated
/// against the topology at construction time.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Element {
    kind: ElementKind,
    nodes: [u32; MAX_ELEMENT_NODES],
}

impl Element {
    /// Create an element from a topology and node indices.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::NodeCountMismatch`] if `nodes` does not have
    /// exactly the node count of `kind`.
    ///
    /// # Example
    ///
    /// ```
    /// use deform_types::{Element, ElementKind};
    ///
    /// let tet = Element::new(ElementKind::Tetrahedron, &[0, 1, 2, 3]).unwrap();
    /// assert_eq!(tet.nodes(), &[0, 1, 2, 3]);
    /// assert!(Element::new(ElementKind::Tetrahedron, &[0, 1, 2]).is_err());
    /// ```
    pub fn new(kind: ElementKind, nodes: &[u32]) -> MeshResult<Self> {
        if nodes.len() != kind.node_count() {
            return Err(MeshError::NodeCountMismatch {
                kind,
                expected: kind.node_count(),
                got: nodes.len(),
            });
        }
        let mut stored = [0_u32; MAX_ELEMENT_NODES];
        stored[..nodes.len()].copy_from_slice(nodes);
        Ok(Self {
            kind,
            nodes: stored,
        })
    }

    /// The element topology.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        self.kind
    }

    /// The ordered node indices (length = node count of the topology).
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[u32] {
        &self.nodes[..self.kind.node_count()]
    }
}

/// An undirected mesh edge, stored in canonical (sorted) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Edge {
    /// Smaller point index.
    pub a: u32,
    /// Larger point index.
    pub b: u32,
}

impl Edge {
    /// Create an edge, normalizing the index order.
    #[inline]
    #[must_use]
    pub const fn new(a: u32, b: u32) -> Self {
        if a <= b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_counts_match_topologies() {
        assert_eq!(ElementKind::Triangle.node_count(), 3);
        assert_eq!(ElementKind::Quadrilateral.node_count(), 4);
        assert_eq!(ElementKind::Tetrahedron.node_count(), 4);
        assert_eq!(ElementKind::Pyramid.node_count(), 5);
        assert_eq!(ElementKind::Prism.node_count(), 6);
        assert_eq!(ElementKind::Hexahedron.node_count(), 8);
    }

    #[test]
    fn element_rejects_wrong_node_count() {
        assert!(Element::new(ElementKind::Hexahedron, &[0, 1, 2, 3]).is_err());
        let hex = Element::new(ElementKind::Hexahedron, &[0, 1, 2, 3, 4, 5, 6, 7]).unwrap();
        assert_eq!(hex.nodes().len(), 8);
    }

    #[test]
    fn edge_is_canonical() {
        assert_eq!(Edge::new(5, 2), Edge::new(2, 5));
        assert_eq!(Edge::new(5, 2).a, 2);
    }

    #[test]
    fn volume_flag() {
        assert!(!ElementKind::Quadrilateral.is_volume());
        assert!(ElementKind::Pyramid.is_volume());
    }
}
