//! Gauss quadrature rules per element topology.
//!
//! The rules are fixed per topology: one point for the simplices, tensor
//! 2x2(x2) Gauss for the quadrilateral and hexahedron, and dedicated
//! 5/6-point rules for the pyramid and prism. Reference coordinates and
//! weights follow the classical tables for these reference elements.

use deform_types::ElementKind;

/// One quadrature point: reference coordinate plus weight.
#[derive(Debug, Clone, Copy)]
pub struct GaussPoint {
    /// First reference coordinate.
    pub xi: f64,
    /// Second reference coordinate.
    pub eta: f64,
    /// Third reference coordinate (zero for planar rules).
    pub mu: f64,
    /// Quadrature weight.
    pub weight: f64,
}

const G: f64 = 0.577_350_269_189_626;
const W6: f64 = 0.166_666_666_666_666;

const TRIANGLE: [GaussPoint; 1] = [GaussPoint {
    xi: 0.333_333_333_333_333,
    eta: 0.333_333_333_333_333,
    mu: 0.0,
    weight: 0.5,
}];

const QUADRILATERAL: [GaussPoint; 4] = [
    GaussPoint { xi: -G, eta: -G, mu: 0.0, weight: 1.0 },
    GaussPoint { xi: G, eta: -G, mu: 0.0, weight: 1.0 },
    GaussPoint { xi: G, eta: G, mu: 0.0, weight: 1.0 },
    GaussPoint { xi: -G, eta: G, mu: 0.0, weight: 1.0 },
];

const TETRAHEDRON: [GaussPoint; 1] = [GaussPoint {
    xi: 0.25,
    eta: 0.25,
    mu: 0.25,
    weight: W6,
}];

const PYRAMID: [GaussPoint; 5] = [
    GaussPoint { xi: 0.5, eta: 0.0, mu: 0.153_175_416_344_814_6, weight: 0.133_333_333_333_333 },
    GaussPoint { xi: 0.0, eta: 0.5, mu: 0.153_175_416_344_814_6, weight: 0.133_333_333_333_333 },
    GaussPoint { xi: -0.5, eta: 0.0, mu: 0.153_175_416_344_814_6, weight: 0.133_333_333_333_333 },
    GaussPoint { xi: 0.0, eta: -0.5, mu: 0.153_175_416_344_814_6, weight: 0.133_333_333_333_333 },
    GaussPoint { xi: 0.0, eta: 0.0, mu: 0.637_298_334_620_741_6, weight: 0.133_333_333_333_333 },
];

const PRISM: [GaussPoint; 6] = [
    GaussPoint { xi: 0.5, eta: 0.5, mu: -G, weight: W6 },
    GaussPoint { xi: -G, eta: 0.0, mu: 0.5, weight: W6 },
    GaussPoint { xi: 0.5, eta: -G, mu: 0.0, weight: W6 },
    GaussPoint { xi: 0.5, eta: 0.5, mu: G, weight: W6 },
    GaussPoint { xi: G, eta: 0.0, mu: 0.5, weight: W6 },
    GaussPoint { xi: 0.5, eta: G, mu: 0.0, weight: W6 },
];

const HEXAHEDRON: [GaussPoint; 8] = [
    GaussPoint { xi: -G, eta: -G, mu: -G, weight: 1.0 },
    GaussPoint { xi: -G, eta: -G, mu: G, weight: 1.0 },
    GaussPoint { xi: -G, eta: G, mu: -G, weight: 1.0 },
    GaussPoint { xi: -G, eta: G, mu: G, weight: 1.0 },
    GaussPoint { xi: G, eta: -G, mu: -G, weight: 1.0 },
    GaussPoint { xi: G, eta: -G, mu: G, weight: 1.0 },
    GaussPoint { xi: G, eta: G, mu: -G, weight: 1.0 },
    GaussPoint { xi: G, eta: G, mu: G, weight: 1.0 },
];

/// The quadrature rule for a topology.
#[must_use]
pub fn rule(kind: ElementKind) -> &'static [GaussPoint] {
    match kind {
        ElementKind::Triangle => &TRIANGLE,
        ElementKind::Quadrilateral => &QUADRILATERAL,
        ElementKind::Tetrahedron => &TETRAHEDRON,
        ElementKind::Pyramid => &PYRAMID,
        ElementKind::Prism => &PRISM,
        ElementKind::Hexahedron => &HEXAHEDRON,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{shape_functions, ShapeDerivatives, MAX_NODES};
    use approx::assert_relative_eq;

    #[test]
    fn rule_sizes() {
        assert_eq!(rule(ElementKind::Triangle).len(), 1);
        assert_eq!(rule(ElementKind::Quadrilateral).len(), 4);
        assert_eq!(rule(ElementKind::Tetrahedron).len(), 1);
        assert_eq!(rule(ElementKind::Pyramid).len(), 5);
        assert_eq!(rule(ElementKind::Prism).len(), 6);
        assert_eq!(rule(ElementKind::Hexahedron).len(), 8);
    }

    /// Sum of weight * det over the rule integrates the element measure
    /// for topologies whose mapping has polynomial Jacobian.
    #[test]
    fn weighted_jacobians_integrate_the_measure() {
        let mut out = ShapeDerivatives::default();

        // Unit triangle, area 1/2 (identity mapping).
        let mut tri = [[0.0; 3]; MAX_NODES];
        tri[1] = [1.0, 0.0, 0.0];
        tri[2] = [0.0, 1.0, 0.0];
        let total: f64 = rule(ElementKind::Triangle)
            .iter()
            .map(|g| {
                g.weight * shape_functions(ElementKind::Triangle, g.xi, g.eta, g.mu, &tri, &mut out)
            })
            .sum();
        assert_relative_eq!(total, 0.5, epsilon = 1e-12);

        // Unit square, area 1.
        let mut quad = [[0.0; 3]; MAX_NODES];
        quad[1] = [1.0, 0.0, 0.0];
        quad[2] = [1.0, 1.0, 0.0];
        quad[3] = [0.0, 1.0, 0.0];
        let total: f64 = rule(ElementKind::Quadrilateral)
            .iter()
            .map(|g| {
                g.weight
                    * shape_functions(ElementKind::Quadrilateral, g.xi, g.eta, g.mu, &quad, &mut out)
            })
            .sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);

        // Unit cube, volume 1.
        let cube = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ];
        let total: f64 = rule(ElementKind::Hexahedron)
            .iter()
            .map(|g| {
                g.weight
                    * shape_functions(ElementKind::Hexahedron, g.xi, g.eta, g.mu, &cube, &mut out)
            })
            .sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);

        // Tetrahedron ordered for a positive reference mapping, volume 1/6.
        let mut tet = [[0.0; 3]; MAX_NODES];
        tet[0] = [1.0, 0.0, 0.0];
        tet[1] = [0.0, 1.0, 0.0];
        tet[2] = [0.0, 0.0, 1.0];
        let total: f64 = rule(ElementKind::Tetrahedron)
            .iter()
            .map(|g| {
                g.weight
                    * shape_functions(ElementKind::Tetrahedron, g.xi, g.eta, g.mu, &tet, &mut out)
            })
            .sum();
        assert_relative_eq!(total, 1.0 / 6.0, epsilon = 1e-12);

        // Unit prism ordered for a positive reference mapping, volume 1/2.
        let mut prism = [[0.0; 3]; MAX_NODES];
        prism[1] = [1.0, 0.0, 0.0];
        prism[2] = [0.0, 1.0, 0.0];
        prism[3] = [0.0, 0.0, 1.0];
        prism[4] = [1.0, 0.0, 1.0];
        prism[5] = [0.0, 1.0, 1.0];
        let total: f64 = rule(ElementKind::Prism)
            .iter()
            .map(|g| {
                g.weight * shape_functions(ElementKind::Prism, g.xi, g.eta, g.mu, &prism, &mut out)
            })
            .sum();
        assert_relative_eq!(total, 0.5, epsilon = 1e-12);
    }
}
