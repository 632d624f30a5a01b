//! Trivariate Bézier control-point lattices (FFD boxes).
//!
//! An [`FfdBox`] owns a 3-D grid of control points indexed by `(i, j, k)`
//! and blends them with tensor-product Bernstein factors: the forward map
//! from lattice parameters in `[0, 1]^3` to cartesian space. Boxes carry a
//! tag, a nesting level and parent/child tag lists so that coarse boxes can
//! re-parametrize the control points of finer boxes nested inside them.
//!
//! FFD lattices are always three-dimensional; planar problems use a
//! one-cell-thick box spanning `z = -0.5` to `z = +0.5`.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bernstein::bernstein;
use crate::error::{FfdError, FfdResult};

/// Tolerance used when deciding whether an inverse-mapped parameter still
/// counts as inside the unit cube.
pub const PARAM_TOL: f64 = 1e-10;

/// Corner ordering of the lattice hull, following the hexahedral
/// mesh-format convention: bottom quad `0..4`, top quad `4..8`, both
/// counter-clockwise, with corner 0 at parameters `(0, 0, 0)` and corner 6
/// at `(1, 1, 1)`.
pub const NUM_CORNERS: usize = 8;

/// Fixed decomposition of the corner hexahedron into five tetrahedra, used
/// for point-in-box tests. Each row is a cyclic window over four corner
/// indices; the orderings are a convention inherited from the mesh format
/// and must be preserved as-is.
const HULL_TETS: [[usize; 7]; 5] = [
    [0, 1, 2, 5, 0, 1, 2],
    [0, 2, 7, 5, 0, 2, 7],
    [0, 2, 3, 7, 0, 2, 3],
    [0, 5, 7, 4, 0, 5, 7],
    [2, 7, 5, 6, 2, 7, 5],
];

/// A surface point cached by an FFD box.
///
/// The cache records where each deforming-boundary vertex sits in the box's
/// parameter space, so the cartesian position can be re-evaluated after
/// control-point edits.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfacePoint {
    /// Marker index in the mesh.
    pub marker: usize,
    /// Vertex index inside the marker.
    pub vertex: usize,
    /// Mesh point index.
    pub point: u32,
    /// Parametric coordinate inside the box.
    pub param: Point3<f64>,
    /// Cartesian coordinate at the time of the last (re-)evaluation.
    pub cart: Point3<f64>,
}

/// The coarse "shadow" lattice used to re-parametrize another box.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct SupportLattice {
    orders: [usize; 3],
    points: Vec<Point3<f64>>,
}

/// A free-form deformation box.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FfdBox {
    tag: String,
    level: usize,
    parents: Vec<String>,
    children: Vec<String>,
    degree: [usize; 3],
    corners: [Point3<f64>; NUM_CORNERS],
    control_points: Vec<Point3<f64>>,
    original_control_points: Vec<Point3<f64>>,
    param_control_points: Vec<Point3<f64>>,
    support: Option<SupportLattice>,
    /// Cached surface points re-evaluated after control-point edits.
    pub surface_points: Vec<SurfacePoint>,
}

impl FfdBox {
    /// Create a box with the given tag and degree triple.
    ///
    /// Corner and control points start at the origin; call
    /// [`FfdBox::init_parallelepiped`] (or load control points from
    /// metadata) before evaluating.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::InvalidDegrees`] if any degree is zero.
    pub fn new(tag: impl Into<String>, l_degree: usize, m_degree: usize, n_degree: usize) -> FfdResult<Self> {
        if l_degree == 0 || m_degree == 0 || n_degree == 0 {
            return Err(FfdError::InvalidDegrees(l_degree, m_degree, n_degree));
        }
        let count = (l_degree + 1) * (m_degree + 1) * (n_degree + 1);
        Ok(Self {
            tag: tag.into(),
            level: 0,
            parents: Vec::new(),
            children: Vec::new(),
            degree: [l_degree, m_degree, n_degree],
            corners: [Point3::origin(); NUM_CORNERS],
            control_points: vec![Point3::origin(); count],
            original_control_points: vec![Point3::origin(); count],
            param_control_points: vec![Point3::origin(); count],
            support: None,
            surface_points: Vec::new(),
        })
    }

    /// The box tag.
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Nesting level (0 = outermost).
    #[inline]
    #[must_use]
    pub const fn level(&self) -> usize {
        self.level
    }

    /// Set the nesting level.
    pub fn set_level(&mut self, level: usize) {
        self.level = level;
    }

    /// Degree triple `(l, m, n)`.
    #[inline]
    #[must_use]
    pub const fn degree(&self) -> [usize; 3] {
        self.degree
    }

    /// Order triple `(l + 1, m + 1, n + 1)`.
    #[inline]
    #[must_use]
    pub const fn orders(&self) -> [usize; 3] {
        [
            self.degree[0] + 1,
            self.degree[1] + 1,
            self.degree[2] + 1,
        ]
    }

    /// Total number of control points.
    #[inline]
    #[must_use]
    pub fn num_control_points(&self) -> usize {
        self.control_points.len()
    }

    /// Tags of the parent boxes.
    #[must_use]
    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    /// Tags of the child boxes.
    #[must_use]
    pub fn children(&self) -> &[String] {
        &self.children
    }

    /// Record a parent box tag.
    pub fn add_parent(&mut self, tag: impl Into<String>) {
        self.parents.push(tag.into());
    }

    /// Record a child box tag.
    pub fn add_child(&mut self, tag: impl Into<String>) {
        self.children.push(tag.into());
    }

    /// Flat index of lattice node `(i, j, k)`.
    #[inline]
    fn index(&self, i: usize, j: usize, k: usize) -> usize {
        let [lo, mo, _] = self.orders();
        i + lo * (j + mo * k)
    }

    fn check_index(&self, i: usize, j: usize, k: usize) -> FfdResult<usize> {
        let [lo, mo, no] = self.orders();
        if i >= lo || j >= mo || k >= no {
            return Err(FfdError::ControlPointOutOfRange {
                i,
                j,
                k,
                l: lo,
                m: mo,
                n: no,
            });
        }
        Ok(self.index(i, j, k))
    }

    /// A corner point of the box hull.
    #[inline]
    #[must_use]
    pub fn corner(&self, index: usize) -> Point3<f64> {
        self.corners[index]
    }

    /// Set a corner point of the box hull.
    pub fn set_corner(&mut self, index: usize, coord: Point3<f64>) {
        self.corners[index] = coord;
    }

    /// Set the corners to the unit cube (corner 0 at the origin).
    pub fn set_unit_corners(&mut self) {
        const UNIT: [[f64; 3]; NUM_CORNERS] = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ];
        for (corner, coords) in self.corners.iter_mut().zip(UNIT) {
            *corner = Point3::new(coords[0], coords[1], coords[2]);
        }
    }

    /// Initialize the lattice as a uniformly spaced parallelepiped whose
    /// extremal nodes coincide with the hull corners, and snapshot it as
    /// the original configuration.
    ///
    /// The spacing interpolates corner 0 → 1 along i, corner 0 → 3 along j
    /// and corner 0 → 4 along k.
    #[allow(clippy::cast_precision_loss)]
    pub fn init_parallelepiped(&mut self) {
        let [l, m, n] = self.degree;
        let origin = self.corners[0];
        let di = (self.corners[1].x - origin.x) / l as f64;
        let dj = (self.corners[3].y - origin.y) / m as f64;
        let dk = (self.corners[4].z - origin.z) / n as f64;
        for k in 0..=n {
            for j in 0..=m {
                for i in 0..=l {
                    let idx = self.index(i, j, k);
                    self.control_points[idx] = Point3::new(
                        origin.x + i as f64 * di,
                        origin.y + j as f64 * dj,
                        origin.z + k as f64 * dk,
                    );
                }
            }
        }
        self.snapshot_control_points();
    }

    /// Read a control point.
    ///
    /// # Panics
    ///
    /// Panics if the index triple lies outside the lattice.
    #[inline]
    #[must_use]
    pub fn control_point(&self, i: usize, j: usize, k: usize) -> Point3<f64> {
        self.control_points[self.index(i, j, k)]
    }

    /// All control points in flat `(i fastest, then j, then k)` order.
    #[must_use]
    pub fn control_points(&self) -> &[Point3<f64>] {
        &self.control_points
    }

    /// Overwrite a control point.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::ControlPointOutOfRange`] for indices outside the
    /// lattice.
    pub fn set_control_point(
        &mut self,
        i: usize,
        j: usize,
        k: usize,
        coord: Point3<f64>,
    ) -> FfdResult<()> {
        let idx = self.check_index(i, j, k)?;
        self.control_points[idx] = coord;
        Ok(())
    }

    /// Displace a control point by `delta`.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::ControlPointOutOfRange`] for indices outside the
    /// lattice.
    pub fn move_control_point(
        &mut self,
        i: usize,
        j: usize,
        k: usize,
        delta: &Vector3<f64>,
    ) -> FfdResult<()> {
        let idx = self.check_index(i, j, k)?;
        self.control_points[idx] += delta;
        Ok(())
    }

    /// Snapshot the current control points as the original configuration.
    pub fn snapshot_control_points(&mut self) {
        self.original_control_points.clone_from(&self.control_points);
    }

    /// Restore the control points snapshotted as the original configuration.
    ///
    /// Design variables call this between evaluations so each variable is
    /// applied to the undeformed lattice.
    pub fn reset_control_points(&mut self) {
        self.control_points.clone_from(&self.original_control_points);
    }

    /// Read a control point of the parametric lattice (this box's control
    /// points expressed in a parent box's parameter space).
    #[inline]
    #[must_use]
    pub fn param_control_point(&self, i: usize, j: usize, k: usize) -> Point3<f64> {
        self.param_control_points[self.index(i, j, k)]
    }

    /// Store a control point of the parametric lattice.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::ControlPointOutOfRange`] for indices outside the
    /// lattice.
    pub fn set_param_control_point(
        &mut self,
        i: usize,
        j: usize,
        k: usize,
        param: Point3<f64>,
    ) -> FfdResult<()> {
        let idx = self.check_index(i, j, k)?;
        self.param_control_points[idx] = param;
        Ok(())
    }

    /// Forward map: evaluate the cartesian coordinate at lattice parameters.
    ///
    /// Triple sum over all control points of the tensor product of three
    /// Bernstein factors.
    ///
    /// # Example
    ///
    /// ```
    /// use deform_ffd::FfdBox;
    /// use nalgebra::Point3;
    ///
    /// let mut lattice = FfdBox::new("WING", 2, 2, 2).unwrap();
    /// lattice.set_unit_corners();
    /// lattice.init_parallelepiped();
    ///
    /// let p = lattice.eval(&Point3::new(0.0, 0.0, 0.0));
    /// assert!((p - lattice.corner(0)).norm() < 1e-14);
    /// ```
    #[must_use]
    pub fn eval(&self, param: &Point3<f64>) -> Point3<f64> {
        let [l, m, n] = self.degree;
        let mut out = Vector3::zeros();
        for k in 0..=n {
            let bk = bernstein(n, k, param.z);
            for j in 0..=m {
                let bjk = bernstein(m, j, param.y) * bk;
                for i in 0..=l {
                    let weight = bernstein(l, i, param.x) * bjk;
                    out += self.control_points[self.index(i, j, k)].coords * weight;
                }
            }
        }
        Point3::from(out)
    }

    /// A degree-(1,1,1) copy of this box keeping only the extremal control
    /// points.
    ///
    /// Point inversion runs against this reduced box: for a parallelepiped
    /// lattice the mapping is identical and the Newton objective is much
    /// better conditioned.
    #[must_use]
    pub fn reduced(&self) -> Self {
        let mut reduced = Self::new(self.tag.clone(), 1, 1, 1)
            .unwrap_or_else(|_| unreachable!("degree (1, 1, 1) is always valid"));
        reduced.corners = self.corners;
        let [l, m, n] = self.degree;
        for ko in 0..2 {
            for jo in 0..2 {
                for io in 0..2 {
                    let source = self.control_point(io * l, jo * m, ko * n);
                    let idx = reduced.index(io, jo, ko);
                    reduced.control_points[idx] = source;
                }
            }
        }
        reduced.snapshot_control_points();
        reduced
    }

    /// Whether a cartesian point lies inside the corner hull.
    ///
    /// The hull is split into the five fixed tetrahedra of [`HULL_TETS`];
    /// the point is inside when, for some tetrahedron, it sits on the same
    /// side of all four faces as the opposing vertex.
    #[must_use]
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        for tet in &HULL_TETS {
            let mut inside = true;
            for face in 0..4 {
                let a = self.corners[tet[face + 1]];
                let b = self.corners[tet[face + 2]];
                let c = self.corners[tet[face + 3]];
                let side_point = plane_side(point, &a, &b, &c);
                let side_vertex = plane_side(&self.corners[tet[face]], &a, &b, &c);
                if side_point * side_vertex < 0.0 {
                    inside = false;
                    break;
                }
            }
            if inside {
                return true;
            }
        }
        false
    }

    /// Whether a parameter triple lies inside the unit cube within
    /// [`PARAM_TOL`].
    #[must_use]
    pub fn param_in_range(param: &Point3<f64>) -> bool {
        (0..3).all(|d| param[d] >= -PARAM_TOL && param[d] <= 1.0 + PARAM_TOL)
    }

    /// Build the support lattice for `target`: a grid with `target`'s
    /// orders, uniformly spaced over this box's corner hull.
    ///
    /// Together with [`FfdBox::apply_support_lattice`] this propagates a
    /// coarse box's shape onto a finer box nested inside it.
    #[allow(clippy::cast_precision_loss)]
    pub fn set_support_lattice(&mut self, target: &Self) {
        let [lo, mo, no] = target.orders();
        let origin = self.corners[0];
        let di = (self.corners[1].x - origin.x) / (lo - 1) as f64;
        let dj = (self.corners[3].y - origin.y) / (mo - 1) as f64;
        let dk = (self.corners[4].z - origin.z) / (no - 1) as f64;
        let mut points = Vec::with_capacity(lo * mo * no);
        for k in 0..no {
            for j in 0..mo {
                for i in 0..lo {
                    points.push(Point3::new(
                        origin.x + i as f64 * di,
                        origin.y + j as f64 * dj,
                        origin.z + k as f64 * dk,
                    ));
                }
            }
        }
        self.support = Some(SupportLattice {
            orders: [lo, mo, no],
            points,
        });
    }

    /// Deform `target`'s control points through this box's support lattice.
    ///
    /// This box must be the unit degree-(1,1,1) box, so the support-point
    /// coordinates can be read directly as parameters. Its control points
    /// are first pinned to `target`'s corners, then every support point is
    /// pushed through the forward map and written back as a `target`
    /// control point (and snapshotted as the original configuration).
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::SupportNotBuilt`] if no support lattice was
    /// built for `target` beforehand.
    pub fn apply_support_lattice(&mut self, target: &mut Self) -> FfdResult<()> {
        let support = self
            .support
            .take()
            .ok_or_else(|| FfdError::SupportNotBuilt(target.tag.clone()))?;
        debug_assert_eq!(support.orders, target.orders());
        debug_assert_eq!(self.degree, [1, 1, 1]);

        // Corner c maps to the lattice node with the matching extremal
        // index triple (hexahedral corner convention).
        const CORNER_NODES: [[usize; 3]; NUM_CORNERS] = [
            [0, 0, 0],
            [1, 0, 0],
            [1, 1, 0],
            [0, 1, 0],
            [0, 0, 1],
            [1, 0, 1],
            [1, 1, 1],
            [0, 1, 1],
        ];
        for (corner, node) in target.corners.iter().zip(CORNER_NODES) {
            let idx = self.index(node[0], node[1], node[2]);
            self.control_points[idx] = *corner;
        }

        let [lo, mo, no] = support.orders;
        for k in 0..no {
            for j in 0..mo {
                for i in 0..lo {
                    let param = support.points[i + lo * (j + mo * k)];
                    let cart = self.eval(&param);
                    target.set_control_point(i, j, k, cart)?;
                }
            }
        }
        target.snapshot_control_points();
        self.support = Some(support);
        Ok(())
    }
}

/// Signed side of `p` relative to the plane through `a`, `b`, `c`.
///
/// Only the sign is meaningful; the magnitude is six times the tetrahedron
/// volume.
fn plane_side(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    (b - a).cross(&(c - a)).dot(&(p - a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box(l: usize, m: usize, n: usize) -> FfdBox {
        let mut lattice = FfdBox::new("BOX", l, m, n).unwrap();
        lattice.set_unit_corners();
        lattice.init_parallelepiped();
        lattice
    }

    #[test]
    fn rejects_zero_degree() {
        assert!(FfdBox::new("BAD", 0, 1, 1).is_err());
    }

    #[test]
    fn corner_exactness() {
        let lattice = unit_box(3, 2, 2);
        let p0 = lattice.eval(&Point3::new(0.0, 0.0, 0.0));
        let p6 = lattice.eval(&Point3::new(1.0, 1.0, 1.0));
        assert_relative_eq!((p0 - lattice.corner(0)).norm(), 0.0, epsilon = 1e-14);
        assert_relative_eq!((p6 - lattice.corner(6)).norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn parallelepiped_eval_is_identity_on_unit_box() {
        let lattice = unit_box(2, 3, 2);
        for &(u, v, w) in &[(0.25, 0.5, 0.75), (0.1, 0.9, 0.3), (0.5, 0.5, 0.5)] {
            let p = lattice.eval(&Point3::new(u, v, w));
            assert_relative_eq!(p.x, u, epsilon = 1e-12);
            assert_relative_eq!(p.y, v, epsilon = 1e-12);
            assert_relative_eq!(p.z, w, epsilon = 1e-12);
        }
    }

    #[test]
    fn moved_control_point_bends_the_interior() {
        let mut lattice = unit_box(2, 2, 2);
        lattice
            .move_control_point(1, 1, 1, &Vector3::new(0.0, 0.0, 0.5))
            .unwrap();
        let center = lattice.eval(&Point3::new(0.5, 0.5, 0.5));
        assert!(center.z > 0.5, "center should move with the control point");

        // Corners are untouched by an interior control point.
        let p0 = lattice.eval(&Point3::new(0.0, 0.0, 0.0));
        assert_relative_eq!((p0 - lattice.corner(0)).norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn reset_restores_the_snapshot() {
        let mut lattice = unit_box(2, 2, 2);
        lattice
            .move_control_point(1, 1, 1, &Vector3::new(0.3, 0.0, 0.0))
            .unwrap();
        lattice.reset_control_points();
        assert_relative_eq!(
            (lattice.control_point(1, 1, 1) - Point3::new(0.5, 0.5, 0.5)).norm(),
            0.0,
            epsilon = 1e-14
        );
    }

    #[test]
    fn out_of_range_control_point_is_an_error() {
        let mut lattice = unit_box(2, 2, 2);
        assert!(lattice
            .move_control_point(3, 0, 0, &Vector3::zeros())
            .is_err());
    }

    #[test]
    fn contains_unit_cube() {
        let lattice = unit_box(2, 2, 2);
        assert!(lattice.contains(&Point3::new(0.5, 0.5, 0.5)));
        assert!(lattice.contains(&Point3::new(0.99, 0.01, 0.5)));
        assert!(!lattice.contains(&Point3::new(1.5, 0.5, 0.5)));
        assert!(!lattice.contains(&Point3::new(-0.1, 0.5, 0.5)));
    }

    #[test]
    fn reduced_box_matches_on_parallelepipeds() {
        let lattice = unit_box(4, 3, 2);
        let reduced = lattice.reduced();
        assert_eq!(reduced.degree(), [1, 1, 1]);
        for &(u, v, w) in &[(0.2, 0.7, 0.4), (0.9, 0.1, 0.6)] {
            let p = Point3::new(u, v, w);
            assert_relative_eq!(
                (lattice.eval(&p) - reduced.eval(&p)).norm(),
                0.0,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn support_lattice_rebuilds_a_parallelepiped() {
        let mut target = FfdBox::new("TARGET", 3, 3, 3).unwrap();
        target.set_unit_corners();

        let mut unit = FfdBox::new("UNIT", 1, 1, 1).unwrap();
        unit.set_unit_corners();
        unit.init_parallelepiped();

        unit.set_support_lattice(&target);
        unit.apply_support_lattice(&mut target).unwrap();

        // The rebuilt lattice must be the uniform parallelepiped.
        let mut expected = FfdBox::new("EXPECTED", 3, 3, 3).unwrap();
        expected.set_unit_corners();
        expected.init_parallelepiped();
        for (got, want) in target
            .control_points()
            .iter()
            .zip(expected.control_points())
        {
            assert_relative_eq!((got - want).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn param_range_check_tolerates_roundoff() {
        assert!(FfdBox::param_in_range(&Point3::new(0.0, 1.0, 0.5)));
        assert!(FfdBox::param_in_range(&Point3::new(-1e-12, 0.5, 1.0)));
        assert!(!FfdBox::param_in_range(&Point3::new(1.1, 0.5, 0.5)));
    }
}
