use super::topology::ImageVector;
use nalgebra::{Matrix3, Point3, Vector3};
use thiserror::Error;

/// Fractional coordinates closer than this to an integer are treated as lying
/// on the cell face.
const FRACTIONAL_SNAP: f64 = 1.0e-9;

/// Cosines below this magnitude are taken as exactly zero, so right angles
/// produce an exactly orthogonal cell matrix.
const COSINE_SNAP: f64 = 1.0e-12;

fn snap_cosine(degrees: f64) -> f64 {
    let cosine = degrees.to_radians().cos();
    if cosine.abs() < COSINE_SNAP { 0.0 } else { cosine }
}

/// Splits a fractional coordinate into its part in [0, 1) and the integer
/// that was subtracted from it.
fn wrap_component(value: f64) -> (f64, i32) {
    let nearest = value.round();
    if (value - nearest).abs() < FRACTIONAL_SNAP {
        return (0.0, nearest as i32);
    }
    let floor = value.floor();
    let wrapped = value - floor;
    // Rounding can land exactly on 1.0 for values just below an integer.
    if wrapped >= 1.0 {
        (wrapped - 1.0, floor as i32 + 1)
    } else {
        (wrapped, floor as i32)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LatticeError {
    #[error("Cell length must be positive (got {0})")]
    NonPositiveLength(f64),
    #[error("Cell angle must lie strictly between 0 and 180 degrees (got {0})")]
    InvalidAngle(f64),
    #[error("Cell parameters describe a degenerate cell")]
    Degenerate,
}

/// A triclinic unit cell.
///
/// The cell vectors are stored as the columns of a matrix using the usual
/// crystallographic convention: `a` along x, `b` in the xy-plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    lengths: [f64; 3],
    angles: [f64; 3],
    matrix: Matrix3<f64>,
    inverse: Matrix3<f64>,
}

impl Lattice {
    /// Builds a lattice from cell lengths (Angstroms) and angles (degrees).
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError`] if a length is not positive, an angle is
    /// outside (0, 180), or the parameters do not describe a cell with volume.
    pub fn from_parameters(
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
    ) -> Result<Self, LatticeError> {
        for length in [a, b, c] {
            if !(length > 0.0) || !length.is_finite() {
                return Err(LatticeError::NonPositiveLength(length));
            }
        }
        for angle in [alpha, beta, gamma] {
            if !(angle > 0.0 && angle < 180.0) {
                return Err(LatticeError::InvalidAngle(angle));
            }
        }

        let (ca, cb, cg) = (snap_cosine(alpha), snap_cosine(beta), snap_cosine(gamma));
        let sg = gamma.to_radians().sin();

        let cx = c * cb;
        let cy = c * (ca - cb * cg) / sg;
        let cz_sq = c * c - cx * cx - cy * cy;
        if cz_sq <= 0.0 {
            return Err(LatticeError::Degenerate);
        }

        let matrix = Matrix3::new(
            a, b * cg, cx, //
            0.0, b * sg, cy, //
            0.0, 0.0, cz_sq.sqrt(),
        );
        let inverse = matrix.try_inverse().ok_or(LatticeError::Degenerate)?;

        Ok(Self {
            lengths: [a, b, c],
            angles: [alpha, beta, gamma],
            matrix,
            inverse,
        })
    }

    pub fn lengths(&self) -> [f64; 3] {
        self.lengths
    }

    pub fn angles(&self) -> [f64; 3] {
        self.angles
    }

    /// The six cell parameters `(a, b, c, alpha, beta, gamma)`.
    pub fn parameters(&self) -> [f64; 6] {
        let [a, b, c] = self.lengths;
        let [alpha, beta, gamma] = self.angles;
        [a, b, c, alpha, beta, gamma]
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn volume(&self) -> f64 {
        self.matrix.determinant().abs()
    }

    pub fn fractional_to_cartesian(&self, frac: &Vector3<f64>) -> Point3<f64> {
        Point3::from(self.matrix * frac)
    }

    pub fn cartesian_to_fractional(&self, cart: &Point3<f64>) -> Vector3<f64> {
        self.inverse * cart.coords
    }

    /// Cartesian translation corresponding to an integer cell offset.
    pub fn translation(&self, image: &ImageVector) -> Vector3<f64> {
        self.matrix * image.to_fractional()
    }

    /// Wraps a Cartesian point into the cell, returning the wrapped point and
    /// the integer shift that was *subtracted* from its fractional coordinates.
    ///
    /// `wrapped + translation(shift) == point` up to rounding. Points on a
    /// cell face (within [`FRACTIONAL_SNAP`] of an integer fractional
    /// coordinate) land on the lower face.
    pub fn wrap_with_shift(&self, point: &Point3<f64>) -> (Point3<f64>, ImageVector) {
        let frac = self.cartesian_to_fractional(point);
        let (wrapped, shift) = Self::wrap_fractional_with_shift(&frac);
        (self.fractional_to_cartesian(&wrapped), shift)
    }

    pub fn wrap_cartesian(&self, point: &Point3<f64>) -> Point3<f64> {
        self.wrap_with_shift(point).0
    }

    /// Wraps fractional coordinates into [0, 1) per axis, returning the
    /// integer shift that was subtracted.
    pub fn wrap_fractional_with_shift(frac: &Vector3<f64>) -> (Vector3<f64>, ImageVector) {
        let mut wrapped = *frac;
        let mut shift = [0i32; 3];
        for axis in 0..3 {
            (wrapped[axis], shift[axis]) = wrap_component(frac[axis]);
        }
        (wrapped, ImageVector(shift))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1.0e-9;

    fn cubic(edge: f64) -> Lattice {
        Lattice::from_parameters(edge, edge, edge, 90.0, 90.0, 90.0).unwrap()
    }

    #[test]
    fn cubic_cell_is_diagonal() {
        let lattice = cubic(10.0);
        let m = lattice.matrix();
        assert!((m[(0, 0)] - 10.0).abs() < EPS);
        assert!((m[(1, 1)] - 10.0).abs() < EPS);
        assert!((m[(2, 2)] - 10.0).abs() < EPS);
        assert!(m[(0, 1)].abs() < EPS);
        assert!(m[(1, 2)].abs() < EPS);
        assert!((lattice.volume() - 1000.0).abs() < 1.0e-6);
    }

    #[test]
    fn triclinic_round_trip_preserves_coordinates() {
        let lattice = Lattice::from_parameters(7.0, 8.5, 9.2, 80.0, 95.0, 110.0).unwrap();
        let frac = Vector3::new(0.13, 0.77, 0.42);
        let cart = lattice.fractional_to_cartesian(&frac);
        let back = lattice.cartesian_to_fractional(&cart);
        assert!((back - frac).norm() < EPS);
    }

    #[test]
    fn parameters_reproduce_cell_lengths() {
        let lattice = Lattice::from_parameters(7.0, 8.5, 9.2, 80.0, 95.0, 110.0).unwrap();
        let m = lattice.matrix();
        for axis in 0..3 {
            let length = m.column(axis).norm();
            assert!((length - lattice.lengths()[axis]).abs() < 1.0e-9);
        }
        assert_eq!(
            lattice.parameters(),
            [7.0, 8.5, 9.2, 80.0, 95.0, 110.0]
        );
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert_eq!(
            Lattice::from_parameters(0.0, 1.0, 1.0, 90.0, 90.0, 90.0),
            Err(LatticeError::NonPositiveLength(0.0))
        );
        assert_eq!(
            Lattice::from_parameters(1.0, 1.0, 1.0, 180.0, 90.0, 90.0),
            Err(LatticeError::InvalidAngle(180.0))
        );
        assert_eq!(
            Lattice::from_parameters(1.0, 1.0, 1.0, 10.0, 10.0, 120.0),
            Err(LatticeError::Degenerate)
        );
    }

    #[test]
    fn wrap_with_shift_reports_subtracted_translation() {
        let lattice = cubic(10.0);
        let point = Point3::new(12.5, -1.0, 5.0);
        let (wrapped, shift) = lattice.wrap_with_shift(&point);

        assert!((wrapped - Point3::new(2.5, 9.0, 5.0)).norm() < 1.0e-9);
        assert_eq!(shift, ImageVector::new(1, -1, 0));
        let restored = wrapped + lattice.translation(&shift);
        assert!((restored - point).norm() < 1.0e-9);
    }

    #[test]
    fn wrap_keeps_points_inside_cell_unchanged() {
        let lattice = cubic(10.0);
        let point = Point3::new(0.0, 4.0, 9.999);
        let (wrapped, shift) = lattice.wrap_with_shift(&point);
        assert!((wrapped - point).norm() < 1.0e-9);
        assert!(shift.is_zero());
    }

    #[test]
    fn points_on_the_lower_face_stay_in_place() {
        let lattice = cubic(10.0);
        for point in [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 4.0, 9.999),
            Point3::new(0.0, 5.0, 5.0),
        ] {
            let (wrapped, shift) = lattice.wrap_with_shift(&point);
            assert!((wrapped - point).norm() < 1.0e-9, "{point} moved to {wrapped}");
            assert!(shift.is_zero());

            let (_, again) = lattice.wrap_with_shift(&wrapped);
            assert!(again.is_zero());
        }
    }

    #[test]
    fn points_on_the_upper_face_wrap_to_the_lower_face() {
        let lattice = cubic(10.0);
        let (wrapped, shift) = lattice.wrap_with_shift(&Point3::new(10.0, 5.0, 5.0));
        assert_eq!(wrapped.x, 0.0);
        assert_eq!(shift, ImageVector::new(1, 0, 0));
    }

    #[test]
    fn right_angles_give_an_orthogonal_matrix() {
        let lattice = Lattice::from_parameters(10.0, 12.0, 14.0, 90.0, 90.0, 90.0).unwrap();
        let m = lattice.matrix();
        assert_eq!(m[(0, 1)], 0.0);
        assert_eq!(m[(0, 2)], 0.0);
        assert_eq!(m[(1, 2)], 0.0);
    }

    #[test]
    fn wrap_fractional_maps_into_unit_interval() {
        let (wrapped, shift) =
            Lattice::wrap_fractional_with_shift(&Vector3::new(1.25, -0.25, 3.0 - 1.0e-12));
        assert!((wrapped - Vector3::new(0.25, 0.75, 0.0)).norm() < EPS);
        assert_eq!(shift, ImageVector::new(1, -1, 3));
    }
}
