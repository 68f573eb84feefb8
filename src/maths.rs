//! Geometric and statistical helpers shared by the move generator,
//! the acceptance engine and the observable calculator.

use nalgebra::{Matrix3, Vector3};
use rand::Rng;
use rand_distr::StandardNormal;

/// Exponents above this are treated as certain rejection without drawing.
pub const EXPONENT_GUARD: f64 = 75.0;

/// Wrap a box-relative coordinate into [-0.5, 0.5) by nearest-integer correction.
#[inline]
pub fn wrap_coordinate(x: f64) -> f64 {
    let wrapped = x - (x + 0.5).floor();
    // rounding can land exactly on the open edge
    if wrapped >= 0.5 {
        wrapped - 1.0
    } else {
        wrapped
    }
}

/// Wrap a box-relative position into the unit cell centred on the origin.
pub fn wrap_position(r: &Vector3<f64>) -> Vector3<f64> {
    r.map(wrap_coordinate)
}

/// Uniformly distributed unit vector on the surface of the sphere.
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vector3<f64> {
    loop {
        let v = Vector3::new(
            rng.sample::<f64, _>(StandardNormal),
            rng.sample::<f64, _>(StandardNormal),
            rng.sample::<f64, _>(StandardNormal),
        );
        let norm = v.norm();
        if norm > 1e-8 {
            return v / norm;
        }
    }
}

/// Displace `old` by a uniform random vector inside a cube of half-width `half_width`.
pub fn random_translate_vector<R: Rng + ?Sized>(
    rng: &mut R,
    half_width: f64,
    old: &Vector3<f64>,
) -> Vector3<f64> {
    let zeta = Vector3::new(
        2.0 * rng.gen::<f64>() - 1.0,
        2.0 * rng.gen::<f64>() - 1.0,
        2.0 * rng.gen::<f64>() - 1.0,
    );
    old + zeta * half_width
}

/// Rotate the unit vector `old` by a small random angle bounded by `angle_max`.
///
/// A random direction perpendicular to `old` is chosen uniformly, scaled by
/// `angle_max` times a uniform deviate in [0, 1), added to `old`, and the
/// result is renormalised.
pub fn random_rotate_vector<R: Rng + ?Sized>(
    rng: &mut R,
    angle_max: f64,
    old: &Vector3<f64>,
) -> Vector3<f64> {
    let perpendicular = loop {
        let e = random_unit_vector(rng);
        let projected = e - old * e.dot(old);
        let norm = projected.norm();
        if norm > 1e-6 {
            break projected / norm;
        }
    };
    let zeta: f64 = rng.gen();
    let rotated = old + perpendicular * (zeta * angle_max);
    rotated.normalize()
}

/// Ordering tensor `Q = (3 <e e> - I) / 2` built from unit orientation vectors.
pub fn ordering_tensor(orientations: &[Vector3<f64>]) -> Matrix3<f64> {
    if orientations.is_empty() {
        return Matrix3::zeros();
    }
    let sum: Matrix3<f64> = orientations.iter().map(|e| e * e.transpose()).sum();
    let mean = sum / orientations.len() as f64;
    (mean * 3.0 - Matrix3::identity()) * 0.5
}

/// Nematic order parameter: the largest eigenvalue of the ordering tensor.
pub fn orientational_order(orientations: &[Vector3<f64>]) -> f64 {
    if orientations.is_empty() {
        return 0.0;
    }
    ordering_tensor(orientations).symmetric_eigen().eigenvalues.max()
}

/// Metropolis test on the exponent `delta`: accept with probability `min(1, exp(-delta))`.
pub fn metropolis<R: Rng + ?Sized>(rng: &mut R, delta: f64) -> bool {
    if delta > EXPONENT_GUARD {
        false
    } else if delta <= 0.0 {
        true
    } else {
        rng.gen::<f64>() < (-delta).exp()
    }
}
