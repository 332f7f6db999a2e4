//! Interpolation helpers:
//! - slerp (with optional shortest-arc flip)
//! - squad / squad_tangent (log/exp based quaternion tangents)
//! - cubic Hermite coefficients and evaluation for positions

use nalgebra::{Quaternion, Vector3};

/// Below this imaginary-part length, log/exp fall back to the first-order expansion.
const LOG_EPS: f64 = 1e-6;
/// Orientations closer than this (1 - |cos|) are blended linearly.
const SLERP_LINEAR_EPS: f64 = 0.01;

/// Spherical linear interpolation between `a` and `b`.
///
/// When `allow_flip` is true and the quaternions lie on opposite hemispheres the
/// shorter arc is taken. Squad disables the flip for its inner blends so that the
/// tangent quaternions are interpolated exactly as computed.
pub fn slerp(a: &Quaternion<f64>, b: &Quaternion<f64>, t: f64, allow_flip: bool) -> Quaternion<f64> {
    let cos_angle = a.dot(b);

    let (mut c1, c2) = if 1.0 - cos_angle.abs() < SLERP_LINEAR_EPS {
        (1.0 - t, t)
    } else {
        let angle = cos_angle.abs().clamp(-1.0, 1.0).acos();
        let sin_angle = angle.sin();
        (
            (angle * (1.0 - t)).sin() / sin_angle,
            (angle * t).sin() / sin_angle,
        )
    };

    if allow_flip && cos_angle < 0.0 {
        c1 = -c1;
    }

    a * c1 + b * c2
}

/// Spherical quadrangle interpolation through `p` and `q` with control tangents `a` and `b`.
pub fn squad(
    p: &Quaternion<f64>,
    a: &Quaternion<f64>,
    b: &Quaternion<f64>,
    q: &Quaternion<f64>,
    t: f64,
) -> Quaternion<f64> {
    let pq = slerp(p, q, t, true);
    let ab = slerp(a, b, t, false);
    slerp(&pq, &ab, 2.0 * t * (1.0 - t), false)
}

/// Logarithm of a unit quaternion; the result is a pure quaternion (w = 0).
pub fn quat_ln(q: &Quaternion<f64>) -> Quaternion<f64> {
    let imag = q.imag();
    let len = imag.norm();
    if len < LOG_EPS {
        Quaternion::from_parts(0.0, imag)
    } else {
        let coef = q.w.clamp(-1.0, 1.0).acos() / len;
        Quaternion::from_parts(0.0, imag * coef)
    }
}

/// Exponential of a pure quaternion (the w component is ignored).
pub fn quat_exp(q: &Quaternion<f64>) -> Quaternion<f64> {
    let imag = q.imag();
    let theta = imag.norm();
    if theta < LOG_EPS {
        Quaternion::from_parts(theta.cos(), imag)
    } else {
        let coef = theta.sin() / theta;
        Quaternion::from_parts(theta.cos(), imag * coef)
    }
}

/// `ln(a⁻¹ · b)` for unit quaternions.
pub fn quat_ln_dif(a: &Quaternion<f64>, b: &Quaternion<f64>) -> Quaternion<f64> {
    let dif = a.conjugate() * b;
    let norm = dif.norm();
    if norm > 0.0 {
        quat_ln(&(dif / norm))
    } else {
        Quaternion::new(0.0, 0.0, 0.0, 0.0)
    }
}

/// Squad control quaternion at `center`, given its neighbours on the path.
pub fn squad_tangent(
    before: &Quaternion<f64>,
    center: &Quaternion<f64>,
    after: &Quaternion<f64>,
) -> Quaternion<f64> {
    let l1 = quat_ln_dif(center, before);
    let l2 = quat_ln_dif(center, after);
    let e = (l1 + l2) * -0.25;
    center * quat_exp(&e)
}

/// Cubic terms `(v1, v2)` of the Hermite segment from `p1` to `p2` with tangents `t1`, `t2`.
#[inline]
pub fn hermite_coefficients(
    p1: &Vector3<f64>,
    t1: &Vector3<f64>,
    p2: &Vector3<f64>,
    t2: &Vector3<f64>,
) -> (Vector3<f64>, Vector3<f64>) {
    let delta = p2 - p1;
    let v1 = delta * 3.0 - t1 * 2.0 - t2;
    let v2 = delta * -2.0 + t1 + t2;
    (v1, v2)
}

/// Evaluate `p1 + alpha·(t1 + alpha·(v1 + alpha·v2))`.
#[inline]
pub fn hermite_position(
    p1: &Vector3<f64>,
    t1: &Vector3<f64>,
    v1: &Vector3<f64>,
    v2: &Vector3<f64>,
    alpha: f64,
) -> Vector3<f64> {
    p1 + (t1 + (v1 + v2 * alpha) * alpha) * alpha
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    fn quat_about_z(angle: f64) -> Quaternion<f64> {
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle).into_inner()
    }

    #[test]
    fn slerp_hits_endpoints_and_midpoint() {
        let a = quat_about_z(0.0);
        let b = quat_about_z(1.0);
        assert_relative_eq!(slerp(&a, &b, 0.0, true), a, epsilon = 1e-12);
        assert_relative_eq!(slerp(&a, &b, 1.0, true), b, epsilon = 1e-12);
        assert_relative_eq!(slerp(&a, &b, 0.5, true), quat_about_z(0.5), epsilon = 1e-12);
    }

    #[test]
    fn slerp_flip_takes_shorter_arc() {
        let a = quat_about_z(0.0);
        let b = -quat_about_z(1.0);
        let mid = slerp(&a, &b, 0.5, true);
        let expected = quat_about_z(0.5);
        assert_relative_eq!(mid.dot(&expected).abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn ln_exp_round_trip() {
        let q = UnitQuaternion::from_euler_angles(0.3, -0.2, 0.9).into_inner();
        let back = quat_exp(&quat_ln(&q));
        assert_relative_eq!(back, q, epsilon = 1e-12);
        assert_eq!(quat_ln(&Quaternion::identity()), Quaternion::new(0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn squad_tangent_of_constant_orientation_is_identity_offset() {
        let q = quat_about_z(0.7);
        assert_relative_eq!(squad_tangent(&q, &q, &q), q, epsilon = 1e-12);
    }

    #[test]
    fn squad_tangent_on_uniform_rotation_equals_center() {
        // Evenly spaced rotations about one axis have zero second difference.
        let t = squad_tangent(&quat_about_z(0.0), &quat_about_z(0.4), &quat_about_z(0.8));
        assert_relative_eq!(t, quat_about_z(0.4), epsilon = 1e-9);
    }

    #[test]
    fn squad_interpolates_endpoints() {
        let p = quat_about_z(0.0);
        let q = quat_about_z(1.2);
        let a = squad_tangent(&p, &p, &q);
        let b = squad_tangent(&p, &q, &q);
        assert_relative_eq!(squad(&p, &a, &b, &q, 0.0), p, epsilon = 1e-12);
        assert_relative_eq!(squad(&p, &a, &b, &q, 1.0), q, epsilon = 1e-9);
    }

    #[test]
    fn hermite_reaches_segment_end() {
        let p1 = Vector3::new(0.0, 0.0, 0.0);
        let p2 = Vector3::new(1.0, 2.0, 3.0);
        let t1 = Vector3::new(0.5, 0.0, 0.0);
        let t2 = Vector3::new(0.0, 0.5, 0.0);
        let (v1, v2) = hermite_coefficients(&p1, &t1, &p2, &t2);
        assert_relative_eq!(hermite_position(&p1, &t1, &v1, &v2, 0.0), p1);
        assert_relative_eq!(hermite_position(&p1, &t1, &v1, &v2, 1.0), p2, epsilon = 1e-12);
    }
}
