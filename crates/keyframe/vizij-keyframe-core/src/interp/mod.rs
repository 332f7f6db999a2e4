//! Interpolation math shared by the evaluator and the path sampler.
//!
//! Position segments are cubic Hermite polynomials in the normalized segment
//! parameter; orientations use squad over tangent-adjusted control quaternions.

pub mod functions;

pub use functions::{
    hermite_coefficients, hermite_position, quat_exp, quat_ln, quat_ln_dif, slerp, squad,
    squad_tangent,
};
