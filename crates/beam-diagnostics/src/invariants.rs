//! Conserved phase-space functions of the nonlinear magnetic insert.
//!
//! Two independent functions in involution, `H` and `I`, associated with
//! the elliptic-potential insert of Danilov and Nagaitsev, PRSTAB 13,
//! 084002 (2010), Sect. V.A. Transverse coordinates are first normalized
//! with the bare-lattice Twiss parameters and the insert scale, then both
//! functions are evaluated from the same analytic potential that drives
//! the lens kick. Purely diagnostic; never fed back into transport.

use beam_types::error::{BeamError, BeamResult};
use num_complex::Complex64;

/// Values of the two invariants at one phase-space point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Invariants {
    pub h: f64, // first invariant (normalized-system Hamiltonian)
    pub i: f64, // second invariant
}

/// Evaluator for the insert invariants at fixed bare-lattice optics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonlinearLensInvariants {
    alpha: f64, // Twiss alpha of the bare lattice
    beta: f64,  // Twiss beta of the bare lattice [m]
    tn: f64,    // dimensionless insert strength
    cn: f64,    // insert scale parameter [m^(1/2)]
}

impl NonlinearLensInvariants {
    pub fn new(alpha: f64, beta: f64, tn: f64, cn: f64) -> BeamResult<Self> {
        if !alpha.is_finite() || !tn.is_finite() {
            return Err(BeamError::ConfigError(format!(
                "insert invariants: alpha and tn must be finite, got alpha = {alpha}, tn = {tn}"
            )));
        }
        if !beta.is_finite() || beta <= 0.0 {
            return Err(BeamError::ConfigError(format!(
                "insert invariants: beta must be finite and > 0, got {beta}"
            )));
        }
        if !cn.is_finite() || cn <= 0.0 {
            return Err(BeamError::ConfigError(format!(
                "insert invariants: cn must be finite and > 0, got {cn}"
            )));
        }
        Ok(NonlinearLensInvariants {
            alpha,
            beta,
            tn,
            cn,
        })
    }

    /// Evaluates `H` and `I` at one transverse phase-space point.
    ///
    /// Coordinates are the dynamic fixed-s values; the normalization to
    /// the bare lattice happens here.
    pub fn eval(&self, x: f64, y: f64, px: f64, py: f64) -> Invariants {
        let root_beta = self.beta.sqrt();
        let xn = x / (self.cn * root_beta);
        let yn = y / (self.cn * root_beta);
        let pxn = px * root_beta / self.cn + self.alpha * x;
        let pyn = py * root_beta / self.cn + self.alpha * y;

        let i = Complex64::i();
        let zeta = Complex64::new(xn, yn);
        let croot = (Complex64::new(1.0, 0.0) - zeta * zeta).sqrt();
        let carcsin = -i * (i * zeta + croot).ln();

        let h_potential = zeta / croot * carcsin;
        let i_potential = (zeta + zeta.conj()) / croot * carcsin;

        let jz = xn * pyn - yn * pxn;
        let h = 0.5 * (xn * xn + yn * yn + pxn * pxn + pyn * pyn) + self.tn * h_potential.re;
        let second = jz * jz + pxn * pxn + xn * xn + self.tn * i_potential.re;
        Invariants { h, i: second }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_evaluates_to_zero() {
        let inv = NonlinearLensInvariants::new(0.0, 1.0, 0.4, 1.0).expect("valid optics");
        let values = inv.eval(0.0, 0.0, 0.0, 0.0);
        assert_eq!(values.h, 0.0);
        assert_eq!(values.i, 0.0);
    }

    #[test]
    fn test_zero_strength_reduces_to_quadratic_form() {
        let inv = NonlinearLensInvariants::new(0.0, 1.0, 0.0, 1.0).expect("valid optics");
        let (x, y, px, py) = (0.2, -0.1, 0.05, 0.3);
        let values = inv.eval(x, y, px, py);
        let h_expected = 0.5 * (x * x + y * y + px * px + py * py);
        let jz = x * py - y * px;
        let i_expected = jz * jz + px * px + x * x;
        assert!((values.h - h_expected).abs() < 1e-15);
        assert!((values.i - i_expected).abs() < 1e-15);
    }

    #[test]
    fn test_twiss_normalization_rescales_coordinates() {
        // beta = 4, cn = 2: xn = x/4, pxn = px
        let inv = NonlinearLensInvariants::new(0.0, 4.0, 0.0, 2.0).expect("valid optics");
        let values = inv.eval(0.4, 0.0, 0.1, 0.0);
        let xn: f64 = 0.1;
        let pxn: f64 = 0.1;
        let h_expected = 0.5 * (xn * xn + pxn * pxn);
        assert!((values.h - h_expected).abs() < 1e-15);
    }

    #[test]
    fn test_alpha_couples_position_into_momentum() {
        let alpha = 0.7;
        let inv = NonlinearLensInvariants::new(alpha, 1.0, 0.0, 1.0).expect("valid optics");
        let (x, px) = (0.2, 0.05);
        let values = inv.eval(x, 0.0, px, 0.0);
        let pxn = px + alpha * x;
        let h_expected = 0.5 * (x * x + pxn * pxn);
        assert!((values.h - h_expected).abs() < 1e-15);
    }

    #[test]
    fn test_point_reflection_symmetry() {
        let inv = NonlinearLensInvariants::new(0.3, 2.0, 0.4, 1.0).expect("valid optics");
        let a = inv.eval(0.2, 0.1, -0.05, 0.15);
        let b = inv.eval(-0.2, -0.1, 0.05, -0.15);
        assert!((a.h - b.h).abs() < 1e-14);
        assert!((a.i - b.i).abs() < 1e-14);
    }

    #[test]
    fn test_invalid_optics_are_rejected() {
        let cases = [
            (f64::NAN, 1.0, 0.4, 1.0, "alpha"),
            (0.0, 0.0, 0.4, 1.0, "beta"),
            (0.0, -2.0, 0.4, 1.0, "beta"),
            (0.0, 1.0, f64::INFINITY, 1.0, "tn"),
            (0.0, 1.0, 0.4, 0.0, "cn"),
        ];
        for (alpha, beta, tn, cn, field) in cases {
            let err = NonlinearLensInvariants::new(alpha, beta, tn, cn).unwrap_err();
            match err {
                BeamError::ConfigError(msg) => {
                    assert!(msg.contains(field), "message {msg:?} should name {field}")
                }
                other => panic!("Unexpected error: {other:?}"),
            }
        }
    }
}
