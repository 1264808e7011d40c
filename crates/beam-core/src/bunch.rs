//! Ensemble container for macro-particles in fixed-s phase space.
//!
//! Structure-of-arrays layout mirroring the per-attribute access pattern of
//! the pushes: one `Vec<f64>` per dynamic coordinate, one charge-to-mass
//! column and one statistical-weight column, plus the reference particle the
//! dynamic coordinates are measured against.

use beam_types::constants::Q_E;
use beam_types::error::{BeamError, BeamResult};
use beam_types::state::{PhasePoint, RefPart};

/// Macro-particle ensemble in normalized fixed-s coordinates.
#[derive(Debug, Clone, Default)]
pub struct ParticleBunch {
    pub ref_part: RefPart, // reference state the dynamic coordinates refer to
    pub x: Vec<f64>,       // horizontal offset [m]
    pub y: Vec<f64>,       // vertical offset [m]
    pub t: Vec<f64>,       // longitudinal offset c*dt [m]
    pub px: Vec<f64>,      // horizontal momentum / reference momentum
    pub py: Vec<f64>,      // vertical momentum / reference momentum
    pub pt: Vec<f64>,      // energy deviation / reference momentum * c
    pub qm: Vec<f64>,      // charge-to-mass ratio [C/kg]
    pub w: Vec<f64>,       // statistical weight [real particles per macro]
    shape: Option<usize>,
}

impl ParticleBunch {
    /// Empty bunch referenced to `ref_part`.
    pub fn new(ref_part: RefPart) -> Self {
        ParticleBunch {
            ref_part,
            ..ParticleBunch::default()
        }
    }

    /// Number of stored macro-particles.
    #[inline]
    pub fn npart(&self) -> usize {
        self.x.len()
    }

    /// Interpolation-shape order used for charge deposition, if set.
    #[inline]
    pub fn particle_shape(&self) -> Option<usize> {
        self.shape
    }

    /// Fix the deposition shape order. May be called exactly once.
    pub fn set_particle_shape(&mut self, order: usize) -> BeamResult<()> {
        if self.shape.is_some() {
            return Err(BeamError::ConfigError(
                "particle shape order is already set".to_string(),
            ));
        }
        if order > 2 {
            return Err(BeamError::ConfigError(format!(
                "particle shape order must be in 0..=2, got {order}"
            )));
        }
        self.shape = Some(order);
        Ok(())
    }

    /// Append macro-particles from per-coordinate slices.
    ///
    /// Every appended particle receives the reference charge-to-mass ratio
    /// and the statistical weight `bunch_charge_c / (n * Q_E)`, so the new
    /// block carries the requested total charge.
    #[allow(clippy::too_many_arguments)]
    pub fn add_n_particles(
        &mut self,
        x: &[f64],
        y: &[f64],
        t: &[f64],
        px: &[f64],
        py: &[f64],
        pt: &[f64],
        bunch_charge_c: f64,
    ) -> BeamResult<()> {
        let n = x.len();
        if [y.len(), t.len(), px.len(), py.len(), pt.len()]
            .iter()
            .any(|&len| len != n)
        {
            return Err(BeamError::ConfigError(format!(
                "coordinate column length mismatch: x={}, y={}, t={}, px={}, py={}, pt={}",
                x.len(),
                y.len(),
                t.len(),
                px.len(),
                py.len(),
                pt.len()
            )));
        }
        if n == 0 {
            return Err(BeamError::ConfigError(
                "cannot append an empty particle block".to_string(),
            ));
        }
        if !bunch_charge_c.is_finite() || bunch_charge_c < 0.0 {
            return Err(BeamError::ConfigError(format!(
                "bunch_charge_c must be finite and >= 0, got {bunch_charge_c}"
            )));
        }

        let weight = bunch_charge_c / (n as f64 * Q_E);
        let qm = self.ref_part.qm_qeev();
        self.x.extend_from_slice(x);
        self.y.extend_from_slice(y);
        self.t.extend_from_slice(t);
        self.px.extend_from_slice(px);
        self.py.extend_from_slice(py);
        self.pt.extend_from_slice(pt);
        self.qm.extend(std::iter::repeat(qm).take(n));
        self.w.extend(std::iter::repeat(weight).take(n));
        log::debug!("appended {n} macro-particles, weight {weight:.6e} per macro-particle");
        Ok(())
    }

    /// Phase-space view of particle `idx`. Panics when out of range.
    #[inline]
    pub fn phase_point(&self, idx: usize) -> PhasePoint {
        PhasePoint {
            x: self.x[idx],
            y: self.y[idx],
            t: self.t[idx],
            px: self.px[idx],
            py: self.py[idx],
            pt: self.pt[idx],
        }
    }

    /// Store `p` back into particle `idx`. Panics when out of range.
    #[inline]
    pub fn set_phase_point(&mut self, idx: usize, p: PhasePoint) {
        self.x[idx] = p.x;
        self.y[idx] = p.y;
        self.t[idx] = p.t;
        self.px[idx] = p.px;
        self.py[idx] = p.py;
        self.pt[idx] = p.pt;
    }

    /// Total charge carried by the ensemble [C].
    pub fn charge_c(&self) -> f64 {
        self.w.iter().sum::<f64>() * Q_E
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beam_types::constants::PROTON_MASS_MEV;

    fn proton_reference() -> RefPart {
        let mut ref_part = RefPart::default();
        ref_part.set_charge_qe(1.0);
        ref_part.set_mass_mev(PROTON_MASS_MEV).unwrap();
        ref_part.set_energy_mev(250.0).unwrap();
        ref_part
    }

    fn filled_bunch(n: usize, charge_c: f64) -> ParticleBunch {
        let mut bunch = ParticleBunch::new(proton_reference());
        let zeros = vec![0.0; n];
        bunch
            .add_n_particles(&zeros, &zeros, &zeros, &zeros, &zeros, &zeros, charge_c)
            .unwrap();
        bunch
    }

    #[test]
    fn test_add_n_particles_assigns_weight_and_qm() {
        let bunch = filled_bunch(1000, 1.0e-9);
        assert_eq!(bunch.npart(), 1000);
        let expected_weight = 1.0e-9 / (1000.0 * Q_E);
        for w in &bunch.w {
            assert!(((w - expected_weight) / expected_weight).abs() < 1e-15);
        }
        let qm = bunch.ref_part.qm_qeev();
        for value in &bunch.qm {
            assert_eq!(*value, qm);
        }
    }

    #[test]
    fn test_total_charge_matches_requested() {
        let bunch = filled_bunch(1000, 1.0e-9);
        let rel = ((bunch.charge_c() - 1.0e-9) / 1.0e-9).abs();
        assert!(rel < 1e-12, "total charge off by {rel}");
    }

    #[test]
    fn test_add_n_particles_rejects_column_mismatch() {
        let mut bunch = ParticleBunch::new(proton_reference());
        let three = vec![0.0; 3];
        let two = vec![0.0; 2];
        let err = bunch
            .add_n_particles(&three, &three, &two, &three, &three, &three, 1e-9)
            .unwrap_err();
        match err {
            BeamError::ConfigError(msg) => assert!(msg.contains("mismatch")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_add_n_particles_rejects_empty_block() {
        let mut bunch = ParticleBunch::new(proton_reference());
        let empty: Vec<f64> = Vec::new();
        assert!(bunch
            .add_n_particles(&empty, &empty, &empty, &empty, &empty, &empty, 1e-9)
            .is_err());
    }

    #[test]
    fn test_add_n_particles_rejects_bad_charge() {
        let mut bunch = ParticleBunch::new(proton_reference());
        let one = vec![0.0];
        for bad in [f64::NAN, f64::INFINITY, -1.0e-9] {
            let err = bunch
                .add_n_particles(&one, &one, &one, &one, &one, &one, bad)
                .unwrap_err();
            match err {
                BeamError::ConfigError(msg) => assert!(msg.contains("bunch_charge_c")),
                other => panic!("Unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_particle_shape_is_set_once() {
        let mut bunch = ParticleBunch::new(proton_reference());
        assert_eq!(bunch.particle_shape(), None);
        bunch.set_particle_shape(2).unwrap();
        assert_eq!(bunch.particle_shape(), Some(2));
        let err = bunch.set_particle_shape(1).unwrap_err();
        match err {
            BeamError::ConfigError(msg) => assert!(msg.contains("already set")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_particle_shape_rejects_out_of_range_order() {
        let mut bunch = ParticleBunch::new(proton_reference());
        let err = bunch.set_particle_shape(3).unwrap_err();
        match err {
            BeamError::ConfigError(msg) => assert!(msg.contains("0..=2")),
            other => panic!("Unexpected error: {other:?}"),
        }
        assert_eq!(bunch.particle_shape(), None);
    }

    #[test]
    fn test_phase_point_roundtrip() {
        let mut bunch = filled_bunch(4, 1e-10);
        let p = PhasePoint::new(1e-3, -2e-3, 5e-4, 1e-4, -3e-5, 2e-4);
        bunch.set_phase_point(2, p);
        assert_eq!(bunch.phase_point(2), p);
        assert_eq!(bunch.phase_point(1), PhasePoint::default());
    }
}
