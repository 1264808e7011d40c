// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Dynamics — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

use crate::constants::MEV_C2_KG;
use crate::constants::Q_E;
use crate::error::{BeamError, BeamResult};

/// 6D phase-space coordinates of a single beam particle, relative to the
/// reference particle.
///
/// In the fixed-s frame the components are (x, y, t, px, py, pt) with
/// momenta normalized by the reference momentum. In the fixed-t frame the
/// third position slot holds z and the third momentum slot holds pz, with
/// the same normalization.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhasePoint {
    pub x: f64,
    pub y: f64,
    pub t: f64,
    pub px: f64,
    pub py: f64,
    pub pt: f64,
}

impl PhasePoint {
    pub fn new(x: f64, y: f64, t: f64, px: f64, py: f64, pt: f64) -> Self {
        PhasePoint {
            x,
            y,
            t,
            px,
            py,
            pt,
        }
    }

    /// True when every coordinate is a finite float.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.t.is_finite()
            && self.px.is_finite()
            && self.py.is_finite()
            && self.pt.is_finite()
    }
}

/// Reference particle of the beam: the ideal trajectory all ensemble
/// coordinates are measured against.
///
/// Momenta px, py, pz are normalized to proper velocity (gamma * beta_i);
/// pt is the energy normalized by the rest energy, with the sign
/// convention `pt = -gamma` once the particle has been energized.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RefPart {
    pub s: f64,         // integrated orbit path length [m]
    pub x: f64,         // horizontal position [m]
    pub y: f64,         // vertical position [m]
    pub z: f64,         // longitudinal position [m]
    pub t: f64,         // clock time * c [m]
    pub px: f64,        // momentum in x, normalized to proper velocity
    pub py: f64,        // momentum in y, normalized to proper velocity
    pub pz: f64,        // momentum in z, normalized to proper velocity
    pub pt: f64,        // energy deviation, normalized by rest energy
    pub mass_kg: f64,   // rest mass [kg]
    pub charge_c: f64,  // charge [C]
}

impl RefPart {
    /// Relativistic gamma.
    #[inline]
    pub fn gamma(&self) -> f64 {
        -self.pt
    }

    /// Relativistic beta = v/c.
    #[inline]
    pub fn beta(&self) -> f64 {
        let gamma = -self.pt;
        (1.0 - 1.0 / (gamma * gamma)).sqrt()
    }

    /// Relativistic beta * gamma.
    #[inline]
    pub fn beta_gamma(&self) -> f64 {
        (self.pt * self.pt - 1.0).sqrt()
    }

    /// Rest mass in MeV/c^2.
    #[inline]
    pub fn mass_mev(&self) -> f64 {
        self.mass_kg / MEV_C2_KG
    }

    /// Set the rest mass in MeV/c^2.
    ///
    /// When pt has already been assigned, pt and pz are re-scaled so the
    /// stored kinetic energy in MeV stays consistent with the new mass.
    pub fn set_mass_mev(&mut self, mass_mev: f64) -> BeamResult<()> {
        if !mass_mev.is_finite() || mass_mev <= 0.0 {
            return Err(BeamError::ConfigError(format!(
                "mass_mev must be finite and > 0, got {mass_mev}"
            )));
        }
        self.mass_kg = mass_mev * MEV_C2_KG;
        if self.pt != 0.0 {
            self.pt = -self.energy_mev() / mass_mev - 1.0;
            self.pz = (self.pt * self.pt - 1.0).sqrt();
        }
        Ok(())
    }

    /// Kinetic energy in MeV.
    #[inline]
    pub fn energy_mev(&self) -> f64 {
        let gamma = -self.pt;
        self.mass_mev() * (gamma - 1.0)
    }

    /// Set the kinetic energy in MeV. Requires the mass to be set first.
    ///
    /// Resets the transverse momenta and points the reference straight
    /// down the longitudinal axis.
    pub fn set_energy_mev(&mut self, energy_mev: f64) -> BeamResult<()> {
        if self.mass_kg <= 0.0 {
            return Err(BeamError::ConfigError(
                "set_energy_mev requires the mass to be set first".to_string(),
            ));
        }
        if !energy_mev.is_finite() || energy_mev < 0.0 {
            return Err(BeamError::ConfigError(format!(
                "energy_mev must be finite and >= 0, got {energy_mev}"
            )));
        }
        self.px = 0.0;
        self.py = 0.0;
        self.pt = -energy_mev / self.mass_mev() - 1.0;
        self.pz = (self.pt * self.pt - 1.0).sqrt();
        Ok(())
    }

    /// Charge in multiples of the (positive) elementary charge.
    #[inline]
    pub fn charge_qe(&self) -> f64 {
        self.charge_c / Q_E
    }

    /// Set the charge in multiples of the (positive) elementary charge.
    #[inline]
    pub fn set_charge_qe(&mut self, charge_qe: f64) {
        self.charge_c = charge_qe * Q_E;
    }

    /// Charge-to-mass ratio of the stored SI fields [C/kg].
    #[inline]
    pub fn qm_qeev(&self) -> f64 {
        self.charge_c / self.mass_kg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PROTON_MASS_MEV;

    fn proton_at(energy_mev: f64) -> RefPart {
        let mut ref_part = RefPart::default();
        ref_part.set_charge_qe(1.0);
        ref_part.set_mass_mev(PROTON_MASS_MEV).unwrap();
        ref_part.set_energy_mev(energy_mev).unwrap();
        ref_part
    }

    #[test]
    fn test_gamma_sign_convention() {
        let ref_part = proton_at(250.0);
        // pt = -gamma exactly, by construction
        assert_eq!(ref_part.gamma(), -ref_part.pt);
        let expected_gamma = 1.0 + 250.0 / PROTON_MASS_MEV;
        assert!(
            (ref_part.gamma() - expected_gamma).abs() < 1e-12,
            "gamma = {}, expected {}",
            ref_part.gamma(),
            expected_gamma
        );
    }

    #[test]
    fn test_beta_gamma_identity() {
        for energy in [10.0, 100.0, 250.0, 1000.0] {
            let ref_part = proton_at(energy);
            let composed = ref_part.beta() * ref_part.gamma();
            assert!(
                (ref_part.beta_gamma() - composed).abs() < 1e-12,
                "beta_gamma mismatch at {energy} MeV: {} vs {}",
                ref_part.beta_gamma(),
                composed
            );
        }
    }

    #[test]
    fn test_pz_matches_beta_gamma() {
        let ref_part = proton_at(100.0);
        assert!(
            (ref_part.pz - ref_part.beta_gamma()).abs() < 1e-12,
            "pz should equal beta*gamma for a longitudinal reference"
        );
        assert_eq!(ref_part.px, 0.0);
        assert_eq!(ref_part.py, 0.0);
    }

    #[test]
    fn test_energy_roundtrip() {
        for energy in [10.0, 100.0, 250.0, 1000.0] {
            let ref_part = proton_at(energy);
            assert!(
                (ref_part.energy_mev() - energy).abs() < 1e-9,
                "energy roundtrip at {energy} MeV gave {}",
                ref_part.energy_mev()
            );
        }
    }

    #[test]
    fn test_mass_roundtrip() {
        let ref_part = proton_at(250.0);
        assert!(
            (ref_part.mass_mev() - PROTON_MASS_MEV).abs() < 1e-9,
            "mass roundtrip gave {}",
            ref_part.mass_mev()
        );
    }

    #[test]
    fn test_set_mass_rescales_pz_from_pt() {
        let mut ref_part = proton_at(250.0);
        let pt_before = ref_part.pt;
        ref_part.set_mass_mev(2.0 * PROTON_MASS_MEV).unwrap();
        // the re-scale keeps pt consistent with the stored energy
        assert!(
            (ref_part.pt - pt_before).abs() < 1e-12 * pt_before.abs(),
            "pt changed more than rounding: {} vs {pt_before}",
            ref_part.pt
        );
        let expected_pz = (ref_part.pt * ref_part.pt - 1.0).sqrt();
        assert!((ref_part.pz - expected_pz).abs() < 1e-15);
    }

    #[test]
    fn test_set_energy_before_mass_errors() {
        let mut ref_part = RefPart::default();
        let err = ref_part.set_energy_mev(100.0).unwrap_err();
        match err {
            BeamError::ConfigError(msg) => assert!(msg.contains("mass")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_set_mass_rejects_invalid() {
        let mut ref_part = RefPart::default();
        for bad in [0.0, -1.0, f64::NAN] {
            let err = ref_part.set_mass_mev(bad).unwrap_err();
            match err {
                BeamError::ConfigError(msg) => assert!(msg.contains("mass_mev")),
                other => panic!("Unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_set_energy_rejects_invalid() {
        let mut ref_part = RefPart::default();
        ref_part.set_mass_mev(PROTON_MASS_MEV).unwrap();
        for bad in [-10.0, f64::NAN] {
            let err = ref_part.set_energy_mev(bad).unwrap_err();
            match err {
                BeamError::ConfigError(msg) => assert!(msg.contains("energy_mev")),
                other => panic!("Unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_charge_qe_roundtrip() {
        let mut ref_part = RefPart::default();
        ref_part.set_charge_qe(1.0);
        assert!((ref_part.charge_c - crate::constants::Q_E).abs() < 1e-30);
        assert!((ref_part.charge_qe() - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_qm_ratio_is_si() {
        let ref_part = proton_at(10.0);
        let expected = crate::constants::Q_E / (PROTON_MASS_MEV * MEV_C2_KG);
        let rel = (ref_part.qm_qeev() - expected).abs() / expected;
        assert!(rel < 1e-12, "charge/mass ratio off by {rel}");
    }

    #[test]
    fn test_phase_point_finiteness() {
        let good = PhasePoint::new(1e-3, -2e-3, 0.0, 1e-4, 0.0, -1e-5);
        assert!(good.is_finite());
        let mut bad = good;
        bad.pt = f64::NAN;
        assert!(!bad.is_finite());
    }
}
