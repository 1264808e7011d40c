//! Mappings between the fixed-t and fixed-s phase-space frames.
//!
//! A bunch is sampled in the fixed-t frame (a snapshot at constant time,
//! position slot holding z) and tracked in the fixed-s frame (a snapshot at
//! constant path length, position slot holding c*dt). Both directions scale
//! the dynamic momenta by the design longitudinal momentum and shear the
//! transverse positions along the particle's flight path.

use crate::bunch::ParticleBunch;
use beam_types::error::{BeamError, BeamResult};
use beam_types::state::PhasePoint;

/// Which frame the ensemble should be mapped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToFixedS,
    ToFixedT,
}

/// Map one particle from the fixed-t to the fixed-s frame.
///
/// `pzd` is the design longitudinal momentum (beta*gamma of the reference).
pub fn to_fixed_s(p: PhasePoint, pzd: f64) -> BeamResult<PhasePoint> {
    let argd = 1.0 + pzd * pzd;
    if !argd.is_finite() || argd <= 0.0 {
        return Err(BeamError::KinematicDomain {
            context: "to_fixed_s design momentum".to_string(),
            value: argd,
        });
    }
    let ptd_f = -argd.sqrt();

    // dynamic momenta scaled to the mass normalization
    let px = p.px * pzd;
    let py = p.py * pzd;
    let pt = p.pt * pzd;

    let arg = 1.0 + (pzd + pt) * (pzd + pt) + px * px + py * py;
    if !arg.is_finite() || arg <= 0.0 {
        return Err(BeamError::KinematicDomain {
            context: "to_fixed_s particle momentum".to_string(),
            value: arg,
        });
    }
    let pt_f = -arg.sqrt();

    let tau = p.t / (pzd + pt);
    Ok(PhasePoint {
        x: p.x - px * tau,
        y: p.y - py * tau,
        t: pt_f * tau,
        px: px / pzd,
        py: py / pzd,
        pt: (pt_f - ptd_f) / pzd,
    })
}

/// Map one particle from the fixed-s to the fixed-t frame.
///
/// `ptd` is the design energy coordinate (-gamma of the reference).
pub fn to_fixed_t(p: PhasePoint, ptd: f64) -> BeamResult<PhasePoint> {
    let argd = -1.0 + ptd * ptd;
    if !argd.is_finite() || argd <= 0.0 {
        return Err(BeamError::KinematicDomain {
            context: "to_fixed_t design momentum".to_string(),
            value: argd,
        });
    }
    let pzd = argd.sqrt();

    let px = p.px * pzd;
    let py = p.py * pzd;
    let pt = p.pt * pzd;

    let arg = -1.0 + (ptd + pt) * (ptd + pt) - px * px - py * py;
    if !arg.is_finite() || arg <= 0.0 {
        return Err(BeamError::KinematicDomain {
            context: "to_fixed_t particle momentum".to_string(),
            value: arg,
        });
    }
    let pz = arg.sqrt();

    let tau = p.t / (ptd + pt);
    Ok(PhasePoint {
        x: p.x + px * tau,
        y: p.y + py * tau,
        t: pz * tau,
        px: px / pzd,
        py: py / pzd,
        pt: (pz - pzd) / pzd,
    })
}

/// Map every particle of the bunch into the requested frame.
///
/// The design momentum is read from the bunch's reference particle. On the
/// first particle whose momentum leaves the kinematic domain the whole
/// transformation is abandoned and the bunch is left untouched.
pub fn coordinate_transformation(
    bunch: &mut ParticleBunch,
    direction: Direction,
) -> BeamResult<()> {
    let n = bunch.npart();
    let mut transformed = Vec::with_capacity(n);
    match direction {
        Direction::ToFixedS => {
            let pzd = bunch.ref_part.beta_gamma();
            for idx in 0..n {
                let p = to_fixed_s(bunch.phase_point(idx), pzd)
                    .map_err(|err| with_particle_index(err, idx))?;
                transformed.push(p);
            }
        }
        Direction::ToFixedT => {
            let ptd = bunch.ref_part.pt;
            for idx in 0..n {
                let p = to_fixed_t(bunch.phase_point(idx), ptd)
                    .map_err(|err| with_particle_index(err, idx))?;
                transformed.push(p);
            }
        }
    }
    for (idx, p) in transformed.into_iter().enumerate() {
        bunch.set_phase_point(idx, p);
    }
    log::debug!("transformed {n} particles into {direction:?}");
    Ok(())
}

fn with_particle_index(err: BeamError, idx: usize) -> BeamError {
    match err {
        BeamError::KinematicDomain { context, value } => BeamError::KinematicDomain {
            context: format!("{context}, particle[{idx}]"),
            value,
        },
        other => other,
    }
}
