//! Ensemble reductions over the bunch position columns.
//!
//! Extent and first/second moments are reduced per axis directly from the
//! stored coordinate columns. The reductions reject empty bunches and
//! non-finite coordinates instead of propagating silent garbage.

use beam_core::bunch::ParticleBunch;
use beam_types::error::{BeamError, BeamResult};

/// Per-axis position extrema of a bunch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionExtent {
    pub x_min: f64, // [m]
    pub x_max: f64, // [m]
    pub y_min: f64, // [m]
    pub y_max: f64, // [m]
    pub t_min: f64, // fixed-t: z [m]; fixed-s: c*dt [m]
    pub t_max: f64, // fixed-t: z [m]; fixed-s: c*dt [m]
}

/// Per-axis position mean and standard deviation of a bunch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionMoments {
    pub x_mean: f64, // [m]
    pub x_std: f64,  // [m]
    pub y_mean: f64, // [m]
    pub y_std: f64,  // [m]
    pub t_mean: f64, // [m]
    pub t_std: f64,  // [m]
}

/// Reduces the per-axis minimum and maximum positions of the bunch.
pub fn min_and_max_positions(bunch: &ParticleBunch) -> BeamResult<PositionExtent> {
    ensure_populated(bunch, "position extrema")?;
    let (x_min, x_max) = extent(checked_column("x", &bunch.x)?);
    let (y_min, y_max) = extent(checked_column("y", &bunch.y)?);
    let (t_min, t_max) = extent(checked_column("t", &bunch.t)?);
    Ok(PositionExtent {
        x_min,
        x_max,
        y_min,
        y_max,
        t_min,
        t_max,
    })
}

/// Reduces the per-axis position mean and standard deviation of the bunch.
///
/// The standard deviation is the population value (normalized by the
/// macroparticle count, not count minus one).
pub fn mean_and_std_positions(bunch: &ParticleBunch) -> BeamResult<PositionMoments> {
    ensure_populated(bunch, "position moments")?;
    let (x_mean, x_std) = mean_and_std(checked_column("x", &bunch.x)?);
    let (y_mean, y_std) = mean_and_std(checked_column("y", &bunch.y)?);
    let (t_mean, t_std) = mean_and_std(checked_column("t", &bunch.t)?);
    log::debug!(
        "Position moments over {} macroparticles: std ({:.3e}, {:.3e}, {:.3e}) m",
        bunch.npart(),
        x_std,
        y_std,
        t_std
    );
    Ok(PositionMoments {
        x_mean,
        x_std,
        y_mean,
        y_std,
        t_mean,
        t_std,
    })
}

fn ensure_populated(bunch: &ParticleBunch, what: &str) -> BeamResult<()> {
    if bunch.npart() == 0 {
        return Err(BeamError::ConfigError(format!(
            "cannot compute {what} of an empty bunch"
        )));
    }
    Ok(())
}

fn checked_column<'a>(label: &str, column: &'a [f64]) -> BeamResult<&'a [f64]> {
    if let Some(idx) = column.iter().position(|v| !v.is_finite()) {
        return Err(BeamError::PhysicsViolation(format!(
            "non-finite {label} position in particle[{idx}]"
        )));
    }
    Ok(column)
}

fn extent(column: &[f64]) -> (f64, f64) {
    column
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

fn mean_and_std(column: &[f64]) -> (f64, f64) {
    let n = column.len() as f64;
    let mean = column.iter().sum::<f64>() / n;
    let var = column.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beam_types::constants::PROTON_MASS_MEV;
    use beam_types::state::RefPart;

    fn reference_at(energy_mev: f64) -> RefPart {
        let mut ref_part = RefPart::default();
        ref_part.set_charge_qe(1.0);
        ref_part.set_mass_mev(PROTON_MASS_MEV).expect("valid mass");
        ref_part.set_energy_mev(energy_mev).expect("valid energy");
        ref_part
    }

    fn three_particle_bunch() -> ParticleBunch {
        let mut bunch = ParticleBunch::new(reference_at(250.0));
        bunch
            .add_n_particles(
                &[1.0e-3, 2.0e-3, 3.0e-3],
                &[-1.0e-3, 0.0, 1.0e-3],
                &[5.0e-4, 5.0e-4, 5.0e-4],
                &[0.0; 3],
                &[0.0; 3],
                &[0.0; 3],
                1e-9,
            )
            .expect("valid bunch");
        bunch
    }

    #[test]
    fn test_extent_of_known_bunch() {
        let bunch = three_particle_bunch();
        let extent = min_and_max_positions(&bunch).expect("populated bunch");
        assert_eq!(extent.x_min, 1.0e-3);
        assert_eq!(extent.x_max, 3.0e-3);
        assert_eq!(extent.y_min, -1.0e-3);
        assert_eq!(extent.y_max, 1.0e-3);
        assert_eq!(extent.t_min, 5.0e-4);
        assert_eq!(extent.t_max, 5.0e-4);
    }

    #[test]
    fn test_moments_of_known_bunch() {
        let bunch = three_particle_bunch();
        let moments = mean_and_std_positions(&bunch).expect("populated bunch");
        assert!((moments.x_mean - 2.0e-3).abs() < 1e-18);
        // population std of {1, 2, 3} mm is sqrt(2/3) mm
        let expected = (2.0f64 / 3.0).sqrt() * 1.0e-3;
        assert!((moments.x_std - expected).abs() < 1e-15);
        assert!(moments.y_mean.abs() < 1e-18);
        assert!((moments.t_std).abs() < 1e-15);
    }

    #[test]
    fn test_empty_bunch_is_rejected() {
        let bunch = ParticleBunch::new(reference_at(250.0));
        let err = min_and_max_positions(&bunch).unwrap_err();
        match err {
            BeamError::ConfigError(msg) => assert!(msg.contains("empty")),
            other => panic!("Unexpected error: {other:?}"),
        }
        assert!(mean_and_std_positions(&bunch).is_err());
    }

    #[test]
    fn test_non_finite_coordinate_is_reported_with_index() {
        let mut bunch = three_particle_bunch();
        bunch.y[1] = f64::NAN;
        let err = mean_and_std_positions(&bunch).unwrap_err();
        match err {
            BeamError::PhysicsViolation(msg) => {
                assert!(msg.contains("y"));
                assert!(msg.contains("particle[1]"));
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }
}
