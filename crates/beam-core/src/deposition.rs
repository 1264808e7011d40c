//! Charge deposition onto a node-centered density grid.
//!
//! Scatters every macro-particle's charge onto a uniform 3D grid over
//! (x, y, t) with the bunch's configured interpolation-shape order. The
//! deposited density feeds an external field solve; particles outside the
//! domain are skipped to match the collaborating solver's redistribute
//! semantics.

use crate::bunch::ParticleBunch;
use beam_types::constants::Q_E;
use beam_types::error::{BeamError, BeamResult};
use ndarray::Array3;

/// Node-centered charge-density grid over an axis-aligned domain.
#[derive(Debug, Clone)]
pub struct ChargeGrid {
    pub density: Array3<f64>, // charge density [C/m^3], indexed [ix, iy, it]
    pub lo: [f64; 3],         // lower domain corner [m]
    pub hi: [f64; 3],         // upper domain corner [m]
    pub spacing: [f64; 3],    // node spacing [m]
}

impl ChargeGrid {
    /// Build an empty grid with `nodes` nodes per axis spanning `[lo, hi]`.
    pub fn new(nodes: [usize; 3], lo: [f64; 3], hi: [f64; 3]) -> BeamResult<Self> {
        for (axis, &n) in nodes.iter().enumerate() {
            if n < 2 {
                return Err(BeamError::ConfigError(format!(
                    "charge grid axis {axis} needs at least 2 nodes, got {n}"
                )));
            }
        }
        let mut spacing = [0.0; 3];
        for axis in 0..3 {
            if !lo[axis].is_finite() || !hi[axis].is_finite() || hi[axis] <= lo[axis] {
                return Err(BeamError::ConfigError(format!(
                    "charge grid axis {axis} bounds must be finite with lo < hi, got [{}, {}]",
                    lo[axis], hi[axis]
                )));
            }
            spacing[axis] = (hi[axis] - lo[axis]) / (nodes[axis] - 1) as f64;
        }
        Ok(ChargeGrid {
            density: Array3::zeros((nodes[0], nodes[1], nodes[2])),
            lo,
            hi,
            spacing,
        })
    }

    /// Volume associated with one grid cell [m^3].
    pub fn cell_volume(&self) -> f64 {
        self.spacing[0] * self.spacing[1] * self.spacing[2]
    }

    /// Integral of the deposited density over the domain [C].
    pub fn total_charge_c(&self) -> f64 {
        self.density.iter().sum::<f64>() * self.cell_volume()
    }
}

/// Per-axis stencil: up to 3 (node index, weight) pairs.
type AxisStencil = ([i64; 3], [f64; 3], usize);

fn axis_stencil(pos: f64, lo: f64, spacing: f64, order: usize) -> AxisStencil {
    let s = (pos - lo) / spacing;
    match order {
        0 => {
            let node = s.round() as i64;
            ([node, 0, 0], [1.0, 0.0, 0.0], 1)
        }
        1 => {
            let node = s.floor() as i64;
            let d = s - node as f64;
            ([node, node + 1, 0], [1.0 - d, d, 0.0], 2)
        }
        _ => {
            let node = s.round() as i64;
            let d = s - node as f64;
            (
                [node - 1, node, node + 1],
                [
                    0.5 * (0.5 - d) * (0.5 - d),
                    0.75 - d * d,
                    0.5 * (0.5 + d) * (0.5 + d),
                ],
                3,
            )
        }
    }
}

/// Deposit the bunch's charge onto the grid, replacing its contents.
pub fn deposit_charge(bunch: &ParticleBunch, grid: &mut ChargeGrid) -> BeamResult<()> {
    let order = bunch.particle_shape().ok_or_else(|| {
        BeamError::ConfigError("particle shape order must be set before deposition".to_string())
    })?;

    grid.density.fill(0.0);
    let dims = grid.density.dim();
    let shape = [dims.0 as i64, dims.1 as i64, dims.2 as i64];
    let inv_volume = 1.0 / grid.cell_volume();

    let mut skipped = 0usize;
    for idx in 0..bunch.npart() {
        let pos = [bunch.x[idx], bunch.y[idx], bunch.t[idx]];
        if pos.iter().zip(0..3).any(|(&p, axis)| {
            !p.is_finite() || p < grid.lo[axis] || p > grid.hi[axis]
        }) {
            skipped += 1;
            continue;
        }

        let charge = bunch.w[idx] * Q_E * bunch.qm[idx].signum();
        if !charge.is_finite() {
            return Err(BeamError::PhysicsViolation(format!(
                "particle[{idx}] deposited charge became non-finite"
            )));
        }

        let sx = axis_stencil(pos[0], grid.lo[0], grid.spacing[0], order);
        let sy = axis_stencil(pos[1], grid.lo[1], grid.spacing[1], order);
        let st = axis_stencil(pos[2], grid.lo[2], grid.spacing[2], order);
        for ix in 0..sx.2 {
            for iy in 0..sy.2 {
                for it in 0..st.2 {
                    let (nx, ny, nt) = (sx.0[ix], sy.0[iy], st.0[it]);
                    if nx < 0 || nx >= shape[0] || ny < 0 || ny >= shape[1] || nt < 0 || nt >= shape[2]
                    {
                        continue;
                    }
                    let weight = sx.1[ix] * sy.1[iy] * st.1[it];
                    grid.density[[nx as usize, ny as usize, nt as usize]] +=
                        charge * weight * inv_volume;
                }
            }
        }
    }

    if grid.density.iter().any(|v| !v.is_finite()) {
        return Err(BeamError::PhysicsViolation(
            "deposited charge density contains non-finite values".to_string(),
        ));
    }
    if skipped > 0 {
        log::debug!("skipped {skipped} out-of-domain particles during deposition");
    }
    Ok(())
}
