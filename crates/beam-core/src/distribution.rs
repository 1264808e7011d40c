//! Initial phase-space distribution samplers.
//!
//! Each sampler draws a 6D point with unit second moments in the fixed-t
//! frame, then scales it to the configured moments with the shared per-plane
//! coupling transform. Every particle consumes its own counter-addressed
//! ChaCha stream, so a sampled beam is bit-identical no matter how the index
//! range is partitioned across threads.

use crate::bunch::ParticleBunch;
use beam_types::config::{BunchConfig, DistributionConfig};
use beam_types::error::{BeamError, BeamResult};
use beam_types::state::{PhasePoint, RefPart};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use std::f64::consts::PI;

/// Second-moment parameter set shared by every sampler.
///
/// The sigma values scale the per-plane amplitudes; the mu values couple
/// each position to its conjugate momentum via `q -> q/sqrt(1-mu^2)`,
/// `p -> p - mu*q/sqrt(1-mu^2)`, which yields a sample correlation
/// coefficient of `-mu` per plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Moments {
    pub sigma_x: f64,
    pub sigma_y: f64,
    pub sigma_t: f64,
    pub sigma_px: f64,
    pub sigma_py: f64,
    pub sigma_pt: f64,
    pub mu_x_px: f64,
    pub mu_y_py: f64,
    pub mu_t_pt: f64,
}

impl Moments {
    /// Check the parameter set against the domain of the coupling transform.
    pub fn validate(&self) -> BeamResult<()> {
        let sigmas = [
            ("sigma_x", self.sigma_x),
            ("sigma_y", self.sigma_y),
            ("sigma_t", self.sigma_t),
            ("sigma_px", self.sigma_px),
            ("sigma_py", self.sigma_py),
            ("sigma_pt", self.sigma_pt),
        ];
        for (label, value) in sigmas {
            if !value.is_finite() || value < 0.0 {
                return Err(BeamError::ConfigError(format!(
                    "{label} must be finite and >= 0, got {value}"
                )));
            }
        }
        let mus = [
            ("mu_x_px", self.mu_x_px),
            ("mu_y_py", self.mu_y_py),
            ("mu_t_pt", self.mu_t_pt),
        ];
        for (label, value) in mus {
            if !value.is_finite() || value.abs() >= 1.0 {
                return Err(BeamError::ConfigError(format!(
                    "{label} must lie in (-1, 1), got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Scale a unit-moment draw to the configured second moments.
    fn apply(&self, p: PhasePoint) -> PhasePoint {
        let (x, px) = couple(p.x, p.px, self.sigma_x, self.sigma_px, self.mu_x_px);
        let (y, py) = couple(p.y, p.py, self.sigma_y, self.sigma_py, self.mu_y_py);
        let (t, pt) = couple(p.t, p.pt, self.sigma_t, self.sigma_pt, self.mu_t_pt);
        PhasePoint { x, y, t, px, py, pt }
    }
}

fn couple(q: f64, p: f64, sigma_q: f64, sigma_p: f64, mu: f64) -> (f64, f64) {
    let root = (1.0 - mu * mu).sqrt();
    (sigma_q * q / root, sigma_p * (p - mu * q / root))
}

/// Closed set of supported initial distributions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distribution {
    Gaussian(Moments),
    Waterbag(Moments),
    KVdist(Moments),
    Kurth4D(Moments),
    Kurth6D(Moments),
    Semigaussian(Moments),
    None,
}

impl Distribution {
    /// Deck kind tag of this distribution.
    pub fn name(&self) -> &'static str {
        match self {
            Distribution::Gaussian(_) => "gaussian",
            Distribution::Waterbag(_) => "waterbag",
            Distribution::KVdist(_) => "kvdist",
            Distribution::Kurth4D(_) => "kurth4d",
            Distribution::Kurth6D(_) => "kurth6d",
            Distribution::Semigaussian(_) => "semigaussian",
            Distribution::None => "none",
        }
    }

    /// Build a sampler from a deck record.
    pub fn from_config(cfg: &DistributionConfig) -> BeamResult<Distribution> {
        let kind = cfg.kind.to_ascii_lowercase();
        if kind == "none" {
            return Ok(Distribution::None);
        }
        let moments = Moments {
            sigma_x: cfg.sigma_x,
            sigma_y: cfg.sigma_y,
            sigma_t: cfg.sigma_t,
            sigma_px: cfg.sigma_px,
            sigma_py: cfg.sigma_py,
            sigma_pt: cfg.sigma_pt,
            mu_x_px: cfg.mu_x_px,
            mu_y_py: cfg.mu_y_py,
            mu_t_pt: cfg.mu_t_pt,
        };
        moments.validate()?;
        Ok(match kind.as_str() {
            "gaussian" => Distribution::Gaussian(moments),
            "waterbag" => Distribution::Waterbag(moments),
            "kvdist" => Distribution::KVdist(moments),
            "kurth4d" => Distribution::Kurth4D(moments),
            "kurth6d" => Distribution::Kurth6D(moments),
            "semigaussian" => Distribution::Semigaussian(moments),
            other => {
                return Err(BeamError::ConfigError(format!(
                    "unknown distribution kind: {other}"
                )))
            }
        })
    }

    /// Draw one fixed-t phase-space point.
    ///
    /// `None` draws nothing and returns the origin.
    pub fn sample_one<R: Rng + ?Sized>(&self, rng: &mut R) -> PhasePoint {
        match self {
            Distribution::None => PhasePoint::default(),

            Distribution::Gaussian(m) => {
                let draw = PhasePoint::new(
                    normal(rng),
                    normal(rng),
                    normal(rng),
                    normal(rng),
                    normal(rng),
                    normal(rng),
                );
                m.apply(draw)
            }

            // uniform over the interior of the 6-ball
            Distribution::Waterbag(m) => {
                let g = [
                    normal(rng),
                    normal(rng),
                    normal(rng),
                    normal(rng),
                    normal(rng),
                    normal(rng),
                ];
                let norm = g.iter().map(|v| v * v).sum::<f64>().sqrt();
                let radius = uniform(rng).powf(1.0 / 6.0);
                let scale = 8f64.sqrt() * radius / norm;
                m.apply(PhasePoint::new(
                    g[0] * scale,
                    g[1] * scale,
                    g[2] * scale,
                    g[3] * scale,
                    g[4] * scale,
                    g[5] * scale,
                ))
            }

            // transverse shell of the 4D unit sphere, uniform t, Gaussian pt
            Distribution::KVdist(m) => {
                let v = uniform(rng);
                let phi1 = 2.0 * PI * uniform(rng);
                let phi2 = 2.0 * PI * uniform(rng);
                let t = 3f64.sqrt() * (2.0 * uniform(rng) - 1.0);
                let pt = normal(rng);
                let r1 = 2.0 * v.sqrt();
                let r2 = 2.0 * (1.0 - v).sqrt();
                m.apply(PhasePoint::new(
                    r1 * phi1.cos(),
                    r2 * phi2.cos(),
                    t,
                    r1 * phi1.sin(),
                    r2 * phi2.sin(),
                    pt,
                ))
            }

            Distribution::Kurth4D(m) => {
                let v = uniform(rng);
                let phi = 2.0 * PI * uniform(rng);
                let r = v.sqrt();
                let ell = 2.0 * (uniform(rng) - 0.5) * r;
                let alpha = PI * uniform(rng);
                let p_phi = ell / r;
                let pmax = (1.0 - p_phi * p_phi - r * r + ell * ell).sqrt();
                let pr = pmax * alpha.cos();
                let t = 3f64.sqrt() * (2.0 * uniform(rng) - 1.0);
                let pt = normal(rng);
                m.apply(PhasePoint::new(
                    2.0 * r * phi.cos(),
                    2.0 * r * phi.sin(),
                    t,
                    2.0 * (pr * phi.cos() - p_phi * phi.sin()),
                    2.0 * (pr * phi.sin() + p_phi * phi.cos()),
                    pt,
                ))
            }

            Distribution::Kurth6D(m) => {
                let v = uniform(rng);
                let costheta = 2.0 * (uniform(rng) - 0.5);
                let phi = 2.0 * PI * uniform(rng);
                let r = v.cbrt();
                let ell = r * uniform(rng).sqrt();
                let alpha = PI * uniform(rng);
                let sintheta = (1.0 - costheta * costheta).sqrt();
                let p_ratio = ell / r;
                let pmax = (1.0 - p_ratio * p_ratio - r * r + ell * ell).sqrt();
                let pr = pmax * alpha.cos();
                let beta_angle = 2.0 * PI * uniform(rng);
                let p1 = p_ratio * beta_angle.cos();
                let p2 = p_ratio * beta_angle.sin();
                let scale = 5f64.sqrt();
                m.apply(PhasePoint::new(
                    scale * r * sintheta * phi.cos(),
                    scale * r * sintheta * phi.sin(),
                    scale * r * costheta,
                    scale * (pr * sintheta * phi.cos() + p2 * costheta * phi.cos() - p1 * phi.sin()),
                    scale * (pr * sintheta * phi.sin() + p2 * costheta * phi.sin() + p1 * phi.cos()),
                    scale * (pr * costheta - p2 * sintheta),
                ))
            }

            // positions uniform in the 3-ball, momenta Gaussian
            Distribution::Semigaussian(m) => {
                let v = uniform(rng);
                let costheta = 2.0 * (uniform(rng) - 0.5);
                let phi = 2.0 * PI * uniform(rng);
                let r = v.cbrt();
                let sintheta = (1.0 - costheta * costheta).sqrt();
                let scale = 5f64.sqrt();
                m.apply(PhasePoint::new(
                    scale * r * sintheta * phi.cos(),
                    scale * r * sintheta * phi.sin(),
                    scale * r * costheta,
                    normal(rng),
                    normal(rng),
                    normal(rng),
                ))
            }
        }
    }

    /// Draw the particle with the given index from its own stream.
    pub fn sample_indexed(&self, seed: u64, index: u64) -> PhasePoint {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(index);
        self.sample_one(&mut rng)
    }
}

#[inline]
fn uniform<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen::<f64>()
}

#[inline]
fn normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.sample(StandardNormal)
}

/// Sample a full bunch in the fixed-t frame from the deck records.
///
/// The `none` distribution yields a bunch without particles.
pub fn initialize_beam(
    ref_part: RefPart,
    bunch_cfg: &BunchConfig,
    dist_cfg: &DistributionConfig,
) -> BeamResult<ParticleBunch> {
    let distribution = Distribution::from_config(dist_cfg)?;
    let mut bunch = ParticleBunch::new(ref_part);
    bunch.set_particle_shape(bunch_cfg.shape_order)?;

    if matches!(distribution, Distribution::None) {
        log::info!("initialized an empty bunch (distribution kind none)");
        return Ok(bunch);
    }
    if bunch_cfg.npart == 0 {
        return Err(BeamError::ConfigError(
            "npart must be >= 1 for a sampled distribution".to_string(),
        ));
    }

    let seed = bunch_cfg.seed;
    let points: Vec<PhasePoint> = (0..bunch_cfg.npart)
        .into_par_iter()
        .map(|idx| distribution.sample_indexed(seed, idx as u64))
        .collect();

    let n = points.len();
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    let mut t = Vec::with_capacity(n);
    let mut px = Vec::with_capacity(n);
    let mut py = Vec::with_capacity(n);
    let mut pt = Vec::with_capacity(n);
    for p in &points {
        x.push(p.x);
        y.push(p.y);
        t.push(p.t);
        px.push(p.px);
        py.push(p.py);
        pt.push(p.pt);
    }
    bunch.add_n_particles(&x, &y, &t, &px, &py, &pt, bunch_cfg.charge_c)?;
    log::info!(
        "sampled {} macro-particles from the {} distribution (seed {})",
        bunch.npart(),
        distribution.name(),
        seed
    );
    Ok(bunch)
}
