//! Transfer maps for the supported lattice elements.
//!
//! Each element applies a per-slice linear or thin-kick map to a single
//! particle in the fixed-s frame, plus a matching per-slice push of the
//! reference particle. Particle pushes read the reference state as it was
//! before the slice; the sequencer advances the reference once per slice
//! after the whole ensemble has been pushed.

use beam_types::config::ElementConfig;
use beam_types::error::{BeamError, BeamResult};
use beam_types::state::{PhasePoint, RefPart};
use num_complex::Complex64;

/// Closed set of supported lattice elements.
///
/// Thick elements (Drift, Quad, Sbend, ConstF) carry a length and a slice
/// count; the remaining kinds are zero-length kicks with `ds() = 0` and
/// `nslice() = 1`. `None` is the identity element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Element {
    None,
    Drift {
        ds: f64,
        nslice: usize,
    },
    Quad {
        ds: f64,
        k: f64,
        nslice: usize,
    },
    Sbend {
        ds: f64,
        rc: f64,
        nslice: usize,
    },
    DipEdge {
        psi: f64,
        rc: f64,
        g: f64,
        k2: f64,
    },
    ConstF {
        ds: f64,
        kx: f64,
        ky: f64,
        kt: f64,
        nslice: usize,
    },
    ShortRF {
        v: f64,
        k: f64,
    },
    Multipole {
        m: u32,
        k_normal: f64,
        k_skew: f64,
    },
    NonlinearLens {
        knll: f64,
        cnll: f64,
    },
}

impl Element {
    /// Deck kind tag of this element.
    pub fn name(&self) -> &'static str {
        match self {
            Element::None => "none",
            Element::Drift { .. } => "drift",
            Element::Quad { .. } => "quad",
            Element::Sbend { .. } => "sbend",
            Element::DipEdge { .. } => "dipedge",
            Element::ConstF { .. } => "constf",
            Element::ShortRF { .. } => "shortrf",
            Element::Multipole { .. } => "multipole",
            Element::NonlinearLens { .. } => "nonlinear_lens",
        }
    }

    /// Segment length [m]. Zero for thin kicks.
    pub fn ds(&self) -> f64 {
        match *self {
            Element::Drift { ds, .. }
            | Element::Quad { ds, .. }
            | Element::Sbend { ds, .. }
            | Element::ConstF { ds, .. } => ds,
            _ => 0.0,
        }
    }

    /// Number of slices used for space-charge coupling.
    pub fn nslice(&self) -> usize {
        match *self {
            Element::Drift { nslice, .. }
            | Element::Quad { nslice, .. }
            | Element::Sbend { nslice, .. }
            | Element::ConstF { nslice, .. } => nslice,
            _ => 1,
        }
    }

    /// Length of one slice [m].
    #[inline]
    pub fn slice_ds(&self) -> f64 {
        self.ds() / self.nslice() as f64
    }

    /// Build an element from a deck record, rejecting parameter sets the
    /// maps cannot evaluate.
    pub fn from_config(cfg: &ElementConfig) -> BeamResult<Element> {
        let kind = cfg.kind.to_ascii_lowercase();
        let element = match kind.as_str() {
            "none" => Element::None,
            "drift" => Element::Drift {
                ds: cfg.ds,
                nslice: cfg.nslice,
            },
            "quad" => Element::Quad {
                ds: cfg.ds,
                k: cfg.k,
                nslice: cfg.nslice,
            },
            "sbend" => Element::Sbend {
                ds: cfg.ds,
                rc: cfg.rc,
                nslice: cfg.nslice,
            },
            "dipedge" => Element::DipEdge {
                psi: cfg.psi,
                rc: cfg.rc,
                g: cfg.g,
                k2: cfg.k2,
            },
            "constf" => Element::ConstF {
                ds: cfg.ds,
                kx: cfg.kx,
                ky: cfg.ky,
                kt: cfg.kt,
                nslice: cfg.nslice,
            },
            "shortrf" => Element::ShortRF { v: cfg.v, k: cfg.k },
            "multipole" => Element::Multipole {
                m: cfg.m,
                k_normal: cfg.k_normal,
                k_skew: cfg.k_skew,
            },
            "nonlinear_lens" => Element::NonlinearLens {
                knll: cfg.knll,
                cnll: cfg.cnll,
            },
            other => {
                return Err(BeamError::ConfigError(format!(
                    "unknown element kind: {other}"
                )))
            }
        };
        element.validate()?;
        Ok(element)
    }

    /// Check the parameter set against the domain of the map.
    pub fn validate(&self) -> BeamResult<()> {
        let name = self.name();
        if self.nslice() == 0 {
            return Err(BeamError::ConfigError(format!(
                "{name}: nslice must be >= 1"
            )));
        }
        if !self.ds().is_finite() || self.ds() < 0.0 {
            return Err(BeamError::ConfigError(format!(
                "{name}: ds must be finite and >= 0, got {}",
                self.ds()
            )));
        }
        match *self {
            Element::Quad { k, .. } => {
                if !k.is_finite() || k == 0.0 {
                    return Err(BeamError::ConfigError(format!(
                        "{name}: k must be finite and non-zero, got {k}"
                    )));
                }
            }
            Element::Sbend { rc, .. } => {
                if !rc.is_finite() || rc == 0.0 {
                    return Err(BeamError::ConfigError(format!(
                        "{name}: rc must be finite and non-zero, got {rc}"
                    )));
                }
            }
            Element::DipEdge { psi, rc, g, k2 } => {
                if !rc.is_finite() || rc == 0.0 {
                    return Err(BeamError::ConfigError(format!(
                        "{name}: rc must be finite and non-zero, got {rc}"
                    )));
                }
                if !psi.is_finite() || !g.is_finite() || !k2.is_finite() {
                    return Err(BeamError::ConfigError(format!(
                        "{name}: psi, g and k2 must be finite"
                    )));
                }
            }
            Element::ConstF { kx, ky, kt, .. } => {
                for (label, value) in [("kx", kx), ("ky", ky), ("kt", kt)] {
                    if !value.is_finite() || value == 0.0 {
                        return Err(BeamError::ConfigError(format!(
                            "{name}: {label} must be finite and non-zero, got {value}"
                        )));
                    }
                }
            }
            Element::ShortRF { v, k } => {
                if !v.is_finite() || !k.is_finite() {
                    return Err(BeamError::ConfigError(format!(
                        "{name}: v and k must be finite"
                    )));
                }
            }
            Element::Multipole {
                m,
                k_normal,
                k_skew,
            } => {
                if m == 0 {
                    return Err(BeamError::ConfigError(format!(
                        "{name}: m must be >= 1 (1 = dipole, 2 = quadrupole, ...)"
                    )));
                }
                if !k_normal.is_finite() || !k_skew.is_finite() {
                    return Err(BeamError::ConfigError(format!(
                        "{name}: k_normal and k_skew must be finite"
                    )));
                }
            }
            Element::NonlinearLens { knll, cnll } => {
                if !cnll.is_finite() || cnll <= 0.0 {
                    return Err(BeamError::ConfigError(format!(
                        "{name}: cnll must be finite and > 0, got {cnll}"
                    )));
                }
                if !knll.is_finite() {
                    return Err(BeamError::ConfigError(format!(
                        "{name}: knll must be finite, got {knll}"
                    )));
                }
            }
            Element::None | Element::Drift { .. } => {}
        }
        Ok(())
    }

    /// Apply one slice of this element's map to a single particle.
    ///
    /// `ref_part` must be the reference state at the entry of the slice.
    pub fn push_particle(&self, p: PhasePoint, ref_part: &RefPart) -> PhasePoint {
        match *self {
            Element::None => p,

            Element::Drift { ds, nslice } => {
                let slice_ds = ds / nslice as f64;
                let betgam2 = ref_part.pt * ref_part.pt - 1.0;
                PhasePoint {
                    x: p.x + slice_ds * p.px,
                    y: p.y + slice_ds * p.py,
                    t: p.t + slice_ds / betgam2 * p.pt,
                    ..p
                }
            }

            Element::Quad { ds, k, nslice } => {
                debug_assert!(k != 0.0, "quad gradient must be non-zero");
                let slice_ds = ds / nslice as f64;
                let betgam2 = ref_part.pt * ref_part.pt - 1.0;
                let omega = k.abs().sqrt();
                let arg = omega * slice_ds;
                let (sn, cs) = arg.sin_cos();
                let sh = arg.sinh();
                let ch = arg.cosh();
                // k > 0 focuses horizontally, k < 0 vertically
                let (x, px, y, py) = if k > 0.0 {
                    (
                        cs * p.x + sn / omega * p.px,
                        -omega * sn * p.x + cs * p.px,
                        ch * p.y + sh / omega * p.py,
                        omega * sh * p.y + ch * p.py,
                    )
                } else {
                    (
                        ch * p.x + sh / omega * p.px,
                        omega * sh * p.x + ch * p.px,
                        cs * p.y + sn / omega * p.py,
                        -omega * sn * p.y + cs * p.py,
                    )
                };
                PhasePoint {
                    x,
                    y,
                    t: p.t + slice_ds / betgam2 * p.pt,
                    px,
                    py,
                    pt: p.pt,
                }
            }

            Element::Sbend { ds, rc, nslice } => {
                debug_assert!(rc != 0.0, "bend radius must be non-zero");
                let slice_ds = ds / nslice as f64;
                let betgam2 = ref_part.pt * ref_part.pt - 1.0;
                let bet = (betgam2 / (1.0 + betgam2)).sqrt();
                let theta = slice_ds / rc;
                let (sn, cs) = theta.sin_cos();
                PhasePoint {
                    x: cs * p.x + rc * sn * p.px - (rc / bet) * (1.0 - cs) * p.pt,
                    px: -sn / rc * p.x + cs * p.px - sn / bet * p.pt,
                    y: p.y + slice_ds * p.py,
                    py: p.py,
                    t: sn / bet * p.x
                        + rc / bet * (1.0 - cs) * p.px
                        + p.t
                        + rc * (-theta + sn / (bet * bet)) * p.pt,
                    pt: p.pt,
                }
            }

            Element::DipEdge { psi, rc, g, k2 } => {
                debug_assert!(rc != 0.0, "bend radius must be non-zero");
                let r21 = psi.tan() / rc;
                // fringe-field correction to the vertical edge angle
                let psi_v = psi - g * k2 * (1.0 + psi.sin().powi(2)) / (rc * psi.cos());
                let r43 = -psi_v.tan() / rc;
                PhasePoint {
                    px: p.px + r21 * p.x,
                    py: p.py + r43 * p.y,
                    ..p
                }
            }

            Element::ConstF {
                ds,
                kx,
                ky,
                kt,
                nslice,
            } => {
                debug_assert!(
                    kx != 0.0 && ky != 0.0 && kt != 0.0,
                    "constf strengths must be non-zero"
                );
                let slice_ds = ds / nslice as f64;
                let betgam2 = ref_part.pt * ref_part.pt - 1.0;
                let (sx, cx) = (kx * slice_ds).sin_cos();
                let (sy, cy) = (ky * slice_ds).sin_cos();
                let (st, ct) = (kt * slice_ds).sin_cos();
                PhasePoint {
                    x: cx * p.x + sx / kx * p.px,
                    px: -kx * sx * p.x + cx * p.px,
                    y: cy * p.y + sy / ky * p.py,
                    py: -ky * sy * p.y + cy * p.py,
                    t: ct * p.t + st / (betgam2 * kt) * p.pt,
                    pt: -kt * betgam2 * st * p.t + ct * p.pt,
                }
            }

            Element::ShortRF { v, k } => {
                let betgam2 = ref_part.pt * ref_part.pt - 1.0;
                PhasePoint {
                    px: p.px + k * v / (2.0 * betgam2) * p.x,
                    py: p.py + k * v / (2.0 * betgam2) * p.y,
                    pt: p.pt - k * v * p.t,
                    ..p
                }
            }

            Element::Multipole {
                m,
                k_normal,
                k_skew,
            } => {
                debug_assert!(m >= 1, "multipole order starts at 1");
                let mfactorial = factorial(m - 1);
                let alpha = Complex64::new(k_normal, k_skew);
                let zeta = Complex64::new(p.x, p.y);
                let kick = alpha * zeta.powu(m - 1) / mfactorial;
                PhasePoint {
                    px: p.px - kick.re,
                    py: p.py + kick.im,
                    ..p
                }
            }

            Element::NonlinearLens { knll, cnll } => {
                debug_assert!(cnll > 0.0, "cnll must be positive");
                let i = Complex64::i();
                let zeta = Complex64::new(p.x, p.y);
                let croot = (Complex64::new(1.0, 0.0) - zeta * zeta).sqrt();
                let carcsin = -i * (i * zeta + croot).ln();
                // F'(zeta) of the Danilov-Nagaitsev insert potential
                let df = zeta / (croot * croot) + carcsin / (croot * croot * croot);
                let kick = -knll / cnll;
                PhasePoint {
                    px: p.px + kick * df.re,
                    py: p.py - kick * df.im,
                    ..p
                }
            }
        }
    }

    /// Advance the reference particle through one slice of this element.
    pub fn push_reference(&self, ref_part: &mut RefPart) {
        match *self {
            Element::None
            | Element::DipEdge { .. }
            | Element::ShortRF { .. }
            | Element::Multipole { .. }
            | Element::NonlinearLens { .. } => {}

            Element::Drift { ds, nslice }
            | Element::Quad { ds, nslice, .. }
            | Element::ConstF { ds, nslice, .. } => {
                straight_reference_push(ref_part, ds / nslice as f64);
            }

            Element::Sbend { ds, rc, nslice } => {
                bend_reference_push(ref_part, ds / nslice as f64, rc);
            }
        }
    }
}

/// Straight-line reference advance over one slice.
fn straight_reference_push(ref_part: &mut RefPart, slice_ds: f64) {
    let betgam = (ref_part.pt * ref_part.pt - 1.0).sqrt();
    let step = slice_ds / betgam;
    ref_part.x += step * ref_part.px;
    ref_part.y += step * ref_part.py;
    ref_part.z += step * ref_part.pz;
    ref_part.t -= step * ref_part.pt;
    ref_part.s += slice_ds;
}

/// Circular-arc reference advance over one slice of a sector bend.
fn bend_reference_push(ref_part: &mut RefPart, slice_ds: f64, rc: f64) {
    let betgam = (ref_part.pt * ref_part.pt - 1.0).sqrt();
    let b = betgam / rc;
    let theta = slice_ds / rc;
    let (sn, cs) = theta.sin_cos();
    let px = ref_part.px;
    let pz = ref_part.pz;
    ref_part.px = px * cs - pz * sn;
    ref_part.pz = pz * cs + px * sn;
    ref_part.x += (ref_part.pz - pz) / b;
    ref_part.z -= (ref_part.px - px) / b;
    ref_part.t -= slice_ds * ref_part.pt / betgam;
    ref_part.s += slice_ds;
}

#[inline]
fn factorial(n: u32) -> f64 {
    (1..=n).map(f64::from).product()
}
