// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Dynamics — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

use crate::error::{BeamError, BeamResult};
use crate::state::RefPart;

/// Top-level beamline configuration. Maps 1:1 to the JSON deck schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamlineConfig {
    pub beam_name: String,
    #[serde(rename = "ref")]
    pub ref_particle: RefConfig,
    pub bunch: BunchConfig,
    pub distribution: DistributionConfig,
    pub lattice: Vec<ElementConfig>,
}

/// Reference particle species and energy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefConfig {
    pub mass_mev: f64,
    pub charge_qe: f64,
    pub energy_mev: f64,
}

/// Macro-particle ensemble parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BunchConfig {
    /// Number of macro-particles to sample.
    pub npart: usize,
    /// Total bunch charge [C], split evenly over the macro-particles.
    pub charge_c: f64,
    /// Interpolation shape order for charge deposition (0, 1 or 2).
    #[serde(default = "default_shape_order")]
    pub shape_order: usize,
    /// Seed for the counter-addressed sampling streams.
    #[serde(default)]
    pub seed: u64,
}

fn default_shape_order() -> usize {
    1
}

/// Initial distribution record.
///
/// `kind` selects the sampler ("gaussian", "waterbag", "kvdist",
/// "kurth4d", "kurth6d", "semigaussian" or "none"); the sigma/mu fields
/// are the nine second-moment parameters shared by every sampler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionConfig {
    pub kind: String,
    #[serde(default)]
    pub sigma_x: f64,
    #[serde(default)]
    pub sigma_y: f64,
    #[serde(default)]
    pub sigma_t: f64,
    #[serde(default)]
    pub sigma_px: f64,
    #[serde(default)]
    pub sigma_py: f64,
    #[serde(default)]
    pub sigma_pt: f64,
    #[serde(default)]
    pub mu_x_px: f64,
    #[serde(default)]
    pub mu_y_py: f64,
    #[serde(default)]
    pub mu_t_pt: f64,
}

/// Lattice element record.
///
/// `kind` selects the transfer map ("none", "drift", "quad", "sbend",
/// "dipedge", "constf", "shortrf", "multipole" or "nonlinear_lens");
/// the remaining fields are the union of the per-element parameters and
/// default to zero when absent from the deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementConfig {
    pub kind: String,
    #[serde(default)]
    pub ds: f64,
    #[serde(default)]
    pub rc: f64,
    #[serde(default)]
    pub k: f64,
    #[serde(default)]
    pub kx: f64,
    #[serde(default)]
    pub ky: f64,
    #[serde(default)]
    pub kt: f64,
    #[serde(default)]
    pub psi: f64,
    #[serde(default)]
    pub g: f64,
    #[serde(default)]
    pub k2: f64,
    #[serde(default)]
    pub v: f64,
    #[serde(default)]
    pub m: u32,
    #[serde(default)]
    pub k_normal: f64,
    #[serde(default)]
    pub k_skew: f64,
    #[serde(default)]
    pub knll: f64,
    #[serde(default)]
    pub cnll: f64,
    #[serde(default = "default_nslice")]
    pub nslice: usize,
}

fn default_nslice() -> usize {
    1
}

impl RefConfig {
    /// Build an energized reference particle from the deck values.
    pub fn build(&self) -> BeamResult<RefPart> {
        if !self.charge_qe.is_finite() {
            return Err(BeamError::ConfigError(format!(
                "charge_qe must be finite, got {}",
                self.charge_qe
            )));
        }
        let mut ref_part = RefPart::default();
        ref_part.set_charge_qe(self.charge_qe);
        ref_part.set_mass_mev(self.mass_mev)?;
        ref_part.set_energy_mev(self.energy_mev)?;
        Ok(ref_part)
    }
}

impl BeamlineConfig {
    /// Load a beamline deck from a JSON file.
    pub fn from_file(path: &str) -> BeamResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Parse a beamline deck from a JSON string.
    pub fn from_json_str(contents: &str) -> BeamResult<Self> {
        let config: Self = serde_json::from_str(contents)?;
        Ok(config)
    }
}
