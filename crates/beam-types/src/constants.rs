// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Dynamics — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Conversion factor MeV/c^2 -> kg.
/// Fixed value shared with the energy accessors; do not replace with a
/// CODATA update without rescaling stored reference masses.
pub const MEV_C2_KG: f64 = 1.78266192e-30;

/// Elementary charge (C)
pub const Q_E: f64 = 1.602176634e-19;

/// Proton rest mass (MeV/c^2)
pub const PROTON_MASS_MEV: f64 = 938.27208816;

/// Electron rest mass (MeV/c^2)
pub const ELECTRON_MASS_MEV: f64 = 0.51099895;
