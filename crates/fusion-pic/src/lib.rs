// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — PIC Setup
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Particle-in-cell setup layer: non-uniform grid construction, time axis
//! and simulation parameters.

pub mod delta;
pub mod grid;
pub mod simulation;
pub mod time;
