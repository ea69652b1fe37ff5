//! Mathematical primitives for SCPN Fusion Core: runtime-compiled scalar
//! expressions used by density-shaped grids.

pub mod expr;
