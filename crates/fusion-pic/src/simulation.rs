// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — PIC Simulation Setup
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Simulation setup: run parameters, time axis and grid from one input deck.
//!
//! Every process builds the same state from the same deck. Only the
//! coordinating process (rank 0) logs diagnostics.

use crate::grid::Grid;
use crate::time::TimeAxis;
use fusion_math::expr::ExpressionCompiler;
use fusion_types::config::{or_default, ParameterSource, Section};
use fusion_types::error::{FusionError, FusionResult};
use serde::Serialize;

/// Position of this process in a multi-process run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessRole {
    rank: usize,
    size: usize,
}

impl ProcessRole {
    pub fn new(rank: usize, size: usize) -> FusionResult<Self> {
        if size == 0 {
            return Err(FusionError::ConfigError(
                "Process count must be >= 1".to_string(),
            ));
        }
        if rank >= size {
            return Err(FusionError::ConfigError(format!(
                "Process rank {rank} out of range for {size} process(es)"
            )));
        }
        Ok(Self { rank, size })
    }

    /// The only process of a serial run.
    pub fn single() -> Self {
        Self { rank: 0, size: 1 }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_coordinator(&self) -> bool {
        self.rank == 0
    }
}

/// Run-wide parameters from the `sim` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationParams {
    /// Always the number of participating processes.
    pub nodes: usize,
    pub threads: usize,
    /// Reference density.
    pub n0: f64,
}

impl SimulationParams {
    pub fn from_source(source: &dyn ParameterSource, role: &ProcessRole) -> FusionResult<Self> {
        let requested_nodes = or_default(source.read_int(Section::Simulation, 0, "nodes"), 1)?;
        let threads = or_default(source.read_int(Section::Simulation, 0, "threads"), 1)?;
        let n0 = or_default(source.read_real(Section::Simulation, 0, "n0"), 1.0)?;

        if threads < 1 {
            return Err(FusionError::ConfigError(format!(
                "sim.threads must be >= 1, got {threads}"
            )));
        }
        if !n0.is_finite() || n0 <= 0.0 {
            return Err(FusionError::ConfigError(format!(
                "sim.n0 must be finite and > 0, got {n0}"
            )));
        }
        if role.is_coordinator() && requested_nodes != role.size() as i64 {
            tracing::warn!(
                requested = requested_nodes,
                actual = role.size(),
                "sim.nodes ignored, using the process count"
            );
        }

        Ok(SimulationParams {
            nodes: role.size(),
            threads: threads as usize,
            n0,
        })
    }

    pub fn emit(&self) {
        tracing::info!(
            nodes = self.nodes,
            threads = self.threads,
            n0 = self.n0,
            "Simulation setup"
        );
    }
}

/// Fully set-up simulation state.
#[derive(Debug, Clone)]
pub struct Simulation {
    role: ProcessRole,
    params: SimulationParams,
    time: TimeAxis,
    grid: Grid,
}

impl Simulation {
    /// Read run parameters, time axis and grid, in that order. On the
    /// coordinator, diagnostics are logged on success and the failure
    /// cause is logged before it propagates.
    pub fn setup(
        source: &dyn ParameterSource,
        role: ProcessRole,
        compiler: &dyn ExpressionCompiler,
    ) -> FusionResult<Self> {
        let result = Self::assemble(source, role, compiler);
        match &result {
            Ok(sim) if role.is_coordinator() => {
                sim.params.emit();
                sim.time.emit();
                sim.grid.report().emit();
            }
            Err(err) if role.is_coordinator() => {
                tracing::error!(rank = role.rank(), "Setup failed: {err}");
            }
            _ => {}
        }
        result
    }

    fn assemble(
        source: &dyn ParameterSource,
        role: ProcessRole,
        compiler: &dyn ExpressionCompiler,
    ) -> FusionResult<Self> {
        let params = SimulationParams::from_source(source, &role)?;
        let time = TimeAxis::from_source(source)?;
        let grid = Grid::from_source(source, compiler)?;
        Ok(Simulation {
            role,
            params,
            time,
            grid,
        })
    }

    pub fn role(&self) -> &ProcessRole {
        &self.role
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn time(&self) -> &TimeAxis {
        &self.time
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }
}
