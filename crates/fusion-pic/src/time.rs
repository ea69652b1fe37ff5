// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — PIC Time Axis
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Discrete simulation time: step size, interval and step counter.

use fusion_types::config::{ParameterSource, Section};
use fusion_types::error::{FusionError, FusionResult};

#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    dt: f64,
    t_min: f64,
    t_max: f64,
    n_max: u64,
    step: u64,
}

impl TimeAxis {
    /// `t_max` is snapped to the nearest whole number of steps after `t_min`.
    pub fn new(dt: f64, t_min: f64, t_max: f64) -> FusionResult<Self> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(FusionError::ConfigError(format!(
                "Time step dt must be finite and > 0, got {dt}"
            )));
        }
        if !t_min.is_finite() || !t_max.is_finite() || t_max <= t_min {
            return Err(FusionError::ConfigError(format!(
                "Time interval must satisfy tmin < tmax, got {t_min} - {t_max}"
            )));
        }
        let n_max = ((t_max - t_min) / dt).round();
        if n_max < 1.0 {
            return Err(FusionError::ConfigError(format!(
                "Time step dt={dt} is longer than the interval {t_min} - {t_max}"
            )));
        }
        let n_max = n_max as u64;
        Ok(TimeAxis {
            dt,
            t_min,
            t_max: t_min + n_max as f64 * dt,
            n_max,
            step: 0,
        })
    }

    /// Read `dt`, `tmin` and `tmax` from the `sim` section.
    pub fn from_source(source: &dyn ParameterSource) -> FusionResult<Self> {
        let dt = source.read_real(Section::Simulation, 0, "dt")?;
        let t_min = source.read_real(Section::Simulation, 0, "tmin")?;
        let t_max = source.read_real(Section::Simulation, 0, "tmax")?;
        Self::new(dt, t_min, t_max)
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn t_min(&self) -> f64 {
        self.t_min
    }

    pub fn t_max(&self) -> f64 {
        self.t_max
    }

    /// Total number of steps in the interval.
    pub fn n_max(&self) -> u64 {
        self.n_max
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn time(&self) -> f64 {
        self.t_min + self.step as f64 * self.dt
    }

    pub fn advance(&mut self, steps: u64) {
        self.step = self.step.saturating_add(steps);
    }

    pub fn set_step(&mut self, step: u64) {
        self.step = step;
    }

    pub fn at_end(&self) -> bool {
        self.step >= self.n_max
    }

    pub fn emit(&self) {
        tracing::info!(
            t_min = self.t_min,
            t_max = self.t_max,
            dt = self.dt,
            steps = self.n_max,
            "Time setup: {:.1} - {:.1}, dt {:.4}, {} steps",
            self.t_min,
            self.t_max,
            self.dt,
            self.n_max
        );
    }
}
