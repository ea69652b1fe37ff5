// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Grid Specification
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-dimension grid parameters and their structural validation.

use crate::config::{or_default, ParameterSource, Section};
use crate::error::{FusionError, FusionResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of spatial dimensions carried by every grid.
pub const NDIM: usize = 3;

/// Largest accepted cell count per dimension.
pub const MAX_POINT_COUNT: i64 = i32::MAX as i64;

/// Relative slack on the `min_width <= span / point_count` bound, so a
/// floor equal to the mean width survives the rounded division.
const MIN_WIDTH_RTOL: f64 = 4.0 * f64::EPSILON;

/// Cell-width distribution along one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    /// Uniform cells.
    Fixed,
    /// Widths graded linearly towards an anchor index.
    Linear,
    /// Widths shaped by a density expression.
    Func,
}

impl ResolutionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionMode::Fixed => "fixed",
            ResolutionMode::Linear => "linear",
            ResolutionMode::Func => "func",
        }
    }

    /// Modes that need a strictly positive `min_width`.
    pub fn needs_min_width(self) -> bool {
        matches!(self, ResolutionMode::Linear | ResolutionMode::Func)
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "fixed" => Ok(ResolutionMode::Fixed),
            "linear" => Ok(ResolutionMode::Linear),
            "func" => Ok(ResolutionMode::Func),
            other => Err(other.to_string()),
        }
    }
}

/// Raw parameters of one dimension, as read from the input deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub point_count: i64,
    pub lower: f64,
    pub upper: f64,
    pub mode: ResolutionMode,
    #[serde(default)]
    pub min_width: f64,
    #[serde(default)]
    pub anchor: f64,
    #[serde(default)]
    pub density: String,
}

impl AxisSpec {
    /// Uniform axis with `point_count` cells over `[lower, upper]`.
    pub fn fixed(point_count: i64, lower: f64, upper: f64) -> Self {
        AxisSpec {
            point_count,
            lower,
            upper,
            mode: ResolutionMode::Fixed,
            min_width: 0.0,
            anchor: 0.0,
            density: String::new(),
        }
    }

    /// Linearly graded axis with the narrowest cells at `anchor`.
    pub fn linear(point_count: i64, lower: f64, upper: f64, min_width: f64, anchor: f64) -> Self {
        AxisSpec {
            mode: ResolutionMode::Linear,
            min_width,
            anchor,
            ..Self::fixed(point_count, lower, upper)
        }
    }

    /// Density-shaped axis; `density` is an expression in `n` and `N`.
    pub fn func(
        point_count: i64,
        lower: f64,
        upper: f64,
        min_width: f64,
        density: impl Into<String>,
    ) -> Self {
        AxisSpec {
            mode: ResolutionMode::Func,
            min_width,
            density: density.into(),
            ..Self::fixed(point_count, lower, upper)
        }
    }

    pub fn span(&self) -> f64 {
        self.upper - self.lower
    }

    /// Mean cell width `span / point_count`.
    pub fn average_width(&self) -> f64 {
        self.span() / self.point_count as f64
    }

    /// Structural checks for dimension `dim`. Does not touch `self`.
    pub fn validate(&self, dim: usize) -> FusionResult<()> {
        if !(1..=MAX_POINT_COUNT).contains(&self.point_count) {
            return Err(FusionError::InvalidPointCount {
                dim,
                value: self.point_count,
            });
        }
        let span = self.span();
        if !span.is_finite() || span <= 0.0 {
            return Err(FusionError::InvalidBounds {
                dim,
                lower: self.lower,
                upper: self.upper,
            });
        }
        if self.mode.needs_min_width() {
            // A floor above the mean width cannot be met by positive cells
            // that still sum to the span.
            let limit = self.average_width();
            if !self.min_width.is_finite()
                || self.min_width <= 0.0
                || self.min_width > limit * (1.0 + MIN_WIDTH_RTOL)
            {
                return Err(FusionError::InvalidMinWidth {
                    dim,
                    value: self.min_width,
                    limit,
                });
            }
        }
        if self.mode == ResolutionMode::Linear
            && !(0.0..=self.point_count as f64).contains(&self.anchor)
        {
            return Err(FusionError::InvalidAnchor {
                dim,
                value: self.anchor,
                point_count: self.point_count,
            });
        }
        Ok(())
    }
}

/// Grid parameters for all dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub axes: [AxisSpec; NDIM],
}

impl GridSpec {
    pub fn new(axes: [AxisSpec; NDIM]) -> Self {
        GridSpec { axes }
    }

    pub fn axis(&self, dim: usize) -> &AxisSpec {
        &self.axes[dim]
    }

    /// Validate every dimension, stopping at the first failure.
    pub fn validate(&self) -> FusionResult<()> {
        for (dim, axis) in self.axes.iter().enumerate() {
            axis.validate(dim)?;
        }
        Ok(())
    }

    /// Read the `grid` section. `ngrid`, `xmin`, `xmax` and `gridres` are
    /// required; `gridmin`, `linpoint` and `gridfunc` default to zero / empty.
    pub fn from_source(source: &dyn ParameterSource) -> FusionResult<Self> {
        let ngrid = per_dim(source.read_int_vec(Section::Grid, 0, "ngrid")?, "ngrid")?;
        let xmin = per_dim(source.read_real_vec(Section::Grid, 0, "xmin")?, "xmin")?;
        let xmax = per_dim(source.read_real_vec(Section::Grid, 0, "xmax")?, "xmax")?;
        let gridres = per_dim(source.read_text_vec(Section::Grid, 0, "gridres")?, "gridres")?;
        let gridmin = per_dim(
            or_default(
                source.read_real_vec(Section::Grid, 0, "gridmin"),
                vec![0.0; NDIM],
            )?,
            "gridmin",
        )?;
        let linpoint = per_dim(
            or_default(
                source.read_real_vec(Section::Grid, 0, "linpoint"),
                vec![0.0; NDIM],
            )?,
            "linpoint",
        )?;
        let gridfunc = per_dim(
            or_default(
                source.read_text_vec(Section::Grid, 0, "gridfunc"),
                vec![String::new(); NDIM],
            )?,
            "gridfunc",
        )?;

        let mut axes = Vec::with_capacity(NDIM);
        for dim in 0..NDIM {
            let mode = gridres[dim]
                .parse::<ResolutionMode>()
                .map_err(|value| FusionError::InvalidResolutionMode { dim, value })?;
            axes.push(AxisSpec {
                point_count: ngrid[dim],
                lower: xmin[dim],
                upper: xmax[dim],
                mode,
                min_width: gridmin[dim],
                anchor: linpoint[dim],
                density: gridfunc[dim].clone(),
            });
        }
        let axes: [AxisSpec; NDIM] = axes
            .try_into()
            .map_err(|_| FusionError::ConfigError("grid axis count mismatch".to_string()))?;
        Ok(GridSpec { axes })
    }
}

fn per_dim<T>(values: Vec<T>, key: &str) -> FusionResult<Vec<T>> {
    if values.len() != NDIM {
        return Err(FusionError::ConfigError(format!(
            "grid.{key} needs {NDIM} entries, got {}",
            values.len()
        )));
    }
    Ok(values)
}
