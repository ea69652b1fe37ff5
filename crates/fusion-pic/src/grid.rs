// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — PIC Grid
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Read-only grid aggregate holding the cell widths of every dimension.

use crate::delta::{generate_deltas, AxisDeltas, AxisReport};
use fusion_math::expr::ExpressionCompiler;
use fusion_types::config::ParameterSource;
use fusion_types::error::FusionResult;
use fusion_types::grid::{GridSpec, NDIM};
use ndarray::{Array1, ArrayView1};
use serde::Serialize;

/// Per-dimension reports produced while building a grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridReport {
    pub axes: Vec<AxisReport>,
}

impl GridReport {
    pub fn emit(&self) {
        for axis in &self.axes {
            axis.emit();
        }
    }
}

/// Non-uniform Cartesian grid.
///
/// Built once from a [`GridSpec`]; there is no way to modify it afterwards.
/// Accessors taking `dim` panic when `dim >= NDIM`.
#[derive(Debug, Clone)]
pub struct Grid {
    spec: GridSpec,
    deltas: Vec<Array1<f64>>,
    nodes: Vec<Array1<f64>>,
    report: GridReport,
}

impl Grid {
    /// Generate every dimension. The first failing dimension aborts the
    /// build and nothing is returned.
    pub fn build(spec: GridSpec, compiler: &dyn ExpressionCompiler) -> FusionResult<Self> {
        let mut deltas = Vec::with_capacity(NDIM);
        let mut nodes = Vec::with_capacity(NDIM);
        let mut axes = Vec::with_capacity(NDIM);
        for (dim, axis) in spec.axes.iter().enumerate() {
            let AxisDeltas { widths, report } = generate_deltas(dim, axis, compiler)?;
            nodes.push(accumulate_nodes(&widths, axis.lower, axis.upper));
            deltas.push(widths);
            axes.push(report);
        }
        Ok(Grid {
            spec,
            deltas,
            nodes,
            report: GridReport { axes },
        })
    }

    /// Read the `grid` section of `source` and build.
    pub fn from_source(
        source: &dyn ParameterSource,
        compiler: &dyn ExpressionCompiler,
    ) -> FusionResult<Self> {
        Self::build(GridSpec::from_source(source)?, compiler)
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn report(&self) -> &GridReport {
        &self.report
    }

    /// Cell widths along `dim`.
    pub fn deltas(&self, dim: usize) -> ArrayView1<'_, f64> {
        self.deltas[dim].view()
    }

    pub fn point_count(&self, dim: usize) -> usize {
        self.deltas[dim].len()
    }

    pub fn bounds(&self, dim: usize) -> (f64, f64) {
        let axis = self.spec.axis(dim);
        (axis.lower, axis.upper)
    }

    pub fn span(&self, dim: usize) -> f64 {
        self.spec.axis(dim).span()
    }

    /// `point_count + 1` cell boundaries from `lower` to `upper`.
    pub fn node_positions(&self, dim: usize) -> ArrayView1<'_, f64> {
        self.nodes[dim].view()
    }

    /// Midpoints of consecutive nodes.
    pub fn cell_centers(&self, dim: usize) -> Array1<f64> {
        let nodes = &self.nodes[dim];
        let n = self.point_count(dim);
        Array1::from_shape_fn(n, |i| 0.5 * (nodes[i] + nodes[i + 1]))
    }

    /// Index of the cell containing `x`, cells being `[node_i, node_{i+1})`
    /// except the last which also contains `upper`. `None` outside the
    /// domain.
    pub fn locate_cell(&self, dim: usize, x: f64) -> Option<usize> {
        let (lower, upper) = self.bounds(dim);
        if !(lower..=upper).contains(&x) {
            return None;
        }
        let nodes = &self.nodes[dim];
        let n = self.point_count(dim);
        let (mut lo, mut hi) = (0usize, n);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if x < nodes[mid + 1] {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        Some(lo.min(n - 1))
    }
}

/// Running sum of `widths` from `lower`, with the last node pinned to
/// `upper` so rounding never moves the domain edge.
fn accumulate_nodes(widths: &Array1<f64>, lower: f64, upper: f64) -> Array1<f64> {
    let n = widths.len();
    let mut nodes = Array1::zeros(n + 1);
    let mut position = lower;
    nodes[0] = lower;
    for (i, w) in widths.iter().enumerate() {
        position += w;
        nodes[i + 1] = position;
    }
    nodes[n] = upper;
    nodes
}
