// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — PIC Cell-Width Generator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Cell-width (delta) sequences for one grid dimension.
//!
//! Three resolution modes are supported:
//!
//! - `fixed`: every cell is `span / n` wide.
//! - `linear`: widths ramp linearly between `min_width` and
//!   `2 * avg - min_width`, narrowest at the anchor index.
//! - `func`: widths follow a user density expression in `n` (cell-centre
//!   index `i + 0.5`) and `N` (point count); higher density gives
//!   narrower cells, with `min_width` as the floor.
//!
//! Every mode produces `n` positive widths whose sum is the domain span.

use fusion_math::expr::ExpressionCompiler;
use fusion_types::error::{FusionError, FusionResult};
use fusion_types::grid::{AxisSpec, ResolutionMode};
use ndarray::{s, Array1};
use serde::Serialize;

/// Variables bound in density expressions, in evaluation order.
pub const DENSITY_VARIABLES: [&str; 2] = ["n", "N"];

/// Realized widths of one dimension, for diagnostic output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisReport {
    pub dim: usize,
    pub mode: ResolutionMode,
    pub point_count: usize,
    pub min_width: f64,
    pub max_width: f64,
    pub total: f64,
}

impl AxisReport {
    fn from_widths(dim: usize, mode: ResolutionMode, widths: &Array1<f64>) -> Self {
        AxisReport {
            dim,
            mode,
            point_count: widths.len(),
            min_width: widths.fold(f64::INFINITY, |acc, &w| acc.min(w)),
            max_width: widths.fold(f64::NEG_INFINITY, |acc, &w| acc.max(w)),
            total: widths.sum(),
        }
    }

    /// Log the realized resolution.
    pub fn emit(&self) {
        let axis = self.dim + 1;
        match self.mode {
            ResolutionMode::Fixed => {
                tracing::info!(
                    mode = %self.mode,
                    cells = self.point_count,
                    "Grid resolution in x{axis}: {:.4}",
                    self.min_width
                );
            }
            ResolutionMode::Linear | ResolutionMode::Func => {
                tracing::info!(
                    mode = %self.mode,
                    cells = self.point_count,
                    "Grid resolution in x{axis}: {:.4} - {:.4}",
                    self.min_width,
                    self.max_width
                );
            }
        }
    }
}

/// Widths of one dimension together with their report.
#[derive(Debug, Clone)]
pub struct AxisDeltas {
    pub widths: Array1<f64>,
    pub report: AxisReport,
}

/// Validate `axis` and build its width sequence.
pub fn generate_deltas(
    dim: usize,
    axis: &AxisSpec,
    compiler: &dyn ExpressionCompiler,
) -> FusionResult<AxisDeltas> {
    axis.validate(dim)?;
    let n = axis.point_count as usize;
    let widths = match axis.mode {
        ResolutionMode::Fixed => fixed_widths(n, axis.span()),
        ResolutionMode::Linear => {
            linear_widths(n, axis.average_width(), axis.min_width, axis.anchor)
        }
        ResolutionMode::Func => {
            density_widths(n, axis.span(), axis.min_width, &axis.density, compiler)?
        }
    };
    let report = AxisReport::from_widths(dim, axis.mode, &widths);
    Ok(AxisDeltas { widths, report })
}

/// `n` equal cells over `span`.
pub fn fixed_widths(n: usize, span: f64) -> Array1<f64> {
    Array1::from_elem(n, span / n as f64)
}

/// Piecewise-linear grading towards `anchor`.
///
/// With `lo = floor(anchor)` and `hi = ceil(anchor)`:
/// - `lo == 0`: one rising ramp over all cells;
/// - `hi == n - 1`: one falling ramp over all cells;
/// - otherwise the first `hi` cells fall to `min_width` and the remaining
///   `n - hi` cells rise from it. For an integer anchor `k` this puts
///   `min_width` in both cell `k - 1` and cell `k`.
///
/// Expects `anchor` in `[0, n]` and `0 < min_width <= avg`.
pub fn linear_widths(n: usize, avg: f64, min_width: f64, anchor: f64) -> Array1<f64> {
    let max_width = 2.0 * avg - min_width;
    let lo = anchor.floor() as usize;
    let hi = anchor.ceil() as usize;

    if lo == 0 {
        return ramp(min_width, max_width, n);
    }
    if hi + 1 == n {
        return ramp(max_width, min_width, n);
    }
    let hi = hi.min(n);
    let mut widths = Array1::zeros(n);
    widths
        .slice_mut(s![..hi])
        .assign(&ramp(max_width, min_width, hi));
    widths
        .slice_mut(s![hi..])
        .assign(&ramp(min_width, max_width, n - hi));
    widths
}

/// Endpoint-inclusive ramp of `len` values from `start` to `end`.
///
/// A single-cell ramp takes the midpoint so every ramp averages
/// `(start + end) / 2`.
fn ramp(start: f64, end: f64, len: usize) -> Array1<f64> {
    if len == 1 {
        return Array1::from_elem(1, 0.5 * (start + end));
    }
    Array1::linspace(start, end, len)
}

/// Density-shaped widths.
///
/// The expression is sampled at cell centres `n = i + 0.5` with `N = n`
/// cells, inverted against its peak (`peak - raw`), rescaled so the
/// sum is `span - n * min_width`, and offset by `min_width`. A constant
/// density yields uniform cells.
pub fn density_widths(
    n: usize,
    span: f64,
    min_width: f64,
    density: &str,
    compiler: &dyn ExpressionCompiler,
) -> FusionResult<Array1<f64>> {
    let func = compiler.compile(density, &DENSITY_VARIABLES)?;
    let count = n as f64;

    let mut raw = Array1::zeros(n);
    for (i, slot) in raw.iter_mut().enumerate() {
        let sample = i as f64 + 0.5;
        let value = func(&[sample, count])?;
        if !value.is_finite() {
            return Err(FusionError::ExpressionEval {
                expression: density.to_string(),
                message: format!("non-finite density {value} at n={sample}"),
            });
        }
        *slot = value;
    }

    let peak = raw.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
    let mut widths = raw.mapv(|v| peak - v);
    let total = widths.sum();
    if !total.is_finite() {
        return Err(FusionError::ExpressionEval {
            expression: density.to_string(),
            message: "density range overflows".to_string(),
        });
    }
    if total <= 0.0 {
        return Ok(fixed_widths(n, span));
    }

    // `t / total` stays in [0, 1] even for a subnormal density range.
    let surplus = (span - count * min_width).max(0.0);
    widths.mapv_inplace(|t| t / total * surplus + min_width);
    if widths.iter().any(|w| !w.is_finite()) {
        return Err(FusionError::ExpressionEval {
            expression: density.to_string(),
            message: "density produced non-finite cell widths".to_string(),
        });
    }
    Ok(widths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_math::expr::{CompiledFn, StandardCompiler};

    fn assert_sums_to(widths: &Array1<f64>, span: f64) {
        let sum = widths.sum();
        let tol = 8.0 * f64::EPSILON * span * widths.len() as f64;
        assert!(
            (sum - span).abs() <= tol,
            "sum={sum}, span={span}, diff={}",
            (sum - span).abs()
        );
    }

    fn generate(axis: &AxisSpec) -> AxisDeltas {
        generate_deltas(0, axis, &StandardCompiler).unwrap()
    }

    /// Compiler returning a fixed callable, independent of the source text.
    struct TableCompiler(fn(&[f64]) -> FusionResult<f64>);

    impl ExpressionCompiler for TableCompiler {
        fn compile(&self, _source: &str, variables: &[&str]) -> FusionResult<CompiledFn> {
            assert_eq!(variables, &DENSITY_VARIABLES);
            let f = self.0;
            Ok(Box::new(move |values: &[f64]| f(values)))
        }
    }

    struct FailingCompiler;

    impl ExpressionCompiler for FailingCompiler {
        fn compile(&self, source: &str, _variables: &[&str]) -> FusionResult<CompiledFn> {
            Err(FusionError::ExpressionCompile {
                expression: source.to_string(),
                message: "rejected".to_string(),
            })
        }
    }

    #[test]
    fn test_fixed_ten_cells() {
        let deltas = generate(&AxisSpec::fixed(10, 0.0, 10.0));
        assert_eq!(deltas.widths, Array1::from_elem(10, 1.0));
        assert_eq!(deltas.report.min_width, 1.0);
        assert_eq!(deltas.report.max_width, 1.0);
        assert_eq!(deltas.report.point_count, 10);
    }

    #[test]
    fn test_fixed_single_cell_is_span() {
        let deltas = generate(&AxisSpec::fixed(1, -2.5, 4.0));
        assert_eq!(deltas.widths.len(), 1);
        assert_eq!(deltas.widths[0], 6.5);
    }

    #[test]
    fn test_oversized_point_count_rejected_before_allocation() {
        for axis in [
            AxisSpec::fixed(i64::MAX, 0.0, 1.0),
            AxisSpec::linear(i64::MAX, 0.0, 1.0, 1e-30, 0.0),
            AxisSpec::func(i64::MAX, 0.0, 1.0, 1e-30, "n"),
        ] {
            assert!(matches!(
                generate_deltas(0, &axis, &StandardCompiler),
                Err(FusionError::InvalidPointCount { value: i64::MAX, .. })
            ));
        }
    }

    #[test]
    fn test_fixed_sum_awkward_span() {
        let deltas = generate(&AxisSpec::fixed(7, 0.1, 0.3));
        assert_sums_to(&deltas.widths, 0.3 - 0.1);
    }

    #[test]
    fn test_linear_anchor_zero_single_ramp() {
        let deltas = generate(&AxisSpec::linear(4, 0.0, 8.0, 0.5, 0.0));
        let expected = [0.5, 1.5, 2.5, 3.5];
        for (got, want) in deltas.widths.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} vs {want}");
        }
        assert_sums_to(&deltas.widths, 8.0);
        assert!((deltas.report.min_width - 0.5).abs() < 1e-12);
        assert!((deltas.report.max_width - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_linear_anchor_at_last_index_falls() {
        let widths = linear_widths(5, 2.0, 0.5, 4.0);
        let expected = Array1::linspace(3.5, 0.5, 5);
        assert_eq!(widths, expected);
    }

    #[test]
    fn test_linear_two_ramps_integer_anchor() {
        // n=6, avg=1, min=0.25, anchor=3: first 3 fall, last 3 rise.
        let widths = linear_widths(6, 1.0, 0.25, 3.0);
        let expected = [1.75, 1.0, 0.25, 0.25, 1.0, 1.75];
        for (got, want) in widths.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{widths:?}");
        }
        assert_sums_to(&widths, 6.0);
    }

    #[test]
    fn test_linear_two_ramps_fractional_anchor() {
        // anchor 2.5 -> hi = 3, same split as anchor 3.
        assert_eq!(
            linear_widths(6, 1.0, 0.25, 2.5),
            linear_widths(6, 1.0, 0.25, 3.0)
        );
    }

    #[test]
    fn test_linear_anchor_one_uses_midpoint_cell() {
        let widths = linear_widths(4, 2.0, 0.5, 1.0);
        assert!((widths[0] - 2.0).abs() < 1e-12);
        assert!((widths[1] - 0.5).abs() < 1e-12);
        assert!((widths[3] - 3.5).abs() < 1e-12);
        assert_sums_to(&widths, 8.0);
    }

    #[test]
    fn test_linear_anchor_at_point_count() {
        let widths = linear_widths(5, 2.0, 0.5, 5.0);
        assert_eq!(widths, Array1::linspace(3.5, 0.5, 5));
        let widths = linear_widths(5, 2.0, 0.5, 4.5);
        assert_eq!(widths, Array1::linspace(3.5, 0.5, 5));
    }

    #[test]
    fn test_linear_single_cell() {
        for anchor in [0.0, 0.5, 1.0] {
            let deltas = generate(&AxisSpec::linear(1, 0.0, 3.0, 1.0, anchor));
            assert_eq!(deltas.widths.len(), 1);
            assert!((deltas.widths[0] - 3.0).abs() < 1e-15, "anchor {anchor}");
        }
    }

    #[test]
    fn test_linear_min_equal_avg_is_uniform() {
        let widths = linear_widths(8, 0.5, 0.5, 3.0);
        for &w in &widths {
            assert!((w - 0.5).abs() < 1e-15);
        }
    }

    #[test]
    fn test_func_gaussian_density() {
        let axis = AxisSpec::func(32, 0.0, 4.0, 0.02, "exp(-((n - N/2) / (N/8))^2)");
        let deltas = generate(&axis);
        assert_sums_to(&deltas.widths, 4.0);
        for &w in &deltas.widths {
            assert!(w >= 0.02 - 1e-15);
        }
        // Density peaks at the centre cells, so they are the narrowest.
        let argmin = deltas
            .widths
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!(argmin == 15 || argmin == 16, "argmin {argmin}");
        assert!(deltas.widths[0] > deltas.widths[10]);
    }

    #[test]
    fn test_func_peak_cell_gets_min_width() {
        // Monotone increasing density: last cell densest.
        let widths = density_widths(10, 5.0, 0.1, "n", &StandardCompiler).unwrap();
        assert!((widths[9] - 0.1).abs() < 1e-15);
        for i in 1..10 {
            assert!(widths[i] < widths[i - 1]);
        }
        assert_sums_to(&widths, 5.0);
    }

    #[test]
    fn test_func_samples_cell_centres() {
        fn record(values: &[f64]) -> FusionResult<f64> {
            // Density equal to the sample point, offset by N to check binding.
            assert_eq!(values[1], 4.0);
            assert!((values[0] - values[0].floor() - 0.5).abs() < 1e-15);
            Ok(values[0])
        }
        let widths = density_widths(4, 4.0, 0.5, "ignored", &TableCompiler(record)).unwrap();
        // raw = [0.5, 1.5, 2.5, 3.5] -> t = [3, 2, 1, 0], scale = (4 - 2) / 6.
        let expected = [1.5, 0.5 + 2.0 / 3.0, 0.5 + 1.0 / 3.0, 0.5];
        for (got, want) in widths.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{widths:?}");
        }
    }

    #[test]
    fn test_func_constant_density_is_uniform() {
        let widths = density_widths(5, 10.0, 0.5, "3", &StandardCompiler).unwrap();
        assert_eq!(widths, Array1::from_elem(5, 2.0));
    }

    #[test]
    fn test_func_tiny_density_range_stays_finite() {
        // Subnormal samples: the range is positive but far below 1 / span.
        let axis = AxisSpec::func(4, 0.0, 1.0, 0.1, "1e-320 * n");
        let deltas = generate(&axis);
        let expected = [0.4, 0.3, 0.2, 0.1];
        for (got, want) in deltas.widths.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{:?}", deltas.widths);
        }
        assert_sums_to(&deltas.widths, 1.0);
        assert!(deltas.report.total.is_finite());
    }

    #[test]
    fn test_func_floor_rounding_never_goes_below_min() {
        // 0.3 / 3 rounds below the 0.1 floor.
        let widths = density_widths(3, 0.3, 0.1, "n", &StandardCompiler).unwrap();
        for &w in &widths {
            assert!(w >= 0.1, "{widths:?}");
        }
    }

    #[test]
    fn test_func_min_equal_avg() {
        let widths = density_widths(4, 2.0, 0.5, "n^2", &StandardCompiler).unwrap();
        for &w in &widths {
            assert!((w - 0.5).abs() < 1e-15);
        }
    }

    #[test]
    fn test_func_compile_failure_propagates() {
        let axis = AxisSpec::func(8, 0.0, 1.0, 0.01, "exp(");
        match generate_deltas(2, &axis, &StandardCompiler) {
            Err(FusionError::ExpressionCompile { expression, .. }) => {
                assert_eq!(expression, "exp(");
            }
            other => panic!("Unexpected result: {other:?}"),
        }
        assert!(matches!(
            generate_deltas(0, &axis, &FailingCompiler),
            Err(FusionError::ExpressionCompile { .. })
        ));
    }

    #[test]
    fn test_func_eval_failure_propagates() {
        // 1 / (n - 2.5) blows up at the third cell centre.
        let axis = AxisSpec::func(8, 0.0, 1.0, 0.01, "1 / (n - 2.5)");
        assert!(matches!(
            generate_deltas(0, &axis, &StandardCompiler),
            Err(FusionError::ExpressionEval { .. })
        ));

        fn nan(_: &[f64]) -> FusionResult<f64> {
            Ok(f64::NAN)
        }
        assert!(matches!(
            density_widths(4, 1.0, 0.1, "nan", &TableCompiler(nan)),
            Err(FusionError::ExpressionEval { .. })
        ));
    }

    #[test]
    fn test_func_empty_expression_rejected() {
        let axis = AxisSpec::func(8, 0.0, 1.0, 0.01, "");
        assert!(matches!(
            generate_deltas(0, &axis, &StandardCompiler),
            Err(FusionError::ExpressionCompile { .. })
        ));
    }

    #[test]
    fn test_fixed_mode_never_compiles() {
        let axis = AxisSpec {
            density: "this is not an expression".to_string(),
            ..AxisSpec::fixed(4, 0.0, 1.0)
        };
        assert!(generate_deltas(0, &axis, &FailingCompiler).is_ok());
    }

    #[test]
    fn test_validation_runs_first() {
        let axis = AxisSpec::func(0, 0.0, 1.0, 0.01, "exp(");
        assert!(matches!(
            generate_deltas(0, &axis, &FailingCompiler),
            Err(FusionError::InvalidPointCount { .. })
        ));
        let axis = AxisSpec::linear(4, 0.0, 8.0, 0.0, 1.0);
        assert!(matches!(
            generate_deltas(0, &axis, &StandardCompiler),
            Err(FusionError::InvalidMinWidth { .. })
        ));
        let axis = AxisSpec::linear(4, 0.0, 8.0, 0.5, -1.0);
        assert!(matches!(
            generate_deltas(0, &axis, &StandardCompiler),
            Err(FusionError::InvalidAnchor { .. })
        ));
        let axis = AxisSpec::fixed(4, 1.0, 1.0);
        assert!(matches!(
            generate_deltas(0, &axis, &StandardCompiler),
            Err(FusionError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let axis = AxisSpec::func(64, -1.0, 1.0, 0.005, "1 + sin(2 * pi * n / N)^2");
        let a = generate(&axis);
        let b = generate(&axis);
        for (x, y) in a.widths.iter().zip(b.widths.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
        assert_eq!(a.report, b.report);
    }
}
