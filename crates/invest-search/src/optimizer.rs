use std::env;
use std::path::Path;
use std::sync::Once;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use invest_core::config::SearchConfig;
use invest_core::{AnalyzerError, Result};
use invest_data::ObservationStore;

use crate::model::evaluate;

static RAYON_INIT: Once = Once::new();

fn init_rayon() {
    RAYON_INIT.call_once(|| {
        let threads = env::var("INVEST_ANALYZER_THREADS")
            .ok()
            .or_else(|| env::var("RAYON_NUM_THREADS").ok())
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&v| v > 0);
        if let Some(n) = threads {
            let _ = rayon::ThreadPoolBuilder::new().num_threads(n).build_global();
        }
    });
}

/// Discretized rectangular search space for threshold pairs.
///
/// Both ranges are closed: enumeration walks `min + i * step` and the upper
/// bound is tested exactly when it is a lattice point of the step, otherwise
/// the last value tested is the largest lattice point below it. Only the
/// upper bound of `y_range` participates in the search, since `y` always
/// starts one step above the current `x`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchGrid {
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub step: f64,
}

impl SearchGrid {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            x_range: (config.x_min, config.x_max),
            y_range: (config.y_min, config.y_max),
            step: config.step,
        }
    }
}

impl Default for SearchGrid {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}

/// Best-scoring threshold pair over a searched grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub best_x: f64,
    pub best_y: f64,
    pub best_value: f64,
    pub x_count: usize,
    pub y_count: usize,
}

impl OptimizationResult {
    fn sentinel() -> Self {
        Self {
            best_x: 0.0,
            best_y: 0.0,
            best_value: 0.0,
            x_count: 0,
            y_count: 0,
        }
    }
}

/// One evaluated grid cell, for external renderers (heatmaps, surfaces).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub x: f64,
    pub y: f64,
    pub expected_value: f64,
}

fn validate_grid(grid: &SearchGrid) -> Result<()> {
    if !grid.step.is_finite() || grid.step <= 0.0 {
        return Err(AnalyzerError::InvalidRange(grid.step));
    }
    // The evaluator divides by x, so the grid must never reach zero.
    if grid.x_range.0 <= 0.0 {
        return Err(AnalyzerError::InvalidThreshold(grid.x_range.0));
    }
    Ok(())
}

fn lattice(min: f64, max: f64, step: f64) -> Vec<f64> {
    let mut points = Vec::new();
    let mut i = 0u64;
    loop {
        let value = min + i as f64 * step;
        if value > max {
            break;
        }
        points.push(value);
        i += 1;
    }
    points
}

/// Exhaustively search the grid for the threshold pair maximizing expected
/// value.
///
/// The running maximum starts at a zero sentinel and is only displaced by a
/// strictly greater score, so ties resolve to the first cell in ascending
/// `(x, y)` order and a grid where every cell scores at or below zero
/// returns the sentinel `(0, 0, 0, 0, 0)` rather than the best nonpositive
/// cell. Columns are evaluated in parallel; the per-column winners are then
/// folded in ascending `x` order so the tie-break matches a sequential scan.
pub fn optimize(
    store: &ObservationStore,
    grid: &SearchGrid,
    stop_loss: f64,
    include_flagged: bool,
) -> Result<OptimizationResult> {
    validate_grid(grid)?;
    init_rayon();

    let xs = lattice(grid.x_range.0, grid.x_range.1, grid.step);
    tracing::debug!(
        "Grid search over {} columns (step={}, stop_loss={})",
        xs.len(),
        grid.step,
        stop_loss
    );

    let column_best: Vec<Option<OptimizationResult>> = xs
        .par_iter()
        .map(|&x| {
            let mut best: Option<OptimizationResult> = None;
            let mut j = 1u64;
            loop {
                let y = x + j as f64 * grid.step;
                if y > grid.y_range.1 {
                    break;
                }
                // x comes from a validated positive lattice, so this cannot fail
                let score = evaluate(store, x, y, stop_loss, include_flagged)?;
                let improved = match &best {
                    Some(current) => score.expected_value > current.best_value,
                    None => true,
                };
                if improved {
                    best = Some(OptimizationResult {
                        best_x: x,
                        best_y: y,
                        best_value: score.expected_value,
                        x_count: score.x_count,
                        y_count: score.y_count,
                    });
                }
                j += 1;
            }
            Ok(best)
        })
        .collect::<Result<_>>()?;

    let mut best = OptimizationResult::sentinel();
    for candidate in column_best.into_iter().flatten() {
        if candidate.best_value > best.best_value {
            best = candidate;
        }
    }
    Ok(best)
}

/// Evaluate every admissible cell of the grid, in ascending `(x, y)` order.
///
/// This is the raw surface the optimizer reduces; presentation layers
/// consume it for heatmaps and 3-D views.
pub fn sweep(
    store: &ObservationStore,
    grid: &SearchGrid,
    stop_loss: f64,
    include_flagged: bool,
) -> Result<Vec<GridCell>> {
    validate_grid(grid)?;
    init_rayon();

    let xs = lattice(grid.x_range.0, grid.x_range.1, grid.step);
    let columns: Vec<Vec<GridCell>> = xs
        .par_iter()
        .map(|&x| {
            let mut cells = Vec::new();
            let mut j = 1u64;
            loop {
                let y = x + j as f64 * grid.step;
                if y > grid.y_range.1 {
                    break;
                }
                let score = evaluate(store, x, y, stop_loss, include_flagged)?;
                cells.push(GridCell {
                    x,
                    y,
                    expected_value: score.expected_value,
                });
                j += 1;
            }
            Ok(cells)
        })
        .collect::<Result<_>>()?;

    Ok(columns.into_iter().flatten().collect())
}

/// Write an optimization result as pretty-printed JSON.
pub fn save_results_json(path: impl AsRef<Path>, result: &OptimizationResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)
        .map_err(|e| AnalyzerError::Data(format!("failed to serialize result: {e}")))?;
    std::fs::write(path.as_ref(), json)
        .map_err(|e| AnalyzerError::Data(format!("failed to write result: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use invest_data::Observation;

    fn store(values: &[f64]) -> ObservationStore {
        ObservationStore::from_observations(
            values
                .iter()
                .map(|&value| Observation {
                    value,
                    flagged: false,
                })
                .collect(),
        )
    }

    fn grid(x_min: f64, x_max: f64, y_max: f64, step: f64) -> SearchGrid {
        SearchGrid {
            x_range: (x_min, x_max),
            y_range: (x_min, y_max),
            step,
        }
    }

    #[test]
    fn test_finds_best_pair() {
        let s = store(&[100.0, 200.0, 300.0, 400.0]);
        let result = optimize(&s, &grid(100.0, 300.0, 400.0, 100.0), 0.3, false).unwrap();
        // (100, 200): rate 2/3, multiplier 2 -> 1.4333, the grid maximum
        assert_eq!(result.best_x, 100.0);
        assert_eq!(result.best_y, 200.0);
        assert_eq!(result.x_count, 3);
        assert_eq!(result.y_count, 2);
        assert!((result.best_value - 1.433_333).abs() < 1e-4);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let s = store(&[90.0, 110.0, 150.0, 220.0, 400.0, 750.0]);
        let g = grid(50.0, 700.0, 800.0, 50.0);
        let first = optimize(&s, &g, 0.3, false).unwrap();
        for _ in 0..5 {
            assert_eq!(optimize(&s, &g, 0.3, false).unwrap(), first);
        }
    }

    #[test]
    fn test_tie_break_prefers_smallest_x_then_y() {
        // No observation clears any threshold, so every cell scores exactly
        // stop_loss; the first cell in ascending (x, y) order must win.
        let s = store(&[5.0]);
        let result = optimize(&s, &grid(10.0, 30.0, 40.0, 10.0), 0.25, false).unwrap();
        assert_eq!(result.best_x, 10.0);
        assert_eq!(result.best_y, 20.0);
        assert_eq!(result.best_value, 0.25);
        assert_eq!(result.x_count, 0);
        assert_eq!(result.y_count, 0);
    }

    #[test]
    fn test_all_nonpositive_grid_returns_sentinel() {
        // Empty store with a negative stop loss scores every cell below zero
        let s = store(&[]);
        let result = optimize(&s, &grid(10.0, 30.0, 40.0, 10.0), -0.5, false).unwrap();
        assert_eq!(result, OptimizationResult::sentinel());
    }

    #[test]
    fn test_zero_scoring_grid_returns_sentinel() {
        let s = store(&[]);
        let result = optimize(&s, &grid(10.0, 30.0, 40.0, 10.0), 0.0, false).unwrap();
        assert_eq!(result, OptimizationResult::sentinel());
    }

    #[test]
    fn test_rejects_nonpositive_step() {
        let s = store(&[100.0]);
        for step in [0.0, -10.0, f64::NAN] {
            let err = optimize(&s, &grid(10.0, 30.0, 40.0, step), 0.3, false).unwrap_err();
            assert!(matches!(err, AnalyzerError::InvalidRange(_)));
        }
    }

    #[test]
    fn test_rejects_nonpositive_x_min() {
        let s = store(&[100.0]);
        let err = optimize(&s, &grid(0.0, 30.0, 40.0, 10.0), 0.3, false).unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidThreshold(_)));
    }

    #[test]
    fn test_grid_includes_exact_upper_bound() {
        let s = store(&[1_000.0]);
        let cells = sweep(&s, &grid(100.0, 300.0, 400.0, 100.0), 0.3, false).unwrap();
        // x_max and y_max are lattice points, so both must be visited
        assert!(cells.iter().any(|c| c.x == 300.0 && c.y == 400.0));
        // and nothing beyond the bounds appears
        assert!(cells.iter().all(|c| c.x <= 300.0 && c.y <= 400.0));
    }

    #[test]
    fn test_ragged_upper_bound_stops_below_max() {
        let s = store(&[1_000.0]);
        let cells = sweep(&s, &grid(100.0, 250.0, 260.0, 100.0), 0.3, false).unwrap();
        let max_x = cells.iter().map(|c| c.x).fold(f64::MIN, f64::max);
        assert_eq!(max_x, 200.0);
    }

    #[test]
    fn test_sweep_enumerates_y_strictly_above_x() {
        let s = store(&[1_000.0]);
        let cells = sweep(&s, &grid(100.0, 300.0, 400.0, 100.0), 0.3, false).unwrap();
        assert!(!cells.is_empty());
        assert!(cells.iter().all(|c| c.y > c.x));
    }

    #[test]
    fn test_sweep_is_canonically_ordered() {
        let s = store(&[1_000.0]);
        let cells = sweep(&s, &grid(100.0, 300.0, 400.0, 100.0), 0.3, false).unwrap();
        let pairs: Vec<(f64, f64)> = cells.iter().map(|c| (c.x, c.y)).collect();
        let mut sorted = pairs.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(pairs, sorted);
    }

    #[test]
    fn test_optimize_matches_sequential_sweep_maximum() {
        let s = store(&[120.0, 180.0, 240.0, 510.0, 990.0]);
        let g = grid(100.0, 900.0, 1_000.0, 100.0);
        let result = optimize(&s, &g, 0.3, false).unwrap();
        let cells = sweep(&s, &g, 0.3, false).unwrap();
        let mut best = (0.0, 0.0, 0.0);
        for c in &cells {
            if c.expected_value > best.2 {
                best = (c.x, c.y, c.expected_value);
            }
        }
        assert_eq!(result.best_x, best.0);
        assert_eq!(result.best_y, best.1);
        assert_eq!(result.best_value, best.2);
    }
}
