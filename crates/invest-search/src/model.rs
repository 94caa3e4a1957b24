use invest_core::{AnalyzerError, Result};
use invest_data::ObservationStore;

use crate::stats::survival_counts;

/// Linear gain/loss payoff: a success outcome worth `multiplier`, weighted by
/// the empirical success `rate`, against `stop_loss` on the remainder.
///
/// Total over all finite inputs; no clamping of out-of-range rates.
pub fn expected_value(stop_loss: f64, multiplier: f64, rate: f64) -> f64 {
    rate * multiplier + (1.0 - rate) * stop_loss
}

/// Score of a single threshold pair, with the survival counts backing it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairScore {
    pub expected_value: f64,
    pub x_count: usize,
    pub y_count: usize,
}

/// Score one threshold pair `(x, y)` against the store.
///
/// The success payoff is the ratio `y / x`, so `x` must be positive; a
/// non-positive `x` is rejected rather than letting an infinite or NaN
/// multiplier leak into downstream comparisons. On an empty store the rate
/// is zero and the score collapses to `stop_loss`.
pub fn evaluate(
    store: &ObservationStore,
    x: f64,
    y: f64,
    stop_loss: f64,
    include_flagged: bool,
) -> Result<PairScore> {
    if x <= 0.0 {
        return Err(AnalyzerError::InvalidThreshold(x));
    }
    let counts = survival_counts(store, x, y, include_flagged);
    let multiplier = y / x;
    Ok(PairScore {
        expected_value: expected_value(stop_loss, multiplier, counts.rate),
        x_count: counts.x_count,
        y_count: counts.y_count,
    })
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

    #[test]
    fn test_expected_value_boundary_identities() {
        for stop_loss in [-1.0, 0.0, 0.3, 2.0] {
            assert_eq!(expected_value(stop_loss, 1.0, 1.0), 1.0);
            for multiplier in [0.5, 1.0, 10.0] {
                assert_eq!(expected_value(stop_loss, multiplier, 0.0), stop_loss);
            }
        }
    }

    #[test]
    fn test_expected_value_interpolates() {
        let value = expected_value(0.3, 2.0, 2.0 / 3.0);
        assert!((value - 1.433_333).abs() < 1e-4);
    }

    #[test]
    fn test_evaluate_combines_rate_and_multiplier() {
        let s = store(&[100.0, 200.0, 300.0, 400.0]);
        let score = evaluate(&s, 150.0, 250.0, 0.3, false).unwrap();
        assert_eq!(score.x_count, 3);
        assert_eq!(score.y_count, 2);
        // rate 2/3, multiplier 250/150
        let expected = (2.0 / 3.0) * (250.0 / 150.0) + (1.0 / 3.0) * 0.3;
        assert!((score.expected_value - expected).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_rejects_zero_x() {
        let s = store(&[100.0]);
        let err = evaluate(&s, 0.0, 100.0, 0.3, false).unwrap_err();
        assert!(matches!(
            err,
            invest_core::AnalyzerError::InvalidThreshold(_)
        ));
    }

    #[test]
    fn test_evaluate_empty_store_returns_stop_loss() {
        let s = store(&[]);
        let score = evaluate(&s, 150.0, 250.0, 0.3, false).unwrap();
        assert_eq!(score.expected_value, 0.3);
        assert_eq!(score.x_count, 0);
        assert_eq!(score.y_count, 0);
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let s = store(&[100.0, 200.0, 300.0]);
        let first = evaluate(&s, 120.0, 260.0, 0.25, false).unwrap();
        let second = evaluate(&s, 120.0, 260.0, 0.25, false).unwrap();
        assert_eq!(first, second);
    }
}
