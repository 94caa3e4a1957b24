use invest_data::ObservationStore;

/// Survival counts for one threshold pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurvivalCounts {
    pub rate: f64,
    pub x_count: usize,
    pub y_count: usize,
}

/// Count observations strictly above each threshold and derive the empirical
/// rate at which an observation clearing `x` also clears `y`.
///
/// Comparisons are strict (`>`); the threshold value itself never counts.
/// When `include_flagged` is false the same flag filter applies to both
/// counts. `rate` is `0.0` by convention when nothing clears `x`.
pub fn survival_counts(
    store: &ObservationStore,
    x: f64,
    y: f64,
    include_flagged: bool,
) -> SurvivalCounts {
    let x_count = store.count_above(x, include_flagged);
    let y_count = store.count_above(y, include_flagged);
    let rate = if x_count > 0 {
        y_count as f64 / x_count as f64
    } else {
        0.0
    };
    SurvivalCounts {
        rate,
        x_count,
        y_count,
    }
}
