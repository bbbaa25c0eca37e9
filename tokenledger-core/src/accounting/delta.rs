use crate::models::{MetricStats, MetricTable};

/// Usage since `previous`, for every (provider, model, metric) in `cumulative`.
///
/// Metrics missing from `previous` use a 0 baseline, so a model seen for the
/// first time reports its full cumulative value.
pub fn compute_delta(cumulative: &MetricTable, previous: &MetricTable) -> MetricTable {
    let mut delta = MetricTable::new();

    for (provider, model, stats) in cumulative.entries() {
        let baseline = previous.model(provider, model);
        let iteration: MetricStats = stats
            .iter()
            .map(|(metric, value)| {
                let prior = baseline.and_then(|b| b.get(metric)).unwrap_or(0.0);
                (metric, value - prior)
            })
            .collect();
        delta.insert_model(provider, model, iteration);
    }

    delta
}
