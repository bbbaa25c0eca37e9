use crate::models::metrics::TIME_TAKEN_IN_SECONDS;
use crate::models::{AggregateRecord, MetricStats, MetricTable};

/// Sum every metric across all providers and models into network totals.
///
/// Per-model time is dropped; the record's elapsed field is `elapsed_seconds`.
pub fn aggregate(table: &MetricTable, elapsed_seconds: f64) -> AggregateRecord {
    let mut totals = MetricStats::new();

    for (_, _, stats) in table.entries() {
        for (metric, value) in stats.iter() {
            if metric != TIME_TAKEN_IN_SECONDS {
                totals.add(metric, value);
            }
        }
    }

    AggregateRecord::new(totals, elapsed_seconds)
}
