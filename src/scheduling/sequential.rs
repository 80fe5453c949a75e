//! Sequential back-end of the monitoring

use crate::{
    random::RandomGenerator,
    resacc::ResultsAccumulator,
    scheduling::batch_sizes,
};

/// Process events in sequential mode
///
/// Events go through the same batches as in multi-threaded mode, so that
/// both modes book and merge the same histograms.
///
pub fn run_monitoring_impl(
    num_events: usize,
    mut rng: RandomGenerator,
    process_events: impl Fn(usize, &mut RandomGenerator) -> ResultsAccumulator,
) -> ResultsAccumulator {
    batch_sizes(num_events)
        .map(|batch_size| process_events(batch_size, &mut rng))
        .reduce(|mut accumulator, batch| {
            accumulator.merge(batch);
            accumulator
        })
        .expect("There should be at least one batch")
}
