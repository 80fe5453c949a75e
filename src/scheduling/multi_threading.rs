//! Multi-threaded back-end of the monitoring

use crate::{
    random::RandomGenerator,
    resacc::ResultsAccumulator,
    scheduling::batch_sizes,
};
use rayon::prelude::*;

/// Process events in multi-threaded mode
///
/// The generator state of every batch is prepared up front, then batches are
/// processed in parallel and their results merged in batch order.
///
pub fn run_monitoring_impl(
    num_events: usize,
    mut rng: RandomGenerator,
    process_events: impl Send + Sync + Fn(usize, &mut RandomGenerator) -> ResultsAccumulator,
) -> ResultsAccumulator {
    let batches = batch_sizes(num_events)
        .map(|batch_size| {
            let batch_rng = rng.clone();

            // By default, each batch starts where the previous one would have
            // left the generator in a sequential run
            #[cfg(not(feature = "faster-threading"))]
            crate::evgen::EventGenerator::simulate_event_batch(&mut rng, batch_size);

            // Otherwise, batches get unrelated random streams, which is cheaper
            #[cfg(feature = "faster-threading")]
            rng.jump();

            (batch_size, batch_rng)
        })
        .collect::<Vec<_>>();

    // Histogram bins and outcome counts are integral sums, so the result does
    // not depend on how rayon groups the merges
    batches
        .into_par_iter()
        .map(|(batch_size, mut batch_rng)| process_events(batch_size, &mut batch_rng))
        .reduce_with(|mut accumulator, batch| {
            accumulator.merge(batch);
            accumulator
        })
        .expect("There should be at least one batch")
}
