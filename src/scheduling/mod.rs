//! This module takes care of scheduling the monitoring work, encapsulating use
//! of multiple threads and anything else that will come in the future

#[cfg(feature = "multi-threading")]
mod multi_threading;
#[cfg(not(feature = "multi-threading"))]
mod sequential;

use crate::{random::RandomGenerator, resacc::ResultsAccumulator};

/// Size of the processed event batches
///
/// Events are grouped in batches of a certain size, each of which fills its
/// own set of histograms. Sequential and parallel runs go through the same
/// batches, and thus produce the exact same results.
///
const EVENT_BATCH_SIZE: usize = 10_000;

/// Sizes of the successive event batches, only the last of which can be
/// partially filled
fn batch_sizes(num_events: usize) -> impl Iterator<Item = usize> {
    (0..num_events)
        .step_by(EVENT_BATCH_SIZE)
        .map(move |first_event| EVENT_BATCH_SIZE.min(num_events - first_event))
}

/// Run the monitoring in the manner that was configured at build time.
///
/// Takes as parameters the total number of events to be processed, the seed
/// of the event generator, and a kernel that generates and analyzes a certain
/// number of events given an initial random number generator state.
///
/// Returns the merged monitoring results
///
pub fn run_monitoring(
    num_events: usize,
    seed: u64,
    process_events: impl Send + Sync + Fn(usize, &mut RandomGenerator) -> ResultsAccumulator,
) -> ResultsAccumulator {
    // Check that the user is being reasonable (should have already been checked
    // at configuration time, but bugs can happen...)
    assert!(num_events > 0, "Must process at least one event");
    let rng = RandomGenerator::new(seed);

    #[cfg(not(feature = "multi-threading"))]
    {
        sequential::run_monitoring_impl(num_events, rng, process_events)
    }

    #[cfg(feature = "multi-threading")]
    {
        multi_threading::run_monitoring_impl(num_events, rng, process_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Configuration,
        evgen::EventGenerator,
        histogram::{RazorBinning, RazorHistograms},
        monitor::{MonitorConfig, Outcome, RazorMonitor, Stage},
    };

    #[test]
    fn batches_cover_every_event() {
        assert_eq!(batch_sizes(1).collect::<Vec<_>>(), [1]);
        assert_eq!(
            batch_sizes(EVENT_BATCH_SIZE).collect::<Vec<_>>(),
            [EVENT_BATCH_SIZE]
        );
        assert_eq!(
            batch_sizes(2 * EVENT_BATCH_SIZE + 7).collect::<Vec<_>>(),
            [EVENT_BATCH_SIZE, EVENT_BATCH_SIZE, 7]
        );
    }

    #[test]
    fn every_event_is_processed_once() {
        let num_events = 2 * EVENT_BATCH_SIZE + 123;
        let result = run_monitoring(num_events, 1, |batch_size, rng| {
            let histograms = RazorHistograms::book("f", &RazorBinning::default()).unwrap();
            let mut acc = ResultsAccumulator::new(histograms);
            for _ in 0..batch_size {
                rng.random();
                acc.outcomes.record(Outcome::Rejected(Stage::MissingMet));
            }
            acc
        });
        assert_eq!(result.processed_events(), num_events);
    }

    #[cfg(not(feature = "faster-threading"))]
    #[test]
    fn batched_run_matches_a_single_pass() {
        let cfg = Configuration {
            num_events: 2 * EVENT_BATCH_SIZE + 123,
            bad_hemisphere_rate: 0.05,
            monitor: MonitorConfig {
                njets: 1,
                ..MonitorConfig::default()
            },
            ..Configuration::default()
        };
        let evgen = EventGenerator::new(&cfg);
        let mut monitor = RazorMonitor::new(cfg.monitor.clone()).unwrap();
        let histograms = monitor.book_histograms(&evgen.run_info()).unwrap();
        let monitor = &monitor;
        let process_events = |num_events: usize, rng: &mut RandomGenerator| {
            let mut acc = ResultsAccumulator::new(histograms.clone());
            for _ in 0..num_events {
                let event = evgen.generate(rng);
                let outcome = monitor.analyze(&event, &mut acc.histograms);
                acc.outcomes.record(outcome);
            }
            acc
        };

        let batched = run_monitoring(cfg.num_events, cfg.seed, &process_events);
        let single_pass = process_events(cfg.num_events, &mut RandomGenerator::new(cfg.seed));
        assert!(single_pass.outcomes.denominator() > 0);
        assert_eq!(batched.outcomes, single_pass.outcomes);
        assert_eq!(batched.histograms, single_pass.histograms);
    }
}
