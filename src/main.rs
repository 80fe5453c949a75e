//! Standalone razor monitoring run over toy events
//!
//! Usage: razor_monitor [config file] (default: razor.cfg)
//!
//! The efficiency histograms are written to razor.data, and the timings of the
//! run to razor.times, in the working directory.

use eyre::WrapErr;
use log::info;
use razor_monitor::{
    config::Configuration, evgen::EventGenerator, monitor::RazorMonitor, output,
    random::RandomGenerator, resacc::ResultsAccumulator, scheduling, Result,
};
use std::{path::Path, time::Instant};

/// This will act as our main function, with suitable error handling
fn main() -> Result<()> {
    // Logs go to stderr, at the info level unless RUST_LOG says otherwise
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // ### CONFIGURATION READOUT ###

    let cfg_path = std::env::args().nth(1).unwrap_or_else(|| "razor.cfg".to_owned());
    let cfg = Configuration::load(&cfg_path).wrap_err("Failed to load the configuration")?;

    // ### MONITORING INITIALIZATION ###

    // NOTE: The clock starts after configuration I/O, to avoid IO-induced
    //       timing fluctuations
    let saved_time = Instant::now();

    let evgen = EventGenerator::new(&cfg);
    let run = evgen.run_info();
    let mut monitor =
        RazorMonitor::new(cfg.monitor.clone()).wrap_err("Failed to set up the monitor")?;

    // Booking prepares the trigger flags for the run, and gives us the empty
    // histograms that each event batch starts from
    let booked = monitor.book_histograms(&run)?;
    info!("Booked histograms in {}", booked.folder);

    // ### MONITORING EXECUTION ###

    // This kernel generates and analyzes a number of events, given an initial
    // random number generator state, and returns the accumulated results
    let process_events = |num_events: usize, rng: &mut RandomGenerator| -> ResultsAccumulator {
        let mut accumulator = ResultsAccumulator::new(booked.clone());
        for _ in 0..num_events {
            let event = evgen.generate(rng);
            let outcome = monitor.analyze(&event, &mut accumulator.histograms);
            accumulator.outcomes.record(outcome);
        }
        accumulator
    };

    // Run the monitoring
    let result = scheduling::run_monitoring(cfg.num_events, cfg.seed, process_events);

    // ### RESULTS DISPLAY AND STORAGE ###

    let elapsed_time = saved_time.elapsed();
    output::dump_results(&cfg, &result, elapsed_time, Path::new("."))
        .wrap_err("Failed to output the results")?;
    Ok(())
}
