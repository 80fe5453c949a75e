//! This module provides toy event generation facilities
//!
//! Generated events are not meant to be physically accurate, only to exercise
//! every path of the monitor in realistic proportions: a pair of roughly
//! back-to-back hemispheres, a handful of jets, some missing energy, and the
//! decisions of a reference trigger and of a razor trigger.

use crate::{
    config::Configuration,
    event::{Event, Jet, MissingEnergy, RunInfo, TriggerResults},
    momentum::FourVector,
    numeric::{reals::consts::PI, Float},
    random::RandomGenerator,
};
use prefix_num_ops::real::*;

/// Reference trigger path, firing independently of the event kinematics
pub const REFERENCE_PATH: &str = "HLT_Ele27_WPTight_Gsf_v1";

/// Razor trigger path, whose efficiency is to be measured
pub const RAZOR_PATH: &str = "HLT_RsqMR270_Rsq0p09_MR200_v1";

/// Maximal number of generated jets
const MAX_JETS: usize = 6;

/// Detector partitions, which are all reported to be on
const NUM_DCS_PARTITIONS: i32 = 36;

/// Number of random numbers consumed per event
///
/// Every event consumes the same amount of random numbers, whatever its
/// contents, so that the generator state can be advanced cheaply over a batch
/// of events (see simulate_event_batch).
///
const NUM_RANDOMS: usize = 2 + 2 * 4 + 1 + 3 * MAX_JETS + 2 + 2;

// Offsets of the various random parameters within the per-event array
const BAD_HEMISPHERES: usize = 0;
const BAD_HEMISPHERE_KIND: usize = 1;
const HEMISPHERES: usize = 2;
const NUM_JETS: usize = HEMISPHERES + 2 * 4;
const JETS: usize = NUM_JETS + 1;
const MET: usize = JETS + 3 * MAX_JETS;
const TRIGGERS: usize = MET + 2;

/// Generator of toy razor events
pub struct EventGenerator {
    /// Source tag of the generated missing energy
    met_tag: String,

    /// Source tag of the generated jets
    jets_tag: String,

    /// Source tag of the generated hemispheres
    hemispheres_tag: String,

    /// Processes under which trigger results are stored
    hlt_processes: Vec<String>,

    /// Probability for an event to have a broken hemisphere collection
    bad_hemisphere_rate: Float,

    /// Number of the generated run
    run_number: u32,
}
//
impl EventGenerator {
    /// Initialize event generation, producing the collections which the
    /// monitor is configured to look for
    pub fn new(cfg: &Configuration) -> Self {
        let mon = &cfg.monitor;
        let mut hlt_processes = vec![
            mon.num_trigger.hlt_process().to_owned(),
            mon.den_trigger.hlt_process().to_owned(),
        ];
        hlt_processes.dedup();
        Self {
            met_tag: mon.met_tag.clone(),
            jets_tag: mon.jets_tag.clone(),
            hemispheres_tag: mon.hemispheres_tag.clone(),
            hlt_processes,
            bad_hemisphere_rate: cfg.bad_hemisphere_rate,
            run_number: cfg.run_number,
        }
    }

    /// Description of the generated run
    pub fn run_info(&self) -> RunInfo {
        RunInfo {
            number: self.run_number,
            hlt_menu: vec![REFERENCE_PATH.to_owned(), RAZOR_PATH.to_owned()],
        }
    }

    /// Generate a toy event
    pub fn generate(&self, rng: &mut RandomGenerator) -> Event {
        let r = rng.random_array::<NUM_RANDOMS>();

        // Hemispheres are generated back-to-back, up to some smearing
        let mut hemispheres = Vec::with_capacity(2);
        let mut phi = 2. * PI * r[HEMISPHERES + 2];
        for params in r[HEMISPHERES..NUM_JETS].chunks_exact(4) {
            let pt = 50. - 250. * ln(1. - params[0]);
            let eta = 2.4 * (2. * params[1] - 1.);
            let mass = 100. * params[3];
            hemispheres.push(FourVector::from_pt_eta_phi_m(pt, eta, phi, mass));
            phi += PI + 1.5 * (2. * params[2] - 1.);
        }
        let sum_pt = hemispheres.iter().map(FourVector::pt).sum::<Float>();

        // Some events get a broken hemisphere collection, either empty (too
        // many jets to cluster) or of unexpected size
        if r[BAD_HEMISPHERES] < self.bad_hemisphere_rate {
            let kind = r[BAD_HEMISPHERE_KIND];
            if kind < 0.5 {
                hemispheres.clear();
            } else {
                let extra = if kind < 0.75 { 1 } else { 2 };
                hemispheres.extend(hemispheres.clone().into_iter().take(extra));
            }
        }

        // Jets
        let num_jets = ((MAX_JETS + 1) as Float * r[NUM_JETS]) as usize;
        let jets = r[JETS..MET]
            .chunks_exact(3)
            .take(num_jets.min(MAX_JETS))
            .map(|params| {
                let pt = 20. - 120. * ln(1. - params[0]);
                let eta = 4.7 * (2. * params[1] - 1.);
                let phi = 2. * PI * params[2];
                Jet::new(FourVector::from_pt_eta_phi_m(pt, eta, phi, 0.1 * pt))
            })
            .collect();

        // Missing energy
        let met_pt = -100. * ln(1. - r[MET]);
        let met_phi = 2. * PI * r[MET + 1];
        let met = MissingEnergy {
            px: met_pt * cos(met_phi),
            py: met_pt * sin(met_phi),
            sum_et: sum_pt + met_pt,
            significance: met_pt / sqrt(sum_pt + met_pt + 1.),
        };

        // The reference trigger fires at random, the razor trigger follows a
        // smooth turn-on in the hemisphere transverse momentum
        let mut results = TriggerResults::default();
        if r[TRIGGERS] < 0.5 {
            results.fired.insert(REFERENCE_PATH.to_owned());
        }
        let razor_efficiency = 1. / (1. + exp(-(sum_pt - 400.) / 50.));
        if r[TRIGGERS + 1] < razor_efficiency {
            results.fired.insert(RAZOR_PATH.to_owned());
        }

        // Assemble the event
        let mut event = Event::new()
            .with_met(&self.met_tag, vec![met])
            .with_jets(&self.jets_tag, jets)
            .with_four_vectors(&self.hemispheres_tag, hemispheres)
            .with_dcs_status(0..NUM_DCS_PARTITIONS);
        for process in &self.hlt_processes {
            event = event.with_trigger_results(process, results.clone());
        }
        event
    }

    /// Advance an RNG as N calls to `generate()` would
    ///
    /// Relies on `generate()` drawing exactly NUM_RANDOMS numbers per event.
    ///
    #[cfg(all(feature = "multi-threading", not(feature = "faster-threading")))]
    pub fn simulate_event_batch(rng: &mut RandomGenerator, num_events: usize) {
        for _ in 0..num_events {
            rng.skip_array::<NUM_RANDOMS>();
        }
    }
}
