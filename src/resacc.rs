//! This module allows integrating monitoring results across processed events

use crate::{
    histogram::RazorHistograms,
    monitor::{Outcome, Stage},
};
use std::collections::BTreeMap;

/// Number of events which reached each terminal processing state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutcomeCounts(BTreeMap<Outcome, usize>);
//
impl OutcomeCounts {
    /// Record the outcome of one event
    pub fn record(&mut self, outcome: Outcome) {
        *self.0.entry(outcome).or_default() += 1;
    }

    /// Number of events with a given outcome
    pub fn count(&self, outcome: Outcome) -> usize {
        self.0.get(&outcome).copied().unwrap_or(0)
    }

    /// Number of events rejected at a given stage
    pub fn rejected(&self, stage: Stage) -> usize {
        self.count(Outcome::Rejected(stage))
    }

    /// Number of events which entered the denominator histograms
    pub fn denominator(&self) -> usize {
        self.count(Outcome::Filled { numerator: false }) + self.numerator()
    }

    /// Number of events which entered the numerator histograms
    pub fn numerator(&self) -> usize {
        self.count(Outcome::Filled { numerator: true })
    }

    /// Total number of recorded events
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Iterate over the outcomes which occurred, in a stable order
    pub fn iter(&self) -> impl Iterator<Item = (Outcome, usize)> + '_ {
        self.0.iter().map(|(&outcome, &count)| (outcome, count))
    }

    /// Integrate the counts of another run fragment
    pub fn merge(&mut self, other: &Self) {
        for (outcome, count) in other.iter() {
            *self.0.entry(outcome).or_default() += count;
        }
    }
}

/// This struct accumulates the monitoring results of a batch of events
#[derive(Clone, Debug)]
pub struct ResultsAccumulator {
    /// Efficiency histograms
    pub histograms: RazorHistograms,

    /// Fate of the processed events
    pub outcomes: OutcomeCounts,
}
//
impl ResultsAccumulator {
    /// Prepare for results accumulation into freshly booked histograms
    pub fn new(histograms: RazorHistograms) -> Self {
        Self {
            histograms,
            outcomes: OutcomeCounts::default(),
        }
    }

    /// Number of events which went through the monitor
    pub fn processed_events(&self) -> usize {
        self.outcomes.total()
    }

    /// Integrate monitoring results from another ResultsAccumulator
    #[allow(clippy::needless_pass_by_value)]
    pub fn merge(&mut self, other: Self) {
        self.histograms.merge(other.histograms);
        self.outcomes.merge(&other.outcomes);
    }
}
