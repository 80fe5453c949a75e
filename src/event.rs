//! This module defines the per-event and per-run data consumed by the monitor

use crate::{momentum::FourVector, numeric::Float};
use nalgebra::Vector3;
use prefix_num_ops::real::*;
use std::collections::{HashMap, HashSet};

/// Identifier of a data product within an event (e.g. "pfMet")
pub type SourceTag = String;

/// Missing transverse energy object
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MissingEnergy {
    /// X component of the missing transverse momentum
    pub px: Float,

    /// Y component of the missing transverse momentum
    pub py: Float,

    /// Scalar sum of the transverse energy of the event
    pub sum_et: Float,

    /// MET significance
    pub significance: Float,
}
//
impl MissingEnergy {
    /// Build a missing energy object with no auxiliary information
    pub fn new(px: Float, py: Float) -> Self {
        Self {
            px,
            py,
            sum_et: 0.,
            significance: 0.,
        }
    }

    /// Magnitude of the missing transverse momentum
    pub fn pt(&self) -> Float {
        sqrt(self.px * self.px + self.py * self.py)
    }

    /// Azimuth of the missing transverse momentum
    pub fn phi(&self) -> Float {
        if self.px == 0. && self.py == 0. {
            0.
        } else {
            self.py.atan2(self.px)
        }
    }

    /// Missing momentum as a 3-vector, whose Z component is always zero
    pub fn momentum(&self) -> Vector3<Float> {
        Vector3::new(self.px, self.py, 0.)
    }
}

/// Reconstructed jet
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Jet {
    /// Jet 4-momentum
    pub p4: FourVector,
}
//
impl Jet {
    /// Build a jet from its 4-momentum
    pub fn new(p4: FourVector) -> Self {
        Self { p4 }
    }
}

/// Decision of the high level trigger for one event
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriggerResults {
    /// Names of the trigger paths which accepted the event
    pub fired: HashSet<String>,
}
//
impl TriggerResults {
    /// Check if a trigger path accepted the event
    ///
    /// A trailing `*` in the pattern stands for any version suffix, so that
    /// "HLT_PFMET120_v*" matches "HLT_PFMET120_v3".
    ///
    pub fn accepted(&self, pattern: &str) -> bool {
        self.fired.iter().any(|path| path_matches(pattern, path))
    }
}

/// Match a trigger path name against a pattern with an optional trailing `*`
pub fn path_matches(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => path.starts_with(prefix),
        None => path == pattern,
    }
}

/// Data of one collision event, as delivered by the hosting framework
///
/// Collections are looked up by source tag. A collection which is absent
/// from the event was not produced upstream, which is different from being
/// present but empty.
///
#[derive(Clone, Debug, Default)]
pub struct Event {
    /// Missing energy collections
    met: HashMap<SourceTag, Vec<MissingEnergy>>,

    /// Jet collections
    jets: HashMap<SourceTag, Vec<Jet>>,

    /// Bare 4-vector collections (e.g. razor hemispheres)
    four_vectors: HashMap<SourceTag, Vec<FourVector>>,

    /// Trigger decisions, keyed by process name (e.g. "HLT")
    trigger_results: HashMap<String, TriggerResults>,

    /// Detector partitions whose high voltage was on, if known
    dcs_on: Option<HashSet<i32>>,
}
//
impl Event {
    /// Start building an empty event
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a missing energy collection
    pub fn with_met(mut self, tag: &str, met: Vec<MissingEnergy>) -> Self {
        self.met.insert(tag.to_owned(), met);
        self
    }

    /// Attach a jet collection
    pub fn with_jets(mut self, tag: &str, jets: Vec<Jet>) -> Self {
        self.jets.insert(tag.to_owned(), jets);
        self
    }

    /// Attach a 4-vector collection
    pub fn with_four_vectors(mut self, tag: &str, vectors: Vec<FourVector>) -> Self {
        self.four_vectors.insert(tag.to_owned(), vectors);
        self
    }

    /// Attach the trigger decisions of some process
    pub fn with_trigger_results(mut self, process: &str, results: TriggerResults) -> Self {
        self.trigger_results.insert(process.to_owned(), results);
        self
    }

    /// Attach the detector control system status
    pub fn with_dcs_status(mut self, partitions_on: impl IntoIterator<Item = i32>) -> Self {
        self.dcs_on = Some(partitions_on.into_iter().collect());
        self
    }

    /// Look up a missing energy collection
    pub fn met(&self, tag: &str) -> Option<&[MissingEnergy]> {
        self.met.get(tag).map(Vec::as_slice)
    }

    /// Look up a jet collection
    pub fn jets(&self, tag: &str) -> Option<&[Jet]> {
        self.jets.get(tag).map(Vec::as_slice)
    }

    /// Look up a 4-vector collection
    pub fn four_vectors(&self, tag: &str) -> Option<&[FourVector]> {
        self.four_vectors.get(tag).map(Vec::as_slice)
    }

    /// Look up the trigger decisions of some process
    pub fn trigger_results(&self, process: &str) -> Option<&TriggerResults> {
        self.trigger_results.get(process)
    }

    /// Detector partitions with high voltage on, if the status is known
    pub fn dcs_status(&self) -> Option<&HashSet<i32>> {
        self.dcs_on.as_ref()
    }
}

/// Information about the run being processed
#[derive(Clone, Debug, Default)]
pub struct RunInfo {
    /// Run number
    pub number: u32,

    /// Names of all trigger paths of the run's trigger menu
    pub hlt_menu: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_empty_collections_differ() {
        let event = Event::new().with_jets("ak4PFJetsCHS", Vec::new());
        assert_eq!(event.jets("ak4PFJetsCHS").map(<[Jet]>::len), Some(0));
        assert!(event.jets("ak8PFJetsCHS").is_none());
        assert!(event.four_vectors("hemispheresDQM").is_none());
        assert!(event.dcs_status().is_none());
    }

    #[test]
    fn met_momentum_is_transverse() {
        let met = MissingEnergy::new(-30., 40.);
        assert_eq!(met.pt(), 50.);
        assert_eq!(met.momentum(), Vector3::new(-30., 40., 0.));
    }

    #[test]
    fn trigger_lookup() {
        let mut results = TriggerResults::default();
        results.fired.insert("HLT_PFHT1050_v1".to_owned());
        let event = Event::new().with_trigger_results("HLT", results);
        let hlt = event.trigger_results("HLT").unwrap();
        assert!(hlt.accepted("HLT_PFHT1050_v1"));
        assert!(!hlt.accepted("HLT_PFMET120_v1"));
        assert!(hlt.accepted("HLT_PFHT1050_v*"));
        assert!(!hlt.accepted("HLT_PFHT105_v*"));
        assert!(event.trigger_results("RECO").is_none());
    }
}
