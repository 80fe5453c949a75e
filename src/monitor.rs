//! Razor trigger efficiency monitor
//!
//! The efficiency of razor triggers is measured in events selected by an
//! orthogonal reference trigger, as a function of the razor variables M_R
//! and R². dPhi_R, which is used offline to reject QCD and detector-related
//! missing energy tails, is monitored as well.
//!
//! Each event goes through the following sequence of checks, any of which can
//! reject it. Events which survive the offline cuts enter the denominator
//! histograms, and also enter the numerator histograms if they pass the
//! trigger under study.

use crate::{
    event::{Event, Jet, MissingEnergy, RunInfo, SourceTag},
    histogram::{RazorBinning, RazorHistograms, Side},
    numeric::Float,
    razor::RazorVariables,
    selection::Selection,
    trigger::{GenericTriggerFlag, TriggerFlag, TriggerFlagConfig},
    Result,
};
use eyre::{ensure, WrapErr};
use log::error;

/// Logging target of per-event anomalies
pub const LOG_TARGET: &str = "DQM_HLT_Razor";

/// Configuration of the razor monitor
#[derive(Clone, Debug, PartialEq)]
pub struct MonitorConfig {
    /// Folder in which histograms are booked
    pub folder_name: String,

    /// Source of the missing energy collection
    pub met_tag: SourceTag,

    /// Source of the jet collection
    pub jets_tag: SourceTag,

    /// Source of the razor hemisphere collection
    pub hemispheres_tag: SourceTag,

    /// Selection applied to the missing energy object
    pub met_selection: String,

    /// Selection applied to jets before counting them
    pub jet_selection: String,

    /// Minimal number of selected jets
    pub njets: usize,

    /// Offline cut on R²
    pub rsq_cut: Float,

    /// Offline cut on M_R (GeV)
    pub mr_cut: Float,

    /// Histogram binning
    pub binning: RazorBinning,

    /// Trigger flag deciding which events enter the numerator
    pub num_trigger: TriggerFlagConfig,

    /// Trigger flag deciding which events enter the denominator
    pub den_trigger: TriggerFlagConfig,
}
//
impl Default for MonitorConfig {
    /// Settings of the 2016 offline selection
    fn default() -> Self {
        Self {
            folder_name: "HLT/SUSY/Razor".to_owned(),
            met_tag: "pfMet".to_owned(),
            jets_tag: "ak4PFJetsCHS".to_owned(),
            hemispheres_tag: "hemispheresDQM".to_owned(),
            met_selection: "pt > 0".to_owned(),
            jet_selection: "pt > 80".to_owned(),
            njets: 2,
            rsq_cut: 0.15,
            mr_cut: 300.,
            binning: RazorBinning::default(),
            num_trigger: TriggerFlagConfig::default(),
            den_trigger: TriggerFlagConfig::default(),
        }
    }
}
//
impl MonitorConfig {
    /// Check that the configuration makes sense
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.folder_name.is_empty(), "The histogram folder must be named");
        ensure!(self.rsq_cut.is_finite(), "The R² cut must be finite");
        ensure!(self.mr_cut.is_finite(), "The M_R cut must be finite");
        Selection::<MissingEnergy>::parse(&self.met_selection)
            .wrap_err("Invalid MET selection")?;
        Selection::<Jet>::parse(&self.jet_selection).wrap_err("Invalid jet selection")?;
        RazorHistograms::book(&self.folder_name, &self.binning)?;
        self.num_trigger
            .validate()
            .wrap_err("Invalid numerator trigger flag")?;
        self.den_trigger
            .validate()
            .wrap_err("Invalid denominator trigger flag")?;
        Ok(())
    }
}

/// Processing step at which an event was rejected
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Stage {
    /// Rejected by the denominator trigger flag, before any selection
    DenominatorTrigger,

    /// The missing energy collection is absent or empty
    MissingMet,

    /// The missing energy object failed its selection
    MetSelection,

    /// Not enough jets, before or after the jet selection
    TooFewJets,

    /// The hemisphere collection was not produced
    MissingHemispheres,

    /// The hemisphere collection is empty (too many jets to cluster)
    NoHemispheres,

    /// The hemisphere collection has an unexpected size
    InvalidHemispheres,

    /// Both M_R and R² are below their offline cuts
    OfflineCut,

    /// Rejected by the denominator trigger flag, after the offline selection
    DenominatorTriggerRecheck,
}

/// Terminal state of the processing of one event
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Outcome {
    /// The event did not touch any histogram
    Rejected(Stage),

    /// The event entered the denominator histograms, and the numerator ones
    /// if the numerator trigger flag accepted it
    Filled {
        /// Truth that the numerator histograms were filled as well
        numerator: bool,
    },
}

/// Razor trigger efficiency monitor
pub struct RazorMonitor {
    /// Configuration of the monitor
    cfg: MonitorConfig,

    /// Compiled MET selection
    met_selection: Selection<MissingEnergy>,

    /// Compiled jet selection
    jet_selection: Selection<Jet>,

    /// Trigger flag of the numerator
    num_flag: Box<dyn TriggerFlag>,

    /// Trigger flag of the denominator
    den_flag: Box<dyn TriggerFlag>,
}
//
impl RazorMonitor {
    /// Set up the monitor, with trigger flags built from the configuration
    pub fn new(cfg: MonitorConfig) -> Result<Self> {
        let num_flag = GenericTriggerFlag::new(cfg.num_trigger.clone())
            .wrap_err("Invalid numerator trigger flag")?;
        let den_flag = GenericTriggerFlag::new(cfg.den_trigger.clone())
            .wrap_err("Invalid denominator trigger flag")?;
        Self::with_flags(cfg, Box::new(num_flag), Box::new(den_flag))
    }

    /// Set up the monitor with externally provided trigger flags
    ///
    /// The trigger flag sections of the configuration are then ignored.
    ///
    pub fn with_flags(
        cfg: MonitorConfig,
        num_flag: Box<dyn TriggerFlag>,
        den_flag: Box<dyn TriggerFlag>,
    ) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            met_selection: Selection::parse(&cfg.met_selection)?,
            jet_selection: Selection::parse(&cfg.jet_selection)?,
            cfg,
            num_flag,
            den_flag,
        })
    }

    /// Book the histograms of a new run and prepare the trigger flags for it
    ///
    /// Must be called before any event of the run is analyzed.
    ///
    pub fn book_histograms(&mut self, run: &RunInfo) -> Result<RazorHistograms> {
        let histograms = RazorHistograms::book(&self.cfg.folder_name, &self.cfg.binning)?;
        if self.num_flag.on() {
            self.num_flag.init_run(run);
        }
        if self.den_flag.on() {
            self.den_flag.init_run(run);
        }
        Ok(histograms)
    }

    /// Truth that the denominator trigger flag rejects an event
    fn denominator_rejects(&self, event: &Event) -> bool {
        self.den_flag.on() && !self.den_flag.accept(event)
    }

    /// Process one event, filling the histograms as appropriate
    pub fn analyze(&self, event: &Event, histograms: &mut RazorHistograms) -> Outcome {
        use Outcome::Rejected;
        let cfg = &self.cfg;

        // Filter out events if trigger filtering is requested
        if self.denominator_rejects(event) {
            return Rejected(Stage::DenominatorTrigger);
        }

        // Only the first missing energy object is used
        let Some(met) = event.met(&cfg.met_tag).and_then(<[MissingEnergy]>::first) else {
            return Rejected(Stage::MissingMet);
        };
        if !self.met_selection.accepts(met) {
            return Rejected(Stage::MetSelection);
        }

        // Require enough good jets. An absent collection counts as empty.
        let jets = event.jets(&cfg.jets_tag).unwrap_or(&[]);
        if jets.len() < cfg.njets {
            return Rejected(Stage::TooFewJets);
        }
        let num_good_jets = jets
            .iter()
            .filter(|jet| self.jet_selection.accepts(jet))
            .count();
        if num_good_jets < cfg.njets {
            return Rejected(Stage::TooFewJets);
        }

        // Razor hemispheres from the previous clustering step
        let Some(hemispheres) = event.four_vectors(&cfg.hemispheres_tag) else {
            return Rejected(Stage::MissingHemispheres);
        };
        match hemispheres.len() {
            // The hemisphere maker produces an empty collection if there are
            // too many jets, and the trigger then accepts the event anyway
            0 => {
                error!(
                    target: LOG_TARGET,
                    "Cannot calculate M_R and R^2 because there are too many jets! \
                     (trigger passed automatically without forming the hemispheres)"
                );
                return Rejected(Stage::NoHemispheres);
            }
            // 2 hemispheres without muons, 5 or 10 with one or two muons
            2 | 5 | 10 => {}
            size => {
                error!(
                    target: LOG_TARGET,
                    "Invalid hemisphere collection!  hemispheres->size() = {}", size
                );
                return Rejected(Stage::InvalidHemispheres);
            }
        }

        // Compute the razor variables from the two leading hemispheres
        let vars = RazorVariables::compute(&hemispheres[0], &hemispheres[1], &met.momentum());

        // Apply the offline selection cuts
        if vars.rsq < cfg.rsq_cut && vars.mr < cfg.mr_cut {
            return Rejected(Stage::OfflineCut);
        }

        // Check the denominator trigger flag again, it could be stateful
        if self.denominator_rejects(event) {
            return Rejected(Stage::DenominatorTriggerRecheck);
        }
        self.fill(Side::Denominator, &vars, histograms);

        // Select the events of the numerator
        if self.num_flag.on() && !self.num_flag.accept(event) {
            return Outcome::Filled { numerator: false };
        }
        self.fill(Side::Numerator, &vars, histograms);
        Outcome::Filled { numerator: true }
    }

    /// Fill one side of the histograms with an event's razor variables
    fn fill(&self, side: Side, vars: &RazorVariables, histograms: &mut RazorHistograms) {
        // M_R is only monitored above the R² cut, and vice versa
        if vars.rsq >= self.cfg.rsq_cut {
            histograms.mr.get_mut(side).fill(vars.mr);
        }
        if vars.mr >= self.cfg.mr_cut {
            histograms.rsq.get_mut(side).fill(vars.rsq);
        }
        histograms.dphi_r.get_mut(side).fill(vars.dphi_r);
        histograms.mr_vs_rsq.get_mut(side).fill(vars.mr, vars.rsq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{histogram::Histogram, momentum::FourVector};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Trigger flag which accepts its first N evaluations
    struct Countdown {
        remaining: Arc<AtomicUsize>,
    }
    //
    impl TriggerFlag for Countdown {
        fn on(&self) -> bool {
            true
        }

        fn accept(&self, _event: &Event) -> bool {
            self.remaining
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
                .is_ok()
        }
    }

    fn off() -> Box<dyn TriggerFlag> {
        Box::new(GenericTriggerFlag::new(TriggerFlagConfig::default()).unwrap())
    }

    fn good_event() -> Event {
        let jet = Jet::new(FourVector::from_pt_eta_phi_m(200., 0.5, 1., 10.));
        Event::new()
            .with_met("pfMet", vec![MissingEnergy::new(-150., 20.)])
            .with_jets("ak4PFJetsCHS", vec![jet, jet])
            .with_four_vectors(
                "hemispheresDQM",
                vec![
                    FourVector::new(600., 0., 100., 620.),
                    FourVector::new(-300., 150., -200., 400.),
                ],
            )
    }

    #[test]
    fn default_config_is_valid() {
        assert!(MonitorConfig::default().validate().is_ok());
        let bad = MonitorConfig {
            jet_selection: "sumEt > 3".to_owned(),
            ..MonitorConfig::default()
        };
        assert!(RazorMonitor::new(bad).is_err());
    }

    #[test]
    fn full_event_fills_both_sides() {
        let mut monitor = RazorMonitor::new(MonitorConfig::default()).unwrap();
        let mut histos = monitor.book_histograms(&RunInfo::default()).unwrap();
        let outcome = monitor.analyze(&good_event(), &mut histos);
        assert_eq!(outcome, Outcome::Filled { numerator: true });
        assert_eq!(histos.dphi_r.denominator.entries(), 1);
        assert_eq!(histos.dphi_r.numerator.entries(), 1);
        assert_eq!(histos.mr_vs_rsq.numerator.entries(), 1);
    }

    #[test]
    fn missing_or_empty_met_is_skipped() {
        let monitor = RazorMonitor::new(MonitorConfig::default()).unwrap();
        let mut histos = RazorHistograms::book("f", &RazorBinning::default()).unwrap();
        let no_met = good_event().with_met("pfMet", Vec::new());
        assert_eq!(
            monitor.analyze(&no_met, &mut histos),
            Outcome::Rejected(Stage::MissingMet)
        );
        let mut cfg = MonitorConfig::default();
        cfg.met_tag = "caloMet".to_owned();
        let monitor = RazorMonitor::new(cfg).unwrap();
        assert_eq!(
            monitor.analyze(&good_event(), &mut histos),
            Outcome::Rejected(Stage::MissingMet)
        );
        assert_eq!(histos.dphi_r.denominator.entries(), 0);
    }

    #[test]
    fn jet_requirements() {
        let monitor = RazorMonitor::new(MonitorConfig::default()).unwrap();
        let mut histos = RazorHistograms::book("f", &RazorBinning::default()).unwrap();
        let soft = Jet::new(FourVector::from_pt_eta_phi_m(50., 0., 0., 1.));
        let hard = Jet::new(FourVector::from_pt_eta_phi_m(100., 0., 0., 1.));
        for jets in [vec![], vec![hard], vec![hard, soft, soft]] {
            let event = good_event().with_jets("ak4PFJetsCHS", jets);
            assert_eq!(
                monitor.analyze(&event, &mut histos),
                Outcome::Rejected(Stage::TooFewJets)
            );
        }
        let no_jets = good_event().with_jets("ak4PFJetsCHS", Vec::new());
        assert_eq!(
            monitor.analyze(&no_jets, &mut histos),
            Outcome::Rejected(Stage::TooFewJets)
        );
    }

    #[test]
    fn denominator_flag_is_checked_twice() {
        let remaining = Arc::new(AtomicUsize::new(1));
        let den = Box::new(Countdown {
            remaining: remaining.clone(),
        });
        let monitor = RazorMonitor::with_flags(MonitorConfig::default(), off(), den).unwrap();
        let mut histos = RazorHistograms::book("f", &RazorBinning::default()).unwrap();
        assert_eq!(
            monitor.analyze(&good_event(), &mut histos),
            Outcome::Rejected(Stage::DenominatorTriggerRecheck)
        );
        assert_eq!(histos.dphi_r.denominator.entries(), 0);

        remaining.store(2, Ordering::Relaxed);
        assert_eq!(
            monitor.analyze(&good_event(), &mut histos),
            Outcome::Filled { numerator: true }
        );
        assert_eq!(
            monitor.analyze(&good_event(), &mut histos),
            Outcome::Rejected(Stage::DenominatorTrigger)
        );
    }

    #[test]
    fn numerator_flag_only_gates_the_numerator() {
        let num = Box::new(Countdown {
            remaining: Arc::new(AtomicUsize::new(0)),
        });
        let monitor = RazorMonitor::with_flags(MonitorConfig::default(), num, off()).unwrap();
        let mut histos = RazorHistograms::book("f", &RazorBinning::default()).unwrap();
        assert_eq!(
            monitor.analyze(&good_event(), &mut histos),
            Outcome::Filled { numerator: false }
        );
        assert_eq!(histos.mr_vs_rsq.denominator.entries(), 1);
        assert_eq!(histos.mr_vs_rsq.numerator.entries(), 0);
    }
}
