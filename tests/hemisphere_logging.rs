//! Anomalous hemisphere collections must be reported on the monitor's log
//! channel. This lives in its own test binary since the logger is global.

use log::{Level, LevelFilter, Log, Metadata, Record};
use razor_monitor::{
    event::{Event, Jet, MissingEnergy, RunInfo},
    momentum::FourVector,
    monitor::{MonitorConfig, Outcome, RazorMonitor, Stage, LOG_TARGET},
};
use std::sync::Mutex;

/// Logger which keeps every record in memory
struct CaptureLogger {
    records: Mutex<Vec<(Level, String, String)>>,
}
//
impl CaptureLogger {
    /// Extract the records logged so far
    fn take(&self) -> Vec<(Level, String, String)> {
        std::mem::take(&mut *self.records.lock().unwrap())
    }
}
//
impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.records.lock().unwrap().push((
            record.level(),
            record.target().to_owned(),
            record.args().to_string(),
        ));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger {
    records: Mutex::new(Vec::new()),
};

#[test]
fn rejected_hemisphere_collections_are_logged() {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let cfg = MonitorConfig {
        njets: 1,
        ..MonitorConfig::default()
    };
    let mut monitor = RazorMonitor::new(cfg).unwrap();
    let mut histos = monitor.book_histograms(&RunInfo::default()).unwrap();
    let event = |hemispheres: Vec<FourVector>| {
        let jet = Jet::new(FourVector::from_pt_eta_phi_m(150., 0.3, -2., 12.));
        Event::new()
            .with_met("pfMet", vec![MissingEnergy::new(-120., -90.)])
            .with_jets("ak4PFJetsCHS", vec![jet])
            .with_four_vectors("hemispheresDQM", hemispheres)
    };
    LOGGER.take();

    for size in 0..=12 {
        // The golden hemisphere pair passes the offline cuts
        let mut hemispheres = vec![
            FourVector::new(360., 480., 150., 800.),
            FourVector::new(-48., 14., 20., 70.),
        ];
        hemispheres.resize(size.max(2), FourVector::new(1., 1., 1., 2.));
        hemispheres.truncate(size);
        let outcome = monitor.analyze(&event(hemispheres), &mut histos);
        let records = LOGGER.take();
        match size {
            2 | 5 | 10 => {
                assert!(matches!(outcome, Outcome::Filled { .. }));
                assert!(records.is_empty(), "Size {} logged {:?}", size, records);
            }
            _ => {
                assert!(matches!(outcome, Outcome::Rejected(_)));
                assert_eq!(records.len(), 1, "Size {} logged {:?}", size, records);
                let (level, target, message) = &records[0];
                assert_eq!(*level, Level::Error);
                assert_eq!(target, LOG_TARGET);
                assert_eq!(target, "DQM_HLT_Razor");
                if size == 0 {
                    assert!(message.contains("too many jets"));
                } else {
                    assert!(message.contains(&format!("size() = {}", size)));
                }
            }
        }
    }

    // An absent collection is not an anomaly of the hemisphere maker
    let no_hemispheres = Event::new()
        .with_met("pfMet", vec![MissingEnergy::new(-120., -90.)])
        .with_jets(
            "ak4PFJetsCHS",
            vec![Jet::new(FourVector::from_pt_eta_phi_m(150., 0.3, -2., 12.))],
        );
    assert_eq!(
        monitor.analyze(&no_hemispheres, &mut histos),
        Outcome::Rejected(Stage::MissingHemispheres)
    );
    assert!(LOGGER.take().is_empty());
}
