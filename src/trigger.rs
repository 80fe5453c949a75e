//! Trigger-based event filtering
//!
//! The monitor decides whether an event enters the numerator and denominator
//! histograms using two independent trigger flags. A trigger flag which is
//! switched off accepts every event. Host frameworks can provide their own
//! flags through the TriggerFlag trait, GenericTriggerFlag is the
//! configuration-driven implementation used by default.

use crate::{
    event::{path_matches, Event, RunInfo},
    Result,
};
use eyre::ensure;
use log::{debug, warn};

/// Boolean event filter with an on/off switch
pub trait TriggerFlag: Send + Sync {
    /// Truth that this flag filters anything at all
    fn on(&self) -> bool;

    /// Decide whether an event passes the filter
    fn accept(&self, event: &Event) -> bool;

    /// Prepare for processing a new run
    fn init_run(&mut self, _run: &RunInfo) {}
}

/// Configuration of a GenericTriggerFlag
#[derive(Clone, Debug, PartialEq)]
pub struct TriggerFlagConfig {
    /// Combine the DCS and HLT decisions with OR (true) or AND (false)
    pub and_or: bool,

    /// Source of the detector control system status (kept for reference)
    pub dcs_input_tag: String,

    /// DCS partitions which must have their high voltage on
    pub dcs_partitions: Vec<i32>,

    /// Combine the DCS partitions with OR (true) or AND (false)
    pub and_or_dcs: bool,

    /// Decision of the DCS part when the DCS status is unavailable
    pub error_reply_dcs: bool,

    /// Conditions database label (kept for reference)
    pub db_label: String,

    /// Combine the HLT paths with OR (true) or AND (false)
    pub and_or_hlt: bool,

    /// Source of the trigger results, as "TriggerResults::<process>"
    pub hlt_input_tag: String,

    /// Trigger paths to be checked, a trailing '*' matches any suffix
    pub hlt_paths: Vec<String>,

    /// Conditions database key for HLT paths (kept for reference)
    pub hlt_db_key: String,

    /// Decision of the HLT part when it cannot be evaluated
    pub error_reply_hlt: bool,

    /// 0 is quiet, 1 reports configuration problems, 2 reports decisions
    pub verbosity_level: u32,
}
//
impl Default for TriggerFlagConfig {
    fn default() -> Self {
        Self {
            and_or: false,
            dcs_input_tag: "scalersRawToDigi".to_owned(),
            dcs_partitions: Vec::new(),
            and_or_dcs: false,
            error_reply_dcs: true,
            db_label: String::new(),
            and_or_hlt: true,
            hlt_input_tag: "TriggerResults::HLT".to_owned(),
            hlt_paths: Vec::new(),
            hlt_db_key: String::new(),
            error_reply_hlt: false,
            verbosity_level: 1,
        }
    }
}
//
impl TriggerFlagConfig {
    /// Name of the process whose trigger results should be used
    pub fn hlt_process(&self) -> &str {
        self.hlt_input_tag
            .rsplit("::")
            .next()
            .unwrap_or(&self.hlt_input_tag)
    }

    /// Check that the configuration makes sense
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.hlt_process().is_empty(),
            "HLT input tag {:?} does not name a process",
            self.hlt_input_tag
        );
        for path in &self.hlt_paths {
            let stem = path.strip_suffix('*').unwrap_or(path);
            ensure!(
                !stem.is_empty() && !stem.contains('*'),
                "Invalid HLT path pattern {:?}",
                path
            );
        }
        Ok(())
    }
}

/// Trigger flag combining detector status and HLT path decisions
#[derive(Clone, Debug)]
pub struct GenericTriggerFlag {
    /// Configuration of the flag
    cfg: TriggerFlagConfig,

    /// HLT path patterns in use for the current run
    hlt_paths: Vec<String>,
}
//
impl GenericTriggerFlag {
    /// Set up a trigger flag from its configuration
    pub fn new(cfg: TriggerFlagConfig) -> Result<Self> {
        cfg.validate()?;
        let hlt_paths = cfg.hlt_paths.clone();
        Ok(Self { cfg, hlt_paths })
    }

    /// Truth that the DCS part of the flag is in use
    fn has_dcs(&self) -> bool {
        !self.cfg.dcs_partitions.is_empty()
    }

    /// Truth that the HLT part of the flag is in use
    fn has_hlt(&self) -> bool {
        !self.cfg.hlt_paths.is_empty()
    }

    /// Evaluate the DCS part of the flag
    fn accept_dcs(&self, event: &Event) -> bool {
        let Some(status) = event.dcs_status() else {
            if self.cfg.verbosity_level > 0 {
                warn!(
                    "DCS status {:?} not found, replying {}",
                    self.cfg.dcs_input_tag, self.cfg.error_reply_dcs
                );
            }
            return self.cfg.error_reply_dcs;
        };
        let mut partitions = self.cfg.dcs_partitions.iter();
        if self.cfg.and_or_dcs {
            partitions.any(|p| status.contains(p))
        } else {
            partitions.all(|p| status.contains(p))
        }
    }

    /// Evaluate the HLT part of the flag
    fn accept_hlt(&self, event: &Event) -> bool {
        if self.hlt_paths.is_empty() {
            return self.cfg.error_reply_hlt;
        }
        let Some(results) = event.trigger_results(self.cfg.hlt_process()) else {
            if self.cfg.verbosity_level > 0 {
                warn!(
                    "Trigger results {:?} not found, replying {}",
                    self.cfg.hlt_input_tag, self.cfg.error_reply_hlt
                );
            }
            return self.cfg.error_reply_hlt;
        };
        let path_fired = |pattern: &String| results.accepted(pattern);
        if self.cfg.and_or_hlt {
            self.hlt_paths.iter().any(path_fired)
        } else {
            self.hlt_paths.iter().all(path_fired)
        }
    }
}

impl TriggerFlag for GenericTriggerFlag {
    fn on(&self) -> bool {
        self.has_dcs() || self.has_hlt()
    }

    fn accept(&self, event: &Event) -> bool {
        if !self.on() {
            return true;
        }

        // Only the parts which are in use get a say
        let mut decisions = Vec::with_capacity(2);
        if self.has_dcs() {
            decisions.push(self.accept_dcs(event));
        }
        if self.has_hlt() {
            decisions.push(self.accept_hlt(event));
        }
        let accepted = if self.cfg.and_or {
            decisions.iter().any(|&d| d)
        } else {
            decisions.iter().all(|&d| d)
        };

        if self.cfg.verbosity_level > 1 {
            debug!("Trigger flag decisions {:?} -> {}", decisions, accepted);
        }
        accepted
    }

    fn init_run(&mut self, run: &RunInfo) {
        // Without a trigger menu, we cannot tell which paths exist
        self.hlt_paths = self.cfg.hlt_paths.clone();
        if run.hlt_menu.is_empty() {
            return;
        }

        let verbose = self.cfg.verbosity_level > 0;
        self.hlt_paths.retain(|pattern| {
            let known = run.hlt_menu.iter().any(|p| path_matches(pattern, p));
            if !known && verbose {
                warn!(
                    "HLT path {:?} is not in the trigger menu of run {}, ignoring it",
                    pattern, run.number
                );
            }
            known
        });
    }
}
