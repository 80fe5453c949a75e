//! Razor trigger efficiency monitor
//!
//!
//! # Introduction (for the physicist)
//!
//! Razor triggers select events with pairs of heavy particles decaying into
//! visible stuff plus invisible particles, based on two kinematic variables:
//! M_R, a boost-invariant estimate of the heavy mass scale, and R², which
//! tells how much of that scale went into invisible particles.
//!
//! This crate measures the efficiency of such triggers as a function of M_R,
//! R² and the opening angle dPhi_R of the two "hemispheres" into which the
//! visible part of the event is clustered. It does so using the classic
//! numerator/denominator method: the denominator counts events selected by an
//! orthogonal reference trigger, the numerator counts those of them which are
//! also selected by the trigger under study.
//!
//!
//! # Introduction (for the computer guy)
//!
//! The work is organized as a simple pipeline:
//!
//! * read in the configuration and book the histograms of a run
//! * loop over events, each of which...
//!     * goes through trigger flags and object selections,
//!     * gets its razor variables computed from the hemispheres,
//!     * fills the denominator histograms and maybe the numerator ones
//! * then merge the histograms of all event batches and store them.
//!
//! Per-event processing never fails: anomalous events are logged and skipped,
//! and the fate of each event is reported as an `Outcome`.

#![warn(missing_docs)]

pub mod config;
pub mod event;
pub mod evgen;
pub mod histogram;
pub mod momentum;
pub mod monitor;
pub mod numeric;
pub mod output;
pub mod random;
pub mod razor;
pub mod resacc;
pub mod scheduling;
pub mod selection;
pub mod trigger;

/// We'll use eyre's type-erased result type throughout the crate
pub type Result<T> = eyre::Result<T>;
