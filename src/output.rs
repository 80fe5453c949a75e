//! This module is in charge of outputting the final monitoring results to the
//! standard output and various files

use crate::{
    config::Configuration,
    histogram::{Histogram, Histogram1D, Histogram2D, RazorME},
    monitor::Outcome,
    numeric::{reals, Float},
    resacc::{OutcomeCounts, ResultsAccumulator},
    Result,
};
use std::{
    fs::File,
    io::{self, Write},
    path::Path,
    time::Duration,
};
use time::{format_description, OffsetDateTime};

// Number of significant digits in file output
const SIG_DIGITS: usize = (reals::DIGITS - 1) as usize;

/// Output the monitoring results to the console and to disk
pub fn dump_results(
    cfg: &Configuration,
    results: &ResultsAccumulator,
    elapsed_time: Duration,
    output_dir: &Path,
) -> Result<()> {
    // Print out a summary of what happened to events on stdout
    print_outcomes(&results.outcomes);

    // Compute a timestamp of when the run ended
    let format = format_description::parse(
        "[day]-[month repr:short]-[year repr:last_two]   [hour]:[minute]:[second]",
    )?;
    let timestamp = OffsetDateTime::now_utc().format(&format)?;

    // Write execution timings to a file
    {
        let mut tim_file = File::create(output_dir.join("razor.times"))?;
        let tim_file = &mut tim_file;

        writeln_razor(tim_file, &timestamp[..])?;
        writeln_razor(tim_file, "---------------------------------------------")?;
        let elapsed_secs = elapsed_time.as_secs_f64();
        writeln_razor(tim_file, ("Elapsed time (s)", elapsed_secs))?;
        let secs_per_ev = elapsed_secs / (cfg.num_events as Float);
        writeln_razor(tim_file, ("Elapsed time per event (s)", secs_per_ev))?;
    }

    // Write the main results file
    let mut dat_file = File::create(output_dir.join("razor.data"))?;
    write_histograms(&mut dat_file, cfg, results)?;
    Ok(())
}

/// Display the fate of processed events
pub fn print_outcomes(outcomes: &OutcomeCounts) {
    println!("Processed events               : {}", outcomes.total());
    for (outcome, count) in outcomes.iter() {
        let label = match outcome {
            Outcome::Rejected(stage) => format!("Rejected ({:?})", stage),
            Outcome::Filled { numerator: false } => "Denominator only".to_owned(),
            Outcome::Filled { numerator: true } => "Numerator and denominator".to_owned(),
        };
        println!("{:<31}: {}", label, count);
    }
}

/// Write the histogram contents and efficiencies
pub fn write_histograms(
    writer: &mut impl Write,
    cfg: &Configuration,
    results: &ResultsAccumulator,
) -> io::Result<()> {
    let mon = &cfg.monitor;
    let histos = &results.histograms;
    writeln_razor(writer, ("Number of events", cfg.num_events))?;
    writeln_razor(writer, ("... in the denominator", results.outcomes.denominator()))?;
    writeln_razor(writer, ("... in the numerator", results.outcomes.numerator()))?;
    writeln_razor(writer, ("Cut on R^2", mon.rsq_cut))?;
    writeln_razor(writer, ("Cut on M_R (GeV)", mon.mr_cut))?;
    writeln_razor(writer, ("Folder", &histos.folder[..]))?;
    for pair in [&histos.mr, &histos.rsq, &histos.dphi_r] {
        writeln!(writer)?;
        write_1d(writer, pair)?;
    }
    writeln!(writer)?;
    write_2d(writer, &histos.mr_vs_rsq)
}

/// Write a pair of 1D histograms, one bin per line
fn write_1d(writer: &mut impl Write, pair: &RazorME<Histogram1D>) -> io::Result<()> {
    let den = &pair.denominator;
    let num = &pair.numerator;
    let axis = den.x_axis();
    writeln_razor(writer, ("Histogram", num.name()))?;
    writeln_razor(writer, ("Histogram", den.name()))?;
    writeln_razor(writer, ("X axis", axis.title()))?;
    writeln_razor(writer, ("Y axis", den.y_title()))?;
    writeln_razor(writer, ("Entries (numerator)", num.entries()))?;
    writeln_razor(writer, ("Entries (denominator)", den.entries()))?;
    writeln_razor(writer, ("Underflow (numerator)", num.content(0)))?;
    writeln_razor(writer, ("Underflow (denominator)", den.content(0)))?;
    let overflow = axis.num_bins() + 1;
    writeln_razor(writer, ("Overflow (numerator)", num.content(overflow)))?;
    writeln_razor(writer, ("Overflow (denominator)", den.content(overflow)))?;

    let edges = axis.edges();
    for (bin, efficiency) in (1..overflow).zip(pair.efficiency()) {
        let row = [edges[bin - 1], edges[bin], num.content(bin), den.content(bin)];
        for value in row {
            write!(writer, " ")?;
            write_column(writer, value)?;
        }
        write!(writer, " ")?;
        match efficiency {
            Some(eff) => write_column(writer, eff)?,
            None => write!(writer, "{:>width$}", "-", width = COLUMN_WIDTH)?,
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Write a pair of 2D histograms, one line per populated regular bin
fn write_2d(writer: &mut impl Write, pair: &RazorME<Histogram2D>) -> io::Result<()> {
    let den = &pair.denominator;
    let num = &pair.numerator;
    writeln_razor(writer, ("Histogram", num.name()))?;
    writeln_razor(writer, ("Histogram", den.name()))?;
    writeln_razor(writer, ("X axis", den.x_axis().title()))?;
    writeln_razor(writer, ("Y axis", den.y_axis().title()))?;
    writeln_razor(writer, ("Entries (numerator)", num.entries()))?;
    writeln_razor(writer, ("Entries (denominator)", den.entries()))?;
    for x_bin in 1..=den.x_axis().num_bins() {
        for y_bin in 1..=den.y_axis().num_bins() {
            let den_count = den.content(x_bin, y_bin);
            if den_count == 0. {
                continue;
            }
            let num_count = num.content(x_bin, y_bin);
            writeln!(writer, "{:>4}{:>4} {} {}", x_bin, y_bin, num_count, den_count)?;
        }
    }
    Ok(())
}

/// Width of numerical columns in bin tables
const COLUMN_WIDTH: usize = SIG_DIGITS + 8;

/// Write a number in a fixed-width column
fn write_column(writer: &mut impl Write, x: Float) -> io::Result<()> {
    let mut text = Vec::new();
    write_engineering(&mut text, x, SIG_DIGITS)?;
    write!(
        writer,
        "{:>width$}",
        String::from_utf8_lossy(&text),
        width = COLUMN_WIDTH
    )
}

/// Key-value text output with a fixed-size key column
fn writeln_razor(writer: &mut impl Write, data: impl WriteRazor) -> io::Result<()> {
    write!(writer, " ")?;
    data.write(writer)?;
    writeln!(writer)
}

/// Trait implemented by things which can be written in the results files
trait WriteRazor: Sized {
    /// Write down `self` to the output
    fn write(self, writer: &mut impl Write) -> io::Result<()>;
}

impl WriteRazor for &str {
    fn write(self, writer: &mut impl Write) -> io::Result<()> {
        write!(writer, "{}", self)
    }
}

impl WriteRazor for usize {
    fn write(self, writer: &mut impl Write) -> io::Result<()> {
        write!(writer, "{}", self)
    }
}

impl WriteRazor for Float {
    // This is a close approximation of the %g printf format
    fn write(self, writer: &mut impl Write) -> io::Result<()> {
        write_engineering(writer, self, SIG_DIGITS)
    }
}

impl<T: WriteRazor> WriteRazor for (&str, T) {
    // Key-value output that uses fixed-size columns for better readability
    fn write(self, writer: &mut impl Write) -> io::Result<()> {
        write!(writer, "{:<31}: ", self.0)?;
        self.1.write(writer)
    }
}

/// Write a floating-point number using "engineering" notation
///
/// Analogous to the %g format of the C printf function, this method switches
/// between naive and scientific notation for floating-point numbers when the
/// number being printed becomes so small that printing leading zeroes could end
/// up larger than the scientific notation, or so large that we would be forced
/// to print more significant digits than requested.
///
fn write_engineering(writer: &mut impl Write, x: Float, sig_digits: usize) -> io::Result<()> {
    let mut precision = sig_digits - 1;
    if x == 0. {
        // Zero is special because you can't take its log
        write!(writer, "0")
    } else if !x.is_finite() {
        write!(writer, "{}", x)
    } else {
        // Otherwise, use log to evaluate order of magnitude
        let log_x = x.abs().log10();
        // Like %g, numbers with as many integer digits as requested significant
        // digits already need the scientific notation
        if log_x >= -3. && log_x < (sig_digits as Float) {
            // Print using naive notation, at a constant number of significant
            // digits. Numbers smaller than 1 get one extra digit since the
            // leading zero is not significant.
            precision = (precision as isize - log_x.trunc() as isize) as usize;
            if log_x < 0. {
                precision += 1
            }

            // Trailing zeros and decimal point are dropped
            let str_with_zeros = format!("{:.1$}", x, precision);
            if str_with_zeros.contains('.') {
                write!(
                    writer,
                    "{}",
                    str_with_zeros.trim_end_matches('0').trim_end_matches('.')
                )
            } else {
                write!(writer, "{}", str_with_zeros)
            }
        } else {
            // Print using scientific notation
            write!(writer, "{:.1$e}", x, precision)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{histogram::RazorHistograms, monitor::Stage};

    fn engineering_digits(x: Float, sig_digits: usize) -> String {
        let mut out = Vec::new();
        write_engineering(&mut out, x, sig_digits).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn engineering(x: Float) -> String {
        engineering_digits(x, 6)
    }

    #[test]
    fn engineering_notation() {
        assert_eq!(engineering(0.), "0");
        assert_eq!(engineering(300.), "300");
        assert_eq!(engineering(0.15), "0.15");
        assert_eq!(engineering(1.5e-5), "1.50000e-5");
        assert_eq!(engineering(Float::NAN), "NaN");
        assert_eq!(engineering(123456.), "123456");
        assert_eq!(engineering(-99999.9), "-99999.9");
    }

    #[test]
    fn as_many_integer_digits_as_significant_digits() {
        for (x, digits) in [(1e14, 14), (1e6, 6), (2e6, 6), (-1e14, 14)] {
            let text = engineering_digits(x, digits);
            assert!(text.contains('e'), "{} was written as {}", x, text);
            assert_eq!(text.parse::<Float>().unwrap(), x);
        }
    }

    #[test]
    fn huge_offline_cut_is_written_out() {
        let cfg = Configuration::parse("mrCut 100000000000000").unwrap();
        let histograms =
            RazorHistograms::book(&cfg.monitor.folder_name, &cfg.monitor.binning).unwrap();
        let results = ResultsAccumulator::new(histograms);
        let mut out = Vec::new();
        write_histograms(&mut out, &cfg, &results).unwrap();
        let text = String::from_utf8(out).unwrap();
        let cut_line = text
            .lines()
            .find(|line| line.contains("Cut on M_R"))
            .unwrap();
        let value = cut_line.rsplit(": ").next().unwrap();
        assert_eq!(value.parse::<Float>().unwrap(), 1e14);
    }

    #[test]
    fn histogram_tables() {
        let cfg = Configuration::default();
        let histograms =
            RazorHistograms::book(&cfg.monitor.folder_name, &cfg.monitor.binning).unwrap();
        let mut results = ResultsAccumulator::new(histograms);
        results.histograms.mr.denominator.fill(450.);
        results.histograms.mr.denominator.fill(460.);
        results.histograms.mr.numerator.fill(460.);
        results.outcomes.record(Outcome::Filled { numerator: true });
        results.outcomes.record(Outcome::Filled { numerator: false });
        results.outcomes.record(Outcome::Rejected(Stage::OfflineCut));

        let mut out = Vec::new();
        write_histograms(&mut out, &cfg, &results).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(" ... in the denominator         : 2\n"));
        assert!(text.contains("MR_numerator"));
        assert!(text.contains("MRVsRsq_denominator"));
        let mr_row = text
            .lines()
            .find(|line| line.split_whitespace().next() == Some("400"))
            .unwrap();
        let columns = mr_row.split_whitespace().collect::<Vec<_>>();
        assert_eq!(columns, ["400", "500", "1", "2", "0.5"]);
    }
}
