//! Histograms filled by the monitor
//!
//! Histograms are booked once per run, then filled once per selected event.
//! Every monitored quantity gets a numerator and a denominator histogram with
//! the same binning, whose bin-wise ratio is the trigger efficiency.

use crate::{numeric::Float, Result};
use eyre::{ensure, WrapErr};

/// Histogram axis with variable bin widths
///
/// Bins are half-open intervals [low, high). Bin 0 is the underflow bin and
/// bin num_bins() + 1 is the overflow bin, which also receives NaN.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Axis {
    /// Bin edges, in strictly increasing order
    edges: Vec<Float>,

    /// Axis title
    title: String,
}
//
impl Axis {
    /// Build an axis from its bin edges
    pub fn new(edges: Vec<Float>) -> Result<Self> {
        ensure!(edges.len() >= 2, "An axis needs at least two bin edges");
        ensure!(
            edges.iter().all(|e| e.is_finite()),
            "Bin edges must be finite, got {:?}",
            edges
        );
        ensure!(
            edges.windows(2).all(|w| w[0] < w[1]),
            "Bin edges must be strictly increasing, got {:?}",
            edges
        );
        Ok(Self {
            edges,
            title: String::new(),
        })
    }

    /// Number of regular bins
    pub fn num_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Bin edges
    pub fn edges(&self) -> &[Float] {
        &self.edges
    }

    /// Axis title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Change the axis title
    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_owned();
    }

    /// Find the bin into which a value falls
    pub fn find_bin(&self, x: Float) -> usize {
        let last = self.edges[self.edges.len() - 1];
        if x < self.edges[0] {
            0
        } else if !(x < last) {
            self.num_bins() + 1
        } else {
            self.edges.partition_point(|&e| e <= x)
        }
    }
}

/// Common interface to 1D and 2D histograms
pub trait Histogram {
    /// Histogram name
    fn name(&self) -> &str;

    /// Number of fill operations, including those that went into flow bins
    fn entries(&self) -> usize;

    /// Set the title of the n-th axis (1 = X, 2 = Y)
    fn set_axis_title(&mut self, title: &str, axis: usize);

    /// Add the contents of a histogram with identical binning
    fn merge(&mut self, other: &Self);
}

/// One-dimensional histogram
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram1D {
    /// Histogram name, unique within its folder
    name: String,

    /// Human-readable title
    title: String,

    /// X axis
    x_axis: Axis,

    /// Title of the Y axis, which measures bin contents
    y_title: String,

    /// Bin contents, including underflow and overflow
    contents: Vec<Float>,

    /// Number of fill operations
    entries: usize,
}
//
impl Histogram1D {
    /// Create an empty histogram
    pub fn new(name: &str, title: &str, x_axis: Axis) -> Self {
        let contents = vec![0.; x_axis.num_bins() + 2];
        Self {
            name: name.to_owned(),
            title: title.to_owned(),
            x_axis,
            y_title: String::new(),
            contents,
            entries: 0,
        }
    }

    /// Record one occurrence of a value
    pub fn fill(&mut self, x: Float) {
        self.contents[self.x_axis.find_bin(x)] += 1.;
        self.entries += 1;
    }

    /// Histogram title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// X axis
    pub fn x_axis(&self) -> &Axis {
        &self.x_axis
    }

    /// Title of the Y axis
    pub fn y_title(&self) -> &str {
        &self.y_title
    }

    /// Content of a bin (0 = underflow, num_bins + 1 = overflow)
    pub fn content(&self, bin: usize) -> Float {
        self.contents[bin]
    }
}

impl Histogram for Histogram1D {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> usize {
        self.entries
    }

    fn set_axis_title(&mut self, title: &str, axis: usize) {
        match axis {
            1 => self.x_axis.set_title(title),
            2 => self.y_title = title.to_owned(),
            _ => {}
        }
    }

    fn merge(&mut self, other: &Self) {
        assert_eq!(
            self.x_axis.edges, other.x_axis.edges,
            "Cannot merge histograms with different binning"
        );
        for (dst, src) in self.contents.iter_mut().zip(other.contents.iter()) {
            *dst += src;
        }
        self.entries += other.entries;
    }
}

/// Two-dimensional histogram
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram2D {
    /// Histogram name, unique within its folder
    name: String,

    /// Human-readable title
    title: String,

    /// X axis
    x_axis: Axis,

    /// Y axis
    y_axis: Axis,

    /// Bin contents including flows, in row-major order (X bin is the row)
    contents: Vec<Float>,

    /// Number of fill operations
    entries: usize,
}
//
impl Histogram2D {
    /// Create an empty histogram
    pub fn new(name: &str, title: &str, x_axis: Axis, y_axis: Axis) -> Self {
        let contents = vec![0.; (x_axis.num_bins() + 2) * (y_axis.num_bins() + 2)];
        Self {
            name: name.to_owned(),
            title: title.to_owned(),
            x_axis,
            y_axis,
            contents,
            entries: 0,
        }
    }

    /// Index of a bin in the contents array
    fn index(&self, x_bin: usize, y_bin: usize) -> usize {
        x_bin * (self.y_axis.num_bins() + 2) + y_bin
    }

    /// Record one occurrence of a pair of values
    pub fn fill(&mut self, x: Float, y: Float) {
        let index = self.index(self.x_axis.find_bin(x), self.y_axis.find_bin(y));
        self.contents[index] += 1.;
        self.entries += 1;
    }

    /// Histogram title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// X axis
    pub fn x_axis(&self) -> &Axis {
        &self.x_axis
    }

    /// Y axis
    pub fn y_axis(&self) -> &Axis {
        &self.y_axis
    }

    /// Content of a bin (0 = underflow, num_bins + 1 = overflow)
    pub fn content(&self, x_bin: usize, y_bin: usize) -> Float {
        self.contents[self.index(x_bin, y_bin)]
    }
}

impl Histogram for Histogram2D {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> usize {
        self.entries
    }

    fn set_axis_title(&mut self, title: &str, axis: usize) {
        match axis {
            1 => self.x_axis.set_title(title),
            2 => self.y_axis.set_title(title),
            _ => {}
        }
    }

    fn merge(&mut self, other: &Self) {
        assert!(
            self.x_axis.edges == other.x_axis.edges && self.y_axis.edges == other.y_axis.edges,
            "Cannot merge histograms with different binning"
        );
        for (dst, src) in self.contents.iter_mut().zip(other.contents.iter()) {
            *dst += src;
        }
        self.entries += other.entries;
    }
}

/// Build an axis whose bin edges are stored in single precision, which is how
/// the reference histograms are booked
fn single_precision_axis(edges: &[Float]) -> Result<Axis> {
    Axis::new(edges.iter().map(|&e| (e as f32) as Float).collect())
}

/// Selects one of the histograms of a numerator/denominator pair
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Side {
    /// Events which passed the trigger under study
    Numerator,

    /// Events which passed the reference selection
    Denominator,
}

/// Numerator and denominator histograms of a monitored quantity
#[derive(Clone, Debug, PartialEq)]
pub struct RazorME<H: Histogram> {
    /// Events which passed the trigger under study
    pub numerator: H,

    /// Events which passed the reference selection
    pub denominator: H,
}
//
impl<H: Histogram> RazorME<H> {
    /// Set the X and Y axis titles of both histograms
    pub fn set_title(&mut self, title_x: &str, title_y: &str) {
        for hist in [&mut self.numerator, &mut self.denominator] {
            hist.set_axis_title(title_x, 1);
            hist.set_axis_title(title_y, 2);
        }
    }

    /// Access one of the histograms of the pair
    pub fn get_mut(&mut self, side: Side) -> &mut H {
        match side {
            Side::Numerator => &mut self.numerator,
            Side::Denominator => &mut self.denominator,
        }
    }

    /// Add the contents of another pair of histograms
    pub fn merge(&mut self, other: &Self) {
        self.numerator.merge(&other.numerator);
        self.denominator.merge(&other.denominator);
    }
}
//
impl RazorME<Histogram1D> {
    /// Book a pair of 1D histograms with variable binning
    pub fn book_1d(name: &str, title: &str, edges: &[Float]) -> Result<Self> {
        let axis = single_precision_axis(edges)
            .wrap_err_with(|| format!("Bad binning for {}", name))?;
        Ok(Self {
            numerator: Histogram1D::new(
                &format!("{}_numerator", name),
                &format!("{} (numerator)", title),
                axis.clone(),
            ),
            denominator: Histogram1D::new(
                &format!("{}_denominator", name),
                &format!("{} (denominator)", title),
                axis,
            ),
        })
    }

    /// Bin-wise efficiency, for regular bins only
    ///
    /// Bins with an empty denominator have no efficiency.
    ///
    pub fn efficiency(&self) -> Vec<Option<Float>> {
        (1..=self.denominator.x_axis().num_bins())
            .map(|bin| {
                let den = self.denominator.content(bin);
                (den > 0.).then(|| self.numerator.content(bin) / den)
            })
            .collect()
    }
}
//
impl RazorME<Histogram2D> {
    /// Book a pair of 2D histograms with variable binning
    pub fn book_2d(name: &str, title: &str, x_edges: &[Float], y_edges: &[Float]) -> Result<Self> {
        let bad_binning = || format!("Bad binning for {}", name);
        let x_axis = single_precision_axis(x_edges).wrap_err_with(bad_binning)?;
        let y_axis = single_precision_axis(y_edges).wrap_err_with(bad_binning)?;
        Ok(Self {
            numerator: Histogram2D::new(
                &format!("{}_numerator", name),
                &format!("{} (numerator)", title),
                x_axis.clone(),
                y_axis.clone(),
            ),
            denominator: Histogram2D::new(
                &format!("{}_denominator", name),
                &format!("{} (denominator)", title),
                x_axis,
                y_axis,
            ),
        })
    }
}

/// Bin edges of the monitored quantities
#[derive(Clone, Debug, PartialEq)]
pub struct RazorBinning {
    /// M_R bin edges (GeV)
    pub mr: Vec<Float>,

    /// R² bin edges
    pub rsq: Vec<Float>,

    /// dPhi_R bin edges
    pub dphi_r: Vec<Float>,
}
//
impl Default for RazorBinning {
    /// Binning of the 2016 offline selection
    fn default() -> Self {
        Self {
            mr: vec![
                0., 100., 200., 300., 400., 500., 575., 650., 750., 900., 1200., 1600., 2500.,
                4000.,
            ],
            rsq: vec![
                0., 0.05, 0.1, 0.15, 0.2, 0.25, 0.30, 0.41, 0.52, 0.64, 0.8, 1.5,
            ],
            dphi_r: vec![0., 0.5, 1.0, 1.5, 2.0, 2.5, 2.8, 3.0, 3.2],
        }
    }
}

/// Full set of histograms of the razor monitor
#[derive(Clone, Debug, PartialEq)]
pub struct RazorHistograms {
    /// Folder in which the histograms are stored
    pub folder: String,

    /// M_R, for events with R² above the cut
    pub mr: RazorME<Histogram1D>,

    /// R², for events with M_R above the cut
    pub rsq: RazorME<Histogram1D>,

    /// dPhi_R
    pub dphi_r: RazorME<Histogram1D>,

    /// M_R vs R²
    pub mr_vs_rsq: RazorME<Histogram2D>,
}
//
impl RazorHistograms {
    /// Book all histograms in a given folder
    pub fn book(folder: &str, binning: &RazorBinning) -> Result<Self> {
        let mut mr = RazorME::book_1d("MR", "PF MR", &binning.mr)?;
        mr.set_title("PF M_{R} [GeV]", "events / [GeV]");

        let mut rsq = RazorME::book_1d("Rsq", "PF Rsq", &binning.rsq)?;
        rsq.set_title("PF R^{2}", "events");

        let mut dphi_r = RazorME::book_1d("dPhiR", "dPhiR", &binning.dphi_r)?;
        dphi_r.set_title("dPhi_{R}", "events");

        let mut mr_vs_rsq =
            RazorME::book_2d("MRVsRsq", "PF MR vs PF Rsq", &binning.mr, &binning.rsq)?;
        mr_vs_rsq.set_title("M_{R} [GeV]", "R^{2}");

        Ok(Self {
            folder: folder.to_owned(),
            mr,
            rsq,
            dphi_r,
            mr_vs_rsq,
        })
    }

    /// Integrate the histograms of another run fragment
    #[allow(clippy::needless_pass_by_value)]
    pub fn merge(&mut self, other: Self) {
        assert_eq!(self.folder, other.folder, "Cannot merge different folders");
        self.mr.merge(&other.mr);
        self.rsq.merge(&other.rsq);
        self.dphi_r.merge(&other.dphi_r);
        self.mr_vs_rsq.merge(&other.mr_vs_rsq);
    }
}
