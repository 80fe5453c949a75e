//! Computation of the razor kinematic variables
//!
//! The razor variables characterize events where a pair of heavy particles
//! is produced, each decaying into visible stuff plus something invisible.
//! The visible part of the event is clustered into two "hemispheres", and
//! from those and the missing transverse energy we derive...
//!
//! * M_R, a longitudinally boost-invariant estimate of the heavy mass scale
//! * R, the ratio of a transverse mass scale M_T^R to M_R, which tells how
//!   much of the event's energy went into invisible particles
//! * dPhi_R, the azimuthal opening angle between the two hemispheres

use crate::{
    momentum::FourVector,
    numeric::{functions::reduce_range, Float},
};
use nalgebra::Vector3;
use prefix_num_ops::real::*;

/// Transverse momentum (GeV) below which the leading hemisphere is considered
/// degenerate and M_R is not computed
pub const MIN_LEADING_PT: Float = 0.1;

/// Value of M_R when it cannot be computed
pub const DEGENERATE_MR: Float = -1.;

/// Compute the M_R variable from the leading and subleading hemispheres
///
/// Returns DEGENERATE_MR if the leading hemisphere has too little transverse
/// momentum. For pathological inputs, the square roots can receive negative
/// arguments, in which case NaN comes out; this is not trapped.
///
pub fn calc_mr(ja: &FourVector, jb: &FourVector) -> Float {
    if ja.pt() <= MIN_LEADING_PT {
        return DEGENERATE_MR;
    }

    let a = ja.p();
    let b = jb.p();
    let az = ja.pz();
    let bz = jb.pz();
    let ja_t = ja.transverse();
    let jb_t = jb.transverse();
    let at_bt = (ja_t + jb_t).norm_squared();

    // Difference of the squared transverse momenta drives the boost
    let dt2 = jb_t.dot(&jb_t) - ja_t.dot(&ja_t);

    let mr_star = sqrt((a + b) * (a + b) - (az + bz) * (az + bz) - dt2 * dt2 / at_bt);
    let beta = dt2 / sqrt(at_bt * ((a + b) * (a + b) - (az + bz) * (az + bz)));
    let gamma = 1. / sqrt(1. - beta * beta);

    // Use gamma times M_R*
    mr_star * gamma
}

/// Compute the R variable from M_R, the two hemispheres and the missing
/// transverse momentum
///
/// There is no protection against M_R being zero or negative, the result
/// will then be infinite, NaN or negative.
///
pub fn calc_r(mr: Float, ja: &FourVector, jb: &FourVector, met: &Vector3<Float>) -> Float {
    let met_dot_p = met.dot(&(ja.vect() + jb.vect()));
    let mtr = sqrt(0.5 * (met.norm() * (ja.pt() + jb.pt()) - met_dot_p));

    // The final ratio is computed in single precision, reference histograms
    // were produced that way
    ((mtr as f32) / (mr as f32)) as Float
}

/// Signed azimuthal difference between two angles, in [-𝜋, 𝜋]
pub fn delta_phi(phi1: Float, phi2: Float) -> Float {
    reduce_range(phi1 - phi2)
}

/// Razor variables of one event
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RazorVariables {
    /// Boost-invariant mass scale (GeV), DEGENERATE_MR if undefined
    pub mr: Float,

    /// Ratio of M_T^R to M_R
    pub r: Float,

    /// Square of R
    pub rsq: Float,

    /// Absolute azimuthal angle between the two hemispheres
    pub dphi_r: Float,
}
//
impl RazorVariables {
    /// Compute the razor variables from the two leading hemispheres and the
    /// missing transverse momentum (with zero Z component)
    ///
    /// The hemispheres are ordered by decreasing transverse momentum before
    /// being fed to calc_mr and calc_r, so their input order does not matter.
    /// dPhi_R is symmetric and uses them as given.
    ///
    pub fn compute(h0: &FourVector, h1: &FourVector, met: &Vector3<Float>) -> Self {
        let (ja, jb) = if h1.pt() > h0.pt() { (h1, h0) } else { (h0, h1) };
        let mr = calc_mr(ja, jb);
        let r = calc_r(mr, ja, jb, met);
        Self {
            mr,
            r,
            rsq: r * r,
            dphi_r: abs(delta_phi(h0.phi(), h1.phi())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::reals::consts::PI;
    use approx::assert_relative_eq;

    #[test]
    fn soft_leading_hemisphere_is_degenerate() {
        let soft = FourVector::new(0.1, 0., 20., 20.);
        let hard = FourVector::new(0., 300., 0., 300.);
        assert_eq!(calc_mr(&soft, &hard), DEGENERATE_MR);
        assert_eq!(calc_mr(&FourVector::new(0., 0., 0., 0.), &hard), -1.);
    }

    #[test]
    fn back_to_back_massless_pair() {
        // Transverse back-to-back: A+B = 800, |jaT+jbT|^2 = 200^2,
        // dt2 = 300^2 - 500^2 = -160000
        let ja = FourVector::new(500., 0., 0., 500.);
        let jb = FourVector::new(-300., 0., 0., 300.);
        // M_R* vanishes while the boost reaches the speed of light
        let mr_star = sqrt(800. * 800. - 160_000. * 160_000. / 40_000.);
        assert_eq!(mr_star, 0.);
        assert!(calc_mr(&ja, &jb).is_nan());
    }

    #[test]
    fn equal_hemispheres_give_twice_the_momentum() {
        // With |pA| = |pB| and no boost, M_R = 2|p|
        let ja = FourVector::new(300., 0., 400., 500.);
        let jb = FourVector::new(0., 300., -400., 500.);
        assert_relative_eq!(calc_mr(&ja, &jb), 1000., max_relative = 1e-12);
    }

    #[test]
    fn r_vanishes_without_met() {
        let ja = FourVector::new(300., 0., 400., 500.);
        let jb = FourVector::new(0., 300., -400., 500.);
        let mr = calc_mr(&ja, &jb);
        assert_eq!(calc_r(mr, &ja, &jb, &Vector3::zeros()), 0.);
    }

    #[test]
    fn r_propagates_degenerate_mr() {
        let ja = FourVector::new(300., 0., 0., 300.);
        let jb = FourVector::new(0., 100., 0., 100.);
        let met = Vector3::new(-50., -50., 0.);
        assert!(calc_r(DEGENERATE_MR, &ja, &jb, &met) < 0.);
        assert!(calc_r(0., &ja, &jb, &met).is_infinite());
    }

    #[test]
    fn azimuthal_difference_wraps_around() {
        assert_relative_eq!(delta_phi(3., -3.), 6. - 2. * PI, epsilon = 1e-12);
        assert_relative_eq!(delta_phi(-3., 3.), 2. * PI - 6., epsilon = 1e-12);
        assert_eq!(delta_phi(1., 0.5), 0.5);
    }

    #[test]
    fn reference_hemisphere_pair() {
        let ja = FourVector::new(-200., 90., -50., 240.);
        let jb = FourVector::new(120., -40., 300., 350.);
        let mr = calc_mr(&ja, &jb);
        assert_relative_eq!(mr, 490.4826253200467, max_relative = 1e-9);
        let r = calc_r(mr, &ja, &jb, &Vector3::new(60., -30., 0.));
        assert_relative_eq!(r, 0.24760198593139648, max_relative = 1e-7);
    }

    #[test]
    fn computed_variables_ignore_hemisphere_order() {
        let h0 = FourVector::new(120., -40., 300., 350.);
        let h1 = FourVector::new(-200., 90., -50., 240.);
        let met = Vector3::new(60., -30., 0.);
        let a = RazorVariables::compute(&h0, &h1, &met);
        let b = RazorVariables::compute(&h1, &h0, &met);
        assert_eq!(a, b);
        assert_eq!(a.rsq, a.r * a.r);
        assert!(a.dphi_r >= 0. && a.dphi_r <= PI);
    }
}
